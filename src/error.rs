//! Typed error kinds at component boundaries (spec §7).
//!
//! Most of the crate propagates `anyhow::Result` with `.context(...)`, the
//! teacher's convention throughout `pool/syncer.rs` and `mempool/monitor.rs`.
//! `DetectorError` exists at the handful of boundaries where the caller needs
//! to branch on *which kind* of failure occurred rather than just log it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("transient RPC error: {0}")]
    TransientRpc(#[from] anyhow::Error),

    #[error("calldata did not match any known method for this router family")]
    Decode,

    #[error("pool not found for this token pair")]
    PoolAbsent,

    #[error("V3 quoter reverted: {0}")]
    QuoterRevert(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
