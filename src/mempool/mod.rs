//! Mempool tap (spec §4.6).

pub mod tap;

pub use tap::MempoolTap;
