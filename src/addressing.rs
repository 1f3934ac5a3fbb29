//! Address normalization and router allow-list checks.
//!
//! All on-chain addresses are stored and compared lowercase (spec §3
//! invariants). This module is the single place that owns that rule so the
//! tap, the decoders, and the evaluator don't each reimplement it.

use alloy::primitives::Address;
use std::collections::HashSet;

use crate::types::RouterFamily;

pub fn to_lower(addr: Address) -> String {
    format!("{addr:#x}")
}

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub fn is_zero(addr: &str) -> bool {
    addr.eq_ignore_ascii_case(ZERO_ADDRESS)
}

/// A configured set of router addresses for one router family, compared
/// case-insensitively (spec §6 "Router allow-lists").
#[derive(Debug, Clone, Default)]
pub struct RouterAllowList {
    addresses: HashSet<String>,
}

impl RouterAllowList {
    pub fn new<I, S>(addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            addresses: addrs
                .into_iter()
                .map(|a| a.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.addresses.contains(&addr.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }
}

/// The three allow-lists the tap routes on, plus the universal router's
/// per-family canonical substitute (spec §4.5 step 2, §4.6 step 4).
#[derive(Debug, Clone)]
pub struct RouterRegistry {
    pub universal: RouterAllowList,
    pub v2: RouterAllowList,
    pub v3: RouterAllowList,
    /// Canonical V2 router to substitute when the observed router was the
    /// universal router and the decoded sub-action is V2.
    pub canonical_v2: Option<String>,
    /// Canonical V3 router to substitute for V3 universal-router sub-actions.
    pub canonical_v3: Option<String>,
}

impl RouterRegistry {
    /// Resolve the router address to use for pool/factory lookups:
    /// substitutes the canonical per-family router when `router` is on the
    /// universal allow-list (the universal router has no `factory()`).
    pub fn resolve_for_pool_lookup(&self, router: &str, family: RouterFamily) -> String {
        if self.universal.contains(router) {
            let canonical = match family {
                RouterFamily::V2 => self.canonical_v2.as_deref(),
                RouterFamily::V3 => self.canonical_v3.as_deref(),
            };
            if let Some(c) = canonical {
                return c.to_lowercase();
            }
        }
        router.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_matches_case_insensitively() {
        let list = RouterAllowList::new(["0xAbCdEf0000000000000000000000000000000000"]);
        assert!(list.contains("0xabcdef0000000000000000000000000000000000"));
        assert!(list.contains("0xAbCdEf0000000000000000000000000000000000"));
        assert!(!list.contains("0x0000000000000000000000000000000000000001"));
    }

    #[test]
    fn universal_router_substitution_picks_canonical_by_family() {
        let registry = RouterRegistry {
            universal: RouterAllowList::new(["0xuniversal00000000000000000000000000000"]),
            v2: RouterAllowList::new(Vec::<String>::new()),
            v3: RouterAllowList::new(Vec::<String>::new()),
            canonical_v2: Some("0xcanonicalv2000000000000000000000000000".to_string()),
            canonical_v3: Some("0xcanonicalv3000000000000000000000000000".to_string()),
        };

        let resolved = registry
            .resolve_for_pool_lookup("0xUniversal00000000000000000000000000000", RouterFamily::V3);
        assert_eq!(resolved, "0xcanonicalv3000000000000000000000000000");
    }

    #[test]
    fn non_universal_router_passes_through_lowercased() {
        let registry = RouterRegistry {
            universal: RouterAllowList::new(Vec::<String>::new()),
            v2: RouterAllowList::new(["0xV2Router00000000000000000000000000000"]),
            v3: RouterAllowList::new(Vec::<String>::new()),
            canonical_v2: None,
            canonical_v3: None,
        };
        let resolved =
            registry.resolve_for_pool_lookup("0xV2Router00000000000000000000000000000", RouterFamily::V2);
        assert_eq!(resolved, "0xv2router00000000000000000000000000000");
    }

    #[test]
    fn zero_address_detection_is_case_insensitive() {
        assert!(is_zero("0x0000000000000000000000000000000000000000"));
        assert!(!is_zero("0x0000000000000000000000000000000000000001"));
    }
}
