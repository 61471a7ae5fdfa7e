//! ID prefix constants.
//!
//! IDs are generated by the database layer as `{prefix}-{8 hex chars}`.

pub const PREFIX_CONTRACT: &str = "ctr";
pub const PREFIX_APPROVAL: &str = "apr";
pub const PREFIX_VERSION: &str = "ver";
pub const PREFIX_AUDIT: &str = "aud";

/// Every prefix in use, for exhaustive tests.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_CONTRACT,
    PREFIX_APPROVAL,
    PREFIX_VERSION,
    PREFIX_AUDIT,
];

/// Check that `id` has the `{prefix}-{8 hex}` shape.
#[must_use]
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for prefix in ALL_PREFIXES {
            assert!(seen.insert(*prefix), "duplicate prefix {prefix}");
        }
    }

    #[test]
    fn has_prefix_checks_shape() {
        assert!(has_prefix("ctr-0a1b2c3d", PREFIX_CONTRACT));
        assert!(!has_prefix("ctr-0a1b2c3", PREFIX_CONTRACT));
        assert!(!has_prefix("apr-0a1b2c3d", PREFIX_CONTRACT));
        assert!(!has_prefix("ctr-zzzzzzzz", PREFIX_CONTRACT));
    }
}
