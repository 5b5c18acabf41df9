//! Reserved names that address proxy internals instead of mapping entries.

pub const RECURSIVE: &str = "__recursive";

/// Alias of [`RECURSIVE`].
pub const IS_RECURSIVE: &str = "__is_recursive";

pub const DEFAULT: &str = "__default";

pub const IDEMPOTENT_GET: &str = "__idempotent_get";

/// The backing mapping itself.
pub const BACKING: &str = "__dict__";

/// Keys stripped out of keyword-style construction entries.
pub const POLICY_KEYS: &[&str] = &[RECURSIVE, DEFAULT, IDEMPOTENT_GET];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reserved {
    Recursive,
    Default,
    IdempotentGet,
    Backing,
}

impl Reserved {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            RECURSIVE | IS_RECURSIVE => Some(Reserved::Recursive),
            DEFAULT => Some(Reserved::Default),
            IDEMPOTENT_GET => Some(Reserved::IdempotentGet),
            BACKING => Some(Reserved::Backing),
            _ => None,
        }
    }
}

pub fn is_reserved(name: &str) -> bool {
    Reserved::parse(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_keys_are_reserved() {
        for key in POLICY_KEYS {
            assert!(is_reserved(key));
        }
    }

    #[test]
    fn alias_parses_to_recursive() {
        assert_eq!(Reserved::parse(IS_RECURSIVE), Some(Reserved::Recursive));
        assert_eq!(Reserved::parse(BACKING), Some(Reserved::Backing));
    }

    #[test]
    fn ordinary_names_are_not_reserved() {
        assert!(!is_reserved("recursive"));
        assert!(!is_reserved("keys"));
        assert!(!is_reserved("__other"));
    }
}
