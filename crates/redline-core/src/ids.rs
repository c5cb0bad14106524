//! Issue id generation.

use smol_str::{SmolStr, format_smolstr};

/// Source of fresh, unique annotation ids.
pub trait IdSource {
    fn next_id(&mut self) -> SmolStr;
}

/// Time-ordered random ids (`iss-<uuid v7>`). Used in production.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&mut self) -> SmolStr {
        format_smolstr!("iss-{}", uuid::Uuid::now_v7().simple())
    }
}

/// Deterministic `prefix-N` ids, counting up from 1.
#[derive(Clone, Debug)]
pub struct SequentialIds {
    prefix: SmolStr,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<SmolStr>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("iss")
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> SmolStr {
        let id = format_smolstr!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut ids = SequentialIds::new("t");
        assert_eq!(ids.next_id(), "t-1");
        assert_eq!(ids.next_id(), "t-2");
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let mut ids = UuidIds;
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(a.starts_with("iss-"));
        assert_ne!(a, b);
    }
}
