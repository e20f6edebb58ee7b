//! Identity types for jobs and triggers.

use std::fmt;

use uuid::Uuid;

/// A (name, group) identity. Jobs, triggers and their cross-references are
/// all addressed this way; the pair is unique within each entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub name: String,
    pub group: String,
}

impl Key {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

pub type JobKey = Key;
pub type TriggerKey = Key;

/// Mint a globally unique fire-instance id for a fired-trigger ledger entry.
pub fn new_fire_instance_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = Key::new("t1", "g1");
        assert_eq!(key.to_string(), "g1.t1");
    }

    #[test]
    fn test_fire_instance_ids_unique() {
        let a = new_fire_instance_id();
        let b = new_fire_instance_id();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }
}
