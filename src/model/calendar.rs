//! Stored calendars.

/// A named, opaque calendar payload. The store persists and guards the
/// payload; interpreting it (excluding fire times, etc.) is the hosting
/// scheduler's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    pub name: String,
    pub payload: Vec<u8>,
}

impl Calendar {
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}
