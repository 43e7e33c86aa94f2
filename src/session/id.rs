//! Debug session identifier type.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Global counter for locally allocated session IDs.
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of a debug session.
///
/// The backend assigns IDs; the frontend only uses them as the key of every
/// remote subscription. Displayed as `dbg-XXXXXXXX` (hexadecimal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a new process-unique session ID.
    pub fn new() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Create a SessionId from a raw value reported by the backend.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dbg-{:08x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = crate::error::MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("dbg-")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .map(SessionId)
            .ok_or_else(|| crate::error::MirrorError::SessionNotFound(s.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..10_000 {
            let id = SessionId::new();
            assert!(ids.insert(id), "Duplicate ID generated: {}", id);
        }
    }

    #[test]
    fn test_display_format() {
        assert_eq!(SessionId::from_raw(255).to_string(), "dbg-000000ff");
        assert_eq!(SessionId::from_raw(0x12345678).to_string(), "dbg-12345678");
    }

    #[test]
    fn test_parse() {
        let id: SessionId = "dbg-000000ff".parse().unwrap();
        assert_eq!(id.as_u64(), 255);

        assert!("000000ff".parse::<SessionId>().is_err());
        assert!("sess-000000ff".parse::<SessionId>().is_err());
        assert!("dbg-zz".parse::<SessionId>().is_err());
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id = SessionId::from_raw(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: SessionId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }
}
