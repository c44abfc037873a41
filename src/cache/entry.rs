//! Cache Entry Module
//!
//! Defines the persisted envelope of a cached value and its JSON codec.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A stored value together with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored value
    pub data: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_ms` milliseconds from now.
    ///
    /// A TTL of `None` or `Some(0)` produces an entry that never expires.
    pub fn new(data: Value, ttl_ms: Option<u64>) -> Self {
        let expires_at = effective_ttl(ttl_ms).map(|ttl| {
            current_timestamp_ms().saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX))
        });

        Self { data, expires_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is still live while `expires_at >= now`, so it expires once
    /// the current time moves strictly past the stored timestamp.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against an explicit clock.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires) => expires < now_ms,
            None => false,
        }
    }

    // == Codec ==
    /// Encodes the entry as JSON text.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes an entry from stored text.
    ///
    /// Returns `None` for anything that is not a well-formed entry: empty
    /// payloads, truncated JSON, or JSON of another shape.
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// == Utility Functions ==
/// Normalizes a TTL so that zero means "no expiry".
pub fn effective_ttl(ttl_ms: Option<u64>) -> Option<u64> {
    ttl_ms.filter(|ttl| *ttl > 0)
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(json!("test_value"), None);

        assert_eq!(entry.data, json!("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let entry = CacheEntry::new(json!(1), Some(0));

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let before = current_timestamp_ms();
        let entry = CacheEntry::new(json!({"a": 1}), Some(60_000));
        let after = current_timestamp_ms();

        let expires = entry.expires_at.unwrap();
        assert!(expires >= before + 60_000);
        assert!(expires <= after + 60_000);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(json!("short"), Some(50));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(80));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry {
            data: json!("test"),
            expires_at: Some(1_000),
        };

        assert!(!entry.is_expired_at(1_000), "expires_at == now is still live");
        assert!(entry.is_expired_at(1_001));
    }

    #[test]
    fn test_encode_uses_camel_case_and_null_sentinel() {
        let entry = CacheEntry::new(json!([1, 2]), None);
        let text = entry.encode().unwrap();

        assert_eq!(text, r#"{"data":[1,2],"expiresAt":null}"#);
        assert_eq!(CacheEntry::decode(&text), Some(entry));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(CacheEntry::decode("").is_none());
        assert!(CacheEntry::decode("\"\"").is_none());
        assert!(CacheEntry::decode("{\"data\": 1, \"expires").is_none());
        assert!(CacheEntry::decode(r#"[1, "soon"]"#).is_none());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new(json!(null), Some(u64::MAX));
        assert_eq!(entry.expires_at, Some(i64::MAX));
    }
}
