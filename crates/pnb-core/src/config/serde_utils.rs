//! Serde helpers for configuration fields

/// `#[serde(with = "duration_secs")]`: a `Duration` as whole seconds.
///
/// Sub-second precision is dropped on write; TTLs and intervals here are
/// configured in seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
