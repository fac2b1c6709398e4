use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The persisted unit: a payload and the instant it stops being served.
///
/// The expiration is stored as microseconds since the Unix epoch, so codecs round-trip it
/// at microsecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub expires_at: DateTime<Utc>,
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(expires_at: DateTime<Utc>, data: Vec<u8>) -> Self {
        Self { expires_at, data }
    }

    /// Stamps `data` with an expiration `ttl` from now. A ttl too large to represent
    /// saturates to the latest instant chrono can hold.
    pub fn expiring_in(data: Vec<u8>, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self { expires_at, data }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// An expiration instant equal to `now` already counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
