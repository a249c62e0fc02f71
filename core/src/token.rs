//! Authentication token returned by every auth flow.
//!
//! # Design
//! The server is inconsistent about timestamp encoding: `created` and
//! `expiry` arrive either as JSON integers (possibly written as `1.0`) or as
//! numeric strings. Strings must be digits with an optional sign, without
//! surrounding whitespace; anything else fails decoding.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::{Clock, SystemClock};

/// Access/refresh token pair with creation and expiry times in epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(deserialize_with = "epoch_seconds")]
    pub created: i64,
    #[serde(deserialize_with = "epoch_seconds")]
    pub expiry: i64,
}

impl AuthResponse {
    /// `None` when `created` is outside the range chrono can represent.
    pub fn created_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created, 0)
    }

    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expiry, 0)
    }

    /// True iff `created <= now <= expiry`, both ends inclusive.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let now = now.timestamp();
        self.created <= now && now <= self.expiry
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_with(&SystemClock)
    }

    pub fn is_valid_with(&self, clock: &dyn Clock) -> bool {
        self.is_valid_at(clock.now())
    }
}

fn epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct EpochSeconds;

    impl Visitor<'_> for EpochSeconds {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer or a string containing an integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        /// Only floats with an exact integral value, e.g. `1700000000.0`.
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.parse()
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(EpochSeconds)
}
