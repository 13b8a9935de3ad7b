//! # Temporal Types — UTC-Only Timestamps
//!
//! `Timestamp` is UTC, truncated to seconds, and renders as
//! `YYYY-MM-DDTHH:MM:SSZ`. Proof `created` values and ledger rows use it,
//! so the same instant always produces the same canonical bytes.
//!
//! Credential `issuanceDate` / `expirationDate` are [`DocumentDate`]s
//! instead: a signed document is hashed over its own text, so those
//! members keep the exact string the issuer wrote.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Parse a strict `Z`-suffixed RFC 3339 timestamp.
    ///
    /// Explicit offsets, even `+00:00`, are rejected.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(invalid(s, "timestamp must use Z suffix (UTC only)"));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| invalid(s, &e.to_string()))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Lenient parser for external input.
    ///
    /// Accepts any RFC 3339 offset (converted to UTC) and bare
    /// `YYYY-MM-DD` dates (midnight UTC).
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))));
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| invalid(s, &format!("not RFC 3339 or YYYY-MM-DD: {e}")))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid(s, "date has no midnight"))?;
        Ok(Self(midnight.and_utc()))
    }

    /// Render as ISO8601 with Z suffix.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_lenient(&raw).map_err(serde::de::Error::custom)
    }
}

/// A date member exactly as a credential document states it.
///
/// Serializes to the original string. [`DocumentDate::timestamp()`] is
/// its lenient interpretation, used for comparisons only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentDate {
    raw: String,
    at: Timestamp,
}

impl DocumentDate {
    /// Keep `raw` verbatim after checking that it reads as a date.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let at = Timestamp::parse_lenient(&raw)?;
        Ok(Self { raw, at })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn timestamp(&self) -> Timestamp {
        self.at
    }
}

impl From<Timestamp> for DocumentDate {
    fn from(at: Timestamp) -> Self {
        Self {
            raw: at.to_iso8601(),
            at,
        }
    }
}

impl std::fmt::Display for DocumentDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for DocumentDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for DocumentDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

fn invalid(value: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidTimestamp {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(Timestamp::now().0.nanosecond(), 0);
    }

    #[test]
    fn strict_parse_rejects_offsets() {
        assert!(Timestamp::parse("2026-01-15T12:00:00Z").is_ok());
        assert!(Timestamp::parse("2026-01-15T12:00:00+00:00").is_err());
        assert!(Timestamp::parse("2026-01-15T17:30:00+05:30").is_err());
    }

    #[test]
    fn lenient_parse_converts_and_truncates() {
        let ts = Timestamp::parse_lenient("2026-01-15T17:30:00.987+05:30").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn lenient_parse_accepts_bare_dates() {
        let ts = Timestamp::parse_lenient("2027-06-30").unwrap();
        assert_eq!(ts.to_iso8601(), "2027-06-30T00:00:00Z");
        assert!(Timestamp::parse_lenient("30/06/2027").is_err());
    }

    #[test]
    fn serde_roundtrip_uses_z_form() {
        let ts = Timestamp::parse("2026-03-01T08:09:10Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2026-03-01T08:09:10Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn document_date_keeps_its_text() {
        for raw in ["2024-05-01T10:20:30.123456Z", "2024-05-01T12:20:30+02:00", "2024-05-01"] {
            let date: DocumentDate = serde_json::from_str(&format!("\"{raw}\"")).unwrap();
            assert_eq!(date.as_str(), raw);
            assert_eq!(serde_json::to_string(&date).unwrap(), format!("\"{raw}\""));
        }
        let precise = DocumentDate::parse("2024-05-01T10:20:30.123456Z").unwrap();
        assert_eq!(precise.timestamp(), Timestamp::parse("2024-05-01T10:20:30Z").unwrap());
        assert!(serde_json::from_str::<DocumentDate>("\"next tuesday\"").is_err());
    }

    #[test]
    fn document_date_from_timestamp_uses_z_form() {
        let ts = Timestamp::parse("2026-03-01T08:09:10Z").unwrap();
        assert_eq!(DocumentDate::from(ts).as_str(), "2026-03-01T08:09:10Z");
    }

    #[test]
    fn ordering_follows_time() {
        let earlier = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let later = Timestamp::parse_lenient("2026-01-15T12:00:01+00:00").unwrap();
        assert!(earlier < later);
    }
}
