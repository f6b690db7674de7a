// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! Stored timestamps use second precision with a `Z` suffix so that their
//! string form sorts chronologically in Firestore queries.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time in the stored timestamp format.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_is_sortable() {
        let earlier = DateTime::from_timestamp(1_700_000_000, 999_999_999).unwrap();
        let later = DateTime::from_timestamp(1_700_000_001, 0).unwrap();

        assert_eq!(format_utc_rfc3339(earlier), "2023-11-14T22:13:20Z");
        assert!(format_utc_rfc3339(earlier) < format_utc_rfc3339(later));
    }
}
