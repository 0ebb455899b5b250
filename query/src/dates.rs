use chrono::DateTime;
use chrono::Datelike;
use chrono::FixedOffset;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Offset;
use chrono::SecondsFormat;
use chrono::TimeZone;
use chrono::Utc;

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Time zone policy for dates typed without an explicit zone suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePolicy {
    pub naive_offset: FixedOffset,
}

impl Default for DatePolicy {
    fn default() -> Self {
        Self {
            naive_offset: Utc.fix(),
        }
    }
}

impl DatePolicy {
    pub fn with_offset(naive_offset: FixedOffset) -> Self {
        Self { naive_offset }
    }

    /// Parses a shell date literal into epoch milliseconds.
    ///
    /// Accepted forms: RFC 3339 (with or without fractional seconds),
    /// `YYYY-MM-DD`, and `YYYY-MM-DDTHH:MM[:SS[.fff]]` without a zone suffix.
    /// The last two are interpreted in `naive_offset`.
    pub fn parse_millis(&self, input: &str) -> Option<i64> {
        let input = input.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
            return Some(parsed.timestamp_millis());
        }
        for format in NAIVE_TIMESTAMP_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return self.localize(naive);
            }
        }
        let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
        self.localize(date.and_hms_opt(0, 0, 0)?)
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<i64> {
        self.naive_offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.timestamp_millis())
    }
}

/// RFC 3339 rendering with millisecond precision, or `None` outside the
/// 1970..=9999 range where the relaxed `$date` string form is not used.
pub(crate) fn relaxed_iso(millis: i64) -> Option<String> {
    let dt = Utc.timestamp_millis_opt(millis).single()?;
    if !(1970..=9999).contains(&dt.year()) {
        return None;
    }
    Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const JAN_1_2024: i64 = 1_704_067_200_000;

    #[test]
    fn rfc3339_forms() {
        let policy = DatePolicy::default();
        assert_eq!(policy.parse_millis("2024-01-01T00:00:00Z"), Some(JAN_1_2024));
        assert_eq!(
            policy.parse_millis("2024-01-01T00:00:00.250Z"),
            Some(JAN_1_2024 + 250)
        );
        assert_eq!(
            policy.parse_millis("2024-01-01T02:00:00+02:00"),
            Some(JAN_1_2024)
        );
    }

    #[test]
    fn date_only_and_naive_timestamps_default_to_utc() {
        let policy = DatePolicy::default();
        assert_eq!(policy.parse_millis("2024-01-01"), Some(JAN_1_2024));
        assert_eq!(
            policy.parse_millis("2024-01-01T00:00:01"),
            Some(JAN_1_2024 + 1_000)
        );
        assert_eq!(
            policy.parse_millis("2024-01-01 00:00:00.5"),
            Some(JAN_1_2024 + 500)
        );
    }

    #[test]
    fn naive_offset_applies_to_zoneless_input() {
        let offset = FixedOffset::east_opt(2 * 3600).expect("offset");
        let policy = DatePolicy::with_offset(offset);
        assert_eq!(
            policy.parse_millis("2024-01-01T02:00:00"),
            Some(JAN_1_2024)
        );
        assert_eq!(policy.parse_millis("2024-01-01T00:00:00Z"), Some(JAN_1_2024));
    }

    #[test]
    fn garbage_is_rejected() {
        let policy = DatePolicy::default();
        assert_eq!(policy.parse_millis("not-a-date"), None);
        assert_eq!(policy.parse_millis("2024-13-01"), None);
    }

    #[test]
    fn relaxed_iso_range() {
        assert_eq!(
            relaxed_iso(JAN_1_2024 + 7).as_deref(),
            Some("2024-01-01T00:00:00.007Z")
        );
        assert_eq!(relaxed_iso(-1), None);
    }
}
