//! Moscow-time timestamps and calendar-day keys.
//!
//! The cache persists timestamps as fixed-width English text in Moscow time
//! (`Wed May 01 10:00:00 MSK 2024`). Moscow time is a fixed +03:00 offset from
//! UTC; no daylight-saving rules apply. Lookups match a whole calendar day by
//! masking out the time-of-day characters of that text.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Offset of Moscow time from UTC, in seconds.
pub const MSK_OFFSET_SECS: i32 = 3 * 60 * 60;

/// Text format used for every persisted timestamp.
///
/// Day-of-week, month, day, 24-hour time, the literal zone abbreviation and
/// the year. Always rendered with the English locale.
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S MSK %Y";

/// Pattern that replaces the `HH:MM:SS` part of a timestamp in a day mask.
const TIME_OF_DAY_WILDCARD: &str = "__:__:__";

/// Error returned when a persisted timestamp cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp {text:?}: {reason}")]
pub struct TimeError {
    text: String,
    reason: String,
}

impl TimeError {
    fn new(text: &str, reason: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    /// The text that failed to parse.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The Moscow time zone as a fixed offset.
pub fn msk() -> FixedOffset {
    // SAFETY: +03:00 is well inside the ±24h range chrono accepts
    FixedOffset::east_opt(MSK_OFFSET_SECS).unwrap()
}

/// Serialise a timestamp as Moscow wall-clock text.
///
/// The instant is shifted forward three hours from UTC before formatting, so
/// the same instant always produces the same text whatever zone it was
/// expressed in.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use timetable_cache::domain::encode_timestamp;
///
/// let t = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
/// assert_eq!(encode_timestamp(&t), "Wed May 01 10:00:00 MSK 2024");
/// ```
pub fn encode_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    time.with_timezone(&msk())
        .naive_local()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Parse text written by [`encode_timestamp`] back into a timestamp.
///
/// The result is expressed at the Moscow offset. The day-of-week must agree
/// with the date.
pub fn decode_timestamp(text: &str) -> Result<DateTime<FixedOffset>, TimeError> {
    let local = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| TimeError::new(text, e.to_string()))?;

    msk()
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| TimeError::new(text, "not representable in Moscow time"))
}

/// A calendar day in Moscow time, used as the date part of a cache key.
///
/// Only the day is significant: every time of day converts to the same key.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use timetable_cache::domain::DayKey;
///
/// let day = DayKey::from(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
/// assert_eq!(day.mask(), "Wed May 01 __:__:__ MSK 2024");
///
/// // 22:30 UTC is already the next day in Moscow
/// let late = Utc.with_ymd_and_hms(2024, 4, 30, 22, 30, 0).unwrap();
/// assert_eq!(DayKey::of(&late), day);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Create a key for the given Moscow calendar date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Key for the Moscow calendar day containing `time`.
    pub fn of<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        Self(time.with_timezone(&msk()).date_naive())
    }

    /// Returns the calendar date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Moscow wall-clock start of the day (inclusive).
    pub fn start(&self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }

    /// Moscow wall-clock start of the following day (exclusive).
    ///
    /// Returns `None` for the last date chrono can represent.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.0.succ_opt().map(|next| next.and_time(NaiveTime::MIN))
    }

    /// Whether `time` falls within `[start, end)` in Moscow time.
    pub fn contains<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        let local = time.with_timezone(&msk()).naive_local();
        local >= self.start() && self.end().is_none_or(|end| local < end)
    }

    /// A SQL `LIKE` pattern matching every encoded timestamp on this day.
    ///
    /// The encoded format has a fixed width, so replacing the time of day
    /// with single-character wildcards matches exactly this date.
    pub fn mask(&self) -> String {
        let start = self.start();
        format!(
            "{} {} MSK {}",
            start.format("%a %b %d"),
            TIME_OF_DAY_WILDCARD,
            start.format("%Y")
        )
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Interprets the value as Moscow wall-clock time.
impl From<NaiveDateTime> for DayKey {
    fn from(local: NaiveDateTime) -> Self {
        Self(local.date())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DayKey {
    fn from(time: DateTime<Tz>) -> Self {
        Self::of(&time)
    }
}

impl<Tz: TimeZone> From<&DateTime<Tz>> for DayKey {
    fn from(time: &DateTime<Tz>) -> Self {
        Self::of(time)
    }
}

impl fmt::Debug for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DayKey({})", self.0)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn encode_shifts_utc_to_moscow() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        assert_eq!(encode_timestamp(&t), "Wed May 01 10:00:00 MSK 2024");
    }

    #[test]
    fn encode_is_zone_independent() {
        let utc = Utc.with_ymd_and_hms(2024, 12, 31, 21, 15, 0).unwrap();
        let in_msk = utc.with_timezone(&msk());
        let in_tokyo = utc.with_timezone(&FixedOffset::east_opt(9 * 3600).unwrap());

        let expected = "Wed Jan 01 00:15:00 MSK 2025";
        assert_eq!(encode_timestamp(&utc), expected);
        assert_eq!(encode_timestamp(&in_msk), expected);
        assert_eq!(encode_timestamp(&in_tokyo), expected);
    }

    #[test]
    fn decode_returns_moscow_offset() {
        let t = decode_timestamp("Wed May 01 10:00:00 MSK 2024").unwrap();
        assert_eq!(t.offset(), &msk());
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn decode_inverts_encode() {
        let t = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        assert_eq!(decode_timestamp(&encode_timestamp(&t)).unwrap(), t);
    }

    #[test]
    fn decode_rejects_malformed_text() {
        assert!(decode_timestamp("").is_err());
        assert!(decode_timestamp("2024-05-01T10:00:00").is_err());
        assert!(decode_timestamp("Wed May 01 10:00 MSK 2024").is_err());
        assert!(decode_timestamp("Wed May 01 25:00:00 MSK 2024").is_err());
        // Wrong zone literal
        assert!(decode_timestamp("Wed May 01 10:00:00 UTC 2024").is_err());
    }

    #[test]
    fn decode_rejects_inconsistent_weekday() {
        // 1 May 2024 was a Wednesday
        let err = decode_timestamp("Mon May 01 10:00:00 MSK 2024").unwrap_err();
        assert_eq!(err.text(), "Mon May 01 10:00:00 MSK 2024");
    }

    #[test]
    fn mask_replaces_time_of_day() {
        assert_eq!(
            DayKey::new(date(2024, 5, 1)).mask(),
            "Wed May 01 __:__:__ MSK 2024"
        );
        assert_eq!(
            DayKey::new(date(2024, 2, 29)).mask(),
            "Thu Feb 29 __:__:__ MSK 2024"
        );
    }

    #[test]
    fn mask_has_encoded_width() {
        let day = DayKey::new(date(2024, 5, 1));
        let encoded = encode_timestamp(&Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(day.mask().len(), encoded.len());
    }

    #[test]
    fn day_key_from_instant_uses_moscow_date() {
        let late_utc = Utc.with_ymd_and_hms(2024, 4, 30, 21, 0, 0).unwrap();
        assert_eq!(DayKey::of(&late_utc).date(), date(2024, 5, 1));

        let early_utc = Utc.with_ymd_and_hms(2024, 4, 30, 20, 59, 59).unwrap();
        assert_eq!(DayKey::from(early_utc).date(), date(2024, 4, 30));
    }

    #[test]
    fn day_key_from_naive_ignores_time() {
        let morning = date(2024, 5, 1).and_hms_opt(0, 0, 0).unwrap();
        let night = date(2024, 5, 1).and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(DayKey::from(morning), DayKey::from(night));
    }

    #[test]
    fn contains_is_half_open() {
        let day = DayKey::new(date(2024, 5, 1));
        let start = msk().from_local_datetime(&day.start()).unwrap();

        assert!(day.contains(&start));
        assert!(day.contains(&(start + Duration::hours(23) + Duration::minutes(59))));
        assert!(!day.contains(&(start + Duration::days(1))));
        assert!(!day.contains(&(start - Duration::seconds(1))));
    }

    #[test]
    fn end_of_representable_range() {
        assert!(DayKey::new(NaiveDate::MAX).end().is_none());
    }

    #[test]
    fn display_is_iso_date() {
        let day = DayKey::new(date(2024, 5, 1));
        assert_eq!(day.to_string(), "2024-05-01");
        assert_eq!(format!("{:?}", day), "DayKey(2024-05-01)");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// SQL `LIKE` semantics for patterns that only use `_` wildcards.
    fn like(text: &str, pattern: &str) -> bool {
        text.len() == pattern.len()
            && text
                .chars()
                .zip(pattern.chars())
                .all(|(t, p)| p == '_' || t == p)
    }

    fn day_strategy() -> impl Strategy<Value = NaiveDate> {
        (1990i32..2100, 1u32..=366).prop_filter_map("valid ordinal", |(y, o)| {
            NaiveDate::from_yo_opt(y, o)
        })
    }

    proptest! {
        /// Every time of day encodes to text the day mask matches
        #[test]
        fn mask_matches_whole_day(day in day_strategy(), secs in 0u32..86_400) {
            let key = DayKey::new(day);
            let local = day.and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap());
            let time = msk().from_local_datetime(&local).unwrap();
            prop_assert!(like(&encode_timestamp(&time), &key.mask()));
            prop_assert!(key.contains(&time));
        }

        /// A mask never matches a timestamp from another day
        #[test]
        fn mask_rejects_other_days(
            day in day_strategy(),
            other in day_strategy(),
            secs in 0u32..86_400,
        ) {
            prop_assume!(day != other);
            let local = other.and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap());
            let time = msk().from_local_datetime(&local).unwrap();
            prop_assert!(!like(&encode_timestamp(&time), &DayKey::new(day).mask()));
        }
    }
}
