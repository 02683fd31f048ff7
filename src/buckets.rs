use crate::record::{DAY_BUCKET_ATTR, HOUR_BUCKET_ATTR, MONTH_BUCKET_ATTR};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::fmt;

/// Time granularity of a secondary-index bucket key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hour,
    Day,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Hour, Granularity::Day, Granularity::Month];

    /// Tag used inside the bucket key, e.g. `HOUR`
    pub fn tag(&self) -> &'static str {
        match self {
            Granularity::Hour => "HOUR",
            Granularity::Day => "DAY",
            Granularity::Month => "MONTH",
        }
    }

    /// Record attribute holding the bucket key for this granularity
    pub fn attribute(&self) -> &'static str {
        match self {
            Granularity::Hour => HOUR_BUCKET_ATTR,
            Granularity::Day => DAY_BUCKET_ATTR,
            Granularity::Month => MONTH_BUCKET_ATTR,
        }
    }

    /// chrono format string of the period token
    pub fn period_format(&self) -> &'static str {
        match self {
            Granularity::Hour => "%Y%m%d%H",
            Granularity::Day => "%Y%m%d",
            Granularity::Month => "%Y%m",
        }
    }

    /// Lower-case label used in the printed report
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Month => "month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// The `<entity>#<GRANULARITY>_` prefix every bucket key of an entity starts with
pub fn expected_prefix(entity_id: &str, granularity: Granularity) -> String {
    format!("{}#{}_", entity_id, granularity.tag())
}

/// Checks a bucket value against the entity's expected prefix.
///
/// Matches the ingestion contract loosely: the prefix only has to appear
/// somewhere in the value.
pub fn is_well_formed(entity_id: &str, granularity: Granularity, value: &str) -> bool {
    value.contains(&expected_prefix(entity_id, granularity))
}

/// Builds the bucket key for an instant in any time zone
pub fn bucket_key<Tz>(entity_id: &str, granularity: Granularity, time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{}{}",
        expected_prefix(entity_id, granularity),
        time.format(granularity.period_format())
    )
}

/// Day bucket key for a calendar date, e.g. `BAT-0x440#DAY_20240101`
pub fn day_bucket_for_date(entity_id: &str, date: NaiveDate) -> String {
    format!(
        "{}{}",
        expected_prefix(entity_id, Granularity::Day),
        date.format(Granularity::Day.period_format())
    )
}

/// The three bucket keys the ingestion pipeline derives for a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBuckets {
    pub hour: String,
    pub day: String,
    pub month: String,
}

impl TimeBuckets {
    /// Derives the keys from unix seconds using local time, as the writer does
    pub fn for_timestamp(entity_id: &str, unix_seconds: i64) -> Option<Self> {
        let time = Local.timestamp_opt(unix_seconds, 0).single()?;
        Some(Self::for_time(entity_id, &time))
    }

    pub fn for_time<Tz>(entity_id: &str, time: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        TimeBuckets {
            hour: bucket_key(entity_id, Granularity::Hour, time),
            day: bucket_key(entity_id, Granularity::Day, time),
            month: bucket_key(entity_id, Granularity::Month, time),
        }
    }

    pub fn get(&self, granularity: Granularity) -> &str {
        match granularity {
            Granularity::Hour => &self.hour,
            Granularity::Day => &self.day,
            Granularity::Month => &self.month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_expected_prefix() {
        assert_eq!(expected_prefix("BAT-TEST", Granularity::Hour), "BAT-TEST#HOUR_");
        assert_eq!(expected_prefix("BAT-TEST", Granularity::Month), "BAT-TEST#MONTH_");
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("BAT-TEST", Granularity::Day, "BAT-TEST#DAY_20240101"));
        assert!(!is_well_formed("BAT-TEST", Granularity::Day, "WRONG#DAY_20240101"));
        // right entity, wrong granularity tag
        assert!(!is_well_formed("BAT-TEST", Granularity::Hour, "BAT-TEST#DAY_20240101"));
    }

    #[test]
    fn test_bucket_keys_for_utc_time() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 7, 30, 0).unwrap();
        let buckets = TimeBuckets::for_time("BAT-0x440", &time);

        assert_eq!(buckets.hour, "BAT-0x440#HOUR_2024010107");
        assert_eq!(buckets.day, "BAT-0x440#DAY_20240101");
        assert_eq!(buckets.month, "BAT-0x440#MONTH_202401");
        assert_eq!(buckets.get(Granularity::Day), "BAT-0x440#DAY_20240101");
    }

    #[test]
    fn test_day_bucket_for_date() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 9).unwrap();
        assert_eq!(day_bucket_for_date("BAT-TEST", date), "BAT-TEST#DAY_20241209");
    }

    #[test]
    fn test_for_timestamp_matches_local_time() {
        let secs = 1_704_067_200;
        let local = Local.timestamp_opt(secs, 0).unwrap();
        let buckets = TimeBuckets::for_timestamp("BAT-TEST", secs).unwrap();
        assert_eq!(buckets, TimeBuckets::for_time("BAT-TEST", &local));
    }
}
