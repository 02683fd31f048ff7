use chrono::{DateTime, Local, TimeZone};
use std::collections::BTreeMap;
use std::fmt;

/// Partition key attribute holding the battery id
pub const ENTITY_ID_ATTR: &str = "TagID";
/// Sort key attribute holding unix seconds
pub const TIMESTAMP_ATTR: &str = "Timestamp";
/// Marker attribute set only on the newest record of each battery
pub const LATEST_ATTR: &str = "LATEST";
pub const HOUR_BUCKET_ATTR: &str = "TagID_TimeWindow_HOUR";
pub const DAY_BUCKET_ATTR: &str = "TagID_TimeWindow_DAY";
pub const MONTH_BUCKET_ATTR: &str = "TagID_TimeWindow_MONTH";

/// Attributes every record written by the ingestion pipeline must carry
pub const RESERVED_ATTRIBUTES: [&str; 6] = [
    ENTITY_ID_ATTR,
    TIMESTAMP_ATTR,
    LATEST_ATTR,
    HOUR_BUCKET_ATTR,
    DAY_BUCKET_ATTR,
    MONTH_BUCKET_ATTR,
];

/// Returns true if the attribute name is one of the reserved attributes
pub fn is_reserved(name: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&name)
}

/// A single attribute value as returned by the store
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    /// Numbers keep their decimal text so no precision is lost
    Number(String),
    Bool(bool),
    Null,
    /// Lists, maps, sets and binary values, kept as debug text
    Other(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets the value as whole seconds, truncating any fractional part
    pub fn as_i64(&self) -> Option<i64> {
        let text = match self {
            AttrValue::Number(n) => n.as_str(),
            AttrValue::Str(s) => s.as_str(),
            _ => return None,
        };
        let text = text.trim();
        text.parse::<i64>()
            .ok()
            .or_else(|| text.parse::<f64>().ok().map(|f| f.trunc() as i64))
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => write!(f, "{}", s),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Null => write!(f, "null"),
            AttrValue::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A stored observation keyed by (battery id, timestamp)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Builder-style helper for adding a string attribute
    pub fn with_str(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .insert(name.to_string(), AttrValue::Str(value.to_string()));
        self
    }

    /// Builder-style helper for adding a numeric attribute
    pub fn with_number(mut self, name: &str, value: impl ToString) -> Self {
        self.attributes
            .insert(name.to_string(), AttrValue::Number(value.to_string()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.get(ENTITY_ID_ATTR).and_then(AttrValue::as_str)
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.get(TIMESTAMP_ATTR).and_then(AttrValue::as_i64)
    }

    /// Timestamp decoded into the local time zone
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        self.timestamp()
            .and_then(|secs| Local.timestamp_opt(secs, 0).single())
    }

    /// Reserved attributes absent from this record, in declaration order
    pub fn missing_reserved(&self) -> Vec<&'static str> {
        RESERVED_ATTRIBUTES
            .iter()
            .copied()
            .filter(|name| !self.contains(name))
            .collect()
    }

    /// Measurement attributes, i.e. everything that is not reserved
    pub fn data_attributes(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.attributes.iter().filter(|(name, _)| !is_reserved(name))
    }
}

/// Formats a timestamp the way the report prints it
pub fn format_local(time: &DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_i64_handles_decimal_text() {
        assert_eq!(AttrValue::Number("1704067200".into()).as_i64(), Some(1704067200));
        assert_eq!(AttrValue::Number("1704067200.75".into()).as_i64(), Some(1704067200));
        assert_eq!(AttrValue::Bool(true).as_i64(), None);
        assert_eq!(AttrValue::Number("abc".into()).as_i64(), None);
    }

    #[test]
    fn test_missing_reserved_keeps_order() {
        let record = Record::new()
            .with_str(ENTITY_ID_ATTR, "BAT-TEST")
            .with_str(DAY_BUCKET_ATTR, "BAT-TEST#DAY_20240101");

        assert_eq!(
            record.missing_reserved(),
            vec![TIMESTAMP_ATTR, LATEST_ATTR, HOUR_BUCKET_ATTR, MONTH_BUCKET_ATTR]
        );
    }

    #[test]
    fn test_data_attributes_skip_reserved() {
        let record = Record::new()
            .with_str(ENTITY_ID_ATTR, "BAT-TEST")
            .with_number(TIMESTAMP_ATTR, 1704067200)
            .with_number("Voltage", 52.1)
            .with_str("State", "charging");

        let names: Vec<&String> = record.data_attributes().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["State", "Voltage"]);
    }
}
