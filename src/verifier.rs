use crate::buckets::{day_bucket_for_date, is_well_formed, Granularity, TimeBuckets};
use crate::config::{
    VerifierConfig, DEFAULT_DAILY_INDEX, DEFAULT_LATEST_INDEX, DEFAULT_LATEST_MARKER,
};
use crate::record::{format_local, AttrValue, Record, DAY_BUCKET_ATTR, LATEST_ATTR};
use crate::store::{EntityRangeQuery, IndexQuery, RecordStore};
use chrono::{DateTime, Local};
use std::fmt;
use tracing::{debug, info};

/// Number of records fetched from each secondary index
pub const INDEX_SAMPLE_LIMIT: u32 = 3;
/// Number of measurement attributes shown per record
pub const SAMPLE_ATTRIBUTE_LIMIT: usize = 5;

/// Index names and checks that are not part of a single query
#[derive(Debug, Clone, PartialEq)]
pub struct VerifierOptions {
    pub latest_index: String,
    pub daily_index: String,
    pub latest_marker: String,
    /// Also compare bucket period tokens with the record's own timestamp
    pub strict_buckets: bool,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        VerifierOptions {
            latest_index: DEFAULT_LATEST_INDEX.to_string(),
            daily_index: DEFAULT_DAILY_INDEX.to_string(),
            latest_marker: DEFAULT_LATEST_MARKER.to_string(),
            strict_buckets: false,
        }
    }
}

impl From<&VerifierConfig> for VerifierOptions {
    fn from(config: &VerifierConfig) -> Self {
        VerifierOptions {
            latest_index: config.latest_index.clone(),
            daily_index: config.daily_index.clone(),
            latest_marker: config.latest_marker.clone(),
            strict_buckets: config.strict_buckets,
        }
    }
}

/// Outcome of checking one bucket attribute
#[derive(Debug, Clone, PartialEq)]
pub enum BucketStatus {
    WellFormed,
    /// The `<entity>#<GRANULARITY>_` prefix is missing
    Malformed,
    /// Prefix is fine but the period does not match the record timestamp
    PeriodMismatch { expected: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketCheck {
    pub granularity: Granularity,
    pub value: String,
    pub status: BucketStatus,
}

impl BucketCheck {
    pub fn passed(&self) -> bool {
        self.status == BucketStatus::WellFormed
    }
}

/// Validation result for a single record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordReport {
    pub timestamp: Option<i64>,
    pub local_time: Option<DateTime<Local>>,
    pub missing: Vec<&'static str>,
    pub buckets: Vec<BucketCheck>,
    pub sample: Vec<(String, AttrValue)>,
    pub data_attribute_count: usize,
}

impl RecordReport {
    /// Missing attributes plus failed bucket checks
    pub fn warning_count(&self) -> usize {
        self.missing.len() + self.buckets.iter().filter(|b| !b.passed()).count()
    }
}

impl fmt::Display for RecordReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.timestamp, &self.local_time) {
            (Some(ts), Some(time)) => writeln!(f, "  Timestamp: {} ({})", ts, format_local(time))?,
            (Some(ts), None) => writeln!(f, "  Timestamp: {} (out of range)", ts)?,
            _ => writeln!(f, "  Timestamp: Not found")?,
        }

        if self.missing.is_empty() {
            writeln!(f, "  ✓ All required time bucket attributes present")?;
        } else {
            writeln!(
                f,
                "  WARNING: Missing required attributes: {}",
                self.missing.join(", ")
            )?;
        }

        for check in &self.buckets {
            let label = check.granularity.label();
            match &check.status {
                BucketStatus::WellFormed => {
                    writeln!(f, "  ✓ {} bucket format correct: {}", capitalize(label), check.value)?
                }
                BucketStatus::Malformed => {
                    writeln!(f, "  WARNING: Unexpected {} bucket format: {}", label, check.value)?
                }
                BucketStatus::PeriodMismatch { expected } => writeln!(
                    f,
                    "  WARNING: {} bucket does not match record timestamp: {} (expected {})",
                    capitalize(label),
                    check.value,
                    expected
                )?,
            }
        }

        if !self.sample.is_empty() {
            writeln!(
                f,
                "  Data attributes sample ({} total):",
                self.data_attribute_count
            )?;
            for (name, value) in &self.sample {
                writeln!(f, "    - {}: {}", name, value)?;
            }
        }
        Ok(())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Checks one record against the reserved-attribute and bucket-format contract
pub fn validate_record(entity_id: &str, record: &Record, strict_buckets: bool) -> RecordReport {
    let timestamp = record.timestamp();
    let derived = if strict_buckets {
        timestamp.and_then(|ts| TimeBuckets::for_timestamp(entity_id, ts))
    } else {
        None
    };

    let mut buckets = Vec::new();
    for granularity in Granularity::ALL {
        let Some(value) = record.get(granularity.attribute()) else {
            continue;
        };
        let value = value.to_string();

        let status = if !is_well_formed(entity_id, granularity, &value) {
            BucketStatus::Malformed
        } else {
            match &derived {
                Some(expected) if expected.get(granularity) != value => {
                    BucketStatus::PeriodMismatch {
                        expected: expected.get(granularity).to_string(),
                    }
                }
                _ => BucketStatus::WellFormed,
            }
        };

        buckets.push(BucketCheck {
            granularity,
            value,
            status,
        });
    }

    let mut data_attribute_count = 0;
    let mut sample = Vec::new();
    for (name, value) in record.data_attributes() {
        data_attribute_count += 1;
        if sample.len() < SAMPLE_ATTRIBUTE_LIMIT {
            sample.push((name.clone(), value.clone()));
        }
    }

    RecordReport {
        timestamp,
        local_time: record.local_time(),
        missing: record.missing_reserved(),
        buckets,
        sample,
        data_attribute_count,
    }
}

/// Result of the recent-records check
#[derive(Debug, Clone, PartialEq)]
pub enum RecentOutcome {
    Found(Vec<RecordReport>),
    Empty,
    Failed(String),
}

/// A record listed from a secondary index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub entity_id: Option<String>,
    pub local_time: Option<DateTime<Local>>,
}

impl IndexEntry {
    fn from_record(record: &Record) -> Self {
        IndexEntry {
            entity_id: record.entity_id().map(str::to_string),
            local_time: record.local_time(),
        }
    }
}

impl fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entity = self.entity_id.as_deref().unwrap_or("<no TagID>");
        match &self.local_time {
            Some(time) => write!(f, "{} at {}", entity, format_local(time)),
            None => write!(f, "{} - timestamp not found", entity),
        }
    }
}

/// Result of one secondary-index query
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    Found(Vec<IndexEntry>),
    Empty,
    Failed(String),
}

/// Results of both secondary-index checks
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub latest: IndexOutcome,
    pub daily_key: String,
    pub daily: IndexOutcome,
}

/// Runs the read-only checks against a record store and prints the report
pub struct Verifier<S: RecordStore> {
    store: S,
    options: VerifierOptions,
    fixed_now: Option<DateTime<Local>>,
}

impl<S: RecordStore> Verifier<S> {
    pub fn new(store: S, options: VerifierOptions) -> Self {
        Verifier {
            store,
            options,
            fixed_now: None,
        }
    }

    /// Pins the clock, used for the query window and today's bucket key
    pub fn with_fixed_now(mut self, now: DateTime<Local>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    fn now(&self) -> DateTime<Local> {
        self.fixed_now.unwrap_or_else(Local::now)
    }

    /// Queries the newest records of an entity inside the window and validates them
    pub async fn inspect_recent(
        &self,
        entity_id: &str,
        window_secs: u64,
        limit: u32,
    ) -> RecentOutcome {
        let window = i64::try_from(window_secs).unwrap_or(i64::MAX);
        let start_time = self.now().timestamp().saturating_sub(window);
        info!(entity = entity_id, start_time, limit, "checking recent records");

        let query = EntityRangeQuery {
            entity_id: entity_id.to_string(),
            after_timestamp: start_time,
            limit,
            newest_first: true,
        };

        match self.store.query_entity_range(&query).await {
            Ok(records) if records.is_empty() => RecentOutcome::Empty,
            Ok(records) => RecentOutcome::Found(
                records
                    .iter()
                    .map(|record| validate_record(entity_id, record, self.options.strict_buckets))
                    .collect(),
            ),
            Err(e) => {
                debug!(error = ?e, ?query, "recent records query failed");
                RecentOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    /// Prints the recent-records report; true iff at least one record was found.
    ///
    /// Attribute and bucket warnings are reported but do not change the result.
    pub async fn check_recent(&self, entity_id: &str, window_secs: u64, limit: u32) -> bool {
        println!("\n===== Checking Latest Items for {} =====", entity_id);

        match self.inspect_recent(entity_id, window_secs, limit).await {
            RecentOutcome::Empty => {
                println!(
                    "No recent data found for {} in the last {} seconds",
                    entity_id, window_secs
                );
                false
            }
            RecentOutcome::Failed(message) => {
                println!("Error querying table: {}", message);
                false
            }
            RecentOutcome::Found(reports) => {
                println!("Found {} recent items", reports.len());
                for (i, report) in reports.iter().enumerate() {
                    println!("\nItem {}:", i + 1);
                    print!("{}", report);
                }
                true
            }
        }
    }

    /// Newest records carrying the latest marker
    pub async fn inspect_latest_index(&self) -> IndexOutcome {
        let query = IndexQuery {
            index_name: self.options.latest_index.clone(),
            key_attribute: LATEST_ATTR.to_string(),
            key_value: self.options.latest_marker.clone(),
            limit: INDEX_SAMPLE_LIMIT,
            newest_first: true,
        };
        self.run_index_query(&query).await
    }

    /// Today's day-bucket key for an entity, using the local date
    pub fn today_day_bucket(&self, entity_id: &str) -> String {
        day_bucket_for_date(entity_id, self.now().date_naive())
    }

    /// Records filed under today's day bucket of an entity
    pub async fn inspect_daily_index(&self, entity_id: &str) -> IndexOutcome {
        let query = IndexQuery {
            index_name: self.options.daily_index.clone(),
            key_attribute: DAY_BUCKET_ATTR.to_string(),
            key_value: self.today_day_bucket(entity_id),
            limit: INDEX_SAMPLE_LIMIT,
            newest_first: false,
        };
        self.run_index_query(&query).await
    }

    async fn run_index_query(&self, query: &IndexQuery) -> IndexOutcome {
        match self.store.query_index(query).await {
            Ok(records) if records.is_empty() => IndexOutcome::Empty,
            Ok(records) => IndexOutcome::Found(records.iter().map(IndexEntry::from_record).collect()),
            Err(e) => {
                debug!(error = ?e, ?query, "index query failed");
                IndexOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    /// Runs both index checks; a failure in one never skips the other
    pub async fn inspect_indexes(&self, entity_id: &str) -> IndexReport {
        let latest = self.inspect_latest_index().await;
        let daily = self.inspect_daily_index(entity_id).await;
        IndexReport {
            latest,
            daily_key: self.today_day_bucket(entity_id),
            daily,
        }
    }

    /// Prints the secondary-index report
    pub async fn check_indexes(&self, entity_id: &str) {
        println!("\n===== Checking Global Secondary Indexes =====");

        let latest_index = &self.options.latest_index;
        println!("\nQuerying {}...", latest_index);
        match self.inspect_latest_index().await {
            IndexOutcome::Empty => println!("No data found in {}", latest_index),
            IndexOutcome::Failed(message) => {
                println!("Error querying {}: {}", latest_index, message)
            }
            IndexOutcome::Found(entries) => {
                println!("Found {} items in {}", entries.len(), latest_index);
                println!("Latest items:");
                print_entries(&entries);
            }
        }

        let daily_index = &self.options.daily_index;
        println!(
            "\nQuerying {} for today ({})...",
            daily_index,
            self.today_day_bucket(entity_id)
        );
        match self.inspect_daily_index(entity_id).await {
            IndexOutcome::Empty => println!("No data found in {} for today", daily_index),
            IndexOutcome::Failed(message) => {
                println!("Error querying {}: {}", daily_index, message)
            }
            IndexOutcome::Found(entries) => {
                println!("Found {} items in {} for today", entries.len(), daily_index);
                println!("Sample items:");
                print_entries(&entries);
            }
        }
    }
}

fn print_entries(entries: &[IndexEntry]) {
    for (i, entry) in entries.iter().enumerate() {
        println!("  {}. {}", i + 1, entry);
    }
}
