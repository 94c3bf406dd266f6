use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

/// Running ingestion statistics for a single job.
///
/// The stored document also carries `input_record_count`, which is derived
/// from the other counters on write and ignored on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DataCounts {
    pub job_id: String,
    #[serde(default)]
    pub processed_record_count: u64,
    #[serde(default)]
    pub processed_field_count: u64,
    #[serde(default)]
    pub input_bytes: u64,
    #[serde(default)]
    pub input_field_count: u64,
    #[serde(default)]
    pub invalid_date_count: u64,
    #[serde(default)]
    pub missing_field_count: u64,
    #[serde(default)]
    pub out_of_order_timestamp_count: u64,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub earliest_record_timestamp: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub latest_record_timestamp: Option<DateTime<Utc>>,
}

impl DataCounts {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Self::default()
        }
    }

    /// Records seen by the pipeline, whether or not they were processed.
    pub fn input_record_count(&self) -> u64 {
        self.processed_record_count
            .saturating_add(self.out_of_order_timestamp_count)
            .saturating_add(self.invalid_date_count)
    }

    pub fn increment_processed_record_count(&mut self, n: u64) {
        self.processed_record_count = self.processed_record_count.saturating_add(n);
    }

    pub fn increment_processed_field_count(&mut self, n: u64) {
        self.processed_field_count = self.processed_field_count.saturating_add(n);
    }

    pub fn increment_input_bytes(&mut self, n: u64) {
        self.input_bytes = self.input_bytes.saturating_add(n);
    }

    pub fn increment_input_field_count(&mut self, n: u64) {
        self.input_field_count = self.input_field_count.saturating_add(n);
    }

    pub fn increment_invalid_date_count(&mut self, n: u64) {
        self.invalid_date_count = self.invalid_date_count.saturating_add(n);
    }

    pub fn increment_missing_field_count(&mut self, n: u64) {
        self.missing_field_count = self.missing_field_count.saturating_add(n);
    }

    pub fn increment_out_of_order_timestamp_count(&mut self, n: u64) {
        self.out_of_order_timestamp_count = self.out_of_order_timestamp_count.saturating_add(n);
    }

    /// Recomputes the processed field count from the number of analysis
    /// fields each record carries. Never goes below zero.
    pub fn calc_processed_field_count(&mut self, fields_per_record: u64) {
        self.processed_field_count = self
            .processed_record_count
            .saturating_mul(fields_per_record)
            .saturating_sub(self.missing_field_count);
    }

    /// Widens the timestamp bounds to include `ts`.
    pub fn update_record_timestamp(&mut self, ts: DateTime<Utc>) {
        if self.earliest_record_timestamp.is_none_or(|earliest| ts < earliest) {
            self.earliest_record_timestamp = Some(ts);
        }
        if self.latest_record_timestamp.is_none_or(|latest| ts > latest) {
            self.latest_record_timestamp = Some(ts);
        }
    }
}

impl Serialize for DataCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("DataCounts", 11)?;
        doc.serialize_field("job_id", &self.job_id)?;
        doc.serialize_field("processed_record_count", &self.processed_record_count)?;
        doc.serialize_field("processed_field_count", &self.processed_field_count)?;
        doc.serialize_field("input_bytes", &self.input_bytes)?;
        doc.serialize_field("input_field_count", &self.input_field_count)?;
        doc.serialize_field("invalid_date_count", &self.invalid_date_count)?;
        doc.serialize_field("missing_field_count", &self.missing_field_count)?;
        doc.serialize_field(
            "out_of_order_timestamp_count",
            &self.out_of_order_timestamp_count,
        )?;
        doc.serialize_field("input_record_count", &self.input_record_count())?;

        match self.earliest_record_timestamp {
            Some(ts) => doc.serialize_field("earliest_record_timestamp", &ts.timestamp_millis())?,
            None => doc.skip_field("earliest_record_timestamp")?,
        }
        match self.latest_record_timestamp {
            Some(ts) => doc.serialize_field("latest_record_timestamp", &ts.timestamp_millis())?,
            None => doc.skip_field("latest_record_timestamp")?,
        }

        doc.end()
    }
}
