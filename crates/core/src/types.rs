/// Scan identifiers are UUIDs assigned at submission time.
pub type ScanId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
