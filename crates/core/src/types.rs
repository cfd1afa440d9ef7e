/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Credit amounts and balances. Stored as BIGINT; never negative in a
/// committed balance.
pub type Credits = i64;
