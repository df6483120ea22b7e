//! Identifier minting and timestamps

use chrono::Utc;
use uuid::Uuid;

/// Mints primary keys for documents written without an `id`.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh, globally unique identifier or a reason it could not be made.
    fn generate(&self) -> Result<String, String>;
}

/// Random version-4 UUIDs in hyphenated form
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> Result<String, String> {
        Ok(Uuid::new_v4().to_string())
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
