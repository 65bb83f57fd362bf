//! Record identifier generation

use chrono::Utc;
use uuid::Uuid;

use super::types::TurnRole;

/// Generates identifiers for message records
///
/// Injected into the pipeline so tests can pin identifiers without
/// touching the clock.
pub trait RecordIdGenerator: Send + Sync {
    fn next_id(&self, role: TurnRole) -> String;
}

/// Production generator: millisecond timestamp, a random token, and the
/// role tag
///
/// The random token keeps ids distinct when two turns land in the same
/// millisecond, so duplicate webhook deliveries always mint fresh ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockIdGenerator;

impl RecordIdGenerator for ClockIdGenerator {
    fn next_id(&self, role: TurnRole) -> String {
        let millis = Utc::now().timestamp_millis();
        let token = Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", millis, &token[..8], role.as_str())
    }
}
