//! # Engine Metrics
//!
//! Prometheus metrics for match throughput and contention.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! rush-engine = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `rush_matches_created_total` - Counter of matches created (by type)
//! - `rush_matches_started_total` - Counter of matches that reached ACTIVE
//! - `rush_matches_finished_total` - Counter of finished matches (by outcome)
//! - `rush_submissions_accepted_total` - Counter of ledger entries appended (by kind)
//! - `rush_submissions_rejected_total` - Counter of rejected commands (by reason)
//! - `rush_duplicate_submissions_total` - Counter of collapsed duplicate submissions
//! - `rush_write_conflicts_total` - Counter of optimistic-write collisions
//! - `rush_rating_settlements_total` - Counter of rating settlements (by result)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Matches created, labeled by type
    pub static ref MATCHES_CREATED: IntCounterVec = register_int_counter_vec!(
        "rush_matches_created_total",
        "Total number of matches created",
        &["type"]
    )
    .expect("Failed to create MATCHES_CREATED metric");

    /// Matches that reached ACTIVE
    pub static ref MATCHES_STARTED: IntCounter = register_int_counter!(
        "rush_matches_started_total",
        "Total number of matches started"
    )
    .expect("Failed to create MATCHES_STARTED metric");

    /// Finished matches, labeled by outcome
    pub static ref MATCHES_FINISHED: IntCounterVec = register_int_counter_vec!(
        "rush_matches_finished_total",
        "Total number of matches finished",
        &["outcome"]
    )
    .expect("Failed to create MATCHES_FINISHED metric");

    /// Ledger entries appended, labeled by kind
    pub static ref SUBMISSIONS_ACCEPTED: IntCounterVec = register_int_counter_vec!(
        "rush_submissions_accepted_total",
        "Total number of ledger entries appended",
        &["kind"]
    )
    .expect("Failed to create SUBMISSIONS_ACCEPTED metric");

    /// Rejected commands, labeled by reason
    pub static ref SUBMISSIONS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "rush_submissions_rejected_total",
        "Total number of commands rejected",
        &["reason"]
    )
    .expect("Failed to create SUBMISSIONS_REJECTED metric");

    /// Duplicate submissions collapsed to no-ops
    pub static ref DUPLICATE_SUBMISSIONS: IntCounter = register_int_counter!(
        "rush_duplicate_submissions_total",
        "Total number of duplicate submissions collapsed"
    )
    .expect("Failed to create DUPLICATE_SUBMISSIONS metric");

    /// Optimistic-write collisions
    pub static ref WRITE_CONFLICTS: IntCounter = register_int_counter!(
        "rush_write_conflicts_total",
        "Total number of optimistic write conflicts"
    )
    .expect("Failed to create WRITE_CONFLICTS metric");

    /// Rating settlements, labeled by result
    pub static ref RATING_SETTLEMENTS: IntCounterVec = register_int_counter_vec!(
        "rush_rating_settlements_total",
        "Total number of rating settlements",
        &["result"]
    )
    .expect("Failed to create RATING_SETTLEMENTS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_match_created(match_type: &str) {
    MATCHES_CREATED.with_label_values(&[match_type]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_match_started() {
    MATCHES_STARTED.inc();
}

/// `outcome` is one of `completed`, `deadline`, `abandoned`, `cancelled`
#[cfg(feature = "metrics")]
pub fn record_match_finished(outcome: &str) {
    MATCHES_FINISHED.with_label_values(&[outcome]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_submission_accepted(kind: &str) {
    SUBMISSIONS_ACCEPTED.with_label_values(&[kind]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_submission_rejected(reason: &str) {
    SUBMISSIONS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_duplicate_submission() {
    DUPLICATE_SUBMISSIONS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_write_conflict() {
    WRITE_CONFLICTS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_rating_settlement(result: &str) {
    RATING_SETTLEMENTS.with_label_values(&[result]).inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature is disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_match_created(_match_type: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_match_started() {}

#[cfg(not(feature = "metrics"))]
pub fn record_match_finished(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_submission_accepted(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_submission_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_duplicate_submission() {}

#[cfg(not(feature = "metrics"))]
pub fn record_write_conflict() {}

#[cfg(not(feature = "metrics"))]
pub fn record_rating_settlement(_result: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_never_panics() {
        record_match_created("BLITZ");
        record_match_started();
        record_match_finished("completed");
        record_submission_accepted("level_complete");
        record_submission_rejected("out_of_order");
        record_duplicate_submission();
        record_write_conflict();
        record_rating_settlement("applied");
    }
}
