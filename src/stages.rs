//! Pipeline stage identifiers.
//!
//! Stages are checkpoint codes embedded in a message's `ingestion_context`.
//! Stage 770 is the pipeline's declared failure stage and short-circuits any
//! poll that observes it.

/// Stage the pipeline reports when processing has failed.
pub const FAILURE_STAGE: &str = "770";

/// Extraction completed.
pub const STAGE_EXTRACTION: &str = "800";
/// Standardization completed.
pub const STAGE_STANDARDIZATION: &str = "1200";
/// Validation completed.
pub const STAGE_VALIDATION: &str = "1701";
/// Completed request for submission.
pub const STAGE_REQUEST_COMPLETE: &str = "1900";
/// Completed request for submission (TechRate).
pub const STAGE_REQUEST_COMPLETE_TECHRATE: &str = "1901";
/// Submission completed/submitted from the data warehouse.
pub const STAGE_SUBMITTED: &str = "2200";
/// Submission completed/submitted from the data warehouse (TechRate).
pub const STAGE_SUBMITTED_TECHRATE: &str = "2201";

/// Human-readable milestone text for well-known stages, used in progress
/// logging when a poll reaches its target.
pub fn milestone(stage: &str) -> Option<&'static str> {
    match stage {
        STAGE_EXTRACTION => Some("Extraction completed"),
        STAGE_STANDARDIZATION => Some("Standardization completed"),
        STAGE_VALIDATION => Some("Validation completed"),
        STAGE_REQUEST_COMPLETE => Some("Completed request for submission"),
        STAGE_REQUEST_COMPLETE_TECHRATE => Some("Completed request for submission (TechRate)"),
        STAGE_SUBMITTED => Some("Submission completed/submitted from SDW"),
        STAGE_SUBMITTED_TECHRATE => Some("Submission completed/submitted from SDW (TechRate)"),
        _ => None,
    }
}
