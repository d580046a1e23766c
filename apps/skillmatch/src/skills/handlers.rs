//! Axum route handlers for the Skills API.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::skills::engine::{Provenance, Reconciliation};
use crate::skills::models::{Category, ReconciliationResult};
use crate::skills::reporter::{summarize, MatchReport};
use crate::skills::validator::ValidationReport;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

fn default_use_external() -> bool {
    true
}

/// Both skill sets are taken as raw JSON and coerced by the engine, so partial
/// or slightly malformed extraction output is still accepted.
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    #[serde(default)]
    pub cv: Value,
    #[serde(default)]
    pub jd: Value,
    #[serde(default = "default_use_external")]
    pub use_external: bool,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub reconciliation_id: Uuid,
    pub reconciled_at: DateTime<Utc>,
    pub provenance: Provenance,
    pub tables_version: &'static str,
    pub result: ReconciliationResult,
    pub report: MatchReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback_categories: Vec<Category>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cv_truncated: Vec<Category>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jd_truncated: Vec<Category>,
    /// Validation of the external proposal, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_validation: Option<ValidationReport>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/skills/reconcile
///
/// Reconciles a candidate skill set against a requirement skill set. Always
/// answers with an invariant-satisfying partition; only a non-object `cv` or
/// `jd` is rejected.
pub async fn handle_reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let Reconciliation {
        result,
        provenance,
        fallback_categories,
        cv_truncated,
        jd_truncated,
        validation,
    } = state
        .reconciler
        .reconcile(&request.cv, &request.jd, request.use_external)
        .await?;

    Ok(Json(ReconcileResponse {
        reconciliation_id: Uuid::new_v4(),
        reconciled_at: Utc::now(),
        provenance,
        tables_version: state.reconciler.tables_version(),
        report: summarize(&result),
        result,
        fallback_categories,
        cv_truncated,
        jd_truncated,
        proposal_validation: validation,
    }))
}
