//! Reconciler: runs the control flow for one reconciliation call:
//! normalize → {cascade, external proposal} → validate → repair → summarize.
//!
//! The cascade always runs (on the blocking pool) concurrently with the external
//! call; it is the answer whenever no proposal arrives, and the per-category
//! fallback when a proposal cannot be repaired.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::skills::cascade::MatchingCascade;
use crate::skills::external::ExternalMatcher;
use crate::skills::models::{Category, ReconciliationResult, SkillSet};
use crate::skills::normalizer::{build_skill_set, coerce_skill_set, skill_key};
use crate::skills::repair::{normalize_partition, repair_with_outcome};
use crate::skills::reporter::{render_text, with_summary};
use crate::skills::tables::SkillTables;
use crate::skills::validator::{validate, ValidationReport};

/// Where the returned partition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// No proposal; the cascade's output.
    Cascade,
    /// The proposal, accepted unchanged.
    External,
    /// The proposal, modified to satisfy the invariants.
    Repaired,
    /// At least one category was recomputed by the cascade.
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub result: ReconciliationResult,
    pub provenance: Provenance,
    pub fallback_categories: Vec<Category>,
    /// Validation of the raw proposal, when one was received.
    pub validation: Option<ValidationReport>,
    pub cv_truncated: Vec<Category>,
    pub jd_truncated: Vec<Category>,
}

pub struct SkillReconciler {
    cascade: MatchingCascade,
    matcher: Arc<dyn ExternalMatcher>,
    max_per_category: usize,
}

impl SkillReconciler {
    pub fn new(
        tables: Arc<SkillTables>,
        matcher: Arc<dyn ExternalMatcher>,
        max_per_category: usize,
    ) -> Self {
        Self {
            cascade: MatchingCascade::new(tables),
            matcher,
            max_per_category,
        }
    }

    pub fn tables_version(&self) -> &'static str {
        self.cascade.tables().version()
    }

    pub fn matcher_backend(&self) -> &'static str {
        self.matcher.backend()
    }

    /// Coerces both inputs and builds their normalized skill sets.
    pub fn prepare(&self, cv: &Value, jd: &Value) -> Result<(SkillSet, SkillSet), AppError> {
        let cv = coerce_skill_set(cv, "cv")?;
        let jd = coerce_skill_set(jd, "jd")?;
        Ok((
            build_skill_set(&cv, self.max_per_category),
            build_skill_set(&jd, self.max_per_category),
        ))
    }

    /// Reconciles one CV/JD pair. Fails only when an input root is not an object.
    pub async fn reconcile(
        &self,
        cv: &Value,
        jd: &Value,
        use_external: bool,
    ) -> Result<Reconciliation, AppError> {
        let (cv_set, jd_set) = self.prepare(cv, jd)?;

        // CPU-bound cascade on the blocking pool, concurrently with the external call.
        let cascade = self.cascade.clone();
        let (cv_owned, jd_owned) = (cv_set.clone(), jd_set.clone());
        let oracle_task =
            tokio::task::spawn_blocking(move || cascade.match_all(&cv_owned, &jd_owned));
        let proposal_task = async {
            if use_external {
                self.matcher.propose(&cv_set, &jd_set).await
            } else {
                None
            }
        };
        let (oracle, proposal) = tokio::join!(oracle_task, proposal_task);
        let oracle = oracle.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed in cascade: {e}"))
        })?;

        let reconciliation = match proposal {
            Some(proposal) => self.reconcile_proposal(proposal, &oracle, &cv_set, &jd_set),
            None => Reconciliation {
                result: with_summary(oracle),
                provenance: Provenance::Cascade,
                fallback_categories: Vec::new(),
                validation: None,
                cv_truncated: cv_set.truncated_categories(),
                jd_truncated: jd_set.truncated_categories(),
            },
        };

        info!(
            "Reconciled {} requirements via {:?}: {} matched ({}%)",
            reconciliation.result.summary.total_jd_requirements,
            reconciliation.provenance,
            reconciliation.result.summary.total_matched,
            reconciliation.result.summary.match_rate_percentage
        );
        debug!("Reconciliation listing:\n{}", render_text(&reconciliation.result));

        Ok(reconciliation)
    }

    fn reconcile_proposal(
        &self,
        proposal: ReconciliationResult,
        oracle: &ReconciliationResult,
        cv: &SkillSet,
        jd: &SkillSet,
    ) -> Reconciliation {
        let report = validate(&proposal, cv, jd);
        report.log_findings();

        let outcome = repair_with_outcome(&proposal, cv, jd, &self.cascade);

        let provenance = if !outcome.fallback_categories.is_empty() {
            Provenance::Fallback
        } else if report.is_consistent()
            && outcome
                .result
                .same_partition(&normalize_partition(&proposal, cv, jd))
        {
            Provenance::External
        } else {
            Provenance::Repaired
        };

        debug!(
            "External proposal agrees with cascade on {}/{} matched requirements",
            agreement(&outcome.result, oracle),
            Category::ALL
                .iter()
                .map(|c| oracle.get(*c).matched.len())
                .sum::<usize>()
        );

        Reconciliation {
            result: outcome.result,
            provenance,
            fallback_categories: outcome.fallback_categories,
            validation: Some(report),
            cv_truncated: cv.truncated_categories(),
            jd_truncated: jd.truncated_categories(),
        }
    }
}

/// Number of matched requirements the two results pair with the same CV skill.
fn agreement(result: &ReconciliationResult, oracle: &ReconciliationResult) -> usize {
    Category::ALL
        .iter()
        .map(|c| {
            let oracle_matched = &oracle.get(*c).matched;
            result
                .get(*c)
                .matched
                .iter()
                .filter(|r| {
                    oracle_matched.iter().any(|o| {
                        skill_key(&o.jd_skill) == skill_key(&r.jd_skill)
                            && o.cv_equivalent.as_deref().map(skill_key)
                                == r.cv_equivalent.as_deref().map(skill_key)
                    })
                })
                .count()
        })
        .sum()
}
