//! Repair Engine: deterministically turns an untrusted partition into one that
//! satisfies every counting invariant, falling back to the cascade per category
//! when repair alone cannot.
//!
//! Pipeline:
//! 1. `normalize_partition`: re-key records onto known tokens, drop unknown and
//!    duplicate requirements, demote unavailable or reused CV equivalents, cap
//!    matches at the CV limit, append unaccounted requirements, trim overflow.
//! 2. `finalize`: enforce exact-match priority, re-validate, and recompute any
//!    still-inconsistent category with the cascade.
//!
//! `repair` is idempotent.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::skills::cascade::{MatchingCascade, EXACT_CONFIDENCE};
use crate::skills::models::{
    Category, CategoryResult, MatchRecord, MatchType, ReconciliationResult, SkillSet,
};
use crate::skills::normalizer::skill_key;
use crate::skills::reporter::with_summary;
use crate::skills::validator::validate;

pub const REASON_CV_UNAVAILABLE: &str = "CV equivalent unavailable or already used";
pub const REASON_CV_LIMIT: &str = "moved from matched due to CV skills limit";
pub const REASON_UNACCOUNTED: &str = "not accounted for in response";
pub const REASON_EXACT_REASSIGNED: &str = "CV skill reassigned to an exact match";

/// A repaired result plus the categories that had to be recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub result: ReconciliationResult,
    pub fallback_categories: Vec<Category>,
}

fn cv_key(record: &MatchRecord) -> Option<String> {
    record.cv_equivalent.as_deref().map(skill_key)
}

// ────────────────────────────────────────────────────────────────────────────
// Structural repair
// ────────────────────────────────────────────────────────────────────────────

/// Sanitizes every category and applies the CV-limit and unaccounted steps.
///
/// Categories are processed in output order; a CV token is available to the
/// first record that claims it.
pub fn normalize_partition(
    result: &ReconciliationResult,
    cv: &SkillSet,
    jd: &SkillSet,
) -> ReconciliationResult {
    let mut used_cv: HashSet<String> = HashSet::new();
    let mut repaired = ReconciliationResult::default();

    for category in Category::ALL {
        let proposal = result.get(category);
        let jd_skills = jd.get(category);
        let cv_limit = cv.get(category).len();
        let mut seen_jd: HashSet<String> = HashSet::new();

        let mut matched: Vec<MatchRecord> = Vec::new();
        let mut unavailable: Vec<MatchRecord> = Vec::new();
        for record in &proposal.matched {
            let Some(jd_token) = jd_skills.find(&skill_key(&record.jd_skill)) else {
                continue;
            };
            if !seen_jd.insert(jd_token.key.clone()) {
                continue;
            }
            let cv_token = cv_key(record)
                .and_then(|key| cv.find_any(&key).map(|(_, token)| token))
                .filter(|token| !used_cv.contains(&token.key));
            match cv_token {
                Some(cv_token) => {
                    used_cv.insert(cv_token.key.clone());
                    let match_type = if record.match_type.is_missing() {
                        MatchType::Semantic
                    } else {
                        record.match_type
                    };
                    matched.push(MatchRecord {
                        jd_skill: jd_token.normalized.clone(),
                        cv_equivalent: Some(cv_token.normalized.clone()),
                        match_type,
                        confidence: record.confidence.clamp(0.0, 1.0),
                        reasoning: record.reasoning.clone(),
                    });
                }
                None => unavailable.push(MatchRecord::missing(
                    jd_token.normalized.clone(),
                    REASON_CV_UNAVAILABLE,
                )),
            }
        }

        let mut missing = unavailable;
        for record in &proposal.missing {
            let Some(jd_token) = jd_skills.find(&skill_key(&record.jd_skill)) else {
                continue;
            };
            if seen_jd.insert(jd_token.key.clone()) {
                missing.push(MatchRecord::missing(
                    jd_token.normalized.clone(),
                    record.reasoning.clone(),
                ));
            }
        }

        if matched.len() > cv_limit {
            let overflow = matched.split_off(cv_limit);
            debug!(
                "{}: moving {} matches over the CV limit to missing",
                category.key(),
                overflow.len()
            );
            for record in overflow {
                if let Some(key) = cv_key(&record) {
                    used_cv.remove(&key);
                }
                missing.push(record.into_missing(REASON_CV_LIMIT));
            }
        }

        for jd_token in jd_skills.sorted() {
            if !seen_jd.contains(&jd_token.key) {
                missing.push(MatchRecord::missing(
                    jd_token.normalized.clone(),
                    REASON_UNACCOUNTED,
                ));
            }
        }

        let keep_missing = jd_skills.len().saturating_sub(matched.len());
        missing.truncate(keep_missing);

        *repaired.get_mut(category) = CategoryResult { matched, missing };
    }

    repaired
}

/// Guarantees every JD token with an exact same-category CV counterpart is
/// matched to it as `exact` with confidence 1.0.
pub fn enforce_exact_matches(
    mut result: ReconciliationResult,
    cv: &SkillSet,
    jd: &SkillSet,
) -> ReconciliationResult {
    for category in Category::ALL {
        for jd_token in jd.get(category).sorted() {
            let Some(cv_token) = cv.get(category).find(&jd_token.key) else {
                continue;
            };

            // Release the CV token from any other requirement using it.
            for other in Category::ALL {
                let part = result.get_mut(other);
                let (taken, kept): (Vec<MatchRecord>, Vec<MatchRecord>) =
                    std::mem::take(&mut part.matched).into_iter().partition(|r| {
                        cv_key(r).as_deref() == Some(cv_token.key.as_str())
                            && !(other == category && skill_key(&r.jd_skill) == jd_token.key)
                    });
                part.matched = kept;
                part.missing.extend(
                    taken
                        .into_iter()
                        .map(|r| r.into_missing(REASON_EXACT_REASSIGNED)),
                );
            }

            let part = result.get_mut(category);
            part.missing
                .retain(|r| skill_key(&r.jd_skill) != jd_token.key);

            let exact = MatchRecord::matched(
                jd_token.normalized.clone(),
                cv_token.normalized.clone(),
                MatchType::Exact,
                EXACT_CONFIDENCE,
                "exact match",
            );
            match part
                .matched
                .iter_mut()
                .find(|r| skill_key(&r.jd_skill) == jd_token.key)
            {
                Some(existing)
                    if existing.match_type == MatchType::Exact
                        && existing.confidence == EXACT_CONFIDENCE
                        && cv_key(existing).as_deref() == Some(cv_token.key.as_str()) => {}
                Some(existing) => *existing = exact,
                None => part.matched.push(exact),
            }
        }
    }
    result
}

// ────────────────────────────────────────────────────────────────────────────
// Finalization
// ────────────────────────────────────────────────────────────────────────────

/// Enforces exact priority, re-validates, and substitutes the cascade's output
/// for every category that is still inconsistent.
pub fn finalize(
    result: ReconciliationResult,
    cv: &SkillSet,
    jd: &SkillSet,
    cascade: &MatchingCascade,
) -> RepairOutcome {
    let mut result = enforce_exact_matches(result, cv, jd);
    let report = validate(&result, cv, jd);
    let mut fallback_categories = Vec::new();

    for category in Category::ALL {
        if report.is_category_consistent(category) {
            continue;
        }
        // CV tokens already used by the other categories stay unavailable.
        let mut consumed: HashSet<String> = Category::ALL
            .iter()
            .filter(|c| **c != category)
            .flat_map(|c| result.get(*c).matched.iter().filter_map(cv_key))
            .collect();
        *result.get_mut(category) =
            cascade.match_category(jd.get(category), cv.get(category), &mut consumed);
        fallback_categories.push(category);
    }

    if !fallback_categories.is_empty() {
        info!(
            "Substituted cascade output for {:?}",
            fallback_categories
                .iter()
                .map(Category::key)
                .collect::<Vec<_>>()
        );
    }

    RepairOutcome {
        result: with_summary(result),
        fallback_categories,
    }
}

pub fn repair_with_outcome(
    result: &ReconciliationResult,
    cv: &SkillSet,
    jd: &SkillSet,
    cascade: &MatchingCascade,
) -> RepairOutcome {
    finalize(normalize_partition(result, cv, jd), cv, jd, cascade)
}

/// Repairs `result` into a partition satisfying every invariant.
pub fn repair(
    result: &ReconciliationResult,
    cv: &SkillSet,
    jd: &SkillSet,
    cascade: &MatchingCascade,
) -> ReconciliationResult {
    repair_with_outcome(result, cv, jd, cascade).result
}
