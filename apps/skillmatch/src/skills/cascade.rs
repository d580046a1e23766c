//! Matching Cascade: deterministic multi-strategy matcher between the JD and CV
//! tokens of one category.
//!
//! Algorithm:
//! 1. Reservation pass: every JD token with an exact CV counterpart takes it.
//! 2. Remaining JD tokens, in alphabetical order, try six strategies in fixed
//!    priority and stop at the first one yielding a candidate:
//!    exact → synonym → hierarchical → domain cluster → fuzzy → semantic.
//! 3. Within the winning strategy the highest-confidence CV token wins, ties
//!    broken alphabetically; the winner is consumed for the rest of the call.
//!
//! The consumed set is owned by the caller, so a category can be recomputed while
//! excluding CV tokens already used elsewhere in a result.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::skills::models::{
    Category, CategoryResult, CategorySkills, MatchRecord, MatchType, ReconciliationResult,
    SkillSet, SkillToken,
};
use crate::skills::tables::SkillTables;

pub const EXACT_CONFIDENCE: f64 = 1.0;
pub const SYNONYM_CONFIDENCE: f64 = 0.9;
pub const HIERARCHY_CONFIDENCE: f64 = 0.85;
pub const REVERSE_HIERARCHY_CONFIDENCE: f64 = 0.7;

const CLUSTER_WEIGHT: f64 = 0.7;
const CLUSTER_OVERLAP_WEIGHT: f64 = 0.3;

pub const FUZZY_THRESHOLD: f64 = 0.85;
const FUZZY_SCALE: f64 = 0.8;

const SEMANTIC_DOMAIN_WEIGHT: f64 = 0.6;
const SEMANTIC_OVERLAP_WEIGHT: f64 = 0.4;
pub const SEMANTIC_THRESHOLD: f64 = 0.7;
const SEMANTIC_SCALE: f64 = 0.7;

pub const REASON_NO_EQUIVALENT: &str = "no equivalent found in CV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Exact,
    Synonym,
    Hierarchical,
    DomainCluster,
    Fuzzy,
    Semantic,
}

const CASCADE: [Strategy; 6] = [
    Strategy::Exact,
    Strategy::Synonym,
    Strategy::Hierarchical,
    Strategy::DomainCluster,
    Strategy::Fuzzy,
    Strategy::Semantic,
];

impl Strategy {
    fn match_type(&self) -> MatchType {
        match self {
            Strategy::Exact => MatchType::Exact,
            Strategy::Synonym => MatchType::Synonym,
            Strategy::Hierarchical => MatchType::Hierarchical,
            Strategy::DomainCluster => MatchType::DomainCluster,
            Strategy::Fuzzy => MatchType::Fuzzy,
            Strategy::Semantic => MatchType::Semantic,
        }
    }
}

struct Candidate<'a> {
    cv: &'a SkillToken,
    confidence: f64,
    reasoning: String,
}

impl Candidate<'_> {
    fn beats(&self, other: &Candidate<'_>) -> bool {
        self.confidence > other.confidence
            || (self.confidence == other.confidence && self.cv.key < other.cv.key)
    }
}

/// Rounds to three decimals so confidences serialize stably.
fn round_confidence(value: f64) -> f64 {
    (value.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

/// Jaccard overlap of the lowercase word sets of two tokens.
pub fn word_overlap(a: &SkillToken, b: &SkillToken) -> f64 {
    let left: HashSet<String> = a.words().collect();
    let right: HashSet<String> = b.words().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// The deterministic oracle matcher. Cheap to clone; tables are shared.
#[derive(Clone)]
pub struct MatchingCascade {
    tables: Arc<SkillTables>,
}

impl MatchingCascade {
    pub fn new(tables: Arc<SkillTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &SkillTables {
        &self.tables
    }

    /// Matches every category with one consumed set shared across the call.
    pub fn match_all(&self, cv: &SkillSet, jd: &SkillSet) -> ReconciliationResult {
        let mut consumed = HashSet::new();
        let mut result = ReconciliationResult::default();
        for category in Category::ALL {
            *result.get_mut(category) =
                self.match_category(jd.get(category), cv.get(category), &mut consumed);
        }
        result
    }

    /// Matches one category. CV tokens whose key is in `consumed` are unavailable;
    /// every winner is added to it.
    pub fn match_category(
        &self,
        jd: &CategorySkills,
        cv: &CategorySkills,
        consumed: &mut HashSet<String>,
    ) -> CategoryResult {
        if jd.is_empty() {
            return CategoryResult::default();
        }
        let jd_sorted = jd.sorted();

        // Exact matches are reserved before any weaker strategy can take the token.
        let mut reserved: HashMap<&str, MatchRecord> = HashMap::new();
        for jd_token in &jd_sorted {
            if let Some(cv_token) = cv.find(&jd_token.key) {
                if consumed.insert(cv_token.key.clone()) {
                    reserved.insert(
                        jd_token.key.as_str(),
                        MatchRecord::matched(
                            jd_token.normalized.clone(),
                            cv_token.normalized.clone(),
                            MatchType::Exact,
                            EXACT_CONFIDENCE,
                            "exact match",
                        ),
                    );
                }
            }
        }

        let mut result = CategoryResult::default();
        for jd_token in jd_sorted {
            if let Some(record) = reserved.remove(jd_token.key.as_str()) {
                result.matched.push(record);
                continue;
            }

            let available = cv.tokens.iter().filter(|t| !consumed.contains(&t.key));
            match self.first_strategy_hit(jd_token, available) {
                Some((strategy, candidate)) => {
                    debug!(
                        "Cascade matched '{}' -> '{}' via {:?} ({:.3})",
                        jd_token.normalized, candidate.cv.normalized, strategy, candidate.confidence
                    );
                    consumed.insert(candidate.cv.key.clone());
                    result.matched.push(MatchRecord::matched(
                        jd_token.normalized.clone(),
                        candidate.cv.normalized.clone(),
                        strategy.match_type(),
                        round_confidence(candidate.confidence),
                        candidate.reasoning,
                    ));
                }
                None => {
                    let reasoning = self.missing_reasoning(jd_token, cv, consumed);
                    result
                        .missing
                        .push(MatchRecord::missing(jd_token.normalized.clone(), reasoning));
                }
            }
        }
        result
    }

    /// Walks the cascade and returns the winner of the first strategy with any hit.
    fn first_strategy_hit<'a>(
        &self,
        jd: &SkillToken,
        pool: impl Iterator<Item = &'a SkillToken> + Clone,
    ) -> Option<(Strategy, Candidate<'a>)> {
        CASCADE.iter().find_map(|strategy| {
            self.best_candidate(*strategy, jd, pool.clone())
                .map(|c| (*strategy, c))
        })
    }

    fn best_candidate<'a>(
        &self,
        strategy: Strategy,
        jd: &SkillToken,
        pool: impl Iterator<Item = &'a SkillToken>,
    ) -> Option<Candidate<'a>> {
        let mut best: Option<Candidate<'a>> = None;
        for cv in pool {
            if let Some(candidate) = self.evaluate(strategy, jd, cv) {
                if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn evaluate<'a>(
        &self,
        strategy: Strategy,
        jd: &SkillToken,
        cv: &'a SkillToken,
    ) -> Option<Candidate<'a>> {
        let (confidence, reasoning) = match strategy {
            Strategy::Exact => {
                if jd.key != cv.key {
                    return None;
                }
                (EXACT_CONFIDENCE, "exact match".to_string())
            }
            Strategy::Synonym => {
                if !self.tables.are_synonyms(&jd.key, &cv.key) {
                    return None;
                }
                (
                    SYNONYM_CONFIDENCE,
                    format!("'{}' is a synonym of '{}'", cv.normalized, jd.normalized),
                )
            }
            Strategy::Hierarchical => {
                if self.tables.implies(&cv.key, &jd.key) {
                    (
                        HIERARCHY_CONFIDENCE,
                        format!("'{}' implies '{}'", cv.normalized, jd.normalized),
                    )
                } else if self.tables.implies(&jd.key, &cv.key) {
                    (
                        REVERSE_HIERARCHY_CONFIDENCE,
                        format!(
                            "'{}' is a specialization of '{}'",
                            jd.normalized, cv.normalized
                        ),
                    )
                } else {
                    return None;
                }
            }
            Strategy::DomainCluster => {
                if jd.key == cv.key {
                    return None;
                }
                let clusters = self.tables.shared_clusters(&jd.key, &cv.key);
                let first = clusters.first()?;
                (
                    CLUSTER_WEIGHT + CLUSTER_OVERLAP_WEIGHT * word_overlap(jd, cv),
                    format!("both belong to the '{first}' cluster"),
                )
            }
            Strategy::Fuzzy => {
                let similarity = strsim::normalized_levenshtein(
                    &jd.normalized.to_lowercase(),
                    &cv.normalized.to_lowercase(),
                );
                if similarity <= FUZZY_THRESHOLD {
                    return None;
                }
                (
                    similarity * FUZZY_SCALE,
                    format!("similar spelling (similarity {similarity:.2})"),
                )
            }
            Strategy::Semantic => {
                let score = self.semantic_score(jd, cv);
                if score <= SEMANTIC_THRESHOLD {
                    return None;
                }
                (
                    score * SEMANTIC_SCALE,
                    format!("related by domain and shared terms (score {score:.2})"),
                )
            }
        };
        Some(Candidate {
            cv,
            confidence,
            reasoning,
        })
    }

    /// `0.6 * domain overlap + 0.4 * word Jaccard`.
    fn semantic_score(&self, jd: &SkillToken, cv: &SkillToken) -> f64 {
        let jd_domains = self.tables.domains_of(jd);
        let cv_domains = self.tables.domains_of(cv);
        let union: BTreeSet<&str> = jd_domains.union(&cv_domains).copied().collect();
        let domain_overlap = if union.is_empty() {
            0.0
        } else {
            jd_domains.intersection(&cv_domains).count() as f64 / union.len() as f64
        };
        SEMANTIC_DOMAIN_WEIGHT * domain_overlap + SEMANTIC_OVERLAP_WEIGHT * word_overlap(jd, cv)
    }

    /// Names the consumed CV token that would have matched, if any.
    fn missing_reasoning(
        &self,
        jd: &SkillToken,
        cv: &CategorySkills,
        consumed: &HashSet<String>,
    ) -> String {
        let taken = cv.tokens.iter().filter(|t| consumed.contains(&t.key));
        match self.first_strategy_hit(jd, taken) {
            Some((strategy, candidate)) => format!(
                "{} candidate '{}' is already matched to another requirement",
                strategy.match_type().as_str(),
                candidate.cv.normalized
            ),
            None => REASON_NO_EQUIVALENT.to_string(),
        }
    }
}
