//! Invariant Validator: checks a (possibly untrusted) partition against the
//! counting invariants derived from the deduplicated inputs.
//!
//! Hard violations make the report `ok == false`; soft findings are reported but
//! tolerated by `ok`. `is_consistent()` is the stricter acceptance test: every
//! invariant holds exactly.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::skills::models::{Category, ReconciliationResult, SkillSet};
use crate::skills::normalizer::skill_key;

/// A count mismatch becomes hard when it exceeds `max(0.5 * jd_count, 3)`.
const HARD_MISMATCH_RATIO: f64 = 0.5;
const HARD_MISMATCH_FLOOR: f64 = 3.0;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryValidation {
    pub category: Category,
    pub matched_count: usize,
    pub cv_limit: usize,
    pub processed_count: usize,
    pub jd_count: usize,
    /// Hard: more matches than the candidate has skills in this category.
    pub violates_cv_limit: bool,
    pub count_mismatch: bool,
    pub count_mismatch_hard: bool,
    /// Requirements that are not among this category's JD tokens.
    pub unknown_jd_skills: Vec<String>,
    /// Requirements listed more than once across matched and missing.
    pub duplicate_jd_skills: Vec<String>,
    /// Matched records whose CV equivalent is null or not a candidate skill.
    pub unknown_cv_skills: Vec<String>,
    /// CV skills used in this category that are also used elsewhere.
    pub reused_cv_skills: Vec<String>,
}

impl CategoryValidation {
    pub fn has_hard_violation(&self) -> bool {
        self.violates_cv_limit || self.count_mismatch_hard
    }

    pub fn has_soft_findings(&self) -> bool {
        self.count_mismatch
            || !self.unknown_jd_skills.is_empty()
            || !self.duplicate_jd_skills.is_empty()
            || !self.unknown_cv_skills.is_empty()
    }

    pub fn is_consistent(&self) -> bool {
        !self.violates_cv_limit && !self.has_soft_findings() && self.reused_cv_skills.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub categories: Vec<CategoryValidation>,
    /// CV skill keys used as `cv_equivalent` more than once across the result.
    pub reused_cv_skills: Vec<String>,
    pub ok: bool,
}

impl ValidationReport {
    pub fn category(&self, category: Category) -> Option<&CategoryValidation> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn is_consistent(&self) -> bool {
        self.reused_cv_skills.is_empty() && self.categories.iter().all(|c| c.is_consistent())
    }

    pub fn is_category_consistent(&self, category: Category) -> bool {
        self.category(category).is_some_and(|c| c.is_consistent())
    }

    pub fn log_findings(&self) {
        if !self.reused_cv_skills.is_empty() {
            warn!("CV skills used more than once: {:?}", self.reused_cv_skills);
        }
        for c in &self.categories {
            if c.violates_cv_limit {
                warn!(
                    "{}: {} matched exceeds {} CV skills",
                    c.category.key(),
                    c.matched_count,
                    c.cv_limit
                );
            }
            if c.count_mismatch_hard {
                warn!(
                    "{}: processed {} requirements, expected {}",
                    c.category.key(),
                    c.processed_count,
                    c.jd_count
                );
            } else if c.count_mismatch {
                debug!(
                    "{}: processed {} requirements, expected {}",
                    c.category.key(),
                    c.processed_count,
                    c.jd_count
                );
            }
            if !c.unknown_jd_skills.is_empty() {
                debug!("{}: unknown requirements {:?}", c.category.key(), c.unknown_jd_skills);
            }
            if !c.duplicate_jd_skills.is_empty() {
                debug!("{}: duplicate requirements {:?}", c.category.key(), c.duplicate_jd_skills);
            }
            if !c.unknown_cv_skills.is_empty() {
                debug!("{}: unknown CV equivalents {:?}", c.category.key(), c.unknown_cv_skills);
            }
        }
    }
}

fn is_hard_mismatch(processed: usize, jd_count: usize) -> bool {
    let diff = (processed as f64 - jd_count as f64).abs();
    diff > (HARD_MISMATCH_RATIO * jd_count as f64).max(HARD_MISMATCH_FLOOR)
}

/// Validates `result` against the deduplicated CV and JD skill sets.
pub fn validate(result: &ReconciliationResult, cv: &SkillSet, jd: &SkillSet) -> ValidationReport {
    // Usage count of every CV key across all categories.
    let mut cv_usage: HashMap<String, usize> = HashMap::new();
    for category in Category::ALL {
        for record in &result.get(category).matched {
            if let Some(cv_equivalent) = record.cv_equivalent.as_deref() {
                *cv_usage.entry(skill_key(cv_equivalent)).or_default() += 1;
            }
        }
    }
    let mut reused: Vec<String> = cv_usage
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(key, _)| key.clone())
        .collect();
    reused.sort_unstable();

    let categories: Vec<CategoryValidation> = Category::ALL
        .iter()
        .map(|category| {
            let part = result.get(*category);
            let jd_skills = jd.get(*category);
            let matched_count = part.matched.len();
            let cv_limit = cv.get(*category).len();
            let processed_count = part.processed_count();
            let jd_count = jd_skills.len();

            let mut seen = HashSet::new();
            let mut unknown_jd_skills = Vec::new();
            let mut duplicate_jd_skills = Vec::new();
            for record in part.matched.iter().chain(&part.missing) {
                let key = skill_key(&record.jd_skill);
                if jd_skills.find(&key).is_none() {
                    unknown_jd_skills.push(record.jd_skill.clone());
                } else if !seen.insert(key) {
                    duplicate_jd_skills.push(record.jd_skill.clone());
                }
            }

            let mut unknown_cv_skills = Vec::new();
            let mut reused_cv_skills = Vec::new();
            for record in &part.matched {
                match record.cv_equivalent.as_deref() {
                    Some(cv_equivalent) => {
                        let key = skill_key(cv_equivalent);
                        if cv.find_any(&key).is_none() {
                            unknown_cv_skills.push(cv_equivalent.to_string());
                        }
                        if reused.contains(&key) && !reused_cv_skills.contains(&key) {
                            reused_cv_skills.push(key);
                        }
                    }
                    None => unknown_cv_skills.push(format!("<none for {}>", record.jd_skill)),
                }
            }

            CategoryValidation {
                category: *category,
                matched_count,
                cv_limit,
                processed_count,
                jd_count,
                violates_cv_limit: matched_count > cv_limit,
                count_mismatch: processed_count != jd_count,
                count_mismatch_hard: is_hard_mismatch(processed_count, jd_count),
                unknown_jd_skills,
                duplicate_jd_skills,
                unknown_cv_skills,
                reused_cv_skills,
            }
        })
        .collect();

    let ok = reused.is_empty() && categories.iter().all(|c| !c.has_hard_violation());

    ValidationReport {
        categories,
        reused_cv_skills: reused,
        ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::models::{CategoryResult, MatchRecord, MatchType, RawSkillSet};
    use crate::skills::normalizer::{build_skill_set, DEFAULT_MAX_PER_CATEGORY};

    fn set(technical: &[&str], soft: &[&str]) -> SkillSet {
        build_skill_set(
            &RawSkillSet {
                technical_skills: technical.iter().map(|s| s.to_string()).collect(),
                soft_skills: soft.iter().map(|s| s.to_string()).collect(),
                domain_keywords: vec![],
            },
            DEFAULT_MAX_PER_CATEGORY,
        )
    }

    fn matched(jd: &str, cv: &str) -> MatchRecord {
        MatchRecord::matched(jd, cv, MatchType::Exact, 1.0, "")
    }

    fn missing(jd: &str) -> MatchRecord {
        MatchRecord::missing(jd, "")
    }

    #[test]
    fn test_consistent_result_passes() {
        let cv = set(&["SQL", "Power BI"], &[]);
        let jd = set(&["SQL", "Tableau", "Python"], &[]);
        let mut result = ReconciliationResult::default();
        result.technical_skills = CategoryResult {
            matched: vec![matched("SQL", "SQL"), matched("tableau", "Power BI")],
            missing: vec![missing("python")],
        };
        let report = validate(&result, &cv, &jd);
        assert!(report.ok);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_cv_limit_violation_is_hard() {
        let cv = set(&["Rust", "Go"], &[]);
        let jd = set(&["Kafka", "Docker", "Redis"], &[]);
        let mut result = ReconciliationResult::default();
        result.technical_skills.matched = vec![
            matched("Kafka", "Rust"),
            matched("Docker", "Go"),
            matched("Redis", "Rust"),
        ];
        let report = validate(&result, &cv, &jd);
        assert!(!report.ok);
        let technical = report.category(Category::Technical).unwrap();
        assert!(technical.violates_cv_limit);
        assert_eq!(report.reused_cv_skills, vec!["rust".to_string()]);
        assert_eq!(technical.reused_cv_skills, vec!["rust".to_string()]);
    }

    #[test]
    fn test_small_count_mismatch_is_soft() {
        let cv = set(&["Rust"], &[]);
        let jd = set(&["Kafka", "Docker", "Redis", "Rust"], &[]);
        let mut result = ReconciliationResult::default();
        result.technical_skills.matched = vec![matched("Rust", "Rust")];
        let report = validate(&result, &cv, &jd);
        let technical = report.category(Category::Technical).unwrap();
        assert!(technical.count_mismatch);
        assert!(!technical.count_mismatch_hard);
        assert!(report.ok);
        assert!(!report.is_consistent());
        assert!(!report.is_category_consistent(Category::Technical));
        assert!(report.is_category_consistent(Category::Soft));
    }

    #[test]
    fn test_large_count_mismatch_is_hard() {
        // 10 requirements, nothing processed: 10 > max(5, 3).
        let jd_skills: Vec<String> = (0..10).map(|i| format!("skill{i}")).collect();
        let refs: Vec<&str> = jd_skills.iter().map(String::as_str).collect();
        let jd = set(&refs, &[]);
        let report = validate(&ReconciliationResult::default(), &SkillSet::default(), &jd);
        assert!(report.category(Category::Technical).unwrap().count_mismatch_hard);
        assert!(!report.ok);
    }

    #[test]
    fn test_hard_mismatch_threshold() {
        // Small lists use the floor of 3.
        assert!(!is_hard_mismatch(0, 3));
        assert!(is_hard_mismatch(0, 4));
        assert!(is_hard_mismatch(7, 0));
        // Larger lists use half the requirement count.
        assert!(!is_hard_mismatch(4, 8));
        assert!(is_hard_mismatch(3, 8));
        assert!(!is_hard_mismatch(15, 10));
    }

    #[test]
    fn test_soft_content_findings() {
        let cv = set(&["Rust"], &["Teamwork"]);
        let jd = set(&["Go"], &["Leadership"]);
        let mut result = ReconciliationResult::default();
        result.technical_skills.matched = vec![matched("Go", "Haskell")];
        result.soft_skills = CategoryResult {
            matched: vec![MatchRecord {
                cv_equivalent: None,
                ..matched("leadership", "x")
            }],
            missing: vec![missing("Leadership"), missing("Charisma")],
        };
        let report = validate(&result, &cv, &jd);
        let technical = report.category(Category::Technical).unwrap();
        assert_eq!(technical.unknown_cv_skills, vec!["Haskell".to_string()]);

        let soft = report.category(Category::Soft).unwrap();
        assert_eq!(soft.unknown_jd_skills, vec!["Charisma".to_string()]);
        assert_eq!(soft.duplicate_jd_skills, vec!["Leadership".to_string()]);
        assert_eq!(soft.unknown_cv_skills.len(), 1);
        assert!(report.ok);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_cv_equivalent_from_other_category_is_known() {
        let cv = set(&["Python"], &["Mentoring"]);
        let jd = set(&["Coaching"], &[]);
        let mut result = ReconciliationResult::default();
        result.technical_skills.matched = vec![matched("coaching", "mentoring")];
        let report = validate(&result, &cv, &jd);
        assert!(report.is_consistent());
    }
}
