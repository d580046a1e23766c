//! Reporter: pure aggregation of a valid partition into summary statistics and
//! a stable textual listing.

use std::fmt::Write;

use serde::Serialize;

use crate::skills::models::{Category, MatchRecord, ReconciliationResult, Summary};
use crate::skills::normalizer::skill_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub jd_count: usize,
    pub matched_count: usize,
    pub missing_count: usize,
    pub match_rate_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub categories: Vec<CategorySummary>,
    pub overall: Summary,
}

/// `round(100 * matched / max(total, 1))`.
pub fn match_rate(matched: usize, total: usize) -> u32 {
    (100.0 * matched as f64 / total.max(1) as f64).round() as u32
}

pub fn summarize(result: &ReconciliationResult) -> MatchReport {
    let categories: Vec<CategorySummary> = Category::ALL
        .iter()
        .map(|category| {
            let part = result.get(*category);
            let jd_count = part.processed_count();
            CategorySummary {
                category: *category,
                jd_count,
                matched_count: part.matched.len(),
                missing_count: part.missing.len(),
                match_rate_percentage: match_rate(part.matched.len(), jd_count),
            }
        })
        .collect();

    let total_jd_requirements: usize = categories.iter().map(|c| c.jd_count).sum();
    let total_matched: usize = categories.iter().map(|c| c.matched_count).sum();
    let total_missing: usize = categories.iter().map(|c| c.missing_count).sum();

    MatchReport {
        categories,
        overall: Summary {
            total_jd_requirements,
            total_matched,
            total_missing,
            match_rate_percentage: match_rate(total_matched, total_jd_requirements),
        },
    }
}

/// Recomputes the `summary` block carried by the result.
pub fn with_summary(mut result: ReconciliationResult) -> ReconciliationResult {
    result.summary = summarize(&result).overall;
    result
}

fn sorted_by_requirement(records: &[MatchRecord]) -> Vec<&MatchRecord> {
    let mut sorted: Vec<&MatchRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        skill_key(&a.jd_skill)
            .cmp(&skill_key(&b.jd_skill))
            .then_with(|| a.jd_skill.cmp(&b.jd_skill))
    });
    sorted
}

/// Plain-text listing: categories in fixed order, records sorted by requirement.
pub fn render_text(result: &ReconciliationResult) -> String {
    let report = summarize(result);
    let mut out = String::new();

    for summary in &report.categories {
        let part = result.get(summary.category);
        let _ = writeln!(
            out,
            "{}: {}/{} matched ({}%)",
            summary.category.key(),
            summary.matched_count,
            summary.jd_count,
            summary.match_rate_percentage
        );
        for record in sorted_by_requirement(&part.matched) {
            let _ = writeln!(
                out,
                "  + {} <- {} [{}, {:.2}]",
                record.jd_skill,
                record.cv_equivalent.as_deref().unwrap_or("?"),
                record.match_type.as_str(),
                record.confidence
            );
        }
        for record in sorted_by_requirement(&part.missing) {
            let _ = writeln!(out, "  - {}: {}", record.jd_skill, record.reasoning);
        }
    }

    let _ = write!(
        out,
        "overall: {}/{} matched ({}%)",
        report.overall.total_matched,
        report.overall.total_jd_requirements,
        report.overall.match_rate_percentage
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::models::{CategoryResult, MatchType};

    fn scenario_a() -> ReconciliationResult {
        let mut result = ReconciliationResult::default();
        result.technical_skills = CategoryResult {
            matched: vec![
                MatchRecord::matched("tableau", "Power BI", MatchType::DomainCluster, 0.7, "bi"),
                MatchRecord::matched("SQL", "SQL", MatchType::Exact, 1.0, "exact match"),
            ],
            missing: vec![MatchRecord::missing("python", "no equivalent found in CV")],
        };
        result
    }

    #[test]
    fn test_match_rate_rounds_and_guards_zero() {
        assert_eq!(match_rate(2, 3), 67);
        assert_eq!(match_rate(1, 3), 33);
        assert_eq!(match_rate(0, 0), 0);
        assert_eq!(match_rate(1, 8), 13);
    }

    #[test]
    fn test_summarize_counts() {
        let report = summarize(&scenario_a());
        let technical = &report.categories[0];
        assert_eq!(technical.category, Category::Technical);
        assert_eq!(technical.jd_count, 3);
        assert_eq!(technical.matched_count, 2);
        assert_eq!(technical.match_rate_percentage, 67);
        assert_eq!(report.categories[1].match_rate_percentage, 0);
        assert_eq!(
            report.overall,
            Summary {
                total_jd_requirements: 3,
                total_matched: 2,
                total_missing: 1,
                match_rate_percentage: 67,
            }
        );
    }

    #[test]
    fn test_with_summary_overwrites_stale_block() {
        let mut result = scenario_a();
        result.summary.total_matched = 42;
        let result = with_summary(result);
        assert_eq!(result.summary.total_matched, 2);
    }

    #[test]
    fn test_render_text_is_sorted_and_stable() {
        let text = render_text(&scenario_a());
        let expected = "\
technical_skills: 2/3 matched (67%)
  + SQL <- SQL [exact, 1.00]
  + tableau <- Power BI [domain_cluster, 0.70]
  - python: no equivalent found in CV
soft_skills: 0/0 matched (0%)
domain_keywords: 0/0 matched (0%)
overall: 2/3 matched (67%)";
        assert_eq!(text, expected);
        assert_eq!(text, render_text(&scenario_a()));
    }
}
