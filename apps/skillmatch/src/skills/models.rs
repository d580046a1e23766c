//! Skill vocabularies and match partitions shared by every reconciliation stage.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Categories
// ────────────────────────────────────────────────────────────────────────────

/// The three fixed skill categories. Serialized with the wire key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "technical_skills")]
    Technical,
    #[serde(rename = "soft_skills")]
    Soft,
    #[serde(rename = "domain_keywords")]
    Domain,
}

impl Category {
    /// Output order for results and reports.
    pub const ALL: [Category; 3] = [Category::Technical, Category::Soft, Category::Domain];

    /// Cross-category collision priority: technical > domain > soft.
    pub const PRIORITY: [Category; 3] = [Category::Technical, Category::Domain, Category::Soft];

    pub fn key(&self) -> &'static str {
        match self {
            Category::Technical => "technical_skills",
            Category::Soft => "soft_skills",
            Category::Domain => "domain_keywords",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Skill vocabularies
// ────────────────────────────────────────────────────────────────────────────

/// A single skill as supplied by the extraction layer plus its canonical forms.
///
/// `normalized` is the display form (lowercase except allowlisted brand casing).
/// `key` is the compact comparison form: lowercase alphanumerics plus `+` and `#`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillToken {
    pub raw: String,
    pub normalized: String,
    pub key: String,
}

impl SkillToken {
    /// Lowercase words of the display form, used for overlap scoring.
    pub fn words(&self) -> impl Iterator<Item = String> + '_ {
        self.normalized.split_whitespace().map(str::to_lowercase)
    }
}

/// Ordered, duplicate-free tokens of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySkills {
    pub tokens: Vec<SkillToken>,
    /// Set when the category exceeded the configured cap and was truncated.
    pub truncated: bool,
}

impl CategorySkills {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn find(&self, key: &str) -> Option<&SkillToken> {
        self.tokens.iter().find(|t| t.key == key)
    }

    /// Tokens in alphabetical order of their comparison key.
    pub fn sorted(&self) -> Vec<&SkillToken> {
        let mut sorted: Vec<&SkillToken> = self.tokens.iter().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.normalized.cmp(&b.normalized)));
        sorted
    }

    /// Display forms in alphabetical order.
    pub fn sorted_names(&self) -> Vec<String> {
        self.sorted().into_iter().map(|t| t.normalized.clone()).collect()
    }
}

/// Raw, uncoerced skill lists as received from the extraction layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSkillSet {
    #[serde(default)]
    pub technical_skills: Vec<String>,
    #[serde(default)]
    pub soft_skills: Vec<String>,
    #[serde(default)]
    pub domain_keywords: Vec<String>,
}

impl RawSkillSet {
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Technical => &self.technical_skills,
            Category::Soft => &self.soft_skills,
            Category::Domain => &self.domain_keywords,
        }
    }
}

/// Normalized, deduplicated skills for all three categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet {
    pub technical_skills: CategorySkills,
    pub soft_skills: CategorySkills,
    pub domain_keywords: CategorySkills,
}

impl SkillSet {
    pub fn get(&self, category: Category) -> &CategorySkills {
        match category {
            Category::Technical => &self.technical_skills,
            Category::Soft => &self.soft_skills,
            Category::Domain => &self.domain_keywords,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut CategorySkills {
        match category {
            Category::Technical => &mut self.technical_skills,
            Category::Soft => &mut self.soft_skills,
            Category::Domain => &mut self.domain_keywords,
        }
    }

    pub fn total_len(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    /// Looks a key up across every category.
    pub fn find_any(&self, key: &str) -> Option<(Category, &SkillToken)> {
        Category::ALL
            .iter()
            .find_map(|c| self.get(*c).find(key).map(|t| (*c, t)))
    }

    pub fn truncated_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.get(*c).truncated)
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Match partitions
// ────────────────────────────────────────────────────────────────────────────

/// Strategy by which a JD requirement was judged covered (or `Missing`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Synonym,
    Hierarchical,
    DomainCluster,
    Fuzzy,
    Semantic,
    #[default]
    Missing,
}

impl MatchType {
    pub fn is_missing(&self) -> bool {
        matches!(self, MatchType::Missing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Synonym => "synonym",
            MatchType::Hierarchical => "hierarchical",
            MatchType::DomainCluster => "domain_cluster",
            MatchType::Fuzzy => "fuzzy",
            MatchType::Semantic => "semantic",
            MatchType::Missing => "missing",
        }
    }

    /// Accepts the wire names plus a few spellings classifiers tend to produce.
    pub fn parse_lenient(value: &str) -> Option<MatchType> {
        let normalized = value.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "exact" => Some(MatchType::Exact),
            "synonym" | "synonyms" => Some(MatchType::Synonym),
            "hierarchical" | "hierarchy" => Some(MatchType::Hierarchical),
            "domain_cluster" | "cluster" | "domain" => Some(MatchType::DomainCluster),
            "fuzzy" => Some(MatchType::Fuzzy),
            "semantic" => Some(MatchType::Semantic),
            "missing" | "none" => Some(MatchType::Missing),
            _ => None,
        }
    }
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

/// One JD requirement and how (or whether) the candidate covers it.
///
/// Missing records serialize as `{jd_skill, reasoning}` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub jd_skill: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_equivalent: Option<String>,
    #[serde(default, skip_serializing_if = "MatchType::is_missing")]
    pub match_type: MatchType,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl MatchRecord {
    pub fn matched(
        jd_skill: impl Into<String>,
        cv_equivalent: impl Into<String>,
        match_type: MatchType,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            jd_skill: jd_skill.into(),
            cv_equivalent: Some(cv_equivalent.into()),
            match_type,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
        }
    }

    pub fn missing(jd_skill: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            jd_skill: jd_skill.into(),
            cv_equivalent: None,
            match_type: MatchType::Missing,
            confidence: 0.0,
            reasoning: reasoning.into(),
        }
    }

    /// Demotes a matched record, keeping only its requirement.
    pub fn into_missing(self, reasoning: impl Into<String>) -> Self {
        Self::missing(self.jd_skill, reasoning)
    }
}

/// The matched/missing partition of one category's JD requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    #[serde(default)]
    pub matched: Vec<MatchRecord>,
    #[serde(default)]
    pub missing: Vec<MatchRecord>,
}

impl CategoryResult {
    pub fn processed_count(&self) -> usize {
        self.matched.len() + self.missing.len()
    }
}

/// Totals across all three categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_jd_requirements: usize,
    pub total_matched: usize,
    pub total_missing: usize,
    pub match_rate_percentage: u32,
}

/// The full reconciliation output handed to the scoring/reporting layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    #[serde(default)]
    pub technical_skills: CategoryResult,
    #[serde(default)]
    pub soft_skills: CategoryResult,
    #[serde(default)]
    pub domain_keywords: CategoryResult,
    #[serde(default)]
    pub summary: Summary,
}

impl ReconciliationResult {
    pub fn get(&self, category: Category) -> &CategoryResult {
        match category {
            Category::Technical => &self.technical_skills,
            Category::Soft => &self.soft_skills,
            Category::Domain => &self.domain_keywords,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut CategoryResult {
        match category {
            Category::Technical => &mut self.technical_skills,
            Category::Soft => &mut self.soft_skills,
            Category::Domain => &mut self.domain_keywords,
        }
    }

    /// Compares the three partitions, ignoring the summary block.
    pub fn same_partition(&self, other: &ReconciliationResult) -> bool {
        Category::ALL.iter().all(|c| self.get(*c) == other.get(*c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_with_wire_keys() {
        let json = serde_json::to_string(&Category::Domain).unwrap();
        assert_eq!(json, r#""domain_keywords""#);
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.key()));
        }
    }

    #[test]
    fn test_missing_record_serializes_without_match_fields() {
        let record = MatchRecord::missing("Python", "no equivalent found in CV");
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["jd_skill"], "Python");
        assert_eq!(obj["reasoning"], "no equivalent found in CV");
    }

    #[test]
    fn test_matched_record_serializes_all_fields() {
        let record = MatchRecord::matched("SQL", "SQL", MatchType::Exact, 1.0, "exact match");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["match_type"], "exact");
        assert_eq!(value["cv_equivalent"], "SQL");
        assert_eq!(value["confidence"], 1.0);
    }

    #[test]
    fn test_matched_record_clamps_confidence() {
        let record = MatchRecord::matched("a", "b", MatchType::Fuzzy, 1.7, "");
        assert_eq!(record.confidence, 1.0);
    }

    #[test]
    fn test_missing_record_round_trips_with_defaults() {
        let json = r#"{"jd_skill": "Kafka", "reasoning": "not listed"}"#;
        let record: MatchRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.match_type, MatchType::Missing);
        assert!(record.cv_equivalent.is_none());
        assert_eq!(record.confidence, 0.0);
    }

    #[test]
    fn test_match_type_parse_lenient() {
        assert_eq!(MatchType::parse_lenient("Domain Cluster"), Some(MatchType::DomainCluster));
        assert_eq!(MatchType::parse_lenient(" EXACT "), Some(MatchType::Exact));
        assert_eq!(MatchType::parse_lenient("hierarchy"), Some(MatchType::Hierarchical));
        assert_eq!(MatchType::parse_lenient("vibes"), None);
    }

    #[test]
    fn test_priority_order_is_technical_domain_soft() {
        assert_eq!(
            Category::PRIORITY,
            [Category::Technical, Category::Domain, Category::Soft]
        );
    }

    #[test]
    fn test_same_partition_ignores_summary() {
        let a = ReconciliationResult::default();
        let mut b = ReconciliationResult::default();
        b.summary.total_matched = 4;
        assert!(a.same_partition(&b));
    }
}
