//! Normalizer: canonicalizes raw skill strings and resolves duplicates within
//! and across categories.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;
use crate::skills::models::{Category, CategorySkills, RawSkillSet, SkillSet, SkillToken};

/// Default per-category cap applied after deduplication.
pub const DEFAULT_MAX_PER_CATEGORY: usize = 200;

/// Punctuation that carries meaning inside skill names ("C++", "C#", "Node.js").
const PRESERVED_PUNCTUATION: &[char] = &['+', '#', '.'];

/// Whole-token brand casing, checked before per-word casing.
const BRAND_PHRASES: &[(&str, &str)] = &[
    ("power bi", "Power BI"),
    ("node.js", "Node.js"),
    ("react.js", "React.js"),
    ("vue.js", "Vue.js"),
    ("next.js", "Next.js"),
    ("github actions", "GitHub Actions"),
    ("sql server", "SQL Server"),
    ("spring boot", "Spring Boot"),
    ("amazon web services", "Amazon Web Services"),
    ("google cloud platform", "Google Cloud Platform"),
    ("microsoft azure", "Microsoft Azure"),
];

/// Per-word brand casing exempted from case-folding.
const BRAND_WORDS: &[(&str, &str)] = &[
    ("sql", "SQL"),
    ("nosql", "NoSQL"),
    ("mysql", "MySQL"),
    ("postgresql", "PostgreSQL"),
    ("mongodb", "MongoDB"),
    ("graphql", "GraphQL"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("c++", "C++"),
    ("c#", "C#"),
    ("f#", "F#"),
    (".net", ".NET"),
    ("aws", "AWS"),
    ("gcp", "GCP"),
    ("api", "API"),
    ("apis", "APIs"),
    ("rest", "REST"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("bi", "BI"),
    ("etl", "ETL"),
    ("ml", "ML"),
    ("ai", "AI"),
    ("nlp", "NLP"),
    ("ci", "CI"),
    ("cd", "CD"),
    ("ui", "UI"),
    ("ux", "UX"),
    ("qa", "QA"),
    ("seo", "SEO"),
    ("saas", "SaaS"),
    ("devops", "DevOps"),
    ("github", "GitHub"),
    ("gitlab", "GitLab"),
    ("ios", "iOS"),
    ("macos", "macOS"),
    ("kyc", "KYC"),
    ("aml", "AML"),
    ("hipaa", "HIPAA"),
    ("k8s", "K8s"),
];

/// Lowercases, replaces stray punctuation with spaces and collapses whitespace.
/// Returns `None` when nothing meaningful remains.
fn canonical_text(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || PRESERVED_PUNCTUATION.contains(&c) {
                c
            } else {
                ' '
            }
        })
        .flat_map(char::to_lowercase)
        .collect();

    let words: Vec<&str> = cleaned
        .split_whitespace()
        .map(|w| w.trim_end_matches('.'))
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn apply_brand_casing(lowered: &str) -> String {
    if let Some((_, branded)) = BRAND_PHRASES.iter().find(|(phrase, _)| *phrase == lowered) {
        return branded.to_string();
    }
    lowered
        .split(' ')
        .map(|word| {
            BRAND_WORDS
                .iter()
                .find(|(w, _)| *w == word)
                .map(|(_, branded)| branded.to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compact comparison key: lowercase alphanumerics plus `+` and `#`.
///
/// "Power BI", "PowerBI" and "power-bi" all share the key `powerbi`.
pub fn skill_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == '+' || *c == '#')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalizes a single raw string into a token. Empty results are dropped.
pub fn normalize_token(raw: &str) -> Option<SkillToken> {
    let lowered = canonical_text(raw)?;
    let key = skill_key(&lowered);
    if key.is_empty() {
        return None;
    }
    Some(SkillToken {
        raw: raw.to_string(),
        normalized: apply_brand_casing(&lowered),
        key,
    })
}

/// Normalizes one category's raw strings: canonicalize, drop duplicates
/// (first occurrence wins), then truncate to `cap`.
///
/// Truncation keeps the `cap` alphabetically-first tokens, in their original
/// order, and sets the `truncated` flag.
pub fn normalize(raw: &[String], cap: usize) -> CategorySkills {
    let mut seen = HashSet::new();
    let mut tokens: Vec<SkillToken> = raw
        .iter()
        .filter_map(|r| normalize_token(r))
        .filter(|t| seen.insert(t.key.clone()))
        .collect();

    let truncated = tokens.len() > cap;
    if truncated {
        let mut keys: Vec<&str> = tokens.iter().map(|t| t.key.as_str()).collect();
        keys.sort_unstable();
        let kept: HashSet<String> = keys.into_iter().take(cap).map(str::to_string).collect();
        let before = tokens.len();
        tokens.retain(|t| kept.contains(&t.key));
        debug!("Truncated skill list from {} to {} tokens", before, tokens.len());
    }

    CategorySkills { tokens, truncated }
}

/// Removes tokens that appear in more than one category, keeping each only in
/// the first category of `priority` that contains it.
pub fn dedupe_categories(mut set: SkillSet, priority: &[Category]) -> SkillSet {
    let mut claimed: HashSet<String> = HashSet::new();
    for category in priority {
        let skills = set.get_mut(*category);
        let before = skills.len();
        skills.tokens.retain(|t| !claimed.contains(&t.key));
        if skills.len() < before {
            debug!(
                "Removed {} cross-category duplicate(s) from {}",
                before - skills.len(),
                category.key()
            );
        }
        claimed.extend(skills.tokens.iter().map(|t| t.key.clone()));
    }
    set
}

/// Normalizes all three categories and resolves cross-category collisions.
pub fn build_skill_set(raw: &RawSkillSet, cap: usize) -> SkillSet {
    let set = SkillSet {
        technical_skills: normalize(raw.get(Category::Technical), cap),
        soft_skills: normalize(raw.get(Category::Soft), cap),
        domain_keywords: normalize(raw.get(Category::Domain), cap),
    };
    dedupe_categories(set, &Category::PRIORITY)
}

/// Coerces an arbitrary JSON value into the skill-set shape.
///
/// Absent or non-array categories become empty lists and non-string entries are
/// dropped. Only a root that is not an object is rejected.
pub fn coerce_skill_set(value: &Value, label: &str) -> Result<RawSkillSet, AppError> {
    let obj = value.as_object().ok_or_else(|| {
        AppError::Validation(format!("{label} skill set must be a JSON object"))
    })?;

    let list = |category: Category| -> Vec<String> {
        obj.get(category.key())
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    Ok(RawSkillSet {
        technical_skills: list(Category::Technical),
        soft_skills: list(Category::Soft),
        domain_keywords: list(Category::Domain),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn names(skills: &CategorySkills) -> Vec<&str> {
        skills.tokens.iter().map(|t| t.normalized.as_str()).collect()
    }

    #[test]
    fn test_normalize_token_collapses_whitespace_and_lowercases() {
        let token = normalize_token("  Distributed    Systems ").unwrap();
        assert_eq!(token.normalized, "distributed systems");
        assert_eq!(token.key, "distributedsystems");
        assert_eq!(token.raw, "  Distributed    Systems ");
    }

    #[test]
    fn test_normalize_token_preserves_language_punctuation() {
        assert_eq!(normalize_token("c++").unwrap().normalized, "C++");
        assert_eq!(normalize_token("C#").unwrap().normalized, "C#");
        assert_eq!(normalize_token("NODE.JS").unwrap().normalized, "Node.js");
        assert_eq!(normalize_token(".net").unwrap().normalized, ".NET");
    }

    #[test]
    fn test_normalize_token_replaces_stray_punctuation() {
        assert_eq!(normalize_token("CI/CD").unwrap().normalized, "CI CD");
        assert_eq!(
            normalize_token("problem-solving!").unwrap().normalized,
            "problem solving"
        );
        assert_eq!(normalize_token("Python.").unwrap().normalized, "python");
    }

    #[test]
    fn test_normalize_token_brand_phrases() {
        assert_eq!(normalize_token("power bi").unwrap().normalized, "Power BI");
        assert_eq!(normalize_token("SQL").unwrap().normalized, "SQL");
        assert_eq!(
            normalize_token("rest apis").unwrap().normalized,
            "REST APIs"
        );
    }

    #[test]
    fn test_normalize_token_drops_empty() {
        assert!(normalize_token("   ").is_none());
        assert!(normalize_token("!!!").is_none());
        assert!(normalize_token("+ #").is_none());
    }

    #[test]
    fn test_skill_key_ignores_spacing_and_case() {
        assert_eq!(skill_key("Power BI"), skill_key("powerbi"));
        assert_eq!(skill_key("C++"), "c++");
        assert_ne!(skill_key("C++"), skill_key("C#"));
    }

    #[test]
    fn test_normalize_removes_duplicates_first_seen_order() {
        let skills = normalize(&strings(&["Leadership", "leadership", "Mentoring", "LEADERSHIP"]), 200);
        assert_eq!(names(&skills), vec!["leadership", "mentoring"]);
        assert!(!skills.truncated);
    }

    #[test]
    fn test_normalize_treats_spacing_variants_as_duplicates() {
        let skills = normalize(&strings(&["Power BI", "PowerBI", "power-bi"]), 200);
        assert_eq!(skills.len(), 1);
        assert_eq!(skills.tokens[0].normalized, "Power BI");
    }

    #[test]
    fn test_normalize_truncates_alphabetically_and_flags() {
        let skills = normalize(&strings(&["zig", "rust", "go", "ada"]), 2);
        assert!(skills.truncated);
        // Alphabetically-first survivors, original order kept.
        assert_eq!(names(&skills), vec!["go", "ada"]);
    }

    #[test]
    fn test_dedupe_categories_uses_priority() {
        let set = SkillSet {
            technical_skills: normalize(&strings(&["SQL", "Python"]), 200),
            soft_skills: normalize(&strings(&["sql", "Fintech", "Teamwork"]), 200),
            domain_keywords: normalize(&strings(&["fintech", "Python"]), 200),
        };
        let set = dedupe_categories(set, &Category::PRIORITY);
        assert_eq!(names(&set.technical_skills), vec!["SQL", "python"]);
        assert_eq!(names(&set.domain_keywords), vec!["fintech"]);
        assert_eq!(names(&set.soft_skills), vec!["teamwork"]);
    }

    #[test]
    fn test_coerce_skill_set_fills_absent_and_drops_non_strings() {
        let value = json!({
            "technical_skills": ["Rust", 42, null, "Go"],
            "soft_skills": "not a list"
        });
        let raw = coerce_skill_set(&value, "cv").unwrap();
        assert_eq!(raw.technical_skills, strings(&["Rust", "Go"]));
        assert!(raw.soft_skills.is_empty());
        assert!(raw.domain_keywords.is_empty());
    }

    #[test]
    fn test_coerce_skill_set_rejects_non_object() {
        let err = coerce_skill_set(&json!(["Rust"]), "jd").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("jd")));
        assert!(coerce_skill_set(&Value::Null, "cv").is_err());
    }

    #[test]
    fn test_build_skill_set_scenario_b_dedup() {
        let raw = RawSkillSet {
            soft_skills: strings(&["Leadership", "Leadership", "Mentoring"]),
            ..RawSkillSet::default()
        };
        let set = build_skill_set(&raw, DEFAULT_MAX_PER_CATEGORY);
        assert_eq!(set.soft_skills.len(), 2);
    }
}
