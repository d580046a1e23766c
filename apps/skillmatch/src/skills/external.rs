//! External Matcher Adapter: asks the classification collaborator for a proposed
//! partition and coerces its answer into the `ReconciliationResult` shape.
//!
//! The proposal is untrusted: only structure is coerced here. Content is checked
//! by the validator and fixed by the repair engine. Every failure (transport,
//! timeout, unparsable text) resolves to `None`.
//!
//! `SkillReconciler` holds an `Arc<dyn ExternalMatcher>`, chosen at startup via config.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::llm_client::prompts::CLOSED_VOCABULARY_INSTRUCTION;
use crate::llm_client::{strip_json_fences, LlmClient};
use crate::skills::models::{
    Category, CategoryResult, MatchRecord, MatchType, ReconciliationResult, SkillSet,
};
use crate::skills::prompts::{SKILL_MATCH_PROMPT_TEMPLATE, SKILL_MATCH_SYSTEM};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Source of proposed partitions. Implement this to swap collaborators without
/// touching the reconciler or the handler.
#[async_trait]
pub trait ExternalMatcher: Send + Sync {
    /// Returns a structurally coerced proposal, or `None` when no usable answer
    /// was produced. Never fails.
    async fn propose(&self, cv: &SkillSet, jd: &SkillSet) -> Option<ReconciliationResult>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// DisabledMatcher
// ────────────────────────────────────────────────────────────────────────────

/// Used when no API key is configured or the collaborator is switched off.
pub struct DisabledMatcher;

#[async_trait]
impl ExternalMatcher for DisabledMatcher {
    async fn propose(&self, _cv: &SkillSet, _jd: &SkillSet) -> Option<ReconciliationResult> {
        None
    }

    fn backend(&self) -> &'static str {
        "disabled"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmSkillMatcher
// ────────────────────────────────────────────────────────────────────────────

/// Proposes partitions via Claude.
pub struct LlmSkillMatcher {
    llm: LlmClient,
    timeout: Duration,
}

impl LlmSkillMatcher {
    pub fn new(llm: LlmClient, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl ExternalMatcher for LlmSkillMatcher {
    async fn propose(&self, cv: &SkillSet, jd: &SkillSet) -> Option<ReconciliationResult> {
        if jd.total_len() == 0 {
            debug!("No JD requirements, skipping external matcher");
            return None;
        }

        let prompt = build_prompt(cv, jd);

        let text = match tokio::time::timeout(
            self.timeout,
            self.llm.call_text(&prompt, SKILL_MATCH_SYSTEM),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("External matcher call failed: {}", e);
                return None;
            }
            Err(_) => {
                warn!(
                    "External matcher timed out after {}ms",
                    self.timeout.as_millis()
                );
                return None;
            }
        };

        let Some(value) = parse_proposal(&text) else {
            warn!("External matcher response was not a JSON object, ignoring it");
            return None;
        };
        coerce_proposal(&value)
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

fn sorted_lists(set: &SkillSet) -> Value {
    let mut map = Map::new();
    for category in Category::ALL {
        map.insert(
            category.key().to_string(),
            json!(set.get(category).sorted_names()),
        );
    }
    Value::Object(map)
}

fn count_rules(cv: &SkillSet, jd: &SkillSet) -> String {
    Category::ALL
        .iter()
        .map(|c| {
            format!(
                "- {}: exactly {} requirements in total; at most {} matched.",
                c.key(),
                jd.get(*c).len(),
                cv.get(*c).len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn build_prompt(cv: &SkillSet, jd: &SkillSet) -> String {
    let cv_json = serde_json::to_string_pretty(&sorted_lists(cv)).unwrap_or_default();
    let jd_json = serde_json::to_string_pretty(&sorted_lists(jd)).unwrap_or_default();
    SKILL_MATCH_PROMPT_TEMPLATE
        .replace("{closed_vocabulary_instruction}", CLOSED_VOCABULARY_INSTRUCTION)
        .replace("{count_rules}", &count_rules(cv, jd))
        .replace("{cv_json}", &cv_json)
        .replace("{jd_json}", &jd_json)
}

// ────────────────────────────────────────────────────────────────────────────
// Response parsing
// ────────────────────────────────────────────────────────────────────────────

type ProposalParser = fn(&str) -> Option<Value>;

/// Tried in order; the first parser yielding a JSON object wins.
const PARSERS: &[(&str, ProposalParser)] = &[
    ("direct", parse_direct),
    ("fenced", parse_fenced),
    ("embedded", parse_embedded),
];

fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text.trim())
        .ok()
        .filter(Value::is_object)
}

fn parse_fenced(text: &str) -> Option<Value> {
    parse_direct(strip_json_fences(text))
}

fn parse_embedded(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| balanced_object(&text[start..]).and_then(parse_direct))
}

/// The prefix of `text` (which starts with `{`) up to its matching `}`.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Runs the parser chain over raw collaborator text.
pub fn parse_proposal(text: &str) -> Option<Value> {
    PARSERS.iter().find_map(|(name, parser)| {
        let parsed = parser(text);
        if parsed.is_some() {
            debug!("Parsed external proposal with the {} parser", name);
        }
        parsed
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Structural coercion
// ────────────────────────────────────────────────────────────────────────────

/// Coerces a parsed JSON object into a result. Absent categories and lists become
/// empty; malformed records are dropped. The `summary` block is ignored.
pub fn coerce_proposal(value: &Value) -> Option<ReconciliationResult> {
    let obj = value.as_object()?;
    let mut result = ReconciliationResult::default();
    for category in Category::ALL {
        *result.get_mut(category) = coerce_category(obj.get(category.key()));
    }
    Some(result)
}

fn coerce_category(value: Option<&Value>) -> CategoryResult {
    let records = |field: &str, missing: bool| -> Vec<MatchRecord> {
        value
            .and_then(|v| v.get(field))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| coerce_record(item, missing))
                    .collect()
            })
            .unwrap_or_default()
    };
    CategoryResult {
        matched: records("matched", false),
        missing: records("missing", true),
    }
}

fn coerce_record(value: &Value, missing: bool) -> Option<MatchRecord> {
    let obj = value.as_object()?;
    let jd_skill = obj.get("jd_skill")?.as_str()?.to_string();
    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if missing {
        return Some(MatchRecord::missing(jd_skill, reasoning));
    }

    // A matched record always carries a concrete strategy; unknown labels
    // (and a stray "missing") become the weakest one.
    let match_type = obj
        .get("match_type")
        .and_then(Value::as_str)
        .and_then(MatchType::parse_lenient)
        .filter(|t| !t.is_missing())
        .unwrap_or(MatchType::Semantic);

    Some(MatchRecord {
        jd_skill,
        cv_equivalent: obj
            .get("cv_equivalent")
            .and_then(Value::as_str)
            .map(str::to_string),
        match_type,
        confidence: obj
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
        reasoning,
    })
}
