// LLM prompt constants for the skills module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for skill matching. Enforces JSON-only output.
pub const SKILL_MATCH_SYSTEM: &str = "You are an expert technical recruiter comparing a \
    candidate's skills against the requirements of a job description. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Skill matching prompt template.
/// Replace: {closed_vocabulary_instruction}, {cv_json}, {jd_json}, {count_rules}
pub const SKILL_MATCH_PROMPT_TEMPLATE: &str = r#"{closed_vocabulary_instruction}

For every job requirement, decide whether the candidate has it or an equivalent skill.

Return a JSON object with this EXACT schema (no extra fields):
{
  "technical_skills": {
    "matched": [
      {
        "jd_skill": "Tableau",
        "cv_equivalent": "Power BI",
        "match_type": "domain_cluster",
        "confidence": 0.7,
        "reasoning": "both are business intelligence tools"
      }
    ],
    "missing": [
      {"jd_skill": "Python", "reasoning": "no equivalent found in CV"}
    ]
  },
  "soft_skills": {"matched": [], "missing": []},
  "domain_keywords": {"matched": [], "missing": []}
}

MATCH TYPES (pick exactly one per matched requirement, strongest first):
- "exact": the same skill
- "synonym": a different name for the same skill ("JS" / "JavaScript")
- "hierarchical": one skill implies the other ("PyTorch" implies "Machine Learning")
- "domain_cluster": closely related tools of the same family ("Tableau" / "Power BI")
- "fuzzy": a spelling variant
- "semantic": related by meaning, weakest evidence

HARD RULES:
- Every job requirement appears exactly once, either in "matched" or in "missing".
- Each candidate skill may be used as "cv_equivalent" at most once across the whole response.
- Prefer an exact candidate skill whenever one exists.
- "confidence" is a number between 0 and 1.
{count_rules}

CANDIDATE SKILLS:
{cv_json}

JOB REQUIREMENTS:
{jd_json}"#;
