//! Static skill knowledge: synonym groups, implication hierarchy, related-term
//! clusters and semantic domains.
//!
//! Built once at startup into immutable lookup structures and shared via `Arc`.
//! Every entry is stored under its `skill_key`, so table spelling is free-form.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::skills::models::SkillToken;
use crate::skills::normalizer::skill_key;

/// Bump whenever any table below changes.
pub const TABLES_VERSION: &str = "2025.06-1";

/// Many-to-many synonym groups. The first entry of a group is its head.
const SYNONYM_GROUPS: &[&[&str]] = &[
    // technical
    &["javascript", "js", "ecmascript"],
    &["typescript", "ts"],
    &["python", "python3"],
    &["golang", "go"],
    &["c#", "csharp", "c sharp"],
    &["c++", "cpp"],
    &[".net", "dotnet"],
    &["postgresql", "postgres", "psql"],
    &["mongodb", "mongo"],
    &["kubernetes", "k8s"],
    &["amazon web services", "aws"],
    &["google cloud platform", "gcp", "google cloud"],
    &["microsoft azure", "azure"],
    &["machine learning", "ml"],
    &["artificial intelligence", "ai"],
    &["natural language processing", "nlp"],
    &["ci/cd", "continuous integration", "continuous delivery", "continuous deployment"],
    &["power bi", "microsoft power bi"],
    &["excel", "microsoft excel", "ms excel"],
    &["react", "reactjs", "react.js"],
    &["node.js", "nodejs", "node"],
    &["vue", "vuejs", "vue.js"],
    &["rest api", "restful api", "rest apis", "restful services"],
    &["sql", "structured query language"],
    &["nosql", "non relational databases"],
    &["etl", "extract transform load"],
    &["data visualization", "data visualisation"],
    &["user experience", "ux"],
    &["user interface", "ui"],
    &["quality assurance", "qa"],
    // soft
    &["communication", "communication skills"],
    &["teamwork", "collaboration", "team player"],
    &["problem solving", "analytical thinking", "critical thinking"],
    &["leadership", "team leadership", "people leadership"],
    &["mentoring", "coaching"],
    &["time management", "prioritization", "prioritisation"],
    &["adaptability", "flexibility"],
    &["attention to detail", "detail oriented"],
    &["stakeholder management", "stakeholder engagement"],
    // domain
    &["fintech", "financial technology"],
    &["ecommerce", "online retail"],
    &["saas", "software as a service"],
    &["business intelligence", "bi"],
    &["supply chain", "supply chain management"],
    &["search engine optimization", "seo"],
];

/// Directed implications: a specific skill implies each of the broader ones.
const HIERARCHY: &[(&str, &[&str])] = &[
    ("pytorch", &["deep learning", "machine learning", "python"]),
    ("tensorflow", &["deep learning", "machine learning"]),
    ("keras", &["deep learning"]),
    ("scikit-learn", &["machine learning", "python"]),
    ("deep learning", &["machine learning"]),
    ("machine learning", &["artificial intelligence"]),
    ("natural language processing", &["machine learning"]),
    ("pandas", &["python", "data analysis"]),
    ("numpy", &["python"]),
    ("django", &["python", "web development", "backend development"]),
    ("flask", &["python", "backend development"]),
    ("fastapi", &["python", "backend development"]),
    ("spring boot", &["java", "backend development"]),
    ("react", &["javascript", "frontend development"]),
    ("angular", &["typescript", "frontend development"]),
    ("vue", &["javascript", "frontend development"]),
    ("node.js", &["javascript", "backend development"]),
    ("typescript", &["javascript"]),
    ("postgresql", &["sql", "relational databases"]),
    ("mysql", &["sql", "relational databases"]),
    ("sql server", &["sql", "relational databases"]),
    ("mongodb", &["nosql"]),
    ("tableau", &["data visualization", "business intelligence"]),
    ("power bi", &["data visualization", "business intelligence"]),
    ("looker", &["data visualization", "business intelligence"]),
    ("kubernetes", &["container orchestration", "devops"]),
    ("docker", &["containerization", "devops"]),
    ("terraform", &["infrastructure as code", "devops"]),
    ("jenkins", &["ci/cd"]),
    ("github actions", &["ci/cd"]),
    ("amazon web services", &["cloud computing"]),
    ("google cloud platform", &["cloud computing"]),
    ("microsoft azure", &["cloud computing"]),
    ("spark", &["big data"]),
    ("hadoop", &["big data"]),
    ("kafka", &["event streaming", "distributed systems"]),
    ("scrum", &["agile"]),
    ("kanban", &["agile"]),
    ("rust", &["systems programming"]),
    ("c++", &["systems programming"]),
    ("mentoring", &["leadership"]),
    ("people management", &["leadership"]),
    ("public speaking", &["communication"]),
    ("presentation skills", &["communication"]),
    ("negotiation", &["communication"]),
    ("conflict resolution", &["interpersonal skills"]),
    ("payments", &["fintech"]),
    ("anti money laundering", &["compliance"]),
    ("kyc", &["compliance"]),
    ("clinical trials", &["healthcare"]),
    ("search engine optimization", &["digital marketing"]),
];

/// Named clusters of closely related terms.
const CLUSTERS: &[(&str, &[&str])] = &[
    (
        "business intelligence",
        &["tableau", "power bi", "looker", "qlik", "excel", "data visualization", "dashboards", "business intelligence"],
    ),
    (
        "data engineering",
        &["spark", "hadoop", "kafka", "airflow", "etl", "dbt", "snowflake", "data pipelines", "data warehousing"],
    ),
    (
        "data science",
        &["python", "r", "pandas", "numpy", "scikit-learn", "statistics", "jupyter", "machine learning"],
    ),
    (
        "relational databases",
        &["sql", "postgresql", "mysql", "sql server", "oracle", "sqlite", "relational databases"],
    ),
    (
        "cloud platforms",
        &["amazon web services", "google cloud platform", "microsoft azure", "cloud computing", "serverless"],
    ),
    (
        "devops",
        &["docker", "kubernetes", "terraform", "ansible", "jenkins", "ci/cd", "github actions", "helm", "devops"],
    ),
    (
        "frontend",
        &["react", "angular", "vue", "html", "css", "javascript", "typescript", "redux", "frontend development"],
    ),
    (
        "backend",
        &["node.js", "django", "flask", "fastapi", "spring boot", "express", "rest api", "graphql", "backend development"],
    ),
    ("jvm languages", &["java", "kotlin", "scala"]),
    ("systems languages", &["rust", "c", "c++", "golang", "systems programming"]),
    (
        "project delivery",
        &["agile", "scrum", "kanban", "jira", "project management", "sprint planning"],
    ),
    (
        "interpersonal",
        &["communication", "teamwork", "empathy", "active listening", "conflict resolution", "interpersonal skills"],
    ),
    (
        "leadership",
        &["leadership", "mentoring", "people management", "decision making", "delegation", "strategic thinking"],
    ),
    (
        "problem solving",
        &["problem solving", "creativity", "troubleshooting", "root cause analysis"],
    ),
    (
        "finance",
        &["fintech", "banking", "payments", "trading", "risk management", "compliance", "insurance", "accounting"],
    ),
    (
        "healthcare",
        &["healthcare", "clinical trials", "pharma", "medical devices", "hipaa", "telemedicine"],
    ),
    ("retail", &["ecommerce", "retail", "supply chain", "merchandising"]),
    (
        "marketing",
        &["digital marketing", "search engine optimization", "content marketing", "brand management", "growth marketing"],
    ),
];

/// Word-level vocabularies used by the semantic fallback.
const DOMAINS: &[(&str, &[&str])] = &[
    (
        "data",
        &["data", "analytics", "analysis", "analyst", "visualization", "statistics", "bi", "dashboards", "reporting", "sql", "etl", "warehouse", "warehousing", "pipelines", "pandas", "tableau", "excel"],
    ),
    (
        "software",
        &["software", "programming", "development", "engineering", "code", "coding", "backend", "frontend", "api", "apis", "web", "python", "java", "javascript", "rust", "golang", "microservices", "testing"],
    ),
    (
        "cloud",
        &["cloud", "aws", "azure", "gcp", "infrastructure", "devops", "kubernetes", "docker", "containers", "serverless", "deployment", "networking"],
    ),
    (
        "machine learning",
        &["machine", "learning", "ai", "intelligence", "neural", "models", "nlp", "vision", "deep", "modeling", "modelling"],
    ),
    (
        "security",
        &["security", "cybersecurity", "encryption", "iam", "vulnerability", "threat", "penetration"],
    ),
    (
        "management",
        &["management", "leadership", "strategy", "planning", "stakeholder", "project", "program", "product", "roadmap", "team"],
    ),
    (
        "communication",
        &["communication", "presentation", "writing", "speaking", "negotiation", "interpersonal", "listening"],
    ),
    (
        "finance",
        &["finance", "financial", "banking", "fintech", "payments", "trading", "risk", "accounting", "investment", "insurance", "compliance"],
    ),
    (
        "healthcare",
        &["healthcare", "clinical", "medical", "patient", "pharma", "hipaa", "health"],
    ),
];

struct TermGroup {
    name: &'static str,
    members: HashSet<String>,
}

/// Immutable, versioned lookup tables injected into the matching cascade.
pub struct SkillTables {
    version: &'static str,
    synonym_groups: Vec<Vec<String>>,
    synonym_index: HashMap<String, Vec<usize>>,
    hierarchy: HashMap<String, HashSet<String>>,
    clusters: Vec<TermGroup>,
    cluster_index: HashMap<String, Vec<usize>>,
    domains: Vec<TermGroup>,
}

impl SkillTables {
    /// Builds the tables compiled into the binary.
    pub fn builtin() -> Self {
        let synonym_groups: Vec<Vec<String>> = SYNONYM_GROUPS
            .iter()
            .map(|group| group.iter().map(|s| skill_key(s)).collect())
            .collect();

        let mut synonym_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, group) in synonym_groups.iter().enumerate() {
            for key in group {
                let ids = synonym_index.entry(key.clone()).or_default();
                if !ids.contains(&idx) {
                    ids.push(idx);
                }
            }
        }

        let mut tables = Self {
            version: TABLES_VERSION,
            synonym_groups,
            synonym_index,
            hierarchy: HashMap::new(),
            clusters: Vec::new(),
            cluster_index: HashMap::new(),
            domains: Vec::new(),
        };

        // Hierarchy and clusters are stored under synonym heads so that any
        // spelling of a skill resolves to the same entries.
        for (specific, broader) in HIERARCHY {
            let specific = tables.canonical(&skill_key(specific)).to_string();
            let broader: Vec<String> = broader
                .iter()
                .map(|b| tables.canonical(&skill_key(b)).to_string())
                .collect();
            tables.hierarchy.entry(specific).or_default().extend(broader);
        }

        for (idx, (name, members)) in CLUSTERS.iter().enumerate() {
            let members: HashSet<String> = members
                .iter()
                .map(|m| tables.canonical(&skill_key(m)).to_string())
                .collect();
            for member in &members {
                tables.cluster_index.entry(member.clone()).or_default().push(idx);
            }
            tables.clusters.push(TermGroup {
                name: *name,
                members,
            });
        }

        tables.domains = DOMAINS
            .iter()
            .map(|(name, terms)| TermGroup {
                name: *name,
                members: terms.iter().map(|t| t.to_string()).collect(),
            })
            .collect();

        tables
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    /// The head of the first synonym group containing `key`, or `key` itself.
    pub fn canonical<'a>(&'a self, key: &'a str) -> &'a str {
        self.synonym_index
            .get(key)
            .and_then(|ids| ids.first())
            .and_then(|idx| self.synonym_groups.get(*idx))
            .and_then(|group| group.first())
            .map(String::as_str)
            .unwrap_or(key)
    }

    /// True when two distinct keys share at least one synonym group.
    pub fn are_synonyms(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        match (self.synonym_index.get(a), self.synonym_index.get(b)) {
            (Some(left), Some(right)) => left.iter().any(|id| right.contains(id)),
            _ => false,
        }
    }

    /// True when `specific` directly implies `broader`.
    pub fn implies(&self, specific: &str, broader: &str) -> bool {
        let specific = self.canonical(specific);
        let broader = self.canonical(broader);
        specific != broader
            && self
                .hierarchy
                .get(specific)
                .is_some_and(|set| set.contains(broader))
    }

    /// Names of every cluster containing both keys, alphabetically.
    pub fn shared_clusters(&self, a: &str, b: &str) -> Vec<&'static str> {
        let a = self.canonical(a);
        let b = self.canonical(b);
        let (Some(left), Some(right)) = (self.cluster_index.get(a), self.cluster_index.get(b))
        else {
            return Vec::new();
        };
        let mut names: Vec<&'static str> = left
            .iter()
            .filter(|id| right.contains(*id))
            .map(|id| self.clusters[*id].name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Semantic domains a token belongs to, by whole key or any of its words.
    pub fn domains_of(&self, token: &SkillToken) -> BTreeSet<&'static str> {
        let words: Vec<String> = token.words().map(|w| skill_key(&w)).collect();
        self.domains
            .iter()
            .filter(|d| d.members.contains(&token.key) || words.iter().any(|w| d.members.contains(w)))
            .map(|d| d.name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::normalizer::normalize_token;

    fn key(s: &str) -> String {
        skill_key(s)
    }

    #[test]
    fn test_version_is_exposed() {
        assert_eq!(SkillTables::builtin().version(), TABLES_VERSION);
    }

    #[test]
    fn test_synonyms_are_symmetric() {
        let tables = SkillTables::builtin();
        assert!(tables.are_synonyms(&key("JS"), &key("JavaScript")));
        assert!(tables.are_synonyms(&key("JavaScript"), &key("JS")));
        assert!(tables.are_synonyms(&key("k8s"), &key("Kubernetes")));
        assert!(!tables.are_synonyms(&key("Java"), &key("JavaScript")));
    }

    #[test]
    fn test_identical_keys_are_not_synonyms() {
        let tables = SkillTables::builtin();
        assert!(!tables.are_synonyms(&key("python"), &key("python")));
    }

    #[test]
    fn test_canonical_resolves_group_head() {
        let tables = SkillTables::builtin();
        assert_eq!(tables.canonical(&key("Postgres")), key("postgresql"));
        assert_eq!(tables.canonical(&key("unlisted skill")), key("unlisted skill"));
    }

    #[test]
    fn test_hierarchy_is_directed() {
        let tables = SkillTables::builtin();
        assert!(tables.implies(&key("PyTorch"), &key("Machine Learning")));
        assert!(!tables.implies(&key("Machine Learning"), &key("PyTorch")));
    }

    #[test]
    fn test_hierarchy_resolves_synonyms() {
        let tables = SkillTables::builtin();
        // "Postgres" inherits PostgreSQL's implications; "ML" is a synonym head lookup.
        assert!(tables.implies(&key("Postgres"), &key("SQL")));
        assert!(tables.implies(&key("PyTorch"), &key("ML")));
    }

    #[test]
    fn test_shared_clusters() {
        let tables = SkillTables::builtin();
        assert_eq!(
            tables.shared_clusters(&key("Tableau"), &key("Power BI")),
            vec!["business intelligence"]
        );
        assert!(tables.shared_clusters(&key("Python"), &key("Power BI")).is_empty());
    }

    #[test]
    fn test_domains_of_uses_words() {
        let tables = SkillTables::builtin();
        let token = normalize_token("Data Analysis").unwrap();
        assert!(tables.domains_of(&token).contains("data"));
        let token = normalize_token("Underwater Basket Weaving").unwrap();
        assert!(tables.domains_of(&token).is_empty());
    }
}
