// Skill-Requirement Reconciliation Engine.
// Pipeline: normalizer → {cascade, external} → validator → repair → reporter.
// The cascade is CPU-bound and runs inside tokio::task::spawn_blocking.

pub mod cascade;
pub mod engine;
pub mod external;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod prompts;
pub mod repair;
pub mod reporter;
pub mod tables;
pub mod validator;

// Re-export the public API consumed by state, routes and main.
pub use engine::SkillReconciler;
pub use external::{DisabledMatcher, ExternalMatcher, LlmSkillMatcher};
pub use tables::SkillTables;
