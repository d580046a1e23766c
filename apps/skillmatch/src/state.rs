use std::sync::Arc;

use crate::skills::SkillReconciler;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the skill tables, the cascade and the pluggable external matcher.
    /// Default matcher: DisabledMatcher. Swap via ANTHROPIC_API_KEY / ENABLE_EXTERNAL_MATCHER.
    pub reconciler: Arc<SkillReconciler>,
}
