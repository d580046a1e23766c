pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::skills::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Skills API
        .route(
            "/api/v1/skills/reconcile",
            post(handlers::handle_reconcile),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::skills::normalizer::DEFAULT_MAX_PER_CATEGORY;
    use crate::skills::{DisabledMatcher, SkillReconciler, SkillTables};

    fn app() -> Router {
        build_router(AppState {
            reconciler: Arc::new(SkillReconciler::new(
                Arc::new(SkillTables::builtin()),
                Arc::new(DisabledMatcher),
                DEFAULT_MAX_PER_CATEGORY,
            )),
        })
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "skillmatch");
    }

    #[tokio::test]
    async fn test_reconcile_scenario_a() {
        let (status, body) = post_json(
            "/api/v1/skills/reconcile",
            json!({
                "cv": {"technical_skills": ["SQL", "Power BI"]},
                "jd": {"technical_skills": ["SQL", "Tableau", "Python"]}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provenance"], "cascade");
        assert!(body["reconciliation_id"].is_string());
        assert!(body["tables_version"].is_string());

        let technical = &body["result"]["technical_skills"];
        assert_eq!(technical["matched"][0]["jd_skill"], "SQL");
        assert_eq!(technical["matched"][0]["match_type"], "exact");
        assert_eq!(technical["matched"][1]["match_type"], "domain_cluster");
        let python = &technical["missing"][0];
        assert_eq!(python["jd_skill"], "python");
        assert!(python.get("match_type").is_none());
        assert!(python.get("cv_equivalent").is_none());

        assert_eq!(body["result"]["summary"]["total_jd_requirements"], 3);
        assert_eq!(body["result"]["summary"]["match_rate_percentage"], 67);
        assert_eq!(body["report"]["overall"]["total_matched"], 2);
        assert!(body.get("proposal_validation").is_none());
    }

    #[tokio::test]
    async fn test_reconcile_coerces_malformed_lists() {
        let (status, body) = post_json(
            "/api/v1/skills/reconcile",
            json!({
                "cv": {"soft_skills": ["Leadership", 7]},
                "jd": {"soft_skills": ["Leadership", "Leadership", "Mentoring"], "technical_skills": "n/a"}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let soft = &body["result"]["soft_skills"];
        assert_eq!(soft["matched"].as_array().unwrap().len(), 1);
        assert_eq!(soft["missing"].as_array().unwrap().len(), 1);
        assert_eq!(body["result"]["technical_skills"]["matched"], json!([]));
    }

    #[tokio::test]
    async fn test_reconcile_rejects_non_object_root() {
        let (status, body) = post_json(
            "/api/v1/skills/reconcile",
            json!({"cv": ["SQL"], "jd": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
