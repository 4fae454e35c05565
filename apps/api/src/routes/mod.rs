pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::applications::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route("/api/v1/jobs/analyze", post(handlers::handle_analyze_job))
        .route(
            "/api/v1/jobs/submit",
            post(handlers::handle_submit_application),
        )
        .route(
            "/api/v1/jobs/missing-fields",
            get(handlers::handle_missing_fields),
        )
        // Preferences API
        .route(
            "/api/v1/preferences",
            post(handlers::handle_save_preferences).get(handlers::handle_get_preferences),
        )
        // Submission history
        .route(
            "/api/v1/applications",
            get(handlers::handle_list_applications),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::testing::{app_state, engine, StaticPageFetcher};

    fn router() -> Router {
        build_router(app_state(engine(StaticPageFetcher::default())))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_database_state() {
        let (status, body) = send(
            router(),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "unavailable");
    }

    #[tokio::test]
    async fn test_analyze_rejects_malformed_url() {
        let (status, body) = send(
            router(),
            post_json(
                "/api/v1/jobs/analyze",
                json!({"job_url": "not a url", "user_id": Uuid::new_v4()}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_JOB_URL");
    }

    #[tokio::test]
    async fn test_preferences_round_trip() {
        let router = router();
        let user = Uuid::new_v4();

        let (status, body) = send(
            router.clone(),
            post_json(
                "/api/v1/preferences",
                json!({"user_id": user, "preferences": {"Expected Salary": 150000, "notes": null}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["saved_fields"], 1);

        let (status, body) = send(
            router,
            Request::get(format!("/api/v1/preferences?user_id={user}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"expected_salary": "150000"}));
    }

    #[tokio::test]
    async fn test_submit_to_careers_page_is_handed_off() {
        let (status, body) = send(
            router(),
            post_json(
                "/api/v1/jobs/submit",
                json!({
                    "job_url": "https://acme.com/careers/42",
                    "user_id": Uuid::new_v4(),
                    "form_data": {"email": "a@b.com", "phone": ""},
                    "auto_learn": true
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["result"]["status"], "requires_manual");
        assert_eq!(body["learned_fields"], 1);
        assert_eq!(body["success_rate"], 50.0);
    }

    #[tokio::test]
    async fn test_history_limit_is_validated() {
        let (status, body) = send(
            router(),
            Request::get(format!("/api/v1/applications?user_id={}&limit=0", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
