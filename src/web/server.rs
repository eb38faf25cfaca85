use std::sync::Arc;
use axum::{
    Router,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::config::{Config, ScoringConfig};
use crate::error::TrustError;
use crate::feedback::TrustScoreResult;
use crate::trust::{TrustScoreRequest, TrustScorer};

/// Web server - trust score page and calculation endpoint
pub struct WebServer {
    scorer: Arc<TrustScorer>,
    config: Arc<Config>,
}

#[derive(Clone)]
struct AppState {
    scorer: Arc<TrustScorer>,
}

impl WebServer {
    pub fn new(scorer: Arc<TrustScorer>, config: Arc<Config>) -> Self {
        Self { scorer, config }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            scorer: self.scorer.clone(),
        };

        let app = Router::new()
            .route("/", get(home))
            .route("/bunkerOccupantTrustScore", get(home))
            .route("/calculateOccupantTrustScore", post(calculate))
            .route("/api/scoring", get(api_scoring))
            .nest_service("/static", ServeDir::new(&self.config.web.static_dir))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        if self.config.web.permissive_cors {
            app.layer(CorsLayer::permissive())
        } else {
            app
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.config.web.address, self.config.web.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
        info!("🛡️ Trust score page on http://{}/bunkerOccupantTrustScore", addr);

        axum::serve(listener, app).await?;
        Ok(())
    }
}

impl IntoResponse for TrustError {
    fn into_response(self) -> Response {
        let detail = match &self {
            TrustError::InvalidInput(message) => message.clone(),
        };
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "detail": detail })),
        )
            .into_response()
    }
}

/// Front-end page - embedded single-page form
async fn home() -> Html<&'static str> {
    Html(include_str!("../../static/home.html"))
}

/// Score calculation API
async fn calculate(
    State(state): State<AppState>,
    payload: Result<Json<TrustScoreRequest>, JsonRejection>,
) -> Result<Json<TrustScoreResult>, TrustError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected trust score request: {}", rejection.body_text());
        TrustError::InvalidInput(rejection.body_text())
    })?;

    let result = state.scorer.evaluate_request(&request).map_err(|e| {
        warn!("Rejected trust score request: {}", e);
        e
    })?;

    debug!("Trust score {} ({})", result.score, result.band.label());
    Ok(Json(result))
}

/// Active scoring configuration
async fn api_scoring(State(state): State<AppState>) -> Json<ScoringConfig> {
    Json(state.scorer.config().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn spawn_server() -> String {
        let config = Arc::new(Config::default());
        let scorer = Arc::new(TrustScorer::new(&config.scoring));
        let app = WebServer::new(scorer, config).router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_calculate_returns_result() {
        let base = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{}/calculateOccupantTrustScore", base))
            .json(&json!({
                "yearsInNetwork": 10,
                "referrals": 7,
                "disciplineIncidents": 0,
                "trainingLevel": 5,
                "communityContributions": 10
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["score"], 100);
        assert_eq!(body["band"], "Excellent -> fast-track eligible");
        assert_eq!(body["pointsBreakdown"]["referrals"], 25.0);
        assert_eq!(
            body["suggestions"],
            json!(["Keep doing what you're doing — you're on track!"])
        );
    }

    #[tokio::test]
    async fn test_calculate_rejects_training_out_of_range() {
        let base = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{}/calculateOccupantTrustScore", base))
            .json(&json!({
                "yearsInNetwork": 1,
                "referrals": 1,
                "disciplineIncidents": 0,
                "trainingLevel": 6,
                "communityContributions": 1
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "trainingLevel must be between 0 and 5 (got 6)");
        assert!(body.get("score").is_none());
    }

    #[tokio::test]
    async fn test_calculate_rejects_negative_and_non_numeric() {
        let base = spawn_server().await;
        let client = reqwest::Client::new();

        let negative = client
            .post(format!("{}/calculateOccupantTrustScore", base))
            .json(&json!({
                "yearsInNetwork": 1,
                "referrals": -4,
                "disciplineIncidents": 0,
                "trainingLevel": 2,
                "communityContributions": 1
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(negative.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        let non_numeric = client
            .post(format!("{}/calculateOccupantTrustScore", base))
            .json(&json!({
                "yearsInNetwork": "many",
                "referrals": 1,
                "disciplineIncidents": 0,
                "trainingLevel": 2,
                "communityContributions": 1
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(non_numeric.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = non_numeric.json().await.unwrap();
        assert!(body["detail"].is_string());

        let missing = client
            .post(format!("{}/calculateOccupantTrustScore", base))
            .json(&json!({ "yearsInNetwork": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_home_page_served() {
        let base = spawn_server().await;
        for path in ["/", "/bunkerOccupantTrustScore"] {
            let response = reqwest::get(format!("{}{}", base, path)).await.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            let html = response.text().await.unwrap();
            assert!(html.contains("trustForm"), "{} did not serve the form", path);
        }
    }

    #[tokio::test]
    async fn test_static_assets_served() {
        let base = spawn_server().await;
        let response = reqwest::get(format!("{}/static/home.js", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let script = response.text().await.unwrap();
        assert!(script.contains("/calculateOccupantTrustScore"));
    }

    #[tokio::test]
    async fn test_api_scoring_exposes_config() {
        let base = spawn_server().await;
        let body: Value = reqwest::get(format!("{}/api/scoring", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["caps"]["training_level"], 5);
        assert_eq!(body["weights"]["referrals"], 25.0);
        assert_eq!(body["targets"]["community_contributions"], 0.7);
        assert_eq!(body["incident_exponent"], 1.5);
    }
}
