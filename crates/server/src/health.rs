use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use procura_db::ProductRepository;

#[derive(Clone)]
pub struct HealthState {
    catalog: Arc<dyn ProductRepository>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub catalog: HealthCheck,
    pub checked_at: String,
}

pub fn router(catalog: Arc<dyn ProductRepository>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { catalog })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(state.catalog.as_ref()).await;
    let ready = catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "procura-server runtime initialized".to_string(),
        },
        catalog,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn catalog_check(catalog: &dyn ProductRepository) -> HealthCheck {
    match catalog.list_summaries().await {
        Ok(summaries) => HealthCheck {
            status: "ready",
            detail: format!("catalog lists {} products", summaries.len()),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("catalog query failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{extract::State, http::StatusCode, Json};

    use procura_core::domain::product::{Product, ProductSummary};
    use procura_db::{InMemoryProductRepository, ProductRepository, RepositoryError};

    use crate::health::{health, HealthState};

    struct BrokenCatalog;

    #[async_trait]
    impl ProductRepository for BrokenCatalog {
        async fn find_by_sku(&self, _sku: &str) -> Result<Option<Product>, RepositoryError> {
            Err(RepositoryError::Decode("catalog offline".to_string()))
        }

        async fn find_by_skus(&self, _skus: &[String]) -> Result<Vec<Product>, RepositoryError> {
            Err(RepositoryError::Decode("catalog offline".to_string()))
        }

        async fn list_summaries(&self) -> Result<Vec<ProductSummary>, RepositoryError> {
            Err(RepositoryError::Decode("catalog offline".to_string()))
        }

        async fn list_available(&self) -> Result<Vec<Product>, RepositoryError> {
            Err(RepositoryError::Decode("catalog offline".to_string()))
        }
    }

    #[tokio::test]
    async fn health_is_ready_when_catalog_answers() {
        let state = HealthState {
            catalog: Arc::new(InMemoryProductRepository::with_default_catalog()),
        };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.catalog.status, "ready");
        assert!(payload.catalog.detail.contains("11 products"));
    }

    #[tokio::test]
    async fn health_degrades_when_catalog_fails() {
        let state = HealthState { catalog: Arc::new(BrokenCatalog) };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.catalog.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
