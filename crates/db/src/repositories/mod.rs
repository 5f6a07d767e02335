use async_trait::async_trait;
use thiserror::Error;

use procura_core::domain::conversation::SessionState;
use procura_core::domain::product::{Product, ProductSummary};

pub mod product;
pub mod session;

pub use product::{InMemoryProductRepository, SqlProductRepository};
pub use session::InMemorySessionStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// SKU lookup over the workplace-computer catalog. SKU comparison is
/// case-insensitive in every implementation.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError>;

    async fn find_by_skus(&self, skus: &[String]) -> Result<Vec<Product>, RepositoryError>;

    /// Every product as a listing row, including unavailable ones.
    async fn list_summaries(&self) -> Result<Vec<ProductSummary>, RepositoryError>;

    /// Full rows for products currently orderable.
    async fn list_available(&self) -> Result<Vec<Product>, RepositoryError>;
}

/// Per-session persistence of the chat transcript and workflow state.
///
/// One state per session id; writes replace the previous state wholesale.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, RepositoryError>;

    async fn save(&self, session_id: &str, state: SessionState) -> Result<(), RepositoryError>;

    async fn delete(&self, session_id: &str) -> Result<(), RepositoryError>;
}
