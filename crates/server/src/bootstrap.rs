use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use procura_agent::llm::{LlmClient, LlmError, OpenAiChatClient};
use procura_agent::prompts::PromptLibrary;
use procura_agent::runtime::AgentRuntime;
use procura_agent::tools::{
    CheckComplianceTool, ClassifyIntentTool, ExtractDetailsTool, JustifyApprovalTool,
    ToolRegistry, ValidateProductTool,
};
use procura_core::config::AppConfig;
use procura_db::{
    connect_with_settings, migrations, DbPool, InMemoryProductRepository, InMemorySessionStore,
    ProductRepository, RepositoryError, SqlProductRepository,
};

/// Everything `main` needs after wiring: configuration, the shared catalog,
/// and the agent runtime. Collaborators are constructed once here and
/// injected; nothing is process-global.
pub struct Application {
    pub config: AppConfig,
    pub catalog: Arc<dyn ProductRepository>,
    pub runtime: Arc<AgentRuntime>,
    pub db_pool: Option<DbPool>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("catalog seeding failed: {0}")]
    Seed(#[source] RepositoryError),
    #[error("llm client construction failed: {0}")]
    Llm(#[source] LlmError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let (catalog, db_pool): (Arc<dyn ProductRepository>, Option<DbPool>) =
        if config.database.url == "memory" {
            info!(
                event_name = "system.bootstrap.catalog_in_memory",
                correlation_id = "bootstrap",
                "using in-memory product catalog"
            );
            (Arc::new(InMemoryProductRepository::with_default_catalog()), None)
        } else {
            let pool = connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await
            .map_err(BootstrapError::DatabaseConnect)?;

            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;

            let repository = SqlProductRepository::new(pool.clone());
            repository.seed_defaults().await.map_err(BootstrapError::Seed)?;

            info!(
                event_name = "system.bootstrap.catalog_sqlite",
                correlation_id = "bootstrap",
                database_url = %config.database.url,
                "sqlite product catalog migrated and seeded"
            );
            (Arc::new(repository), Some(pool))
        };

    let llm: Arc<dyn LlmClient> =
        Arc::new(OpenAiChatClient::from_config(&config.llm).map_err(BootstrapError::Llm)?);
    let prompts = Arc::new(PromptLibrary::new());

    let mut registry = ToolRegistry::new();
    registry.register(ClassifyIntentTool::new(prompts.clone()));
    registry.register(ValidateProductTool::new(prompts.clone()));
    registry.register(ExtractDetailsTool::new(prompts.clone(), catalog.clone()));
    registry.register(CheckComplianceTool::new(prompts.clone()));
    registry.register(JustifyApprovalTool::new(prompts.clone()));
    let tool_count = registry.len();

    // One session store per process; one collector per request. Sharing the
    // collector the way the store is shared would interleave telemetry
    // across users.
    let sessions = Arc::new(InMemorySessionStore::new());
    let runtime = Arc::new(AgentRuntime::new(llm, Arc::new(registry), sessions, prompts));

    info!(
        event_name = "system.bootstrap.complete",
        correlation_id = "bootstrap",
        tools = tool_count,
        "application bootstrap complete"
    );

    Ok(Application { config, catalog, runtime, db_pool })
}
