use std::sync::Arc;

use backend::{build_rocket, config::AppConfig, queries::PgStore, routes::AppState};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::info;

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting Polls API server");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let config = AppConfig::from_lookup(|key| secret_store.get(key));
    info!(
        page_size = config.page_size,
        max_page_size = config.max_page_size,
        "Configuration loaded"
    );

    let state = AppState::new(Arc::new(PgStore::new(pool)), config);

    Ok(build_rocket(state).into())
}
