use std::sync::Arc;

use storefront::{
    app,
    auth::repo::PgUserStore,
    config::AppConfig,
    db,
    products::{repo::PgProductStore, seed},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "storefront=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config.database_url).await?;
    db::migrate(&pool).await?;

    let state = AppState::new(
        config,
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgProductStore::new(pool)),
    )?;

    if let Err(e) = seed::seed_products(state.products.as_ref()).await {
        tracing::warn!(error = %e, "product seeding failed; continuing");
    }

    app::serve(app::build_app(state)).await
}
