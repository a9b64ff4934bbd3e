use tracing_subscriber::EnvFilter;

use moviecompass_api::{
    config::Config,
    db,
    routes::create_router,
    services::maintenance,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moviecompass_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = db::Cache::new(redis_client);

    let state = AppState::new(config.clone(), pool, cache)?;

    // Daily cleanup of signups that never verified their email
    maintenance::spawn_unverified_purge(state.users.clone());

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app).await?;

    cache_writer.shutdown().await;

    Ok(())
}
