use blog_backend::{AppState, build_router, config::Config, db};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let pool = db::init_db(&config.database_url, config.max_connections).await?;
    tracing::info!("Database initialized");

    if let Some(admin_email) = &config.admin_email {
        if !db::promote_admin(&pool, admin_email).await? {
            tracing::warn!("ADMIN_EMAIL does not match any user yet");
        }
    }

    let app = build_router(AppState::new(pool, config.secret_key));

    tracing::info!("Server running on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
