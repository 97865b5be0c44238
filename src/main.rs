use std::sync::Arc;

use innovation_intake::config::AppConfig;
use innovation_intake::store::{Database, LibSqlBackend};
use innovation_intake::submission::{
    HttpSubmissionService, Position, ProgressPersistence, SettingsPersistence,
    StoreSubmissionService, SubmissionRouteState, SubmissionService, WizardController,
    submission_routes,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("🩺 Innovation Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/submission", config.port);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);
    eprintln!("   Database: {}", config.db_path.display());

    // ── Submission target ────────────────────────────────────────────────
    let service: Arc<dyn SubmissionService> = match config.submission_url {
        Some(ref url) => {
            eprintln!("   Submissions: {url}");
            Arc::new(HttpSubmissionService::new(
                url.clone(),
                config.submission_token.clone(),
            ))
        }
        None => {
            eprintln!("   Submissions: local database");
            Arc::new(StoreSubmissionService::new(
                Arc::clone(&db),
                config.user_id.clone(),
            ))
        }
    };

    // ── Wizard session ───────────────────────────────────────────────────
    let persistence: Arc<dyn ProgressPersistence> = Arc::new(SettingsPersistence::new(
        Arc::clone(&db),
        config.user_id.clone(),
        config.progress_slot.clone(),
    ));
    let controller = WizardController::init(persistence).await;
    match controller.current() {
        Position::Complete => eprintln!("   Resume: all steps complete, ready to submit\n"),
        position => eprintln!("   Resume: {position}\n"),
    }

    let state = SubmissionRouteState {
        controller: Arc::new(Mutex::new(controller)),
        service,
    };
    let app = submission_routes(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Submission API started");
    axum::serve(listener, app).await?;

    Ok(())
}
