use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchday::catalog::{CatalogConfig, CatalogService, InMemoryMatchRepository};
use matchday::feed::{
    start_lock_sweep_task, start_results_poll_task, start_upcoming_poll_task, MatchFeed,
    PollerConfig, StaticMatchFeed,
};
use matchday::ledger::{
    match_tally, submit_prediction, withdraw_prediction, InMemoryPredictionRepository,
    LedgerService,
};
use matchday::scoring::{InMemoryProcessedMatches, ScoringConfig, ScoringService};
use matchday::shared::AppState;
use matchday::standings::{
    leaderboard, reset_user, user_predictions, InMemoryUserRepository, LeaderboardProjector,
    UserRepository,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchday=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting match prediction service");

    // Create shared repositories with dependency injection
    // Easy to switch between implementations:
    let match_repository = Arc::new(InMemoryMatchRepository::new());
    let prediction_repository = Arc::new(InMemoryPredictionRepository::new());
    let user_repository: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let processed_matches = Arc::new(InMemoryProcessedMatches::new());

    // For production with PostgreSQL:
    // let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    // let pool = sqlx::PgPool::connect(&database_url).await.expect("Failed to connect to database");
    // let match_repository = Arc::new(matchday::catalog::repository::PostgresMatchRepository::new(pool.clone()));
    // let prediction_repository = Arc::new(matchday::ledger::repository::PostgresPredictionRepository::new(pool.clone()));
    // let user_repository: Arc<dyn UserRepository> = Arc::new(matchday::standings::repository::PostgresUserRepository::new(pool.clone()));
    // let processed_matches = Arc::new(matchday::scoring::processed::PostgresProcessedMatches::new(pool));

    let catalog = Arc::new(CatalogService::new(
        match_repository,
        CatalogConfig::default(),
    ));
    let ledger = Arc::new(LedgerService::new(
        prediction_repository.clone(),
        user_repository.clone(),
        catalog.clone(),
    ));
    let scoring = Arc::new(ScoringService::new(
        catalog.clone(),
        prediction_repository,
        user_repository.clone(),
        processed_matches,
        ScoringConfig::default(),
    ));
    let projector = Arc::new(LeaderboardProjector::new(user_repository.clone()));

    // The sports-data collaborator; real deployments inject an HTTP-backed
    // implementation of MatchFeed here
    let feed: Arc<dyn MatchFeed> = Arc::new(StaticMatchFeed::new());

    // Background poll tasks: register upcoming matches, lock matches ahead
    // of kickoff, finish and score reported results
    let poller_config = PollerConfig::default();
    tokio::spawn(start_upcoming_poll_task(
        feed.clone(),
        catalog.clone(),
        poller_config.clone(),
    ));
    tokio::spawn(start_results_poll_task(
        feed.clone(),
        catalog.clone(),
        scoring.clone(),
        poller_config.clone(),
    ));
    tokio::spawn(start_lock_sweep_task(catalog.clone(), poller_config));

    let app_state = AppState::new(catalog, ledger, projector, user_repository);

    // The chat-platform adapter calls these; it owns all message rendering
    let app = Router::new()
        .route(
            "/predictions",
            post(submit_prediction).delete(withdraw_prediction),
        )
        .route("/matches/:id/tally", get(match_tally))
        .route("/users/:id/predictions", get(user_predictions))
        .route("/leaderboard", get(leaderboard))
        .route("/admin/users/:id/reset", post(reset_user))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
