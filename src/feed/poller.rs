use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use super::{FeedError, MatchFeed};
use crate::catalog::CatalogService;
use crate::resolver::{self, Resolution};
use crate::scoring::{ScoringResult, ScoringService};

/// Configuration for the background poll tasks
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// How often to pull upcoming matches from the feed
    pub upcoming_interval: Duration,
    /// How often to pull recent results from the feed
    pub results_interval: Duration,
    /// How often to sweep SCHEDULED matches past their lock window
    pub lock_sweep_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            upcoming_interval: Duration::from_secs(30 * 60),
            results_interval: Duration::from_secs(3 * 60 * 60),
            lock_sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Starts the background task that registers newly announced matches
#[instrument(skip(feed, catalog, config))]
pub async fn start_upcoming_poll_task(
    feed: Arc<dyn MatchFeed>,
    catalog: Arc<CatalogService>,
    config: PollerConfig,
) {
    info!(
        interval_secs = config.upcoming_interval.as_secs(),
        "Starting upcoming-matches poll task"
    );

    let mut tick = interval(config.upcoming_interval);
    loop {
        tick.tick().await;

        match ingest_upcoming(&feed, &catalog).await {
            Ok(registered) => {
                info!(registered, "Upcoming-matches poll completed");
            }
            Err(e) => {
                // Retried on the next tick
                error!(error = %e, "Upcoming-matches poll failed");
            }
        }
    }
}

/// Starts the background task that finishes and scores reported results
#[instrument(skip(feed, catalog, scoring, config))]
pub async fn start_results_poll_task(
    feed: Arc<dyn MatchFeed>,
    catalog: Arc<CatalogService>,
    scoring: Arc<ScoringService>,
    config: PollerConfig,
) {
    info!(
        interval_secs = config.results_interval.as_secs(),
        "Starting results poll task"
    );

    let mut tick = interval(config.results_interval);
    loop {
        tick.tick().await;

        match ingest_results(&feed, &catalog, &scoring).await {
            Ok(scored) => {
                info!(scored, "Results poll completed");
            }
            Err(e) => {
                error!(error = %e, "Results poll failed");
            }
        }
    }
}

/// Starts the background task that locks matches ahead of kickoff
#[instrument(skip(catalog, config))]
pub async fn start_lock_sweep_task(catalog: Arc<CatalogService>, config: PollerConfig) {
    info!(
        interval_secs = config.lock_sweep_interval.as_secs(),
        "Starting lock sweep task"
    );

    let mut tick = interval(config.lock_sweep_interval);
    loop {
        tick.tick().await;

        match catalog.sweep_locks(Utc::now()).await {
            Ok(0) => {}
            Ok(locked) => info!(locked, "Lock sweep completed"),
            Err(e) => error!(error = %e, "Lock sweep failed"),
        }
    }
}

/// Registers every match the feed currently announces.
/// Returns how many were previously unknown.
pub async fn ingest_upcoming(
    feed: &Arc<dyn MatchFeed>,
    catalog: &Arc<CatalogService>,
) -> Result<usize, FeedError> {
    let raw_matches = feed.upcoming().await?;

    let mut registered = 0;
    for raw in raw_matches {
        match catalog.register(raw.to_catalog()).await {
            Ok(true) => registered += 1,
            Ok(false) => {}
            Err(e) => {
                error!(match_id = %raw.match_id(), error = %e, "Failed to register match");
            }
        }
    }

    Ok(registered)
}

/// Resolves and scores every finished match the feed reports.
/// Returns how many matches were scored for the first time; re-polled
/// matches come back `AlreadyProcessed` and are counted as nothing.
pub async fn ingest_results(
    feed: &Arc<dyn MatchFeed>,
    catalog: &Arc<CatalogService>,
    scoring: &Arc<ScoringService>,
) -> Result<usize, FeedError> {
    let raw_matches = feed.recently_finished().await?;
    let now = Utc::now();

    let mut scored = 0;
    for raw in raw_matches {
        let match_id = raw.match_id();

        let resolution = match resolver::resolve(
            raw.status,
            raw.full_time_score(),
            raw.declared_winner(),
        ) {
            Ok(resolution) => resolution,
            Err(e) => {
                // Data-integrity problem in the feed; skip, do not guess
                warn!(match_id = %match_id, error = %e, "Skipping match with unusable result");
                continue;
            }
        };

        let outcome = match resolution {
            Resolution::Final(outcome) => outcome,
            Resolution::Pending => continue,
        };

        // Results can arrive for matches the upcoming poll never saw
        if let Err(e) = catalog.register(raw.to_catalog()).await {
            error!(match_id = %match_id, error = %e, "Failed to register finished match");
            continue;
        }

        if let Err(e) = catalog
            .mark_finished(&match_id, outcome, raw.full_time_score())
            .await
        {
            error!(match_id = %match_id, error = %e, "Failed to finish match");
            continue;
        }

        match scoring.process_match(&match_id, now).await {
            Ok(ScoringResult::Scored {
                points_awarded,
                winners,
            }) => {
                info!(
                    match_id = %match_id,
                    points_awarded,
                    winners = winners.len(),
                    "Scored match from poll"
                );
                scored += 1;
            }
            Ok(ScoringResult::AlreadyProcessed) => {
                debug!(match_id = %match_id, "Match already scored on an earlier poll");
            }
            Ok(ScoringResult::Pending) => {}
            Err(e) => {
                error!(match_id = %match_id, error = %e, "Failed to score match");
            }
        }
    }

    Ok(scored)
}
