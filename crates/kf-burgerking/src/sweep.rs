use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use derive_builder::Builder;
use serde::Serialize;

use crate::constants::*;
use crate::error::{QueryError, SweepError};
use crate::grid::{self, Bounds};
use crate::query::{QueryExecutor, SearchWindow, WindowResult};
use crate::registry::Registry;
use crate::transport::Transport;

/// Tunables for one sweep. Defaults cover Germany.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct SweepConfig {
    pub bounds: Bounds,
    pub lat_step: f64,
    pub lng_step: f64,
    pub radius_m: f64,
    /// Wait between consecutive requests, retries included.
    pub request_delay: Duration,
    /// Write a snapshot after every this many windows. Zero disables
    /// intermediate snapshots; the final one is still written.
    pub checkpoint_every: usize,
    #[builder(setter(into, strip_option))]
    pub snapshot_path: Option<PathBuf>,
    /// Extra attempts for a failed window before it is skipped.
    pub max_retries: u32,
    /// Grid position to start from, for resuming an interrupted sweep.
    pub start_index: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            bounds: GERMANY_BOUNDS,
            lat_step: DEFAULT_LAT_STEP,
            lng_step: DEFAULT_LNG_STEP,
            radius_m: DEFAULT_SEARCH_RADIUS_METERS,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            snapshot_path: None,
            max_retries: 0,
            start_index: 0,
        }
    }
}

impl SweepConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.radius_m {
            Some(radius) if !(radius.is_finite() && radius > 0.0) => {
                Err(format!("search radius must be positive, got {radius}"))
            }
            _ => Ok(()),
        }
    }
}

/// Suspends the sweep between requests. Swapped out in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Checked between windows; once set the sweep flushes a snapshot and stops.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Initializing,
    Running,
    Completed,
    Failed,
}

/// Where the sweep stands after a window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Windows done, counting any skipped by `start_index`.
    pub index: usize,
    pub total: usize,
    pub unique_stores: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub unique_stores: usize,
    pub windows_total: usize,
    pub windows_processed: usize,
    pub windows_failed: usize,
    /// Windows where more stores matched than the page could hold.
    pub windows_truncated: usize,
    /// Candidates dropped for lacking a storeId and number.
    pub discarded: usize,
    pub checkpoints_failed: usize,
    pub cancelled: bool,
}

/// Walks the grid one window at a time, merging each page into the registry.
pub struct SweepController<T, S = TokioSleeper> {
    config: SweepConfig,
    executor: QueryExecutor<T>,
    sleeper: S,
    registry: Registry,
    phase: Phase,
    progress: Progress,
    cancel: CancelFlag,
}

impl<T: Transport> SweepController<T, TokioSleeper> {
    pub fn new(config: SweepConfig, executor: QueryExecutor<T>) -> Self {
        Self::with_sleeper(config, executor, TokioSleeper)
    }
}

impl<T: Transport, S: Sleeper> SweepController<T, S> {
    pub fn with_sleeper(config: SweepConfig, executor: QueryExecutor<T>, sleeper: S) -> Self {
        Self {
            config,
            executor,
            sleeper,
            registry: Registry::new(),
            phase: Phase::Idle,
            progress: Progress::default(),
            cancel: CancelFlag::default(),
        }
    }

    /// Seed the sweep with stores from an earlier run.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Run the sweep to the end of the grid, or until cancelled.
    ///
    /// Only setup failures are returned as errors. A window whose request fails
    /// is counted and skipped. `on_progress` is called after every window.
    pub async fn run<F>(&mut self, mut on_progress: F) -> Result<SweepSummary, SweepError>
    where
        F: FnMut(&Progress),
    {
        if self.phase != Phase::Idle {
            return Err(SweepError::AlreadyStarted);
        }
        self.phase = Phase::Initializing;
        let grid = match self.initialize().await {
            Ok(grid) => grid,
            Err(err) => {
                self.phase = Phase::Failed;
                tracing::error!(error = %err, "sweep setup failed");
                return Err(err);
            }
        };

        self.phase = Phase::Running;
        let total = grid.len();
        let start = self.config.start_index.min(total);
        let discarded_before = self.registry.discarded();
        let mut summary = SweepSummary {
            windows_total: total,
            ..SweepSummary::default()
        };
        self.progress = Progress {
            index: start,
            total,
            unique_stores: self.registry.size(),
        };
        tracing::info!(total, start, "sweep started");

        for (index, coordinate) in grid.iter().enumerate().skip(start) {
            if self.cancel.is_cancelled() {
                tracing::info!(index, "sweep cancelled");
                summary.cancelled = true;
                break;
            }
            let window = SearchWindow {
                coordinate: *coordinate,
                radius_m: self.config.radius_m,
            };
            match self.fetch_with_retries(index, &window).await {
                Ok(result) => {
                    if result.truncated {
                        summary.windows_truncated += 1;
                        tracing::warn!(
                            index,
                            lat = window.coordinate.lat,
                            lng = window.coordinate.lng,
                            total_count = result.total_count,
                            page_size = self.executor.page_size(),
                            "window has more stores than one page, extras are lost"
                        );
                    }
                    let returned = result.stores.len();
                    let report = self.registry.insert(result.stores);
                    tracing::debug!(
                        index,
                        total,
                        lat = window.coordinate.lat,
                        lng = window.coordinate.lng,
                        returned,
                        inserted = report.inserted,
                        unique = self.registry.size(),
                        "window done"
                    );
                }
                Err(err) => {
                    summary.windows_failed += 1;
                    tracing::warn!(
                        index,
                        lat = window.coordinate.lat,
                        lng = window.coordinate.lng,
                        error = %err,
                        "window failed, skipping"
                    );
                }
            }
            summary.windows_processed += 1;
            self.progress = Progress {
                index: index + 1,
                total,
                unique_stores: self.registry.size(),
            };
            on_progress(&self.progress);

            let every = self.config.checkpoint_every;
            if every > 0 && (index + 1) % every == 0 && !self.checkpoint().await {
                summary.checkpoints_failed += 1;
            }
            if index + 1 < total {
                self.sleeper.sleep(self.config.request_delay).await;
            }
        }

        if !self.checkpoint().await {
            summary.checkpoints_failed += 1;
        }
        summary.unique_stores = self.registry.size();
        summary.discarded = self.registry.discarded() - discarded_before;
        self.phase = Phase::Completed;
        tracing::info!(
            unique = summary.unique_stores,
            failed = summary.windows_failed,
            discarded = summary.discarded,
            truncated = summary.windows_truncated,
            cancelled = summary.cancelled,
            "sweep completed"
        );
        Ok(summary)
    }

    async fn initialize(&mut self) -> Result<Vec<grid::Coordinate>, SweepError> {
        let config = &self.config;
        let grid = grid::generate(&config.bounds, config.lat_step, config.lng_step)?;
        if !grid::covers(
            config.radius_m,
            config.lat_step,
            config.lng_step,
            config.bounds.widest_latitude(),
        ) {
            tracing::warn!(
                radius_m = config.radius_m,
                lat_step = config.lat_step,
                lng_step = config.lng_step,
                "search radius does not cover the grid spacing, stores between windows may be missed"
            );
        }
        self.executor.transport_mut().connect().await?;
        Ok(grid)
    }

    async fn fetch_with_retries(
        &self,
        index: usize,
        window: &SearchWindow,
    ) -> Result<WindowResult, QueryError> {
        let mut attempt = 0;
        loop {
            match self.executor.fetch(window).await {
                Ok(result) => return Ok(result),
                Err(err) if attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(index, attempt, error = %err, "window failed, retrying");
                    self.sleeper.sleep(self.config.request_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Returns false if the snapshot could not be written. Never fatal.
    async fn checkpoint(&self) -> bool {
        let Some(path) = &self.config.snapshot_path else {
            return true;
        };
        match self.registry.save(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), unique = self.registry.size(), "snapshot written");
                true
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unable to write snapshot");
                false
            }
        }
    }
}
