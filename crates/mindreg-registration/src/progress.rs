//! Progress tracking and callbacks for registration workflows.
//!
//! The pipeline runs fixed iteration budgets, so progress is reported per
//! stage and per step within a stage rather than against a loss curve.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Pipeline stage being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Descriptor extraction of one volume.
    Descriptor,
    /// Cost volume construction and initial labels.
    CostVolume,
    /// One coupled convex round.
    CoupledConvex,
    /// One inverse-consistency iteration.
    InverseConsistency,
    /// Upsampling to full resolution.
    Upsample,
    /// One least-trimmed rigid round.
    RigidFit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Descriptor => "descriptor",
            Stage::CostVolume => "cost volume",
            Stage::CoupledConvex => "coupled convex",
            Stage::InverseConsistency => "inverse consistency",
            Stage::Upsample => "upsample",
            Stage::RigidFit => "rigid fit",
        };
        f.write_str(name)
    }
}

/// Progress information for one pipeline step.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Stage of the pipeline.
    pub stage: Stage,
    /// Step within the stage, starting at 1.
    pub step: usize,
    /// Number of steps of the stage (if known).
    pub total_steps: Option<usize>,
    /// Time elapsed since start.
    pub elapsed: Duration,
    /// Stage-specific measurements.
    pub metrics: Vec<(String, f64)>,
}

impl ProgressInfo {
    /// Create new progress information.
    pub fn new(stage: Stage, step: usize, total_steps: Option<usize>, elapsed: Duration) -> Self {
        Self {
            stage,
            step,
            total_steps,
            elapsed,
            metrics: Vec::new(),
        }
    }

    /// Calculate progress percentage within the stage.
    pub fn progress_percent(&self) -> Option<f64> {
        self.total_steps
            .filter(|&total| total > 0)
            .map(|total| (self.step as f64 / total as f64) * 100.0)
    }

    /// Add a custom metric.
    pub fn add_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.push((name.into(), value));
    }

    /// Look up a metric by name.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

/// Progress callback trait for monitoring registration progress.
pub trait ProgressCallback: Send + Sync {
    /// Called after each step with progress information.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when registration starts.
    fn on_start(&self) {
        // Default: no-op
    }

    /// Called when registration completes successfully.
    fn on_complete(&self, _elapsed: Duration) {
        // Default: no-op
    }

    /// Called when registration fails.
    fn on_error(&self, _error: &str) {
        // Default: no-op
    }
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone, Default)]
pub struct ConsoleProgressCallback {
    /// Log every step instead of only the last step of each stage.
    pub verbose: bool,
}

impl ConsoleProgressCallback {
    /// Create a new console progress callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every step.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        let last = info.total_steps.map_or(true, |total| info.step >= total);
        if !(self.verbose || last) {
            return;
        }

        tracing::info!(
            "{} {}/{} | Elapsed: {:.2}s",
            info.stage,
            info.step,
            info.total_steps.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()),
            info.elapsed.as_secs_f64()
        );
        for (name, value) in &info.metrics {
            tracing::info!("  {}: {:.6}", name, value);
        }
    }

    fn on_start(&self) {
        tracing::info!("Registration started");
    }

    fn on_complete(&self, elapsed: Duration) {
        tracing::info!("Registration completed in {:.2}s", elapsed.as_secs_f64());
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Registration failed: {}", error);
    }
}

/// History callback that records all progress information.
#[derive(Debug, Clone)]
pub struct HistoryCallback {
    /// History of progress information.
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    /// Create a new history callback.
    pub fn new() -> Self {
        Self {
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the recorded history.
    pub fn get_history(&self) -> Vec<ProgressInfo> {
        self.history.lock().unwrap().clone()
    }

    /// Recorded entries of one stage.
    pub fn stage_history(&self, stage: Stage) -> Vec<ProgressInfo> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|info| info.stage == stage)
            .cloned()
            .collect()
    }

    /// Clear the history.
    pub fn clear(&self) {
        self.history.lock().unwrap().clear();
    }
}

impl Default for HistoryCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        self.history.lock().unwrap().push(info.clone());
    }
}

/// Progress tracker that manages multiple callbacks.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    /// Registered callbacks.
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    /// Start time.
    start_time: Arc<Mutex<Option<Instant>>>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback.
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Whether any callback is registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Start tracking.
    pub fn start(&self) {
        *self.start_time.lock().unwrap() = Some(Instant::now());
        for callback in &self.callbacks {
            callback.on_start();
        }
    }

    fn elapsed(&self) -> Duration {
        let start_time = *self.start_time.lock().unwrap();
        start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    /// Report one step of a stage.
    pub fn update(&self, stage: Stage, step: usize, total_steps: Option<usize>, metrics: &[(&str, f64)]) {
        if self.callbacks.is_empty() {
            return;
        }

        let mut info = ProgressInfo::new(stage, step, total_steps, self.elapsed());
        for (name, value) in metrics {
            info.add_metric(*name, *value);
        }

        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    /// Complete tracking.
    pub fn complete(&self) {
        let elapsed = self.elapsed();
        for callback in &self.callbacks {
            callback.on_complete(elapsed);
        }
    }

    /// Report error.
    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}
