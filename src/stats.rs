//! Statistics collection and export for simulation runs.
//!
//! This module provides run statistics with JSON, CSV and plain-text
//! export, plus [`TransitionCounters`], an explicit collector that models can
//! share to count their own transitions.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::coupled::TreeCounts;
use crate::rules::RuleReport;
use crate::types::SimTime;

/// Aggregate statistics for a simulation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Simulation metadata
    pub metadata: SimulationMetadata,

    /// Driving loop statistics
    pub engine: EngineStats,

    /// Rule checking statistics
    pub rules: RuleStats,

    /// Timing statistics
    pub timing: TimingStats,
}

/// Metadata about the simulation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationMetadata {
    /// Name of the root model
    pub name: String,

    /// Start time (wall clock)
    pub start_time: Option<String>,

    /// End time (wall clock)
    pub end_time: Option<String>,

    /// Crate version
    pub version: String,
}

/// Driving loop statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Time of the last executed cycle
    pub final_time: SimTime,

    /// Number of executed cycles
    pub iterations: u64,

    /// Number of external injections
    pub injections: u64,

    /// Atomic models in the tree
    pub atomic_count: usize,

    /// Coupled models in the tree, root included
    pub coupled_count: usize,

    /// Couplings in the tree (IC + EIC + EOC)
    pub coupling_count: usize,
}

/// Rule checking statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleStats {
    /// Cycles in which rules were checked
    pub checks: u64,

    /// Info rules that triggered, summed over all cycles
    pub notices: u64,

    /// Variables and rules skipped, summed over all cycles
    pub skipped: u64,
}

/// Timing/performance statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimingStats {
    /// Total wall-clock time in milliseconds
    pub total_wall_time_ms: f64,

    /// Cycles executed per wall-clock second
    pub iterations_per_second: f64,
}

impl SimulationStats {
    /// Creates a new empty statistics container.
    pub fn new() -> Self {
        Self {
            metadata: SimulationMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..SimulationMetadata::default()
            },
            ..Self::default()
        }
    }

    /// Sets the simulation name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = name.into();
        self
    }

    /// Records the shape of the simulated tree.
    pub fn with_counts(mut self, counts: TreeCounts) -> Self {
        self.engine.atomic_count = counts.atomics;
        self.engine.coupled_count = counts.coupleds;
        self.engine.coupling_count = counts.ic + counts.eic + counts.eoc;
        self
    }

    /// Records the start time.
    pub fn record_start(&mut self) {
        self.metadata.start_time = Some(timestamp_now());
    }

    /// Records the end time.
    pub fn record_end(&mut self) {
        self.metadata.end_time = Some(timestamp_now());
    }

    /// Updates timing statistics based on wall clock time.
    pub fn compute_timing(&mut self, wall_time_ms: f64) {
        self.timing.total_wall_time_ms = wall_time_ms;

        if wall_time_ms > 0.0 {
            let seconds = wall_time_ms / 1000.0;
            self.timing.iterations_per_second = self.engine.iterations as f64 / seconds;
        }
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports summary statistics to CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("metric,value\n");

        csv.push_str(&format!("final_time,{}\n", self.engine.final_time));
        csv.push_str(&format!("iterations,{}\n", self.engine.iterations));
        csv.push_str(&format!("injections,{}\n", self.engine.injections));
        csv.push_str(&format!("atomic_count,{}\n", self.engine.atomic_count));
        csv.push_str(&format!("coupled_count,{}\n", self.engine.coupled_count));
        csv.push_str(&format!("coupling_count,{}\n", self.engine.coupling_count));

        csv.push_str(&format!("rule_checks,{}\n", self.rules.checks));
        csv.push_str(&format!("rule_notices,{}\n", self.rules.notices));
        csv.push_str(&format!("rule_skipped,{}\n", self.rules.skipped));

        csv.push_str(&format!("wall_time_ms,{:.2}\n", self.timing.total_wall_time_ms));
        csv.push_str(&format!(
            "iterations_per_second,{:.2}\n",
            self.timing.iterations_per_second
        ));

        csv
    }

    /// Exports summary statistics to CSV file.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        write!(w, "{}", self)
    }

    /// Returns a summary string.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SimulationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Statistics ===")?;
        writeln!(f)?;

        if !self.metadata.name.is_empty() {
            writeln!(f, "Model: {}", self.metadata.name)?;
        }
        if let Some(ref start) = self.metadata.start_time {
            writeln!(f, "Started: {}", start)?;
        }
        if let Some(ref end) = self.metadata.end_time {
            writeln!(f, "Ended: {}", end)?;
        }
        writeln!(f)?;

        writeln!(f, "--- Engine ---")?;
        writeln!(f, "Final simulation time: {}", self.engine.final_time)?;
        writeln!(f, "Iterations: {}", self.engine.iterations)?;
        writeln!(f, "Injections: {}", self.engine.injections)?;
        writeln!(
            f,
            "Models: {} atomic, {} coupled",
            self.engine.atomic_count, self.engine.coupled_count
        )?;
        writeln!(f, "Couplings: {}", self.engine.coupling_count)?;
        writeln!(f)?;

        if self.rules.checks > 0 {
            writeln!(f, "--- Rules ---")?;
            writeln!(f, "Checks: {}", self.rules.checks)?;
            writeln!(f, "Notices: {}", self.rules.notices)?;
            writeln!(f, "Skipped: {}", self.rules.skipped)?;
            writeln!(f)?;
        }

        writeln!(f, "--- Timing ---")?;
        writeln!(f, "Wall time: {:.2} ms", self.timing.total_wall_time_ms)?;
        writeln!(f, "Iterations/sec: {:.2}", self.timing.iterations_per_second)
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

/// Seconds since the Unix epoch.
fn timestamp_now() -> String {
    let now = std::time::SystemTime::now();
    let duration = now.duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    format!("{}s", duration.as_secs())
}

/// Statistics collector owned by the driving loop.
#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: SimulationStats,
    timer: Option<Timer>,
}

impl StatsCollector {
    /// Creates a new collector.
    pub fn new(name: impl Into<String>, counts: TreeCounts) -> Self {
        Self {
            stats: SimulationStats::new().with_name(name).with_counts(counts),
            timer: None,
        }
    }

    /// Starts timing.
    pub fn start(&mut self) {
        self.timer = Some(Timer::start());
        self.stats.record_start();
    }

    /// Stops timing and computes final statistics.
    pub fn stop(&mut self) {
        self.stats.record_end();
        if let Some(ref timer) = self.timer {
            self.stats.compute_timing(timer.elapsed_ms());
        }
    }

    pub fn record_iteration(&mut self, time: SimTime) {
        self.stats.engine.iterations += 1;
        self.stats.engine.final_time = time;
    }

    pub fn record_injection(&mut self) {
        self.stats.engine.injections += 1;
    }

    pub fn record_rules(&mut self, report: &RuleReport) {
        self.stats.rules.checks += 1;
        self.stats.rules.notices += report.triggered.len() as u64;
        self.stats.rules.skipped += report.skipped.len() as u64;
    }

    /// Returns the collected statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Consumes the collector and returns the statistics.
    pub fn into_stats(self) -> SimulationStats {
        self.stats
    }
}

/// Transition counts gathered by a [`TransitionCounters`] collector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub internal: u64,
    pub external: u64,
    pub confluent: u64,
    /// Input values consumed by external transitions
    pub events: u64,
}

impl TransitionCounts {
    pub fn total(&self) -> u64 {
        self.internal + self.external + self.confluent
    }
}

/// A counter set shared by every model built with a clone of it.
///
/// Cloning is cheap and every clone updates the same counts, so a whole
/// model family can be observed without process-wide state.
#[derive(Clone, Debug, Default)]
pub struct TransitionCounters {
    inner: Arc<Mutex<TransitionCounts>>,
}

impl TransitionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_internal(&self) {
        self.inner.lock().internal += 1;
    }

    pub fn record_external(&self, events: usize) {
        let mut counts = self.inner.lock();
        counts.external += 1;
        counts.events += events as u64;
    }

    pub fn record_confluent(&self) {
        self.inner.lock().confluent += 1;
    }

    /// A copy of the current counts.
    pub fn snapshot(&self) -> TransitionCounts {
        *self.inner.lock()
    }

    pub fn reset(&self) {
        *self.inner.lock() = TransitionCounts::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_creation() {
        let stats = SimulationStats::new().with_name("Test Simulation");

        assert_eq!(stats.metadata.name, "Test Simulation");
        assert_eq!(stats.metadata.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_stats_json_export() {
        let mut stats = SimulationStats::new();
        stats.engine.final_time = 1000.0;
        stats.engine.iterations = 100;

        let json = stats.to_json().unwrap();
        assert!(json.contains("1000"));
        assert!(json.contains("\"iterations\": 100"));
    }

    #[test]
    fn test_stats_csv_export() {
        let mut stats = SimulationStats::new();
        stats.engine.final_time = 12.5;
        stats.engine.injections = 3;

        let csv = stats.to_csv();
        assert!(csv.starts_with("metric,value\n"));
        assert!(csv.contains("final_time,12.5"));
        assert!(csv.contains("injections,3"));
    }

    #[test]
    fn test_counts_are_recorded() {
        let counts = TreeCounts {
            atomics: 4,
            coupleds: 2,
            eic: 3,
            ic: 1,
            eoc: 2,
        };
        let stats = SimulationStats::new().with_counts(counts);
        assert_eq!(stats.engine.atomic_count, 4);
        assert_eq!(stats.engine.coupled_count, 2);
        assert_eq!(stats.engine.coupling_count, 6);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = timer.elapsed_ms();
        assert!(elapsed >= 10.0);
    }

    #[test]
    fn test_stats_collector() {
        let mut collector = StatsCollector::new("Test", TreeCounts::default());
        collector.start();

        collector.record_iteration(1.0);
        collector.record_iteration(2.5);
        collector.record_injection();
        collector.record_rules(&RuleReport {
            triggered: vec!["a".into(), "b".into()],
            skipped: vec!["c".into()],
        });

        std::thread::sleep(std::time::Duration::from_millis(5));

        collector.stop();

        let stats = collector.stats();
        assert_eq!(stats.metadata.name, "Test");
        assert_eq!(stats.engine.iterations, 2);
        assert_eq!(stats.engine.final_time, 2.5);
        assert_eq!(stats.engine.injections, 1);
        assert_eq!(stats.rules.checks, 1);
        assert_eq!(stats.rules.notices, 2);
        assert_eq!(stats.rules.skipped, 1);
        assert!(stats.timing.total_wall_time_ms >= 5.0);
    }

    #[test]
    fn test_summary_output() {
        let mut stats = SimulationStats::new().with_name("Summary Test");
        stats.engine.final_time = 1000.0;
        stats.engine.iterations = 100;

        let summary = stats.summary();
        assert!(summary.contains("Summary Test"));
        assert!(summary.contains("Iterations: 100"));
        assert!(!summary.contains("--- Rules ---"));

        let mut buf = Vec::new();
        stats.write_summary(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), summary);
    }

    #[test]
    fn test_transition_counters_are_shared() {
        let counters = TransitionCounters::new();
        let clone = counters.clone();

        counters.record_internal();
        clone.record_external(3);
        clone.record_confluent();

        let counts = counters.snapshot();
        assert_eq!(counts.internal, 1);
        assert_eq!(counts.external, 1);
        assert_eq!(counts.confluent, 1);
        assert_eq!(counts.events, 3);
        assert_eq!(counts.total(), 3);

        counters.reset();
        assert_eq!(clone.snapshot(), TransitionCounts::default());
    }
}
