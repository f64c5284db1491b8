//! Top-level driving loop.
//!
//! The [`RootCoordinator`] owns the simulation clock and the root
//! [`Coordinator`]. It advances time from one scheduled transition to the
//! next, optionally checks runtime rules after every cycle and collects run
//! statistics.

use thiserror::Error;
use tracing::{debug, info};

use crate::clock::SimulationClock;
use crate::config::{ConfigError, RulesConfig, SimulationParams};
use crate::coupled::{Coupled, PortSource};
use crate::event::Event;
use crate::executor::Coordinator;
use crate::port::Port;
use crate::rules::{RuleError, RuleEvaluator, RuleReport};
use crate::stats::{SimulationStats, StatsCollector};
use crate::types::{SimTime, INFINITY};

/// Errors that stop the driving loop.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("rule '{rule}' violated at t = {time}: {expr}")]
    RuleViolation {
        rule: String,
        expr: String,
        time: SimTime,
    },

    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot inject at t = {time}: the next transition is at t = {tn}")]
    InjectOutOfBounds { time: SimTime, tn: SimTime },

    #[error("model has no input port '{0}'")]
    UnknownInput(String),
}

/// Result type for driving operations.
pub type SimulationResult<T> = Result<T, SimulationError>;

/// The root of the executor tree.
///
/// # Example
///
/// ```ignore
/// let (mut model, report) = efp("efp", 1.0, 3.0, 100.0)?;
/// let mut root = RootCoordinator::new(&mut model);
/// root.initialize();
/// root.simulate_time(500.0)?;
/// root.exit();
/// println!("{}", root.stats().summary());
/// ```
pub struct RootCoordinator<'a> {
    clock: SimulationClock,
    coordinator: Coordinator<'a>,
    rules: Option<RuleEvaluator>,
    last_report: RuleReport,
    collector: StatsCollector,
}

impl<'a> RootCoordinator<'a> {
    /// Borrows `model` for the lifetime of the run.
    pub fn new(model: &'a mut Coupled) -> Self {
        let collector = StatsCollector::new(model.name(), model.counts());
        Self {
            clock: SimulationClock::new(),
            coordinator: Coordinator::new(model),
            rules: None,
            last_report: RuleReport::default(),
            collector,
        }
    }

    /// Compiles `config` against `model` before the run starts. Any compile
    /// failure is returned here, so no cycle ever runs with a broken rule.
    pub fn with_rules(model: &'a mut Coupled, config: &RulesConfig) -> SimulationResult<Self> {
        let evaluator = RuleEvaluator::new(config, model)?;
        let mut root = Self::new(model);
        root.rules = Some(evaluator);
        Ok(root)
    }

    /// Initializes the whole tree at the current clock time.
    pub fn initialize(&mut self) {
        self.coordinator.initialize(&self.clock);
        self.collector.start();
        debug!(
            model = %self.coordinator.component().name(),
            tn = self.coordinator.tn(),
            "initialized"
        );
    }

    /// Runs one cycle at the next scheduled time, then moves the clock to
    /// the following one. Returns `false` when nothing is scheduled.
    pub fn step(&mut self) -> SimulationResult<bool> {
        let tn = self.coordinator.tn();
        if tn == INFINITY {
            self.clock.set_time(INFINITY);
            return Ok(false);
        }

        self.clock.set_time(tn);
        debug!(time = tn, "cycle");

        self.coordinator.lambda(&self.clock);
        self.coordinator.deltfcn(&self.clock);
        self.check_rules()?;
        self.coordinator.clear();

        self.collector.record_iteration(tn);
        self.clock.set_time(self.coordinator.tn());
        Ok(true)
    }

    /// Runs at most `iterations` cycles.
    pub fn simulate(&mut self, iterations: u64) -> SimulationResult<()> {
        self.clock.set_time(self.coordinator.tn());
        self.drive(Some(iterations), INFINITY)
    }

    /// Moves the clock to the next scheduled time, then runs cycles while the
    /// clock is less than that time plus `duration`.
    pub fn simulate_time(&mut self, duration: SimTime) -> SimulationResult<()> {
        self.clock.set_time(self.coordinator.tn());
        let until = self.clock.time() + duration;
        self.drive(None, until)
    }

    /// Runs with the limits in `params`; with neither limit set it runs
    /// until no transition is scheduled.
    pub fn run(&mut self, params: &SimulationParams) -> SimulationResult<()> {
        params.validate()?;
        self.clock.set_time(self.coordinator.tn());
        let until = match params.time_budget {
            Some(duration) => self.clock.time() + duration,
            None => INFINITY,
        };
        self.drive(params.iterations, until)?;

        if params.collect_stats {
            info!(summary = %self.collector.stats().summary(), "run statistics");
        }
        Ok(())
    }

    fn drive(&mut self, iterations: Option<u64>, until: SimTime) -> SimulationResult<()> {
        let mut done = 0u64;
        while self.clock.time() < until && self.clock.time() != INFINITY {
            if iterations.is_some_and(|limit| done >= limit) {
                break;
            }
            if !self.step()? {
                break;
            }
            done += 1;
        }
        Ok(())
    }

    /// Delivers `values` to one of the root's input ports, `elapsed` time
    /// units after the current clock, and runs the resulting transitions.
    ///
    /// The injection time may not lie past the next scheduled transition.
    /// When it equals that transition, the imminent models emit their
    /// output first, so the injected values and their output arrive in the
    /// same bag, as in a regular cycle. Rules are not checked for an
    /// injection.
    pub fn inject<I>(&mut self, elapsed: SimTime, port: &str, values: I) -> SimulationResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Event>,
    {
        let time = self.clock.time() + elapsed;
        let tn = self.coordinator.tn();
        if time > tn {
            return Err(SimulationError::InjectOutOfBounds { time, tn });
        }

        let id = self
            .coordinator
            .component()
            .port_id_by_name(port)
            .filter(|id| id.is_input())
            .ok_or_else(|| SimulationError::UnknownInput(port.to_string()))?;
        let target = self
            .coordinator
            .port_mut(id)
            .ok_or_else(|| SimulationError::UnknownInput(port.to_string()))?;
        target.add_values(values.into_iter().map(Into::into));

        self.clock.set_time(time);
        debug!(time, port, "inject");
        if time == tn {
            self.coordinator.lambda(&self.clock);
        }
        self.coordinator.deltfcn(&self.clock);
        self.coordinator.clear();
        self.collector.record_injection();
        Ok(())
    }

    fn check_rules(&mut self) -> SimulationResult<()> {
        let Some(rules) = self.rules.as_mut() else {
            return Ok(());
        };
        if !rules.has_rules() {
            return Ok(());
        }

        match rules.check_rules(&self.coordinator) {
            Ok(report) => {
                self.collector.record_rules(&report);
                self.last_report = report;
                Ok(())
            }
            Err(RuleError::Violation { rule, expr }) => Err(SimulationError::RuleViolation {
                rule,
                expr,
                time: self.clock.time(),
            }),
            Err(other) => Err(other.into()),
        }
    }

    /// Runs every model's exit hook and finalizes the statistics.
    pub fn exit(&mut self) {
        self.coordinator.exit();
        self.collector.stop();
        let stats = self.collector.stats();
        info!(
            model = %stats.metadata.name,
            iterations = stats.engine.iterations,
            final_time = stats.engine.final_time,
            wall_ms = stats.timing.total_wall_time_ms,
            "simulation finished"
        );
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn tn(&self) -> SimTime {
        self.coordinator.tn()
    }

    pub fn coordinator(&self) -> &Coordinator<'a> {
        &self.coordinator
    }

    pub fn rules(&self) -> Option<&RuleEvaluator> {
        self.rules.as_ref()
    }

    /// The report of the most recent rule check.
    pub fn last_report(&self) -> &RuleReport {
        &self.last_report
    }

    /// Resolves a port of the running tree.
    pub fn port_from_path(&self, path: &str) -> Option<&Port> {
        self.coordinator.port_from_path(path)
    }

    pub fn stats(&self) -> &SimulationStats {
        self.collector.stats()
    }

    /// Exports the run statistics and the current schedule.
    pub fn export_stats(&self) -> serde_json::Value {
        let stats = self.collector.stats();
        serde_json::json!({
            "engine": {
                "model": stats.metadata.name,
                "clock": finite_or_null(self.clock.time()),
                "next_transition": finite_or_null(self.coordinator.tn()),
                "final_time": stats.engine.final_time,
                "iterations": stats.engine.iterations,
                "injections": stats.engine.injections,
                "atomic_count": stats.engine.atomic_count,
                "coupled_count": stats.engine.coupled_count,
                "coupling_count": stats.engine.coupling_count,
            },
            "rules": {
                "loaded": self.rules.as_ref().map_or(0, RuleEvaluator::rule_count),
                "checks": stats.rules.checks,
                "notices": stats.rules.notices,
                "skipped": stats.rules.skipped,
            },
            "timing": {
                "wall_time_ms": stats.timing.total_wall_time_ms,
                "iterations_per_second": stats.timing.iterations_per_second,
            },
        })
    }
}

impl PortSource for RootCoordinator<'_> {
    fn port_at(&self, locator: &crate::coupled::PortLocator) -> Option<&Port> {
        self.coordinator.port_at(locator)
    }
}

fn finite_or_null(time: SimTime) -> Option<SimTime> {
    time.is_finite().then_some(time)
}
