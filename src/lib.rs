//! # hdevs
//!
//! A hierarchical DEVS (Discrete Event System Specification) simulation
//! kernel with a declarative rule checker that watches port values while the
//! simulation runs.
//!
//! ## Design Principles
//!
//! - **Model tree**: atomic models hold state and transition functions;
//!   coupled models own their children and the couplings between their
//!   ports.
//! - **Abstract simulators**: a run builds one [`Simulator`] per atomic model
//!   and one [`Coordinator`] per coupled model, mirroring the model tree.
//!   The tree is borrowed, never restructured, for the run.
//! - **Logical time**: the clock is a plain `f64`. `+infinity` means nothing
//!   is scheduled and ends the run.
//! - **Rules**: variables and rules written as small expressions over port
//!   values are checked after every transition phase. Error rules stop the
//!   run.
//!
//! ## Features
//!
//! - `parallel` - Run sibling transition and output functions on a rayon pool
//!
//! ## Quick Start
//!
//! ```rust
//! use hdevs::models::efp;
//! use hdevs::RootCoordinator;
//!
//! let (mut model, report) = efp("efp", 1.0, 3.0, 100.0).unwrap();
//!
//! let mut root = RootCoordinator::new(&mut model);
//! root.initialize();
//! root.simulate_time(hdevs::INFINITY).unwrap();
//! root.exit();
//!
//! assert_eq!(report.lock().jobs_solved, 32);
//! ```
//!
//! ## Rule Checking
//!
//! ```rust,ignore
//! use hdevs::{RootCoordinator, RulesConfig};
//!
//! let rules = RulesConfig::from_file("rules.yaml")?;
//! let mut root = RootCoordinator::with_rules(&mut model, &rules)?;
//! root.initialize();
//! root.simulate(1_000)?;
//! ```

pub mod types;
pub mod event;
pub mod port;
pub mod component;
pub mod atomic;
pub mod coupling;
pub mod coupled;
pub mod clock;
pub mod executor;
pub mod engine;
pub mod rules;
pub mod config;
pub mod stats;
pub mod models;

// Re-export commonly used types
pub use types::{SimTime, INFINITY, PHASE_ACTIVE, PHASE_PASSIVE};
pub use event::{Event, Value, ValueKind};
pub use port::{Port, PortDirection, PortId};
pub use component::Component;
pub use atomic::{Atomic, AtomicState};
pub use coupling::{ComponentRef, Coupling, PortRef};
pub use coupled::{ComponentId, Coupled, Model, ModelError, PortLocator, PortSource, TreeCounts};
pub use clock::SimulationClock;
pub use executor::{AbstractSimulator, Coordinator, Simulator};
pub use engine::{RootCoordinator, SimulationError, SimulationResult};
pub use rules::{EvalError, RuleError, RuleEvaluator, RuleReport};
pub use config::{ConfigError, RuleSpec, RulesConfig, Severity, SimulationParams};
pub use stats::{SimulationStats, StatsCollector, Timer, TransitionCounters, TransitionCounts};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging. `RUST_LOG`
/// takes precedence over `level` when set.
///
/// # Example
///
/// ```rust,ignore
/// hdevs::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
