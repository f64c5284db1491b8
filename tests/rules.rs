//! Integration tests for runtime rule checking.
//!
//! Rule documents are loaded from YAML and checked by the root coordinator
//! after every cycle of a running model.

use hdevs::models::gpt;
use hdevs::{
    Atomic, AtomicState, ComponentRef, Coupled, PortId, RootCoordinator, RuleError, RulesConfig,
    SimTime, SimulationError, SimulationParams, Value, PHASE_ACTIVE,
};

// ============================================================================
// Test Models
// ============================================================================

/// Emits `[1, 2, 3, ...]` arrays that grow by one element per period.
struct Ramp {
    state: AtomicState,
    length: i64,
}

impl Ramp {
    const OUT: PortId = PortId::output(0);

    fn new() -> Self {
        let mut state = AtomicState::new("ramp");
        state.add_out_port("out");
        Self { state, length: 1 }
    }
}

impl Atomic for Ramp {
    fn state(&self) -> &AtomicState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state
    }

    fn initialize(&mut self) {
        self.length = 1;
        self.state.hold_in(PHASE_ACTIVE, 1.0);
    }

    fn deltint(&mut self) {
        self.length += 1;
        self.state.hold_in(PHASE_ACTIVE, 1.0);
    }

    fn deltext(&mut self, _e: SimTime) {}

    fn lambda(&mut self) {
        let values: Vec<i64> = (1..=self.length).collect();
        self.state.port_mut(Self::OUT).add_value(values);
    }
}

fn ramp_model() -> Coupled {
    let mut top = Coupled::new("top");
    let out = top.add_out_port("out");
    let ramp = top.add_atomic(Ramp::new()).unwrap();
    top.add_coupling(ramp, Ramp::OUT, ComponentRef::This, out).unwrap();
    top
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_unresolved_port_fails_before_run() {
    let (mut model, _) = gpt("gpt", 1.0, 100.0).unwrap();
    let config = RulesConfig::from_yaml(
        r#"
rules:
  broken:
    expr: "gpt.nowhere.out > 1"
    level: error
"#,
    )
    .unwrap();

    match RootCoordinator::with_rules(&mut model, &config) {
        Err(SimulationError::Rules(RuleError::UnresolvedPort { item, path })) => {
            assert_eq!(item, "broken");
            assert_eq!(path, "gpt.nowhere.out");
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected an unresolved port"),
    }
}

#[test]
fn test_document_without_rules_is_rejected() {
    let (mut model, _) = gpt("gpt", 1.0, 100.0).unwrap();
    assert!(RulesConfig::from_yaml("vars:\n  a: \"1\"\n").is_err());

    let mut config = RulesConfig::new().with_var("a", "1");
    config.rules = None;
    assert!(matches!(
        RootCoordinator::with_rules(&mut model, &config),
        Err(SimulationError::Rules(RuleError::Config(_)))
    ));
}

// ============================================================================
// Checking During a Run
// ============================================================================

#[test]
fn test_error_rule_stops_run() {
    let (mut model, report) = gpt("gpt", 1.0, 100.0).unwrap();
    let config = RulesConfig::from_yaml(
        r#"
vars:
  job: "gpt.generator.out"
rules:
  late:
    expr: "job > 50"
    level: error
"#,
    )
    .unwrap();

    let mut root = RootCoordinator::with_rules(&mut model, &config).unwrap();
    root.initialize();
    let err = root.simulate_time(hdevs::INFINITY).unwrap_err();

    match err {
        SimulationError::RuleViolation { rule, expr, time } => {
            assert_eq!(rule, "late");
            assert_eq!(expr, "job > 50");
            assert_eq!(time, 51.0);
        }
        other => panic!("unexpected error: {}", other),
    }

    // the offending cycle was not cleared
    let port = root.port_from_path("gpt.generator.out").unwrap();
    assert_eq!(port.single_payload(), Some(&Value::Integer(51)));
    assert_eq!(root.stats().engine.iterations, 50);
    assert!(!report.lock().finished);
}

#[test]
fn test_info_rules_are_counted() {
    let (mut model, _) = gpt("gpt", 1.0, 100.0).unwrap();
    let config = RulesConfig::from_yaml(
        r#"
rules:
  finished_job:
    expr: "gpt.processor.out >= 1"
    level: info
"#,
    )
    .unwrap();

    let mut root = RootCoordinator::with_rules(&mut model, &config).unwrap();
    root.initialize();
    root.run(&SimulationParams::new().time_budget(20.0)).unwrap();

    // the processor finishes jobs at t = 4, 7, 10, 13, 16, 19
    let stats = root.stats();
    assert_eq!(stats.engine.iterations, 20);
    assert_eq!(stats.rules.checks, 20);
    assert_eq!(stats.rules.notices, 6);
    assert_eq!(stats.rules.skipped, 14);

    let exported = root.export_stats();
    assert_eq!(exported["rules"]["loaded"], 1);
    assert_eq!(exported["rules"]["notices"], 6);
}

#[test]
fn test_slices_and_aggregates_on_live_ports() {
    let mut model = ramp_model();
    let config = RulesConfig::from_yaml(
        r#"
vars:
  head: "top.out[0:2]"
  total: "sum top.ramp.out[0:3]"
rules:
  prefix:
    expr: "head == {1,2}"
    level: info
  too_big:
    expr: "max(top.out[0:4]) > 4"
    level: error
"#,
    )
    .unwrap();

    let mut root = RootCoordinator::with_rules(&mut model, &config).unwrap();
    root.initialize();

    // t = 1: a single element, both slices are out of range
    root.simulate(1).unwrap();
    assert!(root.last_report().triggered.is_empty());
    assert_eq!(root.last_report().skipped.len(), 4);

    // t = 3: [1, 2, 3]
    root.simulate(2).unwrap();
    assert_eq!(root.last_report().triggered, vec!["prefix".to_string()]);
    assert_eq!(root.rules().unwrap().variable("total"), Some(&Value::Integer(6)));
    assert_eq!(root.last_report().skipped, vec!["too_big".to_string()]);

    // t = 4 and later: max of the first four elements never exceeds 4
    root.simulate(10).unwrap();
    assert_eq!(root.clock().time(), 14.0);
    assert!(root.last_report().skipped.is_empty());
}
