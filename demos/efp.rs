//! Experimental frame / processor example.
//!
//! A generator produces a job every time unit, a processor serves one job at
//! a time and a transducer measures turnaround and throughput until the
//! observation window closes. Two rules watch the run:
//!
//! - `long_job` (info): a job id above 90 leaves the processor
//! - `runaway` (error): the generator goes past job 1000
//!
//! Run with: `cargo run --example efp`
//! Set `RUST_LOG=hdevs=debug` to see every cycle.

use hdevs::models::efp;
use hdevs::{RootCoordinator, RulesConfig, SimTime, SimulationParams};

const GENERATOR_PERIOD: SimTime = 1.0;
const PROCESSING_TIME: SimTime = 3.0;
const OBSERVATION_TIME: SimTime = 100.0;

const RULES: &str = r#"
vars:
  solved: "efp.processor.out"
rules:
  long_job:
    expr: "solved > 90"
    level: info
  runaway:
    expr: "efp.ef.generator.out > 1000"
    level: error
"#;

const PARAMS: &str = r#"
log_level: info
collect_stats: true
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let params = SimulationParams::from_yaml(PARAMS)?;
    hdevs::init_logging(&params.log_level);

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║           Experimental Frame / Processor                 ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║   Generator period:  {:<37}║", GENERATOR_PERIOD);
    println!("║   Processing time:   {:<37}║", PROCESSING_TIME);
    println!("║   Observation time:  {:<37}║", OBSERVATION_TIME);
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    let (mut model, report) = efp("efp", GENERATOR_PERIOD, PROCESSING_TIME, OBSERVATION_TIME)?;
    let rules = RulesConfig::from_yaml(RULES)?;

    let mut root = RootCoordinator::with_rules(&mut model, &rules)?;
    root.initialize();
    root.run(&params)?;
    root.exit();

    let report = report.lock().clone();
    println!("Transducer report");
    println!("  End time:        {}", report.end_time);
    println!("  Jobs arrived:    {}", report.jobs_arrived);
    println!("  Jobs solved:     {}", report.jobs_solved);
    println!("  Avg turnaround:  {:.3}", report.avg_turnaround);
    println!("  Throughput:      {:.3}", report.throughput);
    println!();

    print!("{}", root.stats().summary());
    println!();
    println!("{}", serde_json::to_string_pretty(&root.export_stats())?);

    Ok(())
}
