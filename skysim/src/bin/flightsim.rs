//! Headless simulation runner.
//!
//! Loads an optional JSON configuration (first CLI argument), runs one
//! simulation to completion and prints the summary block. External
//! renderers attach through the observation sink instead; pass `-v` to
//! stream observations to stderr.

use std::fs;

use anyhow::Context;

use skymesh::config::SimConfig;
use skysim::observe::PrintSink;
use skysim::sim::Simulation;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut config_path = None;
    let mut verbose = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            other => config_path = Some(other.to_string()),
        }
    }

    let cfg = match &config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str::<SimConfig>(&raw)
                .with_context(|| format!("parsing config file {path}"))?
        }
        None => SimConfig::default(),
    };

    let mut sim = Simulation::new(cfg).context("building simulation")?;
    if verbose {
        sim = sim.with_sink(Box::new(PrintSink));
    }
    let result = sim.run();
    let report = result.report();

    println!("=== Simulation Summary ===");
    println!(
        "Nodes: {}  Range: {} m  Duration: {} s",
        sim.num_nodes(),
        sim.config().comm_range,
        sim.config().sim_time_s
    );
    println!(
        "Data attempted: {}  delivered: {}  (MAC drops: {})",
        report.attempted,
        report.delivered,
        sim.metrics().mac_dropped
    );
    println!("Delivery ratio: {:.3}", report.pdr);
    if report.delivered > 0 {
        println!("Avg latency: {:.4} s", report.avg_latency_s);
        println!("Avg hops: {:.3}", report.avg_hops);
    }
    Ok(())
}
