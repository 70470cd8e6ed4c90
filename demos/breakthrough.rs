//! Example: breakthrough curve of a fixed bed
//!
//! Runs the column described by a JSON configuration (or the built-in
//! defaults) and prints the outlet concentration at every checkpoint.
//!
//! ```bash
//! cargo run --example breakthrough
//! cargo run --example breakthrough -- run.json
//! RUST_LOG=debug cargo run --example breakthrough -- run.json
//! ```
//!
//! A minimal configuration with sorption:
//!
//! ```json
//! {
//!   "column": { "length": 1.0, "dispersion": 1e-3, "velocity": 1e-2, "inlet_concentration": 1.0 },
//!   "sorption": { "density": 1.0, "transfer_rate": 0.1, "capacity": 1.0, "affinity": 1.0 },
//!   "grid": { "nodes": 51, "checkpoints": 21, "duration": 200.0 },
//!   "solver": { "method": "sdirk", "relative_tolerance": 1e-6 }
//! }
//! ```

use sorb_rs::config::SimulationConfig;
use sorb_rs::physics::PhysicalQuantity;

use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_str(&std::fs::read_to_string(&path)?)?,
        None => SimulationConfig::default(),
    };

    println!("═══════════════════════════════════════════════════════");
    println!("  Fixed-bed breakthrough");
    println!("═══════════════════════════════════════════════════════\n");

    println!("Column:");
    println!("  L (length)     : {}", config.column.length);
    println!("  D (dispersion) : {}", config.column.dispersion);
    println!("  v (velocity)   : {}", config.column.velocity);
    println!("  C_in (feed)    : {}", config.column.inlet_concentration);
    match &config.sorption {
        Some(sorption) => println!(
            "  sorption       : K_F = {}, q_max = {}, K_L = {}\n",
            sorption.transfer_rate, sorption.capacity, sorption.affinity
        ),
        None => println!("  sorption       : none\n"),
    }

    let start = Instant::now();
    let result = config.run()?;
    let elapsed = start.elapsed();

    println!("Solver: {}", result.metadata("solver").unwrap_or("?"));
    println!("  accepted steps : {}", result.metadata("accepted steps").unwrap_or("?"));
    println!("  rejected steps : {}", result.metadata("rejected steps").unwrap_or("?"));
    println!("  wall time      : {:.2?}\n", elapsed);

    let outlet = result
        .breakthrough(PhysicalQuantity::Concentration)
        .ok_or("no concentration field in the result")?;

    println!("{:>12}  {:>14}  {:>8}", "t", "C(L, t)", "C/C_in");
    for (t, c) in result.time_points.iter().zip(outlet.iter()) {
        let relative = if config.column.inlet_concentration != 0.0 {
            c / config.column.inlet_concentration
        } else {
            0.0
        };
        println!("{:>12.3}  {:>14.6e}  {:>8.4}", t, c, relative);
    }

    Ok(())
}
