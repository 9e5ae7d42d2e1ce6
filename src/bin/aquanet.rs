use clap::{Parser, Subcommand};
use std::fs;
use std::process::ExitCode;
use std::time::Instant;

use aquanet::io::csv_io::write_results;
use aquanet::io::net_binary_io;
use aquanet::io::net_text_io::read_network_file;
use aquanet::network::WaterNetwork;
use aquanet::sim::EpsSimulator;

#[derive(Parser)]
#[command(name = "aquanet")]
#[command(about = "A command line interface for the Aquanet water-distribution hydraulic solver")]
#[command(version = env!("AQUANET_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an extended-period hydraulic simulation
    Solve {
        /// Path to the network file (.aqnb binary, anything else is text)
        input: String,
        /// Override the simulation duration (seconds)
        #[arg(long)]
        duration: Option<u64>,
        /// Override the hydraulic timestep (seconds)
        #[arg(long)]
        step: Option<u64>,
        /// Write results to a CSV file
        #[arg(short, long)]
        output: Option<String>,
        /// Write a JSON run summary
        #[arg(long)]
        summary: Option<String>,
        /// Suppress per-step progress output
        #[arg(short, long)]
        quiet: bool,
        /// Report execution time profile
        #[arg(short = 'p', long)]
        profile: bool,
    },
    /// Print network statistics
    Info {
        /// Path to the network file (.aqnb binary, anything else is text)
        input: String,
    },
    /// Convert a text network file to the binary format
    Pack {
        /// Path to the text network file
        input: String,
        /// Path of the binary file to write
        output: String,
    },
}

fn load_network(path: &str) -> Result<WaterNetwork, String> {
    if path.ends_with(".aqnb") {
        net_binary_io::read_network(path).map_err(String::from)
    } else {
        read_network_file(path)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            input,
            duration,
            step,
            output,
            summary,
            quiet,
            profile,
        } => {
            let total_start = Instant::now();

            let load_start = Instant::now();
            if !quiet {
                println!("Loading network file: {}", input);
            }
            let mut network = match load_network(&input) {
                Ok(n) => n,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::from(2);
                }
            };
            if let Some(d) = duration {
                network.options.duration_sec = d;
            }
            if let Some(s) = step {
                network.options.hydraulic_step_sec = s;
            }
            let load_time = load_start.elapsed();

            let sim_start = Instant::now();
            let mut simulator = EpsSimulator::new(network);
            simulator.set_quiet(quiet);
            let results = match simulator.run() {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::from(2);
                }
            };
            let sim_time = sim_start.elapsed();

            let output_start = Instant::now();
            if let Some(path) = output {
                match write_results(&path, &results) {
                    Ok(_) => {
                        if !quiet {
                            println!("Results written to: {}", path);
                        }
                    }
                    Err(e) => eprintln!("Error: {}", String::from(e)),
                }
            }
            if let Some(path) = summary {
                match serde_json::to_string_pretty(&results.summary()) {
                    Ok(json) => match fs::write(&path, json) {
                        Ok(_) => {
                            if !quiet {
                                println!("Summary written to: {}", path);
                            }
                        }
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            let output_time = output_start.elapsed();
            let total_time = total_start.elapsed();

            for event in &results.events {
                eprintln!("Event at t = {} s: {}", event.time_sec, event.message);
            }

            if profile {
                let misc_time = total_time.saturating_sub(load_time + sim_time + output_time);
                println!("\n=== Execution Profile ===");
                println!("  Loading time:    {:>10.3} ms", load_time.as_secs_f64() * 1000.0);
                println!("  Simulation time: {:>10.3} ms", sim_time.as_secs_f64() * 1000.0);
                println!("  Output time:     {:>10.3} ms", output_time.as_secs_f64() * 1000.0);
                println!("  Misc:            {:>10.3} ms", misc_time.as_secs_f64() * 1000.0);
                println!("  ─────────────────────────────");
                println!("  Total time:      {:>10.3} ms", total_time.as_secs_f64() * 1000.0);
            }

            if results.all_converged() {
                if !quiet {
                    println!("Done!");
                }
                ExitCode::SUCCESS
            } else {
                eprintln!("Run finished with non-converged steps");
                ExitCode::from(1)
            }
        }
        Commands::Info { input } => {
            let network = match load_network(&input) {
                Ok(n) => n,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::from(2);
                }
            };
            println!("Network: {}", network.name);
            println!("  Junctions:  {}", network.num_junctions());
            println!("  Reservoirs: {}", network.num_reservoirs());
            println!("  Tanks:      {}", network.num_tanks());
            println!("  Links:      {}", network.num_links());
            println!("  Pipes:      {}", network.pipes().count());
            println!("  Pumps:      {}", network.pumps().count());
            println!("  Valves:     {}", network.valves().count());
            println!("  Patterns:   {}", network.patterns.len());
            println!("  Curves:     {}", network.curves.len());
            println!("  Controls:   {}", network.controls.len());
            println!(
                "  Duration:   {} s at {} s steps",
                network.options.duration_sec, network.options.hydraulic_step_sec
            );
            for (_, tank) in network.tanks() {
                println!(
                    "  Tank '{}': level {} m, stored volume {:.3} m3",
                    tank.name,
                    tank.level,
                    network.tank_volume(tank, tank.level)
                );
            }
            ExitCode::SUCCESS
        }
        Commands::Pack { input, output } => {
            let network = match read_network_file(&input) {
                Ok(n) => n,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::from(2);
                }
            };
            match net_binary_io::write_network(&output, &network) {
                Ok(_) => {
                    println!("Binary network written to: {}", output);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::from(2)
                }
            }
        }
    }
}
