//! Market simulator entry point: CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use power_market_sim::config::ScenarioConfig;
use power_market_sim::io::export::{export_market_csv, export_plant_csv};
use power_market_sim::sim::kpi::KpiReport;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    days_override: Option<usize>,
    telemetry_out: Option<String>,
    plants_out: Option<String>,
    quiet: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("power-market-sim: retail electricity market simulator");
    eprintln!();
    eprintln!("Usage: power-market-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --days <usize>           Override number of simulated cycles");
    eprintln!("  --telemetry-out <path>   Export per-tick market results to CSV");
    eprintln!("  --plants-out <path>      Export per-plant results to CSV");
    eprintln!("  --quiet                  Only print the KPI report");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after simulation");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Returns the value following flag `name`, exiting if it is missing.
fn flag_value(args: &[String], i: &mut usize, name: &str, kind: &str) -> String {
    *i += 1;
    match args.get(*i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {name} requires a {kind} argument");
            process::exit(1);
        }
    }
}

/// Parses the value following flag `name`, exiting if it is missing or malformed.
fn parsed_value<T: std::str::FromStr>(args: &[String], i: &mut usize, name: &str, kind: &str) -> T {
    let raw = flag_value(args, i, name, kind);
    raw.parse().unwrap_or_else(|_| {
        eprintln!("error: {name} value \"{raw}\" is not a valid {kind}");
        process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        days_override: None,
        telemetry_out: None,
        plants_out: None,
        quiet: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                cli.scenario_path = Some(flag_value(&args, &mut i, "--scenario", "path"));
            }
            "--preset" => cli.preset = Some(flag_value(&args, &mut i, "--preset", "name")),
            "--seed" => cli.seed_override = Some(parsed_value(&args, &mut i, "--seed", "u64")),
            "--days" => cli.days_override = Some(parsed_value(&args, &mut i, "--days", "usize")),
            "--telemetry-out" => {
                cli.telemetry_out = Some(flag_value(&args, &mut i, "--telemetry-out", "path"));
            }
            "--plants-out" => {
                cli.plants_out = Some(flag_value(&args, &mut i, "--plants-out", "path"));
            }
            "--quiet" | "-q" => cli.quiet = true,
            #[cfg(feature = "api")]
            "--serve" => cli.serve = true,
            #[cfg(feature = "api")]
            "--port" => cli.port = parsed_value(&args, &mut i, "--port", "u16"),
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = parse_args();
    init_tracing();

    // Load config: --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(days) = cli.days_override {
        scenario.simulation.days = days;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let mut engine = scenario.build_engine().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    let results = engine.run().unwrap_or_else(|e| {
        eprintln!("error: simulation aborted: {e}");
        process::exit(1);
    });
    let kpi = KpiReport::from_results(&results);

    if !cli.quiet {
        for r in &results {
            println!("{r}");
        }
        println!();
    }
    println!("{kpi}");

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_market_csv(&results, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Market telemetry written to {path}");
    }
    if let Some(ref path) = cli.plants_out {
        if let Err(e) = export_plant_csv(&results, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Plant telemetry written to {path}");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(power_market_sim::api::AppState {
            config: engine.config().clone(),
            kpi,
            results,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(power_market_sim::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
