//! g09run Command-Line Interface
//!
//! Drives the Gaussian 09 stage pipeline from the command line:
//!
//! ```bash
//! # Run the geometry optimization stage
//! g09run compound_x --process opt
//!
//! # Ground state with engine defaults from a JSON config file
//! g09run compound_x -p gs -c defaults.json
//!
//! # TD stage for the second excited root
//! g09run compound_x -p td -e root=2,nstates=10
//!
//! # Remove calculation artifacts (keeps init.xyz)
//! g09run compound_x --clean
//! ```
//!
//! With no `--process`, `--clean` sweeps the base directory and anything
//! else is a no-op; this lets batch scripts call the binary unconditionally
//! and gate the actual work elsewhere.

use g09run::cleanup;
use g09run::config::parse_extras;
use g09run::engine::GaussianEngine;
use g09run::orchestrator::{Orchestrator, ProcessOutcome, RunContext};
use g09run::resources::{EnvResources, ResourceProvider};
use log::{info, warn};
use std::env;
use std::path::Path;
use std::process;

/// Default engine executable; override with the `G09_COMMAND` variable.
const DEFAULT_COMMAND: &str = "g09";

/// Parsed command-line arguments.
struct CliArgs {
    basedir: String,
    process: Option<String>,
    config: Option<String>,
    extras: String,
    clean: bool,
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {} <basedir> [--process NAME] [--config FILE] [--extras K=V,K=V] [--clean]",
        program
    );
    eprintln!();
    eprintln!("  <basedir>            Base directory containing at least init.xyz");
    eprintln!("  --process, -p NAME   Pipeline stage to run (opt, gs, td)");
    eprintln!("  --config, -c FILE    JSON file with engine defaults (method, basis, ...)");
    eprintln!("  --extras, -e STR     Extra parameters as KEY1=VAL1,KEY2=VAL2");
    eprintln!("  --clean, -C          Without --process: remove calculation artifacts");
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut basedir = None;
    let mut process_name = None;
    let mut config = None;
    let mut extras = String::new();
    let mut clean = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--process" | "-p" => {
                process_name = Some(
                    iter.next()
                        .ok_or("--process requires a stage name")?
                        .clone(),
                );
            }
            "--config" | "-c" => {
                config = Some(iter.next().ok_or("--config requires a file path")?.clone());
            }
            "--extras" | "-e" => {
                extras = iter.next().ok_or("--extras requires a value")?.clone();
            }
            "--clean" | "-C" => clean = true,
            flag if flag.starts_with('-') => {
                return Err(format!("unknown option: {}", flag));
            }
            positional => {
                if basedir.is_some() {
                    return Err(format!("unexpected argument: {}", positional));
                }
                basedir = Some(positional.to_string());
            }
        }
    }

    Ok(CliArgs {
        basedir: basedir.ok_or("missing base directory argument")?,
        process: process_name,
        config,
        extras,
        clean,
    })
}

fn run(args: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = Path::new(&args.basedir);

    let Some(stage_name) = &args.process else {
        if args.clean {
            let removed = cleanup::clean_base_dir(base)?;
            println!("Cleaned up {} ({} files)", base.display(), removed.len());
        }
        // No stage requested and no cleanup: nothing to do.
        return Ok(());
    };

    if args.clean {
        warn!("--clean is ignored when --process is given");
    }

    let resources = EnvResources;
    let command = env::var("G09_COMMAND").unwrap_or_else(|_| DEFAULT_COMMAND.to_string());
    let gaussian = GaussianEngine::new(command).with_scratch(resources.scratch_dir());
    if resources.scratch_dir().is_none() {
        warn!("no scratch directory set; running the engine without GAUSS_SCRDIR");
    }

    let mut orchestrator: Orchestrator<GaussianEngine, EnvResources> =
        Orchestrator::new(base, gaussian, resources)?;
    if let Some(config_path) = &args.config {
        orchestrator.load_config(Path::new(config_path))?;
    }

    let ctx = RunContext {
        overrides: parse_extras(&args.extras),
        ..RunContext::default()
    };

    match orchestrator.process(stage_name, &ctx)? {
        ProcessOutcome::AlreadyComplete => {
            println!("Stage {} is already complete", stage_name);
        }
        ProcessOutcome::Finished(result) => {
            if result.success {
                println!("Stage {} finished", stage_name);
            } else {
                println!(
                    "Stage {} finished with engine exit code {}; check the log",
                    stage_name, result.exit_code
                );
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    info!("base directory: {}", cli.basedir);
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("g09run")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn parses_full_invocation() {
        let cli = parse_args(&args(&[
            "compound_x",
            "--process",
            "td",
            "-c",
            "defaults.json",
            "-e",
            "root=2",
        ]))
        .unwrap();
        assert_eq!(cli.basedir, "compound_x");
        assert_eq!(cli.process.as_deref(), Some("td"));
        assert_eq!(cli.config.as_deref(), Some("defaults.json"));
        assert_eq!(cli.extras, "root=2");
        assert!(!cli.clean);
    }

    #[test]
    fn clean_without_process() {
        let cli = parse_args(&args(&["compound_x", "--clean"])).unwrap();
        assert!(cli.clean);
        assert!(cli.process.is_none());
    }

    #[test]
    fn rejects_missing_basedir() {
        assert!(parse_args(&args(&["--clean"])).is_err());
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(parse_args(&args(&["compound_x", "--bogus"])).is_err());
    }
}
