//! fabric-precheck CLI entry point
//!
//! Pre-upgrade health checks for fabric controllers.

use clap::Parser;
use fabric_precheck::build_info::get_build_info;
use fabric_precheck::checks::create_all_checks;
use fabric_precheck::cli::args::{Args, CheckArgs, Command};
use fabric_precheck::cli::output::{exit_code, get_formatter};
use fabric_precheck::engine::dispatcher::{CheckClass, CheckRegistry};
use fabric_precheck::telemetry::init_tracing;
use fabric_precheck::{run_prechecks, PrecheckConfig};

use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::Level;

fn main() -> ExitCode {
    match Args::parse().into_command() {
        Command::Version => {
            println!("{}", get_build_info());
            ExitCode::SUCCESS
        }
        Command::List => match print_check_list() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(3)
            }
        },
        Command::Check(args) => run_checks(&args),
    }
}

fn print_check_list() -> anyhow::Result<()> {
    let registry = CheckRegistry::new(create_all_checks())?;

    println!("Available checks:");
    println!();
    for check in registry.iter() {
        let class = match check.class {
            CheckClass::Pure(_) => "version",
            CheckClass::Query(_) => "inventory",
            CheckClass::Manual { .. } => "manual",
        };
        println!("  {:<8} {:<10} {}", check.id, class, check.name);
    }
    Ok(())
}

fn run_checks(args: &CheckArgs) -> ExitCode {
    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    init_tracing(args.log_json, level);

    let report = match run_prechecks(PrecheckConfig::from_args(args)) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "precheck run aborted");
            eprintln!("Error running checks: {}", e);
            return ExitCode::from(3);
        }
    };

    let color = !args.no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
    let formatter = get_formatter(args.format, color, args.verbose > 0);
    println!("{}", formatter.format(&report));

    ExitCode::from(exit_code(&report.summary()))
}
