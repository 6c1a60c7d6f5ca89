//! dnsprobe - resolve a hostname against one specific DNS server
//!
//! Prints the resolved address on stdout; diagnostics go to stderr.

use dnsprobe::cli::{parse_args, usage, Args, Command};
use dnsprobe::config::{load_config, DEFAULT_CONFIG_YAML};
use dnsprobe::dns::SpecificResolver;
use dnsprobe::logging;

use std::env;
use std::process::ExitCode;

const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("dnsprobe");

    let command = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("{}", usage(program));
            return ExitCode::from(EXIT_USAGE);
        }
    };

    match command {
        Command::Help => {
            println!("{}", usage(program));
            ExitCode::SUCCESS
        }
        Command::PrintConfig => {
            print!("{}", DEFAULT_CONFIG_YAML);
            ExitCode::SUCCESS
        }
        Command::Resolve(args) => run(args),
    }
}

fn run(args: Args) -> ExitCode {
    let mut config = match load_config(args.config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    // CLI arguments override config file
    args.apply(&mut config.resolver);

    // Initialize logging system
    let _log_guard = logging::init_logging(&config.logging);
    if let Some(file_config) = config.logging.file.as_ref().filter(|_| config.logging.enabled) {
        logging::tidy_log_dir(file_config);
    }

    tracing::debug!(config = ?config, "Configuration loaded");

    let Some(server) = config.resolver.server.clone() else {
        eprintln!("No DNS server given on the command line or in the config file");
        return ExitCode::from(EXIT_USAGE);
    };

    let resolver = SpecificResolver::new(config.resolver.query_options());
    match resolver.resolve(&server, &args.hostname) {
        Ok(addr) => {
            println!("{}", addr);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("dnsprobe: {}", e);
            ExitCode::FAILURE
        }
    }
}
