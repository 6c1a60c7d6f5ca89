//! Command-line argument handling.

use crate::config::ResolverConfig;

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    PrintConfig,
    Resolve(Args),
}

/// Arguments of a lookup; `None` fields fall back to the config file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Args {
    pub config_path: Option<String>,
    pub server: Option<String>,
    pub hostname: String,
    pub timeout_seconds: Option<i64>,
    pub port: Option<u16>,
    pub verify_source: Option<bool>,
}

impl Args {
    /// Command-line values override the config file
    pub fn apply(&self, resolver: &mut ResolverConfig) {
        if let Some(server) = &self.server {
            resolver.server = Some(server.clone());
        }
        if let Some(timeout) = self.timeout_seconds {
            resolver.timeout_seconds = timeout;
        }
        if let Some(port) = self.port {
            resolver.port = port;
        }
        if let Some(verify) = self.verify_source {
            resolver.verify_source = verify;
        }
    }
}

/// Parse arguments (without the program name)
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut parsed = Args::default();
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                parsed.config_path = Some(value_of(args, &mut i)?.to_string());
            }
            "--timeout" | "-t" => {
                let raw = value_of(args, &mut i)?;
                let timeout = raw
                    .parse::<i64>()
                    .map_err(|_| format!("Invalid timeout: {}", raw))?;
                parsed.timeout_seconds = Some(timeout);
            }
            "--port" | "-p" => {
                let raw = value_of(args, &mut i)?;
                let port = raw
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid port: {}", raw))?;
                parsed.port = Some(port);
            }
            "--no-verify-source" => {
                parsed.verify_source = Some(false);
            }
            "--print-config" => return Ok(Command::PrintConfig),
            "-h" | "--help" => return Ok(Command::Help),
            arg if !arg.starts_with('-') => positional.push(arg.to_string()),
            other => return Err(format!("Unknown argument: {}", other)),
        }
        i += 1;
    }

    match positional.len() {
        1 => {
            parsed.hostname = positional.remove(0);
        }
        2 => {
            parsed.hostname = positional.remove(1);
            parsed.server = Some(positional.remove(0));
        }
        0 => return Err("Missing hostname".to_string()),
        _ => return Err(format!("Unexpected argument: {}", positional[2])),
    }

    Ok(Command::Resolve(parsed))
}

fn value_of<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("Missing value for {}", flag))
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [OPTIONS] [SERVER] <HOSTNAME>

Resolve HOSTNAME by querying the DNS server SERVER directly over UDP.
SERVER is an IPv4/IPv6 address or a name; an IPv4 server gets an A query,
an IPv6 server an AAAA query. SERVER may come from the config file instead.

Options:
  -c, --config <PATH>     Config file (default: ./dnsprobe.yaml)
  -t, --timeout <SECS>    Reply timeout; negative waits forever, 0 polls once
  -p, --port <PORT>       Server port (default: 53)
      --no-verify-source  Accept replies from any source address
      --print-config      Print the default config file and exit
  -h, --help              Show this help

Examples:
  {program} 9.9.9.9 example.com
  {program} -t 2 2620:fe::fe example.com
  {program} --config dnsprobe.yaml example.com"
    )
}
