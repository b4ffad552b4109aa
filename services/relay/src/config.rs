//! Relay configuration.
//!
//! Built once at startup from the command line plus the `ALLOW_JA4`
//! environment variable, then shared read-only across all connection
//! handlers.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

/// Environment variable unioned into the allow-set at startup.
pub const ALLOW_JA4_ENV: &str = "ALLOW_JA4";

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "fingergate", version, about = "JA4-gated transparent TCP relay")]
pub struct Args {
    /// Local address to listen on; a bare :port form binds all interfaces
    #[arg(short = 'l', long, default_value = ":9000")]
    pub listen: String,

    /// Upstream host:port admitted connections are relayed to
    #[arg(short = 't', long, default_value = "example.com:443")]
    pub target: String,

    /// Upstream dial timeout (accepts 10s, 500ms, 2m, or bare seconds)
    #[arg(short = 'o', long, default_value = "10s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Comma-separated JA4 fingerprints allowed through the gate,
    /// unioned with the ALLOW_JA4 environment variable
    #[arg(long = "allow-ja4", value_delimiter = ',')]
    pub allow_ja4: Vec<String>,
}

/// Immutable relay configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the listener binds to.
    pub listen_addr: String,

    /// Upstream address, resolved at dial time.
    pub target_addr: String,

    /// Timeout for dialing the upstream.
    pub dial_timeout: Duration,

    /// Fingerprints admitted through the gate. Empty denies all TLS.
    pub allow_ja4: HashSet<String>,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from the command line and environment.
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self> {
        if !args.target.contains(':') {
            bail!("target must be host:port, got '{}'", args.target);
        }

        let env_allow = std::env::var(ALLOW_JA4_ENV).ok();
        let allow_ja4 = build_allow_set(&args.allow_ja4, env_allow.as_deref());

        let log_level =
            std::env::var("FINGERGATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            listen_addr: normalize_listen_addr(&args.listen),
            target_addr: args.target,
            dial_timeout: args.timeout,
            allow_ja4,
            log_level,
        })
    }
}

/// Union of the flag list and the comma-delimited environment list.
/// Entries are trimmed; empty entries collapse to nothing.
fn build_allow_set(flag_values: &[String], env_value: Option<&str>) -> HashSet<String> {
    let mut set: HashSet<String> = flag_values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(env_list) = env_value {
        set.extend(
            env_list
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        );
    }
    set
}

/// A bare `:port` means all interfaces.
fn normalize_listen_addr(listen: &str) -> String {
    match listen.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => listen.to_string(),
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let (number, unit): (&str, &str) = if let Some(n) = value.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = value.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = value.strip_suffix('m') {
        (n, "m")
    } else {
        (value, "s")
    };
    let number: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{}'", value))?;
    Ok(match unit {
        "ms" => Duration::from_millis(number),
        "m" => Duration::from_secs(number * 60),
        _ => Duration::from_secs(number),
    })
}
