use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod login;
pub mod register;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register an account and print the server's response.
    Register(RegisterArgs),
    /// Log in and print the issued session token.
    Login(LoginArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Register(args) => register::run(args, format),
        Command::Login(args) => login::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Server address (host:port).
    #[arg(env = "ECNWIRE_ADDR")]
    pub addr: String,
    /// Account name, at most 32 bytes.
    #[arg(long, short = 'u')]
    pub username: String,
    /// Account password, at most 64 bytes.
    #[arg(long, short = 'p', env = "ECNWIRE_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Read the 65-byte public key from a file.
    #[arg(long, value_name = "FILE", conflicts_with = "public_key_byte")]
    pub public_key_file: Option<PathBuf>,
    /// Fill the public key with this byte value.
    #[arg(long, value_name = "BYTE", conflicts_with = "public_key_file")]
    pub public_key_byte: Option<u8>,
    /// Connect and response timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Server address (host:port).
    #[arg(env = "ECNWIRE_ADDR")]
    pub addr: String,
    /// Account name, at most 32 bytes.
    #[arg(long, short = 'u')]
    pub username: String,
    /// Account password, at most 64 bytes.
    #[arg(long, short = 'p', env = "ECNWIRE_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Send LOGOUT with the issued token before disconnecting.
    #[arg(long)]
    pub logout: bool,
    /// Connect and response timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration(" 2 ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_bad_durations() {
        for input in ["", "0s", "abc", "-1s", "5m"] {
            let err = parse_duration(input).unwrap_err();
            assert_eq!(err.code, USAGE, "input {input:?}");
        }
    }
}
