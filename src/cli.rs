//! Command-line interface for the debug-mirror scenario runner.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Scenario file to replay (overrides config file).
    pub scenario: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Shutdown join timeout in milliseconds.
    pub join_timeout_ms: Option<u64>,
    /// Print the final report as pretty JSON.
    pub pretty: bool,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("scenario") => {
                result.scenario = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("join-timeout-ms") => {
                let value: String = parser.value()?.parse()?;
                result.join_timeout_ms = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("join-timeout-ms", value))?,
                );
            }
            Long("pretty") => {
                result.pretty = true;
            }
            Value(val) if result.scenario.is_none() => {
                result.scenario = Some(PathBuf::from(val));
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"debug-mirror {version}
Replay a debug session scenario against the frontend session mirror

USAGE:
    debug-mirror [OPTIONS] [SCENARIO]

OPTIONS:
    -s, --scenario <FILE>        Scenario file to replay (JSON)
    -c, --config <FILE>          Path to configuration file (JSON)
    -l, --log-level <LVL>        Log level (error, warn, info, debug, trace)
    -t, --join-timeout-ms <MS>   How long shutdown waits for session tasks
        --pretty                 Pretty-print the report
    -h, --help                   Print help
    -V, --version                Print version

ENVIRONMENT VARIABLES:
    DEBUG_MIRROR_LOG_LEVEL         Log level (overrides config)
    DEBUG_MIRROR_JOIN_TIMEOUT_MS   Join timeout (overrides config)
    RUST_LOG                       Alternative log level setting

EXAMPLES:
    debug-mirror scenario.json
    debug-mirror -l debug --pretty -s scenario.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("debug-mirror {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("debug-mirror")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.scenario.is_none());
        assert!(result.config.is_none());
        assert!(!result.pretty);
    }

    #[test]
    fn test_scenario_option_and_positional() {
        let result = parse_args_from(args(&["-s", "a.json"])).unwrap();
        assert_eq!(result.scenario, Some(PathBuf::from("a.json")));

        let result = parse_args_from(args(&["b.json"])).unwrap();
        assert_eq!(result.scenario, Some(PathBuf::from("b.json")));
    }

    #[test]
    fn test_second_positional_rejected() {
        let result = parse_args_from(args(&["a.json", "b.json"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(_))));
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["-c", "/etc/debug-mirror.json"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/debug-mirror.json")));
    }

    #[test]
    fn test_join_timeout() {
        let result = parse_args_from(args(&["--join-timeout-ms", "250"])).unwrap();
        assert_eq!(result.join_timeout_ms, Some(250));

        assert!(parse_args_from(args(&["-t", "soon"])).is_err());
    }

    #[test]
    fn test_help_and_version_flags() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
        assert!(parse_args_from(args(&["--version"])).unwrap().version);
    }

    #[test]
    fn test_combined_options() {
        let result = parse_args_from(args(&[
            "-l",
            "debug",
            "--pretty",
            "-t",
            "1000",
            "scenario.json",
        ]))
        .unwrap();

        assert_eq!(result.log_level, Some("debug".to_string()));
        assert!(result.pretty);
        assert_eq!(result.join_timeout_ms, Some(1000));
        assert_eq!(result.scenario, Some(PathBuf::from("scenario.json")));
    }

    #[test]
    fn test_unknown_option() {
        assert!(parse_args_from(args(&["--frobnicate"])).is_err());
    }
}
