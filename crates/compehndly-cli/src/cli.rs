//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "compehndly",
    version,
    about = "Versioned derived-variable functions for biomonitoring data",
    long_about = "Inspect and call the versioned function registry.\n\n\
                  The registry strategy and adapter default to the \
                  COMPEHNDLY_REGISTRY and COMPEHNDLY_ADAPTER environment variables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the lazy-loading manifest.
    #[command(subcommand)]
    Manifest(ManifestCommand),

    /// List registered functions and their versions.
    Functions(FunctionsArgs),

    /// Call a registered function.
    Call(CallArgs),
}

#[derive(Subcommand)]
pub enum ManifestCommand {
    /// Import every discovered unit and write the manifest.
    Build(ManifestBuildArgs),
}

#[derive(Parser)]
pub struct ManifestBuildArgs {
    /// Output path (default: COMPEHNDLY_MANIFEST or compehndly-manifest.json).
    #[arg(long = "path", value_name = "PATH")]
    pub path: Option<PathBuf>,
}

#[derive(Parser)]
pub struct FunctionsArgs {
    /// Adapter the registry binds functions to.
    #[arg(long = "adapter", value_name = "NAME")]
    pub adapter: Option<String>,
}

#[derive(Parser)]
pub struct CallArgs {
    /// Function name.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Exact version to call (default: latest).
    #[arg(long = "version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Adapter the registry binds functions to.
    #[arg(long = "adapter", value_name = "NAME")]
    pub adapter: Option<String>,

    /// Keyword argument; may be repeated.
    #[arg(long = "kw", value_name = "KEY=VALUE", value_parser = parse_keyword)]
    pub keywords: Vec<(String, String)>,

    /// Positional arguments: null, true/false, numbers, comma-separated
    /// float arrays, or strings.
    #[arg(value_name = "VALUES", allow_negative_numbers = true)]
    pub values: Vec<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_keyword(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{text}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_collects_keywords_and_negative_values() {
        let cli = Cli::try_parse_from([
            "compehndly",
            "call",
            "medium_bound_imputation",
            "--kw",
            "loq=1",
            "--kw",
            "lod=0.5",
            "0.1,,2",
            "-3",
        ])
        .unwrap();
        let Command::Call(args) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(args.name, "medium_bound_imputation");
        assert_eq!(
            args.keywords,
            vec![
                ("loq".to_string(), "1".to_string()),
                ("lod".to_string(), "0.5".to_string())
            ]
        );
        assert_eq!(args.values, vec!["0.1,,2", "-3"]);
    }

    #[test]
    fn keyword_without_equals_is_rejected() {
        assert!(parse_keyword("loq").is_err());
        assert!(parse_keyword("=1").is_err());
        assert_eq!(
            parse_keyword("sg_ref=1.024").unwrap(),
            ("sg_ref".to_string(), "1.024".to_string())
        );
    }

    #[test]
    fn manifest_build_takes_optional_path() {
        let cli =
            Cli::try_parse_from(["compehndly", "manifest", "build", "--path", "m.json"]).unwrap();
        let Command::Manifest(ManifestCommand::Build(args)) = cli.command else {
            panic!("expected manifest build");
        };
        assert_eq!(args.path, Some(PathBuf::from("m.json")));
    }
}
