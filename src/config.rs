//! Command-line and environment configuration.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};

use crate::data::loader::DataFormat;
use crate::inference::SchemaPolicy;

/// Input format selector. `auto` uses the file extension, then the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Auto,
    Csv,
    Json,
    Parquet,
}

#[derive(Debug, Parser)]
#[command(name = "rusty-predict")]
#[command(version, about = "Predict labels for tabular files with a fitted classifier", long_about = None)]
pub struct Cli {
    /// Model artifact loaded once at startup
    #[arg(short, long, env = "RUSTY_PREDICT_MODEL", default_value = "model.json")]
    pub model: PathBuf,

    /// Input format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Auto)]
    pub format: FormatArg,

    /// Reject non-numeric feature values before calling the model
    #[arg(
        long,
        env = "RUSTY_PREDICT_STRICT",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub strict_schema: bool,

    /// Number of files processed concurrently (default: available cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Input files; `-` reads standard input
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model_path: PathBuf,
    /// `None` means detect per input.
    pub format: Option<DataFormat>,
    pub policy: SchemaPolicy,
    pub jobs: usize,
    pub inputs: Vec<PathBuf>,
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let jobs = match cli.jobs {
            Some(0) => bail!("--jobs must be at least 1"),
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        };
        if cli.inputs.is_empty() {
            bail!("at least one input file is required");
        }
        let format = match cli.format {
            FormatArg::Auto => None,
            FormatArg::Csv => Some(DataFormat::Csv),
            FormatArg::Json => Some(DataFormat::Json),
            FormatArg::Parquet => Some(DataFormat::Parquet),
        };
        let policy = if cli.strict_schema {
            SchemaPolicy::Strict
        } else {
            SchemaPolicy::Lenient
        };
        Ok(Config {
            model_path: cli.model,
            format,
            policy,
            jobs,
            inputs: cli.inputs,
        })
    }
}

impl Config {
    /// Resolve the format of one input: explicit setting, then extension,
    /// then content sniffing.
    pub fn format_for(&self, path: &Path, bytes: &[u8]) -> DataFormat {
        self.format
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(DataFormat::from_extension)
            })
            .unwrap_or_else(|| DataFormat::sniff(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        let cli = Cli::try_parse_from(std::iter::once("rusty-predict").chain(args.iter().copied()))?;
        Config::try_from(cli)
    }

    #[test]
    fn defaults() {
        let config = parse(&["--model", "m.json", "data.csv"]).unwrap();
        assert_eq!(config.model_path, PathBuf::from("m.json"));
        assert_eq!(config.format, None);
        assert_eq!(config.policy, SchemaPolicy::Lenient);
        assert!(config.jobs >= 1);
        assert_eq!(config.inputs, vec![PathBuf::from("data.csv")]);
    }

    #[test]
    fn explicit_options() {
        let config = parse(&[
            "-m", "m.json", "--format", "json", "--strict-schema", "--jobs", "3", "a", "b",
        ])
        .unwrap();
        assert_eq!(config.format, Some(DataFormat::Json));
        assert_eq!(config.policy, SchemaPolicy::Strict);
        assert_eq!(config.jobs, 3);
        assert_eq!(config.inputs.len(), 2);
    }

    #[test]
    fn strict_schema_env_accepts_common_spellings() {
        use clap::{CommandFactory, FromArgMatches};

        // A variable private to this test keeps the parallel tests unaffected.
        const VAR: &str = "RUSTY_PREDICT_STRICT_CONFIG_TEST";
        let cases = [
            ("1", true),
            ("yes", true),
            ("on", true),
            ("true", true),
            ("0", false),
            ("no", false),
            ("off", false),
            ("false", false),
        ];
        for (value, strict) in cases {
            std::env::set_var(VAR, value);
            let matches = Cli::command()
                .mut_arg("strict_schema", |arg| arg.env(VAR))
                .try_get_matches_from(["rusty-predict", "a.csv"])
                .unwrap();
            let cli = Cli::from_arg_matches(&matches).unwrap();
            assert_eq!(cli.strict_schema, strict, "{VAR}={value}");
        }
        std::env::remove_var(VAR);
    }

    #[test]
    fn zero_jobs_rejected() {
        assert!(parse(&["-m", "m.json", "--jobs", "0", "a.csv"]).is_err());
    }

    #[test]
    fn inputs_required() {
        assert!(parse(&["-m", "m.json"]).is_err());
    }

    #[test]
    fn format_resolution_order() {
        let config = parse(&["-m", "m.json", "x"]).unwrap();
        assert_eq!(config.format_for(Path::new("a.parquet"), b"x,y"), DataFormat::Parquet);
        assert_eq!(config.format_for(Path::new("upload"), b"[{}]"), DataFormat::Json);
        assert_eq!(config.format_for(Path::new("-"), b"a,b\n"), DataFormat::Csv);

        let forced = parse(&["-m", "m.json", "--format", "csv", "x"]).unwrap();
        assert_eq!(forced.format_for(Path::new("a.json"), b"[{}]"), DataFormat::Csv);
    }
}
