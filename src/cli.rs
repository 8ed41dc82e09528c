use clap::Parser;
use std::path::PathBuf;

use crate::export::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "orgfinder")]
#[command(about = "Find the organizations behind people's names and classify them")]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/orgfinder.toml
    #[arg(long)]
    pub init: bool,

    /// Directory dataset to search first (.xlsx, .xls, .xlsb, .ods or .csv)
    #[arg(short, long, value_name = "FILE")]
    pub dataset: Option<String>,

    /// Full name of the person to search for
    #[arg(short, long)]
    pub name: Option<String>,

    /// CSV or JSON file with names to search in one batch
    /// CSV: one name per line, or a column named "name"
    /// JSON: array of names, or {"names": [...]}
    #[arg(long, value_name = "FILE")]
    pub names_file: Option<String>,

    /// Output format: 'csv', 'xlsx', 'json' or 'all' (default)
    #[arg(short = 'f', long, default_value = "all")]
    pub output_format: String,

    /// Output directory for results (defaults to the current directory)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Output file name without extension
    #[arg(short, long, default_value = "org_results")]
    pub output: String,

    /// Verbose logging (use -v for INFO, -vv for DEBUG with raw oracle output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Export execution logs to a file (specify file path)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Maximum candidate profiles per name (overrides config)
    #[arg(long, value_name = "N")]
    pub max_profiles: Option<usize>,
}

impl Cli {
    /// Check if running in batch mode (--names-file provided)
    pub fn is_batch_mode(&self) -> bool {
        self.names_file.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.init {
            return Ok(());
        }

        if self.dataset.is_none() {
            return Err("A dataset is required (use --dataset <FILE>)".to_string());
        }

        match (&self.name, &self.names_file) {
            (None, None) => return Err("A name is required (use --name or --names-file for batch mode)".to_string()),
            (Some(_), Some(_)) => return Err("Use either --name or --names-file, not both".to_string()),
            (Some(n), None) if n.trim().is_empty() => return Err("Name cannot be empty".to_string()),
            _ => {}
        }

        if OutputFormat::parse(&self.output_format).is_none() {
            return Err(format!("Output format must be one of: {}", OutputFormat::NAMES.join(", ")));
        }

        if self.max_profiles == Some(0) {
            return Err("Max profiles must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::parse(&self.output_format).unwrap_or(OutputFormat::All)
    }

    pub fn get_output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("orgfinder").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["-d", "people.xlsx", "-n", "Jane Roe"]);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.output_format(), OutputFormat::All);
        assert_eq!(cli.output, "org_results");
        assert_eq!(cli.get_output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_init_needs_nothing_else() {
        assert!(parse(&["--init"]).validate().is_ok());
    }

    #[test]
    fn test_requires_dataset() {
        let err = parse(&["-n", "Jane Roe"]).validate().unwrap_err();
        assert!(err.contains("dataset"));
    }

    #[test]
    fn test_requires_exactly_one_name_source() {
        assert!(parse(&["-d", "p.csv"]).validate().is_err());
        assert!(parse(&["-d", "p.csv", "-n", "Jane", "--names-file", "n.csv"]).validate().is_err());
        assert!(parse(&["-d", "p.csv", "--names-file", "n.csv"]).validate().is_ok());
    }

    #[test]
    fn test_rejects_blank_name_and_bad_format() {
        assert!(parse(&["-d", "p.csv", "-n", "   "]).validate().is_err());
        assert!(parse(&["-d", "p.csv", "-n", "Jane", "-f", "html"]).validate().is_err());
        assert!(parse(&["-d", "p.csv", "-n", "Jane", "--max-profiles", "0"]).validate().is_err());
    }

    #[test]
    fn test_verbose_count() {
        assert_eq!(parse(&["-vv", "--init"]).verbose, 2);
    }
}
