use crate::error::{KpiError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Where the stage table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KpiError::Config("empty source".to_string()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Source::Url(s.to_string()))
        } else {
            Ok(Source::Path(PathBuf::from(s)))
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "stage_kpis")]
#[command(about = "Derive milestone-to-milestone KPIs from a project stage sheet")]
#[command(version)]
pub struct Cli {
    /// Stage CSV: a local path or an http(s) link to a published sheet
    #[arg(long, env = "STAGE_KPIS_SOURCE")]
    pub source: String,

    /// Long-format output; `.xlsx` writes a workbook, anything else CSV
    #[arg(long, default_value = "transformed_data.xlsx")]
    pub output: PathBuf,

    /// Per-year KPI summary CSV
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Rows to preview on the terminal
    #[arg(long, default_value_t = 10)]
    pub preview: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: Source,
    pub output: PathBuf,
    pub summary: Option<PathBuf>,
    pub preview_rows: usize,
}

impl TryFrom<Cli> for Config {
    type Error = KpiError;

    fn try_from(cli: Cli) -> Result<Self> {
        Ok(Config {
            source: Source::parse(&cli.source)?,
            output: cli.output,
            summary: cli.summary,
            preview_rows: cli.preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kinds() {
        assert_eq!(
            Source::parse("https://example.org/pub?output=csv").unwrap(),
            Source::Url("https://example.org/pub?output=csv".into())
        );
        assert_eq!(
            Source::parse(" stages.csv ").unwrap(),
            Source::Path(PathBuf::from("stages.csv"))
        );
        assert!(matches!(Source::parse("  "), Err(KpiError::Config(_))));
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["stage_kpis", "--source", "in.csv"]).unwrap();
        let cfg = Config::try_from(cli).unwrap();
        assert_eq!(cfg.output, PathBuf::from("transformed_data.xlsx"));
        assert_eq!(cfg.preview_rows, 10);
        assert!(cfg.summary.is_none());
    }
}
