use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod error;
mod ingest;
mod loader;
mod metrics;
mod models;
mod pipeline;
mod rank;
mod recommend;
mod report;

use config::PipelineConfig;
use error::MetricsError;
use models::Record;
use rank::{Direction, RankMetric};
use recommend::Thresholds;

#[derive(Parser)]
#[command(name = "campaign-metrics")]
#[command(about = "Marketing campaign performance metrics and budget recommendations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the marketing channels present in a campaign sheet
    Channels {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print KPIs, top performers and recommendations
    Summary {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Write a full performance report
    Report {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
    },
}

#[derive(Args)]
struct InputArgs {
    /// CSV export of the campaign sheet
    #[arg(long, env = "CAMPAIGN_METRICS_CSV")]
    csv: PathBuf,
    /// Skip rows that fail validation instead of aborting
    #[arg(long)]
    skip_invalid: bool,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Only analyze this marketing channel
    #[arg(long)]
    channel: Option<String>,
    #[arg(long, default_value_t = config::DEFAULT_TOP_CAMPAIGNS)]
    top_campaigns: usize,
    #[arg(long, default_value_t = config::DEFAULT_TOP_CHANNELS)]
    top_channels: usize,
    /// Most recent months kept in the time trend
    #[arg(long, default_value_t = config::DEFAULT_TREND_MONTHS)]
    months: usize,
    /// Metric used for the top campaign and channel rankings
    #[arg(long, default_value = "roas")]
    rank_by: RankMetric,
    /// Rank lowest values first
    #[arg(long)]
    ascending: bool,
    #[arg(long, default_value_t = recommend::DEFAULT_HIGH_ROAS)]
    high_roas: f64,
    #[arg(long, default_value_t = recommend::DEFAULT_LOW_ROAS)]
    low_roas: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

impl AnalysisArgs {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let config = PipelineConfig {
            channel: self.channel,
            top_n_campaigns: self.top_campaigns,
            top_n_channels: self.top_channels,
            trend_months: self.months,
            rank_metric: self.rank_by,
            rank_direction: if self.ascending {
                Direction::Ascending
            } else {
                Direction::Descending
            },
            thresholds: Thresholds::new(self.high_roas, self.low_roas)?,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "campaign_metrics=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Channels { input } => {
            let records = load_records(&input)?;
            let channels = pipeline::channels(&records);
            if channels.is_empty() {
                println!("No channels found in {}.", input.csv.display());
                return Ok(());
            }
            for channel in channels {
                println!("{channel}");
            }
        }
        Commands::Summary { input, analysis } => {
            let config = analysis.into_config()?;
            let records = load_records(&input)?;
            let Some(dashboard) = analyze(&records, &config)? else {
                return Ok(());
            };
            print!("{}", report::build_summary(&dashboard, &config));
        }
        Commands::Report {
            input,
            analysis,
            out,
            format,
        } => {
            let config = analysis.into_config()?;
            let records = load_records(&input)?;
            let Some(dashboard) = analyze(&records, &config)? else {
                return Ok(());
            };
            let body = match format {
                ReportFormat::Markdown => report::build_report(&dashboard, &config),
                ReportFormat::Json => report::build_json(&dashboard)?,
            };
            std::fs::write(&out, body)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_records(input: &InputArgs) -> anyhow::Result<Vec<Record>> {
    let rows = read_sheet(&input.csv)?;

    if input.skip_invalid {
        let ingested = ingest::normalize_rows_lenient(&rows);
        if !ingested.rejected.is_empty() {
            eprintln!(
                "Skipped {} invalid rows of {}.",
                ingested.rejected.len(),
                rows.len()
            );
        }
        return Ok(ingested.records);
    }

    let records = ingest::normalize_rows(&rows)
        .with_context(|| format!("invalid campaign sheet {}", input.csv.display()))?;
    info!(records = records.len(), "ingested campaign sheet");
    Ok(records)
}

fn read_sheet(path: &Path) -> anyhow::Result<Vec<ingest::RawRow>> {
    loader::load_csv(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Runs the pipeline; an empty selection is reported and yields `None`.
fn analyze(
    records: &[Record],
    config: &PipelineConfig,
) -> anyhow::Result<Option<pipeline::Dashboard>> {
    match pipeline::analyze(records, config) {
        Ok(dashboard) => Ok(Some(dashboard)),
        Err(err @ MetricsError::EmptyDataset { .. }) => {
            println!("{err}. Nothing to report.");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
