//! CLI entry point for wikilag.
//!
//! Correlates Wikipedia article accesses with a ground-truth series, fits
//! lagged regressions, and renders the paper figures.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use wikilag::analyzers::lag::{DEFAULT_MAX_LAG, scan_lags};
use wikilag::analyzers::rank::{DEFAULT_TOP_ARTICLES, rank_articles};
use wikilag::analyzers::types::{AggregatePeriod, GroundTruth, WikiCounts};
use wikilag::figures::external::{
    DEFAULT_CROP_COMMAND, DEFAULT_PDF_CONVERTER, ExternalTools, ToolCommand,
};
use wikilag::figures::incidence::{IncidenceFigure, IncidenceOptions};
use wikilag::figures::lag::{LagFigure, LagOptions};
use wikilag::figures::layout::{LegendLocation, TitleLocation};
use wikilag::figures::{crop_figure, render_figure};
use wikilag::output::{RunSummary, log_ranking, write_lag_csv, write_summary_json};
use wikilag::parser::{load_ground_truth, load_wiki_counts};

#[derive(Parser)]
#[command(name = "wikilag")]
#[command(
    about = "Perform lagged regressions to determine how Wikipedia and ground truth data are related",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs and analysis settings shared by every subcommand.
#[derive(Args)]
struct AnalysisArgs {
    /// CSV file containing raw Wikipedia counts
    #[arg(value_name = "WIKI_COUNTS_CSV")]
    wiki_counts: PathBuf,

    /// CSV file containing date,value ground truth data
    #[arg(value_name = "GROUND_TRUTH_CSV")]
    ground_truth: PathBuf,

    /// Whether a ground truth date aggregates the period before or after it
    /// (does 2012-09-14 cover [2012-09-07, 2012-09-14) or [2012-09-14, 2012-09-21)?)
    #[arg(short, long, default_value_t = AggregatePeriod::After)]
    aggregate_period: AggregatePeriod,

    /// Number of best-correlated articles used as regressors
    #[arg(long, default_value_t = DEFAULT_TOP_ARTICLES)]
    top: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and draw the incidence and lag figures
    Figures {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output file for the incidence, model, and accesses figure (.pdf, .svg or .png)
        #[arg(value_name = "INCIDENCE_FIGURE")]
        incidence_figure: PathBuf,

        /// Output file for the lagged model R^2 figure (.pdf, .svg or .png)
        #[arg(value_name = "LAG_FIGURE")]
        lag_figure: PathBuf,

        /// Largest forecast offset in days, scanned in both directions
        #[arg(long, default_value_t = DEFAULT_MAX_LAG, value_parser = clap::value_parser!(i64).range(0..))]
        max_lag: i64,

        /// If present, location for legend, otherwise no legend
        #[arg(long)]
        legend: Option<LegendLocation>,

        /// If present, text of model plot title
        #[arg(long)]
        title: Option<String>,

        /// Location of title
        #[arg(long, default_value_t = TitleLocation::UpperLeft)]
        title_loc: TitleLocation,

        /// Draw X axis labels on lag plot
        #[arg(long)]
        lagx: bool,

        /// Draw Y axis labels on lag plot
        #[arg(long)]
        lagy: bool,

        /// If present, text of lag plot title
        #[arg(long)]
        lagtitle: Option<String>,

        /// Draw X axis label ('Date') on incidence plot
        #[arg(long)]
        incidencex: bool,

        /// Label to use for the incidence plot's Y1 axis
        #[arg(long, default_value = "Disease Incidence")]
        incidence_y1_label: String,

        /// Hide the label of the last year tick on the incidence plot
        #[arg(long)]
        strip_last_xlabel: bool,

        /// Do not crop the incidence PDF
        #[arg(long)]
        no_crop: bool,

        /// Cropping command; {input} and {output} are replaced with the figure path
        #[arg(long, default_value = DEFAULT_CROP_COMMAND)]
        crop_command: String,

        /// SVG to PDF conversion command with {input} and {output} placeholders
        #[arg(long, default_value = DEFAULT_PDF_CONVERTER)]
        pdf_converter: String,

        /// Optional: write the ranking and every lag fit as JSON
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
    /// Rank articles by correlation with the ground truth
    Rank {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Fit the lagged regressions and write R^2 per offset to CSV
    Lags {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Largest forecast offset in days, scanned in both directions
        #[arg(long, default_value_t = DEFAULT_MAX_LAG, value_parser = clap::value_parser!(i64).range(0..))]
        max_lag: i64,

        /// CSV file to write results to
        #[arg(short, long, default_value = "lags.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/wikilag.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("wikilag.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Figures {
            analysis,
            incidence_figure,
            lag_figure,
            max_lag,
            legend,
            title,
            title_loc,
            lagx,
            lagy,
            lagtitle,
            incidencex,
            incidence_y1_label,
            strip_last_xlabel,
            no_crop,
            crop_command,
            pdf_converter,
            summary_json,
        } => {
            let (counts, truth) = load_inputs(&analysis)?;
            let period = analysis.aggregate_period;

            let ranking = rank_articles(&counts, &truth, period, analysis.top)?;
            log_ranking(&ranking);
            let fits = scan_lags(&counts, &truth, &ranking, period, max_lag)?;
            let unshifted = fits
                .iter()
                .find(|fit| fit.offset == 0)
                .context("lag scan produced no offset-0 fit")?;

            let tools = ExternalTools {
                pdf_converter: ToolCommand::new(pdf_converter),
                crop: (!no_crop).then(|| ToolCommand::new(crop_command)),
            };

            let incidence = IncidenceFigure::build(
                &counts,
                &truth,
                &ranking,
                unshifted,
                period,
                IncidenceOptions {
                    legend,
                    title,
                    title_location: title_loc,
                    x_label: incidencex,
                    y1_label: incidence_y1_label,
                    strip_last_x_label: strip_last_xlabel,
                },
            )?;
            let format = render_figure(&incidence, &incidence_figure, &tools)?;
            crop_figure(&incidence_figure, format, &tools)?;

            let lag = LagFigure::new(
                &fits,
                max_lag,
                LagOptions {
                    x_label: lagx,
                    y_label: lagy,
                    title: lagtitle,
                },
            );
            render_figure(&lag, &lag_figure, &tools)?;

            if let Some(path) = summary_json {
                write_summary_json(&path, &RunSummary::new(period, &ranking, &fits))?;
                info!(path = %path.display(), "Summary written");
            }
        }
        Commands::Rank { analysis } => {
            let (counts, truth) = load_inputs(&analysis)?;
            let ranking = rank_articles(&counts, &truth, analysis.aggregate_period, analysis.top)?;
            log_ranking(&ranking);
        }
        Commands::Lags {
            analysis,
            max_lag,
            output,
        } => {
            let (counts, truth) = load_inputs(&analysis)?;
            let period = analysis.aggregate_period;

            let ranking = rank_articles(&counts, &truth, period, analysis.top)?;
            log_ranking(&ranking);
            let fits = scan_lags(&counts, &truth, &ranking, period, max_lag)?;

            write_lag_csv(&output, &fits)?;
            info!(path = %output.display(), offsets = fits.len(), "Lag results written");
        }
    }

    Ok(())
}

/// Loads both input CSVs. A duplicate ground-truth date aborts here, before any analysis.
fn load_inputs(args: &AnalysisArgs) -> Result<(WikiCounts, GroundTruth)> {
    let counts = load_wiki_counts(&args.wiki_counts)
        .with_context(|| format!("loading {}", args.wiki_counts.display()))?;
    let truth = load_ground_truth(&args.ground_truth)
        .with_context(|| format!("loading {}", args.ground_truth.display()))?;
    Ok((counts, truth))
}
