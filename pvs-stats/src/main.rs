//! pvs-stats - PVS statistics reconciliation
//!
//! Reconciles per-subject perivascular-space statistics produced by the
//! imaging pipeline with the clinical roster, and writes the cohort,
//! subset and healthy-volunteer reports.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pvs_common::config::{self, PathOverrides, PipelineConfig, TomlConfig};
use pvs_stats::clusters::{
    convert_report_file, ClusterReportGenerator, Conversion, SegmentSummary,
};
use pvs_stats::key_conversion::RosterResolution;
use pvs_stats::roster::Roster;
use pvs_stats::tools::{AfniClusterize, AfniOverlap};
use pvs_stats::{IdentityResolver, KeyTable, ReportBuilder};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pvs-stats")]
#[command(about = "Reconcile PVS cluster statistics with the clinical roster")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true, env = "PVS_CONFIG")]
    config: Option<PathBuf>,

    /// Project root holding one directory per subject
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Key file mapping codes to names
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,

    /// Clinical roster CSV
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Directory receiving reports
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the cohort, subset and healthy-volunteer reports
    Compile,

    /// Resolve roster names to codes and write the key conversion lists
    Resolve,

    /// Convert segmentation text reports into CSV cluster tables
    Convert {
        /// Convert every subject's reports under the project root
        #[arg(long, conflicts_with_all = ["input", "output"])]
        all: bool,

        /// Reconvert tables that already exist (with --all)
        #[arg(long, requires = "all")]
        force: bool,

        /// Text report to convert
        #[arg(required_unless_present = "all")]
        input: Option<PathBuf>,

        /// CSV table to write
        #[arg(required_unless_present = "all")]
        output: Option<PathBuf>,
    },

    /// Run segmentation for subjects missing a cluster report, then convert
    Segment {
        /// Only this subject
        #[arg(long)]
        code: Option<String>,
    },

    /// Write a config file with every setting at its default
    InitConfig {
        /// Target path
        path: PathBuf,
    },
}

impl Args {
    fn overrides(&self) -> PathOverrides {
        PathOverrides {
            project_root: self.project_root.clone(),
            key_file: self.key_file.clone(),
            roster_path: self.roster.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { path } = &args.command {
        init_logging("info", None)?;
        config::write_toml_config(&TomlConfig::default(), path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let toml = config::load_or_default(args.config.as_deref()).context("Failed to load config")?;
    init_logging(&toml.logging.level, toml.logging.file.as_ref())?;

    info!(
        "Starting pvs-stats v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Single-file conversion needs no project layout
    if let Command::Convert {
        all: false,
        input: Some(input),
        output: Some(output),
        ..
    } = &args.command
    {
        let header_lines = toml.cohort.cluster_report_header_lines;
        match convert_report_file(input, output, header_lines)
            .with_context(|| format!("Failed to convert {}", input.display()))?
        {
            Conversion::Written { rows, .. } => {
                info!("Wrote {} clusters to {}", rows, output.display())
            }
            Conversion::NoClusters => info!("No clusters in {}, nothing written", input.display()),
        }
        return Ok(());
    }

    let config = PipelineConfig::resolve(toml, args.overrides())?;
    config.validate()?;
    info!(
        project_root = %config.project_root.display(),
        key_file = %config.key_file.display(),
        output_dir = %config.output_dir.display(),
        "Configuration resolved"
    );

    match &args.command {
        Command::Compile => compile(&config),
        Command::Resolve => resolve(&config),
        Command::Convert { force, .. } => {
            let generator = ClusterReportGenerator::convert_only(
                &config.project_root,
                config.cohort.cluster_report_header_lines,
            )
            .with_force(*force);
            let summary = generator.run_all()?;
            if summary.failures > 0 {
                warn!("{} reports could not be converted", summary.failures);
            }
            Ok(())
        }
        Command::Segment { code } => segment(&config, code.as_deref()),
        Command::InitConfig { .. } => Ok(()),
    }
}

fn compile(config: &PipelineConfig) -> Result<()> {
    let key_file = config.require_key_file()?;
    let key_table = KeyTable::load(key_file)
        .with_context(|| format!("Failed to read key file {}", key_file.display()))?;
    let roster_path = config.require_roster()?;
    let roster = Roster::load(roster_path, &config.roster)
        .with_context(|| format!("Failed to read roster {}", roster_path.display()))?;

    let overlap = AfniOverlap::new(config.tools.overlap.clone());
    let builder = ReportBuilder::new(config, &key_table, &overlap);
    let summary = builder.compile(&roster)?;

    info!(
        "Compiled {} roster rows ({} resolved, {} missing, {} excluded), {} healthy volunteers",
        summary.roster_rows,
        summary.resolved,
        summary.missing,
        summary.excluded,
        summary.healthy_volunteers
    );
    Ok(())
}

fn resolve(config: &PipelineConfig) -> Result<()> {
    let key_file = config.require_key_file()?;
    let key_table = KeyTable::load(key_file)
        .with_context(|| format!("Failed to read key file {}", key_file.display()))?;
    let roster_path = config.require_roster()?;
    let roster = Roster::load(roster_path, &config.roster)
        .with_context(|| format!("Failed to read roster {}", roster_path.display()))?;

    let resolution = RosterResolution::resolve(
        &roster,
        IdentityResolver::new(&key_table),
        &config.cohort.hv_marker,
    );
    for path in resolution.write_reports(&config.output_dir)? {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn segment(config: &PipelineConfig, code: Option<&str>) -> Result<()> {
    let tool = AfniClusterize::new(
        config.tools.clusterize.clone(),
        config.tools.clusterize_args.clone(),
    );
    let generator = ClusterReportGenerator::new(
        &config.project_root,
        &tool,
        config.cohort.cluster_report_header_lines,
    );

    let summary = match code {
        Some(code) => {
            if !config.project_root.join(code).is_dir() {
                bail!("No subject directory for {}", code);
            }
            let mut summary = SegmentSummary::default();
            generator.run_subject(code, &mut summary);
            summary
        }
        None => generator.run_all()?,
    };

    info!(
        "Segmentation: {} reports generated, {} tables written, {} without clusters, {} failures",
        summary.reports_generated, summary.tables_written, summary.no_clusters, summary.failures
    );
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level
fn init_logging(level: &str, file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}
