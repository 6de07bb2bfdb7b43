use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_data_citations::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use kira_data_citations::crossref::CrossrefHttpClient;
use kira_data_citations::datacite::DataciteHttpClient;
use kira_data_citations::domain::{Doi, Scope};
use kira_data_citations::error::KiraError;
use kira_data_citations::output::{JsonOutput, OutputMode, write_csv_file};
use kira_data_citations::pasta::{PastaClient, PastaHttpClient};
use kira_data_citations::report::{LogSink, ProgressSink, ReportBuilder, ReportSummary};

type HttpReportBuilder = ReportBuilder<PastaHttpClient, DataciteHttpClient, CrossrefHttpClient>;

#[derive(Parser)]
#[command(name = "kira-dc")]
#[command(about = "Citation reports for EDI datasets (DataCite + Crossref)")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Write the citation CSV for a scope and its standalone datasets")]
    Report(ReportArgs),
    #[command(about = "List the works citing or referencing a DOI")]
    Citations(CitationsArgs),
    #[command(about = "List package ids in a scope")]
    Packages(PackagesArgs),
    #[command(about = "Show metadata of one package revision")]
    Revision(RevisionArgs),
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    scope: Option<String>,

    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct CitationsArgs {
    doi: String,
}

#[derive(Args)]
struct PackagesArgs {
    scope: String,
}

#[derive(Args)]
struct RevisionArgs {
    scope: String,
    package: u64,
    revision: u64,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::MissingScope
        | KiraError::InvalidScope(_)
        | KiraError::InvalidDoi(_) => 2,
        other if other.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let overrides = match &cli.command {
        Commands::Report(args) => ConfigOverrides {
            scope: args.scope.clone(),
            output_path: args.output.clone(),
        },
        _ => ConfigOverrides::default(),
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    let builder = build_clients(&config)?;

    match cli.command {
        Commands::Report(_) => run_report(&builder, &config, output_mode),
        Commands::Citations(args) => {
            let doi: Doi = args.doi.parse()?;
            let citations = builder.collector().fetch_related(doi.identifier())?;
            JsonOutput::print_citations(&citations).into_diagnostic()
        }
        Commands::Packages(args) => {
            let scope: Scope = args.scope.parse()?;
            let ids = builder.pasta().list_package_ids(scope.as_str())?;
            JsonOutput::print_ids(&ids).into_diagnostic()
        }
        Commands::Revision(args) => {
            let scope: Scope = args.scope.parse()?;
            let meta = builder.revision(
                scope.as_str(),
                &args.package.to_string(),
                &args.revision.to_string(),
            )?;
            JsonOutput::print_revision(&meta).into_diagnostic()
        }
    }
}

fn build_clients(config: &ResolvedConfig) -> Result<HttpReportBuilder, KiraError> {
    let pasta = PastaHttpClient::new(config.timeout)?;
    let datacite = DataciteHttpClient::new(config.timeout)?;
    let crossref = CrossrefHttpClient::new(config.timeout)?;
    Ok(ReportBuilder::new(pasta, datacite, crossref))
}

fn run_report(
    builder: &HttpReportBuilder,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let scope = config.require_scope()?;
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Interactive => &LogSink,
        OutputMode::NonInteractive => &JsonOutput,
    };

    let report = builder.build(scope.as_str(), &config.standalone, sink)?;
    write_csv_file(&config.output_path, &report.rows)?;
    let summary = ReportSummary::new(scope.as_str(), &config.output_path, &report);

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_summary(&summary).into_diagnostic(),
        OutputMode::Interactive => {
            print_report_summary(&summary);
            Ok(())
        }
    }
}

fn print_report_summary(summary: &ReportSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}KIRA-DC citation report ({}){reset}", summary.scope);
    println!("{green}Datasets checked: {}{reset}", summary.datasets);
    println!("{green}Citation rows: {}{reset}", summary.rows);
    if summary.failed_lookups > 0 {
        println!(
            "{yellow}Citations without text (lookup failed): {}{reset}",
            summary.failed_lookups
        );
    }
    println!("{cyan}Wrote {}{reset}", summary.output_path);
}
