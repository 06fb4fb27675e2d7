//! CLI: загружает отчёт iTunes Connect и печатает агрегаты в JSON.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use itc_sales_report::settings::Settings;
use itc_sales_report::{
    capabilities, DateGranularity, InclusionMode, Outcome, ReportRequest, ReportSubType,
    ReportType, ReporterBuilder,
};

/// Отчёты о продажах iTunes Connect.
#[derive(Parser)]
#[command(name = "itc-sales-report", version)]
#[command(about = "Fetch and aggregate iTunes Connect sales reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML settings file.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// iTunes Connect username.
    #[arg(long, env = "ITC_USERNAME", global = true)]
    username: Option<String>,

    /// iTunes Connect password.
    #[arg(long, env = "ITC_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    /// Vendor number.
    #[arg(long, env = "ITC_VENDOR", global = true)]
    vendor: Option<String>,

    /// Folder to keep downloaded reports in.
    #[arg(long, global = true)]
    folder: Option<String>,

    /// Always download, ignoring reports already in the folder.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Skip free downloads.
    #[arg(long, global = true)]
    earnings_only: bool,

    /// Do not verify the TLS certificate.
    #[arg(long, global = true)]
    insecure: bool,

    /// Fail on the first error.
    #[arg(long, global = true)]
    strict: bool,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    /// Debug logging to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List vendor numbers available to the account.
    Vendors,
    /// List accounts available to the user.
    Accounts,
    /// Print the supported report types.
    Capabilities,
    /// Fetch and aggregate one report.
    Report {
        /// Report period.
        #[arg(long, short, value_enum)]
        granularity: GranularityArg,
        /// Report date; defaults to yesterday for daily reports and today otherwise.
        #[arg(long, short)]
        date: Option<String>,
        /// Report type.
        #[arg(long = "type", value_enum, default_value = "sales")]
        report_type: ReportTypeArg,
        /// Report subtype.
        #[arg(long, value_enum, default_value = "summary")]
        subtype: SubtypeArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GranularityArg {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<GranularityArg> for DateGranularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Daily => Self::Daily,
            GranularityArg::Weekly => Self::Weekly,
            GranularityArg::Monthly => Self::Monthly,
            GranularityArg::Yearly => Self::Yearly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportTypeArg {
    Sales,
    Subscription,
    SubscriptionEvent,
    Newsstand,
}

impl From<ReportTypeArg> for ReportType {
    fn from(arg: ReportTypeArg) -> Self {
        match arg {
            ReportTypeArg::Sales => Self::Sales,
            ReportTypeArg::Subscription => Self::Subscription,
            ReportTypeArg::SubscriptionEvent => Self::SubscriptionEvent,
            ReportTypeArg::Newsstand => Self::Newsstand,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SubtypeArg {
    Summary,
    OptIn,
    Detailed,
}

impl From<SubtypeArg> for ReportSubType {
    fn from(arg: SubtypeArg) -> Self {
        match arg {
            SubtypeArg::Summary => Self::Summary,
            SubtypeArg::OptIn => Self::OptIn,
            SubtypeArg::Detailed => Self::Detailed,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Флаги командной строки перекрывают файл настроек.
fn builder(cli: &Cli) -> Result<ReporterBuilder, Box<dyn std::error::Error>> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::default(),
    };
    let mut builder = settings.into_builder();
    if let Some(username) = &cli.username {
        builder = builder.login(username);
    }
    if let Some(password) = &cli.password {
        builder = builder.password(password);
    }
    if let Some(vendor) = &cli.vendor {
        builder = builder.vendor(vendor);
    }
    if let Some(folder) = &cli.folder {
        builder = builder.folder(folder);
    }
    if cli.no_cache {
        builder = builder.use_cache(false);
    }
    if cli.earnings_only {
        builder = builder.mode(InclusionMode::EarningsOnly);
    }
    if cli.insecure {
        builder = builder.verify_tls(false);
    }
    if cli.strict {
        builder = builder.strict(true);
    }
    Ok(builder)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), serde_json::Error> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

/// Печатает значение, нефатальные ошибки уходят в stderr.
fn emit<T: Serialize>(outcome: Outcome<T>, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    if outcome.has_errors() {
        eprintln!("Api errors: {}", outcome.errors_as_string());
    }
    match outcome.into_value() {
        Some(value) => Ok(print_json(&value, pretty)?),
        None => Err("no data returned".into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Capabilities => {
            let table: BTreeMap<&str, BTreeMap<&str, BTreeMap<&str, &str>>> = capabilities()
                .iter()
                .map(|(report_type, subtypes)| {
                    let subtypes = subtypes
                        .iter()
                        .map(|(subtype, formats)| {
                            let formats = formats
                                .iter()
                                .map(|(granularity, format)| (granularity.as_str(), format.pattern()))
                                .collect();
                            (subtype.as_str(), formats)
                        })
                        .collect();
                    (report_type.as_str(), subtypes)
                })
                .collect();
            print_json(&table, cli.pretty)?;
        }
        Command::Vendors => emit(builder(&cli)?.build()?.vendors()?, cli.pretty)?,
        Command::Accounts => emit(builder(&cli)?.build()?.accounts()?, cli.pretty)?,
        Command::Report {
            granularity,
            date,
            report_type,
            subtype,
        } => {
            let request = ReportRequest {
                report_type: (*report_type).into(),
                subtype: (*subtype).into(),
                granularity: (*granularity).into(),
                date: date.clone(),
            };
            emit(builder(&cli)?.build()?.report(&request)?, cli.pretty)?;
        }
    }
    Ok(())
}
