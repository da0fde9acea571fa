//! Binary entry point for the `linkclique` CLI.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use linkclique::cli::pipeline::{
    run, run_ingest, run_search, CliError, IngestConfig, IngestSummary, RunConfig, RunSummary,
};
use linkclique::ingest::{IngestOptions, IngestStats, InputFormat};
use linkclique::report::SearchReport;
use linkclique::search::{PivotRule, SearchOptions, SearchStats};
use linkclique::storage::{StoreOptions, Synchronous};
use tracing_subscriber::{fmt, EnvFilter};

use config::{CliConfig, ConfigError, Settings};
use ui::{format_duration, Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "linkclique",
    version,
    about = "Find the largest maximal cliques of a mutual-link graph",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "LINKCLIQUE_CONFIG",
        help = "CLI config file (defaults to the platform config dir)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "NAME", help = "Config profile to apply")]
    profile: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = ThemeArg::Auto,
        help = "Terminal color theme"
    )]
    theme: ThemeArg,

    #[arg(long, global = true, help = "Only print results")]
    quiet: bool,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v info, -vv debug, -vvv trace)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest into a scratch store, search it, print the ranking and clean up.
    Run(RunCmd),
    /// Build a store from a link list and keep it.
    Ingest(IngestCmd),
    /// Search a store built by `ingest`.
    Search(SearchCmd),
    /// Manage configuration profiles.
    Profile {
        #[command(subcommand)]
        action: ProfileCmd,
    },
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct RunCmd {
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    #[command(flatten)]
    input_args: InputArgs,

    #[command(flatten)]
    settings: SettingArgs,

    #[arg(long, value_name = "PATH", help = "Scratch store path (must not exist)")]
    tmp: Option<PathBuf>,

    #[arg(long, help = "Keep the scratch store after the run")]
    keep_db: bool,
}

#[derive(Args, Debug)]
struct IngestCmd {
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    #[arg(long, value_name = "PATH", help = "Store to create (must not exist)")]
    db: PathBuf,

    #[command(flatten)]
    input_args: InputArgs,

    #[command(flatten)]
    settings: SettingArgs,
}

#[derive(Args, Debug)]
struct SearchCmd {
    #[arg(value_name = "DB")]
    db: PathBuf,

    #[command(flatten)]
    settings: SettingArgs,
}

#[derive(Subcommand, Debug)]
enum ProfileCmd {
    /// List profiles and the `[defaults]` table.
    List,
    /// Create or update a profile from the given flags.
    Save {
        name: String,
        #[command(flatten)]
        settings: SettingArgs,
        #[arg(long, help = "Also make this the default profile")]
        make_default: bool,
    },
    /// Delete a profile.
    Delete { name: String },
    /// Show or set the default profile.
    Default {
        name: Option<String>,
        #[arg(long, conflicts_with = "name", help = "Clear the default profile")]
        clear: bool,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    #[arg(long, value_enum, default_value_t = InputFormatArg::Auto, help = "Input encoding")]
    input_format: InputFormatArg,

    #[arg(long, help = "Skip the first CSV row")]
    header: bool,
}

#[derive(Args, Debug, Default)]
struct SettingArgs {
    #[arg(long = "amnt", value_name = "K", help = "Number of cliques to report [default: 10]")]
    top_k: Option<usize>,

    #[arg(long = "info", value_name = "N", help = "Progress interval, 0 disables [default: 5000]")]
    info_interval: Option<u64>,

    #[arg(long, value_enum, help = "Pivot rule [default: first]")]
    pivot: Option<PivotArg>,

    #[arg(long, value_name = "N", help = "Neighbor cache entries, 0 disables")]
    neighbor_cache: Option<usize>,

    #[arg(long, value_name = "SECS", help = "Stop the search after this many seconds")]
    time_limit: Option<u64>,

    #[arg(long, value_name = "N", help = "Stop the search after this many recursive calls")]
    max_calls: Option<u64>,

    #[arg(long, value_name = "N", help = "Label cache entries during ingestion, 0 disables")]
    intern_cache: Option<usize>,

    #[arg(long = "batch", value_name = "N", help = "Documents per committed batch")]
    batch_documents: Option<usize>,

    #[arg(long, help = "Ignore duplicate links")]
    dedup_edges: bool,

    #[arg(long, conflicts_with = "dedup_edges", help = "Store duplicate links")]
    no_dedup_edges: bool,

    #[arg(long, help = "Build edge indexes after ingestion")]
    defer_indexes: bool,

    #[arg(long, conflicts_with = "defer_indexes", help = "Build edge indexes up front")]
    no_defer_indexes: bool,

    #[arg(long, value_enum, help = "SQLite synchronous mode [default: off]")]
    synchronous: Option<SynchronousArg>,
}

impl SettingArgs {
    fn to_settings(&self) -> Settings {
        Settings {
            top_k: self.top_k,
            info_interval: self.info_interval,
            pivot: self.pivot,
            neighbor_cache: self.neighbor_cache,
            intern_cache: self.intern_cache,
            batch_documents: self.batch_documents,
            synchronous: self.synchronous,
            dedup_edges: toggle(self.dedup_edges, self.no_dedup_edges),
            defer_indexes: toggle(self.defer_indexes, self.no_defer_indexes),
            time_limit_secs: self.time_limit,
            max_calls: self.max_calls,
        }
    }
}

fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ThemeArg {
    Auto,
    Light,
    Dark,
    Plain,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Auto => Theme::Auto,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Plain => Theme::Plain,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum InputFormatArg {
    Auto,
    Csv,
    Tsv,
    Jsonl,
}

impl InputFormatArg {
    fn resolve(self) -> Option<InputFormat> {
        match self {
            InputFormatArg::Auto => None,
            InputFormatArg::Csv => Some(InputFormat::Csv),
            InputFormatArg::Tsv => Some(InputFormat::Tsv),
            InputFormatArg::Jsonl => Some(InputFormat::JsonLines),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SynchronousArg {
    Full,
    Normal,
    Off,
}

impl From<SynchronousArg> for Synchronous {
    fn from(mode: SynchronousArg) -> Self {
        match mode {
            SynchronousArg::Full => Synchronous::Full,
            SynchronousArg::Normal => Synchronous::Normal,
            SynchronousArg::Off => Synchronous::Off,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PivotArg {
    First,
    MaxCandidates,
}

impl From<PivotArg> for PivotRule {
    fn from(value: PivotArg) -> Self {
        match value {
            PivotArg::First => PivotRule::First,
            PivotArg::MaxCandidates => PivotRule::MaxCandidates,
        }
    }
}

const EXIT_ERROR: i32 = 1;
const EXIT_ABORTED: i32 = 2;

fn main() {
    let cli = Cli::parse();
    install_tracing_subscriber(cli.verbose);
    let ui = Ui::new(cli.theme.into(), cli.quiet);
    match execute(&cli, &ui) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            if let Some(CliError::SearchFailed { report, .. }) = err.downcast_ref::<CliError>() {
                let _ = emit(cli.format, report.as_ref(), || ui.results(report));
            }
            eprintln!("error: {err}");
            std::process::exit(EXIT_ERROR);
        }
    }
}

fn install_tracing_subscriber(verbose: u8) {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_env("LINKCLIQUE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(level));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    });
}

fn execute(cli: &Cli, ui: &Ui) -> Result<i32, Box<dyn Error>> {
    let mut config = CliConfig::load(cli.config.clone())?;
    match &cli.command {
        Command::Run(cmd) => {
            let settings = config.resolve(cmd.settings.to_settings(), cli.profile.as_deref())?;
            let cfg = RunConfig {
                ingest: build_ingest_config(&cmd.input, &cmd.input_args, &settings),
                search: build_search_options(&settings),
                scratch: cmd.tmp.clone(),
                keep_db: cmd.keep_db,
            };
            let summary = {
                let mut observer = ui.observer();
                run(&cfg, &mut observer)?
            };
            emit(cli.format, &summary, || print_run_text(ui, &summary))?;
            Ok(exit_code(&summary.report))
        }
        Command::Ingest(cmd) => {
            let settings = config.resolve(cmd.settings.to_settings(), cli.profile.as_deref())?;
            let cfg = build_ingest_config(&cmd.input, &cmd.input_args, &settings);
            let summary = {
                let mut observer = ui.observer();
                run_ingest(&cfg, &cmd.db, &mut observer)?
            };
            emit(cli.format, &summary, || print_ingest_text(ui, &summary))?;
            Ok(0)
        }
        Command::Search(cmd) => {
            let settings = config.resolve(cmd.settings.to_settings(), cli.profile.as_deref())?;
            let store_opts = build_store_options(&settings).dedup_edges(false);
            let opts = build_search_options(&settings);
            let report = {
                let mut observer = ui.observer();
                run_search(&cmd.db, &store_opts, &opts, &mut observer)?
            };
            emit(cli.format, &report, || {
                ui.results(&report);
                if let Some(stats) = &report.stats {
                    ui.spacer();
                    print_search_stats(ui, stats);
                }
            })?;
            Ok(exit_code(&report))
        }
        Command::Profile { action } => {
            run_profile(&mut config, action, ui)?;
            Ok(0)
        }
        Command::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "linkclique", &mut io::stdout());
            Ok(0)
        }
    }
}

fn exit_code(report: &SearchReport) -> i32 {
    if report.complete {
        0
    } else {
        EXIT_ABORTED
    }
}

fn build_store_options(settings: &Settings) -> StoreOptions {
    let mut opts = StoreOptions::default()
        .dedup_edges(settings.dedup_edges.unwrap_or(false))
        .defer_indexes(settings.defer_indexes.unwrap_or(false));
    if let Some(sync) = settings.synchronous {
        opts.synchronous = sync.into();
    }
    opts
}

fn build_ingest_config(input: &std::path::Path, args: &InputArgs, settings: &Settings) -> IngestConfig {
    let defaults = IngestOptions::default();
    IngestConfig {
        input: input.to_path_buf(),
        format: args.input_format.resolve(),
        has_header: args.header,
        ingest: IngestOptions {
            intern_cache_capacity: settings
                .intern_cache
                .unwrap_or(defaults.intern_cache_capacity),
            batch_documents: settings.batch_documents.unwrap_or(defaults.batch_documents),
            info_interval: interval(settings.info_interval, defaults.info_interval),
        },
        store: build_store_options(settings),
    }
}

fn build_search_options(settings: &Settings) -> SearchOptions {
    let defaults = SearchOptions::default();
    SearchOptions {
        top_k: settings.top_k.unwrap_or(defaults.top_k),
        info_interval: interval(settings.info_interval, defaults.info_interval),
        pivot: settings.pivot.map(PivotRule::from).unwrap_or(defaults.pivot),
        neighbor_cache_capacity: settings
            .neighbor_cache
            .unwrap_or(defaults.neighbor_cache_capacity),
        time_limit: settings.time_limit_secs.map(Duration::from_secs),
        max_calls: settings.max_calls,
    }
}

fn interval(value: Option<u64>, default: Option<u64>) -> Option<u64> {
    match value {
        Some(0) => None,
        Some(n) => Some(n),
        None => default,
    }
}

fn run_profile(config: &mut CliConfig, action: &ProfileCmd, ui: &Ui) -> Result<(), ConfigError> {
    match action {
        ProfileCmd::List => {
            if let Some(path) = config.path() {
                ui.info(&format!("config file: {}", path.display()));
            }
            let default = config.default_profile_name();
            let defaults = config.defaults();
            if !defaults.is_empty() {
                ui.section("[defaults]", defaults.entries());
            }
            let names: Vec<String> = config
                .profiles()
                .map(|profile| {
                    let marker = if Some(profile.name.as_str()) == default {
                        " (default)"
                    } else {
                        ""
                    };
                    let entries: Vec<String> = profile
                        .settings
                        .entries()
                        .into_iter()
                        .map(|(key, value)| format!("{key}={value}"))
                        .collect();
                    format!("{}{marker}: {}", profile.name, entries.join(" "))
                })
                .collect();
            if names.is_empty() {
                ui.info("no profiles configured");
            } else {
                ui.list("Profiles", names);
            }
        }
        ProfileCmd::Save {
            name,
            settings,
            make_default,
        } => {
            config.upsert_profile(name, &settings.to_settings())?;
            if *make_default {
                config.set_default_profile(Some(name.as_str()))?;
            }
            let path = config.persist()?;
            ui.success(&format!("saved profile '{name}' to {}", path.display()));
        }
        ProfileCmd::Delete { name } => {
            config.delete_profile(name)?;
            let path = config.persist()?;
            ui.success(&format!("deleted profile '{name}' from {}", path.display()));
        }
        ProfileCmd::Default { name, clear } => {
            if *clear || name.is_some() {
                config.set_default_profile(name.as_deref())?;
                let path = config.persist()?;
                match name {
                    Some(name) => ui.success(&format!("default profile is now '{name}' ({})", path.display())),
                    None => ui.success("default profile cleared"),
                }
            } else {
                match config.default_profile_name() {
                    Some(name) => println!("{name}"),
                    None => ui.info("no default profile"),
                }
            }
        }
    }
    Ok(())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize + ?Sized,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_run_text(ui: &Ui, summary: &RunSummary) {
    ui.results(&summary.report);
    ui.spacer();
    print_ingest_stats(ui, &summary.ingest);
    if let Some(stats) = &summary.report.stats {
        print_search_stats(ui, stats);
    }
    if let Some(path) = &summary.kept_db {
        ui.info(&format!("store kept at {}", path.display()));
    }
}

fn print_ingest_text(ui: &Ui, summary: &IngestSummary) {
    print_ingest_stats(ui, &summary.stats);
    ui.success(&format!("store written to {}", summary.db_path.display()));
}

fn print_ingest_stats(ui: &Ui, stats: &IngestStats) {
    ui.section(
        "Ingestion",
        [
            ("documents", stats.documents.to_string()),
            ("vertices", stats.vertices.to_string()),
            ("edges", stats.edges_inserted.to_string()),
            (
                "label cache",
                format!("{} hits / {} misses", stats.cache_hits, stats.cache_misses),
            ),
            ("elapsed", format_duration(stats.elapsed)),
        ],
    );
}

fn print_search_stats(ui: &Ui, stats: &SearchStats) {
    let cache = &stats.neighbor_cache;
    ui.section(
        "Search",
        [
            ("calls", stats.calls.to_string()),
            ("maximal cliques", stats.cliques_reported.to_string()),
            ("accepted", stats.cliques_accepted.to_string()),
            (
                "pruned",
                format!("{} by size / {} by degree", stats.pruned_by_size, stats.pruned_by_degree),
            ),
            ("max depth", stats.max_depth.to_string()),
            (
                "neighbor cache",
                format!(
                    "{} hits / {} misses / {} evictions ({:.1}%)",
                    cache.hits,
                    cache.misses,
                    cache.evictions,
                    cache.hit_rate() * 100.0
                ),
            ),
            ("elapsed", format_duration(stats.elapsed)),
        ],
    );
}
