use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::history::{self, RemediationLog};
use crate::index::IndexStore;
use crate::output::{self, OutputMode};
use crate::progress;
use crate::record::FileStatus;
use crate::theme::Theme;

#[derive(Parser)]
#[command(name = "sigguard")]
#[command(version)]
#[command(about = "Track text files under a directory and strip known signatures from them")]
#[command(long_about = "sigguard indexes every text file under a directory, fingerprints its \
    content, and flags files containing any known signature string.\n\n\
    Examples:\n  \
    sigguard scan ./docs                      # Index and classify\n  \
    sigguard fix ./docs -y                    # Strip signatures from infected files\n  \
    sigguard watch ./docs --interval 30       # Rescan every 30 seconds\n  \
    sigguard scan ./docs --signatures sigs.txt --extension log")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity (-v, -vv for more)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Options shared by every command that builds an index
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Newline-delimited signature file (default: built-in list)
    #[arg(long, value_name = "FILE")]
    pub signatures: Option<PathBuf>,

    /// Tracked file extension [default: txt]
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Exclude paths matching pattern, relative to the root (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a directory and classify every file
    #[command(visible_alias = "s")]
    Scan {
        /// Directory to scan
        path: PathBuf,

        /// Output results as JSON for scripting
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Scan, then strip signatures from infected files
    #[command(visible_alias = "f")]
    Fix {
        /// Directory to fix
        path: PathBuf,

        /// Skip confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,

        /// Do not save a remediation log
        #[arg(long)]
        no_log: bool,

        /// Output results as JSON for scripting (requires --yes)
        #[arg(long, requires = "yes")]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Build the index without classifying
    #[command(visible_alias = "i")]
    Index {
        /// Directory to index
        path: PathBuf,

        /// Output results as JSON for scripting
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Rescan a directory periodically
    #[command(visible_alias = "w")]
    Watch {
        /// Directory to watch
        path: PathBuf,

        /// Seconds between rescans [default: 60]
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,

        /// Strip signatures after every rescan (no confirmation)
        #[arg(long)]
        fix: bool,

        /// Stop after N rescans
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
        cycles: Option<u64>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// List saved remediation logs, newest first
    #[command(visible_alias = "h")]
    History {
        /// Print one log in full
        #[arg(long, value_name = "FILE")]
        show: Option<PathBuf>,
    },

    /// View or reset configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,

        /// Print the config file location
        #[arg(long)]
        path: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    fn output_mode(&self) -> OutputMode {
        if self.quiet {
            OutputMode::Quiet
        } else if self.verbose >= 2 {
            OutputMode::VeryVerbose
        } else if self.verbose == 1 {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }

    /// Install the tracing subscriber; `RUST_LOG` wins over the flags
    fn init_logging(&self) {
        use tracing_subscriber::EnvFilter;

        let level = if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                _ => "debug",
            }
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("sigguard={}", level)));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .try_init();
    }

    pub fn run(self) -> anyhow::Result<()> {
        self.init_logging();
        let output_mode = self.output_mode();

        match self.command {
            Commands::Scan { path, json, engine } => {
                let config = load_config(&engine, None);
                let mut store = open_store(&path, &config)?;

                let spinner = progress::maybe_spinner(show_progress(output_mode, json), "Indexing files...");
                store.create_index()?;
                if let Some(ref sp) = spinner {
                    sp.set_message(format!("Scanning {} files...", store.len()));
                }
                let report = store.scan_files_for_viruses()?;
                if let Some(sp) = spinner {
                    progress::finish_and_clear(&sp);
                }

                if json {
                    output::print_json(&store)?;
                } else {
                    output::print_human(&store, output_mode);
                    output::print_scan_report(&report, output_mode);
                }
                Ok(())
            }
            Commands::Fix { path, yes, no_log, json, engine } => {
                let config = load_config(&engine, None);
                let mut store = open_store(&path, &config)?;

                let spinner = progress::maybe_spinner(show_progress(output_mode, json), "Indexing files...");
                store.create_index()?;
                let scan_report = store.scan_files_for_viruses()?;
                if let Some(sp) = spinner {
                    progress::finish_and_clear(&sp);
                }

                if !json {
                    output::print_human(&store, output_mode);
                    output::print_scan_report(&scan_report, output_mode);
                }

                let infected = store.count_status(FileStatus::Dangerous);
                if infected > 0 && !yes && !confirm(infected)? {
                    println!("{}", Theme::muted("Cancelled."));
                    return Ok(());
                }

                let fix_report = store.fix_infected_files()?;

                if !no_log && fix_report.repaired > 0 {
                    let mut log = RemediationLog::new(store.root(), store.signatures().source());
                    log.extend_from_report(&fix_report);
                    match log.save() {
                        Ok(log_path) => {
                            tracing::info!(path = %log_path.display(), summary = %log.summary(), "remediation log saved");
                            if output_mode == OutputMode::Verbose || output_mode == OutputMode::VeryVerbose {
                                println!("{} {}", Theme::muted("Log saved to"), log_path.display());
                            }
                        }
                        Err(e) => {
                            if output_mode != OutputMode::Quiet {
                                eprintln!("{} Failed to save remediation log: {:#}", Theme::warning("Warning:"), e);
                            }
                        }
                    }
                }

                if json {
                    output::print_json(&store)?;
                } else {
                    output::print_fix_report(&fix_report, output_mode);
                    output::print_human(&store, output_mode);
                }
                Ok(())
            }
            Commands::Index { path, json, engine } => {
                let config = load_config(&engine, None);
                let mut store = open_store(&path, &config)?;
                store.create_index()?;

                if json {
                    output::print_json(&store)?;
                } else {
                    output::print_human(&store, output_mode);
                }
                Ok(())
            }
            Commands::Watch { path, interval, fix, cycles, engine } => {
                let config = load_config(&engine, interval);
                let mut store = open_store(&path, &config)?;
                let period = Duration::from_secs(config.watch.interval_secs);

                store.create_index()?;
                let mut cycle: u64 = 0;
                loop {
                    let sync = store.update_index()?;
                    let scan = store.scan_files_for_viruses()?;

                    output::print_sync_report(&sync, output_mode);
                    output::print_scan_report(&scan, output_mode);
                    if fix && scan.dangerous > 0 {
                        let fix_report = store.fix_infected_files()?;
                        output::print_fix_report(&fix_report, output_mode);
                    }
                    output::print_human(&store, output_mode);

                    cycle += 1;
                    if cycles.map(|limit| cycle >= limit).unwrap_or(false) {
                        return Ok(());
                    }
                    std::thread::sleep(period);
                }
            }
            Commands::History { show } => {
                if let Some(log_path) = show {
                    let log = history::load_log(&log_path)
                        .with_context(|| format!("Failed to load log file: {}", log_path.display()))?;
                    output::print_remediation_log(&log, output_mode);
                    return Ok(());
                }

                let logs = history::list_logs()?;
                if output_mode == OutputMode::Quiet {
                    return Ok(());
                }
                if logs.is_empty() {
                    println!("{}", Theme::muted("No remediation logs."));
                }
                for log_path in logs {
                    match history::load_log(&log_path) {
                        Ok(log) => println!("{}  {}", log_path.display(), Theme::muted(&log.summary())),
                        Err(e) => tracing::warn!(path = %log_path.display(), error = %format!("{:#}", e), "skipping unreadable log"),
                    }
                }
                Ok(())
            }
            Commands::Config { show, reset, path } => {
                // Showing is the default when no other action is asked for
                let show = show || !(reset || path);
                if reset {
                    Config::default().save()?;
                    println!("{} Configuration reset to defaults.", Theme::success("OK"));
                }
                if path {
                    println!("{}", Config::config_path()?.display());
                }
                if show {
                    let config = Config::load_or_create();
                    println!("{}", Theme::header("Current Configuration"));
                    println!("{}", Theme::divider_bold(60));
                    println!("{}", config.to_toml()?);
                    if let Ok(path) = Config::config_path() {
                        println!("Config file: {}", path.display());
                    }
                }
                Ok(())
            }
        }
    }
}

fn show_progress(mode: OutputMode, json: bool) -> bool {
    mode != OutputMode::Quiet && !json
}

/// Config file values with the command-line overrides applied
fn load_config(engine: &EngineArgs, interval: Option<u64>) -> Config {
    let mut config = Config::load();
    config.apply_cli_overrides(
        engine.extension.clone(),
        engine.signatures.clone(),
        interval,
        &engine.exclude,
    );
    config
}

fn open_store(path: &Path, config: &Config) -> anyhow::Result<IndexStore> {
    let options = config.index_options()?;
    IndexStore::open(path, config.scan.signatures_file.as_deref(), options)
        .with_context(|| format!("Cannot open index for {}", path.display()))
}

fn confirm(infected: usize) -> anyhow::Result<bool> {
    print!(
        "Strip signatures from {} infected files in place? [y/N]: ",
        Theme::value(&infected.to_string())
    );
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
