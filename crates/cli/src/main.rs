mod auth;
mod fetch;
mod output;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use rosterwatch_core::diff::{diff_rosters, DEFAULT_IGNORED_PATHS};
use rosterwatch_core::model::Roster;
use rosterwatch_core::report::{append_report, render_report};
use rosterwatch_core::{History, DEFAULT_MAX_ENTRIES};

use output::ListFormat;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// What `run` prints to stdout once the pipeline completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ShowInfo {
    Changes,
    Employees,
    None,
}

/// HR roster change monitor.
#[derive(Parser)]
#[command(name = "rosterwatch", version, about = "HR roster change monitor")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the roster, diff against the stored history, and log changes
    Run {
        /// HR service domain (e.g. mycompany.hibob.com)
        #[arg(long)]
        domain: String,
        /// Exported browser cookie file (Netscape format or name=value pairs)
        #[arg(long, default_value = "cookies.txt")]
        cookies: PathBuf,
        /// Roster rendering format for --save and --show employees
        #[arg(long, default_value = "table", value_enum)]
        format: ListFormat,
        /// Write the fetched roster to this file
        #[arg(long)]
        save: Option<PathBuf>,
        /// What to print on stdout after the run
        #[arg(long, default_value = "changes", value_enum)]
        show: ShowInfo,
        /// Skip the diff/record path entirely
        #[arg(long)]
        no_change_tracking: bool,
        /// History store file
        #[arg(long, default_value = "data/roster_history.json")]
        cache_file: PathBuf,
        /// Append-only change log file
        #[arg(long, default_value = "data/roster_changes.log")]
        log_file: PathBuf,
        /// Maximum number of distinct rosters kept in the history store
        #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES)]
        max_history: usize,
    },

    /// Diff two saved roster files
    Diff {
        /// Path to the earlier roster JSON file
        previous: PathBuf,
        /// Path to the later roster JSON file
        current: PathBuf,
    },

    /// Print the most recent cached roster
    Show {
        /// History store file
        #[arg(long, default_value = "data/roster_history.json")]
        cache_file: PathBuf,
        /// Roster rendering format
        #[arg(long, default_value = "table", value_enum)]
        format: ListFormat,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            domain,
            cookies,
            format,
            save,
            show,
            no_change_tracking,
            cache_file,
            log_file,
            max_history,
        } => {
            if no_change_tracking && show == ShowInfo::Changes {
                report_error(
                    "change tracking must be enabled to show changes; \
                     pass --show employees or --show none",
                    cli.output,
                );
                process::exit(1);
            }
            cmd_run(RunOptions {
                domain,
                cookies,
                format,
                save,
                show,
                change_tracking: !no_change_tracking,
                cache_file,
                log_file,
                max_history,
                output: cli.output,
                quiet: cli.quiet,
            });
        }
        Commands::Diff { previous, current } => {
            cmd_diff(&previous, &current, cli.output, cli.quiet);
        }
        Commands::Show { cache_file, format } => {
            cmd_show(&cache_file, format, cli.output);
        }
    }
}

struct RunOptions {
    domain: String,
    cookies: PathBuf,
    format: ListFormat,
    save: Option<PathBuf>,
    show: ShowInfo,
    change_tracking: bool,
    cache_file: PathBuf,
    log_file: PathBuf,
    max_history: usize,
    output: OutputFormat,
    quiet: bool,
}

fn cmd_run(opts: RunOptions) {
    // Auth and fetch fail before the history store is ever touched, so
    // a failed run leaves the persisted state exactly as it was.
    let cookie_header = match auth::authenticate(&opts.domain, &opts.cookies, opts.quiet) {
        Ok(header) => header,
        Err(e) => {
            report_error(&e, opts.output);
            process::exit(1);
        }
    };

    let base_url = fetch::build_base_url(&opts.domain);
    let roster = match fetch::fetch_active_employees(&base_url, &cookie_header, opts.quiet) {
        Ok(roster) => roster,
        Err(e) => {
            report_error(&e, opts.output);
            process::exit(1);
        }
    };

    if let Some(path) = &opts.save {
        let rendered = output::format_roster(&roster, opts.format);
        match output::write_file(path, &rendered) {
            Ok(()) => {
                if !opts.quiet {
                    println!("roster saved to {}", path.display());
                }
            }
            Err(e) => report_error(&e, opts.output),
        }
    }

    let mut report_text = None;
    let mut report_json = serde_json::Value::Null;

    if opts.change_tracking {
        let mut history = History::load(&opts.cache_file, opts.max_history).unwrap_or_else(|e| {
            if !opts.quiet {
                eprintln!("warning: {}; starting with an empty history", e);
            }
            History::new(opts.max_history)
        });

        let report = history
            .most_recent()
            .map(|previous| diff_rosters(&roster, &previous.roster, DEFAULT_IGNORED_PATHS));

        match &report {
            None => {
                if !opts.quiet {
                    println!("first run, recording initial roster");
                }
            }
            Some(report) if !report.has_changes() => {
                if !opts.quiet {
                    println!("no changes detected since last run");
                }
            }
            Some(report) => {
                if !opts.quiet {
                    println!(
                        "changes detected: {} added, {} removed, {} modified",
                        report.added.len(),
                        report.removed.len(),
                        report.modified.len()
                    );
                }
                // A broken log is a warning; the store still persists.
                match append_report(&opts.log_file, report) {
                    Ok(true) => {
                        if !opts.quiet {
                            println!(
                                "{} changes logged to {}",
                                report.total_changes(),
                                opts.log_file.display()
                            );
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        if !opts.quiet {
                            eprintln!("warning: {}", e);
                        }
                    }
                }
                report_text = Some(render_report(report));
                report_json = report.to_json();
            }
        }

        let was_duplicate = history.record(roster.clone());
        if was_duplicate && !opts.quiet {
            println!("roster content unchanged, updated last-seen timestamp");
        }

        if let Err(e) = history.persist(&opts.cache_file) {
            report_error(&e.to_string(), opts.output);
            process::exit(1);
        }
    }

    match (opts.show, opts.output) {
        (ShowInfo::Changes, OutputFormat::Json) => {
            println!("{}", serde_json::json!({ "changes": report_json }));
        }
        (ShowInfo::Changes, OutputFormat::Text) => {
            if let Some(text) = report_text {
                print!("{}", text);
            }
        }
        (ShowInfo::Employees, _) => {
            print!("{}", output::format_roster(&roster, opts.format));
        }
        (ShowInfo::None, _) => {}
    }
}

fn cmd_diff(previous_path: &Path, current_path: &Path, output: OutputFormat, quiet: bool) {
    let previous = match read_roster_file(previous_path) {
        Ok(roster) => roster,
        Err(e) => {
            report_error(&e, output);
            process::exit(1);
        }
    };
    let current = match read_roster_file(current_path) {
        Ok(roster) => roster,
        Err(e) => {
            report_error(&e, output);
            process::exit(1);
        }
    };

    let report = diff_rosters(&current, &previous, DEFAULT_IGNORED_PATHS);

    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&report.to_json()).unwrap_or_default();
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            if report.has_changes() {
                print!("{}", render_report(&report));
            } else if !quiet {
                println!("no changes");
            }
        }
    }
}

fn cmd_show(cache_file: &Path, format: ListFormat, output: OutputFormat) {
    let history = match History::load(cache_file, DEFAULT_MAX_ENTRIES) {
        Ok(history) => history,
        Err(e) => {
            report_error(&e.to_string(), output);
            process::exit(1);
        }
    };

    match history.most_recent() {
        Some(snapshot) => {
            print!("{}", output::format_roster(&snapshot.roster, format));
        }
        None => {
            report_error("history store is empty; run the monitor first", output);
            process::exit(1);
        }
    }
}

fn read_roster_file(path: &Path) -> Result<Roster, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading '{}': {}", path.display(), e))?;
    let doc: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("error parsing JSON in '{}': {}", path.display(), e))?;
    Roster::from_json(&doc).map_err(|e| format!("invalid roster in '{}': {}", path.display(), e))
}

// Failures stay on stderr even under --quiet; quiet suppresses status
// chatter, never errors.
pub(crate) fn report_error(msg: &str, output: OutputFormat) {
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
