//! dohspeed - DNS-over-HTTPS latency benchmark
//!
//! Binary entry point for the dohspeed CLI application.

#![warn(clippy::all, warnings)]
#![warn(clippy::pedantic, clippy::nursery)]

use anyhow::{bail, Context};
use dohspeed::cli::{Commands, OutputFormat, RunArgs};
use dohspeed::config::{ConfigLoader, HostnameList, ServerList};
use dohspeed::dns::ranking::sort_by_latency;
use dohspeed::dns::{rank, BatchScheduler, Ranking, RunObserver, ServerStats};
use dohspeed::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Set up logging based on verbosity level.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging
/// * `quiet` - Enable error-level only logging
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).without_time())
        .init();
}

/// Load the server list from command-line arguments, a file, or the defaults.
///
/// # Arguments
///
/// * `file` - Optional path to a server list JSON file
/// * `server_args` - Optional command-line servers (URL#Name)
fn load_servers(file: Option<PathBuf>, server_args: Vec<String>) -> anyhow::Result<ServerList> {
    if !server_args.is_empty() {
        return Ok(ConfigLoader::servers_from_args(server_args)?);
    }

    if let Some(path) = file {
        return ConfigLoader::load_servers_from_file(&path)
            .with_context(|| format!("failed to load server list {}", path.display()));
    }

    Ok(ConfigLoader::load_servers()?)
}

/// Load the hostname list from command-line arguments, a file, or the defaults.
fn load_hostnames(file: Option<PathBuf>, host_args: Vec<String>) -> anyhow::Result<HostnameList> {
    let list = if !host_args.is_empty() {
        HostnameList::from_hostnames(host_args)?
    } else if let Some(path) = file {
        ConfigLoader::load_hostnames_from_file(&path)
            .with_context(|| format!("failed to load hostname list {}", path.display()))?
    } else {
        ConfigLoader::load_hostnames()?
    };

    if list.is_empty() {
        bail!("no hostnames to test");
    }
    Ok(list)
}

/// Progress line on stderr, updated as servers finish.
struct ConsoleProgress {
    total: usize,
    done: AtomicUsize,
    enabled: bool,
}

impl ConsoleProgress {
    fn new(total: usize, enabled: bool) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
            enabled,
        }
    }

    fn finish(&self) {
        if self.enabled {
            eprintln!();
        }
    }
}

impl RunObserver for ConsoleProgress {
    fn on_progress(&self, current: usize, total: usize, server_name: &str) {
        tracing::trace!("{}: {}/{}", server_name, current, total);
    }

    fn on_server_complete(&self, stats: &ServerStats) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.enabled {
            return;
        }
        if let Err(e) = write_progress(&mut std::io::stderr().lock(), done, self.total, &stats.name) {
            tracing::debug!("progress line not written: {}", e);
        }
    }
}

/// Overwrite the progress line on `out`.
fn write_progress(out: &mut impl Write, done: usize, total: usize, name: &str) -> std::io::Result<()> {
    write!(out, "\rTesting [{done:>3}/{total}] {name:<28}")?;
    out.flush()
}

/// Run the latency test and output results.
///
/// Ctrl-C cancels the run; the servers finished so far are still printed.
async fn run_speed_test(args: RunArgs, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let settings = args.settings();
    let servers = load_servers(args.servers.clone(), args.server_args.clone())?;
    let hostnames = load_hostnames(args.hosts.clone(), args.host_args.clone())?;

    if servers.is_empty() {
        bail!("no servers to test");
    }
    for server in servers.untestable() {
        tracing::warn!("{} has no usable URL and will be marked unavailable", server.name);
    }

    let table = format == OutputFormat::Table;
    if table && !quiet {
        println!(
            "Testing {} servers with {} hostnames...\n",
            servers.len(),
            hostnames.len()
        );
    }

    let scheduler = BatchScheduler::from_settings(&settings)?;
    let progress = ConsoleProgress::new(servers.len(), table && !quiet);

    let outcome = {
        let run = scheduler.run_all(&servers.servers, hostnames.as_slice(), &progress);
        tokio::pin!(run);
        loop {
            tokio::select! {
                res = &mut run => break res?,
                _ = tokio::signal::ctrl_c() => {
                    scheduler.cancel();
                }
            }
        }
    };
    progress.finish();

    let cancelled = outcome.is_cancelled();
    let mut report = outcome.into_report();
    if args.sort_by_latency {
        sort_by_latency(&mut report.results);
    }

    match format {
        OutputFormat::Table => print_results_table(&report.results),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{json}");
            return Ok(());
        }
        OutputFormat::Csv => print_results_delimited(&report.results, ','),
        OutputFormat::Tsv => print_results_delimited(&report.results, '\t'),
    }

    if !table {
        return Ok(());
    }

    if cancelled {
        println!(
            "\nTest was cancelled ({} of {} servers finished)",
            report.results.len(),
            servers.len()
        );
    }

    println!("\n=== Summary ===");
    println!("Servers tested: {}", report.results.len());
    println!("With timing: {}", report.success_count());
    println!("Errors: {}", report.error_count());
    println!("Elapsed: {:.1} s", report.elapsed_ms / 1000.0);
    for err in &report.errors {
        println!("  {}: {}", err.server, err.message);
    }

    print_ranking(&rank(&report.results, settings.top_n), hostnames.len());

    Ok(())
}

/// Print the recommendation block.
fn print_ranking(ranking: &Ranking<'_>, hostname_count: usize) {
    match ranking {
        Ranking::Ranked(top) => {
            println!("\n=== Fastest DNS ===");
            for (idx, s) in top.iter().enumerate() {
                let ips = if s.ips.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", s.ips.join(", "))
                };
                println!(
                    "{}. {} {:.1} ms{}",
                    idx + 1,
                    s.name,
                    s.avg.unwrap_or_default(),
                    ips
                );
            }
        }
        Ranking::NoReliable { best_by_success } => {
            println!("\nNo reliable DNS found!");
            if let Some(s) = best_by_success {
                println!(
                    "Best by successful queries: {} ({}/{})",
                    s.name,
                    s.success_count(),
                    hostname_count
                );
            }
        }
    }
}

fn fmt_ms(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

/// Print results in table format.
fn print_results_table(results: &[ServerStats]) {
    println!(
        "{:<4} {:<24} {:>9} {:>9} {:>9} {:>9} {:>8}",
        "#", "Name", "Avg", "Min", "Median", "Max", "Success"
    );
    println!("{}", "-".repeat(78));

    for (idx, r) in results.iter().enumerate() {
        let status = if r.error.is_some() {
            "[error] "
        } else if r.url.is_none() {
            "[n/a] "
        } else {
            ""
        };

        println!(
            "{:<4} {:<24} {:>9} {:>9} {:>9} {:>9} {:>7.0}%",
            idx + 1,
            format!("{}{}", status, r.name),
            fmt_ms(r.avg),
            fmt_ms(r.min),
            fmt_ms(r.median),
            fmt_ms(r.max),
            r.success_rate * 100.0
        );
    }
}

/// Print results in CSV or TSV format.
fn print_results_delimited(results: &[ServerStats], sep: char) {
    let header = [
        "#Idx",
        "Name",
        "URL",
        "Avg(ms)",
        "Min(ms)",
        "Median(ms)",
        "Max(ms)",
        "SuccessRate",
    ];
    println!("{}", header.join(&sep.to_string()));

    for (idx, r) in results.iter().enumerate() {
        let fields = [
            (idx + 1).to_string(),
            r.name.replace(sep, " "),
            r.url.clone().unwrap_or_default(),
            fmt_ms(r.avg),
            fmt_ms(r.min),
            fmt_ms(r.median),
            fmt_ms(r.max),
            format!("{:.2}", r.success_rate),
        ];
        println!("{}", fields.join(&sep.to_string()));
    }
}

/// List servers.
///
/// # Arguments
///
/// * `file` - Optional server list file
/// * `format` - Output format
fn run_list_servers(file: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<()> {
    let list = load_servers(file, Vec::new())?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!("DoH servers ({} total):\n", list.len());
    println!("{:<4} {:<24} {:<6} {:<5} {}", "#", "Name", "Method", "CORS", "URL");
    println!("{}", "-".repeat(78));

    for (idx, s) in list.servers.iter().enumerate() {
        println!(
            "{:<4} {:<24} {:<6} {:<5} {}",
            idx + 1,
            s.name,
            s.method,
            if s.allow_cors { "yes" } else { "no" },
            s.url.as_deref().unwrap_or("(none)")
        );
    }

    Ok(())
}

/// List hostnames.
fn run_list_hosts(file: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<()> {
    let list = load_hostnames(file, Vec::new())?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!("Hostnames ({} total):\n", list.len());
    for (idx, host) in list.as_slice().iter().enumerate() {
        println!("{:<4} {}", idx + 1, host);
    }
    Ok(())
}

/// Main entry point for the dohspeed CLI application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    color_eyre::install().map_err(Error::from)?;

    let (cli, verbose) = dohspeed::cli::parse_verbose();
    setup_logging(verbose, cli.quiet);

    tracing::debug!("dohspeed starting...");

    match cli.command {
        Some(Commands::Run(args)) => {
            run_speed_test(args, cli.format, cli.quiet).await?;
        }

        Some(Commands::List { servers }) => {
            run_list_servers(servers, cli.format)?;
        }

        Some(Commands::Hosts { hosts }) => {
            run_list_hosts(hosts, cli.format)?;
        }

        Some(Commands::Export { output, servers }) => {
            let list = load_servers(servers, Vec::new())?;
            ConfigLoader::save_servers(&output, &list)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Exported {} servers to: {}", list.len(), output.display());
        }

        None => {
            run_speed_test(RunArgs::default(), cli.format, cli.quiet).await?;
        }
    }

    Ok(())
}
