//! wcdump - WeChat conversation extractor CLI
//!
//! Main entry point for the wcdump command-line tool.

use anyhow::Result;
use chrono::Utc;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, warn};

use wcdump::config::Config;
use wcdump::export::{self, ExportStats, STDOUT_PATH};
use wcdump::logging::{OperationGuard, init_cli_logging};
use wcdump::storage::open_read_only;
use wcdump::*;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(wc_err) = err.downcast_ref::<WcError>() {
                eprintln!("{}", format_wc_error(wc_err));
                ExitCode::from(wc_err.exit_code())
            } else {
                eprintln!("{}", format_error("Error", &format!("{err:#}"), &[]));
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut cmd = Cli::command();
        generate(args.shell, &mut cmd, "wcdump", &mut io::stdout());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    let colors = config.output.colors && !cli.no_color;
    if !colors {
        colored::control::set_override(false);
    }
    init_cli_logging(cli.quiet, cli.verbose, colors, cli.log_format);

    match &cli.command {
        Commands::Dump(args) => cmd_dump(cli, &config, args),
        Commands::List(args) => cmd_list(cli, args),
        Commands::Export(args) => cmd_export(cli, &config, args),
        Commands::Completions(_) => Ok(()),
    }
}

/// Validate and resolve the window flags. Runs before the backup is touched.
fn resolve_window(cli: &Cli, config: &Config, args: &WindowArgs) -> Result<Option<TimeWindow>> {
    let spec = args.to_spec();
    spec.validate()?;
    if spec.is_empty() {
        return Ok(None);
    }

    let zone_name = cli
        .time_zone
        .as_deref()
        .unwrap_or(&config.window.timezone);
    let tz = parse_time_zone(zone_name)?;
    let window = spec.resolve(tz, Utc::now())?;
    debug!(?window, zone = zone_name, "Time window");
    Ok(window)
}

fn scan_options(config: &Config, args: &DecodeArgs) -> ScanOptions {
    let mut options = config.scan_options();
    if let Some(flag) = args.outgoing_flag {
        options.extract.outgoing_flag = flag;
    }
    if let Some(mode) = args.binary_bodies {
        options.extract.binary_bodies = mode;
    }
    if args.sequential {
        options.parallel = false;
    }
    options
}

fn spinner(cli: &Cli, message: String) -> ProgressBar {
    if cli.quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn read_conversations(
    cli: &Cli,
    root: &Path,
    window: Option<TimeWindow>,
    options: &ScanOptions,
) -> Result<(Vec<Account>, Vec<Conversation>)> {
    let accounts = scan_accounts(root)?;
    if accounts.is_empty() {
        warn!(root = %root.display(), "No accounts found");
    }

    let pb = spinner(
        cli,
        format!("Reading {} account(s)...", format_count(accounts.len())),
    );
    let conversations = assemble_all(&accounts, window, options);
    pb.finish_and_clear();

    Ok((accounts, conversations))
}

fn cmd_dump(cli: &Cli, config: &Config, args: &DumpArgs) -> Result<()> {
    let window = resolve_window(cli, config, &args.window)?;
    let options = scan_options(config, &args.decode);

    let guard = OperationGuard::new("dump");
    let (accounts, conversations) = read_conversations(cli, &args.root, window, &options)?;

    let output = args.output.clone().unwrap_or_else(|| config.output_path());
    let pretty = config.output.pretty && !args.compact;
    export::write_json(&output, &conversations, pretty)?;
    guard.complete();

    if !cli.quiet {
        let messages: usize = conversations.iter().map(|c| c.message_count).sum();
        let target = if output.as_os_str() == STDOUT_PATH {
            "stdout".to_string()
        } else {
            output.display().to_string()
        };
        // Summary goes to stderr so it never mixes with JSON on stdout.
        eprintln!(
            "{} {} conversations, {} messages from {} account(s) written to {}",
            "✓".green(),
            format_count(conversations.len()).cyan(),
            format_count(messages).cyan(),
            format_count(accounts.len()),
            target.bold()
        );
    }
    Ok(())
}

fn cmd_list(cli: &Cli, args: &ListArgs) -> Result<()> {
    let accounts = scan_accounts(&args.root)?;

    if accounts.is_empty() {
        println!("{}", "No accounts found.".yellow());
        return Ok(());
    }

    for account in &accounts {
        println!();
        println!("{} {}", "Account:".bold().cyan(), account.uid.bold());
        println!("  {}", account.path.display().to_string().dimmed());

        let shards = match shard_chain(account) {
            Ok(shards) => shards,
            Err(err) => {
                warn!(uid = %account.uid, error = %err, "Cannot list message stores");
                Vec::new()
            }
        };
        println!("  {} {}", "Message stores:".bold(), shards.len());
        for shard in &shards {
            let chats = open_read_only(shard.path())
                .and_then(|conn| ChatTableRegistry::build(&conn))
                .map_or_else(|_| "unreadable".red().to_string(), |r| format!("{} chats", r.len()));
            println!("    {} {:<14} {}", "•".dimmed(), shard.label(), chats);
        }

        match load_roster(&account.contact_db()) {
            Ok(roster) => {
                println!("  {} {}", "Contacts:".bold(), format_count(roster.len()));
                if cli.quiet {
                    continue;
                }
                for entry in roster.entries() {
                    println!(
                        "    {} {:<35} | {:<16} {}",
                        "•".dimmed(),
                        entry.usrname,
                        ChatKind::classify(&entry.usrname).to_string().dimmed(),
                        entry.nickname
                    );
                }
            }
            Err(err) => {
                println!("  {} {}", "Contacts:".bold(), "unreadable".red());
                warn!(uid = %account.uid, error = %err, "Cannot read roster");
            }
        }
    }

    Ok(())
}

fn cmd_export(cli: &Cli, config: &Config, args: &ExportArgs) -> Result<()> {
    let window = resolve_window(cli, config, &args.window)?;
    let options = scan_options(config, &args.decode);

    let guard = OperationGuard::new("export");
    let (accounts, conversations) = read_conversations(cli, &args.root, window, &options)?;

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(accounts.len() as u64)
    };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }

    let mut totals = ExportStats::default();
    for account in &accounts {
        pb.set_message(account.uid.clone());
        let stats = export::export_account(account, &conversations, &args.out, !args.no_media)?;
        pb.println(format!(
            "  {} {} {:>6} msgs, {:>5} media in {} conversations",
            "✓".green(),
            format_short_id(&account.uid),
            format_count(stats.messages),
            format_count(stats.media_files),
            format_count(stats.conversations)
        ));
        totals.conversations += stats.conversations;
        totals.messages += stats.messages;
        totals.media_files += stats.media_files;
        pb.inc(1);
    }
    pb.finish_and_clear();
    guard.complete();

    if !cli.quiet {
        println!(
            "{} Exported {} conversations ({} messages, {} media files) to {}",
            "✓".green(),
            format_count(totals.conversations).cyan(),
            format_count(totals.messages).cyan(),
            format_count(totals.media_files).cyan(),
            args.out.display().to_string().bold()
        );
    }
    Ok(())
}
