//! sessionlens - inspect and export AI coding assistant sessions
//!
//! Discovers Claude Code and Copilot CLI session logs, normalizes them into
//! one model, and offers listing, inspection, export, and live watching.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/sessionlens/config.toml
//! - Logs: $XDG_STATE_HOME/sessionlens/sessionlens.log

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;

use sessionlens_core::export::{export_summary_to_json, export_to_csv, export_to_json};
use sessionlens_core::watch::{apply, classify_path, WatchEventKind};
use sessionlens_core::{Config, SessionCache, SessionDirectory, SessionSource};

#[derive(Parser)]
#[command(name = "sessionlens")]
#[command(about = "Inspect and export AI coding assistant sessions")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List discovered sessions, newest activity first
    List {
        /// Limit to one source (claude or copilot)
        #[arg(short, long)]
        source: Option<SessionSource>,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one session's messages and statistics
    Show {
        /// Session source (claude or copilot)
        source: SessionSource,

        /// Session id (partial match supported)
        session_id: String,

        /// Skip this many messages
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Show at most this many messages
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Output the full session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export one session to CSV or JSON
    Export {
        /// Session source (claude or copilot)
        source: SessionSource,

        /// Session id (partial match supported)
        session_id: String,

        /// Output format: csv, json, or summary
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Watch session directories and print updates as they happen
    Watch,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard = sessionlens_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!("sessionlens starting");

    let cache = SessionCache::new(SessionDirectory::new(&config));

    match args.command {
        Command::List { source, json } => run_list(&cache, source, json),
        Command::Show {
            source,
            session_id,
            offset,
            limit,
            json,
        } => run_show(&cache, source, &session_id, offset, limit, json),
        Command::Export {
            source,
            session_id,
            format,
            output,
        } => run_export(&cache, source, &session_id, &format, output),
        Command::Watch => run_watch(&config, &cache),
    }
}

/// Resolve a possibly-partial session id against discovered sessions.
fn resolve_session_id(
    cache: &SessionCache,
    source: SessionSource,
    session_id: &str,
) -> Result<String> {
    let files = cache.directory().find_session_files(source);
    if files.contains_key(session_id) {
        return Ok(session_id.to_string());
    }

    let matches: Vec<&String> = files.keys().filter(|id| id.contains(session_id)).collect();
    match matches.as_slice() {
        [] => anyhow::bail!("No {} session found matching '{}'", source, session_id),
        [only] => Ok((*only).clone()),
        many => anyhow::bail!(
            "Session id '{}' is ambiguous ({} matches); be more specific",
            session_id,
            many.len()
        ),
    }
}

fn run_list(cache: &SessionCache, source: Option<SessionSource>, json: bool) -> Result<()> {
    let sessions = cache.list_sessions(source);

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions found.");
        println!("Configure base paths in {}", Config::config_path().display());
        return Ok(());
    }

    println!(
        "{:<10} {:<38} {:<24} {:>8} {:>10}  {}",
        "SOURCE", "SESSION", "PROJECT", "MSGS", "TOKENS", "LAST ACTIVITY"
    );
    for session in &sessions {
        println!(
            "{:<10} {:<38} {:<24} {:>8} {:>10}  {}",
            session.source,
            truncate(&session.id, 38),
            truncate(&session.project, 24),
            session.message_count,
            session
                .total_tokens
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            session.last_activity.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    println!("\n{} session(s)", sessions.len());

    Ok(())
}

fn run_show(
    cache: &SessionCache,
    source: SessionSource,
    session_id: &str,
    offset: usize,
    limit: usize,
    json: bool,
) -> Result<()> {
    let session_id = resolve_session_id(cache, source, session_id)?;
    let detail = cache
        .try_get(source, &session_id)
        .with_context(|| format!("failed to load session {}", session_id))?;

    if json {
        println!("{}", export_to_json(&detail)?);
        return Ok(());
    }

    println!("Session:  {} ({})", detail.id, detail.source.display_name());
    println!("Project:  {} ({})", detail.project, detail.project_path);
    if let Some(model) = &detail.model {
        println!("Model:    {}", model);
    }
    println!(
        "Activity: {} .. {}",
        detail.start_time.format("%Y-%m-%d %H:%M:%S"),
        detail.last_activity.format("%Y-%m-%d %H:%M:%S"),
    );
    println!(
        "Messages: {} ({} user, {} assistant)",
        detail.stats.message_count, detail.stats.user_messages, detail.stats.assistant_messages
    );
    if let Some(tokens) = &detail.stats.tokens {
        println!(
            "Tokens:   {} in / {} out ({} cache read, {} cache creation)",
            tokens.total_input,
            tokens.total_output,
            tokens.total_cache_read,
            tokens.total_cache_creation
        );
    }
    if !detail.tool_usage.is_empty() {
        println!("Tools:");
        for tool in &detail.tool_usage {
            println!(
                "  {:<24} {:>5}x  {:>5.1}% success",
                tool.name,
                tool.count,
                tool.success_rate * 100.0
            );
        }
    }

    let page = cache.session_messages(source, &session_id, offset, limit)?;
    println!(
        "\nMessages {}..{} of {}:",
        page.offset,
        page.offset + page.messages.len(),
        page.total
    );
    for message in &page.messages {
        let preview: String = message.content.chars().take(100).collect();
        println!(
            "[{}] {:<9} {}",
            message.timestamp.format("%H:%M:%S"),
            message.role.as_str(),
            preview.replace('\n', " ")
        );
    }

    Ok(())
}

fn run_export(
    cache: &SessionCache,
    source: SessionSource,
    session_id: &str,
    format: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let session_id = resolve_session_id(cache, source, session_id)?;
    let detail = cache
        .try_get(source, &session_id)
        .with_context(|| format!("failed to load session {}", session_id))?;

    let rendered = match format {
        "csv" => export_to_csv(&detail),
        "json" => export_to_json(&detail)?,
        "summary" => export_summary_to_json(&detail.summary())?,
        other => anyhow::bail!("Unknown export format '{}' (csv, json, summary)", other),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported {} to {}", session_id, path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn run_watch(config: &Config, cache: &SessionCache) -> Result<()> {
    if !config.watch.enabled {
        anyhow::bail!("Watching is disabled in the configuration");
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(config.watch.debounce_ms), tx)
        .context("failed to create file watcher")?;

    let mut watched = 0usize;
    for path in cache.watched_paths() {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Skipping missing watch path");
            continue;
        }
        debouncer
            .watcher()
            .watch(&path, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", path.display()))?;
        println!("Watching {}", path.display());
        watched += 1;
    }

    if watched == 0 {
        anyhow::bail!("No session directories exist to watch");
    }

    println!(
        "Watch active (debounce {}ms). Press Ctrl+C to stop.",
        config.watch.debounce_ms
    );

    while running.load(Ordering::SeqCst) {
        let events = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Ok(events)) => events,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "File watcher error");
                continue;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        for event in events {
            let kind = if event.path.exists() {
                WatchEventKind::Change
            } else {
                WatchEventKind::Unlink
            };

            let Some(watch_event) = classify_path(config, kind, &event.path) else {
                continue;
            };

            let timestamp = chrono::Local::now().format("%H:%M:%S");
            match apply(&watch_event, cache) {
                Some(summary) => println!(
                    "[{}] {} {} updated: {} messages",
                    timestamp, summary.source, summary.id, summary.message_count
                ),
                None => println!(
                    "[{}] {} {} removed",
                    timestamp, watch_event.source, watch_event.session_id
                ),
            }
        }
    }

    tracing::info!("sessionlens watch shutting down");
    Ok(())
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let kept: String = value.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
