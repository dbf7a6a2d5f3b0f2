mod app;
mod cli;
mod error;
mod event;
mod filter;
mod model;
mod output;
mod parser;
mod platform;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use log::{debug, info, warn};

use app::action::stop_process;
use app::{Orchestrator, Session};
use cli::CliArgs;
use event::AppEvent;
use filter::SocketFilter;
use output::{print_limited_notice, OutputFormatter};
use parser::Dialect;
use platform::{create_enricher, create_runner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = CliArgs::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> error::Result<()> {
    if let Some(pid) = args.stop {
        let runner = create_runner(args.runner_config());
        stop_process(&*runner, pid)?;
        println!("Sent SIGTERM to process {}", pid);
        return Ok(());
    }

    let filter = SocketFilter::from_cli(&args);
    let formatter = OutputFormatter::from_cli(&args);

    if let (Some(path), Some(dialect)) = (&args.replay, args.dialect) {
        return replay(path, dialect.into(), &filter, &formatter);
    }

    let orchestrator = Orchestrator::new(
        create_runner(args.runner_config()),
        create_enricher(),
        args.acquisition_config(),
    );
    let mut session = Session::new(orchestrator);

    match args.repeat {
        None => {
            session.refresh().await?;
            print_session(&session, &filter, &formatter);
            Ok(())
        }
        Some(secs) => run_repeat(&mut session, Duration::from_secs(secs.max(1)), &filter, &formatter).await,
    }
}

/// Parse captured command output from disk and print it as if freshly acquired.
fn replay(
    path: &Path,
    dialect: Dialect,
    filter: &SocketFilter,
    formatter: &OutputFormatter,
) -> error::Result<()> {
    let text = std::fs::read_to_string(path)?;
    let records = parser::parse(dialect, &text);
    info!("replayed {} records from {}", records.len(), path.display());

    if dialect != Dialect::NetstatPrivileged {
        print_limited_notice();
    }
    formatter.print(&filter.apply(&records));
    Ok(())
}

/// Refresh on every tick until interrupted. A failed refresh is reported and
/// the last good table stays on screen.
async fn run_repeat(
    session: &mut Session,
    period: Duration,
    filter: &SocketFilter,
    formatter: &OutputFormatter,
) -> error::Result<()> {
    let mut ticker = tokio::time::interval(period);
    let mut printed_once = false;

    loop {
        let event = tokio::select! {
            _ = ticker.tick() => AppEvent::Tick,
            result = session.next_completion() => AppEvent::Completed(result),
        };

        match event {
            AppEvent::Tick => {
                if session.is_refreshing() {
                    debug!("tick while a refresh is still running");
                } else {
                    session.request_refresh();
                }
            }
            AppEvent::Completed(Ok(summary)) => {
                info!(
                    "refresh complete: {} records, state {}",
                    summary.records, summary.state
                );
                if printed_once {
                    println!("=======");
                }
                print_session(session, filter, formatter);
                printed_once = true;
            }
            AppEvent::Completed(Err(e)) => {
                if let Some(state) = session.state() {
                    warn!("refresh failed, state now {}", state);
                }
                eprintln!("Error: {}", e);
            }
        }
    }
}

fn print_session(session: &Session, filter: &SocketFilter, formatter: &OutputFormatter) {
    if !session.is_privileged() {
        print_limited_notice();
    }
    formatter.print(&filter.apply(session.table()));
}
