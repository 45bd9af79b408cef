//! Freshwatch - terminal view of one content feed
//!
//! Mounts a freshness synchronizer against a running content service and
//! prints every change to the view. Type `r` to force a refresh, `q` to quit.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_freshness::sync::{
    FreshnessSynchronizer, HttpFeedSource, RefreshOutcome, SyncConfig, ViewState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_freshness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SyncConfig::from_env();
    info!(
        "Watching {} feed at {} (poll every {}s)",
        config.scope,
        config.base_url,
        config.poll_interval.as_secs()
    );

    let source = Arc::new(HttpFeedSource::from_config(&config));
    let synchronizer = Arc::new(FreshnessSynchronizer::mount(source, &config));
    let printer = tokio::spawn(print_changes(synchronizer.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(cmd) if cmd.trim() == "r" => {
                    let synchronizer = synchronizer.clone();
                    tokio::spawn(async move {
                        match synchronizer.force_refresh().await {
                            Ok(RefreshOutcome::AlreadyRunning) => info!("Refresh already running"),
                            Ok(_) => {}
                            Err(e) => warn!("Refresh failed: {}", e),
                        }
                    });
                }
                Some(cmd) if cmd.trim() == "q" => break,
                Some(_) => println!("commands: r = refresh, q = quit"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    synchronizer.unmount();
    printer.abort();
    Ok(())
}

async fn print_changes(mut updates: watch::Receiver<ViewState>) {
    while updates.changed().await.is_ok() {
        let view = updates.borrow_and_update().clone();
        println!("{}", render(&view));
    }
}

fn render(view: &ViewState) -> String {
    let mut out = String::new();

    if let Some(message) = &view.maintenance {
        out.push_str(&format!("[maintenance] {}\n", message));
    }
    if let Some(error) = &view.error {
        out.push_str(&format!("[error] {} (press r to retry)\n", error));
    }
    if view.refreshing {
        out.push_str("[refreshing]\n");
    }

    out.push_str(&format!(
        "epoch {} | generation {} | {} items",
        view.epoch.map_or_else(|| "-".to_string(), |e| e.to_string()),
        view.applied_generation,
        view.items.len()
    ));
    for post in &view.items {
        out.push_str(&format!("\n  {:>4}  {}  [{}]", post.id, post.title, post.category));
    }
    out
}
