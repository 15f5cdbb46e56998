mod app;
mod demo;
mod event;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::time::Duration;
use synclist::config::Config;
use synclist::{logging, NoopStorage, SqliteStorage};

#[derive(Parser, Debug)]
#[command(name = "synclist")]
#[command(about = "A cached, paginated feed in the terminal, driven by synclist")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/synclist/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Keep the list in memory only
  #[arg(long)]
  no_cache: bool,

  /// Log filter, e.g. "debug" or "synclist=trace" (RUST_LOG wins)
  #[arg(long)]
  log_level: Option<String>,

  /// Load further pages when scrolling near the end
  #[arg(long)]
  infinite_scroll: bool,

  /// Show row actions on l
  #[arg(long)]
  swipe_actions: bool,

  /// Posts in the feed at startup
  #[arg(long, default_value_t = 120)]
  total: u32,

  /// Posts per page
  #[arg(long, default_value_t = 20)]
  page_size: u32,

  /// Simulated latency of every request
  #[arg(long, default_value_t = 600)]
  latency_ms: u64,

  /// Fail every Nth request (0 never fails)
  #[arg(long, default_value_t = 0)]
  fail_every: u32,

  /// Background sync interval in seconds (0 only syncs at startup)
  #[arg(long, default_value_t = 0)]
  sync_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, command line wins
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(level) = args.log_level {
    config.log.level = level;
  }
  config.list.infinite_scroll |= args.infinite_scroll;
  config.list.swipe_actions |= args.swipe_actions;

  let _guard = logging::init(&config.log)?;
  tracing::info!(?config, "Starting synclist");

  let source = demo::DemoSource::new(demo::FeedOptions {
    total: args.total,
    page_size: args.page_size,
    latency: Duration::from_millis(args.latency_ms),
    fail_every: args.fail_every,
  });
  let interval = (args.sync_interval > 0).then(|| Duration::from_secs(args.sync_interval));

  if config.cache.persist && !args.no_cache {
    let storage = match &config.cache.path {
      Some(path) => SqliteStorage::open_at(path)?,
      None => SqliteStorage::open()?,
    };
    let mut app = app::App::new(config.list, source, storage, interval)?;
    app.run().await
  } else {
    let mut app = app::App::new(config.list, source, NoopStorage, interval)?;
    app.run().await
  }
}
