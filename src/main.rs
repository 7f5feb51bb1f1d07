//! Binary entrypoint for the album viewer.
//!
//! Plays an album on a headless surface; slot changes show up in the logs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use album_viewer::album::AlbumSource;
use album_viewer::config::Configuration;
use album_viewer::hooks::ViewerHooks;
use album_viewer::layout::ViewerFactory;
use album_viewer::scan::{ScanOptions, scan_album};
use album_viewer::surface::HeadlessSurface;
use album_viewer::tasks::loader::DecodeFetcher;
use album_viewer::tasks::viewer::{self, ViewerHandle};

#[derive(Debug, Parser)]
#[command(name = "album-viewer", version, about = "Cross-fading album slideshow")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// YAML album description (overrides album-path)
    #[arg(long, value_name = "FILE", conflicts_with = "dir")]
    album: Option<PathBuf>,

    /// Directory scanned into an album (overrides photo-library-path)
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Show images in random order
    #[arg(long)]
    random: bool,

    /// Index of the first image
    #[arg(long, value_name = "INDEX", allow_hyphen_values = true)]
    start_at: Option<i64>,

    /// Override the slideshow delay, e.g. "3s" or "1500ms"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    delay: Option<Duration>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = [Level::INFO, Level::DEBUG, Level::TRACE][usize::from(verbosity.min(2))];
    let directive = format!("album_viewer={level}")
        .parse::<Directive>()
        .context("building log filter")?;
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();
    Ok(())
}

/// Reports viewer progress in the log.
struct LoggingHooks;

impl ViewerHooks for LoggingHooks {
    fn on_switch(&mut self, index: usize) {
        info!(index, "showing image");
    }

    fn loading_started(&mut self) {
        debug!("image is taking a while to load");
    }

    fn load_failed(&mut self, index: usize) {
        warn!(index, "skipping image that failed to load");
    }
}

fn album_source(cfg: &Configuration) -> Result<AlbumSource> {
    if let Some(path) = &cfg.album_path {
        return AlbumSource::from_yaml_file(path)
            .with_context(|| format!("reading album {}", path.display()));
    }
    if let Some(dir) = &cfg.photo_library_path {
        return scan_album(dir, &ScanOptions::default());
    }
    bail!("no album: pass --album or --dir, or set album-path / photo-library-path")
}

fn forward_signals(handle: ViewerHandle, cancel: CancellationToken) {
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    tokio::spawn(async move {
        let (mut usr1, mut usr2) = match (
            signal(SignalKind::user_defined1()),
            signal(SignalKind::user_defined2()),
        ) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(err), _) | (_, Err(err)) => {
                warn!("failed to register signal handlers: {err}");
                return;
            }
        };
        loop {
            let res = tokio::select! {
                _ = cancel.cancelled() => break,
                Some(()) = usr1.recv() => {
                    info!("SIGUSR1 received; toggling slideshow");
                    handle.toggle().await
                }
                Some(()) = usr2.recv() => {
                    info!("SIGUSR2 received; next image");
                    handle.next().await.map(drop)
                }
                else => break,
            };
            if let Err(err) = res {
                warn!("failed to forward signal: {err}");
                break;
            }
        }
    });
    #[cfg(not(unix))]
    drop(handle);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(album) = cli.album {
        cfg.album_path = Some(album);
        cfg.photo_library_path = None;
    }
    if let Some(dir) = cli.dir {
        cfg.album_path = None;
        cfg.photo_library_path = Some(dir);
    }
    if let Some(delay) = cli.delay {
        cfg.viewer.slideshow_delay = delay;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    debug!("configuration: {cfg:#?}");

    let source = album_source(&cfg)?;

    let surface = HeadlessSurface::with_elements([cfg.container.clone()]);
    let mut factory = ViewerFactory::new(cfg.id_prefix.clone());
    let controller = factory
        .build(
            cfg.viewer.clone(),
            &cfg.layout_request(),
            surface,
            Box::new(LoggingHooks),
        )
        .context("building viewer")?;

    let cancel = CancellationToken::new();
    let (handle, task) = viewer::spawn(controller, Arc::new(DecodeFetcher), cancel.clone());

    handle.load_album(source).await.context("loading album")?;
    handle.start(cli.random, cli.start_at).await?;
    info!(
        delay = %humantime::format_duration(cfg.viewer.slideshow_delay),
        "slideshow running; ctrl-c to quit"
    );

    forward_signals(handle.clone(), cancel);
    task.await.context("viewer task panicked")??;
    Ok(())
}
