use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use futures::future::BoxFuture;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use album_viewer::Error;
use album_viewer::album::AlbumSource;
use album_viewer::config::ViewerSettings;
use album_viewer::events::{Phase, Switch};
use album_viewer::hooks::ViewerHooks;
use album_viewer::layout::{LayoutRequest, ViewerFactory};
use album_viewer::surface::HeadlessSurface;
use album_viewer::tasks::loader::ImageFetcher;
use album_viewer::tasks::viewer::{self, ViewerHandle};

#[derive(Debug, PartialEq, Eq)]
enum Seen {
    Switch(usize),
    Failed(usize),
}

struct Forward(UnboundedSender<Seen>);

impl ViewerHooks for Forward {
    fn on_switch(&mut self, index: usize) {
        let _ = self.0.send(Seen::Switch(index));
    }

    fn load_failed(&mut self, index: usize) {
        let _ = self.0.send(Seen::Failed(index));
    }
}

/// Resolves immediately; URLs containing "broken" fail.
struct Immediate;

impl ImageFetcher for Immediate {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<()>> {
        let broken = url.contains("broken");
        Box::pin(async move {
            if broken {
                bail!("cannot decode");
            }
            Ok(())
        })
    }
}

/// Never finishes within any reasonable timeout.
struct Stalled;

impl ImageFetcher for Stalled {
    fn fetch(&self, _url: &str) -> BoxFuture<'static, Result<()>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
    }
}

struct Running {
    handle: ViewerHandle,
    task: JoinHandle<Result<()>>,
    cancel: CancellationToken,
    seen: UnboundedReceiver<Seen>,
}

fn launch(settings: ViewerSettings, fetcher: Arc<dyn ImageFetcher>) -> Running {
    let (tx, seen) = mpsc::unbounded_channel();
    let controller = ViewerFactory::default()
        .build(
            settings,
            &LayoutRequest::Container("stage".into()),
            HeadlessSurface::with_elements(["stage"]),
            Box::new(Forward(tx)),
        )
        .expect("layout resolves");
    let cancel = CancellationToken::new();
    let (handle, task) = viewer::spawn(controller, fetcher, cancel.clone());
    Running {
        handle,
        task,
        cancel,
        seen,
    }
}

fn quick() -> ViewerSettings {
    ViewerSettings {
        fade_step: 20,
        slideshow_delay: Duration::from_secs(2),
        random_seed: Some(11),
        ..ViewerSettings::default()
    }
}

fn abc() -> AlbumSource {
    AlbumSource::new("abc", ["a.jpg", "b.jpg", "c.jpg"])
}

async fn next_seen(rx: &mut UnboundedReceiver<Seen>) -> Seen {
    timeout(Duration::from_secs(60), rx.recv())
        .await
        .expect("viewer went quiet")
        .expect("hooks dropped")
}

#[tokio::test(start_paused = true)]
async fn slideshow_cycles_and_wraps() -> Result<()> {
    let mut run = launch(quick(), Arc::new(Immediate));
    run.handle.load_album(abc()).await?;
    run.handle.start(false, None).await?;

    for expected in [0, 1, 2, 0] {
        assert_eq!(next_seen(&mut run.seen).await, Seen::Switch(expected));
    }

    run.handle.stop().await?;
    let snap = run.handle.snapshot().await?;
    assert!(!snap.slideshow_active);
    assert_eq!(snap.history[..3], [2, 1, 0]);

    run.cancel.cancel();
    run.task.await??;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn commands_answer_through_the_handle() -> Result<()> {
    let run = launch(quick(), Arc::new(Immediate));
    assert_eq!(run.handle.switch_to(1).await?, Switch::NoAlbum);

    run.handle.load_album(abc()).await?;
    assert_eq!(run.handle.find_image("b.jpg").await?, Some(1));
    assert_eq!(run.handle.find_image("zzz.jpg").await?, None);
    assert_eq!(run.handle.safe_index(7).await?, Some(1));
    assert_eq!(run.handle.switch_to(-1).await?, Switch::Switched(2));
    assert_eq!(run.handle.switch_to(2).await?, Switch::Unchanged(2));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snap = run.handle.snapshot().await?;
    assert_eq!(snap.displayed, Some(2));
    assert_eq!(snap.phase, Phase::Idle);
    assert_eq!(snap.opacity, [0, 100]);

    run.handle.set_endless(false).await?;
    assert_eq!(run.handle.next().await?, Switch::Unchanged(2));
    assert_eq!(run.handle.safe_index(-4).await?, Some(0));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rejected_album_is_reported() -> Result<()> {
    let run = launch(quick(), Arc::new(Immediate));
    let err = run
        .handle
        .load_album(AlbumSource::new("empty", Vec::<String>::new()))
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidAlbum(_))));
    assert_eq!(run.handle.snapshot().await?.album, None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn broken_images_are_skipped() -> Result<()> {
    let mut run = launch(quick(), Arc::new(Immediate));
    run.handle
        .load_album(AlbumSource::new("mixed", ["a.jpg", "broken.jpg", "c.jpg"]))
        .await?;
    run.handle.start(false, None).await?;

    assert_eq!(next_seen(&mut run.seen).await, Seen::Switch(0));
    assert_eq!(next_seen(&mut run.seen).await, Seen::Switch(1));
    assert_eq!(next_seen(&mut run.seen).await, Seen::Failed(1));
    assert_eq!(next_seen(&mut run.seen).await, Seen::Switch(2));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn load_timeout_counts_as_failure() -> Result<()> {
    let settings = ViewerSettings {
        load_timeout: Some(Duration::from_secs(5)),
        ..quick()
    };
    let mut run = launch(settings, Arc::new(Stalled));
    run.handle.load_album(abc()).await?;
    run.handle.start(false, None).await?;

    assert_eq!(next_seen(&mut run.seen).await, Seen::Switch(0));
    assert_eq!(next_seen(&mut run.seen).await, Seen::Failed(0));
    assert_eq!(next_seen(&mut run.seen).await, Seen::Switch(1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn toggle_starts_and_stops() -> Result<()> {
    let mut run = launch(quick(), Arc::new(Immediate));
    run.handle.load_album(abc()).await?;

    run.handle.toggle().await?;
    assert_eq!(next_seen(&mut run.seen).await, Seen::Switch(0));
    assert!(run.handle.snapshot().await?.slideshow_active);

    run.handle.toggle().await?;
    assert!(!run.handle.snapshot().await?.slideshow_active);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(run.seen.try_recv().is_err());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn task_ends_when_handles_drop() -> Result<()> {
    let run = launch(quick(), Arc::new(Immediate));
    run.handle.load_album(abc()).await?;
    run.handle.start(true, None).await?;
    drop(run.handle);
    run.task.await??;
    Ok(())
}
