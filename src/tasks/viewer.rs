use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use futures::StreamExt;
use tokio::select;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tokio_util::time::{DelayQueue, delay_queue};
use tracing::{debug, info, trace, warn};

use crate::album::AlbumSource;
use crate::controller::SlideshowController;
use crate::events::{Request, Switch, Timer, ViewerCommand, ViewerSnapshot};
use crate::slot::SlotId;
use crate::surface::RenderSurface;
use crate::tasks::loader::ImageFetcher;

const COMMAND_CAPACITY: usize = 16;

struct LoadFinished {
    slot: SlotId,
    token: Option<u64>,
    outcome: Result<()>,
}

/// Timers and fetches the controller asked for and that have not settled.
struct Outstanding {
    fetcher: Arc<dyn ImageFetcher>,
    load_timeout: Option<Duration>,
    timers: DelayQueue<Timer>,
    timer_keys: HashMap<Timer, delay_queue::Key>,
    loads: JoinSet<LoadFinished>,
    in_flight: HashMap<SlotId, AbortHandle>,
}

impl Outstanding {
    fn new(fetcher: Arc<dyn ImageFetcher>, load_timeout: Option<Duration>) -> Self {
        Self {
            fetcher,
            load_timeout,
            timers: DelayQueue::new(),
            timer_keys: HashMap::new(),
            loads: JoinSet::new(),
            in_flight: HashMap::new(),
        }
    }

    fn apply(&mut self, request: Request) {
        trace!(?request, "executing request");
        match request {
            Request::Fetch { slot, token, url } => self.fetch(slot, Some(token), url),
            Request::Prefetch { slot, url } => self.fetch(slot, None, url),
            Request::CancelFetch { slot } => {
                if let Some(handle) = self.in_flight.remove(&slot) {
                    handle.abort();
                }
            }
            Request::ScheduleTimer { timer, delay } => {
                let key = self.timers.insert(timer, delay);
                self.timer_keys.insert(timer, key);
            }
            Request::CancelTimer { timer } => {
                if let Some(key) = self.timer_keys.remove(&timer) {
                    self.timers.try_remove(&key);
                }
            }
        }
    }

    fn fetch(&mut self, slot: SlotId, token: Option<u64>, url: String) {
        let load = self.fetcher.fetch(&url);
        let timeout = self.load_timeout;
        let handle = self.loads.spawn(async move {
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, load).await {
                    Ok(res) => res,
                    Err(_) => Err(anyhow!("timed out after {}", humantime::format_duration(limit))),
                },
                None => load.await,
            };
            if let Err(err) = &outcome {
                debug!(%slot, %url, "fetch failed: {err:#}");
            }
            LoadFinished {
                slot,
                token,
                outcome,
            }
        });
        // Whatever was still loading into this slot is no longer wanted.
        if let Some(previous) = self.in_flight.insert(slot, handle) {
            previous.abort();
        }
    }

    fn settle(&mut self, id: tokio::task::Id) {
        self.in_flight.retain(|_, handle| handle.id() != id);
    }
}

/// Drive `controller` until `cancel` fires or every command sender is gone.
pub async fn run<S>(
    mut controller: SlideshowController<S>,
    fetcher: Arc<dyn ImageFetcher>,
    mut commands: Receiver<ViewerCommand>,
    cancel: CancellationToken,
) -> Result<()>
where
    S: RenderSurface,
{
    let mut outstanding = Outstanding::new(fetcher, controller.settings().load_timeout);
    info!(instance = controller.instance(), "viewer task started");

    loop {
        for request in controller.drain_requests() {
            outstanding.apply(request);
        }

        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting viewer task");
                break;
            }

            cmd = commands.recv() => match cmd {
                Some(cmd) => handle_command(&mut controller, cmd),
                None => {
                    debug!("command channel closed; exiting viewer task");
                    break;
                }
            },

            Some(expired) = outstanding.timers.next() => {
                let timer = expired.into_inner();
                outstanding.timer_keys.remove(&timer);
                controller.on_timer(timer);
            }

            Some(joined) = outstanding.loads.join_next_with_id() => match joined {
                Ok((id, LoadFinished { slot, token, outcome })) => {
                    outstanding.settle(id);
                    match (token, outcome) {
                        (Some(token), Ok(())) => controller.on_image_loaded(slot, token),
                        (Some(token), Err(_)) => controller.on_image_failed(slot, token),
                        (None, _) => trace!(%slot, "read-ahead settled"),
                    }
                }
                Err(err) if err.is_cancelled() => outstanding.settle(err.id()),
                Err(err) => {
                    warn!("fetch task failed: {err}");
                    outstanding.settle(err.id());
                }
            },
        }
    }

    controller.shutdown();
    controller.drain_requests().for_each(drop);
    outstanding.loads.abort_all();
    Ok(())
}

fn handle_command<S: RenderSurface>(controller: &mut SlideshowController<S>, cmd: ViewerCommand) {
    debug!(?cmd, "viewer command");
    match cmd {
        ViewerCommand::LoadAlbum { source, reply } => {
            let res = controller.load_album(&source);
            if let Err(err) = &res {
                warn!("rejected album: {err}");
            }
            let _ = reply.send(res);
        }
        ViewerCommand::SwitchTo { index, reply } => {
            let _ = reply.send(controller.switch_to(index));
        }
        ViewerCommand::Next(reply) => {
            let _ = reply.send(controller.next());
        }
        ViewerCommand::Previous(reply) => {
            let _ = reply.send(controller.previous());
        }
        ViewerCommand::Random(reply) => {
            let _ = reply.send(controller.random());
        }
        ViewerCommand::FindImage { name, reply } => {
            let _ = reply.send(controller.find_image(&name));
        }
        ViewerCommand::SafeIndex { index, reply } => {
            let _ = reply.send(controller.safe_index(index));
        }
        ViewerCommand::Start { random, start_at } => {
            controller.start(random, start_at);
        }
        ViewerCommand::Stop => controller.stop(),
        ViewerCommand::Toggle => {
            controller.toggle();
        }
        ViewerCommand::SetEndless(endless) => controller.set_endless(endless),
        ViewerCommand::SetRandom(random) => controller.set_random(random),
        ViewerCommand::Snapshot(reply) => {
            let _ = reply.send(controller.snapshot());
        }
    }
}

/// Spawn the viewer task and return a handle to it.
pub fn spawn<S>(
    controller: SlideshowController<S>,
    fetcher: Arc<dyn ImageFetcher>,
    cancel: CancellationToken,
) -> (ViewerHandle, JoinHandle<Result<()>>)
where
    S: RenderSurface + 'static,
{
    let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
    let task = tokio::spawn(run(controller, fetcher, rx, cancel));
    (ViewerHandle::new(tx), task)
}

/// Async front-end to a running viewer task.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    tx: Sender<ViewerCommand>,
}

impl ViewerHandle {
    pub fn new(tx: Sender<ViewerCommand>) -> Self {
        Self { tx }
    }

    async fn send(&self, cmd: ViewerCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| anyhow!("viewer task has stopped"))
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> ViewerCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| anyhow!("viewer task dropped the request"))
    }

    /// Fails with [`crate::Error::InvalidAlbum`] when the album is rejected.
    pub async fn load_album(&self, source: AlbumSource) -> Result<()> {
        self.request(|reply| ViewerCommand::LoadAlbum { source, reply })
            .await??;
        Ok(())
    }

    pub async fn switch_to(&self, index: i64) -> Result<Switch> {
        self.request(|reply| ViewerCommand::SwitchTo { index, reply })
            .await
    }

    pub async fn next(&self) -> Result<Switch> {
        self.request(ViewerCommand::Next).await
    }

    pub async fn previous(&self) -> Result<Switch> {
        self.request(ViewerCommand::Previous).await
    }

    pub async fn random(&self) -> Result<Switch> {
        self.request(ViewerCommand::Random).await
    }

    pub async fn find_image(&self, name: impl Into<String>) -> Result<Option<usize>> {
        let name = name.into();
        self.request(|reply| ViewerCommand::FindImage { name, reply })
            .await
    }

    pub async fn safe_index(&self, index: i64) -> Result<Option<usize>> {
        self.request(|reply| ViewerCommand::SafeIndex { index, reply })
            .await
    }

    pub async fn start(&self, random: bool, start_at: Option<i64>) -> Result<()> {
        self.send(ViewerCommand::Start { random, start_at }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(ViewerCommand::Stop).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send(ViewerCommand::Toggle).await
    }

    pub async fn set_endless(&self, endless: bool) -> Result<()> {
        self.send(ViewerCommand::SetEndless(endless)).await
    }

    pub async fn set_random(&self, random: bool) -> Result<()> {
        self.send(ViewerCommand::SetRandom(random)).await
    }

    pub async fn snapshot(&self) -> Result<ViewerSnapshot> {
        self.request(ViewerCommand::Snapshot).await
    }
}
