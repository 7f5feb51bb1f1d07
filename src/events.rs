use std::time::Duration;

use tokio::sync::oneshot;

use crate::album::AlbumSource;
use crate::error::Error;
use crate::slot::SlotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Fires `loading_started` when a load outlives the grace period.
    LoadingGrace,
    FadeTick,
    Advance,
}

/// A scheduled timer; stale tokens are ignored when they fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timer {
    pub kind: TimerKind,
    pub token: u64,
}

/// Work the controller asks its host to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Load `url` for `slot`; report back with the same token.
    Fetch { slot: SlotId, token: u64, url: String },
    /// Read-ahead of an image that is not displayed yet; nothing to report.
    Prefetch { slot: SlotId, url: String },
    CancelFetch { slot: SlotId },
    ScheduleTimer { timer: Timer, delay: Duration },
    CancelTimer { timer: Timer },
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// A transition to this index was started.
    Switched(usize),
    /// Already showing this index; nothing changed.
    Unchanged(usize),
    NoAlbum,
}

impl Switch {
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Switched(i) | Self::Unchanged(i) => Some(i),
            Self::NoAlbum => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Fading,
}

/// Point-in-time copy of a viewer's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSnapshot {
    pub album: Option<String>,
    pub current: Option<usize>,
    pub displayed: Option<usize>,
    pub history: Vec<usize>,
    pub slideshow_active: bool,
    pub random: bool,
    pub endless: bool,
    pub phase: Phase,
    pub front: SlotId,
    pub opacity: [u8; 2],
}

/// Commands accepted by the viewer task.
#[derive(Debug)]
pub enum ViewerCommand {
    LoadAlbum {
        source: AlbumSource,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    SwitchTo {
        index: i64,
        reply: oneshot::Sender<Switch>,
    },
    Next(oneshot::Sender<Switch>),
    Previous(oneshot::Sender<Switch>),
    Random(oneshot::Sender<Switch>),
    FindImage {
        name: String,
        reply: oneshot::Sender<Option<usize>>,
    },
    SafeIndex {
        index: i64,
        reply: oneshot::Sender<Option<usize>>,
    },
    Start {
        random: bool,
        start_at: Option<i64>,
    },
    Stop,
    Toggle,
    SetEndless(bool),
    SetRandom(bool),
    Snapshot(oneshot::Sender<ViewerSnapshot>),
}
