//! The slideshow state machine.
//!
//! A controller never blocks and never sleeps. Loads and timers are handed
//! to the host as [`Request`]s (see [`SlideshowController::drain_requests`]);
//! the host reports back through [`SlideshowController::on_image_loaded`],
//! [`SlideshowController::on_image_failed`] and
//! [`SlideshowController::on_timer`]. Every load and timer carries a token,
//! and reports whose token is no longer current are dropped.

use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::album::{Album, AlbumSource};
use crate::config::ViewerSettings;
use crate::error::Error;
use crate::events::{Phase, Request, Switch, Timer, TimerKind, ViewerSnapshot};
use crate::hooks::ViewerHooks;
use crate::layout::ElementLayout;
use crate::slot::{DisplaySlot, LoadRequest, OPACITY_MAX, SlotId, fade_step};
use crate::surface::RenderSurface;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Most recently selected image; the target of any running transition.
    pub current: Option<usize>,
    /// Image whose fade last completed.
    pub displayed: Option<usize>,
    /// Previously selected images, most recent first. Holds at most
    /// [`HISTORY_LIMIT`] entries.
    pub history: VecDeque<usize>,
    pub slideshow_active: bool,
}

/// Oldest history entries are dropped past this length.
pub const HISTORY_LIMIT: usize = 1024;

#[derive(Debug, Default)]
struct TimerBook {
    grace: Option<u64>,
    fade: Option<u64>,
    advance: Option<u64>,
}

impl TimerBook {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<u64> {
        match kind {
            TimerKind::LoadingGrace => &mut self.grace,
            TimerKind::FadeTick => &mut self.fade,
            TimerKind::Advance => &mut self.advance,
        }
    }
}

pub struct SlideshowController<S> {
    instance: u64,
    layout: ElementLayout,
    settings: ViewerSettings,
    surface: S,
    hooks: Box<dyn ViewerHooks>,
    album: Option<Album>,
    nav: NavigationState,
    slots: [DisplaySlot; 2],
    front: SlotId,
    phase: Phase,
    loading: bool,
    loading_announced: bool,
    timers: TimerBook,
    next_token: u64,
    requests: Vec<Request>,
    rng: StdRng,
}

impl<S: RenderSurface> SlideshowController<S> {
    pub(crate) fn new(
        instance: u64,
        layout: ElementLayout,
        settings: ViewerSettings,
        surface: S,
        hooks: Box<dyn ViewerHooks>,
    ) -> Self {
        let rng = match settings.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut controller = Self {
            instance,
            layout,
            settings,
            surface,
            hooks,
            album: None,
            nav: NavigationState::default(),
            slots: [
                DisplaySlot::with_opacity(OPACITY_MAX),
                DisplaySlot::with_opacity(0),
            ],
            front: SlotId::First,
            phase: Phase::Idle,
            loading: false,
            loading_announced: false,
            timers: TimerBook::default(),
            next_token: 0,
            requests: Vec::new(),
            rng,
        };
        for slot in SlotId::BOTH {
            controller.render(slot);
        }
        controller
    }

    /// Replace the album. On error nothing changes.
    pub fn load_album(&mut self, source: &AlbumSource) -> Result<(), Error> {
        let album = Album::from_source(source)?;
        self.halt();
        info!(
            instance = self.instance,
            album = album.name(),
            images = album.present_count(),
            "album loaded"
        );
        self.album = Some(album);
        self.nav = NavigationState::default();
        self.front = SlotId::First;
        self.slots[SlotId::First.index()].opacity = OPACITY_MAX;
        self.slots[SlotId::Second.index()].opacity = 0;
        for slot in SlotId::BOTH {
            self.render(slot);
        }
        Ok(())
    }

    /// Correct `index` against the loaded album.
    pub fn safe_index(&self, index: i64) -> Option<usize> {
        self.album
            .as_ref()
            .map(|album| album.safe_index(index, self.settings.endless_album))
    }

    pub fn find_image(&self, name: &str) -> Option<usize> {
        self.album.as_ref()?.find(name)
    }

    pub fn switch_to(&mut self, requested: i64) -> Switch {
        let Some(album) = self.album.as_ref() else {
            return Switch::NoAlbum;
        };
        let next = album.safe_index(requested, self.settings.endless_album);
        let reshuffle = self.settings.slideshow_random && self.nav.slideshow_active;
        if self.nav.current == Some(next) && !reshuffle {
            return Switch::Unchanged(next);
        }

        let (src, alt, link) = (
            self.hooks.image_src(album, next),
            self.hooks.image_alt(album, next),
            self.hooks.image_link(album, next),
        );

        if let Some(prev) = self.nav.current {
            self.nav.history.push_front(prev);
            self.nav.history.truncate(HISTORY_LIMIT);
        }
        self.nav.current = Some(next);

        // A running fade holds its opacities until the new image is in.
        self.cancel_timer(TimerKind::FadeTick);

        let target = self.front.other();
        self.cancel_load(target);
        let token = self.token();
        let slot = &mut self.slots[target.index()];
        slot.image = Some(src.clone());
        slot.request = Some(LoadRequest {
            token,
            ready: false,
        });
        self.surface.set_image(target, &src, &alt);
        if self.settings.enable_links {
            self.surface.set_link(target, &link);
        }
        debug!(index = next, %target, token, url = %src, "switching image");
        self.requests.push(Request::Fetch {
            slot: target,
            token,
            url: src,
        });

        self.phase = Phase::Loading;
        self.loading = true;
        self.schedule(TimerKind::LoadingGrace, self.settings.loading_grace);

        self.hooks.on_switch(next);
        Switch::Switched(next)
    }

    pub fn next(&mut self) -> Switch {
        self.switch_to(self.position() + 1)
    }

    pub fn previous(&mut self) -> Switch {
        self.switch_to(self.position() - 1)
    }

    pub fn random(&mut self) -> Switch {
        match self.pick_random() {
            Some(index) => self.switch_to(index as i64),
            None => Switch::NoAlbum,
        }
    }

    /// Start (or restart) the slideshow.
    pub fn start(&mut self, random: bool, start_at: Option<i64>) -> Switch {
        self.end_slideshow();
        let Some(album) = self.album.as_ref() else {
            return Switch::NoAlbum;
        };
        let at_end = self.nav.current.is_some() && self.nav.current == album.last_present();
        self.nav.slideshow_active = true;
        if random {
            self.settings.slideshow_random = true;
        }
        info!(
            instance = self.instance,
            random = self.settings.slideshow_random,
            "slideshow started"
        );

        let outcome = if self.settings.slideshow_random {
            self.random()
        } else if at_end {
            self.switch_to(0)
        } else if let Some(index) = start_at {
            self.switch_to(index)
        } else {
            self.next()
        };
        if matches!(outcome, Switch::Unchanged(_)) && self.phase == Phase::Idle {
            self.schedule(TimerKind::Advance, self.settings.slideshow_delay);
        }
        outcome
    }

    /// Stop the slideshow, drop loads that have not completed and freeze any
    /// running fade. A later switch picks the fade up from where it stopped.
    pub fn stop(&mut self) {
        self.end_slideshow();
        self.cancel_timer(TimerKind::FadeTick);
        self.phase = Phase::Idle;
    }

    /// Cancel the advance and any pending load. A loaded fade keeps going.
    fn end_slideshow(&mut self) {
        self.cancel_timer(TimerKind::Advance);
        self.cancel_timer(TimerKind::LoadingGrace);
        for slot in SlotId::BOTH {
            if self.slots[slot.index()].is_loading() {
                self.cancel_load(slot);
            }
        }
        self.loading = false;
        self.loading_announced = false;
        if self.phase == Phase::Loading {
            self.phase = Phase::Idle;
        }
        if self.nav.slideshow_active {
            info!(instance = self.instance, "slideshow stopped");
        }
        self.nav.slideshow_active = false;
    }

    /// Start when stopped, stop when running. Returns whether the slideshow
    /// is now active.
    pub fn toggle(&mut self) -> bool {
        if self.nav.slideshow_active {
            self.stop();
        } else {
            self.start(false, None);
        }
        self.nav.slideshow_active
    }

    /// Cancel every timer and load. Used when the viewer is torn down.
    pub fn shutdown(&mut self) {
        self.halt();
        debug!(instance = self.instance, "viewer shut down");
    }

    pub fn on_image_loaded(&mut self, slot: SlotId, token: u64) {
        if !self.owns_pending(slot, token) {
            trace!(%slot, token, "stale load completion ignored");
            return;
        }
        self.slots[slot.index()].request = Some(LoadRequest { token, ready: true });
        self.cancel_timer(TimerKind::FadeTick);
        self.cancel_timer(TimerKind::Advance);

        if self.loading && !self.slots[slot.other().index()].is_loading() {
            self.loading = false;
            self.loading_announced = false;
            self.cancel_timer(TimerKind::LoadingGrace);
            self.hooks.loading_complete();
        }

        debug!(%slot, token, "image ready; fading");
        self.phase = Phase::Fading;
        self.fade_tick();
    }

    pub fn on_image_failed(&mut self, slot: SlotId, token: u64) {
        if !self.owns_pending(slot, token) {
            trace!(%slot, token, "stale load failure ignored");
            return;
        }
        self.slots[slot.index()].request = None;
        self.cancel_timer(TimerKind::LoadingGrace);
        self.loading = false;
        self.loading_announced = false;
        self.phase = Phase::Idle;

        let index = self.nav.current;
        warn!(%slot, ?index, "image failed to load");
        if let Some(index) = index {
            self.hooks.load_failed(index);
        }
        if self.nav.slideshow_active {
            self.schedule(TimerKind::Advance, self.settings.slideshow_delay);
        }
    }

    pub fn on_timer(&mut self, timer: Timer) {
        let armed = self.timers.slot(timer.kind);
        if *armed != Some(timer.token) {
            trace!(?timer, "stale timer ignored");
            return;
        }
        *armed = None;
        match timer.kind {
            TimerKind::LoadingGrace => {
                if self.loading && !self.loading_announced {
                    self.loading_announced = true;
                    self.hooks.loading_started();
                }
            }
            TimerKind::FadeTick => {
                if self.phase == Phase::Fading {
                    self.fade_tick();
                }
            }
            TimerKind::Advance => self.advance(),
        }
    }

    /// Take the requests queued since the last call.
    pub fn drain_requests(&mut self) -> std::vec::Drain<'_, Request> {
        self.requests.drain(..)
    }

    pub fn set_endless(&mut self, endless: bool) {
        self.settings.endless_album = endless;
    }

    pub fn set_random(&mut self, random: bool) {
        self.settings.slideshow_random = random;
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn album(&self) -> Option<&Album> {
        self.album.as_ref()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn is_slideshow_active(&self) -> bool {
        self.nav.slideshow_active
    }

    pub fn slot(&self, slot: SlotId) -> &DisplaySlot {
        &self.slots[slot.index()]
    }

    /// The slot currently on top.
    pub fn front(&self) -> SlotId {
        self.front
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn layout(&self) -> &ElementLayout {
        &self.layout
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            album: self.album.as_ref().map(|a| a.name().to_owned()),
            current: self.nav.current,
            displayed: self.nav.displayed,
            history: self.nav.history.iter().copied().collect(),
            slideshow_active: self.nav.slideshow_active,
            random: self.settings.slideshow_random,
            endless: self.settings.endless_album,
            phase: self.phase,
            front: self.front,
            opacity: [self.slots[0].opacity, self.slots[1].opacity],
        }
    }

    fn advance(&mut self) {
        if !self.nav.slideshow_active {
            return;
        }
        if self.settings.slideshow_random {
            self.random();
            return;
        }
        match self.next() {
            Switch::Switched(_) => {}
            Switch::Unchanged(_) | Switch::NoAlbum => {
                info!(instance = self.instance, "slideshow reached the end of the album");
                self.nav.slideshow_active = false;
            }
        }
    }

    fn fade_tick(&mut self) {
        let outgoing = self.front;
        let incoming = outgoing.other();
        let mut out = self.slots[outgoing.index()].opacity;
        let mut inc = self.slots[incoming.index()].opacity;
        let done = fade_step(&mut out, &mut inc, self.settings.fade_step);
        self.slots[outgoing.index()].opacity = out;
        self.slots[incoming.index()].opacity = inc;
        trace!(outgoing = out, incoming = inc, "fade tick");

        if self.settings.fade_both {
            self.render(outgoing);
            self.render(incoming);
        } else {
            // Only the upper slot fades; the lower one stays opaque while shown.
            self.render(SlotId::Second);
            let lower = self.slots[SlotId::First.index()].opacity;
            self.surface.set_opacity(SlotId::First, OPACITY_MAX);
            self.surface.set_visible(SlotId::First, lower > 0);
        }

        if done {
            self.finish_fade();
        } else {
            self.schedule(TimerKind::FadeTick, self.settings.fade_time);
        }
    }

    fn finish_fade(&mut self) {
        let shown = self.front.other();
        self.slots[shown.index()].request = None;
        self.front = shown;
        self.phase = Phase::Idle;
        self.nav.displayed = self.nav.current;
        debug!(index = ?self.nav.displayed, front = %shown, "fade complete");

        let hidden = shown.other();
        if self.slots[hidden.index()].request.is_none() {
            self.read_ahead(hidden);
        }

        if self.nav.slideshow_active {
            self.schedule(TimerKind::Advance, self.settings.slideshow_delay);
        }
    }

    /// Put the image after the displayed one into the hidden slot.
    fn read_ahead(&mut self, hidden: SlotId) {
        let (Some(album), Some(shown)) = (self.album.as_ref(), self.nav.displayed) else {
            return;
        };
        let ahead = album.safe_index(shown as i64 + 1, self.settings.endless_album);
        let src = self.hooks.image_src(album, ahead);
        if self.slots[hidden.index()].image.as_deref() == Some(src.as_str()) {
            return;
        }
        let alt = self.hooks.image_alt(album, ahead);
        trace!(index = ahead, %hidden, "read-ahead");
        self.surface.set_image(hidden, &src, &alt);
        self.slots[hidden.index()].image = Some(src.clone());
        self.requests.push(Request::Prefetch {
            slot: hidden,
            url: src,
        });
    }

    fn pick_random(&mut self) -> Option<usize> {
        let album = self.album.as_ref()?;
        let endless = self.settings.endless_album;
        if album.present_count() <= 2 {
            return Some(album.safe_index(self.position() + 1, true));
        }
        loop {
            let candidate = album.safe_index(self.rng.random_range(0..album.len()) as i64, endless);
            if Some(candidate) != self.nav.current {
                return Some(candidate);
            }
        }
    }

    /// Current index, or -1 before anything was selected.
    fn position(&self) -> i64 {
        self.nav.current.map_or(-1, |i| i as i64)
    }

    fn owns_pending(&self, slot: SlotId, token: u64) -> bool {
        self.slots[slot.index()]
            .request
            .is_some_and(|r| r.token == token && !r.ready)
    }

    fn halt(&mut self) {
        for kind in [TimerKind::LoadingGrace, TimerKind::FadeTick, TimerKind::Advance] {
            self.cancel_timer(kind);
        }
        for slot in SlotId::BOTH {
            self.cancel_load(slot);
        }
        self.nav.slideshow_active = false;
        self.loading = false;
        self.loading_announced = false;
        self.phase = Phase::Idle;
    }

    fn render(&mut self, slot: SlotId) {
        let opacity = self.slots[slot.index()].opacity;
        self.surface.set_opacity(slot, opacity);
        self.surface.set_visible(slot, opacity > 0);
    }

    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        self.cancel_timer(kind);
        let token = self.token();
        *self.timers.slot(kind) = Some(token);
        self.requests.push(Request::ScheduleTimer {
            timer: Timer { kind, token },
            delay,
        });
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        if let Some(token) = self.timers.slot(kind).take() {
            self.requests.push(Request::CancelTimer {
                timer: Timer { kind, token },
            });
        }
    }

    fn cancel_load(&mut self, slot: SlotId) {
        if self.slots[slot.index()].request.take().is_some() {
            self.requests.push(Request::CancelFetch { slot });
        }
    }
}
