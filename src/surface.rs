//! Rendering surface the controller draws onto, plus a headless recorder.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::layout::{ElementHost, ElementLayout};
use crate::slot::SlotId;

/// The two paired (container, image, link) triples a viewer paints into.
pub trait RenderSurface: Send {
    /// Point the slot's image at `src`.
    fn set_image(&mut self, slot: SlotId, src: &str, alt: &str);
    fn set_link(&mut self, slot: SlotId, href: &str);
    fn set_opacity(&mut self, slot: SlotId, opacity: u8);
    /// Hidden slots must not intercept interaction with lower layers.
    fn set_visible(&mut self, slot: SlotId, visible: bool);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotView {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub link: Option<String>,
    pub opacity: u8,
    pub visible: bool,
}

/// Surface without a display: records the latest state of each slot and
/// traces every change. Also acts as an [`ElementHost`] over a fixed set of
/// element ids.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    slots: [SlotView; 2],
    elements: HashSet<String>,
    built: Vec<String>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn slot(&self, slot: SlotId) -> &SlotView {
        &self.slots[slot.index()]
    }

    /// Containers the viewer asked this host to build into.
    pub fn built_containers(&self) -> &[String] {
        &self.built
    }
}

impl RenderSurface for HeadlessSurface {
    fn set_image(&mut self, slot: SlotId, src: &str, alt: &str) {
        debug!(%slot, src, alt, "surface: image");
        let view = &mut self.slots[slot.index()];
        view.src = Some(src.to_owned());
        view.alt = Some(alt.to_owned());
    }

    fn set_link(&mut self, slot: SlotId, href: &str) {
        trace!(%slot, href, "surface: link");
        self.slots[slot.index()].link = Some(href.to_owned());
    }

    fn set_opacity(&mut self, slot: SlotId, opacity: u8) {
        trace!(%slot, opacity, "surface: opacity");
        self.slots[slot.index()].opacity = opacity;
    }

    fn set_visible(&mut self, slot: SlotId, visible: bool) {
        let view = &mut self.slots[slot.index()];
        if view.visible != visible {
            trace!(%slot, visible, "surface: visibility");
        }
        view.visible = visible;
    }
}

impl ElementHost for HeadlessSurface {
    fn contains(&self, id: &str) -> bool {
        self.elements.contains(id)
    }

    fn build_pair(&mut self, container: &str, layout: &ElementLayout, blank_image: &str) {
        debug!(container, "building slot elements");
        for slot in SlotId::BOTH {
            let ids = layout.slot(slot);
            self.elements.insert(ids.container.clone());
            self.elements.insert(ids.image.clone());
            if let Some(link) = &ids.link {
                self.elements.insert(link.clone());
            }
            let view = &mut self.slots[slot.index()];
            view.src = Some(blank_image.to_owned());
            view.alt = Some("Loading".to_owned());
        }
        self.built.push(container.to_owned());
    }
}
