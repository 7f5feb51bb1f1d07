//! Element resolution for the two display slots and the instance factory.

use serde::Deserialize;
use tracing::info;

use crate::config::ViewerSettings;
use crate::controller::SlideshowController;
use crate::error::Error;
use crate::hooks::ViewerHooks;
use crate::slot::SlotId;
use crate::surface::RenderSurface;

pub const DEFAULT_ID_PREFIX: &str = "AlbumViewer";

/// Lookup and construction of named elements on the host page.
pub trait ElementHost {
    fn contains(&self, id: &str) -> bool;
    /// Create both slot triples inside `container`, showing `blank_image`.
    fn build_pair(&mut self, container: &str, layout: &ElementLayout, blank_image: &str);
}

/// Where a viewer should render.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutRequest {
    /// Generate both slots inside this container.
    Container(String),
    /// Use existing elements.
    Explicit {
        container1: String,
        img1: String,
        #[serde(default)]
        link1: Option<String>,
        container2: String,
        img2: String,
        #[serde(default)]
        link2: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotElements {
    pub container: String,
    pub image: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLayout {
    slots: [SlotElements; 2],
}

impl ElementLayout {
    /// Deterministic ids `{prefix}_{instance}_{t|i|l}{1|2}`.
    pub fn generated(prefix: &str, instance: u64, enable_links: bool) -> Self {
        let make = |slot: SlotId| {
            let n = slot.number();
            SlotElements {
                container: format!("{prefix}_{instance}_t{n}"),
                image: format!("{prefix}_{instance}_i{n}"),
                link: enable_links.then(|| format!("{prefix}_{instance}_l{n}")),
            }
        };
        Self {
            slots: [make(SlotId::First), make(SlotId::Second)],
        }
    }

    pub fn slot(&self, slot: SlotId) -> &SlotElements {
        &self.slots[slot.index()]
    }
}

/// Resolve `request` against `host`, building elements when a container was
/// named. Every required element must exist afterwards; links are required
/// only when `enable_links` is set.
pub fn resolve_layout<H: ElementHost + ?Sized>(
    request: &LayoutRequest,
    host: &mut H,
    prefix: &str,
    instance: u64,
    settings: &ViewerSettings,
) -> Result<ElementLayout, Error> {
    let layout = match request {
        LayoutRequest::Container(container) => {
            if !host.contains(container) {
                return Err(Error::MissingElement(format!("container `{container}`")));
            }
            let layout = ElementLayout::generated(prefix, instance, settings.enable_links);
            host.build_pair(container, &layout, &settings.blank_image);
            layout
        }
        LayoutRequest::Explicit {
            container1,
            img1,
            link1,
            container2,
            img2,
            link2,
        } => {
            let link_for = |link: &Option<String>, n: u8| -> Result<Option<String>, Error> {
                if !settings.enable_links {
                    return Ok(None);
                }
                link.clone()
                    .map(Some)
                    .ok_or_else(|| Error::MissingElement(format!("link{n} was not specified")))
            };
            ElementLayout {
                slots: [
                    SlotElements {
                        container: container1.clone(),
                        image: img1.clone(),
                        link: link_for(link1, 1)?,
                    },
                    SlotElements {
                        container: container2.clone(),
                        image: img2.clone(),
                        link: link_for(link2, 2)?,
                    },
                ],
            }
        }
    };

    for slot in SlotId::BOTH {
        let ids = layout.slot(slot);
        let required = [Some(&ids.container), Some(&ids.image), ids.link.as_ref()];
        if let Some(missing) = required.into_iter().flatten().find(|id| !host.contains(id)) {
            return Err(Error::MissingElement(format!("element `{missing}` for {slot}")));
        }
    }
    Ok(layout)
}

/// Builds viewers and numbers them. The instance number only feeds generated
/// element ids.
#[derive(Debug)]
pub struct ViewerFactory {
    prefix: String,
    instances: u64,
}

impl Default for ViewerFactory {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX)
    }
}

impl ViewerFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            instances: 0,
        }
    }

    /// Number of viewers built so far.
    pub fn instances(&self) -> u64 {
        self.instances
    }

    /// Resolve the surface and produce a controller. A failed resolution
    /// consumes no instance number.
    pub fn build<S>(
        &mut self,
        settings: ViewerSettings,
        request: &LayoutRequest,
        mut surface: S,
        hooks: Box<dyn ViewerHooks>,
    ) -> Result<SlideshowController<S>, Error>
    where
        S: RenderSurface + ElementHost,
    {
        let instance = self.instances + 1;
        let layout = resolve_layout(request, &mut surface, &self.prefix, instance, &settings)?;
        self.instances = instance;
        info!(instance, "viewer constructed");
        Ok(SlideshowController::new(instance, layout, settings, surface, hooks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;

    #[test]
    fn generated_ids_follow_pattern() {
        let layout = ElementLayout::generated("AlbumViewer", 3, true);
        let second = layout.slot(SlotId::Second);
        assert_eq!(second.container, "AlbumViewer_3_t2");
        assert_eq!(second.image, "AlbumViewer_3_i2");
        assert_eq!(second.link.as_deref(), Some("AlbumViewer_3_l2"));
        assert!(ElementLayout::generated("p", 1, false).slot(SlotId::First).link.is_none());
    }

    #[test]
    fn container_gets_built() {
        let mut host = HeadlessSurface::with_elements(["stage"]);
        let settings = ViewerSettings::default();
        let layout = resolve_layout(
            &LayoutRequest::Container("stage".into()),
            &mut host,
            "V",
            1,
            &settings,
        )
        .unwrap();
        assert_eq!(layout.slot(SlotId::First).image, "V_1_i1");
        assert_eq!(host.built_containers(), ["stage".to_owned()]);
        assert!(host.contains("V_1_l2"));
    }

    #[test]
    fn missing_container_is_an_error() {
        let mut host = HeadlessSurface::new();
        let err = resolve_layout(
            &LayoutRequest::Container("nowhere".into()),
            &mut host,
            "V",
            1,
            &ViewerSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingElement(_)));
    }

    #[test]
    fn explicit_links_only_required_when_enabled() {
        let request = LayoutRequest::Explicit {
            container1: "c1".into(),
            img1: "i1".into(),
            link1: None,
            container2: "c2".into(),
            img2: "i2".into(),
            link2: None,
        };
        let mut host = HeadlessSurface::with_elements(["c1", "i1", "c2", "i2"]);
        let linked = ViewerSettings::default();
        assert!(resolve_layout(&request, &mut host, "V", 1, &linked).is_err());

        let unlinked = ViewerSettings {
            enable_links: false,
            ..ViewerSettings::default()
        };
        let layout = resolve_layout(&request, &mut host, "V", 1, &unlinked).unwrap();
        assert_eq!(layout.slot(SlotId::Second).container, "c2");
    }
}
