//! The two cross-faded display slots.

use std::fmt;

pub const OPACITY_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    First,
    Second,
}

impl SlotId {
    pub const BOTH: [Self; 2] = [Self::First, Self::Second];

    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Position in a two-element array.
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// 1-based number used in element identifiers.
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.number())
    }
}

/// A load awaiting completion on a slot. Only a completion carrying the same
/// token is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub token: u64,
    pub ready: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySlot {
    pub opacity: u8,
    pub image: Option<String>,
    pub request: Option<LoadRequest>,
}

impl DisplaySlot {
    pub fn with_opacity(opacity: u8) -> Self {
        Self {
            opacity: opacity.min(OPACITY_MAX),
            ..Self::default()
        }
    }

    pub fn is_visible(&self) -> bool {
        self.opacity > 0
    }

    /// Whether a load was issued and has not completed yet.
    pub fn is_loading(&self) -> bool {
        self.request.is_some_and(|r| !r.ready)
    }
}

/// Move `outgoing` down and `incoming` up by `step`, clamped to 0..=100.
/// Returns `true` once the incoming slot is fully opaque.
pub fn fade_step(outgoing: &mut u8, incoming: &mut u8, step: u8) -> bool {
    *outgoing = outgoing.saturating_sub(step);
    *incoming = incoming.saturating_add(step).min(OPACITY_MAX);
    *incoming >= OPACITY_MAX
}
