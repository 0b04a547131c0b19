//! Page order reconstruction for duplex scans.
//!
//! The feeder scans the front faces of a stack in order, then the stack is
//! flipped and the back faces come out in reverse. With `N` sheets the merged
//! document therefore alternates front page `k` with back page `N - k + 1`.

use serde::Serialize;

use crate::osd::RotationDecision;
use crate::merge::pages::PageRotation;

/// Which input a page comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

/// One page of the merged document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSlot {
    /// 1-based position in the output.
    pub position: u32,

    /// Input the page is taken from.
    pub side: Side,

    /// 1-based page number within that input.
    pub source_page: u32,

    /// Rotation decision, once resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationDecision>,
}

impl PageSlot {
    /// Rotation to apply; unresolved slots are left as scanned.
    pub fn applied_rotation(&self) -> PageRotation {
        self.rotation
            .as_ref()
            .map(RotationDecision::applied_rotation)
            .unwrap_or_default()
    }

    /// File stem for the rendered image of this slot.
    pub fn image_stem(&self) -> String {
        format!("{}_{:04}", self.side.as_str(), self.source_page)
    }
}

/// Plan the `2 * pages_per_side` output slots.
///
/// Position `2k - 1` holds front page `k` and position `2k` holds back page
/// `pages_per_side - k + 1`.
pub fn interleave(pages_per_side: u32) -> Vec<PageSlot> {
    (1..=pages_per_side)
        .flat_map(|k| {
            [
                PageSlot {
                    position: 2 * k - 1,
                    side: Side::Front,
                    source_page: k,
                    rotation: None,
                },
                PageSlot {
                    position: 2 * k,
                    side: Side::Back,
                    source_page: pages_per_side - k + 1,
                    rotation: None,
                },
            ]
        })
        .collect()
}
