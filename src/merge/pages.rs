//! Page-level operations.
//!
//! This module handles:
//! - Page rotation angles and their composition
//! - Applying a rotation to a page dictionary
//! - Copying inherited page attributes onto the page itself

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use crate::error::{Result, ReturnScanError};

/// Page attributes a page may inherit from its ancestors in the page tree.
static INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Upper bound on page tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Page rotation angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "u16")]
pub enum PageRotation {
    /// No rotation.
    #[default]
    None,
    /// Rotate 90 degrees clockwise.
    Clockwise90,
    /// Rotate 180 degrees.
    Rotate180,
    /// Rotate 270 degrees clockwise.
    Clockwise270,
}

impl PageRotation {
    /// Parse one of the four cardinal angles; anything else is rejected.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees {
            0 => Some(Self::None),
            90 => Some(Self::Clockwise90),
            180 => Some(Self::Rotate180),
            270 => Some(Self::Clockwise270),
            _ => None,
        }
    }

    /// Get rotation as degrees.
    pub fn as_degrees(&self) -> i64 {
        match self {
            Self::None => 0,
            Self::Clockwise90 => 90,
            Self::Rotate180 => 180,
            Self::Clockwise270 => 270,
        }
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Clockwise90 => Self::Clockwise270,
            Self::Rotate180 => Self::Rotate180,
            Self::Clockwise270 => Self::Clockwise90,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::None
    }
}

impl From<PageRotation> for u16 {
    fn from(rotation: PageRotation) -> Self {
        rotation.as_degrees() as u16
    }
}

/// Rotate a page dictionary by `rotation`.
///
/// The angle is added to the page's existing `/Rotate` value modulo 360.
/// [`PageRotation::None`] leaves the dictionary untouched.
pub fn apply_rotation(page: &mut Dictionary, rotation: PageRotation) {
    if rotation.is_none() {
        return;
    }

    let current = page.get(b"Rotate").and_then(|r| r.as_i64()).unwrap_or(0);
    let rotated = (current + rotation.as_degrees()).rem_euclid(360);

    page.set("Rotate", Object::Integer(rotated));
}

/// Read the effective `/Rotate` value of a page dictionary in degrees.
pub fn page_rotation_degrees(page: &Dictionary) -> i64 {
    page.get(b"Rotate")
        .and_then(|r| r.as_i64())
        .unwrap_or(0)
        .rem_euclid(360)
}

/// Copy inheritable attributes from the page tree onto every page.
///
/// Pages that are moved under a new parent would otherwise lose the
/// `MediaBox`, `Resources` or `Rotate` they picked up from their old one.
///
/// # Errors
///
/// Returns an error if a page object is not a dictionary.
pub fn materialize_inherited_attributes(doc: &mut Document) -> Result<()> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let inherited: Vec<(&[u8], Object)> = {
            let page = doc
                .get_dictionary(page_id)
                .map_err(|e| ReturnScanError::merge_failed(format!("Failed to get page: {e}")))?;

            INHERITABLE_ATTRIBUTES
                .iter()
                .filter(|key| !page.has(key))
                .filter_map(|key| find_inherited(doc, page, key).map(|value| (*key, value)))
                .collect()
        };

        if inherited.is_empty() {
            continue;
        }

        let page = doc
            .get_dictionary_mut(page_id)
            .map_err(|e| ReturnScanError::merge_failed(format!("Failed to get page: {e}")))?;
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }

    Ok(())
}

fn find_inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}
