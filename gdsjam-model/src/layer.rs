use std::{fmt, str::FromStr};

use compact_str::{CompactString, ToCompactString};

use crate::color::{layer_color, Color};

/// A `(layer, datatype)` pair — the layer/color/visibility key. Displays and
/// parses as `"L:D"`, matching the string key spec.md §3 uses to index
/// [`crate::Document::layers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerKey {
    pub layer: u16,
    pub datatype: u16,
}

impl LayerKey {
    pub fn new(layer: u16, datatype: u16) -> Self {
        Self { layer, datatype }
    }

    pub fn as_string_key(&self) -> CompactString {
        self.to_compact_string()
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.layer, self.datatype)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid layer key {0:?}, expected \"L:D\"")]
pub struct ParseLayerKeyError(CompactString);

impl FromStr for LayerKey {
    type Err = ParseLayerKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (l, d) = s.split_once(':').ok_or_else(|| ParseLayerKeyError(s.into()))?;
        let layer = l.parse().map_err(|_| ParseLayerKeyError(s.into()))?;
        let datatype = d.parse().map_err(|_| ParseLayerKeyError(s.into()))?;
        Ok(LayerKey { layer, datatype })
    }
}

/// Per-layer color and visibility state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerInfo {
    pub key: LayerKey,
    pub color: Color,
    pub visible: bool,
}

impl LayerInfo {
    /// A layer with the deterministic golden-angle color and default
    /// visibility (`true`).
    pub fn new(key: LayerKey) -> Self {
        Self { key, color: layer_color(key.layer, key.datatype), visible: true }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string_key() {
        let key = LayerKey::new(12, 3);
        assert_eq!(key.as_string_key(), "12:3");
        assert_eq!("12:3".parse::<LayerKey>().unwrap(), key);
    }

    #[test]
    fn rejects_malformed_key() {
        assert!("abc".parse::<LayerKey>().is_err());
        assert!("12".parse::<LayerKey>().is_err());
    }
}
