//! Render pass layout.
//!
//! A pass is one named stream of per-pixel floats with a fixed number of
//! components. The ordered pass list of a [`BufferParams`](super::BufferParams)
//! defines the interleaved channel layout of every pixel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Component layout of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    /// Single scalar, e.g. depth
    Value,
    /// Three-component vector, e.g. normal
    Vector,
    /// RGB color
    Color,
    /// RGB color with alpha
    Rgba,
}

impl PassKind {
    /// Channel suffixes, in storage order.
    pub fn components(self) -> &'static [&'static str] {
        match self {
            PassKind::Value => &["Z"],
            PassKind::Vector => &["X", "Y", "Z"],
            PassKind::Color => &["R", "G", "B"],
            PassKind::Rgba => &["R", "G", "B", "A"],
        }
    }

    #[inline]
    pub fn num_components(self) -> usize {
        self.components().len()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PassKind::Value => "value",
            PassKind::Vector => "vector",
            PassKind::Color => "color",
            PassKind::Rgba => "rgba",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "value" => Ok(PassKind::Value),
            "vector" => Ok(PassKind::Vector),
            "color" => Ok(PassKind::Color),
            "rgba" => Ok(PassKind::Rgba),
            other => Err(format!(
                "unknown pass kind '{}' (expected value, vector, color or rgba)",
                other
            )),
        }
    }
}

/// One enabled render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferPass {
    pub name: String,
    pub kind: PassKind,
}

impl BufferPass {
    pub fn new(name: impl Into<String>, kind: PassKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Standard beauty pass (`Combined`, RGBA).
    pub fn combined() -> Self {
        Self::new("Combined", PassKind::Rgba)
    }

    /// Standard depth pass (`Depth`, single value).
    pub fn depth() -> Self {
        Self::new("Depth", PassKind::Value)
    }

    /// Fully qualified channel names, e.g. `Combined.R`.
    pub fn channel_names(&self) -> impl Iterator<Item = String> + '_ {
        self.kind
            .components()
            .iter()
            .map(move |suffix| format!("{}.{}", self.name, suffix))
    }
}

/// Parses `name:kind`, e.g. `Normal:vector`. A bare name defaults to `color`.
impl FromStr for BufferPass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, kind) = match s.split_once(':') {
            Some((name, kind)) => (name.trim(), kind.trim().parse()?),
            None => (s.trim(), PassKind::Color),
        };
        if name.is_empty() {
            return Err(format!("pass '{}' has an empty name", s));
        }
        if name.contains('.') {
            return Err(format!("pass name '{}' must not contain '.'", name));
        }
        Ok(BufferPass::new(name, kind))
    }
}
