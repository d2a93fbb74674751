//! UI preference keys persisted separately from the dataset.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Selectable color theme. The key is all that is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKey {
    #[default]
    Pink,
    Teal,
    Amber,
    Neutral,
    Red,
    Green,
    Blue,
}

impl ThemeKey {
    pub const ALL: [ThemeKey; 7] = [
        ThemeKey::Pink,
        ThemeKey::Teal,
        ThemeKey::Amber,
        ThemeKey::Neutral,
        ThemeKey::Red,
        ThemeKey::Green,
        ThemeKey::Blue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pink => "pink",
            Self::Teal => "teal",
            Self::Amber => "amber",
            Self::Neutral => "neutral",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }
}

impl Display for ThemeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeKey {
    type Err = UnknownPreference;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| UnknownPreference {
                kind: "theme",
                value: value.to_string(),
            })
    }
}

/// Read-time ordering of groups and people.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMode {
    /// Name ascending.
    #[serde(rename = "az")]
    Az,
    /// Name descending.
    #[serde(rename = "za")]
    Za,
    /// Most recently updated first.
    #[default]
    #[serde(rename = "recent")]
    Recent,
}

impl SortMode {
    pub const ALL: [SortMode; 3] = [SortMode::Az, SortMode::Za, SortMode::Recent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Az => "az",
            Self::Za => "za",
            Self::Recent => "recent",
        }
    }
}

impl Display for SortMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = UnknownPreference;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| UnknownPreference {
                kind: "sort",
                value: value.to_string(),
            })
    }
}

/// Theme and sort selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: ThemeKey,
    pub sort: SortMode,
}

/// Unrecognized theme or sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPreference {
    pub kind: &'static str,
    pub value: String,
}

impl Display for UnknownPreference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} key `{}`", self.kind, self.value)
    }
}

impl std::error::Error for UnknownPreference {}
