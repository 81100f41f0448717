use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

/// Kind of a catalogued media item, as stored in the `media.kind` column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Movie,
    WebShow,
    Song,
    Cartoon,
    /// A stored kind this build does not recognize; keeps the raw value
    Unknown(String),
}

impl MediaKind {
    /// Kinds accepted when adding to the catalog
    pub const CATALOGUED: [MediaKind; 4] = [
        MediaKind::Movie,
        MediaKind::WebShow,
        MediaKind::Song,
        MediaKind::Cartoon,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Movie => "Movie",
            MediaKind::WebShow => "WebShow",
            MediaKind::Song => "Song",
            MediaKind::Cartoon => "Cartoon",
            MediaKind::Unknown(raw) => raw,
        }
    }

    /// Maps a stored kind string onto a kind. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Movie" => MediaKind::Movie,
            "WebShow" => MediaKind::WebShow,
            "Song" => MediaKind::Song,
            "Cartoon" => MediaKind::Cartoon,
            other => MediaKind::Unknown(other.to_string()),
        }
    }

    /// Parses a kind supplied by a client. Only catalogued kinds are accepted.
    pub fn from_input(raw: &str) -> AppResult<Self> {
        match Self::parse(raw.trim()) {
            MediaKind::Unknown(other) => Err(AppError::Validation(format!(
                "Invalid media type '{}'. Choose from {}",
                other,
                Self::CATALOGUED
                    .iter()
                    .map(MediaKind::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
            kind => Ok(kind),
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for MediaKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MediaKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MediaKind::parse(&raw))
    }
}

/// A catalogued media row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub title: String,
    pub kind: MediaKind,
}

/// Display variants of the media taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItem {
    Movie { title: String },
    WebShow { title: String },
    Cartoon { title: String },
    Song { title: String },
    /// Fallback for unrecognized kinds; renders the bare title
    Generic { title: String, kind: String },
}

impl MediaItem {
    pub fn new(title: &str, kind: &MediaKind) -> Self {
        let title = title.to_string();
        match kind {
            MediaKind::Movie => MediaItem::Movie { title },
            MediaKind::WebShow => MediaItem::WebShow { title },
            MediaKind::Cartoon => MediaItem::Cartoon { title },
            MediaKind::Song => MediaItem::Song { title },
            MediaKind::Unknown(raw) => {
                tracing::warn!(
                    kind = %raw,
                    title = %title,
                    "Unknown media type, defaulting to generic media"
                );
                MediaItem::Generic {
                    title,
                    kind: raw.clone(),
                }
            }
        }
    }

    /// Human-readable details line, e.g. `Movie: Heat`
    pub fn details(&self) -> String {
        match self {
            MediaItem::Movie { title } => format!("Movie: {}", title),
            MediaItem::WebShow { title } => format!("WebShow: {}", title),
            MediaItem::Cartoon { title } => format!("Cartoon: {}", title),
            MediaItem::Song { title } => format!("Song: {}", title),
            MediaItem::Generic { title, .. } => title.clone(),
        }
    }
}
