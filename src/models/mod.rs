use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{num::NonZeroU32, str::FromStr};

use crate::error::AppError;

pub mod media;
pub mod review;

pub use media::{Media, MediaItem, MediaKind};
pub use review::{
    BatchReport, ItemResult, NewReview, Rating, Review, ReviewOutcome, ReviewSubmission,
};

/// A registered user. The stored credential hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A user's favorite media item, unique per (user, media)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub media_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A notification row for a user. Append-only; never consumed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Why a recommendation was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationBasis {
    Favorites,
    TopRated,
}

/// A recommended media item. Derived on request, not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub user_id: i64,
    pub media: Media,
    pub basis: RecommendationBasis,
    pub generated_by_system: bool,
}

/// Average rating of a media item; undefined when it has no reviews
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvgRating {
    Rated(f64),
    NoRatings,
}

impl AvgRating {
    const NO_RATINGS: &'static str = "No Ratings";

    /// Builds from a raw store average, rounding to two decimals
    pub fn from_average(avg: Option<f64>) -> Self {
        match avg {
            Some(value) => AvgRating::Rated(round2(value)),
            None => AvgRating::NoRatings,
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Serialize for AvgRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AvgRating::Rated(value) => serializer.serialize_f64(*value),
            AvgRating::NoRatings => serializer.serialize_str(Self::NO_RATINGS),
        }
    }
}

impl<'de> Deserialize<'de> for AvgRating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Value(f64),
            Label(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Value(value) => Ok(AvgRating::Rated(value)),
            Repr::Label(label) if label == Self::NO_RATINGS => Ok(AvgRating::NoRatings),
            Repr::Label(other) => Err(de::Error::custom(format!(
                "unexpected average rating label '{}'",
                other
            ))),
        }
    }
}

/// Aggregate row returned by the store for catalog listings
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub id: i64,
    pub title: String,
    pub kind: MediaKind,
    pub avg_rating: Option<f64>,
}

/// One rendered line of the catalog listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub details: String,
    pub avg_rating: AvgRating,
}

impl From<CatalogRow> for CatalogEntry {
    fn from(row: CatalogRow) -> Self {
        let details = MediaItem::new(&row.title, &row.kind).details();
        Self {
            id: row.id,
            details,
            avg_rating: AvgRating::from_average(row.avg_rating),
        }
    }
}

/// Media item with at least one review, ranked by average rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRated {
    pub id: i64,
    pub title: String,
    pub kind: MediaKind,
    pub avg_rating: f64,
}

impl From<TopRated> for Media {
    fn from(top: TopRated) -> Self {
        Media {
            id: top.id,
            title: top.title,
            kind: top.kind,
        }
    }
}

/// How many catalog rows a listing should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListLimit {
    #[default]
    All,
    Count(NonZeroU32),
}

impl ListLimit {
    pub fn as_sql_limit(self) -> Option<i64> {
        match self {
            ListLimit::All => None,
            ListLimit::Count(n) => Some(i64::from(n.get())),
        }
    }
}

impl FromStr for ListLimit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ListLimit::All);
        }
        s.parse::<NonZeroU32>().map(ListLimit::Count).map_err(|_| {
            AppError::Validation(format!(
                "Limit must be 'all' or a positive integer, got '{}'",
                s
            ))
        })
    }
}

impl<'de> Deserialize<'de> for ListLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
