use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MAX_RATING: f64 = 10.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Director {
    pub id: String,
    pub first_name: String,
    pub second_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDirector {
    pub first_name: String,
    pub second_name: String,
    #[serde(default)]
    pub birth_date: Option<Date>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Partial director update. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub second_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<Date>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub description: String,
    pub release_date: Date,
    pub genre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    pub title: String,
    pub description: String,
    pub release_date: Date,
    pub genre: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub director_id: Option<String>,
}

/// Partial movie update. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub release_date: Option<Date>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub director_id: Option<String>,
}

/// Read model: a movie with its director reference expanded.
///
/// Built after retrieval and never written back to the store or the cache.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieView {
    #[serde(flatten)]
    pub movie: Movie,
    pub director: Option<Director>,
}

impl MovieView {
    pub fn expand(movie: Movie, directors: &[Director]) -> Self {
        let director = movie
            .director_id
            .as_deref()
            .and_then(|id| directors.iter().find(|d| d.id == id))
            .cloned();
        Self { movie, director }
    }
}

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_if_present(field: &str, value: Option<&str>) -> AppResult<()> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(AppError::Validation(format!("{field} must not be empty")))
        },
        _ => Ok(()),
    }
}

fn check_rating(rating: Option<f64>) -> AppResult<()> {
    match rating {
        Some(r) if !(0.0..=MAX_RATING).contains(&r) => Err(AppError::Validation(format!(
            "rating must be between 0 and {MAX_RATING}"
        ))),
        _ => Ok(()),
    }
}

impl NewDirector {
    pub fn validate(&self) -> AppResult<()> {
        require("firstName", &self.first_name)?;
        require("secondName", &self.second_name)
    }
}

impl DirectorPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(AppError::Validation(
                "Update data must contain at least one field".to_string(),
            ));
        }
        require_if_present("firstName", self.first_name.as_deref())?;
        require_if_present("secondName", self.second_name.as_deref())
    }
}

impl NewMovie {
    pub fn validate(&self) -> AppResult<()> {
        require("title", &self.title)?;
        require("description", &self.description)?;
        require("genre", &self.genre)?;
        require_if_present("imdbId", self.imdb_id.as_deref())?;
        require_if_present("directorId", self.director_id.as_deref())?;
        check_rating(self.rating)
    }
}

impl MoviePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(AppError::Validation(
                "Update data must contain at least one field".to_string(),
            ));
        }
        require_if_present("title", self.title.as_deref())?;
        require_if_present("description", self.description.as_deref())?;
        require_if_present("genre", self.genre.as_deref())?;
        require_if_present("imdbId", self.imdb_id.as_deref())?;
        require_if_present("directorId", self.director_id.as_deref())?;
        check_rating(self.rating)
    }
}
