use std::sync::Arc;

use tracing::debug;

use super::EntityCache;
use crate::{
    cache::{Cache, DIRECTOR_KEYS},
    error::{AppError, AppResult},
    models::{Director, DirectorPatch, NewDirector},
    repository::{DirectorRepository, MovieRepository},
};

#[derive(Clone)]
pub struct DirectorService {
    directors: Arc<dyn DirectorRepository>,
    movies: Arc<dyn MovieRepository>,
    cache: EntityCache,
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Director with ID {id} not found."))
}

impl DirectorService {
    pub fn new(
        directors: Arc<dyn DirectorRepository>,
        movies: Arc<dyn MovieRepository>,
        cache: Arc<dyn Cache>,
        ttl_seconds: u64,
    ) -> Self {
        Self { directors, movies, cache: EntityCache::new(cache, DIRECTOR_KEYS, ttl_seconds) }
    }

    pub async fn create(&self, data: NewDirector) -> AppResult<Director> {
        let director = self.directors.create(data).await?;
        debug!(director_id = %director.id, "director created");

        self.cache.refresh_collection(self.directors.find_all()).await?;
        Ok(director)
    }

    pub async fn get_all(&self) -> AppResult<Vec<Director>> {
        if let Some(directors) = self.cache.read_collection().await {
            return Ok(directors);
        }

        let directors = self.directors.find_all().await?;
        self.cache.populate_collection(&directors).await;
        Ok(directors)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Director> {
        if let Some(director) = self.cache.read_entity(id).await {
            return Ok(director);
        }

        let director = self.directors.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        self.cache.populate_entity(id, &director).await;
        Ok(director)
    }

    pub async fn update(&self, id: &str, patch: DirectorPatch) -> AppResult<Director> {
        if self.directors.find_by_id(id).await?.is_none() {
            return Err(not_found(id));
        }

        self.cache.invalidate_entity(id).await?;
        let director = self.directors.update(id, patch).await?.ok_or_else(|| not_found(id))?;
        debug!(director_id = %id, "director updated");

        self.cache.refresh_collection(self.directors.find_all()).await?;
        Ok(director)
    }

    /// Deletes a director that no movie references.
    ///
    /// Fails with [`AppError::Conflict`] while any movie still points at the
    /// director; nothing is cascaded.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        self.cache.invalidate_entity(id).await?;

        if self.directors.find_by_id(id).await?.is_none() {
            return Err(not_found(id));
        }

        let related = self.movies.find_by_director_id(id).await?.len();
        if related > 0 {
            let movies = if related == 1 {
                "1 movie is".to_string()
            } else {
                format!("{related} movies are")
            };
            return Err(AppError::Conflict(format!(
                "Cannot delete director with ID {id} because {movies} associated with them."
            )));
        }

        if !self.directors.delete(id).await? {
            return Err(not_found(id));
        }
        debug!(director_id = %id, "director deleted");

        self.cache.refresh_collection(self.directors.find_all()).await?;
        Ok(true)
    }
}
