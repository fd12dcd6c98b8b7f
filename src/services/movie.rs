use std::sync::Arc;

use tracing::debug;

use super::EntityCache;
use crate::{
    cache::{Cache, MOVIE_KEYS},
    error::{AppError, AppResult},
    models::{Movie, MoviePatch, MovieView, NewMovie},
    repository::{DirectorRepository, MovieRepository, imdb_id_taken},
};

#[derive(Clone)]
pub struct MovieService {
    movies: Arc<dyn MovieRepository>,
    directors: Arc<dyn DirectorRepository>,
    cache: EntityCache,
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Movie with ID {id} not found."))
}

impl MovieService {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        directors: Arc<dyn DirectorRepository>,
        cache: Arc<dyn Cache>,
        ttl_seconds: u64,
    ) -> Self {
        Self { movies, directors, cache: EntityCache::new(cache, MOVIE_KEYS, ttl_seconds) }
    }

    pub async fn create(&self, data: NewMovie) -> AppResult<Movie> {
        if let Some(director_id) = data.director_id.as_deref() {
            self.ensure_director_exists(director_id, "Director with provided ID does not exist.")
                .await?;
        }
        if let Some(imdb_id) = data.imdb_id.as_deref() {
            self.ensure_imdb_id_free(imdb_id, None).await?;
        }

        let movie = self.movies.create(data).await?;
        debug!(movie_id = %movie.id, "movie created");

        self.cache.refresh_collection(self.movies.find_all()).await?;
        Ok(movie)
    }

    pub async fn get_all(&self) -> AppResult<Vec<Movie>> {
        if let Some(movies) = self.cache.read_collection().await {
            return Ok(movies);
        }

        let movies = self.movies.find_all().await?;
        self.cache.populate_collection(&movies).await;
        Ok(movies)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Movie> {
        if let Some(movie) = self.cache.read_entity(id).await {
            return Ok(movie);
        }

        let movie = self.movies.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        self.cache.populate_entity(id, &movie).await;
        Ok(movie)
    }

    /// Movie with its director embedded. Directors are read from the store,
    /// the movie itself goes through the cache like [`Self::get_by_id`].
    pub async fn get_detail(&self, id: &str) -> AppResult<MovieView> {
        let movie = self.get_by_id(id).await?;
        let director = match movie.director_id.as_deref() {
            Some(director_id) => self.directors.find_by_id(director_id).await?,
            None => None,
        };
        Ok(MovieView { movie, director })
    }

    pub async fn list_details(&self) -> AppResult<Vec<MovieView>> {
        let movies = self.get_all().await?;
        if movies.iter().all(|m| m.director_id.is_none()) {
            let views = movies.into_iter().map(|movie| MovieView { movie, director: None });
            return Ok(views.collect());
        }

        let directors = self.directors.find_all().await?;
        Ok(movies.into_iter().map(|movie| MovieView::expand(movie, &directors)).collect())
    }

    pub async fn update(&self, id: &str, patch: MoviePatch) -> AppResult<Movie> {
        let existing = self.movies.find_by_id(id).await?.ok_or_else(|| not_found(id))?;

        if let Some(director_id) = patch.director_id.as_deref() {
            if existing.director_id.as_deref() != Some(director_id) {
                self.ensure_director_exists(
                    director_id,
                    "Director with provided new ID does not exist.",
                )
                .await?;
            }
        }
        if let Some(imdb_id) = patch.imdb_id.as_deref() {
            if existing.imdb_id.as_deref() != Some(imdb_id) {
                self.ensure_imdb_id_free(imdb_id, Some(id)).await?;
            }
        }

        self.cache.invalidate_entity(id).await?;
        let movie = self.movies.update(id, patch).await?.ok_or_else(|| not_found(id))?;
        debug!(movie_id = %id, "movie updated");

        self.cache.refresh_collection(self.movies.find_all()).await?;
        Ok(movie)
    }

    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        self.cache.invalidate_entity(id).await?;

        if self.movies.find_by_id(id).await?.is_none() {
            return Err(not_found(id));
        }

        if !self.movies.delete(id).await? {
            return Err(not_found(id));
        }
        debug!(movie_id = %id, "movie deleted");

        self.cache.refresh_collection(self.movies.find_all()).await?;
        Ok(true)
    }

    async fn ensure_director_exists(&self, director_id: &str, message: &str) -> AppResult<()> {
        if self.directors.find_by_id(director_id).await?.is_none() {
            debug!(director_id = %director_id, "rejecting unknown director reference");
            return Err(AppError::Validation(message.to_string()));
        }
        Ok(())
    }

    async fn ensure_imdb_id_free(&self, imdb_id: &str, owner: Option<&str>) -> AppResult<()> {
        match self.movies.find_by_imdb_id(imdb_id).await? {
            Some(other) if Some(other.id.as_str()) != owner => Err(imdb_id_taken(imdb_id)),
            _ => Ok(()),
        }
    }
}
