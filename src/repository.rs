use async_trait::async_trait;
use jiff::civil::Date;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use uuid::Uuid;

use crate::{
    entities::{director, movie},
    error::{AppError, AppResult},
    models::{Director, DirectorPatch, Movie, MoviePatch, NewDirector, NewMovie},
};

#[async_trait]
pub trait DirectorRepository: Send + Sync {
    async fn create(&self, data: NewDirector) -> AppResult<Director>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Director>>;
    async fn find_all(&self) -> AppResult<Vec<Director>>;
    async fn update(&self, id: &str, patch: DirectorPatch) -> AppResult<Option<Director>>;
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn create(&self, data: NewMovie) -> AppResult<Movie>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Movie>>;
    async fn find_all(&self) -> AppResult<Vec<Movie>>;
    async fn find_by_director_id(&self, director_id: &str) -> AppResult<Vec<Movie>>;
    async fn find_by_imdb_id(&self, imdb_id: &str) -> AppResult<Option<Movie>>;
    async fn update(&self, id: &str, patch: MoviePatch) -> AppResult<Option<Movie>>;
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

#[derive(Clone, Debug)]
pub struct SeaDirectorRepository {
    db: DatabaseConnection,
}

impl SeaDirectorRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DirectorRepository for SeaDirectorRepository {
    async fn create(&self, data: NewDirector) -> AppResult<Director> {
        let model = director::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            first_name: Set(data.first_name),
            second_name: Set(data.second_name),
            birth_date: Set(data.birth_date.map(|d| d.to_string())),
            bio: Set(data.bio),
        };
        Director::try_from(model.insert(&self.db).await?)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Director>> {
        director::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(Director::try_from)
            .transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<Director>> {
        director::Entity::find().all(&self.db).await?.into_iter().map(Director::try_from).collect()
    }

    async fn update(&self, id: &str, patch: DirectorPatch) -> AppResult<Option<Director>> {
        let Some(existing) = director::Entity::find_by_id(id.to_string()).one(&self.db).await?
        else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Director::try_from(existing).map(Some);
        }

        let mut model: director::ActiveModel = existing.into();
        if let Some(first_name) = patch.first_name {
            model.first_name = Set(first_name);
        }
        if let Some(second_name) = patch.second_name {
            model.second_name = Set(second_name);
        }
        if let Some(birth_date) = patch.birth_date {
            model.birth_date = Set(Some(birth_date.to_string()));
        }
        if let Some(bio) = patch.bio {
            model.bio = Set(Some(bio));
        }

        match model.update(&self.db).await {
            Ok(row) => Director::try_from(row).map(Some),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let res = director::Entity::delete_by_id(id.to_string()).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}

#[derive(Clone, Debug)]
pub struct SeaMovieRepository {
    db: DatabaseConnection,
}

impl SeaMovieRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MovieRepository for SeaMovieRepository {
    async fn create(&self, data: NewMovie) -> AppResult<Movie> {
        let imdb_id = data.imdb_id.clone();
        let model = movie::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            title: Set(data.title),
            description: Set(data.description),
            release_date: Set(data.release_date.to_string()),
            genre: Set(data.genre),
            rating: Set(data.rating),
            imdb_id: Set(data.imdb_id),
            director_id: Set(data.director_id),
        };
        let row = model.insert(&self.db).await.map_err(|err| write_error(err, imdb_id.as_deref()))?;
        Movie::try_from(row)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Movie>> {
        movie::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(Movie::try_from)
            .transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<Movie>> {
        movie::Entity::find().all(&self.db).await?.into_iter().map(Movie::try_from).collect()
    }

    async fn find_by_director_id(&self, director_id: &str) -> AppResult<Vec<Movie>> {
        movie::Entity::find()
            .filter(movie::Column::DirectorId.eq(director_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(Movie::try_from)
            .collect()
    }

    async fn find_by_imdb_id(&self, imdb_id: &str) -> AppResult<Option<Movie>> {
        movie::Entity::find()
            .filter(movie::Column::ImdbId.eq(imdb_id))
            .one(&self.db)
            .await?
            .map(Movie::try_from)
            .transpose()
    }

    async fn update(&self, id: &str, patch: MoviePatch) -> AppResult<Option<Movie>> {
        let Some(existing) = movie::Entity::find_by_id(id.to_string()).one(&self.db).await? else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Movie::try_from(existing).map(Some);
        }

        let mut model: movie::ActiveModel = existing.into();
        if let Some(title) = patch.title {
            model.title = Set(title);
        }
        if let Some(description) = patch.description {
            model.description = Set(description);
        }
        if let Some(release_date) = patch.release_date {
            model.release_date = Set(release_date.to_string());
        }
        if let Some(genre) = patch.genre {
            model.genre = Set(genre);
        }
        if let Some(rating) = patch.rating {
            model.rating = Set(Some(rating));
        }
        let imdb_id = patch.imdb_id;
        if let Some(imdb_id) = &imdb_id {
            model.imdb_id = Set(Some(imdb_id.clone()));
        }
        if let Some(director_id) = patch.director_id {
            model.director_id = Set(Some(director_id));
        }

        match model.update(&self.db).await {
            Ok(row) => Movie::try_from(row).map(Some),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(err) => Err(write_error(err, imdb_id.as_deref())),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let res = movie::Entity::delete_by_id(id.to_string()).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}

pub fn imdb_id_taken(imdb_id: &str) -> AppError {
    AppError::Validation(format!("Movie with IMDb ID {imdb_id} already exists."))
}

/// `imdb_id` is the only unique column besides the primary key, so a unique
/// violation on a write that carries one is a duplicate IMDb ID.
fn write_error(err: DbErr, imdb_id: Option<&str>) -> AppError {
    let unique = matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)));
    match imdb_id {
        Some(imdb_id) if unique => imdb_id_taken(imdb_id),
        _ => err.into(),
    }
}

fn parse_date(raw: &str) -> AppResult<Date> {
    Ok(raw.parse()?)
}

impl TryFrom<director::Model> for Director {
    type Error = AppError;

    fn try_from(row: director::Model) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            first_name: row.first_name,
            second_name: row.second_name,
            birth_date: row.birth_date.as_deref().map(parse_date).transpose()?,
            bio: row.bio,
        })
    }
}

impl TryFrom<movie::Model> for Movie {
    type Error = AppError;

    fn try_from(row: movie::Model) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            release_date: parse_date(&row.release_date)?,
            genre: row.genre,
            rating: row.rating,
            imdb_id: row.imdb_id,
            director_id: row.director_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn new_movie(title: &str, imdb_id: Option<&str>, director_id: Option<&str>) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            description: "A film".to_string(),
            release_date: jiff::civil::date(1994, 10, 14),
            genre: "Crime".to_string(),
            rating: Some(8.9),
            imdb_id: imdb_id.map(str::to_string),
            director_id: director_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn director_rows_round_trip_dates() {
        let repo = SeaDirectorRepository::new(db::memory().await);
        let created = repo
            .create(NewDirector {
                first_name: "Quentin".to_string(),
                second_name: "Tarantino".to_string(),
                birth_date: Some(jiff::civil::date(1963, 3, 27)),
                bio: None,
            })
            .await
            .unwrap();

        assert!(!created.id.is_empty());
        let found = repo.find_by_id(&created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn movies_filter_by_director_and_imdb_id() {
        let repo = SeaMovieRepository::new(db::memory().await);
        let pulp = new_movie("Pulp Fiction", Some("tt0110912"), Some("d1"));
        let a = repo.create(pulp).await.unwrap();
        repo.create(new_movie("Heat", None, Some("d2"))).await.unwrap();

        let by_director = repo.find_by_director_id("d1").await.unwrap();
        assert_eq!(by_director, vec![a.clone()]);

        assert_eq!(repo.find_by_imdb_id("tt0110912").await.unwrap(), Some(a));
        assert_eq!(repo.find_by_imdb_id("tt9999999").await.unwrap(), None);
        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let repo = SeaMovieRepository::new(db::memory().await);
        let created = repo.create(new_movie("Heat", None, None)).await.unwrap();

        let patch = MoviePatch { genre: Some("Thriller".to_string()), ..Default::default() };
        let updated = repo.update(&created.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.genre, "Thriller");
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.rating, created.rating);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let repo = SeaDirectorRepository::new(db::memory().await);
        let patch = DirectorPatch { bio: Some("x".to_string()), ..Default::default() };

        assert_eq!(repo.update("missing", patch).await.unwrap(), None);
        assert!(!repo.delete("missing").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_imdb_id_writes_are_validation_errors() {
        let repo = SeaMovieRepository::new(db::memory().await);
        repo.create(new_movie("Heat", Some("tt0113277"), None)).await.unwrap();

        let err = repo.create(new_movie("Heat again", Some("tt0113277"), None)).await.unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("tt0113277"), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let other = repo.create(new_movie("Collateral", None, None)).await.unwrap();
        let patch = MoviePatch { imdb_id: Some("tt0113277".to_string()), ..Default::default() };
        assert!(matches!(repo.update(&other.id, patch).await, Err(AppError::Validation(_))));
        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }
}
