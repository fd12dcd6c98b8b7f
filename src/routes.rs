use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{Director, DirectorPatch, Movie, MoviePatch, MovieView, NewDirector, NewMovie},
};

/// JSON request body whose rejections answer like every other validation error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/movies", get(list_movies).post(create_movie))
        .route("/api/movies/{id}", get(get_movie).put(update_movie).delete(delete_movie))
        .route("/api/directors", get(list_directors).post(create_director))
        .route(
            "/api/directors/{id}",
            get(get_director).put(update_director).delete(delete_director),
        )
        .with_state(state)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<MovieView>>> {
    Ok(Json(state.movies.list_details().await?))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<MovieView>> {
    Ok(Json(state.movies.get_detail(&id).await?))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<NewMovie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    body.validate()?;
    let movie = state.movies.create(body).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<MoviePatch>,
) -> AppResult<Json<Movie>> {
    body.validate()?;
    Ok(Json(state.movies.update(&id, body).await?))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.movies.delete(&id).await?;
    Ok(Json(json!({ "message": "Movie deleted successfully" })))
}

pub async fn list_directors(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<Director>>> {
    Ok(Json(state.directors.get_all().await?))
}

pub async fn get_director(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Director>> {
    Ok(Json(state.directors.get_by_id(&id).await?))
}

pub async fn create_director(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<NewDirector>,
) -> AppResult<(StatusCode, Json<Director>)> {
    body.validate()?;
    let director = state.directors.create(body).await?;
    Ok((StatusCode::CREATED, Json(director)))
}

pub async fn update_director(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<DirectorPatch>,
) -> AppResult<Json<Director>> {
    body.validate()?;
    Ok(Json(state.directors.update(&id, body).await?))
}

pub async fn delete_director(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.directors.delete(&id).await?;
    Ok(Json(json!({ "message": "Director deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{cache::MemoryCache, db};

    async fn app() -> Router {
        let state = AppState::new(db::memory().await, Arc::new(MemoryCache::new()), 3600);
        router(Arc::new(state))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value =
            if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn director_with_movie_lifecycle() {
        let app = app().await;

        let (status, director) = send(
            &app,
            Method::POST,
            "/api/directors",
            Some(json!({ "firstName": "Quentin", "secondName": "Tarantino" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let director_id = director["id"].as_str().unwrap().to_string();

        let (status, movie) = send(
            &app,
            Method::POST,
            "/api/movies",
            Some(json!({
                "title": "Jackie Brown",
                "description": "A flight attendant gets caught smuggling.",
                "releaseDate": "1997-12-25",
                "genre": "Crime",
                "rating": 7.5,
                "directorId": director_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let movie_id = movie["id"].as_str().unwrap().to_string();

        let (status, detail) =
            send(&app, Method::GET, &format!("/api/movies/{movie_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["director"]["secondName"], "Tarantino");

        let (status, body) =
            send(&app, Method::DELETE, &format!("/api/directors/{director_id}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().unwrap().contains("1 movie"));

        let (status, _) =
            send(&app, Method::DELETE, &format!("/api/movies/{movie_id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&app, Method::DELETE, &format!("/api/movies/{movie_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], format!("Movie with ID {movie_id} not found."));

        let (status, _) =
            send(&app, Method::DELETE, &format!("/api/directors/{director_id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, list) = send(&app, Method::GET, "/api/directors", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn unknown_ids_map_to_not_found() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/api/movies/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Movie with ID missing not found.");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/directors/missing",
            Some(json!({ "bio": "unknown" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_bodies_map_to_bad_request() {
        let app = app().await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/movies",
            Some(json!({
                "title": "Too good",
                "description": "Off the scale",
                "releaseDate": "2001-01-01",
                "genre": "Drama",
                "rating": 11,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PUT, "/api/movies/any", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn undecodable_bodies_map_to_bad_request_with_message() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/movies",
            Some(json!({
                "description": "No title",
                "releaseDate": "2001-01-01",
                "genre": "Drama",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("title"), "{body}");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/movies",
            Some(json!({
                "title": "Bad date",
                "description": "Unparseable release",
                "releaseDate": "not-a-date",
                "genre": "Drama",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/directors",
            Some(json!({
                "firstName": "Quentin",
                "secondName": "Tarantino",
                "birthDate": "1963-03-27T00:00:00Z",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, _) =
            send(&app, Method::PUT, "/api/movies/any", Some(json!({ "rating": "high" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, list) = send(&app, Method::GET, "/api/movies", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn unknown_director_reference_is_bad_request() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/movies",
            Some(json!({
                "title": "Orphan",
                "description": "No one made this",
                "releaseDate": "2001-01-01",
                "genre": "Drama",
                "directorId": "ghost",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Director with provided ID does not exist.");
    }
}
