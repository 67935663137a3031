use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::require_user;
use crate::db;
use crate::error::{ApiError, Result, ensure_owner};
use crate::models::{PlaylistDetail, PlaylistRequest};
use crate::token::TokenService;
use crate::views;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create)
        .service(detail)
        .service(update)
        .service(remove)
        .service(add_video)
        .service(remove_video);
}

#[post("/playlists")]
async fn create(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    body: web::Json<PlaylistRequest>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let name = body.name.trim();
    let description = body.description.trim();
    if name.is_empty() || description.is_empty() {
        return Err(ApiError::InvalidArgument(
            "name and description are required".into(),
        ));
    }
    let playlist = db::create_playlist(&pool, user.id, name, description).await?;
    Ok(HttpResponse::Created().json(json!({ "playlist": playlist })))
}

#[get("/playlists/{playlist_id}")]
async fn detail(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> Result<HttpResponse> {
    let playlist = db::find_playlist_by_id(&pool, path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("playlist"))?;
    let videos = views::playlist_videos(&pool, playlist.id).await?;
    let detail = PlaylistDetail {
        id: playlist.id,
        name: playlist.name,
        description: playlist.description,
        owner: playlist.owner,
        created_at: playlist.created_at,
        videos,
    };
    Ok(HttpResponse::Ok().json(json!({ "playlist": detail })))
}

#[patch("/playlists/{playlist_id}")]
async fn update(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
    body: web::Json<PlaylistRequest>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let name = body.name.trim();
    let description = body.description.trim();
    if name.is_empty() || description.is_empty() {
        return Err(ApiError::InvalidArgument(
            "name and description are required".into(),
        ));
    }

    let playlist = db::find_playlist_by_id(&pool, path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("playlist"))?;
    ensure_owner(playlist.owner, user.id, "only the owner can edit this playlist")?;

    let updated = db::update_playlist(&pool, playlist.id, name, description).await?;
    Ok(HttpResponse::Ok().json(json!({ "playlist": updated })))
}

#[delete("/playlists/{playlist_id}")]
async fn remove(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;

    let playlist = db::find_playlist_by_id(&pool, path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("playlist"))?;
    ensure_owner(playlist.owner, user.id, "only the owner can delete this playlist")?;

    db::delete_playlist(&pool, playlist.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": playlist.id })))
}

#[post("/playlists/{playlist_id}/videos/{video_id}")]
async fn add_video(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let (playlist_id, video_id) = path.into_inner();

    let playlist = db::find_playlist_by_id(&pool, playlist_id)
        .await?
        .ok_or(ApiError::NotFound("playlist"))?;
    ensure_owner(playlist.owner, user.id, "only the owner can edit this playlist")?;
    if db::find_video_by_id(&pool, video_id).await?.is_none() {
        return Err(ApiError::NotFound("video"));
    }

    db::add_playlist_video(&pool, playlist_id, video_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "playlist": playlist_id, "video": video_id })))
}

#[delete("/playlists/{playlist_id}/videos/{video_id}")]
async fn remove_video(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let (playlist_id, video_id) = path.into_inner();

    let playlist = db::find_playlist_by_id(&pool, playlist_id)
        .await?
        .ok_or(ApiError::NotFound("playlist"))?;
    ensure_owner(playlist.owner, user.id, "only the owner can edit this playlist")?;

    db::remove_playlist_video(&pool, playlist_id, video_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "playlist": playlist_id, "removed": video_id })))
}
