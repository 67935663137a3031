use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{optional_viewer, require_user};
use crate::db;
use crate::error::{ApiError, Result, ensure_owner};
use crate::media::{MediaKind, MediaStore, UploadForm};
use crate::models::UpdateVideoRequest;
use crate::pagination::PageQuery;
use crate::token::TokenService;
use crate::views::{self, FeedFilter, SortDir, SortField};

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(feed)
        .service(publish)
        .service(detail)
        .service(update)
        .service(update_thumbnail)
        .service(remove)
        .service(toggle_publish)
        .service(history);
}

#[derive(Deserialize)]
struct FeedQuery {
    page: Option<i64>,
    limit: Option<i64>,
    query: Option<String>,
    owner_id: Option<Uuid>,
    sort_by: Option<SortField>,
    sort_dir: Option<SortDir>,
}

#[get("/videos")]
async fn feed(pool: web::Data<PgPool>, params: web::Query<FeedQuery>) -> Result<HttpResponse> {
    let params = params.into_inner();
    let filter = FeedFilter {
        query: params.query,
        owner_id: params.owner_id,
        sort_by: params.sort_by,
        sort_dir: params.sort_dir,
    };
    let page = PageQuery {
        page: params.page,
        limit: params.limit,
    }
    .normalize();
    let videos = views::video_feed(&pool, &filter, page).await?;
    Ok(HttpResponse::Ok().json(videos))
}

#[post("/videos")]
async fn publish(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    media: web::Data<MediaStore>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let form = UploadForm::read(payload).await?;
    let title = form.require_field("title")?;
    let description = form.require_field("description")?;
    let duration: f64 = form
        .require_field("duration")?
        .parse()
        .map_err(|_| ApiError::InvalidArgument("duration must be a number of seconds".into()))?;
    let video_bytes = form.require_file("video_file")?;
    let thumbnail_bytes = form.require_file("thumbnail")?;

    let video_file = media.store(video_bytes, MediaKind::Video).await?;
    let thumbnail = media.store(thumbnail_bytes, MediaKind::Image).await?;

    let video = db::create_video(
        &pool,
        title,
        description,
        duration,
        &video_file.url,
        &video_file.storage_id,
        &thumbnail.url,
        &thumbnail.storage_id,
        user.id,
    )
    .await?;
    tracing::info!(video_id = %video.id, owner = %user.id, "video published");
    Ok(HttpResponse::Created().json(json!({ "video": video })))
}

#[get("/videos/{video_id}")]
async fn detail(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let viewer = optional_viewer(&req, &pool, &tokens).await?;
    let video = views::video_detail(&pool, path.into_inner(), viewer).await?;
    Ok(HttpResponse::Ok().json(json!({ "video": video })))
}

#[patch("/videos/{video_id}")]
async fn update(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateVideoRequest>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let video_id = path.into_inner();
    if body.title.trim().is_empty() || body.description.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "title and description are required".into(),
        ));
    }

    let video = db::find_video_by_id(&pool, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;
    ensure_owner(video.owner, user.id, "only the owner can edit this video")?;

    let updated = db::update_video(&pool, video_id, body.title.trim(), body.description.trim(), None)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "video": updated })))
}

#[patch("/videos/{video_id}/thumbnail")]
async fn update_thumbnail(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    media: web::Data<MediaStore>,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let video_id = path.into_inner();

    let video = db::find_video_by_id(&pool, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;
    ensure_owner(video.owner, user.id, "only the owner can edit this video")?;

    let form = UploadForm::read(payload).await?;
    let stored = media.store(form.require_file("thumbnail")?, MediaKind::Image).await?;
    let updated = db::update_video(
        &pool,
        video_id,
        &video.title,
        &video.description,
        Some((&stored.url, &stored.storage_id)),
    )
    .await?;
    // Old thumbnail only goes away once the swap is persisted.
    media.delete(&video.thumbnail_storage_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "video": updated })))
}

#[delete("/videos/{video_id}")]
async fn remove(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    media: web::Data<MediaStore>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let video_id = path.into_inner();

    let video = db::find_video_by_id(&pool, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;
    ensure_owner(video.owner, user.id, "only the owner can delete this video")?;

    db::delete_video(&pool, video_id).await?;
    media.delete(&video.video_storage_id).await?;
    media.delete(&video.thumbnail_storage_id).await?;
    tracing::info!(video_id = %video_id, "video deleted");
    Ok(HttpResponse::Ok().json(json!({ "deleted": video_id })))
}

#[patch("/videos/{video_id}/publish")]
async fn toggle_publish(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let video_id = path.into_inner();

    let video = db::find_video_by_id(&pool, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;
    ensure_owner(video.owner, user.id, "only the owner can change publish status")?;

    let updated = db::set_publish_status(&pool, video_id, !video.is_published).await?;
    Ok(HttpResponse::Ok().json(json!({ "is_published": updated.is_published })))
}

#[get("/users/me/history")]
async fn history(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let videos = views::watch_history(&pool, user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "watch_history": videos })))
}
