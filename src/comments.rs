use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{optional_viewer, require_user};
use crate::db;
use crate::error::{ApiError, Result, ensure_owner};
use crate::models::CommentRequest;
use crate::pagination::PageQuery;
use crate::token::TokenService;
use crate::views;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list)
        .service(add)
        .service(update)
        .service(remove);
}

#[get("/videos/{video_id}/comments")]
async fn list(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let viewer = optional_viewer(&req, &pool, &tokens).await?;
    let comments =
        views::comment_feed(&pool, path.into_inner(), viewer, page.into_inner().normalize())
            .await?;
    Ok(HttpResponse::Ok().json(comments))
}

#[post("/videos/{video_id}/comments")]
async fn add(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let video_id = path.into_inner();
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::InvalidArgument("content is required".into()));
    }
    if db::find_video_by_id(&pool, video_id).await?.is_none() {
        return Err(ApiError::NotFound("video"));
    }
    let comment = db::create_comment(&pool, video_id, user.id, content).await?;
    Ok(HttpResponse::Created().json(json!({ "comment": comment })))
}

#[patch("/comments/{comment_id}")]
async fn update(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::InvalidArgument("content is required".into()));
    }

    let comment = db::find_comment_by_id(&pool, path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    ensure_owner(comment.owner, user.id, "only the owner can edit this comment")?;

    let updated = db::update_comment(&pool, comment.id, content).await?;
    Ok(HttpResponse::Ok().json(json!({ "comment": updated })))
}

#[delete("/comments/{comment_id}")]
async fn remove(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;

    let comment = db::find_comment_by_id(&pool, path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    ensure_owner(comment.owner, user.id, "only the owner can delete this comment")?;

    // Likes on the comment cascade with it.
    db::delete_comment(&pool, comment.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": comment.id })))
}
