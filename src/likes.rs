use actix_web::{HttpRequest, HttpResponse, post, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::require_user;
use crate::db;
use crate::error::{ApiError, Result};
use crate::models::LikeTarget;
use crate::token::TokenService;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(toggle_video_like).service(toggle_comment_like);
}

#[post("/videos/{video_id}/like")]
async fn toggle_video_like(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let video_id = path.into_inner();
    if db::find_video_by_id(&pool, video_id).await?.is_none() {
        return Err(ApiError::NotFound("video"));
    }
    let liked = db::toggle_like(&pool, LikeTarget::Video(video_id), user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "liked": liked })))
}

#[post("/comments/{comment_id}/like")]
async fn toggle_comment_like(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let comment_id = path.into_inner();
    if db::find_comment_by_id(&pool, comment_id).await?.is_none() {
        return Err(ApiError::NotFound("comment"));
    }
    let liked = db::toggle_like(&pool, LikeTarget::Comment(comment_id), user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "liked": liked })))
}
