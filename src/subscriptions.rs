use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{optional_viewer, require_user};
use crate::db;
use crate::error::{ApiError, Result};
use crate::token::TokenService;
use crate::views;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(toggle).service(channel).service(subscribers);
}

#[post("/channels/{channel_id}/subscribe")]
async fn toggle(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let channel_id = path.into_inner();
    if channel_id == user.id {
        return Err(ApiError::InvalidArgument(
            "cannot subscribe to your own channel".into(),
        ));
    }
    if db::find_user_by_id(&pool, channel_id).await?.is_none() {
        return Err(ApiError::NotFound("channel"));
    }
    let subscribed = db::toggle_subscription(&pool, channel_id, user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "subscribed": subscribed })))
}

#[get("/channels/{channel_id}/subscribers")]
async fn subscribers(pool: web::Data<PgPool>, path: web::Path<Uuid>) -> Result<HttpResponse> {
    let channel_id = path.into_inner();
    if db::find_user_by_id(&pool, channel_id).await?.is_none() {
        return Err(ApiError::NotFound("channel"));
    }
    let subscribers = views::channel_subscribers(&pool, channel_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "subscribers": subscribers })))
}

#[get("/channels/{username}")]
async fn channel(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let viewer = optional_viewer(&req, &pool, &tokens).await?;
    let profile = views::channel_profile(&pool, &path.into_inner(), viewer).await?;
    Ok(HttpResponse::Ok().json(json!({ "channel": profile })))
}
