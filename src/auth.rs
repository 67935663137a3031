//! Session lifecycle: login, logout, refresh rotation, and the authenticate
//! gate every owner-restricted operation goes through. Tokens travel as
//! httpOnly cookies or an `Authorization: Bearer` header; handlers extract
//! the string and hand it to the core functions, which always take the
//! caller's identity explicitly.

use actix_multipart::Multipart;
use actix_web::{
    HttpRequest, HttpResponse,
    cookie::{Cookie, time::Duration as CookieDuration},
    get, http::header, patch, post, web,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, Result};
use crate::media::{MediaKind, MediaStore, UploadForm};
use crate::models::{
    ChangePasswordRequest, LoginRequest, PublicUser, RefreshRequest, RegisterRequest,
    UpdateProfileRequest, User,
};
use crate::token::TokenService;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(logout)
        .service(refresh)
        .service(change_password)
        .service(current_user)
        .service(update_profile)
        .service(update_avatar)
        .service(update_cover_image);
}

// ---------------------------------------------------------------------------
// Core operations

pub struct Session {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues both tokens and persists the refresh token as the single active one.
async fn open_session(pool: &PgPool, tokens: &TokenService, user: User) -> Result<Session> {
    let access_token = tokens.issue_access(user.id)?;
    let refresh_token = tokens.issue_refresh(user.id)?;
    db::set_refresh_token(pool, user.id, Some(&refresh_token)).await?;
    Ok(Session {
        user: user.into(),
        access_token,
        refresh_token,
    })
}

pub async fn login_user(
    pool: &PgPool,
    tokens: &TokenService,
    identifier: &str,
    password: &str,
) -> Result<Session> {
    let user = db::find_user_by_identifier(pool, identifier)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    if !db::verify_password(&user, password)? {
        return Err(ApiError::InvalidCredentials);
    }
    let session = open_session(pool, tokens, user).await?;
    tracing::info!(user_id = %session.user.id, "user logged in");
    Ok(session)
}

/// Exchanges a presented refresh token for a fresh pair, rotating the stored
/// token. A token that no longer matches the persisted one is a replay.
pub async fn refresh_session(
    pool: &PgPool,
    tokens: &TokenService,
    presented: &str,
) -> Result<(String, String)> {
    let user_id = tokens.verify_refresh(presented)?;
    let user = db::find_user_by_id(pool, user_id)
        .await?
        .ok_or(ApiError::InvalidToken)?;
    if user.refresh_token.as_deref() != Some(presented) {
        tracing::warn!(user_id = %user_id, "refresh token reuse detected");
        return Err(ApiError::TokenReuse);
    }

    let access_token = tokens.issue_access(user_id)?;
    let refresh_token = tokens.issue_refresh(user_id)?;
    // Compare-and-swap: a concurrent refresh that rotated first wins and this
    // one reads as a replay.
    if !db::rotate_refresh_token(pool, user_id, presented, &refresh_token).await? {
        return Err(ApiError::TokenReuse);
    }
    Ok((access_token, refresh_token))
}

/// Verifies an access token and loads its user, refusing tokens whose user
/// no longer exists.
pub async fn authenticate(pool: &PgPool, tokens: &TokenService, token: &str) -> Result<User> {
    let user_id = tokens.verify_access(token)?;
    db::find_user_by_id(pool, user_id)
        .await?
        .ok_or(ApiError::InvalidToken)
}

pub async fn change_user_password(
    pool: &PgPool,
    user: &User,
    old_password: &str,
    new_password: &str,
) -> Result<()> {
    if !db::verify_password(user, old_password)? {
        return Err(ApiError::InvalidCredentials);
    }
    if new_password.trim().is_empty() {
        return Err(ApiError::InvalidArgument("new password is required".into()));
    }
    db::update_password(pool, user.id, new_password).await
}

// ---------------------------------------------------------------------------
// Token transport

fn bearer_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie("access_token") {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Authenticated caller, required. `Unauthenticated` when no token travels
/// with the request.
pub async fn require_user(
    req: &HttpRequest,
    pool: &PgPool,
    tokens: &TokenService,
) -> Result<User> {
    let token = bearer_token(req).ok_or(ApiError::Unauthenticated)?;
    authenticate(pool, tokens, &token).await
}

/// Optional viewer identity for the personalized view flags. No token means
/// anonymous; a presented-but-invalid token is still an error.
pub async fn optional_viewer(
    req: &HttpRequest,
    pool: &PgPool,
    tokens: &TokenService,
) -> Result<Option<Uuid>> {
    match bearer_token(req) {
        Some(token) => Ok(Some(authenticate(pool, tokens, &token).await?.id)),
        None => Ok(None),
    }
}

fn session_cookie(name: &'static str, value: &str) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .finish()
}

fn clear_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name, "")
        .path("/")
        .http_only(true)
        .secure(true)
        .max_age(CookieDuration::ZERO)
        .finish()
}

// ---------------------------------------------------------------------------
// Handlers

#[post("/auth/register")]
async fn register(pool: web::Data<PgPool>, body: web::Json<RegisterRequest>) -> Result<HttpResponse> {
    let username = body.username.trim().to_lowercase();
    let email = body.email.trim().to_string();
    let full_name = body.full_name.trim().to_string();
    if username.is_empty() || email.is_empty() || full_name.is_empty() || body.password.is_empty() {
        return Err(ApiError::InvalidArgument("all fields are required".into()));
    }

    let user = db::create_user(&pool, &username, &email, &full_name, &body.password).await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(HttpResponse::Created().json(json!({ "user": PublicUser::from(user) })))
}

#[post("/auth/login")]
async fn login(
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let session = login_user(&pool, &tokens, &body.identifier, &body.password).await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie("access_token", &session.access_token))
        .cookie(session_cookie("refresh_token", &session.refresh_token))
        .json(json!({
            "user": session.user,
            "access_token": session.access_token,
            "refresh_token": session.refresh_token,
        })))
}

#[post("/auth/logout")]
async fn logout(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    // Idempotent: clearing an already-cleared token is fine.
    db::set_refresh_token(&pool, user.id, None).await?;
    tracing::info!(user_id = %user.id, "user logged out");
    Ok(HttpResponse::Ok()
        .cookie(clear_cookie("access_token"))
        .cookie(clear_cookie("refresh_token"))
        .json(json!({ "message": "logged out" })))
}

#[post("/auth/refresh")]
async fn refresh(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    body: Option<web::Json<RefreshRequest>>,
) -> Result<HttpResponse> {
    let presented = req
        .cookie("refresh_token")
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .ok_or(ApiError::Unauthenticated)?;

    let (access_token, refresh_token) = refresh_session(&pool, &tokens, &presented).await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie("access_token", &access_token))
        .cookie(session_cookie("refresh_token", &refresh_token))
        .json(json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
        })))
}

#[post("/auth/change-password")]
async fn change_password(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    change_user_password(&pool, &user, &body.old_password, &body.new_password).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "password changed" })))
}

#[get("/auth/me")]
async fn current_user(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": PublicUser::from(user) })))
}

#[patch("/users/me")]
async fn update_profile(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let full_name = body.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let email = body.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if full_name.is_none() && email.is_none() {
        return Err(ApiError::InvalidArgument(
            "full_name or email is required".into(),
        ));
    }
    let updated = db::update_profile(&pool, user.id, full_name, email).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": PublicUser::from(updated) })))
}

#[patch("/users/me/avatar")]
async fn update_avatar(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    media: web::Data<MediaStore>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let form = UploadForm::read(payload).await?;
    let bytes = form.require_file("avatar")?;
    let stored = media.store(bytes, MediaKind::Image).await?;
    let updated = db::update_avatar(&pool, user.id, &stored.url, &stored.storage_id).await?;
    // Old avatar only goes away once the swap is persisted.
    if let Some(old) = user.avatar_storage_id.as_deref() {
        media.delete(old).await?;
    }
    Ok(HttpResponse::Ok().json(json!({ "user": PublicUser::from(updated) })))
}

#[patch("/users/me/cover")]
async fn update_cover_image(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    media: web::Data<MediaStore>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let user = require_user(&req, &pool, &tokens).await?;
    let form = UploadForm::read(payload).await?;
    let bytes = form.require_file("cover_image")?;
    let stored = media.store(bytes, MediaKind::Image).await?;
    let updated = db::update_cover_image(&pool, user.id, &stored.url, &stored.storage_id).await?;
    if let Some(old) = user.cover_storage_id.as_deref() {
        media.delete(old).await?;
    }
    Ok(HttpResponse::Ok().json(json!({ "user": PublicUser::from(updated) })))
}
