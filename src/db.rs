use bcrypt::{DEFAULT_COST, hash, verify};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::{Comment, LikeTarget, Playlist, User, Video};

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar_url, \
     avatar_storage_id, cover_image_url, cover_storage_id, refresh_token, watch_history, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Users / credentials

pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Matches the identifier against the lowercase username or the email.
pub async fn find_user_by_identifier(pool: &PgPool, identifier: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2"
    ))
    .bind(identifier.trim().to_lowercase())
    .bind(identifier.trim())
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    full_name: &str,
    password: &str,
) -> Result<User> {
    let password_hash = hash(password, DEFAULT_COST)?;
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, username, email, full_name, password_hash) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(full_name)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict("username or email"),
        other => other,
    })?;
    Ok(user)
}

pub fn verify_password(user: &User, plaintext: &str) -> Result<bool> {
    Ok(verify(plaintext, &user.password_hash)?)
}

/// Persists or clears the single active refresh token. Nothing else on the
/// user record is validated on this path.
pub async fn set_refresh_token(pool: &PgPool, user_id: Uuid, token: Option<&str>) -> Result<()> {
    sqlx::query("UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Compare-and-swap rotation: succeeds only if the presented token is still
/// the persisted one, so two concurrent refreshes cannot both rotate.
pub async fn rotate_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    presented: &str,
    new_token: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET refresh_token = $3, updated_at = now() \
         WHERE id = $1 AND refresh_token = $2",
    )
    .bind(user_id)
    .bind(presented)
    .bind(new_token)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn update_password(pool: &PgPool, user_id: Uuid, new_password: &str) -> Result<()> {
    let password_hash = hash(new_password, DEFAULT_COST)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET full_name = COALESCE($2, full_name), \
         email = COALESCE($3, email), updated_at = now() \
         WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(full_name)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn update_avatar(
    pool: &PgPool,
    user_id: Uuid,
    avatar_url: &str,
    storage_id: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET avatar_url = $2, avatar_storage_id = $3, updated_at = now() \
         WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(avatar_url)
    .bind(storage_id)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn update_cover_image(
    pool: &PgPool,
    user_id: Uuid,
    cover_url: &str,
    storage_id: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET cover_image_url = $2, cover_storage_id = $3, updated_at = now() \
         WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(cover_url)
    .bind(storage_id)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

// ---------------------------------------------------------------------------
// Videos

const VIDEO_COLUMNS: &str = "id, title, description, duration, video_url, video_storage_id, \
     thumbnail_url, thumbnail_storage_id, owner, views, is_published, created_at, updated_at";

pub async fn find_video_by_id(pool: &PgPool, video_id: Uuid) -> Result<Option<Video>> {
    let video = sqlx::query_as::<_, Video>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"
    ))
    .bind(video_id)
    .fetch_optional(pool)
    .await?;
    Ok(video)
}

#[allow(clippy::too_many_arguments)]
pub async fn create_video(
    pool: &PgPool,
    title: &str,
    description: &str,
    duration: f64,
    video_url: &str,
    video_storage_id: &str,
    thumbnail_url: &str,
    thumbnail_storage_id: &str,
    owner: Uuid,
) -> Result<Video> {
    let video = sqlx::query_as::<_, Video>(&format!(
        "INSERT INTO videos (id, title, description, duration, video_url, video_storage_id, \
         thumbnail_url, thumbnail_storage_id, owner) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {VIDEO_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(description)
    .bind(duration)
    .bind(video_url)
    .bind(video_storage_id)
    .bind(thumbnail_url)
    .bind(thumbnail_storage_id)
    .bind(owner)
    .fetch_one(pool)
    .await?;
    Ok(video)
}

pub async fn update_video(
    pool: &PgPool,
    video_id: Uuid,
    title: &str,
    description: &str,
    thumbnail: Option<(&str, &str)>,
) -> Result<Video> {
    let (thumbnail_url, thumbnail_storage_id) = match thumbnail {
        Some((url, id)) => (Some(url), Some(id)),
        None => (None, None),
    };
    let video = sqlx::query_as::<_, Video>(&format!(
        "UPDATE videos SET title = $2, description = $3, \
         thumbnail_url = COALESCE($4, thumbnail_url), \
         thumbnail_storage_id = COALESCE($5, thumbnail_storage_id), \
         updated_at = now() WHERE id = $1 RETURNING {VIDEO_COLUMNS}"
    ))
    .bind(video_id)
    .bind(title)
    .bind(description)
    .bind(thumbnail_url)
    .bind(thumbnail_storage_id)
    .fetch_one(pool)
    .await?;
    Ok(video)
}

pub async fn delete_video(pool: &PgPool, video_id: Uuid) -> Result<()> {
    // Likes and comments go with it via ON DELETE CASCADE.
    sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_publish_status(pool: &PgPool, video_id: Uuid, published: bool) -> Result<Video> {
    let video = sqlx::query_as::<_, Video>(&format!(
        "UPDATE videos SET is_published = $2, updated_at = now() WHERE id = $1 \
         RETURNING {VIDEO_COLUMNS}"
    ))
    .bind(video_id)
    .bind(published)
    .fetch_one(pool)
    .await?;
    Ok(video)
}

/// Single-statement atomic increment; never read-modify-write in app code.
pub async fn record_view(pool: &PgPool, video_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE videos SET views = views + 1 WHERE id = $1")
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Appends to watch history with set semantics: the id is added once, at the
/// position of its first watch, in a single atomic statement.
pub async fn push_watch_history(pool: &PgPool, user_id: Uuid, video_id: Uuid) -> Result<()> {
    sqlx::query(
        "UPDATE users SET watch_history = array_append(watch_history, $2) \
         WHERE id = $1 AND NOT (watch_history @> ARRAY[$2])",
    )
    .bind(user_id)
    .bind(video_id)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Comments

pub async fn find_comment_by_id(pool: &PgPool, comment_id: Uuid) -> Result<Option<Comment>> {
    let comment = sqlx::query_as::<_, Comment>(
        "SELECT id, content, video, owner, created_at, updated_at FROM comments WHERE id = $1",
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await?;
    Ok(comment)
}

pub async fn create_comment(
    pool: &PgPool,
    video_id: Uuid,
    owner: Uuid,
    content: &str,
) -> Result<Comment> {
    let comment = sqlx::query_as::<_, Comment>(
        "INSERT INTO comments (id, content, video, owner) VALUES ($1, $2, $3, $4) \
         RETURNING id, content, video, owner, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(content)
    .bind(video_id)
    .bind(owner)
    .fetch_one(pool)
    .await?;
    Ok(comment)
}

pub async fn update_comment(pool: &PgPool, comment_id: Uuid, content: &str) -> Result<Comment> {
    let comment = sqlx::query_as::<_, Comment>(
        "UPDATE comments SET content = $2, updated_at = now() WHERE id = $1 \
         RETURNING id, content, video, owner, created_at, updated_at",
    )
    .bind(comment_id)
    .bind(content)
    .fetch_one(pool)
    .await?;
    Ok(comment)
}

pub async fn delete_comment(pool: &PgPool, comment_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Likes

/// Removes the like if present, inserts it otherwise. Returns whether the
/// target is liked after the call.
pub async fn toggle_like(pool: &PgPool, target: LikeTarget, liked_by: Uuid) -> Result<bool> {
    let column = target.column();
    let deleted = sqlx::query(&format!(
        "DELETE FROM likes WHERE {column} = $1 AND liked_by = $2"
    ))
    .bind(target.id())
    .bind(liked_by)
    .execute(pool)
    .await?;
    if deleted.rows_affected() > 0 {
        return Ok(false);
    }
    sqlx::query(&format!(
        "INSERT INTO likes (id, {column}, liked_by) VALUES ($1, $2, $3) \
         ON CONFLICT DO NOTHING"
    ))
    .bind(Uuid::new_v4())
    .bind(target.id())
    .bind(liked_by)
    .execute(pool)
    .await?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Subscriptions

/// Returns whether the subscriber is subscribed to the channel after the call.
pub async fn toggle_subscription(pool: &PgPool, channel: Uuid, subscriber: Uuid) -> Result<bool> {
    let deleted = sqlx::query("DELETE FROM subscriptions WHERE channel = $1 AND subscriber = $2")
        .bind(channel)
        .bind(subscriber)
        .execute(pool)
        .await?;
    if deleted.rows_affected() > 0 {
        return Ok(false);
    }
    sqlx::query(
        "INSERT INTO subscriptions (id, channel, subscriber) VALUES ($1, $2, $3) \
         ON CONFLICT DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(channel)
    .bind(subscriber)
    .execute(pool)
    .await?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Playlists

const PLAYLIST_COLUMNS: &str = "id, name, description, owner, created_at, updated_at";

pub async fn find_playlist_by_id(pool: &PgPool, playlist_id: Uuid) -> Result<Option<Playlist>> {
    let playlist = sqlx::query_as::<_, Playlist>(&format!(
        "SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE id = $1"
    ))
    .bind(playlist_id)
    .fetch_optional(pool)
    .await?;
    Ok(playlist)
}

pub async fn create_playlist(
    pool: &PgPool,
    owner: Uuid,
    name: &str,
    description: &str,
) -> Result<Playlist> {
    let playlist = sqlx::query_as::<_, Playlist>(&format!(
        "INSERT INTO playlists (id, name, description, owner) VALUES ($1, $2, $3, $4) \
         RETURNING {PLAYLIST_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .bind(owner)
    .fetch_one(pool)
    .await?;
    Ok(playlist)
}

pub async fn update_playlist(
    pool: &PgPool,
    playlist_id: Uuid,
    name: &str,
    description: &str,
) -> Result<Playlist> {
    let playlist = sqlx::query_as::<_, Playlist>(&format!(
        "UPDATE playlists SET name = $2, description = $3, updated_at = now() \
         WHERE id = $1 RETURNING {PLAYLIST_COLUMNS}"
    ))
    .bind(playlist_id)
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(playlist)
}

pub async fn delete_playlist(pool: &PgPool, playlist_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM playlists WHERE id = $1")
        .bind(playlist_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Membership has set semantics; adding an already-present video is a no-op.
pub async fn add_playlist_video(pool: &PgPool, playlist_id: Uuid, video_id: Uuid) -> Result<()> {
    sqlx::query(
        "INSERT INTO playlist_videos (playlist, video) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(playlist_id)
    .bind(video_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove_playlist_video(pool: &PgPool, playlist_id: Uuid, video_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM playlist_videos WHERE playlist = $1 AND video = $2")
        .bind(playlist_id)
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(())
}
