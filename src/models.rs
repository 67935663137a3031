use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub avatar_storage_id: Option<String>,
    pub cover_image_url: Option<String>,
    pub cover_storage_id: Option<String>,
    pub refresh_token: Option<String>,
    pub watch_history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as exposed over the API: password hash and refresh token stripped.
#[derive(Serialize, Clone, Debug)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            cover_image_url: user.cover_image_url,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub video_url: String,
    pub video_storage_id: String,
    pub thumbnail_url: String,
    pub thumbnail_storage_id: String,
    pub owner: Uuid,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub video: Uuid,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A like references exactly one target. The variant is fixed at construction,
/// so an ill-formed like (two targets, or none) cannot be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeTarget {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
}

impl LikeTarget {
    /// Column the target id lives in.
    pub fn column(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video",
            LikeTarget::Comment(_) => "comment",
            LikeTarget::Tweet(_) => "tweet",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            LikeTarget::Video(id) | LikeTarget::Comment(id) | LikeTarget::Tweet(id) => *id,
        }
    }
}

// ---------------------------------------------------------------------------
// JWT claims

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: String,
}

// ---------------------------------------------------------------------------
// Read models produced by the view aggregator

#[derive(Serialize, Clone, Debug, FromRow)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct VideoSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub owner: OwnerSummary,
}

#[derive(Serialize, Clone, Debug)]
pub struct ChannelSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub subscribers_count: i64,
    pub is_subscribed: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct VideoDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub owner: ChannelSummary,
    pub likes_count: i64,
    pub is_liked: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct ChannelProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub subscribers_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes_count: i64,
    pub owner: OwnerSummary,
    pub is_liked: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct PlaylistDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub videos: Vec<VideoSummary>,
}

// ---------------------------------------------------------------------------
// Request bodies

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateVideoRequest {
    pub title: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Deserialize)]
pub struct PlaylistRequest {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_target_maps_to_one_column() {
        let id = Uuid::new_v4();
        assert_eq!(LikeTarget::Video(id).column(), "video");
        assert_eq!(LikeTarget::Comment(id).column(), "comment");
        assert_eq!(LikeTarget::Tweet(id).column(), "tweet");
        assert_eq!(LikeTarget::Video(id).id(), id);
    }

    #[test]
    fn public_user_strips_secrets() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            full_name: "Alice".into(),
            password_hash: "$2b$12$hash".into(),
            avatar_url: None,
            avatar_storage_id: None,
            cover_image_url: None,
            cover_storage_id: None,
            refresh_token: Some("token".into()),
            watch_history: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let public = PublicUser::from(user);
        let encoded = serde_json::to_string(&public).unwrap();
        assert!(!encoded.contains("password_hash"));
        assert!(!encoded.contains("refresh_token"));
    }
}
