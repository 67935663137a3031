//! Denormalized read models composed from users, videos, likes, comments and
//! subscriptions. Every function is a pure read over current store state plus
//! an optional viewer identity for the personalized flags; the one exception
//! is `video_detail`, which records the view as a side effect of a successful
//! fetch.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, Result};
use crate::models::{
    ChannelProfile, ChannelSummary, CommentView, OwnerSummary, VideoDetail, VideoSummary,
};
use crate::pagination::{Page, PageParams};

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    Views,
    Duration,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "v.created_at",
            SortField::Views => "v.views",
            SortField::Duration => "v.duration",
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FeedFilter {
    pub query: Option<String>,
    pub owner_id: Option<Uuid>,
    pub sort_by: Option<SortField>,
    pub sort_dir: Option<SortDir>,
}

#[derive(FromRow)]
struct VideoSummaryRow {
    id: Uuid,
    title: String,
    description: String,
    thumbnail_url: String,
    duration: f64,
    views: i64,
    created_at: DateTime<Utc>,
    owner_id: Uuid,
    owner_username: String,
    owner_full_name: String,
    owner_avatar_url: Option<String>,
}

impl From<VideoSummaryRow> for VideoSummary {
    fn from(row: VideoSummaryRow) -> Self {
        VideoSummary {
            id: row.id,
            title: row.title,
            description: row.description,
            thumbnail_url: row.thumbnail_url,
            duration: row.duration,
            views: row.views,
            created_at: row.created_at,
            owner: OwnerSummary {
                id: row.owner_id,
                username: row.owner_username,
                full_name: row.owner_full_name,
                avatar_url: row.owner_avatar_url,
            },
        }
    }
}

const SUMMARY_SELECT: &str = "v.id, v.title, v.description, v.thumbnail_url, v.duration, \
     v.views, v.created_at, u.id AS owner_id, u.username AS owner_username, \
     u.full_name AS owner_full_name, u.avatar_url AS owner_avatar_url";

/// Pushes the feed predicate. Count and item queries go through this same
/// function so the two can never drift apart.
fn push_feed_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &FeedFilter) {
    builder.push(" WHERE v.is_published = TRUE");
    if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = format!("%{}%", query.trim());
        // Text search is restricted to title and description.
        builder
            .push(" AND (v.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR v.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND v.owner = ").push_bind(owner_id);
    }
}

/// Published videos with owner username + avatar embedded, filtered, sorted
/// and paginated. Defaults to newest first.
pub async fn video_feed(
    pool: &PgPool,
    filter: &FeedFilter,
    params: PageParams,
) -> Result<Page<VideoSummary>> {
    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM videos v");
    push_feed_filter(&mut count_query, filter);
    let total_items: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let sort = filter.sort_by.unwrap_or(SortField::CreatedAt);
    let dir = filter.sort_dir.unwrap_or(SortDir::Desc);

    let mut items_query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {SUMMARY_SELECT} FROM videos v JOIN users u ON u.id = v.owner"
    ));
    push_feed_filter(&mut items_query, filter);
    items_query
        .push(format!(" ORDER BY {} {}", sort.column(), dir.sql()))
        .push(" LIMIT ")
        .push_bind(params.limit)
        .push(" OFFSET ")
        .push_bind(params.offset());

    let rows: Vec<VideoSummaryRow> = items_query.build_query_as().fetch_all(pool).await?;
    let items = rows.into_iter().map(VideoSummary::from).collect();
    Ok(Page::assemble(items, params, total_items))
}

#[derive(FromRow)]
struct VideoDetailRow {
    id: Uuid,
    title: String,
    description: String,
    video_url: String,
    duration: f64,
    views: i64,
    created_at: DateTime<Utc>,
    owner_id: Uuid,
    owner_username: String,
    owner_avatar_url: Option<String>,
    subscribers_count: i64,
    is_subscribed: bool,
    likes_count: i64,
    is_liked: bool,
}

/// Full video view: likes count, owner channel enriched with subscriber
/// count, and the viewer-relative flags. A successful fetch counts as a view
/// and lands in the viewer's watch history.
pub async fn video_detail(
    pool: &PgPool,
    video_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<VideoDetail> {
    let row = sqlx::query_as::<_, VideoDetailRow>(
        "SELECT v.id, v.title, v.description, v.video_url, v.duration, v.views, v.created_at, \
         u.id AS owner_id, u.username AS owner_username, u.avatar_url AS owner_avatar_url, \
         (SELECT COUNT(*) FROM subscriptions s WHERE s.channel = u.id) AS subscribers_count, \
         EXISTS(SELECT 1 FROM subscriptions s WHERE s.channel = u.id AND s.subscriber = $2) \
             AS is_subscribed, \
         (SELECT COUNT(*) FROM likes l WHERE l.video = v.id) AS likes_count, \
         EXISTS(SELECT 1 FROM likes l WHERE l.video = v.id AND l.liked_by = $2) AS is_liked \
         FROM videos v JOIN users u ON u.id = v.owner WHERE v.id = $1",
    )
    .bind(video_id)
    .bind(viewer)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("video"))?;

    db::record_view(pool, video_id).await?;
    if let Some(viewer_id) = viewer {
        db::push_watch_history(pool, viewer_id, video_id).await?;
    }

    Ok(VideoDetail {
        id: row.id,
        title: row.title,
        description: row.description,
        video_url: row.video_url,
        duration: row.duration,
        views: row.views,
        created_at: row.created_at,
        owner: ChannelSummary {
            id: row.owner_id,
            username: row.owner_username,
            avatar_url: row.owner_avatar_url,
            subscribers_count: row.subscribers_count,
            is_subscribed: row.is_subscribed,
        },
        likes_count: row.likes_count,
        is_liked: row.is_liked,
    })
}

/// Case-insensitive channel lookup: both sides are lowercase (usernames are
/// stored normalized; the input is normalized here).
pub async fn channel_profile(
    pool: &PgPool,
    username: &str,
    viewer: Option<Uuid>,
) -> Result<ChannelProfile> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::InvalidArgument("username is required".into()));
    }
    let profile = sqlx::query_as::<_, ChannelProfileRow>(
        "SELECT u.id, u.username, u.full_name, u.avatar_url, u.cover_image_url, \
         (SELECT COUNT(*) FROM subscriptions s WHERE s.channel = u.id) AS subscribers_count, \
         (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber = u.id) AS subscribed_to_count, \
         EXISTS(SELECT 1 FROM subscriptions s WHERE s.channel = u.id AND s.subscriber = $2) \
             AS is_subscribed \
         FROM users u WHERE u.username = $1",
    )
    .bind(&username)
    .bind(viewer)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("channel"))?;
    Ok(profile.into())
}

#[derive(FromRow)]
struct ChannelProfileRow {
    id: Uuid,
    username: String,
    full_name: String,
    avatar_url: Option<String>,
    cover_image_url: Option<String>,
    subscribers_count: i64,
    subscribed_to_count: i64,
    is_subscribed: bool,
}

impl From<ChannelProfileRow> for ChannelProfile {
    fn from(row: ChannelProfileRow) -> Self {
        ChannelProfile {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            cover_image_url: row.cover_image_url,
            subscribers_count: row.subscribers_count,
            subscribed_to_count: row.subscribed_to_count,
            is_subscribed: row.is_subscribed,
        }
    }
}

/// Subscribers of a channel, newest first.
pub async fn channel_subscribers(pool: &PgPool, channel: Uuid) -> Result<Vec<OwnerSummary>> {
    let subscribers: Vec<OwnerSummary> = sqlx::query_as(
        "SELECT u.id, u.username, u.full_name, u.avatar_url \
         FROM subscriptions s JOIN users u ON u.id = s.subscriber \
         WHERE s.channel = $1 ORDER BY s.created_at DESC",
    )
    .bind(channel)
    .fetch_all(pool)
    .await?;
    Ok(subscribers)
}

/// Expands the viewer's watch history into video + owner summaries, in the
/// stored (first-watched) order.
pub async fn watch_history(pool: &PgPool, viewer: Uuid) -> Result<Vec<VideoSummary>> {
    let rows: Vec<VideoSummaryRow> = sqlx::query_as(&format!(
        "SELECT {SUMMARY_SELECT} \
         FROM users me \
         CROSS JOIN unnest(me.watch_history) WITH ORDINALITY AS h(video_id, ord) \
         JOIN videos v ON v.id = h.video_id \
         JOIN users u ON u.id = v.owner \
         WHERE me.id = $1 \
         ORDER BY h.ord"
    ))
    .bind(viewer)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(VideoSummary::from).collect())
}

/// Videos of a playlist in the order they were added, with owner summaries.
pub async fn playlist_videos(pool: &PgPool, playlist_id: Uuid) -> Result<Vec<VideoSummary>> {
    let rows: Vec<VideoSummaryRow> = sqlx::query_as(&format!(
        "SELECT {SUMMARY_SELECT} \
         FROM playlist_videos pv \
         JOIN videos v ON v.id = pv.video \
         JOIN users u ON u.id = v.owner \
         WHERE pv.playlist = $1 \
         ORDER BY pv.added_at"
    ))
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(VideoSummary::from).collect())
}

#[derive(FromRow)]
struct CommentViewRow {
    id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    likes_count: i64,
    owner_id: Uuid,
    owner_username: String,
    owner_full_name: String,
    owner_avatar_url: Option<String>,
    is_liked: bool,
}

/// Comments on a video, newest first, with like counts and the caller's
/// is_liked flag.
pub async fn comment_feed(
    pool: &PgPool,
    video_id: Uuid,
    viewer: Option<Uuid>,
    params: PageParams,
) -> Result<Page<CommentView>> {
    if db::find_video_by_id(pool, video_id).await?.is_none() {
        return Err(ApiError::NotFound("video"));
    }

    let total_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE video = $1")
        .bind(video_id)
        .fetch_one(pool)
        .await?;

    let rows: Vec<CommentViewRow> = sqlx::query_as(
        "SELECT c.id, c.content, c.created_at, \
         (SELECT COUNT(*) FROM likes l WHERE l.comment = c.id) AS likes_count, \
         u.id AS owner_id, u.username AS owner_username, u.full_name AS owner_full_name, \
         u.avatar_url AS owner_avatar_url, \
         EXISTS(SELECT 1 FROM likes l WHERE l.comment = c.id AND l.liked_by = $2) AS is_liked \
         FROM comments c JOIN users u ON u.id = c.owner \
         WHERE c.video = $1 ORDER BY c.created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(video_id)
    .bind(viewer)
    .bind(params.limit)
    .bind(params.offset())
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| CommentView {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            likes_count: row.likes_count,
            owner: OwnerSummary {
                id: row.owner_id,
                username: row.owner_username,
                full_name: row.owner_full_name,
                avatar_url: row.owner_avatar_url,
            },
            is_liked: row.is_liked,
        })
        .collect();
    Ok(Page::assemble(items, params, total_items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_fields_map_to_whitelisted_columns() {
        assert_eq!(SortField::CreatedAt.column(), "v.created_at");
        assert_eq!(SortField::Views.column(), "v.views");
        assert_eq!(SortField::Duration.column(), "v.duration");
        assert_eq!(SortDir::Asc.sql(), "ASC");
        assert_eq!(SortDir::Desc.sql(), "DESC");
    }

    #[test]
    fn sort_field_parses_from_query_values() {
        #[derive(Deserialize)]
        struct Q {
            sort_by: SortField,
            sort_dir: SortDir,
        }
        let q: Q = serde_json::from_str(r#"{"sort_by": "views", "sort_dir": "asc"}"#).unwrap();
        assert_eq!(q.sort_by, SortField::Views);
        assert_eq!(q.sort_dir, SortDir::Asc);
        assert!(serde_json::from_str::<Q>(r#"{"sort_by": "owner", "sort_dir": "asc"}"#).is_err());
    }

    #[test]
    fn feed_filter_binds_search_and_owner() {
        let filter = FeedFilter {
            query: Some("rust".into()),
            owner_id: Some(Uuid::new_v4()),
            sort_by: None,
            sort_dir: None,
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM videos v");
        push_feed_filter(&mut builder, &filter);
        let sql = builder.sql();
        assert!(sql.contains("v.is_published = TRUE"));
        assert!(sql.contains("v.title ILIKE"));
        assert!(sql.contains("v.description ILIKE"));
        assert!(sql.contains("v.owner ="));
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = FeedFilter {
            query: Some("   ".into()),
            ..FeedFilter::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM videos v");
        push_feed_filter(&mut builder, &filter);
        assert!(!builder.sql().contains("ILIKE"));
    }
}
