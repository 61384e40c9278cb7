use crate::shared::schema::{bookmarks, categories, comments, likes, post_tags, posts, tags, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    User,
    Admin,
    Moderator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::Moderator => "MODERATOR",
        }
    }

    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            "MODERATOR" => Some(Self::Moderator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    PendingVerification,
    Active,
    Suspended,
    Banned,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingVerification => "PENDING_VERIFICATION",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Banned => "BANNED",
        }
    }

    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "PENDING_VERIFICATION" => Some(Self::PendingVerification),
            "ACTIVE" => Some(Self::Active),
            "SUSPENDED" => Some(Self::Suspended),
            "BANNED" => Some(Self::Banned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostType {
    Artwork,
    Outfit,
    Tattoo,
    BodyArt,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artwork => "ARTWORK",
            Self::Outfit => "OUTFIT",
            Self::Tattoo => "TATTOO",
            Self::BodyArt => "BODY_ART",
        }
    }

    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "ARTWORK" => Some(Self::Artwork),
            "OUTFIT" => Some(Self::Outfit),
            "TATTOO" => Some(Self::Tattoo),
            "BODY_ART" => Some(Self::BodyArt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub role: String,
    pub status: String,
    pub posts_count: i32,
    pub total_likes: i32,
    pub followers_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub name: &'a str,
    pub password_hash: Option<&'a str>,
    pub role: &'a str,
    pub status: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = tags)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(rename = "usageCount")]
    pub usage_count: i32,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub post_type: String,
    pub image_url: String,
    pub image_key: String,
    pub tools_used: Option<String>,
    pub location: Option<String>,
    pub is_nsfw: bool,
    pub allow_comments: bool,
    pub status: String,
    pub slug: String,
    pub likes_count: i32,
    pub views_count: i32,
    pub bookmarks_count: i32,
    pub comments_count: i32,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub post_type: &'a str,
    pub image_url: &'a str,
    pub image_key: &'a str,
    pub tools_used: Option<&'a str>,
    pub location: Option<&'a str>,
    pub is_nsfw: bool,
    pub allow_comments: bool,
    pub status: &'a str,
    pub slug: &'a str,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = post_tags)]
pub struct PostTag {
    pub post_id: Uuid,
    pub tag_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = post_tags)]
pub struct NewPostTag {
    pub post_id: Uuid,
    pub tag_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = likes)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub user_id: Uuid,
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = bookmarks)]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = bookmarks)]
pub struct NewBookmark {
    pub user_id: Uuid,
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment<'a> {
    pub content: &'a str,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_type_round_trips_wire_names() {
        for t in [
            PostType::Artwork,
            PostType::Outfit,
            PostType::Tattoo,
            PostType::BodyArt,
        ] {
            assert_eq!(PostType::from_str_name(t.as_str()), Some(t));
        }
        assert_eq!(PostType::from_str_name("PAINTING"), None);
    }

    #[test]
    fn role_and_status_reject_unknown_names() {
        assert_eq!(UserRole::from_str_name("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str_name("admin"), None);
        assert_eq!(
            UserStatus::from_str_name("PENDING_VERIFICATION"),
            Some(UserStatus::PendingVerification)
        );
        assert_eq!(UserStatus::from_str_name(""), None);
    }
}
