use crate::auth::{authorize, AuthContext, AuthSession, MaybeAuthSession};
use crate::shared::error::ApiError;
use crate::shared::models::{
    Category, Comment, NewComment, NewPost, NewPostTag, Post, PostType, Tag, User,
};
use crate::shared::schema::{categories, comments, likes, post_tags, posts, tags, users};
use crate::shared::state::AppState;
use crate::shared::utils::{db_conn, PageParams};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub mod interactions;
pub mod reconcile;

pub const MAX_TAGS_PER_POST: usize = 10;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub post_type: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub tags: Vec<String>,
    pub tools_used: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "isNSFW", default)]
    pub is_nsfw: bool,
    #[serde(default = "default_true")]
    pub allow_comments: bool,
    pub image_url: String,
    pub image_key: String,
}

/// Partial patch over the create field set. Image fields are immutable after
/// creation and are deliberately absent here, so clients sending them get
/// them silently ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub category_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub tools_used: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "isNSFW")]
    pub is_nsfw: Option<bool>,
    pub allow_comments: Option<bool>,
}

#[derive(AsChangeset)]
#[diesel(table_name = posts)]
struct PostChanges<'a> {
    title: Option<&'a str>,
    description: Option<&'a str>,
    post_type: Option<&'a str>,
    category_id: Option<Uuid>,
    tools_used: Option<&'a str>,
    location: Option<&'a str>,
    is_nsfw: Option<bool>,
    allow_comments: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    #[serde(rename = "authorId")]
    pub author_id: Option<Uuid>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: String,
}

impl AuthorInfo {
    fn from_user(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            name: u.name.clone(),
            avatar: u.avatar.clone(),
            role: u.role.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TagInfo {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub post_type: String,
    pub image_url: String,
    pub image_key: String,
    pub tools_used: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "isNSFW")]
    pub is_nsfw: bool,
    pub allow_comments: bool,
    pub status: String,
    pub slug: String,
    pub likes_count: i32,
    pub views_count: i32,
    pub bookmarks_count: i32,
    pub comments_count: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub author: AuthorInfo,
    pub category: CategoryInfo,
    pub tags: Vec<TagInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: AuthorInfo,
    pub replies: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostView,
    pub is_liked: bool,
    pub is_bookmarked: bool,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostView>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// URL-safe slug from a title; the post id is appended afterwards to make it
/// unique.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Tag slugs only normalize case and whitespace so case-variant duplicates
/// collapse onto one row.
pub fn tag_slug(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

pub fn validate_draft(req: &CreatePostRequest) -> Result<(), ApiError> {
    let mut details = Vec::new();
    let title_len = req.title.chars().count();
    if !(3..=100).contains(&title_len) {
        details.push("title: must be 3-100 characters".to_string());
    }
    if let Some(d) = &req.description {
        if d.chars().count() > 2000 {
            details.push("description: must be at most 2000 characters".to_string());
        }
    }
    if PostType::from_str_name(&req.post_type).is_none() {
        details.push("type: must be one of ARTWORK, OUTFIT, TATTOO, BODY_ART".to_string());
    }
    if req.tags.len() > MAX_TAGS_PER_POST {
        details.push("tags: maximum 10 tags allowed".to_string());
    }
    if req.tags.iter().any(|t| t.trim().is_empty() || t.chars().count() > 50) {
        details.push("tags: each tag must be 1-50 characters".to_string());
    }
    if let Some(t) = &req.tools_used {
        if t.chars().count() > 200 {
            details.push("toolsUsed: must be at most 200 characters".to_string());
        }
    }
    if let Some(l) = &req.location {
        if l.chars().count() > 100 {
            details.push("location: must be at most 100 characters".to_string());
        }
    }
    if !(req.image_url.starts_with("http://") || req.image_url.starts_with("https://")) {
        details.push("imageUrl: must be a valid URL".to_string());
    }
    if req.image_key.is_empty() {
        details.push("imageKey: is required".to_string());
    }
    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::InvalidInput {
            message: "Invalid input".to_string(),
            details,
        })
    }
}

fn validate_patch(req: &UpdatePostRequest) -> Result<(), ApiError> {
    let mut details = Vec::new();
    if let Some(t) = &req.title {
        let len = t.chars().count();
        if !(3..=100).contains(&len) {
            details.push("title: must be 3-100 characters".to_string());
        }
    }
    if let Some(d) = &req.description {
        if d.chars().count() > 2000 {
            details.push("description: must be at most 2000 characters".to_string());
        }
    }
    if let Some(t) = &req.post_type {
        if PostType::from_str_name(t).is_none() {
            details.push("type: must be one of ARTWORK, OUTFIT, TATTOO, BODY_ART".to_string());
        }
    }
    if let Some(tags) = &req.tags {
        if tags.len() > MAX_TAGS_PER_POST {
            details.push("tags: maximum 10 tags allowed".to_string());
        }
        if tags.iter().any(|t| t.trim().is_empty() || t.chars().count() > 50) {
            details.push("tags: each tag must be 1-50 characters".to_string());
        }
    }
    if let Some(t) = &req.tools_used {
        if t.chars().count() > 200 {
            details.push("toolsUsed: must be at most 200 characters".to_string());
        }
    }
    if let Some(l) = &req.location {
        if l.chars().count() > 100 {
            details.push("location: must be at most 100 characters".to_string());
        }
    }
    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::InvalidInput {
            message: "Invalid input".to_string(),
            details,
        })
    }
}

/// Insert-on-conflict-increment on the tag's unique slug; the atomic upsert
/// keeps usage counts correct under concurrent writers.
pub fn upsert_tag(conn: &mut PgConnection, name: &str) -> Result<Uuid, ApiError> {
    let slug = tag_slug(name);
    let id = diesel::insert_into(tags::table)
        .values((
            tags::name.eq(name),
            tags::slug.eq(&slug),
            tags::usage_count.eq(1),
        ))
        .on_conflict(tags::slug)
        .do_update()
        .set(tags::usage_count.eq(tags::usage_count + 1))
        .returning(tags::id)
        .get_result(conn)?;
    Ok(id)
}

fn link_tags(conn: &mut PgConnection, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), ApiError> {
    let mut ids = tag_ids.to_vec();
    ids.sort();
    ids.dedup();
    let links: Vec<NewPostTag> = ids
        .into_iter()
        .map(|tag_id| NewPostTag { post_id, tag_id })
        .collect();
    diesel::insert_into(post_tags::table)
        .values(&links)
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

fn category_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, ApiError> {
    let found: bool =
        diesel::select(diesel::dsl::exists(categories::table.find(id))).get_result(conn)?;
    Ok(found)
}

fn find_post(conn: &mut PgConnection, id: Uuid) -> Result<Post, ApiError> {
    posts::table
        .find(id)
        .select(Post::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("Post"))
}

/// Creation is a single transaction: tag upserts, the insert, the two-step
/// slug (it embeds the generated id), the tag links and the author counter
/// all commit together.
pub fn create_post_record(
    conn: &mut PgConnection,
    author_id: Uuid,
    req: &CreatePostRequest,
) -> Result<Post, ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| {
        if !category_exists(conn, req.category_id)? {
            return Err(ApiError::InvalidCategory);
        }

        let mut tag_ids = Vec::with_capacity(req.tags.len());
        for name in &req.tags {
            tag_ids.push(upsert_tag(conn, name.trim())?);
        }

        let new_post = NewPost {
            title: &req.title,
            description: req.description.as_deref(),
            post_type: &req.post_type,
            image_url: &req.image_url,
            image_key: &req.image_key,
            tools_used: req.tools_used.as_deref(),
            location: req.location.as_deref(),
            is_nsfw: req.is_nsfw,
            allow_comments: req.allow_comments,
            status: "PUBLISHED",
            slug: "",
            author_id,
            category_id: req.category_id,
            published_at: Utc::now(),
        };
        let post: Post = diesel::insert_into(posts::table)
            .values(&new_post)
            .returning(Post::as_returning())
            .get_result(conn)?;

        let slug = format!("{}-{}", slugify(&req.title), post.id);
        let post: Post = diesel::update(posts::table.find(post.id))
            .set(posts::slug.eq(&slug))
            .returning(Post::as_returning())
            .get_result(conn)?;

        link_tags(conn, post.id, &tag_ids)?;

        diesel::update(users::table.find(author_id))
            .set(users::posts_count.eq(users::posts_count + 1))
            .execute(conn)?;

        Ok(post)
    })
}

/// Owner-or-admin gated removal. Returns the deleted row so the caller can
/// clean up the blob afterwards; the cascade takes the likes, bookmarks,
/// comments and tag links with it.
pub fn delete_post_record(
    conn: &mut PgConnection,
    ctx: &AuthContext,
    post_id: Uuid,
) -> Result<Post, ApiError> {
    let existing = find_post(conn, post_id)?;
    authorize(ctx, existing.author_id)?;
    conn.transaction::<_, ApiError, _>(|conn| {
        diesel::delete(posts::table.find(post_id)).execute(conn)?;
        diesel::update(users::table.find(existing.author_id))
            .set(users::posts_count.eq(users::posts_count - 1))
            .execute(conn)?;
        Ok(())
    })?;
    Ok(existing)
}

/// Comment insert plus the post's counter in one transaction, refusing posts
/// that have comments switched off.
pub fn create_comment_record(
    conn: &mut PgConnection,
    user_id: Uuid,
    post_id: Uuid,
    content: &str,
    parent_id: Option<Uuid>,
) -> Result<Comment, ApiError> {
    let content = content.trim();
    if content.is_empty() || content.chars().count() > 1000 {
        return Err(ApiError::invalid("Comment must be 1-1000 characters"));
    }

    let post = find_post(conn, post_id)?;
    if !post.allow_comments {
        return Err(ApiError::CommentsDisabled);
    }
    if let Some(parent) = parent_id {
        let parent_ok: bool = diesel::select(diesel::dsl::exists(
            comments::table
                .filter(comments::id.eq(parent))
                .filter(comments::post_id.eq(post_id)),
        ))
        .get_result(conn)?;
        if !parent_ok {
            return Err(ApiError::invalid("Parent comment does not exist"));
        }
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        let comment: Comment = diesel::insert_into(comments::table)
            .values(&NewComment {
                content,
                post_id,
                user_id,
                parent_id,
            })
            .returning(Comment::as_returning())
            .get_result(conn)?;
        diesel::update(posts::table.find(post_id))
            .set(posts::comments_count.eq(posts::comments_count + 1))
            .execute(conn)?;
        Ok(comment)
    })
}

fn hydrate_posts(conn: &mut PgConnection, rows: Vec<Post>) -> Result<Vec<PostView>, ApiError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let post_ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
    let author_ids: Vec<Uuid> = rows.iter().map(|p| p.author_id).collect();
    let category_ids: Vec<Uuid> = rows.iter().map(|p| p.category_id).collect();

    let authors: HashMap<Uuid, User> = users::table
        .filter(users::id.eq_any(&author_ids))
        .select(User::as_select())
        .load::<User>(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let cats: HashMap<Uuid, Category> = categories::table
        .filter(categories::id.eq_any(&category_ids))
        .select(Category::as_select())
        .load::<Category>(conn)?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let mut tags_by_post: HashMap<Uuid, Vec<TagInfo>> = HashMap::new();
    let tag_rows: Vec<(Uuid, Tag)> = post_tags::table
        .inner_join(tags::table)
        .filter(post_tags::post_id.eq_any(&post_ids))
        .select((post_tags::post_id, Tag::as_select()))
        .load(conn)?;
    for (pid, tag) in tag_rows {
        tags_by_post.entry(pid).or_default().push(TagInfo {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        });
    }

    let mut views = Vec::with_capacity(rows.len());
    for post in rows {
        let author = authors
            .get(&post.author_id)
            .ok_or_else(|| ApiError::Failed(anyhow::anyhow!("post {} has no author row", post.id)))?;
        let category = cats.get(&post.category_id).ok_or_else(|| {
            ApiError::Failed(anyhow::anyhow!("post {} has no category row", post.id))
        })?;
        let tags = tags_by_post.remove(&post.id).unwrap_or_default();
        views.push(PostView {
            id: post.id,
            title: post.title,
            description: post.description,
            post_type: post.post_type,
            image_url: post.image_url,
            image_key: post.image_key,
            tools_used: post.tools_used,
            location: post.location,
            is_nsfw: post.is_nsfw,
            allow_comments: post.allow_comments,
            status: post.status,
            slug: post.slug,
            likes_count: post.likes_count,
            views_count: post.views_count,
            bookmarks_count: post.bookmarks_count,
            comments_count: post.comments_count,
            published_at: post.published_at,
            created_at: post.created_at,
            author: AuthorInfo::from_user(author),
            category: CategoryInfo {
                id: category.id,
                name: category.name.clone(),
                slug: category.slug.clone(),
                color: category.color.clone(),
            },
            tags,
        });
    }
    Ok(views)
}

fn hydrate_post(conn: &mut PgConnection, post: Post) -> Result<PostView, ApiError> {
    hydrate_posts(conn, vec![post])?
        .pop()
        .ok_or_else(|| ApiError::Failed(anyhow::anyhow!("hydration dropped the post")))
}

fn load_comments(conn: &mut PgConnection, post_id: Uuid) -> Result<Vec<CommentView>, ApiError> {
    let top: Vec<Comment> = comments::table
        .filter(comments::post_id.eq(post_id))
        .filter(comments::parent_id.is_null())
        .order(comments::created_at.desc())
        .limit(10)
        .select(Comment::as_select())
        .load(conn)?;
    let top_ids: Vec<Uuid> = top.iter().map(|c| c.id).collect();

    let replies: Vec<Comment> = if top_ids.is_empty() {
        Vec::new()
    } else {
        comments::table
            .filter(comments::parent_id.eq_any(&top_ids))
            .order(comments::created_at.asc())
            .select(Comment::as_select())
            .load(conn)?
    };

    let mut user_ids: Vec<Uuid> = top.iter().chain(replies.iter()).map(|c| c.user_id).collect();
    user_ids.sort();
    user_ids.dedup();
    let commenters: HashMap<Uuid, User> = users::table
        .filter(users::id.eq_any(&user_ids))
        .select(User::as_select())
        .load::<User>(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let view_of = |c: &Comment, replies: Vec<CommentView>| -> Result<CommentView, ApiError> {
        let user = commenters
            .get(&c.user_id)
            .ok_or_else(|| ApiError::Failed(anyhow::anyhow!("comment {} has no user row", c.id)))?;
        Ok(CommentView {
            id: c.id,
            content: c.content.clone(),
            created_at: c.created_at,
            user: AuthorInfo::from_user(user),
            replies,
        })
    };

    let mut replies_by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    for r in &replies {
        if let Some(parent) = r.parent_id {
            let v = view_of(r, Vec::new())?;
            replies_by_parent.entry(parent).or_default().push(v);
        }
    }

    top.iter()
        .map(|c| {
            let children = replies_by_parent.remove(&c.id).unwrap_or_default();
            view_of(c, children)
        })
        .collect()
}

// ===== Handlers =====

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let page = PageParams::new(query.page, query.limit);
    let mut conn = db_conn(&state.conn)?;

    let empty = |page: PageParams| PostListResponse {
        posts: Vec::new(),
        pagination: PaginationInfo {
            page: page.page,
            limit: page.limit,
            total: 0,
            total_pages: 0,
        },
    };

    // Category filter is by slug; an unknown slug matches nothing.
    let category_id = match &query.category {
        Some(slug) => {
            let found: Option<Uuid> = categories::table
                .filter(categories::slug.eq(slug))
                .select(categories::id)
                .first(&mut conn)
                .optional()?;
            match found {
                Some(id) => Some(id),
                None => return Ok(Json(empty(page))),
            }
        }
        None => None,
    };
    let post_type = match &query.post_type {
        Some(t) => match PostType::from_str_name(t) {
            Some(t) => Some(t),
            None => return Ok(Json(empty(page))),
        },
        None => None,
    };

    let mut list_q = posts::table
        .into_boxed()
        .filter(posts::status.eq("PUBLISHED"));
    let mut count_q = posts::table
        .select(count_star())
        .into_boxed()
        .filter(posts::status.eq("PUBLISHED"));
    if let Some(id) = category_id {
        list_q = list_q.filter(posts::category_id.eq(id));
        count_q = count_q.filter(posts::category_id.eq(id));
    }
    if let Some(t) = post_type {
        list_q = list_q.filter(posts::post_type.eq(t.as_str()));
        count_q = count_q.filter(posts::post_type.eq(t.as_str()));
    }
    if let Some(author) = query.author_id {
        list_q = list_q.filter(posts::author_id.eq(author));
        count_q = count_q.filter(posts::author_id.eq(author));
    }

    list_q = match query.sort.as_deref() {
        Some("trending") => list_q.order(posts::likes_count.desc()),
        Some("popular") => list_q.order(posts::views_count.desc()),
        _ => list_q.order(posts::published_at.desc()),
    };

    let total: i64 = count_q.get_result(&mut conn)?;
    let rows: Vec<Post> = list_q
        .offset(page.offset())
        .limit(page.limit)
        .select(Post::as_select())
        .load(&mut conn)?;

    let views = hydrate_posts(&mut conn, rows)?;
    Ok(Json(PostListResponse {
        posts: views,
        pagination: PaginationInfo {
            page: page.page,
            limit: page.limit,
            total,
            total_pages: page.total_pages(total),
        },
    }))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    MaybeAuthSession(session): MaybeAuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<PostDetailResponse>, ApiError> {
    let mut conn = db_conn(&state.conn)?;
    let post = find_post(&mut conn, id)?;

    // Every successful read counts a view; no per-viewer dedup by design.
    diesel::update(posts::table.find(id))
        .set(posts::views_count.eq(posts::views_count + 1))
        .execute(&mut conn)?;

    let (is_liked, is_bookmarked) = match session {
        Some(ctx) => {
            let liked: bool = diesel::select(diesel::dsl::exists(
                likes::table
                    .filter(likes::user_id.eq(ctx.user_id))
                    .filter(likes::post_id.eq(id)),
            ))
            .get_result(&mut conn)?;
            let bookmarked: bool = diesel::select(diesel::dsl::exists(
                crate::shared::schema::bookmarks::table
                    .filter(crate::shared::schema::bookmarks::user_id.eq(ctx.user_id))
                    .filter(crate::shared::schema::bookmarks::post_id.eq(id)),
            ))
            .get_result(&mut conn)?;
            (liked, bookmarked)
        }
        None => (false, false),
    };

    let comment_views = load_comments(&mut conn, id)?;
    let view = hydrate_post(&mut conn, post)?;
    Ok(Json(PostDetailResponse {
        post: view,
        is_liked,
        is_bookmarked,
        comments: comment_views,
    }))
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    validate_draft(&req)?;
    let mut conn = db_conn(&state.conn)?;
    let post = create_post_record(&mut conn, ctx.user_id, &req)?;
    info!("post created: {} by {}", post.id, ctx.user_id);
    let view = hydrate_post(&mut conn, post)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostView>, ApiError> {
    let mut conn = db_conn(&state.conn)?;
    let existing = find_post(&mut conn, id)?;
    authorize(&ctx, existing.author_id)?;
    validate_patch(&req)?;

    let post = conn.transaction::<_, ApiError, _>(|conn| {
        if let Some(cat) = req.category_id {
            if !category_exists(conn, cat)? {
                return Err(ApiError::InvalidCategory);
            }
        }

        let changes = PostChanges {
            title: req.title.as_deref(),
            description: req.description.as_deref(),
            post_type: req.post_type.as_deref(),
            category_id: req.category_id,
            tools_used: req.tools_used.as_deref(),
            location: req.location.as_deref(),
            is_nsfw: req.is_nsfw,
            allow_comments: req.allow_comments,
        };
        let post: Post = diesel::update(posts::table.find(id))
            .set((&changes, posts::updated_at.eq(Utc::now())))
            .returning(Post::as_returning())
            .get_result(conn)?;

        // Re-linking never decrements tag usage counts; drops are accepted
        // drift, matching creation-side accounting.
        if let Some(tag_names) = &req.tags {
            diesel::delete(post_tags::table.filter(post_tags::post_id.eq(id))).execute(conn)?;
            let mut tag_ids = Vec::with_capacity(tag_names.len());
            for name in tag_names {
                tag_ids.push(upsert_tag(conn, name.trim())?);
            }
            link_tags(conn, id, &tag_ids)?;
        }

        Ok(post)
    })?;

    let view = hydrate_post(&mut conn, post)?;
    Ok(Json(view))
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut conn = db_conn(&state.conn)?;
    let removed = delete_post_record(&mut conn, &ctx, id)?;

    // Best-effort: the database record is authoritative, an orphaned blob is
    // acceptable.
    if let Some(client) = &state.drive {
        if let Err(e) =
            crate::drive::delete_object(client, &state.config.drive.bucket, &removed.image_key)
                .await
        {
            warn!("failed to delete blob for post {id}: {e}");
        }
    }

    info!("post deleted: {id} by {}", ctx.user_id);
    Ok(Json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let mut conn = db_conn(&state.conn)?;
    let comment = create_comment_record(&mut conn, ctx.user_id, id, &req.content, req.parent_id)?;

    let user: User = users::table
        .find(ctx.user_id)
        .select(User::as_select())
        .first(&mut conn)?;
    Ok((
        StatusCode::CREATED,
        Json(CommentView {
            id: comment.id,
            content: comment.content,
            created_at: comment.created_at,
            user: AuthorInfo::from_user(&user),
            replies: Vec::new(),
        }),
    ))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/:id",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route(
            "/api/posts/:id/like",
            post(interactions::like_post).delete(interactions::unlike_post),
        )
        .route(
            "/api/posts/:id/bookmark",
            post(interactions::bookmark_post).delete(interactions::unbookmark_post),
        )
        .route("/api/posts/:id/comments", post(create_comment))
}
