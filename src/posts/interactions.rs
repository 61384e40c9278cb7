use crate::auth::AuthSession;
use crate::posts::MessageResponse;
use crate::shared::error::{is_unique_violation, ApiError};
use crate::shared::models::{NewBookmark, NewLike};
use crate::shared::schema::{bookmarks, likes, posts, users};
use crate::shared::state::AppState;
use crate::shared::utils::db_conn;
use axum::extract::{Path, State};
use axum::response::Json;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

fn post_author(conn: &mut PgConnection, post_id: Uuid) -> Result<Uuid, ApiError> {
    posts::table
        .find(post_id)
        .select(posts::author_id)
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("Post"))
}

fn pair_exists(
    conn: &mut PgConnection,
    user_id: Uuid,
    post_id: Uuid,
    table: Ledger,
) -> Result<bool, ApiError> {
    let found: bool = match table {
        Ledger::Likes => diesel::select(diesel::dsl::exists(
            likes::table
                .filter(likes::user_id.eq(user_id))
                .filter(likes::post_id.eq(post_id)),
        ))
        .get_result(conn)?,
        Ledger::Bookmarks => diesel::select(diesel::dsl::exists(
            bookmarks::table
                .filter(bookmarks::user_id.eq(user_id))
                .filter(bookmarks::post_id.eq(post_id)),
        ))
        .get_result(conn)?,
    };
    Ok(found)
}

#[derive(Clone, Copy)]
enum Ledger {
    Likes,
    Bookmarks,
}

/// Record a like: the ledger row and both counters commit in one
/// transaction. The friendly pre-check reports duplicates; under a
/// concurrent race the unique (user, post) constraint is what actually
/// decides, and its violation maps to the same error.
pub fn like(conn: &mut PgConnection, user_id: Uuid, post_id: Uuid) -> Result<(), ApiError> {
    let author_id = post_author(conn, post_id)?;
    if pair_exists(conn, user_id, post_id, Ledger::Likes)? {
        return Err(ApiError::AlreadyLiked);
    }
    conn.transaction::<_, ApiError, _>(|conn| {
        diesel::insert_into(likes::table)
            .values(&NewLike { user_id, post_id })
            .execute(conn)
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::AlreadyLiked
                } else {
                    e.into()
                }
            })?;
        diesel::update(posts::table.find(post_id))
            .set(posts::likes_count.eq(posts::likes_count + 1))
            .execute(conn)?;
        diesel::update(users::table.find(author_id))
            .set(users::total_likes.eq(users::total_likes + 1))
            .execute(conn)?;
        Ok(())
    })
}

pub fn unlike(conn: &mut PgConnection, user_id: Uuid, post_id: Uuid) -> Result<(), ApiError> {
    let author_id = post_author(conn, post_id)?;
    conn.transaction::<_, ApiError, _>(|conn| {
        let removed = diesel::delete(
            likes::table
                .filter(likes::user_id.eq(user_id))
                .filter(likes::post_id.eq(post_id)),
        )
        .execute(conn)?;
        // Zero rows means there was nothing to remove; rolling back here
        // keeps the counters untouched.
        if removed == 0 {
            return Err(ApiError::NotLiked);
        }
        diesel::update(posts::table.find(post_id))
            .set(posts::likes_count.eq(posts::likes_count - 1))
            .execute(conn)?;
        diesel::update(users::table.find(author_id))
            .set(users::total_likes.eq(users::total_likes - 1))
            .execute(conn)?;
        Ok(())
    })
}

/// Bookmarks mirror likes but are private to the bookmarking user, so the
/// author's aggregate is not touched.
pub fn bookmark_add(conn: &mut PgConnection, user_id: Uuid, post_id: Uuid) -> Result<(), ApiError> {
    post_author(conn, post_id)?;
    if pair_exists(conn, user_id, post_id, Ledger::Bookmarks)? {
        return Err(ApiError::AlreadyBookmarked);
    }
    conn.transaction::<_, ApiError, _>(|conn| {
        diesel::insert_into(bookmarks::table)
            .values(&NewBookmark { user_id, post_id })
            .execute(conn)
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::AlreadyBookmarked
                } else {
                    e.into()
                }
            })?;
        diesel::update(posts::table.find(post_id))
            .set(posts::bookmarks_count.eq(posts::bookmarks_count + 1))
            .execute(conn)?;
        Ok(())
    })
}

pub fn bookmark_remove(
    conn: &mut PgConnection,
    user_id: Uuid,
    post_id: Uuid,
) -> Result<(), ApiError> {
    post_author(conn, post_id)?;
    conn.transaction::<_, ApiError, _>(|conn| {
        let removed = diesel::delete(
            bookmarks::table
                .filter(bookmarks::user_id.eq(user_id))
                .filter(bookmarks::post_id.eq(post_id)),
        )
        .execute(conn)?;
        if removed == 0 {
            return Err(ApiError::NotBookmarked);
        }
        diesel::update(posts::table.find(post_id))
            .set(posts::bookmarks_count.eq(posts::bookmarks_count - 1))
            .execute(conn)?;
        Ok(())
    })
}

pub async fn like_post(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut conn = db_conn(&state.conn)?;
    like(&mut conn, ctx.user_id, id)?;
    Ok(Json(MessageResponse {
        message: "Post liked".to_string(),
    }))
}

pub async fn unlike_post(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut conn = db_conn(&state.conn)?;
    unlike(&mut conn, ctx.user_id, id)?;
    Ok(Json(MessageResponse {
        message: "Post unliked".to_string(),
    }))
}

pub async fn bookmark_post(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut conn = db_conn(&state.conn)?;
    bookmark_add(&mut conn, ctx.user_id, id)?;
    Ok(Json(MessageResponse {
        message: "Post bookmarked".to_string(),
    }))
}

pub async fn unbookmark_post(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut conn = db_conn(&state.conn)?;
    bookmark_remove(&mut conn, ctx.user_id, id)?;
    Ok(Json(MessageResponse {
        message: "Bookmark removed".to_string(),
    }))
}
