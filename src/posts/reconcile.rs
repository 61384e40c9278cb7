use crate::shared::error::ApiError;
use crate::shared::models::Post;
use crate::shared::schema::{bookmarks, comments, likes, posts, users};
use diesel::prelude::*;
use log::info;
use uuid::Uuid;

/// Drift found (stored minus actual) before the counters were rewritten.
/// All zeroes means the denormalized counts were already truthful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftReport {
    pub post_id: Uuid,
    pub likes: i64,
    pub bookmarks: i64,
    pub comments: i64,
    pub author_total_likes: i64,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.likes == 0 && self.bookmarks == 0 && self.comments == 0 && self.author_total_likes == 0
    }
}

/// Recompute a post's counters from the ledgers and rewrite any that
/// drifted. Ledger rows are the source of truth; counters are a cache.
pub fn reconcile_post(conn: &mut PgConnection, post_id: Uuid) -> Result<DriftReport, ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| {
        let post: Post = posts::table
            .find(post_id)
            .select(Post::as_select())
            .first(conn)
            .optional()?
            .ok_or(ApiError::NotFound("Post"))?;

        let actual_likes: i64 = likes::table
            .filter(likes::post_id.eq(post_id))
            .count()
            .get_result(conn)?;
        let actual_bookmarks: i64 = bookmarks::table
            .filter(bookmarks::post_id.eq(post_id))
            .count()
            .get_result(conn)?;
        let actual_comments: i64 = comments::table
            .filter(comments::post_id.eq(post_id))
            .count()
            .get_result(conn)?;
        let actual_author_likes: i64 = likes::table
            .inner_join(posts::table)
            .filter(posts::author_id.eq(post.author_id))
            .count()
            .get_result(conn)?;

        let stored_author_likes: i32 = users::table
            .find(post.author_id)
            .select(users::total_likes)
            .first(conn)?;

        let report = DriftReport {
            post_id,
            likes: post.likes_count as i64 - actual_likes,
            bookmarks: post.bookmarks_count as i64 - actual_bookmarks,
            comments: post.comments_count as i64 - actual_comments,
            author_total_likes: stored_author_likes as i64 - actual_author_likes,
        };

        if !report.is_clean() {
            diesel::update(posts::table.find(post_id))
                .set((
                    posts::likes_count.eq(actual_likes as i32),
                    posts::bookmarks_count.eq(actual_bookmarks as i32),
                    posts::comments_count.eq(actual_comments as i32),
                ))
                .execute(conn)?;
            diesel::update(users::table.find(post.author_id))
                .set(users::total_likes.eq(actual_author_likes as i32))
                .execute(conn)?;
            info!(
                "reconciled post {post_id}: likes {:+}, bookmarks {:+}, comments {:+}, author total {:+}",
                report.likes, report.bookmarks, report.comments, report.author_total_likes
            );
        }

        Ok(report)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report_has_no_drift() {
        let r = DriftReport {
            post_id: Uuid::new_v4(),
            likes: 0,
            bookmarks: 0,
            comments: 0,
            author_total_likes: 0,
        };
        assert!(r.is_clean());
    }

    #[test]
    fn any_nonzero_field_is_drift() {
        let r = DriftReport {
            post_id: Uuid::new_v4(),
            likes: 0,
            bookmarks: -1,
            comments: 0,
            author_total_likes: 0,
        };
        assert!(!r.is_clean());
    }
}
