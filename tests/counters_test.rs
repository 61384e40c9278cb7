//! Counter consistency tests against a real Postgres instance.
//!
//! Set TEST_DATABASE_URL (or DATABASE_URL) to run; otherwise each test
//! prints a skip notice and passes. Everything runs inside a test
//! transaction, so the database is left untouched.

use diesel::prelude::*;
use swappy_server::posts::interactions::{bookmark_add, bookmark_remove, like, unlike};
use swappy_server::posts::reconcile::reconcile_post;
use swappy_server::auth::AuthContext;
use swappy_server::posts::{
    create_comment_record, create_post_record, delete_post_record, CreatePostRequest,
};
use swappy_server::shared::error::ApiError;
use swappy_server::shared::models::{NewUser, Post, User, UserRole, UserStatus};
use swappy_server::shared::schema::{categories, comments, likes, posts, tags, users};
use swappy_server::shared::utils::run_migrations;
use uuid::Uuid;

fn test_conn() -> Option<PgConnection> {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok();
    let Some(url) = url else {
        println!("skipping: TEST_DATABASE_URL not set");
        return None;
    };
    match PgConnection::establish(&url) {
        Ok(mut conn) => {
            run_migrations(&mut conn).expect("migrations");
            conn.begin_test_transaction().expect("test transaction");
            Some(conn)
        }
        Err(e) => {
            println!("skipping: database unavailable: {e}");
            None
        }
    }
}

fn seed_user(conn: &mut PgConnection, tag: &str) -> User {
    let suffix = Uuid::new_v4().simple().to_string();
    let email = format!("{tag}-{suffix}@example.com");
    let username = format!("{tag}_{}", &suffix[..8]);
    diesel::insert_into(users::table)
        .values(&NewUser {
            email: &email,
            username: &username,
            name: tag,
            password_hash: None,
            role: UserRole::User.as_str(),
            status: UserStatus::Active.as_str(),
        })
        .returning(User::as_returning())
        .get_result(conn)
        .expect("seed user")
}

fn seeded_category(conn: &mut PgConnection) -> Uuid {
    categories::table
        .filter(categories::slug.eq("tattoos"))
        .select(categories::id)
        .first(conn)
        .expect("seeded category")
}

fn draft(category_id: Uuid, title: &str, tags: Vec<String>) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        description: None,
        post_type: "TATTOO".to_string(),
        category_id,
        tags,
        tools_used: None,
        location: None,
        is_nsfw: false,
        allow_comments: true,
        image_url: "https://cdn.example.com/uploads/test.jpg".to_string(),
        image_key: "uploads/test/test.jpg".to_string(),
    }
}

fn seed_post(conn: &mut PgConnection, author: &User, title: &str, tags: Vec<String>) -> Post {
    let category_id = seeded_category(conn);
    create_post_record(conn, author.id, &draft(category_id, title, tags)).expect("seed post")
}

fn session(user: &User) -> AuthContext {
    AuthContext {
        user_id: user.id,
        role: UserRole::User,
        status: UserStatus::Active,
    }
}

fn counters(conn: &mut PgConnection, post_id: Uuid) -> (i32, i32, i32) {
    posts::table
        .find(post_id)
        .select((
            posts::likes_count,
            posts::bookmarks_count,
            posts::comments_count,
        ))
        .first(conn)
        .expect("post counters")
}

fn author_total_likes(conn: &mut PgConnection, user_id: Uuid) -> i32 {
    users::table
        .find(user_id)
        .select(users::total_likes)
        .first(conn)
        .expect("author row")
}

#[test]
fn duplicate_like_is_rejected_and_counts_once() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let fan = seed_user(&mut conn, "fan");
    let post = seed_post(&mut conn, &author, "Koi sleeve", vec![]);

    like(&mut conn, fan.id, post.id).expect("first like");
    assert_eq!(counters(&mut conn, post.id).0, 1);
    assert_eq!(author_total_likes(&mut conn, author.id), 1);

    let err = like(&mut conn, fan.id, post.id).expect_err("second like");
    assert!(matches!(err, ApiError::AlreadyLiked));

    assert_eq!(counters(&mut conn, post.id).0, 1);
    assert_eq!(author_total_likes(&mut conn, author.id), 1);
    let rows: i64 = likes::table
        .filter(likes::post_id.eq(post.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn like_unlike_round_trip_restores_counters() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let fan = seed_user(&mut conn, "fan");
    let post = seed_post(&mut conn, &author, "Neon outfit", vec![]);

    like(&mut conn, fan.id, post.id).unwrap();
    unlike(&mut conn, fan.id, post.id).unwrap();

    assert_eq!(counters(&mut conn, post.id).0, 0);
    assert_eq!(author_total_likes(&mut conn, author.id), 0);

    let err = unlike(&mut conn, fan.id, post.id).expect_err("nothing left to unlike");
    assert!(matches!(err, ApiError::NotLiked));
    assert_eq!(counters(&mut conn, post.id).0, 0);
}

#[test]
fn bookmarks_do_not_touch_author_aggregate() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let reader = seed_user(&mut conn, "reader");
    let post = seed_post(&mut conn, &author, "Blackwork study", vec![]);

    bookmark_add(&mut conn, reader.id, post.id).unwrap();
    assert_eq!(counters(&mut conn, post.id).1, 1);
    assert_eq!(author_total_likes(&mut conn, author.id), 0);

    let err = bookmark_add(&mut conn, reader.id, post.id).expect_err("duplicate bookmark");
    assert!(matches!(err, ApiError::AlreadyBookmarked));

    bookmark_remove(&mut conn, reader.id, post.id).unwrap();
    assert_eq!(counters(&mut conn, post.id).1, 0);

    let err = bookmark_remove(&mut conn, reader.id, post.id).expect_err("already removed");
    assert!(matches!(err, ApiError::NotBookmarked));
}

#[test]
fn interactions_on_missing_post_are_not_found() {
    let Some(mut conn) = test_conn() else { return };
    let fan = seed_user(&mut conn, "fan");
    let ghost = Uuid::new_v4();
    assert!(matches!(
        like(&mut conn, fan.id, ghost),
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        bookmark_add(&mut conn, fan.id, ghost),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn reconcile_repairs_corrupted_counters() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let fan = seed_user(&mut conn, "fan");
    let post = seed_post(&mut conn, &author, "Drifted post", vec![]);
    like(&mut conn, fan.id, post.id).unwrap();

    // Sabotage the cached counts.
    diesel::update(posts::table.find(post.id))
        .set((posts::likes_count.eq(7), posts::bookmarks_count.eq(3)))
        .execute(&mut conn)
        .unwrap();
    diesel::update(users::table.find(author.id))
        .set(users::total_likes.eq(9))
        .execute(&mut conn)
        .unwrap();

    let report = reconcile_post(&mut conn, post.id).unwrap();
    assert_eq!(report.likes, 6);
    assert_eq!(report.bookmarks, 3);
    assert_eq!(report.author_total_likes, 8);

    assert_eq!(counters(&mut conn, post.id), (1, 0, 0));
    assert_eq!(author_total_likes(&mut conn, author.id), 1);

    let second = reconcile_post(&mut conn, post.id).unwrap();
    assert!(second.is_clean());
}

#[test]
fn create_post_sets_slug_and_collapses_tag_case() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");

    let first = seed_post(
        &mut conn,
        &author,
        "Portrait Study",
        vec!["Portrait".to_string()],
    );
    assert_eq!(first.slug, format!("portrait-study-{}", first.id));
    assert_eq!(first.status, "PUBLISHED");

    seed_post(&mut conn, &author, "Another", vec!["portrait".to_string()]);

    let (rows, usage): (i64, i32) = (
        tags::table
            .filter(tags::slug.eq("portrait"))
            .count()
            .get_result(&mut conn)
            .unwrap(),
        tags::table
            .filter(tags::slug.eq("portrait"))
            .select(tags::usage_count)
            .first(&mut conn)
            .unwrap(),
    );
    assert_eq!(rows, 1, "case variants collapse onto one tag row");
    assert_eq!(usage, 2);

    let posts_count: i32 = users::table
        .find(author.id)
        .select(users::posts_count)
        .first(&mut conn)
        .unwrap();
    assert_eq!(posts_count, 2);
}

#[test]
fn non_owner_delete_is_forbidden_and_leaves_state() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let fan = seed_user(&mut conn, "fan");
    let intruder = seed_user(&mut conn, "intruder");
    let post = seed_post(&mut conn, &author, "Guarded post", vec![]);
    like(&mut conn, fan.id, post.id).unwrap();

    let err = delete_post_record(&mut conn, &session(&intruder), post.id)
        .expect_err("stranger must not delete");
    assert!(matches!(err, ApiError::Forbidden));

    let still_there: i64 = posts::table
        .filter(posts::id.eq(post.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(still_there, 1);
    assert_eq!(counters(&mut conn, post.id), (1, 0, 0));
    let like_rows: i64 = likes::table
        .filter(likes::post_id.eq(post.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(like_rows, 1);
    let posts_count: i32 = users::table
        .find(author.id)
        .select(users::posts_count)
        .first(&mut conn)
        .unwrap();
    assert_eq!(posts_count, 1);
}

#[test]
fn owner_delete_cascades_and_decrements() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let fan = seed_user(&mut conn, "fan");
    let post = seed_post(&mut conn, &author, "Short lived", vec![]);
    like(&mut conn, fan.id, post.id).unwrap();

    let removed = delete_post_record(&mut conn, &session(&author), post.id).unwrap();
    assert_eq!(removed.id, post.id);

    let remaining: i64 = posts::table
        .filter(posts::id.eq(post.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(remaining, 0);
    let like_rows: i64 = likes::table
        .filter(likes::post_id.eq(post.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(like_rows, 0, "ledger rows go with the post");
    let posts_count: i32 = users::table
        .find(author.id)
        .select(users::posts_count)
        .first(&mut conn)
        .unwrap();
    assert_eq!(posts_count, 0);
}

#[test]
fn admin_may_delete_another_users_post() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let admin = seed_user(&mut conn, "admin");
    let post = seed_post(&mut conn, &author, "Moderated away", vec![]);

    let admin_session = AuthContext {
        user_id: admin.id,
        role: UserRole::Admin,
        status: UserStatus::Active,
    };
    delete_post_record(&mut conn, &admin_session, post.id).unwrap();

    let remaining: i64 = posts::table
        .filter(posts::id.eq(post.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn comments_respect_the_post_switch() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let reader = seed_user(&mut conn, "reader");
    let category_id = seeded_category(&mut conn);

    let mut closed = draft(category_id, "No comments here", vec![]);
    closed.allow_comments = false;
    let closed = create_post_record(&mut conn, author.id, &closed).unwrap();

    let err = create_comment_record(&mut conn, reader.id, closed.id, "First!", None)
        .expect_err("comments are off");
    assert!(matches!(err, ApiError::CommentsDisabled));
    assert_eq!(counters(&mut conn, closed.id).2, 0);
    let rows: i64 = comments::table
        .filter(comments::post_id.eq(closed.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(rows, 0);

    let open = seed_post(&mut conn, &author, "Open floor", vec![]);
    let comment = create_comment_record(&mut conn, reader.id, open.id, "  Nice work  ", None).unwrap();
    assert_eq!(comment.content, "Nice work");
    assert_eq!(counters(&mut conn, open.id).2, 1);
}

#[test]
fn unknown_category_rejects_the_draft() {
    let Some(mut conn) = test_conn() else { return };
    let author = seed_user(&mut conn, "author");
    let err = create_post_record(
        &mut conn,
        author.id,
        &draft(Uuid::new_v4(), "Orphan post", vec![]),
    )
    .expect_err("category does not exist");
    assert!(matches!(err, ApiError::InvalidCategory));

    let posts_count: i32 = users::table
        .find(author.id)
        .select(users::posts_count)
        .first(&mut conn)
        .unwrap();
    assert_eq!(posts_count, 0, "failed create must not bump the counter");
}
