diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Varchar,
        username -> Varchar,
        name -> Varchar,
        password_hash -> Nullable<Text>,
        avatar -> Nullable<Text>,
        bio -> Nullable<Text>,
        role -> Varchar,
        status -> Varchar,
        posts_count -> Int4,
        total_likes -> Int4,
        followers_count -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    categories (id) {
        id -> Uuid,
        name -> Varchar,
        slug -> Varchar,
        description -> Nullable<Text>,
        color -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tags (id) {
        id -> Uuid,
        name -> Varchar,
        slug -> Varchar,
        usage_count -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    posts (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Nullable<Varchar>,
        post_type -> Varchar,
        image_url -> Text,
        image_key -> Text,
        tools_used -> Nullable<Varchar>,
        location -> Nullable<Varchar>,
        is_nsfw -> Bool,
        allow_comments -> Bool,
        status -> Varchar,
        slug -> Varchar,
        likes_count -> Int4,
        views_count -> Int4,
        bookmarks_count -> Int4,
        comments_count -> Int4,
        author_id -> Uuid,
        category_id -> Uuid,
        published_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    post_tags (post_id, tag_id) {
        post_id -> Uuid,
        tag_id -> Uuid,
    }
}

diesel::table! {
    likes (id) {
        id -> Uuid,
        user_id -> Uuid,
        post_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    bookmarks (id) {
        id -> Uuid,
        user_id -> Uuid,
        post_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Uuid,
        content -> Varchar,
        post_id -> Uuid,
        user_id -> Uuid,
        parent_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(posts -> users (author_id));
diesel::joinable!(posts -> categories (category_id));
diesel::joinable!(post_tags -> posts (post_id));
diesel::joinable!(post_tags -> tags (tag_id));
diesel::joinable!(likes -> users (user_id));
diesel::joinable!(likes -> posts (post_id));
diesel::joinable!(bookmarks -> users (user_id));
diesel::joinable!(bookmarks -> posts (post_id));
diesel::joinable!(comments -> users (user_id));
diesel::joinable!(comments -> posts (post_id));

diesel::allow_tables_to_appear_in_same_query!(
    users, categories, tags, posts, post_tags, likes, bookmarks, comments,
);
