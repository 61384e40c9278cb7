pub mod api_router;
pub mod auth;
pub mod config;
pub mod drive;
pub mod posts;
pub mod shared;
