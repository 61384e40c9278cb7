use crate::auth::SessionVerifier;
use crate::config::AppConfig;
use crate::shared::utils::DbPool;
use aws_sdk_s3::Client as S3Client;
use std::sync::Arc;

pub struct AppState {
    pub config: AppConfig,
    pub conn: DbPool,
    pub drive: Option<S3Client>,
    pub sessions: Arc<dyn SessionVerifier>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            conn: self.conn.clone(),
            drive: self.drive.clone(),
            sessions: Arc::clone(&self.sessions),
        }
    }
}
