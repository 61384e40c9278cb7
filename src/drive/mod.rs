use crate::auth::AuthSession;
use crate::config::DriveConfig;
use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use log::error;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: i64 = 10 * 1024 * 1024;
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(300);
const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignRequest {
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignResponse {
    pub upload_url: String,
    pub key: String,
    pub public_url: String,
}

pub async fn init_drive(config: &DriveConfig) -> anyhow::Result<S3Client> {
    let endpoint = if !config.server.ends_with('/') {
        format!("{}/", config.server)
    } else {
        config.server.clone()
    };

    let base_config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .region("auto")
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "static",
        ))
        .load()
        .await;

    let s3_config = S3ConfigBuilder::from(&base_config)
        .force_path_style(true)
        .build();

    Ok(S3Client::from_conf(s3_config))
}

pub fn validate_upload_params(
    file_name: &str,
    file_type: &str,
    file_size: i64,
) -> Result<(), ApiError> {
    if !ALLOWED_TYPES.contains(&file_type) {
        return Err(ApiError::invalid(
            "Invalid file type. Allowed types: JPEG, PNG, WebP, GIF",
        ));
    }
    if file_size <= 0 {
        return Err(ApiError::invalid("File size must be positive"));
    }
    if file_size > MAX_UPLOAD_BYTES {
        return Err(ApiError::invalid("File size exceeds 10MB limit"));
    }
    if file_name.is_empty() {
        return Err(ApiError::invalid("File name is required"));
    }
    if file_name.len() > 255 {
        return Err(ApiError::invalid("File name too long"));
    }
    Ok(())
}

/// Key namespaced by uploader with a collision-resistant suffix:
/// `uploads/{user}/{millis}-{random}.{ext}`.
pub fn object_key(user_id: Uuid, file_name: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    format!("uploads/{user_id}/{timestamp}-{token}.{extension}")
}

pub async fn sign_upload(
    State(state): State<Arc<AppState>>,
    AuthSession(ctx): AuthSession,
    Json(req): Json<UploadSignRequest>,
) -> Result<Json<UploadSignResponse>, ApiError> {
    validate_upload_params(&req.file_name, &req.file_type, req.file_size)?;

    let client = state.drive.as_ref().ok_or(ApiError::StorageUnavailable)?;
    let key = object_key(ctx.user_id, &req.file_name);

    let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
        .map_err(|e| ApiError::Failed(anyhow::anyhow!("presigning config: {e}")))?;

    let presigned = client
        .put_object()
        .bucket(&state.config.drive.bucket)
        .key(&key)
        .content_type(&req.file_type)
        .presigned(presigning)
        .await
        .map_err(|e| {
            error!("failed to presign upload for {key}: {e}");
            ApiError::StorageUnavailable
        })?;

    let public_url = format!("{}/{}", state.config.drive.public_url, key);

    Ok(Json(UploadSignResponse {
        upload_url: presigned.uri().to_string(),
        key,
        public_url,
    }))
}

/// Best-effort blob removal; callers decide whether a failure matters.
pub async fn delete_object(client: &S3Client, bucket: &str, key: &str) -> anyhow::Result<()> {
    client
        .delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("delete {key}: {e}"))?;
    Ok(())
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/api/upload/sign", post(sign_upload))
}
