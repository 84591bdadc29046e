use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;
use uuid::Uuid;

use kindred_shared::clients::storage::PhotoStorage;
use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use super::image_normalizer::{self, NormalizedImage};

#[derive(Debug, Clone, Serialize)]
pub struct StoredPhoto {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

/// Normalize `bytes` off the async runtime and persist the result under a fresh name.
///
/// Nothing is written unless normalization succeeds within `limit`.
pub async fn ingest(storage: &PhotoStorage, bytes: Vec<u8>, limit: Duration) -> AppResult<StoredPhoto> {
    let started = Instant::now();
    let received = bytes.len();

    let task = tokio::task::spawn_blocking(move || image_normalizer::normalize(&bytes));
    let normalized: NormalizedImage = match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(image))) => image,
        Ok(Ok(Err(e))) => {
            record_outcome(e.outcome());
            tracing::warn!(error = %e, size = received, "photo rejected");
            return Err(e.into());
        }
        Ok(Err(join_err)) => {
            record_outcome("failed");
            tracing::error!(error = %join_err, "photo normalization task failed");
            return Err(AppError::new(ErrorCode::ProcessingFailed, "image processing failed"));
        }
        Err(_) => {
            record_outcome("timeout");
            tracing::warn!(limit_secs = limit.as_secs_f64(), size = received, "photo normalization timed out");
            return Err(AppError::new(ErrorCode::ProcessingFailed, "image processing timed out"));
        }
    };
    histogram!("image_normalize_duration_seconds").record(started.elapsed().as_secs_f64());

    let filename = format!("{}.jpg", Uuid::new_v4());
    storage.store(&filename, &normalized.bytes).await.map_err(|e| {
        record_outcome("failed");
        AppError::new(ErrorCode::ProcessingFailed, format!("failed to save image: {e}"))
    })?;
    record_outcome("stored");

    tracing::info!(
        filename = %filename,
        width = normalized.width,
        height = normalized.height,
        quality = normalized.quality,
        size = normalized.bytes.len(),
        received,
        "photo stored"
    );

    Ok(StoredPhoto {
        filename,
        width: normalized.width,
        height: normalized.height,
        size: normalized.bytes.len(),
    })
}

fn record_outcome(outcome: &'static str) {
    counter!("images_normalized_total", "outcome" => outcome).increment(1);
}
