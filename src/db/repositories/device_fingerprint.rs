use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::entities::device_fingerprints;

/// Client-supplied environment signals. All fields optional; the content
/// hash is computed over the normalized bundle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FingerprintPayload {
    pub user_agent: Option<String>,
    pub screen_resolution: Option<String>,
    pub timezone: Option<String>,
    pub fonts_hash: Option<String>,
    pub canvas_hash: Option<String>,
    pub webgl_hash: Option<String>,
    pub audio_hash: Option<String>,
}

impl FingerprintPayload {
    /// Deterministic content hash: fixed field order, trimmed values,
    /// lowercased user agent. The same physical browser config always
    /// produces the same hash.
    #[must_use]
    pub fn content_hash(&self) -> String {
        fn norm(value: Option<&String>) -> String {
            value.map_or(String::new(), |v| v.trim().to_string())
        }

        let mut hasher = Sha256::new();
        hasher.update(
            self.user_agent
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_lowercase(),
        );
        for field in [
            norm(self.screen_resolution.as_ref()),
            norm(self.timezone.as_ref()),
            norm(self.fonts_hash.as_ref()),
            norm(self.canvas_hash.as_ref()),
            norm(self.webgl_hash.as_ref()),
            norm(self.audio_hash.as_ref()),
        ] {
            hasher.update([0u8]);
            hasher.update(field.as_bytes());
        }

        hex::encode(hasher.finalize())
    }
}

pub struct DeviceFingerprintRepository {
    conn: DatabaseConnection,
}

impl DeviceFingerprintRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Idempotent registration: look up by content hash, insert on first
    /// sighting. Returns the fingerprint row id.
    pub async fn get_or_create(&self, payload: &FingerprintPayload) -> Result<i32> {
        let hash = payload.content_hash();

        if let Some(existing) = device_fingerprints::Entity::find()
            .filter(device_fingerprints::Column::FingerprintHash.eq(&hash))
            .one(&self.conn)
            .await
            .context("Failed to query device fingerprint")?
        {
            return Ok(existing.id);
        }

        let model = device_fingerprints::ActiveModel {
            fingerprint_hash: Set(hash.clone()),
            user_agent: Set(payload.user_agent.clone()),
            screen_resolution: Set(payload.screen_resolution.clone()),
            timezone: Set(payload.timezone.clone()),
            fonts_hash: Set(payload.fonts_hash.clone()),
            canvas_hash: Set(payload.canvas_hash.clone()),
            webgl_hash: Set(payload.webgl_hash.clone()),
            audio_hash: Set(payload.audio_hash.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match model.insert(&self.conn).await {
            Ok(inserted) => Ok(inserted.id),
            // Lost a race with a concurrent first sighting; the row exists now.
            Err(_) => {
                let existing = device_fingerprints::Entity::find()
                    .filter(device_fingerprints::Column::FingerprintHash.eq(&hash))
                    .one(&self.conn)
                    .await
                    .context("Failed to re-query device fingerprint")?
                    .ok_or_else(|| anyhow::anyhow!("Fingerprint insert failed without conflict"))?;
                Ok(existing.id)
            }
        }
    }
}
