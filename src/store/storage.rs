//! Supabase Storage uploads for menu images

use bytes::Bytes;
use reqwest::Method;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::supabase::{check, SupabaseClient, SupabaseError};

/// Accepted image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        // Ignore parameters such as `; charset=...`
        let essence = content_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Webp => "image/webp",
        }
    }
}

/// Content-addressed object path: `<menu_id>/<sha256>.<ext>`
pub fn image_object_path(menu_item_id: Uuid, kind: ImageKind, data: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(data));
    format!("{}/{}.{}", menu_item_id, digest, kind.extension())
}

/// Object storage bucket access
#[derive(Clone)]
pub struct ObjectStorage {
    client: SupabaseClient,
    bucket: String,
}

impl ObjectStorage {
    pub fn new(client: SupabaseClient, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    /// Upload (or overwrite) an object, returning its public URL
    pub async fn upload(&self, path: &str, kind: ImageKind, data: Bytes) -> Result<String, SupabaseError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.client.base_url(),
            self.bucket,
            path
        );

        let response = self
            .client
            .request(Method::POST, &url)
            .header("Content-Type", kind.mime())
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        check(response).await?;
        Ok(self.public_url(path))
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.client.base_url(),
            self.bucket,
            path
        )
    }
}
