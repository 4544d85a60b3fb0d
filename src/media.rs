use crate::error::{ClaimError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs;

/// The three evidence slots of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSlot {
    Audio,
    LandDocument,
    CropPhoto,
}

impl MediaSlot {
    /// MIME type assumed when the upload does not declare one.
    pub fn default_mime(&self) -> &'static str {
        match self {
            MediaSlot::Audio => "audio/mp3",
            MediaSlot::LandDocument => "application/pdf",
            MediaSlot::CropPhoto => "image/jpeg",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaSlot::Audio => "voice recording",
            MediaSlot::LandDocument => "7/12 extract",
            MediaSlot::CropPhoto => "crop photo",
        }
    }
}

impl fmt::Display for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A file handed over by the front-end. `content_type` is whatever the
/// upload widget reported, if anything.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedFile {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
            file_name: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Reads a file from disk, guessing the content type from its extension.
    /// Unknown extensions leave the type unset so the slot default applies.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).await?;
        let content_type = mime_guess::from_path(path).first().map(|m| m.to_string());
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());

        Ok(Self {
            bytes,
            content_type,
            file_name,
        })
    }
}

/// Raw bytes plus the MIME type that will be declared to the inference backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    pub slot: MediaSlot,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Extracts bytes and MIME type from an upload. The bytes are not checked
/// against the declared type; the backend rejects unreadable content itself.
pub fn normalize(slot: MediaSlot, upload: &UploadedFile) -> Result<MediaPart> {
    if upload.bytes.is_empty() {
        return Err(ClaimError::MissingMedia(slot));
    }

    let mime_type = upload
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(slot.default_mime())
        .to_string();

    Ok(MediaPart {
        slot,
        bytes: upload.bytes.clone(),
        mime_type,
    })
}

/// The three normalized parts of one claim, in the order the backend receives them.
#[derive(Debug, Clone)]
pub struct ClaimMedia {
    pub land_document: MediaPart,
    pub crop_photo: MediaPart,
    pub audio: MediaPart,
}

impl ClaimMedia {
    pub fn parts(&self) -> [&MediaPart; 3] {
        [&self.land_document, &self.crop_photo, &self.audio]
    }
}

/// Everything the farmer submits for one claim.
#[derive(Debug, Clone)]
pub struct ClaimInput {
    pub audio: UploadedFile,
    pub land_document: UploadedFile,
    pub crop_photo: UploadedFile,
    pub mobile_number: String,
}

impl ClaimInput {
    pub fn normalize(&self) -> Result<ClaimMedia> {
        Ok(ClaimMedia {
            land_document: normalize(MediaSlot::LandDocument, &self.land_document)?,
            crop_photo: normalize(MediaSlot::CropPhoto, &self.crop_photo)?,
            audio: normalize(MediaSlot::Audio, &self.audio)?,
        })
    }
}
