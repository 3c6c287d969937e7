//! Share requests
//!
//! Turns the bridge's share options into the platform SDK's message model.
//! Media referenced by the options is loaded here and every thumbnail goes
//! through the [`ThumbnailCompressor`], so the transport only ever sees raw
//! bytes that already fit the platform limits.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::WechatError;
use crate::media::{self, ImageSource};
use crate::thumbnail::{ThumbnailCompressor, DEFAULT_THUMB_KB, IMAGE_SHARE_THUMB_KB};
use crate::types::scene::lenient;
use crate::types::{MiniProgramType, ShareScene};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareTextOptions {
    pub text: String,
    #[serde(default, deserialize_with = "lenient::scene")]
    pub scene: ShareScene,
}

impl ShareTextOptions {
    pub fn new(text: impl Into<String>, scene: ShareScene) -> Self {
        Self {
            text: text.into(),
            scene,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareImageOptions {
    /// `file://` URI or base64 image data
    pub base64_or_image_uri: String,
    #[serde(default, deserialize_with = "lenient::scene")]
    pub scene: ShareScene,
    /// Thumbnail source; the main image is compressed when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_base64_or_image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mini_program_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mini_program_path: Option<String>,
}

impl ShareImageOptions {
    pub fn new(base64_or_image_uri: impl Into<String>, scene: ShareScene) -> Self {
        Self {
            base64_or_image_uri: base64_or_image_uri.into(),
            scene,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareFileOptions {
    /// `file://` URI or base64 file content
    pub base64_or_file_uri: String,
    pub title: String,
    #[serde(default, deserialize_with = "lenient::scene")]
    pub scene: ShareScene,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMusicOptions {
    pub music_webpage_url: String,
    pub music_file_uri: String,
    pub singer_name: String,
    /// Seconds
    pub duration: u32,
    #[serde(default, deserialize_with = "lenient::scene")]
    pub scene: ShareScene,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_lyric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hd_album_thumb_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hd_album_thumb_file_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Echoed back when WeChat returns to the app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_base64_or_image_uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareVideoOptions {
    pub video_uri: String,
    #[serde(default, deserialize_with = "lenient::scene")]
    pub scene: ShareScene,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_quality_video_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_base64_or_image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareWebpageOptions {
    pub url: String,
    #[serde(default, deserialize_with = "lenient::scene")]
    pub scene: ShareScene,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_page_xml: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_base64_or_image_uri: Option<String>,
}

impl ShareWebpageOptions {
    pub fn new(url: impl Into<String>, scene: ShareScene) -> Self {
        Self {
            url: url.into(),
            scene,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMiniProgramOptions {
    /// Fallback page for clients without mini program support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webpage_url: Option<String>,
    /// Original id (`gh_...`) of the mini program
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::program_type")]
    pub program_type: MiniProgramType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient::scene")]
    pub scene: ShareScene,
    #[serde(default)]
    pub with_share_ticket: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_base64_or_image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_forward: Option<bool>,
    #[serde(default)]
    pub is_updatable_message: bool,
    #[serde(default)]
    pub is_secret_message: bool,
}

/// Platform media object carried by a [`MediaMessage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaObject {
    Text {
        text: String,
    },
    Image {
        image_data: Vec<u8>,
        image_data_hash: Option<String>,
        entrance_mini_program_username: Option<String>,
        entrance_mini_program_path: Option<String>,
    },
    /// Exactly one of `file_path` and `file_data` is set
    File {
        file_path: Option<PathBuf>,
        file_data: Option<Vec<u8>>,
    },
    Music {
        music_url: String,
        music_data_url: String,
        singer_name: String,
        duration: u32,
        song_lyric: Option<String>,
        hd_album_thumb_file_path: Option<String>,
        hd_album_thumb_file_hash: Option<String>,
        album_name: Option<String>,
        music_genre: Option<String>,
        issue_date: Option<String>,
        identification: Option<String>,
    },
    Video {
        video_url: String,
        video_low_band_url: Option<String>,
    },
    Webpage {
        webpage_url: String,
        ext_info: Option<String>,
        canvas_page_xml: Option<String>,
    },
    MiniProgram {
        webpage_url: Option<String>,
        user_name: String,
        path: Option<String>,
        program_type: MiniProgramType,
        with_share_ticket: bool,
        disable_forward: Option<bool>,
        is_updatable_message: bool,
        is_secret_message: bool,
    },
}

impl MediaObject {
    /// Short label, also used as the transaction id prefix
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "img",
            Self::File { .. } => "file",
            Self::Music { .. } => "musicVideo",
            Self::Video { .. } => "video",
            Self::Webpage { .. } => "webpage",
            Self::MiniProgram { .. } => "miniProgram",
        }
    }
}

/// Message envelope handed to the platform SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMessage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub message_ext: Option<String>,
    pub media_tag_name: Option<String>,
    /// Already compressed to the platform limit
    pub thumb_data: Option<Vec<u8>>,
    pub object: MediaObject,
}

impl MediaMessage {
    pub fn new(object: MediaObject) -> Self {
        Self {
            title: None,
            description: None,
            message_ext: None,
            media_tag_name: None,
            thumb_data: None,
            object,
        }
    }
}

/// Send-message request for one share scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub scene: ShareScene,
    pub message: MediaMessage,
}

/// Builds [`SendMessageRequest`]s from share options
///
/// Thumbnail problems are never fatal: a thumbnail that cannot be loaded,
/// decoded or squeezed under the platform limit is logged and left out.
#[derive(Debug, Clone)]
pub struct ShareComposer {
    compressor: Arc<ThumbnailCompressor>,
    image_thumb_kb: u32,
    default_thumb_kb: u32,
}

impl ShareComposer {
    pub fn new(compressor: Arc<ThumbnailCompressor>) -> Self {
        Self {
            compressor,
            image_thumb_kb: IMAGE_SHARE_THUMB_KB,
            default_thumb_kb: DEFAULT_THUMB_KB,
        }
    }

    /// Override the thumbnail budgets (defaults 32 KB for images, 64 KB otherwise)
    pub fn with_thumb_budgets(mut self, image_kb: u32, default_kb: u32) -> Self {
        self.image_thumb_kb = image_kb;
        self.default_thumb_kb = default_kb;
        self
    }

    pub fn text(&self, options: ShareTextOptions) -> SendMessageRequest {
        let mut message = MediaMessage::new(MediaObject::Text {
            text: options.text.clone(),
        });
        message.description = Some(options.text);

        SendMessageRequest {
            scene: options.scene,
            message,
        }
    }

    /// # Errors
    /// Returns `WechatError::Media` when the main image cannot be loaded
    pub async fn image(&self, options: ShareImageOptions) -> Result<SendMessageRequest, WechatError> {
        let image_data = media::load(&options.base64_or_image_uri)
            .await
            .map_err(|e| WechatError::Media(format!("no image to share: {}", e)))?;

        let thumb_source = match options.thumb_base64_or_image_uri.as_deref() {
            Some(source) => match media::load(source).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("[Share] thumbnail source unusable, using the image itself: {}", e);
                    image_data.clone()
                }
            },
            None => image_data.clone(),
        };
        let thumb_data = self.compress_thumb(thumb_source, self.image_thumb_kb).await;

        let mut message = MediaMessage::new(MediaObject::Image {
            image_data,
            image_data_hash: options.image_data_hash,
            entrance_mini_program_username: options.mini_program_id,
            entrance_mini_program_path: options.mini_program_path,
        });
        message.thumb_data = thumb_data;

        Ok(SendMessageRequest {
            scene: options.scene,
            message,
        })
    }

    /// # Errors
    /// Returns `WechatError::Media` for an empty source or malformed base64
    pub fn file(&self, options: ShareFileOptions) -> Result<SendMessageRequest, WechatError> {
        let object = match ImageSource::parse(&options.base64_or_file_uri)? {
            ImageSource::File(path) => MediaObject::File {
                file_path: Some(path),
                file_data: None,
            },
            ImageSource::Base64(encoded) => MediaObject::File {
                file_path: None,
                file_data: Some(media::decode_base64(&encoded)?),
            },
        };

        let mut message = MediaMessage::new(object);
        message.title = Some(options.title);

        Ok(SendMessageRequest {
            scene: options.scene,
            message,
        })
    }

    pub async fn music(&self, options: ShareMusicOptions) -> SendMessageRequest {
        let thumb_data = self
            .optional_thumb(options.thumb_base64_or_image_uri.as_deref())
            .await;

        let mut message = MediaMessage::new(MediaObject::Music {
            music_url: options.music_webpage_url,
            music_data_url: options.music_file_uri,
            singer_name: options.singer_name,
            duration: options.duration,
            song_lyric: options.song_lyric,
            hd_album_thumb_file_path: options.hd_album_thumb_file_path,
            hd_album_thumb_file_hash: options.hd_album_thumb_file_hash,
            album_name: options.album_name,
            music_genre: options.music_genre,
            issue_date: options.issue_date,
            identification: options.identification,
        });
        message.title = options.title;
        message.description = options.description;
        message.message_ext = options.extra_message;
        message.thumb_data = thumb_data;

        SendMessageRequest {
            scene: options.scene,
            message,
        }
    }

    pub async fn video(&self, options: ShareVideoOptions) -> SendMessageRequest {
        let thumb_data = self
            .optional_thumb(options.thumb_base64_or_image_uri.as_deref())
            .await;

        let mut message = MediaMessage::new(MediaObject::Video {
            video_url: options.video_uri,
            video_low_band_url: options.low_quality_video_uri,
        });
        message.title = options.title;
        message.description = options.description;
        message.thumb_data = thumb_data;

        SendMessageRequest {
            scene: options.scene,
            message,
        }
    }

    pub async fn webpage(&self, options: ShareWebpageOptions) -> SendMessageRequest {
        let thumb_data = self
            .optional_thumb(options.thumb_base64_or_image_uri.as_deref())
            .await;

        let mut message = MediaMessage::new(MediaObject::Webpage {
            webpage_url: options.url,
            ext_info: options.extra_info,
            canvas_page_xml: options.canvas_page_xml,
        });
        message.title = options.title;
        message.description = options.description;
        message.thumb_data = thumb_data;

        SendMessageRequest {
            scene: options.scene,
            message,
        }
    }

    pub async fn mini_program(&self, options: ShareMiniProgramOptions) -> SendMessageRequest {
        let thumb_data = self
            .optional_thumb(options.thumb_base64_or_image_uri.as_deref())
            .await;

        let mut message = MediaMessage::new(MediaObject::MiniProgram {
            webpage_url: options.webpage_url,
            user_name: options.id,
            path: options.path,
            program_type: options.program_type,
            with_share_ticket: options.with_share_ticket,
            disable_forward: options.disable_forward,
            is_updatable_message: options.is_updatable_message,
            is_secret_message: options.is_secret_message,
        });
        message.title = options.title;
        message.description = options.description;
        message.thumb_data = thumb_data;

        SendMessageRequest {
            scene: options.scene,
            message,
        }
    }

    async fn optional_thumb(&self, source: Option<&str>) -> Option<Vec<u8>> {
        let source = source?;
        match media::load(source).await {
            Ok(bytes) => self.compress_thumb(bytes, self.default_thumb_kb).await,
            Err(e) => {
                warn!("[Share] thumbnail dropped, cannot load source: {}", e);
                None
            }
        }
    }

    async fn compress_thumb(&self, bytes: Vec<u8>, target_kb: u32) -> Option<Vec<u8>> {
        let result = self
            .compressor
            .clone()
            .compress_async(bytes, target_kb)
            .await
            .and_then(|compressed| compressed.into_within_budget());

        match result {
            Ok(thumb) => {
                debug!("[Share] thumbnail ready, {} bytes", thumb.len());
                Some(thumb)
            }
            Err(e) => {
                warn!("[Share] thumbnail dropped: {}", e);
                None
            }
        }
    }
}
