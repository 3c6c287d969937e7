//! Share thumbnail compression
//!
//! The platform SDK rejects thumbnails above a fixed byte size (32 KB for image
//! shares, 64 KB elsewhere). [`ThumbnailCompressor`] re-encodes an arbitrary
//! JPEG or PNG until it fits, degrading the image as little as possible:
//!
//! 1. **Pass-through**: input already within budget is returned byte-identical.
//! 2. **Lossless**: a PNG close to the budget is re-deflated at maximum compression.
//! 3. **Quality**: JPEG at a decaying quality factor, dimensions unchanged.
//! 4. **Resize**: both sides scaled down step by step, JPEG at a fixed quality,
//!    never below the minimum dimension.
//!
//! When every tier misses the budget the smallest attempt is returned with
//! [`Compressed::within_budget`] set to `false`. Callers that cannot use an
//! oversized buffer call [`Compressed::into_within_budget`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wechat_open_sdk::thumbnail::ThumbnailCompressor;
//!
//! let compressor = ThumbnailCompressor::default();
//! let thumb = compressor.compress(&image_bytes, 64)?.into_within_budget()?;
//! ```

mod codec;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::ThumbnailError;

/// Thumbnail budget for image shares, in KB
pub const IMAGE_SHARE_THUMB_KB: u32 = 32;
/// Thumbnail budget for every other share kind, in KB
pub const DEFAULT_THUMB_KB: u32 = 64;

/// Tuning knobs for [`ThumbnailCompressor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// First JPEG quality factor tried (0..1]
    pub initial_quality: f32,
    /// Multiplier applied to the quality after each miss (0..1)
    pub quality_decay: f32,
    /// Number of quality attempts before resizing
    pub max_quality_attempts: u32,
    /// Per-step scale of both dimensions in the resize tier (0..1)
    pub resize_factor: f32,
    /// JPEG quality factor used for every resize step (0..1]
    pub resize_quality: f32,
    /// Shorter side floor in pixels for the resize tier
    pub min_dimension: u32,
    /// A PNG no larger than `lossless_window` times the budget is first
    /// re-encoded losslessly; 0 disables the tier
    pub lossless_window: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            initial_quality: 0.9,
            quality_decay: 0.7,
            max_quality_attempts: 10,
            resize_factor: 0.8,
            resize_quality: 0.5,
            min_dimension: 100,
            lossless_window: 3,
        }
    }
}

impl CompressionOptions {
    /// Check that every factor is in range.
    pub fn validate(&self) -> Result<(), ThumbnailError> {
        fn in_open_closed(v: f32) -> bool {
            v > 0.0 && v <= 1.0
        }
        fn in_open(v: f32) -> bool {
            v > 0.0 && v < 1.0
        }

        if !in_open_closed(self.initial_quality) {
            return Err(ThumbnailError::InvalidArgument(format!(
                "initial_quality must be in (0, 1], got {}",
                self.initial_quality
            )));
        }
        if !in_open(self.quality_decay) {
            return Err(ThumbnailError::InvalidArgument(format!(
                "quality_decay must be in (0, 1), got {}",
                self.quality_decay
            )));
        }
        if !in_open(self.resize_factor) {
            return Err(ThumbnailError::InvalidArgument(format!(
                "resize_factor must be in (0, 1), got {}",
                self.resize_factor
            )));
        }
        if !in_open_closed(self.resize_quality) {
            return Err(ThumbnailError::InvalidArgument(format!(
                "resize_quality must be in (0, 1], got {}",
                self.resize_quality
            )));
        }
        if self.min_dimension == 0 {
            return Err(ThumbnailError::InvalidArgument(
                "min_dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Encoder qualities (1..=100) of the quality tier, highest first.
    pub(crate) fn quality_ladder(&self) -> Vec<u8> {
        let mut factor = self.initial_quality;
        (0..self.max_quality_attempts)
            .map(|_| {
                let quality = codec::quality_percent(factor);
                factor *= self.quality_decay;
                quality
            })
            .collect()
    }

    /// Target dimensions of the resize tier, largest first. The last step
    /// lands the shorter side exactly on `min_dimension`.
    pub(crate) fn resize_steps(&self, width: u32, height: u32) -> Vec<(u32, u32)> {
        let shorter = width.min(height);
        if shorter <= self.min_dimension {
            return Vec::new();
        }

        let min_scale = f64::from(self.min_dimension) / f64::from(shorter);
        let factor = f64::from(self.resize_factor);
        let mut scale = 1.0_f64;
        let mut steps = Vec::new();

        loop {
            scale = (scale * factor).max(min_scale);
            let w = ((f64::from(width) * scale).round() as u32).max(1);
            let h = ((f64::from(height) * scale).round() as u32).max(1);
            steps.push((w, h));
            if scale <= min_scale {
                break;
            }
        }
        steps
    }
}

/// Which transformation produced a [`Compressed`] buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    PassThrough,
    Lossless,
    Quality,
    Resize,
}

/// Output of [`ThumbnailCompressor::compress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    /// Encoded image bytes
    pub data: Vec<u8>,
    /// Transformation that produced `data`
    pub tier: Tier,
    /// Pixel size of `data`; `None` on pass-through, which never decodes
    pub dimensions: Option<(u32, u32)>,
    /// `false` only for a best-effort result that still exceeds the budget
    pub within_budget: bool,
    /// The byte budget that was requested
    pub budget: usize,
}

impl Compressed {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Reject best-effort output with [`ThumbnailError::BudgetUnreachable`].
    pub fn into_within_budget(self) -> Result<Vec<u8>, ThumbnailError> {
        if self.within_budget {
            Ok(self.data)
        } else {
            Err(ThumbnailError::BudgetUnreachable {
                budget: self.budget,
                smallest: self.data.len(),
            })
        }
    }
}

/// Smallest over-budget attempt seen so far; larger buffers are dropped on
/// the spot so at most one intermediate outlives its iteration.
#[derive(Default)]
struct Smallest(Option<(Vec<u8>, Tier, (u32, u32))>);

impl Smallest {
    fn offer(&mut self, data: Vec<u8>, tier: Tier, dimensions: (u32, u32)) {
        let smaller = match &self.0 {
            Some((current, _, _)) => data.len() < current.len(),
            None => true,
        };
        if smaller {
            self.0 = Some((data, tier, dimensions));
        }
    }
}

/// Adaptive thumbnail compressor
///
/// Stateless apart from its options; one instance can serve any number of
/// concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailCompressor {
    options: CompressionOptions,
}

impl ThumbnailCompressor {
    /// Create a compressor with custom options
    ///
    /// # Errors
    /// Returns `ThumbnailError::InvalidArgument` when an option is out of range
    pub fn new(options: CompressionOptions) -> Result<Self, ThumbnailError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    /// Compress `image` to at most `target_size_kb * 1024` bytes
    ///
    /// # Errors
    /// - `ThumbnailError::InvalidArgument` when `target_size_kb` is 0
    /// - `ThumbnailError::Decode` when the bytes are not a JPEG or PNG
    /// - `ThumbnailError::Encode` when the encoder itself fails
    pub fn compress(&self, image: &[u8], target_size_kb: u32) -> Result<Compressed, ThumbnailError> {
        self.run(image, target_size_kb, &|| false)
    }

    /// Like [`compress`](Self::compress), checking `cancelled` between attempts
    ///
    /// # Errors
    /// Additionally returns `ThumbnailError::Cancelled` once the flag is set
    pub fn compress_with_cancel(
        &self,
        image: &[u8],
        target_size_kb: u32,
        cancelled: &AtomicBool,
    ) -> Result<Compressed, ThumbnailError> {
        self.run(image, target_size_kb, &|| cancelled.load(Ordering::Relaxed))
    }

    /// Run [`compress`](Self::compress) on tokio's blocking pool
    pub async fn compress_async(
        self: Arc<Self>,
        image: Vec<u8>,
        target_size_kb: u32,
    ) -> Result<Compressed, ThumbnailError> {
        tokio::task::spawn_blocking(move || self.compress(&image, target_size_kb))
            .await
            .map_err(|e| ThumbnailError::Encode(format!("compression task failed: {e}")))?
    }

    fn run(
        &self,
        image: &[u8],
        target_size_kb: u32,
        cancelled: &dyn Fn() -> bool,
    ) -> Result<Compressed, ThumbnailError> {
        let budget = budget_bytes(target_size_kb)?;

        if image.len() <= budget {
            debug!(
                "[Thumbnail] {} bytes already within {} bytes, passing through",
                image.len(),
                budget
            );
            return Ok(Compressed {
                data: image.to_vec(),
                tier: Tier::PassThrough,
                dimensions: None,
                within_budget: true,
                budget,
            });
        }

        let decoded = codec::decode(image)?;
        let dimensions = (decoded.width(), decoded.height());
        let mut smallest = Smallest::default();

        let lossless_limit = budget.saturating_mul(self.options.lossless_window as usize);
        if codec::is_png(image) && image.len() <= lossless_limit {
            check(cancelled)?;
            let png = codec::encode_png(&decoded)?;
            debug!("[Thumbnail] lossless png: {} -> {} bytes", image.len(), png.len());
            if png.len() <= budget {
                return Ok(fit(png, Tier::Lossless, dimensions, budget));
            }
            smallest.offer(png, Tier::Lossless, dimensions);
        }

        let rgb = DynamicImage::ImageRgb8(decoded.into_rgb8());

        for quality in self.options.quality_ladder() {
            check(cancelled)?;
            let encoded = codec::encode_jpeg(&rgb, quality)?;
            debug!(
                "[Thumbnail] {}x{} quality {}: {} bytes (budget {})",
                dimensions.0,
                dimensions.1,
                quality,
                encoded.len(),
                budget
            );
            if encoded.len() <= budget {
                return Ok(fit(encoded, Tier::Quality, dimensions, budget));
            }
            smallest.offer(encoded, Tier::Quality, dimensions);
        }

        let resize_quality = codec::quality_percent(self.options.resize_quality);
        for (width, height) in self.options.resize_steps(dimensions.0, dimensions.1) {
            check(cancelled)?;
            let scaled = codec::resize(&rgb, width, height);
            let encoded = codec::encode_jpeg(&scaled, resize_quality)?;
            drop(scaled);
            debug!(
                "[Thumbnail] resized {}x{}: {} bytes (budget {})",
                width,
                height,
                encoded.len(),
                budget
            );
            if encoded.len() <= budget {
                return Ok(fit(encoded, Tier::Resize, (width, height), budget));
            }
            smallest.offer(encoded, Tier::Resize, (width, height));
        }

        match smallest.0 {
            Some((data, tier, dims)) => {
                warn!(
                    "[Thumbnail] budget of {} bytes unreachable, best effort is {} bytes at {}x{}",
                    budget,
                    data.len(),
                    dims.0,
                    dims.1
                );
                Ok(Compressed {
                    data,
                    tier,
                    dimensions: Some(dims),
                    within_budget: false,
                    budget,
                })
            }
            None => Err(ThumbnailError::BudgetUnreachable {
                budget,
                smallest: image.len(),
            }),
        }
    }
}

fn budget_bytes(target_size_kb: u32) -> Result<usize, ThumbnailError> {
    if target_size_kb == 0 {
        return Err(ThumbnailError::InvalidArgument(
            "target size must be greater than 0 KB".to_string(),
        ));
    }
    (target_size_kb as usize)
        .checked_mul(1024)
        .ok_or_else(|| ThumbnailError::InvalidArgument(format!("target size {target_size_kb} KB overflows")))
}

fn check(cancelled: &dyn Fn() -> bool) -> Result<(), ThumbnailError> {
    if cancelled() {
        return Err(ThumbnailError::Cancelled);
    }
    Ok(())
}

fn fit(data: Vec<u8>, tier: Tier, dimensions: (u32, u32), budget: usize) -> Compressed {
    Compressed {
        data,
        tier,
        dimensions: Some(dimensions),
        within_budget: true,
        budget,
    }
}
