//! Turns user-supplied pictures into `data:` URLs small enough to embed in a
//! listing.
//!
//! Ingestion happens in two stages. [`ImagePipeline::ingest`] runs when the
//! user picks an image: small sources are embedded untouched and anything
//! over 1 MiB gets a first compression pass. [`ImagePipeline::finalize`] runs
//! on submit and always recompresses to the stricter submit target before the
//! character ceiling is checked.

use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::STANDARD as B64};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use reqwest::Client;
use tracing::{debug, warn};

use swapmeet_types::MAX_IMAGE_CHARS;

use crate::MarketError;

/// Largest raw source accepted (10 MiB).
pub const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;
/// Sources up to this size are embedded without re-encoding (1 MiB).
pub const PASSTHROUGH_BYTES: u64 = 1024 * 1024;
/// Longest edge after resizing.
pub const MAX_DIMENSION: u32 = 800;
/// Encoded-size target for the first pass at ingest time (0.5 MiB).
pub const INGEST_TARGET_BYTES: usize = 512 * 1024;
/// Encoded-size target applied on submit (0.2 MiB).
pub const SUBMIT_TARGET_BYTES: usize = 209_715;

const INITIAL_QUALITY: u8 = 70;
const MIN_QUALITY: u8 = 10;
const QUALITY_STEP: u8 = 10;

const ACCEPTED_FORMATS: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Where a picture comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    File(PathBuf),
    Url(String),
}

/// Ceilings applied by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_input_bytes: u64,
    pub passthrough_bytes: u64,
    pub max_dimension: u32,
    pub max_encoded_chars: usize,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: MAX_INPUT_BYTES,
            passthrough_bytes: PASSTHROUGH_BYTES,
            max_dimension: MAX_DIMENSION,
            max_encoded_chars: MAX_IMAGE_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    /// JPEG quality used, or `None` when the source was embedded as-is.
    pub quality: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ImagePipeline {
    http: Client,
    limits: ImageLimits,
}

impl ImagePipeline {
    pub fn new(http: Client, limits: ImageLimits) -> Self {
        Self { http, limits }
    }

    pub fn with_limits(limits: ImageLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &ImageLimits {
        &self.limits
    }

    /// Read the raw bytes of `source`, refusing anything over the input
    /// ceiling. Files and responses that announce their size are rejected
    /// before being read; other responses are cut off as soon as the running
    /// total passes the ceiling.
    pub async fn load(&self, source: ImageSource) -> Result<Vec<u8>, MarketError> {
        let bytes = match source {
            ImageSource::Bytes(bytes) => bytes,
            ImageSource::File(path) => {
                let meta = tokio::fs::metadata(&path).await.map_err(|e| {
                    MarketError::Fetch(format!("cannot read {}: {}", path.display(), e))
                })?;
                self.check_input_size(meta.len())?;
                tokio::fs::read(&path).await.map_err(|e| {
                    MarketError::Fetch(format!("cannot read {}: {}", path.display(), e))
                })?
            }
            ImageSource::Url(url) => {
                let mut resp = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| MarketError::Fetch(format!("{}: {}", url, e)))?;
                if !resp.status().is_success() {
                    return Err(MarketError::Fetch(format!(
                        "{} answered {}",
                        url,
                        resp.status()
                    )));
                }
                if let Some(len) = resp.content_length() {
                    self.check_input_size(len)?;
                }

                let mut body = Vec::new();
                while let Some(chunk) = resp
                    .chunk()
                    .await
                    .map_err(|e| MarketError::Fetch(format!("{}: {}", url, e)))?
                {
                    self.check_input_size((body.len() + chunk.len()) as u64)?;
                    body.extend_from_slice(&chunk);
                }
                body
            }
        };

        self.check_input_size(bytes.len() as u64)?;
        Ok(bytes)
    }

    /// Upload stage: accept JPEG, PNG or WebP up to the input ceiling.
    /// Sources at or under the passthrough size keep their own encoding
    /// unless their data URL would break the character ceiling; everything
    /// else is compressed towards [`INGEST_TARGET_BYTES`].
    pub async fn ingest(&self, source: ImageSource) -> Result<ProcessedImage, MarketError> {
        let bytes = self.load(source).await?;

        let format = image::guess_format(&bytes)
            .map_err(|e| MarketError::Decode(format!("unrecognised image data: {}", e)))?;
        if !ACCEPTED_FORMATS.contains(&format) {
            return Err(MarketError::Decode(
                "unsupported image type, please use JPEG, PNG or WebP".into(),
            ));
        }

        if bytes.len() as u64 > self.limits.passthrough_bytes
            || encoded_len(format.to_mime_type(), bytes.len()) > self.limits.max_encoded_chars
        {
            return self.compress(bytes, INGEST_TARGET_BYTES).await;
        }

        let (bytes, (width, height)) = run_blocking(move || {
            let dims = dimensions(&bytes, format)?;
            Ok((bytes, dims))
        })
        .await?;

        let image = ProcessedImage {
            data_url: encode_data_url(format.to_mime_type(), &bytes),
            width,
            height,
            quality: None,
        };
        self.check_encoded_len(&image)?;
        Ok(image)
    }

    /// Submit stage: recompress whatever was ingested (a `data:` URL, or a
    /// plain URL for listings that reference a remote picture) towards
    /// [`SUBMIT_TARGET_BYTES`].
    pub async fn finalize(&self, image_url: &str) -> Result<ProcessedImage, MarketError> {
        let bytes = if image_url.starts_with("data:") {
            decode_data_url(image_url)?.1
        } else {
            self.load(ImageSource::Url(image_url.to_string())).await?
        };
        self.compress(bytes, SUBMIT_TARGET_BYTES).await
    }

    /// Decode, shrink to the dimension cap and re-encode as JPEG, lowering
    /// quality until the output fits `target_bytes` or the floor is reached.
    pub async fn compress(
        &self,
        bytes: Vec<u8>,
        target_bytes: usize,
    ) -> Result<ProcessedImage, MarketError> {
        self.check_input_size(bytes.len() as u64)?;

        let max_dimension = self.limits.max_dimension;
        let source_len = bytes.len();
        let (jpeg, width, height, quality) =
            run_blocking(move || encode_bounded(&bytes, max_dimension, target_bytes)).await?;

        debug!(
            "Compressed image {} -> {} bytes ({}x{}, quality {})",
            source_len,
            jpeg.len(),
            width,
            height,
            quality
        );

        let image = ProcessedImage {
            data_url: encode_data_url("image/jpeg", &jpeg),
            width,
            height,
            quality: Some(quality),
        };
        self.check_encoded_len(&image)?;
        Ok(image)
    }

    fn check_input_size(&self, size: u64) -> Result<(), MarketError> {
        if size > self.limits.max_input_bytes {
            return Err(MarketError::OversizedInput {
                size,
                limit: self.limits.max_input_bytes,
            });
        }
        Ok(())
    }

    fn check_encoded_len(&self, image: &ProcessedImage) -> Result<(), MarketError> {
        if image.data_url.len() > self.limits.max_encoded_chars {
            warn!(
                "Encoded image is {} characters, limit is {}",
                image.data_url.len(),
                self.limits.max_encoded_chars
            );
            return Err(MarketError::ImageTooLarge);
        }
        Ok(())
    }
}

/// Length of the `data:` URL [`encode_data_url`] would build.
fn encoded_len(mime: &str, byte_len: usize) -> usize {
    "data:;base64,".len() + mime.len() + byte_len.div_ceil(3) * 4
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, B64.encode(bytes))
}

/// Split a base64 `data:` URL into its MIME type and payload bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), MarketError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| MarketError::Decode("not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| MarketError::Decode("data URL has no payload".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| MarketError::Decode("data URL is not base64 encoded".into()))?;

    let bytes = B64
        .decode(payload.trim())
        .map_err(|e| MarketError::Decode(format!("invalid base64 payload: {}", e)))?;
    Ok((mime.to_string(), bytes))
}

/// Dimensions that fit `(width, height)` inside `max` on the longer edge,
/// keeping the aspect ratio. Never upscales.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = |edge: u32, long: u32| {
        ((edge as f64 * max as f64 / long as f64).round() as u32).max(1)
    };
    if width >= height {
        (max, scale(height, width))
    } else {
        (scale(width, height), max)
    }
}

async fn run_blocking<F, T>(f: F) -> Result<T, MarketError>
where
    F: FnOnce() -> Result<T, MarketError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MarketError::Encode(format!("image task failed: {}", e)))?
}

fn dimensions(bytes: &[u8], format: ImageFormat) -> Result<(u32, u32), MarketError> {
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MarketError::Decode(e.to_string()))?;
    Ok((img.width(), img.height()))
}

fn encode_bounded(
    bytes: &[u8],
    max_dimension: u32,
    target_bytes: usize,
) -> Result<(Vec<u8>, u32, u32, u8), MarketError> {
    let img = image::load_from_memory(bytes).map_err(|e| MarketError::Decode(e.to_string()))?;

    let (width, height) = fit_within(img.width(), img.height(), max_dimension);
    let img = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };
    let rgb = img.to_rgb8();

    let mut quality = INITIAL_QUALITY;
    loop {
        let jpeg = encode_jpeg(&rgb, quality)?;
        if jpeg.len() <= target_bytes || quality <= MIN_QUALITY {
            return Ok((jpeg, width, height, quality));
        }
        quality -= QUALITY_STEP;
    }
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, MarketError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(rgb)
        .map_err(|e| MarketError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, Rgb};
    use rand::Rng;

    use super::*;

    fn encode_as(img: RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), format)
            .unwrap();
        out
    }

    pub(crate) fn noise_png(width: u32, height: u32) -> Vec<u8> {
        let mut rng = rand::rng();
        let img = RgbImage::from_fn(width, height, |_, _| {
            Rgb([rng.random(), rng.random(), rng.random()])
        });
        encode_as(img, ImageFormat::Png)
    }

    fn flat_png(width: u32, height: u32) -> Vec<u8> {
        encode_as(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])), ImageFormat::Png)
    }

    #[test]
    fn fit_within_caps_the_longer_edge() {
        assert_eq!(fit_within(1600, 1200, 800), (800, 600));
        assert_eq!(fit_within(600, 1200, 800), (400, 800));
        assert_eq!(fit_within(1000, 1000, 800), (800, 800));
        assert_eq!(fit_within(500, 300, 800), (500, 300));
        assert_eq!(fit_within(4000, 2, 800), (800, 1));
    }

    #[test]
    fn data_url_parsing() {
        let url = encode_data_url("image/png", b"\x89PNG");
        assert_eq!(url, "data:image/png;base64,iVBORw==");

        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"\x89PNG");

        assert!(matches!(
            decode_data_url("https://example.com/a.png"),
            Err(MarketError::Decode(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png,raw"),
            Err(MarketError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn compress_resizes_and_reencodes_as_jpeg() {
        let pipeline = ImagePipeline::default();

        let image = pipeline
            .compress(flat_png(1600, 1200), INGEST_TARGET_BYTES)
            .await
            .unwrap();

        assert_eq!((image.width, image.height), (800, 600));
        assert_eq!(image.quality, Some(INITIAL_QUALITY));
        assert!(image.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn quality_search_stops_at_the_floor() {
        let pipeline = ImagePipeline::default();

        let image = pipeline.compress(noise_png(64, 64), 1).await.unwrap();

        assert_eq!(image.quality, Some(MIN_QUALITY));
    }

    #[tokio::test]
    async fn large_source_is_compressed_within_the_ceiling() {
        let pipeline = ImagePipeline::default();
        let png = noise_png(700, 700);
        assert!(png.len() as u64 > PASSTHROUGH_BYTES);

        let image = pipeline.ingest(ImageSource::Bytes(png)).await.unwrap();

        assert!(image.data_url.len() <= MAX_IMAGE_CHARS);
        assert!(image.quality.is_some());
    }

    #[tokio::test]
    async fn passthrough_sized_source_too_big_to_embed_is_compressed() {
        let pipeline = ImagePipeline::default();
        let png = noise_png(540, 540);
        assert!(png.len() as u64 <= PASSTHROUGH_BYTES);
        assert!(encoded_len("image/png", png.len()) > MAX_IMAGE_CHARS);

        let image = pipeline.ingest(ImageSource::Bytes(png)).await.unwrap();

        assert!(image.data_url.starts_with("data:image/jpeg;base64,"));
        assert!(image.data_url.len() <= MAX_IMAGE_CHARS);
        assert_eq!((image.width, image.height), (540, 540));
    }

    #[test]
    fn encoded_len_matches_the_built_url() {
        for len in [0, 1, 2, 3, 4, 1000] {
            let bytes = vec![7u8; len];
            assert_eq!(
                encoded_len("image/png", len),
                encode_data_url("image/png", &bytes).len()
            );
        }
    }

    /// Serve one response with a chunked body and no Content-Length.
    async fn serve_unsized_body(chunks: usize, chunk_len: usize) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;

            let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nTransfer-Encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let data = vec![0u8; chunk_len];
            for _ in 0..chunks {
                let mut frame = format!("{:x}\r\n", chunk_len).into_bytes();
                frame.extend_from_slice(&data);
                frame.extend_from_slice(b"\r\n");
                if socket.write_all(&frame).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        format!("http://{}/picture.png", addr)
    }

    #[tokio::test]
    async fn unsized_url_body_is_cut_off_at_the_ceiling() {
        let pipeline = ImagePipeline::with_limits(ImageLimits {
            max_input_bytes: 100_000,
            ..ImageLimits::default()
        });
        let url = serve_unsized_body(64, 16 * 1024).await;

        let err = pipeline.load(ImageSource::Url(url)).await.unwrap_err();

        match err {
            MarketError::OversizedInput { size, limit } => {
                assert_eq!(limit, 100_000);
                assert!(size > 100_000 && size < 64 * 16 * 1024);
            }
            other => panic!("expected OversizedInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unsized_url_body_under_the_ceiling_is_read() {
        let url = serve_unsized_body(3, 1000).await;

        let bytes = ImagePipeline::default()
            .load(ImageSource::Url(url))
            .await
            .unwrap();

        assert_eq!(bytes.len(), 3000);
    }

    #[tokio::test]
    async fn small_source_is_embedded_as_is() {
        let pipeline = ImagePipeline::default();
        let png = flat_png(40, 30);

        let image = pipeline.ingest(ImageSource::Bytes(png.clone())).await.unwrap();

        assert_eq!(image.quality, None);
        assert_eq!((image.width, image.height), (40, 30));
        assert_eq!(image.data_url, encode_data_url("image/png", &png));
    }

    #[tokio::test]
    async fn oversized_source_is_rejected_unread() {
        let pipeline = ImagePipeline::default();
        let bytes = vec![0u8; MAX_INPUT_BYTES as usize + 1];

        let err = pipeline.ingest(ImageSource::Bytes(bytes)).await.unwrap_err();

        assert!(matches!(err, MarketError::OversizedInput { .. }));
    }

    #[tokio::test]
    async fn corrupt_source_is_a_decode_error() {
        let pipeline = ImagePipeline::default();

        let err = pipeline
            .ingest(ImageSource::Bytes(b"definitely not an image".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Decode(_)));

        let mut truncated = flat_png(40, 30);
        truncated.truncate(60);
        let err = pipeline.compress(truncated, INGEST_TARGET_BYTES).await.unwrap_err();
        assert!(matches!(err, MarketError::Decode(_)));
    }

    #[tokio::test]
    async fn unsupported_format_is_refused() {
        let pipeline = ImagePipeline::default();
        let bmp = encode_as(RgbImage::new(4, 4), ImageFormat::Bmp);

        let err = pipeline.ingest(ImageSource::Bytes(bmp)).await.unwrap_err();
        assert!(matches!(err, MarketError::Decode(_)));
    }

    #[tokio::test]
    async fn encoded_ceiling_is_enforced() {
        let pipeline = ImagePipeline::with_limits(ImageLimits {
            max_encoded_chars: 500,
            ..ImageLimits::default()
        });

        let err = pipeline
            .compress(noise_png(200, 200), SUBMIT_TARGET_BYTES)
            .await
            .unwrap_err();

        assert_eq!(err, MarketError::ImageTooLarge);
    }

    #[tokio::test]
    async fn finalize_recompresses_an_embedded_image() {
        let pipeline = ImagePipeline::default();
        let ingested = pipeline
            .ingest(ImageSource::Bytes(flat_png(120, 90)))
            .await
            .unwrap();
        assert!(ingested.data_url.starts_with("data:image/png;base64,"));

        let finished = pipeline.finalize(&ingested.data_url).await.unwrap();
        assert!(finished.data_url.starts_with("data:image/jpeg;base64,"));
        assert_eq!((finished.width, finished.height), (120, 90));
    }

    #[tokio::test]
    async fn file_sources_are_read_from_disk() {
        let path = std::env::temp_dir().join(format!("swapmeet-{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, flat_png(10, 10)).unwrap();

        let image = ImagePipeline::default()
            .ingest(ImageSource::File(path.clone()))
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!((image.width, image.height), (10, 10));

        let err = ImagePipeline::default()
            .ingest(ImageSource::File(path))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Fetch(_)));
    }
}
