//! Candidate image validation.
//!
//! The pipeline asks two questions of a candidate URL: how large is it, and
//! what color is the car. Both go through [`ImageInspector`] so tests can
//! answer them without the network.
pub mod color;
mod palette;

pub use color::{dominant_color, nearest_named, UNKNOWN_COLOR};

use crate::error::FetchError;
use crate::http::{HttpClient, MAX_IMAGE_BYTES};
use crate::record::Dimensions;
use std::io::Cursor;

/// Minimum accepted width in pixels.
pub const MIN_WIDTH: u32 = 1280;
/// Minimum accepted height in pixels.
pub const MIN_HEIGHT: u32 = 720;

/// Resolution gate applied to every candidate.
pub fn meets_resolution(width: u32, height: u32) -> bool {
    width >= MIN_WIDTH && height >= MIN_HEIGHT
}

pub trait ImageInspector {
    /// Fetch the image and report its pixel dimensions.
    fn fetch_dimensions(&mut self, url: &str) -> Result<Dimensions, FetchError>;

    /// Fetch the image and classify its dominant color.
    ///
    /// Images with no usable pixel yield [`UNKNOWN_COLOR`], not an error.
    fn dominant_color(&mut self, url: &str) -> Result<String, FetchError>;
}

/// Inspector backed by real HTTP downloads.
///
/// Keeps the bytes of the last URL it fetched, so the dimension check and
/// the color analysis of the winning candidate share one download.
pub struct HttpImageInspector {
    client: HttpClient,
    cached: Option<(String, Vec<u8>)>,
}

impl HttpImageInspector {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            cached: None,
        }
    }

    fn bytes_for(&mut self, url: &str) -> Result<&[u8], FetchError> {
        let hit = matches!(&self.cached, Some((cached, _)) if cached == url);
        if !hit {
            self.cached = None;
            let bytes = self.client.get_bytes(url, MAX_IMAGE_BYTES)?;
            tracing::debug!(url, bytes = bytes.len(), "downloaded candidate image");
            self.cached = Some((url.to_string(), bytes));
        }
        Ok(self
            .cached
            .as_ref()
            .map(|(_, bytes)| bytes.as_slice())
            .unwrap_or_default())
    }
}

impl ImageInspector for HttpImageInspector {
    fn fetch_dimensions(&mut self, url: &str) -> Result<Dimensions, FetchError> {
        let bytes = self.bytes_for(url)?;
        decode_dimensions(bytes).map_err(|reason| FetchError::Decode {
            url: url.to_string(),
            reason,
        })
    }

    fn dominant_color(&mut self, url: &str) -> Result<String, FetchError> {
        let bytes = self.bytes_for(url)?;
        let img = image::load_from_memory(bytes).map_err(|err| FetchError::Decode {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        Ok(color::dominant_color(&img))
    }
}

/// Read dimensions from the image header without decoding pixels.
pub fn decode_dimensions(bytes: &[u8]) -> Result<Dimensions, String> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| err.to_string())?
        .into_dimensions()
        .map_err(|err| err.to_string())?;
    Ok(Dimensions::new(width, height))
}
