//! Encoded drawing handed to the judge
//!
//! A PNG of the raw stroke, carried around as a `data:` URI so a remote judge
//! gets a self-contained payload.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, ImageFormat};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("png encode failed: {0}")]
    Encode(String),
    #[error("png decode failed: {0}")]
    Decode(String),
    #[error("not a base64 png data uri")]
    NotDataUri,
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// PNG bytes of a rendered path plus the canvas size they were drawn at
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    width: u32,
    height: u32,
    png: Vec<u8>,
}

impl fmt::Debug for EncodedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedArtifact")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

impl EncodedArtifact {
    /// Encode a grayscale canvas as PNG
    pub fn encode(image: &GrayImage) -> Result<Self, ArtifactError> {
        let (width, height) = image.dimensions();
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(image.as_raw(), width, height, ExtendedColorType::L8)
            .map_err(|err| ArtifactError::Encode(err.to_string()))?;
        Ok(Self { width, height, png })
    }

    /// Parse a `data:image/png;base64,...` URI
    ///
    /// Dimensions come from the PNG header, so a URI that decodes to garbage
    /// is rejected here rather than at the judge.
    pub fn from_data_uri(uri: &str) -> Result<Self, ArtifactError> {
        let payload = uri
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or(ArtifactError::NotDataUri)?;
        let png = STANDARD.decode(payload.trim())?;
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|err| ArtifactError::Decode(err.to_string()))?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    pub fn to_data_uri(&self) -> String {
        format!("{DATA_URI_PREFIX}{}", STANDARD.encode(&self.png))
    }

    /// Decode back to grayscale pixels
    pub fn decode(&self) -> Result<GrayImage, ArtifactError> {
        let image = image::load_from_memory_with_format(&self.png, ImageFormat::Png)
            .map_err(|err| ArtifactError::Decode(err.to_string()))?;
        Ok(image.to_luma8())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }
}

impl Serialize for EncodedArtifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for EncodedArtifact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DataUriVisitor;

        impl Visitor<'_> for DataUriVisitor {
            type Value = EncodedArtifact;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base64 png data uri")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                EncodedArtifact::from_data_uri(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(DataUriVisitor)
    }
}
