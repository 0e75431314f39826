//! Raster decoding and image XObject creation
//!
//! Only PNG and JPEG are accepted. JPEG data is embedded as-is with
//! `DCTDecode` once the decoder has read it end to end; PNG is decoded,
//! split into RGB and an alpha soft mask, and Flate-compressed.

use std::io::{Cursor, Write};

use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat, ImageReader};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::PdfSuiteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(RasterFormat::Png),
            "image/jpeg" | "image/jpg" => Some(RasterFormat::Jpeg),
            _ => None,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            RasterFormat::Png => ImageFormat::Png,
            RasterFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

fn unsupported(context: &str, e: impl std::fmt::Display) -> PdfSuiteError {
    PdfSuiteError::UnsupportedImage(format!("{}: {}", context, e))
}

/// Identify PNG or JPEG from magic bytes
pub fn sniff_format(bytes: &[u8]) -> Result<RasterFormat, PdfSuiteError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok(RasterFormat::Png),
        Ok(ImageFormat::Jpeg) => Ok(RasterFormat::Jpeg),
        _ => Err(PdfSuiteError::UnsupportedImage(
            "Only PNG and JPEG images are supported".to_string(),
        )),
    }
}

/// Decode a base64 `data:` URI holding a PNG or JPEG
pub fn decode_data_uri(uri: &str) -> Result<(RasterFormat, Vec<u8>), PdfSuiteError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| PdfSuiteError::UnsupportedImage("Not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| PdfSuiteError::UnsupportedImage("Malformed data URI".to_string()))?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or_default();
    let declared = RasterFormat::from_mime(mime).ok_or_else(|| {
        PdfSuiteError::UnsupportedImage(format!("Unsupported image type: {}", mime))
    })?;
    if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(PdfSuiteError::UnsupportedImage(
            "Image data URI must be base64 encoded".to_string(),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| unsupported("Invalid base64", e))?;

    // Trust the bytes over the declared type
    let format = sniff_format(&bytes).unwrap_or(declared);
    Ok((format, bytes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width_px: u32,
    pub height_px: u32,
}

pub fn embed_image(
    doc: &mut Document,
    format: RasterFormat,
    bytes: &[u8],
) -> Result<EmbeddedImage, PdfSuiteError> {
    match format {
        RasterFormat::Jpeg => embed_jpeg(doc, bytes),
        RasterFormat::Png => embed_png(doc, bytes),
    }
}

fn embed_jpeg(doc: &mut Document, bytes: &[u8]) -> Result<EmbeddedImage, PdfSuiteError> {
    let decoder =
        JpegDecoder::new(Cursor::new(bytes)).map_err(|e| unsupported("Invalid JPEG data", e))?;
    let (width, height) = decoder.dimensions();
    if width == 0 || height == 0 {
        return Err(PdfSuiteError::UnsupportedImage("Image has no pixels".to_string()));
    }
    let color_space = match decoder.original_color_type() {
        ExtendedColorType::L8 | ExtendedColorType::La8 => "DeviceGray",
        _ => "DeviceRGB",
    };
    // Headers alone do not prove the scan data is readable
    DynamicImage::from_decoder(decoder).map_err(|e| unsupported("Failed to decode JPEG", e))?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };

    let id = doc.add_object(Stream::new(dict, bytes.to_vec()).with_compression(false));
    Ok(EmbeddedImage {
        id,
        width_px: width,
        height_px: height,
    })
}

fn embed_png(doc: &mut Document, bytes: &[u8]) -> Result<EmbeddedImage, PdfSuiteError> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| unsupported("Failed to decode PNG", e))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(PdfSuiteError::UnsupportedImage("Image has no pixels".to_string()));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        has_alpha |= a != 255;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if has_alpha {
        let smask = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        let smask_id = doc.add_object(
            Stream::new(smask, flate_compress(&alpha)?).with_compression(false),
        );
        dict.set("SMask", Object::Reference(smask_id));
    }

    let id = doc.add_object(Stream::new(dict, flate_compress(&rgb)?).with_compression(false));
    Ok(EmbeddedImage {
        id,
        width_px: width,
        height_px: height,
    })
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>, PdfSuiteError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfSuiteError::OperationError(format!("Compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| PdfSuiteError::OperationError(format!("Compression failed: {}", e)))
}

/// Pixel dimensions of a PNG or JPEG without decoding the full image
pub fn dimensions(format: RasterFormat, bytes: &[u8]) -> Result<(u32, u32), PdfSuiteError> {
    ImageReader::with_format(Cursor::new(bytes), format.image_format())
        .into_dimensions()
        .map_err(|e| unsupported("Invalid image data", e))
}
