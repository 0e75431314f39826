//! Image-to-PDF assembly
//!
//! Every usable image becomes one A4 page, turned to landscape when that
//! shows the image larger, scaled to fit and centred.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PdfSuiteError;
use crate::images::{dimensions, embed_image, sniff_format};

pub const A4_WIDTH: f64 = 595.28;
pub const A4_HEIGHT: f64 = 841.89;

/// Where an image lands on its page, in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImagePlacement {
    pub page_width: f64,
    pub page_height: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub landscape: bool,
}

/// Pick orientation and fit an `iw` x `ih` pixel image onto an A4 page
pub fn fit_image(iw: f64, ih: f64) -> ImagePlacement {
    let place = |pw: f64, ph: f64, landscape: bool| {
        let scale = (pw / iw).min(ph / ih);
        let width = iw * scale;
        let height = ih * scale;
        ImagePlacement {
            page_width: pw,
            page_height: ph,
            x: (pw - width) / 2.0,
            y: (ph - height) / 2.0,
            width,
            height,
            landscape,
        }
    };

    let portrait = place(A4_WIDTH, A4_HEIGHT, false);
    let landscape = place(A4_HEIGHT, A4_WIDTH, true);
    if landscape.width * landscape.height > portrait.width * portrait.height {
        landscape
    } else {
        portrait
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AssembleOutput {
    pub data: Vec<u8>,
    pub page_count: u32,
    /// Names of inputs that could not be used
    pub skipped: Vec<String>,
}

/// Build one page per usable image. Fails only when nothing is usable.
pub fn images_to_pdf(images: &[ImageInput]) -> Result<AssembleOutput, PdfSuiteError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    let mut skipped = Vec::new();

    for input in images {
        let embedded = sniff_format(&input.data).and_then(|format| {
            let (w, h) = dimensions(format, &input.data)?;
            if w == 0 || h == 0 {
                return Err(PdfSuiteError::UnsupportedImage("Image has no pixels".to_string()));
            }
            embed_image(&mut doc, format, &input.data)
        });
        let image = match embedded {
            Ok(image) => image,
            Err(e) => {
                warn!(name = %input.name, "Skipping image: {}", e);
                skipped.push(input.name.clone());
                continue;
            }
        };

        let placement = fit_image(image.width_px as f64, image.height_px as f64);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(placement.width as f32),
                        0.into(),
                        0.into(),
                        Object::Real(placement.height as f32),
                        Object::Real(placement.x as f32),
                        Object::Real(placement.y as f32),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| PdfSuiteError::OperationError(format!("Failed to encode content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(placement.page_width as f32),
                Object::Real(placement.page_height as f32),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image.id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    if kids.is_empty() {
        return Err(PdfSuiteError::OperationError(
            "No usable images (PNG or JPEG required)".to_string(),
        ));
    }

    let page_count = kids.len() as u32;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfSuiteError::OperationError(format!("Failed to save PDF: {}", e)))?;

    Ok(AssembleOutput {
        data: buffer,
        page_count,
        skipped,
    })
}
