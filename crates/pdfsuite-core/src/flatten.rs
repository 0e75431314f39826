//! Save pass: bake overlay elements into page content
//!
//! Elements are drawn in insertion order (later elements paint over earlier
//! ones). Existing page content is wrapped in `q ... Q` so its graphics state
//! cannot leak into the overlay. Per-element problems are logged and recorded
//! in the [`FlattenReport`]; only a document that fails to load aborts the pass.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coords::{text_baseline, PageBox, PercentBox};
use crate::elements::{ElementId, ElementKind, OverlayElement, TextStyle, MIN_FONT_SIZE};
use crate::error::PdfSuiteError;
use crate::fonts::{FontCache, FontCatalog, FontSource};
use crate::images::{decode_data_uri, embed_image};

/// Line spacing for multi-line text, as a multiple of the font size
pub const LINE_HEIGHT: f64 = 1.2;

/// Underline position below the baseline, as a fraction of the font size
pub const UNDERLINE_OFFSET: f64 = 0.125;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    PageOutOfRange,
    InvalidImage(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedElement {
    pub id: ElementId,
    pub page: u32,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlattenReport {
    pub drawn: usize,
    pub skipped: Vec<SkippedElement>,
    /// Font fetches issued during the pass
    pub font_fetches: usize,
    /// Families that were replaced by Helvetica
    pub fallback_fonts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FlattenOutput {
    pub data: Vec<u8>,
    pub report: FlattenReport,
}

/// Content and resources collected for one page
#[derive(Default)]
struct PageOverlay {
    operations: Vec<Operation>,
    fonts: BTreeMap<String, ObjectId>,
    xobjects: BTreeMap<String, ObjectId>,
}

/// Flatten `elements` into a copy of the document
pub fn flatten_elements(
    pdf_bytes: &[u8],
    elements: &[OverlayElement],
    catalog: &FontCatalog,
    font_source: &dyn FontSource,
) -> Result<FlattenOutput, PdfSuiteError> {
    let mut doc =
        Document::load_mem(pdf_bytes).map_err(|e| PdfSuiteError::ParseError(e.to_string()))?;
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;

    let mut report = FlattenReport::default();
    let mut cache = FontCache::new(catalog, font_source);
    let mut overlays: BTreeMap<u32, PageOverlay> = BTreeMap::new();
    let mut images: HashMap<&str, ObjectId> = HashMap::new();

    for element in elements {
        let Some(&page_id) = pages.get(&element.page) else {
            debug!(
                id = element.id,
                page = element.page,
                page_count,
                "Dropping element outside document"
            );
            report.skipped.push(SkippedElement {
                id: element.id,
                page: element.page,
                reason: SkipReason::PageOutOfRange,
            });
            continue;
        };
        let page_box = PageBox::for_page(&doc, page_id);
        let mut overlay = overlays.remove(&element.page).unwrap_or_default();

        match &element.kind {
            ElementKind::Rectangle { size, fill } => {
                let rect = page_box.rect(PercentBox::new(
                    element.position.x,
                    element.position.y,
                    size.width,
                    size.height,
                ));
                let (r, g, b) = parse_hex_color(fill).unwrap_or((1.0, 1.0, 1.0));
                overlay.operations.extend([
                    Operation::new("q", vec![]),
                    fill_color(r, g, b),
                    rect_op(rect.x, rect.y, rect.width, rect.height),
                    Operation::new("f", vec![]),
                    Operation::new("Q", vec![]),
                ]);
                report.drawn += 1;
            }
            ElementKind::Text { content, style } => {
                let font = cache.resolve(
                    &mut doc,
                    &style.font_family,
                    style.bold,
                    style.italic,
                );
                if font.fallback && !report.fallback_fonts.contains(&style.font_family) {
                    report.fallback_fonts.push(style.font_family.clone());
                }
                let font_name = format!("PSF{}", font.id.0);
                overlay.fonts.insert(font_name.clone(), font.id);

                let x = page_box.to_points_x(element.position.x);
                let top = page_box.to_points_y(element.position.y);
                overlay.operations.extend(text_operations(
                    content,
                    style,
                    &font_name,
                    x,
                    top,
                    |line, size| font.text_width(line, size),
                    |line| font.encode(line),
                ));
                report.drawn += 1;
            }
            ElementKind::Image { size, data } => {
                let image_id = match images.get(data.as_str()) {
                    Some(id) => *id,
                    None => {
                        let embedded = decode_data_uri(data)
                            .and_then(|(format, bytes)| embed_image(&mut doc, format, &bytes));
                        match embedded {
                            Ok(image) => {
                                images.insert(data.as_str(), image.id);
                                image.id
                            }
                            Err(e) => {
                                warn!(id = element.id, page = element.page, "Skipping image: {}", e);
                                report.skipped.push(SkippedElement {
                                    id: element.id,
                                    page: element.page,
                                    reason: SkipReason::InvalidImage(e.to_string()),
                                });
                                overlays.insert(element.page, overlay);
                                continue;
                            }
                        }
                    }
                };
                let name = format!("PSI{}", image_id.0);
                overlay.xobjects.insert(name.clone(), image_id);

                let rect = page_box.rect(PercentBox::new(
                    element.position.x,
                    element.position.y,
                    size.width,
                    size.height,
                ));
                overlay.operations.extend([
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            real(rect.width),
                            0.into(),
                            0.into(),
                            real(rect.height),
                            real(rect.x),
                            real(rect.y),
                        ],
                    ),
                    Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                    Operation::new("Q", vec![]),
                ]);
                report.drawn += 1;
            }
        }

        overlays.insert(element.page, overlay);
    }

    report.font_fetches = cache.fetches();

    overlays.retain(|_, overlay| !overlay.operations.is_empty());
    if overlays.is_empty() {
        return Ok(FlattenOutput {
            data: pdf_bytes.to_vec(),
            report,
        });
    }

    for (page_num, overlay) in overlays {
        let Some(&page_id) = pages.get(&page_num) else {
            continue;
        };
        add_page_resources(&mut doc, page_id, &overlay)?;
        append_overlay_content(&mut doc, page_id, overlay.operations)?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfSuiteError::OperationError(format!("Failed to save PDF: {}", e)))?;

    Ok(FlattenOutput {
        data: output,
        report,
    })
}

/// Parse `#rrggbb` or `rrggbb` into RGB floats (0-1 range)
pub fn parse_hex_color(color: &str) -> Option<(f32, f32, f32)> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map(|v| v as f32 / 255.0)
    };
    Some((channel(0..2).ok()?, channel(2..4).ok()?, channel(4..6).ok()?))
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn fill_color(r: f32, g: f32, b: f32) -> Operation {
    Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)])
}

fn rect_op(x: f64, y: f64, width: f64, height: f64) -> Operation {
    Operation::new("re", vec![real(x), real(y), real(width), real(height)])
}

/// Operations for a (possibly multi-line) text element whose top edge sits at `top`
fn text_operations(
    content: &str,
    style: &TextStyle,
    font_name: &str,
    x: f64,
    top: f64,
    measure: impl Fn(&str, f64) -> f64,
    encode: impl Fn(&str) -> Vec<u8>,
) -> Vec<Operation> {
    let size = if style.font_size.is_finite() {
        style.font_size.max(MIN_FONT_SIZE)
    } else {
        MIN_FONT_SIZE
    };
    let (r, g, b) = parse_hex_color(&style.color).unwrap_or((0.0, 0.0, 0.0));
    let leading = size * LINE_HEIGHT;
    let baseline = text_baseline(top, size);
    let lines: Vec<&str> = content.lines().map(|l| l.trim_end_matches('\r')).collect();

    let mut ops = vec![
        Operation::new("q", vec![]),
        fill_color(r, g, b),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font_name.as_bytes().to_vec()), real(size)]),
        Operation::new("Td", vec![real(x), real(baseline)]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            ops.push(Operation::new("Td", vec![0.into(), real(-leading)]));
        }
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode(line), StringFormat::Literal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));

    if style.underline {
        let thickness = size / 15.0;
        for (i, line) in lines.iter().enumerate() {
            let width = measure(line, size);
            if width <= 0.0 {
                continue;
            }
            let line_y = baseline - i as f64 * leading - UNDERLINE_OFFSET * size;
            ops.push(rect_op(x, line_y - thickness / 2.0, width, thickness));
            ops.push(Operation::new("f", vec![]));
        }
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Resolve a dictionary that may be stored inline or by reference
fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// The page's effective resources, following `/Parent` for inherited ones
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    for _ in 0..32 {
        let Some(id) = current else { break };
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Some(resources) = dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
        {
            return resources;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Dictionary::new()
}

/// Give the page its own Resources dictionary with the overlay's fonts and images.
///
/// Shared resource dictionaries are copied so other pages are not affected.
fn add_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: &PageOverlay,
) -> Result<(), PdfSuiteError> {
    let mut resources = effective_resources(doc, page_id);

    for (key, entries) in [(&b"Font"[..], &overlay.fonts), (&b"XObject"[..], &overlay.xobjects)] {
        if entries.is_empty() {
            continue;
        }
        let mut sub = resources
            .get(key)
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
            .unwrap_or_default();
        for (name, id) in entries {
            sub.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        resources.set(key.to_vec(), Object::Dictionary(sub));
    }

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfSuiteError::OperationError(format!("Invalid page object: {}", e)))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Wrap existing content in `q ... Q` and append the overlay stream
fn append_overlay_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), PdfSuiteError> {
    // Leading newline: concatenated streams need not end in whitespace
    let mut overlay = b"\nQ\n".to_vec();
    overlay.extend(
        Content { operations }
            .encode()
            .map_err(|e| PdfSuiteError::OperationError(format!("Failed to encode content: {}", e)))?,
    );

    let existing = doc
        .get_dictionary(page_id)
        .map_err(|e| PdfSuiteError::OperationError(format!("Invalid page object: {}", e)))?
        .get(b"Contents")
        .ok()
        .cloned();

    let push_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = vec![Object::Reference(push_id)];
    match existing {
        // An indirect array of streams is spliced in, never nested
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(arr)) => contents.extend(arr.iter().cloned()),
            _ => contents.push(Object::Reference(id)),
        },
        Some(Object::Array(arr)) => contents.extend(arr),
        _ => {}
    }
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfSuiteError::OperationError(format!("Invalid page object: {}", e)))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
