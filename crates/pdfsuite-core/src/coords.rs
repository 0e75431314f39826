//! Coordinate transformation between percentage space and PDF point space
//!
//! Overlay elements are stored as percentages of the rendered page (top-left
//! origin, 0-100). PDF content streams use points with a bottom-left origin,
//! offset by the page's MediaBox origin.

use lopdf::{Document, Object, ObjectId};

/// US Letter, used when a page has no usable MediaBox
pub const LETTER_WIDTH: f64 = 612.0;
pub const LETTER_HEIGHT: f64 = 792.0;

/// Clamp a percentage to the page, mapping NaN to 0
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Convert a pixel delta to a percentage of the container (0 for an empty container)
pub fn pixels_to_percent(delta_px: f64, container_px: f64) -> f64 {
    if container_px <= 0.0 || !container_px.is_finite() {
        return 0.0;
    }
    delta_px / container_px * 100.0
}

/// Page bounds in points, taken from the MediaBox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for PageBox {
    fn default() -> Self {
        Self::letter()
    }
}

impl PageBox {
    pub fn new(x0: f64, y0: f64, width: f64, height: f64) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }

    pub fn letter() -> Self {
        Self::new(0.0, 0.0, LETTER_WIDTH, LETTER_HEIGHT)
    }

    /// Build from a `[llx lly urx ury]` array, normalising flipped corners
    pub fn from_media_box(media_box: [f64; 4]) -> Option<Self> {
        let [a, b, c, d] = media_box;
        let (x0, x1) = if a <= c { (a, c) } else { (c, a) };
        let (y0, y1) = if b <= d { (b, d) } else { (d, b) };
        let width = x1 - x0;
        let height = y1 - y0;
        if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
            Some(Self::new(x0, y0, width, height))
        } else {
            None
        }
    }

    /// Resolve the MediaBox for a page, following `/Parent` for inherited boxes.
    ///
    /// Falls back to Letter when none is found.
    pub fn for_page(doc: &Document, page_id: ObjectId) -> Self {
        let mut current = Some(page_id);
        // Page trees are shallow; the bound guards against reference cycles
        for _ in 0..32 {
            let Some(id) = current else { break };
            let Ok(dict) = doc.get_dictionary(id) else {
                break;
            };
            if let Ok(obj) = dict.get(b"MediaBox") {
                if let Some(page_box) = media_box_from_object(doc, obj).and_then(Self::from_media_box)
                {
                    return page_box;
                }
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }
        Self::letter()
    }

    pub fn to_points_x(&self, x_pct: f64) -> f64 {
        self.x0 + clamp_percent(x_pct) / 100.0 * self.width
    }

    /// Y flip: 0% is the top edge, 100% the bottom edge
    pub fn to_points_y(&self, y_pct: f64) -> f64 {
        self.y0 + self.height - clamp_percent(y_pct) / 100.0 * self.height
    }

    pub fn scale_width(&self, w_pct: f64) -> f64 {
        clamp_percent(w_pct) / 100.0 * self.width
    }

    pub fn scale_height(&self, h_pct: f64) -> f64 {
        clamp_percent(h_pct) / 100.0 * self.height
    }

    pub fn to_percent_x(&self, x_pt: f64) -> f64 {
        (x_pt - self.x0) / self.width * 100.0
    }

    pub fn to_percent_y(&self, y_pt: f64) -> f64 {
        (1.0 - (y_pt - self.y0) / self.height) * 100.0
    }

    pub fn to_percent_width(&self, w_pt: f64) -> f64 {
        w_pt / self.width * 100.0
    }

    pub fn to_percent_height(&self, h_pt: f64) -> f64 {
        h_pt / self.height * 100.0
    }

    /// Convert a percentage box to a bottom-left anchored rectangle in points
    pub fn rect(&self, pct: PercentBox) -> PdfRect {
        let x = self.to_points_x(pct.x);
        let top = self.to_points_y(pct.y);
        let mut width = self.scale_width(pct.width);
        let mut height = self.scale_height(pct.height);

        // Keep the box inside the page even if x + w exceeds 100%
        width = width.min(self.x0 + self.width - x);
        let y = (top - height).max(self.y0);
        height = height.min(top - self.y0);

        PdfRect {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }
}

/// Extract four numbers from a MediaBox value, resolving an indirect reference
fn media_box_from_object(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, value) in out.iter_mut().zip(arr) {
        *slot = number(value)?;
    }
    Some(out)
}

/// Read an Integer or Real as f64
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Rectangle in percentage space (top-left anchored)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Rectangle in point space (bottom-left anchored), ready for `re`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Baseline for text whose top edge sits at `abs_y`
pub fn text_baseline(abs_y: f64, font_size: f64) -> f64 {
    abs_y - font_size
}
