//! Overlay element model
//!
//! Elements are user-placed annotations (text, rectangles, images) positioned
//! in percentage space on a page. They live in an [`ElementStore`] for the
//! duration of an edit session and are only turned into page content by the
//! flatten pass.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::coords::clamp_percent;
use crate::error::PdfSuiteError;

pub type ElementId = u64;

/// Default font family for new text elements
pub const DEFAULT_FONT_FAMILY: &str = "Helvetica";

/// Default font size (points) for new text elements
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Smallest font size accepted from property edits
pub const MIN_FONT_SIZE: f64 = 1.0;

/// Position in percentage space (0-100, top-left origin)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn clamped(self) -> Self {
        Self {
            x: clamp_percent(self.x),
            y: clamp_percent(self.y),
        }
    }
}

/// Size in percentage space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn clamped(self) -> Self {
        Self {
            width: clamp_percent(self.width),
            height: clamp_percent(self.height),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    /// Catalog font family, e.g. "Helvetica", "Times-Roman", "Roboto"
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    /// Fill color as hex, e.g. "#000000"
    #[serde(default = "default_text_color")]
    pub color: String,
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn default_text_color() -> String {
    "#000000".to_string()
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
            color: default_text_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Text {
        content: String,
        #[serde(default)]
        style: TextStyle,
    },
    Rectangle {
        size: Size,
        fill: String,
    },
    Image {
        size: Size,
        /// Inline data URI (`data:image/png;base64,...` or JPEG)
        data: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlayElement {
    #[serde(default)]
    pub id: ElementId,
    /// 1-based page number
    pub page: u32,
    pub position: Point,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl OverlayElement {
    /// New text element with the editor's defaults
    pub fn text(page: u32) -> Self {
        Self {
            id: 0,
            page,
            position: Point::new(20.0, 20.0),
            kind: ElementKind::Text {
                content: "Click to edit".to_string(),
                style: TextStyle::default(),
            },
        }
    }

    /// New white rectangle, typically used to cover content
    pub fn rectangle(page: u32) -> Self {
        Self {
            id: 0,
            page,
            position: Point::new(30.0, 30.0),
            kind: ElementKind::Rectangle {
                size: Size::new(25.0, 15.0),
                fill: "#ffffff".to_string(),
            },
        }
    }

    pub fn image(page: u32, data_uri: impl Into<String>) -> Self {
        Self {
            id: 0,
            page,
            position: Point::new(25.0, 25.0),
            kind: ElementKind::Image {
                size: Size::new(30.0, 20.0),
                data: data_uri.into(),
            },
        }
    }

    /// Box size, `None` for auto-sized text
    pub fn size(&self) -> Option<Size> {
        match &self.kind {
            ElementKind::Text { .. } => None,
            ElementKind::Rectangle { size, .. } | ElementKind::Image { size, .. } => Some(*size),
        }
    }

    pub fn set_size(&mut self, new_size: Size) -> bool {
        match &mut self.kind {
            ElementKind::Text { .. } => false,
            ElementKind::Rectangle { size, .. } | ElementKind::Image { size, .. } => {
                *size = new_size.clamped();
                true
            }
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ElementKind::Text { .. })
    }

    /// Apply a partial update. Fields that don't apply to this kind are ignored.
    pub fn apply(&mut self, update: &ElementUpdate) {
        if let Some(page) = update.page {
            self.page = page.max(1);
        }
        if let Some(position) = update.position {
            self.position = position.clamped();
        }
        if let Some(size) = update.size {
            self.set_size(size);
        }

        match &mut self.kind {
            ElementKind::Text { content, style } => {
                if let Some(text) = &update.content {
                    *content = text.clone();
                }
                if let Some(family) = &update.font_family {
                    style.font_family = family.clone();
                }
                if let Some(font_size) = update.font_size {
                    if font_size.is_finite() {
                        style.font_size = font_size.max(MIN_FONT_SIZE);
                    }
                }
                if let Some(bold) = update.bold {
                    style.bold = bold;
                }
                if let Some(italic) = update.italic {
                    style.italic = italic;
                }
                if let Some(underline) = update.underline {
                    style.underline = underline;
                }
                if let Some(color) = &update.color {
                    style.color = color.clone();
                }
            }
            ElementKind::Rectangle { fill, .. } => {
                if let Some(color) = &update.color {
                    *fill = color.clone();
                }
            }
            ElementKind::Image { data, .. } => {
                if let Some(uri) = &update.image_data {
                    *data = uri.clone();
                }
            }
        }

        // Keep sized elements on the page after a move or resize
        if let Some(size) = self.size() {
            self.position.x = self.position.x.min(100.0 - size.width).max(0.0);
            self.position.y = self.position.y.min(100.0 - size.height).max(0.0);
        }
    }
}

/// Partial update for an element (property panel edits)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElementUpdate {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
    #[serde(default)]
    pub underline: Option<bool>,
    /// Text color or rectangle fill
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
}

/// Ordered element collection for one edit session.
///
/// Insertion order is z-order: later elements paint over earlier ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementStore {
    next_id: ElementId,
    elements: Vec<OverlayElement>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, assigning it a fresh id
    pub fn add(&mut self, mut element: OverlayElement) -> ElementId {
        self.next_id += 1;
        let id = self.next_id;
        element.id = id;
        element.position = element.position.clamped();
        if let Some(size) = element.size() {
            element.set_size(size);
        }
        self.elements.push(element);
        id
    }

    pub fn add_text(&mut self, page: u32) -> ElementId {
        self.add(OverlayElement::text(page))
    }

    pub fn add_rectangle(&mut self, page: u32) -> ElementId {
        self.add(OverlayElement::rectangle(page))
    }

    pub fn add_image(&mut self, page: u32, data_uri: impl Into<String>) -> ElementId {
        self.add(OverlayElement::image(page, data_uri))
    }

    pub fn get(&self, id: ElementId) -> Option<&OverlayElement> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut OverlayElement> {
        self.elements.iter_mut().find(|el| el.id == id)
    }

    pub fn update(&mut self, id: ElementId, update: &ElementUpdate) -> bool {
        match self.get_mut(id) {
            Some(element) => {
                element.apply(update);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ElementId) -> bool {
        if let Some(pos) = self.elements.iter().position(|el| el.id == id) {
            self.elements.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn elements(&self) -> &[OverlayElement] {
        &self.elements
    }

    pub fn elements_for_page(&self, page: u32) -> Vec<&OverlayElement> {
        self.elements.iter().filter(|el| el.page == page).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Drop all elements. Ids keep counting up so they are never reused.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn to_json(&self) -> Result<String, PdfSuiteError> {
        serde_json::to_string(self).map_err(|e| PdfSuiteError::SerializationError(e.to_string()))
    }

    /// Restore a saved store. The id counter is never trusted below the
    /// highest element id, and duplicate ids are rejected.
    pub fn from_json(json: &str) -> Result<Self, PdfSuiteError> {
        let mut store: Self = serde_json::from_str(json)
            .map_err(|e| PdfSuiteError::SerializationError(e.to_string()))?;

        let mut seen = HashSet::with_capacity(store.elements.len());
        for element in &store.elements {
            if !seen.insert(element.id) {
                return Err(PdfSuiteError::SerializationError(format!(
                    "Duplicate element id {}",
                    element.id
                )));
            }
        }

        let highest = store.elements.iter().map(|el| el.id).max().unwrap_or(0);
        store.next_id = store.next_id.max(highest);
        Ok(store)
    }
}
