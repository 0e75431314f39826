//! Drag and resize state machine for overlay elements
//!
//! Pointer positions arrive in pixels relative to the rendered page. Deltas are
//! measured from where the interaction started, converted to percentages of
//! the container and applied to the element's starting geometry, so rounding
//! never accumulates across moves.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coords::{clamp_percent, pixels_to_percent, PercentBox};
use crate::elements::{ElementId, ElementStore, OverlayElement, Point, Size};
use crate::error::PdfSuiteError;

/// Smallest resize result unless configured otherwise
pub const DEFAULT_MIN_SIZE: Size = Size {
    width: 5.0,
    height: 3.0,
};

/// Lower bound for a configured minimum size
pub const MIN_SIZE_FLOOR: f64 = 1.0;

/// Pointer position in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

impl Pointer {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendered page size in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Container {
    pub width: f64,
    pub height: f64,
}

impl Container {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

/// Which edges of the box follow the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl ResizeHandle {
    pub fn edges(self) -> Edges {
        let mut edges = Edges::default();
        match self {
            ResizeHandle::N => edges.top = true,
            ResizeHandle::S => edges.bottom = true,
            ResizeHandle::E => edges.right = true,
            ResizeHandle::W => edges.left = true,
            ResizeHandle::NE => {
                edges.top = true;
                edges.right = true;
            }
            ResizeHandle::NW => {
                edges.top = true;
                edges.left = true;
            }
            ResizeHandle::SE => {
                edges.bottom = true;
                edges.right = true;
            }
            ResizeHandle::SW => {
                edges.bottom = true;
                edges.left = true;
            }
        }
        edges
    }

    pub fn all() -> [ResizeHandle; 8] {
        [
            ResizeHandle::N,
            ResizeHandle::S,
            ResizeHandle::E,
            ResizeHandle::W,
            ResizeHandle::NE,
            ResizeHandle::NW,
            ResizeHandle::SE,
            ResizeHandle::SW,
        ]
    }
}

impl FromStr for ResizeHandle {
    type Err = PdfSuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" => Ok(ResizeHandle::N),
            "s" => Ok(ResizeHandle::S),
            "e" => Ok(ResizeHandle::E),
            "w" => Ok(ResizeHandle::W),
            "ne" => Ok(ResizeHandle::NE),
            "nw" => Ok(ResizeHandle::NW),
            "se" => Ok(ResizeHandle::SE),
            "sw" => Ok(ResizeHandle::SW),
            other => Err(PdfSuiteError::OperationError(format!(
                "Unknown resize handle: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Dragging {
        id: ElementId,
        start_pointer: Pointer,
        start_position: Point,
    },
    Resizing {
        id: ElementId,
        handle: ResizeHandle,
        start_pointer: Pointer,
        start_box: PercentBox,
    },
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    state: Interaction,
    min_size: Size,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            state: Interaction::Idle,
            min_size: DEFAULT_MIN_SIZE,
        }
    }

    /// Use a different resize floor; values below 1% are raised to 1%
    pub fn with_min_size(min_size: Size) -> Self {
        Self {
            state: Interaction::Idle,
            min_size: Size::new(
                min_size.width.clamp(MIN_SIZE_FLOOR, 100.0),
                min_size.height.clamp(MIN_SIZE_FLOOR, 100.0),
            ),
        }
    }

    pub fn min_size(&self) -> Size {
        self.min_size
    }

    pub fn state(&self) -> &Interaction {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, Interaction::Idle)
    }

    /// Element currently being dragged or resized
    pub fn active_element(&self) -> Option<ElementId> {
        match self.state {
            Interaction::Idle => None,
            Interaction::Dragging { id, .. } | Interaction::Resizing { id, .. } => Some(id),
        }
    }

    pub fn begin_drag(&mut self, element: &OverlayElement, pointer: Pointer) {
        self.state = Interaction::Dragging {
            id: element.id,
            start_pointer: pointer,
            start_position: element.position,
        };
    }

    /// Start resizing; text has no box so it cannot be resized
    pub fn begin_resize(
        &mut self,
        element: &OverlayElement,
        handle: ResizeHandle,
        pointer: Pointer,
    ) -> bool {
        let Some(size) = element.size() else {
            return false;
        };
        self.state = Interaction::Resizing {
            id: element.id,
            handle,
            start_pointer: pointer,
            start_box: PercentBox::new(
                element.position.x,
                element.position.y,
                size.width,
                size.height,
            ),
        };
        true
    }

    /// Apply a pointer move to the active element. Returns the id that changed.
    pub fn pointer_move(
        &mut self,
        store: &mut ElementStore,
        pointer: Pointer,
        container: Container,
    ) -> Option<ElementId> {
        match self.state {
            Interaction::Idle => None,
            Interaction::Dragging {
                id,
                start_pointer,
                start_position,
            } => {
                let Some(element) = store.get_mut(id) else {
                    // Element removed mid-drag
                    self.state = Interaction::Idle;
                    return None;
                };
                let dx = pixels_to_percent(pointer.x - start_pointer.x, container.width);
                let dy = pixels_to_percent(pointer.y - start_pointer.y, container.height);
                let extent = element.size().unwrap_or(Size::new(0.0, 0.0));
                element.position = Point::new(
                    clamp_axis(start_position.x + dx, extent.width),
                    clamp_axis(start_position.y + dy, extent.height),
                );
                Some(id)
            }
            Interaction::Resizing {
                id,
                handle,
                start_pointer,
                start_box,
            } => {
                let Some(element) = store.get_mut(id) else {
                    self.state = Interaction::Idle;
                    return None;
                };
                let dx = pixels_to_percent(pointer.x - start_pointer.x, container.width);
                let dy = pixels_to_percent(pointer.y - start_pointer.y, container.height);
                let resized = resize_box(start_box, handle.edges(), dx, dy, self.min_size);
                element.position = Point::new(resized.x, resized.y);
                element.set_size(Size::new(resized.width, resized.height));
                Some(id)
            }
        }
    }

    /// Pointer released anywhere: end the interaction
    pub fn pointer_up(&mut self) -> Option<ElementId> {
        let active = self.active_element();
        self.state = Interaction::Idle;
        active
    }

    pub fn cancel(&mut self) {
        self.state = Interaction::Idle;
    }
}

/// Clamp one axis of a drag so the element's extent stays on the page
fn clamp_axis(value: f64, extent: f64) -> f64 {
    let max = (100.0 - extent).max(0.0);
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

/// Move the selected edges by (dx, dy), keeping the opposite edges anchored
fn resize_box(start: PercentBox, edges: Edges, dx: f64, dy: f64, min: Size) -> PercentBox {
    let mut left = start.x;
    let mut right = start.x + start.width;
    let mut top = start.y;
    let mut bottom = start.y + start.height;

    if edges.left {
        left = (start.x + dx).min(right - min.width).max(0.0);
    }
    if edges.right {
        right = (right + dx).max(left + min.width).min(100.0);
    }
    if edges.top {
        top = (start.y + dy).min(bottom - min.height).max(0.0);
    }
    if edges.bottom {
        bottom = (bottom + dy).max(top + min.height).min(100.0);
    }

    PercentBox::new(
        clamp_percent(left),
        clamp_percent(top),
        (right - left).max(0.0),
        (bottom - top).max(0.0),
    )
}
