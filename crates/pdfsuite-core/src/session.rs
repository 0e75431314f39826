//! Editor session: one loaded document with its overlay, view and pointer state
//!
//! All editor state lives here and changes through explicit operations, so the
//! browser binding and the tests drive the same code.

use lopdf::Document;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{output_file_name, OutputKind};
use crate::coords::PageBox;
use crate::elements::{ElementId, ElementStore, ElementUpdate, OverlayElement};
use crate::error::PdfSuiteError;
use crate::flatten::{flatten_elements, FlattenOutput};
use crate::fonts::{required_font_urls, FontCatalog, FontSource};
use crate::interaction::{Container, InteractionController, Pointer, ResizeHandle};

pub const MIN_SCALE: f64 = 0.25;
pub const MAX_SCALE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Select,
    Text,
    Rectangle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// 1-based
    pub current_page: u32,
    pub scale: f64,
    pub tool: Tool,
    pub selected: Option<ElementId>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_page: 1,
            scale: 1.0,
            tool: Tool::Select,
            selected: None,
        }
    }
}

/// Partial view change; absent fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewUpdate {
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub tool: Option<Tool>,
    /// `Some(None)` clears the selection
    #[serde(default)]
    pub selected: Option<Option<ElementId>>,
}

pub struct EditorSession {
    name: String,
    bytes: Vec<u8>,
    page_boxes: Vec<PageBox>,
    store: ElementStore,
    interaction: InteractionController,
    view: ViewState,
}

impl EditorSession {
    /// Load a document for editing. The bytes are kept untouched until save.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, PdfSuiteError> {
        let doc = Document::load_mem(&bytes).map_err(|e| PdfSuiteError::ParseError(e.to_string()))?;
        let page_boxes: Vec<PageBox> = doc
            .get_pages()
            .values()
            .map(|id| PageBox::for_page(&doc, *id))
            .collect();
        let name = name.into();
        debug!(name = %name, pages = page_boxes.len(), "Opened editor session");

        Ok(Self {
            name,
            bytes,
            page_boxes,
            store: ElementStore::new(),
            interaction: InteractionController::new(),
            view: ViewState::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> u32 {
        self.page_boxes.len() as u32
    }

    /// Page box for a 1-based page
    pub fn page_box(&self, page: u32) -> Option<PageBox> {
        page.checked_sub(1)
            .and_then(|idx| self.page_boxes.get(idx as usize))
            .copied()
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn elements(&self) -> &[OverlayElement] {
        self.store.elements()
    }

    pub fn element(&self, id: ElementId) -> Option<&OverlayElement> {
        self.store.get(id)
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn update_view(&mut self, update: ViewUpdate) {
        if let Some(page) = update.current_page {
            self.view.current_page = page.clamp(1, self.page_count().max(1));
        }
        if let Some(scale) = update.scale {
            if scale.is_finite() {
                self.view.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
            }
        }
        if let Some(tool) = update.tool {
            self.view.tool = tool;
        }
        if let Some(selected) = update.selected {
            self.view.selected = selected.filter(|id| self.store.get(*id).is_some());
        }
    }

    pub fn add_text(&mut self) -> ElementId {
        let id = self.store.add_text(self.view.current_page);
        self.after_add(id)
    }

    pub fn add_rectangle(&mut self) -> ElementId {
        let id = self.store.add_rectangle(self.view.current_page);
        self.after_add(id)
    }

    pub fn add_image(&mut self, data_uri: impl Into<String>) -> ElementId {
        let id = self.store.add_image(self.view.current_page, data_uri);
        self.after_add(id)
    }

    fn after_add(&mut self, id: ElementId) -> ElementId {
        self.view.selected = Some(id);
        self.view.tool = Tool::Select;
        id
    }

    pub fn update_element(&mut self, id: ElementId, update: &ElementUpdate) -> bool {
        self.store.update(id, update)
    }

    pub fn remove_element(&mut self, id: ElementId) -> bool {
        let removed = self.store.remove(id);
        if removed {
            if self.view.selected == Some(id) {
                self.view.selected = None;
            }
            if self.interaction.active_element() == Some(id) {
                self.interaction.cancel();
            }
        }
        removed
    }

    /// Press on an element body: select it and start dragging
    pub fn pointer_down_element(&mut self, id: ElementId, pointer: Pointer) -> bool {
        let Some(element) = self.store.get(id) else {
            return false;
        };
        self.interaction.begin_drag(element, pointer);
        self.view.selected = Some(id);
        true
    }

    /// Press on a resize handle. Text elements have no handles.
    pub fn pointer_down_handle(
        &mut self,
        id: ElementId,
        handle: ResizeHandle,
        pointer: Pointer,
    ) -> bool {
        let Some(element) = self.store.get(id) else {
            return false;
        };
        let started = self.interaction.begin_resize(element, handle, pointer);
        if started {
            self.view.selected = Some(id);
        }
        started
    }

    pub fn pointer_move(&mut self, pointer: Pointer, container: Container) -> Option<ElementId> {
        self.interaction.pointer_move(&mut self.store, pointer, container)
    }

    pub fn pointer_up(&mut self) -> Option<ElementId> {
        self.interaction.pointer_up()
    }

    /// Font files the next save will ask the source for
    pub fn required_font_urls(&self, catalog: &FontCatalog) -> Vec<String> {
        required_font_urls(self.store.elements(), catalog)
    }

    /// Flatten the overlay into a new document. The session is left as is.
    pub fn save(
        &self,
        catalog: &FontCatalog,
        source: &dyn FontSource,
    ) -> Result<FlattenOutput, PdfSuiteError> {
        flatten_elements(&self.bytes, self.store.elements(), catalog, source)
    }

    pub fn output_name(&self) -> String {
        output_file_name(OutputKind::Edited, &self.name)
    }
}
