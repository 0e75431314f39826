//! Browser editor session
//!
//! Wraps the core `EditorSession` and owns the font bytes the page has
//! downloaded. JavaScript fetches `requiredFontUrls()`, hands each file to
//! `provideFont`, then calls `save`.

use pdfsuite_core::elements::{ElementId, ElementUpdate};
use pdfsuite_core::fonts::{FontCatalog, PrefetchedFonts};
use pdfsuite_core::interaction::{Container, Pointer, ResizeHandle};
use pdfsuite_core::session::{EditorSession as CoreSession, ViewUpdate};
use pdfsuite_core::FlattenReport;
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Editing state for one document
#[wasm_bindgen]
pub struct EditorSession {
    inner: CoreSession,
    catalog: FontCatalog,
    fonts: PrefetchedFonts,
    last_report: Option<FlattenReport>,
}

impl EditorSession {
    fn new_internal(name: &str, bytes: &[u8]) -> Result<Self, String> {
        let inner = CoreSession::new(name, bytes.to_vec()).map_err(|e| e.to_string())?;
        Ok(Self {
            inner,
            catalog: FontCatalog::default(),
            fonts: PrefetchedFonts::new(),
            last_report: None,
        })
    }

    fn set_font_catalog_internal(&mut self, json: &str) -> Result<(), String> {
        self.catalog = FontCatalog::from_json(json).map_err(|e| e.to_string())?;
        Ok(())
    }

    fn update_element_internal(&mut self, id: ElementId, json: &str) -> Result<bool, String> {
        let update: ElementUpdate =
            serde_json::from_str(json).map_err(|e| format!("Invalid update: {}", e))?;
        Ok(self.inner.update_element(id, &update))
    }

    fn update_view_internal(&mut self, json: &str) -> Result<(), String> {
        let update: ViewUpdate =
            serde_json::from_str(json).map_err(|e| format!("Invalid view update: {}", e))?;
        self.inner.update_view(update);
        Ok(())
    }

    fn pointer_down_handle_internal(
        &mut self,
        id: ElementId,
        handle: &str,
        x: f64,
        y: f64,
    ) -> Result<bool, String> {
        let handle: ResizeHandle = handle
            .parse()
            .map_err(|e: pdfsuite_core::PdfSuiteError| e.to_string())?;
        Ok(self.inner.pointer_down_handle(id, handle, Pointer::new(x, y)))
    }

    fn save_internal(&mut self) -> Result<Vec<u8>, String> {
        let output = self
            .inner
            .save(&self.catalog, &self.fonts)
            .map_err(|e| e.to_string())?;
        self.last_report = Some(output.report);
        Ok(output.data)
    }
}

#[wasm_bindgen]
impl EditorSession {
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, bytes: &[u8]) -> Result<EditorSession, JsValue> {
        Self::new_internal(name, bytes).map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> String {
        self.inner.name().to_string()
    }

    /// Original bytes, for the viewer
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.inner.bytes())
    }

    /// Page size in points: `{x0, y0, width, height}`
    #[wasm_bindgen(js_name = getPageSize)]
    pub fn get_page_size(&self, page: u32) -> Result<JsValue, JsValue> {
        let page_box = self
            .inner
            .page_box(page)
            .ok_or_else(|| JsValue::from_str(&format!("Page {} does not exist", page)))?;
        let js = js_sys::Object::new();
        for (key, value) in [
            ("x0", page_box.x0),
            ("y0", page_box.y0),
            ("width", page_box.width),
            ("height", page_box.height),
        ] {
            js_sys::Reflect::set(&js, &JsValue::from_str(key), &JsValue::from_f64(value))?;
        }
        Ok(js.into())
    }

    #[wasm_bindgen(js_name = getElements)]
    pub fn get_elements(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.elements())
    }

    #[wasm_bindgen(js_name = getView)]
    pub fn get_view(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.view())
    }

    /// Merge a JSON `ViewUpdate` into the view
    #[wasm_bindgen(js_name = updateView)]
    pub fn update_view(&mut self, update_json: &str) -> Result<(), JsValue> {
        self.update_view_internal(update_json)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = addText)]
    pub fn add_text(&mut self) -> u64 {
        self.inner.add_text()
    }

    #[wasm_bindgen(js_name = addRectangle)]
    pub fn add_rectangle(&mut self) -> u64 {
        self.inner.add_rectangle()
    }

    /// Add an image from a PNG or JPEG data URI
    #[wasm_bindgen(js_name = addImage)]
    pub fn add_image(&mut self, data_uri: &str) -> u64 {
        self.inner.add_image(data_uri)
    }

    /// Merge a JSON `ElementUpdate` into an element. Returns false for unknown ids.
    #[wasm_bindgen(js_name = updateElement)]
    pub fn update_element(&mut self, id: u64, update_json: &str) -> Result<bool, JsValue> {
        self.update_element_internal(id, update_json)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = removeElement)]
    pub fn remove_element(&mut self, id: u64) -> bool {
        self.inner.remove_element(id)
    }

    #[wasm_bindgen(js_name = pointerDownElement)]
    pub fn pointer_down_element(&mut self, id: u64, x: f64, y: f64) -> bool {
        self.inner.pointer_down_element(id, Pointer::new(x, y))
    }

    /// `handle` is one of n, s, e, w, ne, nw, se, sw
    #[wasm_bindgen(js_name = pointerDownHandle)]
    pub fn pointer_down_handle(
        &mut self,
        id: u64,
        handle: &str,
        x: f64,
        y: f64,
    ) -> Result<bool, JsValue> {
        self.pointer_down_handle_internal(id, handle, x, y)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Returns the id of the element that moved, if any
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(
        &mut self,
        x: f64,
        y: f64,
        container_width: f64,
        container_height: f64,
    ) -> Option<u64> {
        self.inner.pointer_move(
            Pointer::new(x, y),
            Container::new(container_width, container_height),
        )
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) -> Option<u64> {
        self.inner.pointer_up()
    }

    /// Replace the font catalog with a JSON one
    #[wasm_bindgen(js_name = setFontCatalog)]
    pub fn set_font_catalog(&mut self, json: &str) -> Result<(), JsValue> {
        self.set_font_catalog_internal(json)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Font files the next save needs that have not been provided yet
    #[wasm_bindgen(js_name = requiredFontUrls)]
    pub fn required_font_urls(&self) -> Vec<String> {
        self.inner
            .required_font_urls(&self.catalog)
            .into_iter()
            .filter(|url| !self.fonts.contains(url))
            .collect()
    }

    #[wasm_bindgen(js_name = provideFont)]
    pub fn provide_font(&mut self, url: &str, bytes: &[u8]) {
        self.fonts.insert(url, bytes.to_vec());
    }

    /// Flatten the overlay and return the new PDF bytes
    pub fn save(&mut self) -> Result<Vec<u8>, JsValue> {
        self.save_internal().map_err(|e| JsValue::from_str(&e))
    }

    /// Report from the most recent save, or null
    #[wasm_bindgen(js_name = lastReport)]
    pub fn last_report(&self) -> Result<JsValue, JsValue> {
        match &self.last_report {
            Some(report) => to_js(report),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = outputName)]
    pub fn output_name(&self) -> String {
        self.inner.output_name()
    }
}
