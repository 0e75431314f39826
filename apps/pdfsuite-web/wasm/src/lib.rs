//! WASM bindings for the pdfsuite browser front-end
//!
//! Editor state lives in Rust behind `EditorSession`; JavaScript renders
//! pages, forwards pointer events and downloads font files on request.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { EditorSession } from './pkg/pdfsuite_wasm.js';
//!
//! await init();
//!
//! const editor = new EditorSession("form.pdf", bytes);
//! const id = editor.addRectangle();
//! editor.pointerDownElement(id, ev.clientX, ev.clientY);
//! editor.pointerMove(ev.clientX, ev.clientY, page.clientWidth, page.clientHeight);
//! editor.pointerUp();
//!
//! for (const url of editor.requiredFontUrls()) {
//!     const font = new Uint8Array(await (await fetch(url)).arrayBuffer());
//!     editor.provideFont(url, font);
//! }
//! const edited = editor.save();
//! downloadBlob(edited, editor.outputName());
//! ```

pub mod editor;
pub mod tools;

use wasm_bindgen::prelude::*;

pub use editor::EditorSession;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdfsuite_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Validate a page selection against a page count.
/// Returns 1-based page numbers.
#[wasm_bindgen(js_name = parsePageSelection)]
pub fn parse_page_selection(input: &str, page_count: u32) -> Result<Vec<u32>, JsValue> {
    parse_selection(input, page_count).map_err(|e| JsValue::from_str(&e))
}

fn parse_selection(input: &str, page_count: u32) -> Result<Vec<u32>, String> {
    pdfsuite_core::parse_page_selection(input, page_count)
        .map(|pages| pages.into_iter().map(|idx| idx as u32 + 1).collect())
        .map_err(|e| e.to_string())
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        assert!(!get_version().is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(2621440), "2.5 MB");
    }

    #[test]
    fn test_parse_selection_is_one_based() {
        assert_eq!(parse_selection("1,3-5,8", 10).unwrap(), vec![1, 3, 4, 5, 8]);
        assert!(parse_selection("20-30", 10).is_err());
    }
}
