//! Single-shot document tools for the browser
//!
//! These run fully client-side on the bytes the page already holds.

use pdfsuite_core::{
    command::{output_file_name, OutputKind},
    compress_document, csv_to_pdf, extract_text, merge_documents, split_selection,
    text::DEFAULT_MAX_PAGES, xlsx_to_pdf,
};
use wasm_bindgen::prelude::*;

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Merge PDFs in array order
#[wasm_bindgen(js_name = mergePdfs)]
pub fn merge_pdfs(files: js_sys::Array) -> Result<Vec<u8>, JsValue> {
    let documents = files
        .iter()
        .map(|file| js_sys::Uint8Array::new(&file).to_vec())
        .collect();
    merge_documents(documents).map_err(js_err)
}

/// Keep the pages named by a selection such as "1,3-5,8"
#[wasm_bindgen(js_name = splitPdf)]
pub fn split_pdf(bytes: &[u8], selection: &str) -> Result<Vec<u8>, JsValue> {
    split_selection(bytes, selection).map_err(js_err)
}

#[wasm_bindgen(js_name = compressPdf)]
pub fn compress_pdf(bytes: &[u8]) -> Result<Vec<u8>, JsValue> {
    compress_document(bytes).map(|r| r.data).map_err(js_err)
}

#[wasm_bindgen(js_name = csvToPdf)]
pub fn csv_to_pdf_bytes(bytes: &[u8]) -> Result<Vec<u8>, JsValue> {
    csv_to_pdf(bytes).map(|o| o.data).map_err(js_err)
}

/// One table per non-empty sheet, each on its own page
#[wasm_bindgen(js_name = xlsxToPdf)]
pub fn xlsx_to_pdf_bytes(bytes: &[u8]) -> Result<Vec<u8>, JsValue> {
    xlsx_to_pdf(bytes).map(|o| o.data).map_err(js_err)
}

/// Text of the first pages, one line per page, for chat context
#[wasm_bindgen(js_name = extractText)]
pub fn extract_text_js(bytes: &[u8], max_pages: Option<u32>) -> Result<String, JsValue> {
    extract_text(bytes, max_pages.unwrap_or(DEFAULT_MAX_PAGES))
        .map(|t| t.text)
        .map_err(js_err)
}

/// Download name for a tool's output. `kind` is one of
/// edited, split, compressed, merged, images, converted.
#[wasm_bindgen(js_name = outputFileName)]
pub fn output_file_name_js(kind: &str, input_name: &str) -> Option<String> {
    let kind = match kind {
        "edited" => OutputKind::Edited,
        "split" => OutputKind::Split,
        "compressed" => OutputKind::Compressed,
        "merged" => OutputKind::Merged,
        "images" => OutputKind::Images,
        "converted" => OutputKind::Converted,
        _ => return None,
    };
    Some(output_file_name(kind, input_name))
}
