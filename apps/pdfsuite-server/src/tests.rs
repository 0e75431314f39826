//! Endpoint tests for the pdfsuite server
//!
//! The chat model is replaced with in-process generators. Fixture documents
//! are produced by the core crate's own conversions.

#[cfg(test)]
mod api_tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum_test::TestServer;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use lopdf::Document;
    use pdfsuite_core::{csv_to_pdf, merge_documents, FontCatalog};
    use serde_json::{json, Value};

    use crate::error::ServerError;
    use crate::fonts::FontFetcher;
    use crate::gemini::TextGenerator;
    use crate::{router, AppState};

    /// Records prompts and answers with a fixed reply
    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, ServerError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("stub answer".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ServerError> {
            Err(ServerError::Generation("upstream unavailable".into()))
        }
    }

    fn server_with(generator: Arc<dyn TextGenerator>) -> TestServer {
        let state = AppState {
            generator,
            catalog: Arc::new(FontCatalog::default()),
            fonts: FontFetcher::new(),
        };
        TestServer::new(router(state, 10 * 1024 * 1024)).unwrap()
    }

    fn create_test_server() -> TestServer {
        server_with(Arc::new(RecordingGenerator::default()))
    }

    fn one_page_pdf(label: &str) -> Vec<u8> {
        csv_to_pdf(format!("label\n{}\n", label).as_bytes())
            .unwrap()
            .data
    }

    fn pdf_with_pages(count: usize) -> Vec<u8> {
        let docs = (0..count)
            .map(|i| one_page_pdf(&format!("page-{}", i + 1)))
            .collect();
        merge_documents(docs).unwrap()
    }

    fn b64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    fn decode_pdf(json: &Value) -> Document {
        let bytes = STANDARD.decode(json["data"].as_str().unwrap()).unwrap();
        Document::load_mem(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_returns_200() {
        let server = create_test_server();
        let response = server.get("/health").await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "pdfsuite-server");
    }

    #[tokio::test]
    async fn test_chat_prefixes_context() {
        let generator = Arc::new(RecordingGenerator::default());
        let server = server_with(generator.clone());

        let response = server
            .post("/api/chat")
            .json(&json!({"message": "Who signed?", "context": "Signed by Dana"}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["response"], "stub answer");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            "Context from PDF: Signed by Dana\n\nUser Question: Who signed?"
        );
    }

    #[tokio::test]
    async fn test_chat_failure_is_500_with_error() {
        let server = server_with(Arc::new(FailingGenerator));
        let response = server
            .post("/api/chat")
            .json(&json!({"message": "hello"}))
            .await;
        response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let json = response.json::<Value>();
        assert_eq!(json["error"], "upstream unavailable");
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let server = create_test_server();
        let response = server.post("/api/chat").json(&json!({"message": "  "})).await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_info_reports_pages() {
        let server = create_test_server();
        let response = server
            .post("/api/info")
            .json(&json!({"file": b64(&pdf_with_pages(2))}))
            .await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["page_count"], 2);
        let width = json["pages"][0]["width"].as_f64().unwrap();
        assert!((width - 595.28).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_merge_endpoint() {
        let server = create_test_server();
        let response = server
            .post("/api/merge")
            .json(&json!({"files": [b64(&one_page_pdf("a")), b64(&pdf_with_pages(2))]}))
            .await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["success"], true);
        assert_eq!(json["file_name"], "merged-document.pdf");
        assert_eq!(decode_pdf(&json).get_pages().len(), 3);
    }

    #[tokio::test]
    async fn test_merge_rejects_bad_base64() {
        let server = create_test_server();
        let response = server
            .post("/api/merge")
            .json(&json!({"files": ["not base64!"]}))
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_split_endpoint() {
        let server = create_test_server();
        let response = server
            .post("/api/split")
            .json(&json!({
                "file": b64(&pdf_with_pages(5)),
                "file_name": "report.pdf",
                "ranges": "1,3-4"
            }))
            .await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["file_name"], "split-report.pdf");
        assert_eq!(json["metrics"]["page_count"], 3);
        assert_eq!(decode_pdf(&json).get_pages().len(), 3);
    }

    #[tokio::test]
    async fn test_split_empty_selection_is_unprocessable() {
        let server = create_test_server();
        let response = server
            .post("/api/split")
            .json(&json!({"file": b64(&pdf_with_pages(2)), "ranges": "7-9"}))
            .await;
        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        let json = response.json::<Value>();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("No pages selected"));
    }

    #[tokio::test]
    async fn test_compress_endpoint_reports_sizes() {
        let server = create_test_server();
        let pdf = pdf_with_pages(2);
        let response = server
            .post("/api/compress")
            .json(&json!({"file": b64(&pdf), "file_name": "big.pdf"}))
            .await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["file_name"], "compressed-big.pdf");
        assert_eq!(json["details"]["original_size"], pdf.len());
    }

    #[tokio::test]
    async fn test_csv_endpoint_names_output() {
        let server = create_test_server();
        let response = server
            .post("/api/csv-to-pdf")
            .json(&json!({"file": b64(b"city,pop\nLima,10\n"), "file_name": "cities.CSV"}))
            .await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["file_name"], "cities.pdf");
        assert_eq!(json["details"]["rows"], 1);
    }

    #[tokio::test]
    async fn test_csv_endpoint_rejects_empty_file() {
        let server = create_test_server();
        let response = server
            .post("/api/csv-to-pdf")
            .json(&json!({"file": "", "file_name": "empty.csv"}))
            .await;
        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.json::<Value>()["error"]
            .as_str()
            .unwrap()
            .contains("CSV file is empty"));
    }

    #[tokio::test]
    async fn test_xlsx_endpoint_renders_each_sheet() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        for (name, value) in [("Q1", "north"), ("Q2", "south")] {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name).unwrap();
            sheet.write_string(0, 0, "region").unwrap();
            sheet.write_string(1, 0, value).unwrap();
        }
        let server = create_test_server();
        let response = server
            .post("/api/xlsx-to-pdf")
            .json(&json!({"file": b64(&workbook.save_to_buffer().unwrap()), "file_name": "report.xlsx"}))
            .await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["file_name"], "report.pdf");
        assert_eq!(json["metrics"]["page_count"], 2);
        assert_eq!(json["details"]["sheets"], 2);
        assert_eq!(json["details"]["rows"], 2);
    }

    #[tokio::test]
    async fn test_xlsx_endpoint_rejects_non_spreadsheet() {
        let server = create_test_server();
        let response = server
            .post("/api/xlsx-to-pdf")
            .json(&json!({"file": b64(b"plain text"), "file_name": "notes.xlsx"}))
            .await;
        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.json::<Value>()["error"]
            .as_str()
            .unwrap()
            .contains("Failed to read spreadsheet"));
    }

    #[tokio::test]
    async fn test_images_endpoint_with_no_usable_image() {
        let server = create_test_server();
        let response = server
            .post("/api/images-to-pdf")
            .json(&json!({"images": [{"name": "anim.gif", "data": b64(b"GIF89a....")}]}))
            .await;
        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_edit_drops_out_of_range_elements() {
        let server = create_test_server();
        let response = server
            .post("/api/edit")
            .json(&json!({
                "file": b64(&pdf_with_pages(2)),
                "file_name": "form.pdf",
                "elements": [
                    {
                        "id": 1,
                        "page": 1,
                        "position": {"x": 10.0, "y": 10.0},
                        "type": "text",
                        "content": "Approved",
                        "style": {"font_family": "Helvetica", "font_size": 14.0}
                    },
                    {
                        "id": 2,
                        "page": 2,
                        "position": {"x": 30.0, "y": 30.0},
                        "type": "rectangle",
                        "size": {"width": 20.0, "height": 10.0},
                        "fill": "#ff0000"
                    },
                    {
                        "id": 3,
                        "page": 9,
                        "position": {"x": 0.0, "y": 0.0},
                        "type": "rectangle",
                        "size": {"width": 5.0, "height": 5.0},
                        "fill": "#000000"
                    }
                ]
            }))
            .await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["file_name"], "edited-form.pdf");
        assert_eq!(json["details"]["drawn"], 2);
        assert_eq!(json["details"]["skipped"][0]["id"], 3);
        assert_eq!(json["details"]["skipped"][0]["reason"], "page_out_of_range");
        assert_eq!(decode_pdf(&json).get_pages().len(), 2);
    }

    #[tokio::test]
    async fn test_edit_rejects_unparseable_pdf() {
        let server = create_test_server();
        let response = server
            .post("/api/edit")
            .json(&json!({"file": b64(b"not a pdf"), "elements": []}))
            .await;
        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["code"], "PARSE_ERROR");
    }

    #[tokio::test]
    async fn test_extract_text_endpoint() {
        let server = create_test_server();
        let response = server
            .post("/api/extract-text")
            .json(&json!({"file": b64(&pdf_with_pages(3)), "max_pages": 2}))
            .await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["pages"], 2);
        assert_eq!(json["page_count"], 3);
        assert!(json["text"].as_str().unwrap().contains("page-1"));
    }
}
