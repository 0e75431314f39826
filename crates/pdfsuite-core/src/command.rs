//! Single-pass document commands and their output naming

use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::assemble::{images_to_pdf, ImageInput};
use crate::compress::compress_document;
use crate::convert::{csv_to_pdf, xlsx_to_pdf};
use crate::error::PdfSuiteError;
use crate::merge::merge_documents;
use crate::pages::get_page_count;
use crate::split::split_selection;

const DEFAULT_NAME: &str = "document.pdf";
const CONVERTED_SUFFIXES: [&str; 3] = [".csv", ".xlsx", ".xls"];

/// What produced an output file, which decides its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Edited,
    Split,
    Compressed,
    Merged,
    Images,
    Converted,
}

/// Download name for an output derived from `input_name`
pub fn output_file_name(kind: OutputKind, input_name: &str) -> String {
    let name = input_name.trim();
    let name = if name.is_empty() { DEFAULT_NAME } else { name };
    match kind {
        OutputKind::Edited => format!("edited-{}", name),
        OutputKind::Split => format!("split-{}", name),
        OutputKind::Compressed => format!("compressed-{}", name),
        OutputKind::Merged => "merged-document.pdf".to_string(),
        OutputKind::Images => "images.pdf".to_string(),
        OutputKind::Converted => {
            let stem = CONVERTED_SUFFIXES
                .iter()
                .find_map(|suffix| strip_suffix_ignore_case(name, suffix))
                .unwrap_or(name);
            format!("{}.pdf", stem)
        }
    }
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = name.len().checked_sub(suffix.len())?;
    (name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(suffix)).then(|| &name[..cut])
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PdfCommand {
    Merge {
        files: Vec<Vec<u8>>,
    },
    Split {
        file: Vec<u8>,
        #[serde(default)]
        file_name: String,
        /// Selection such as "1,3-5,8"
        ranges: String,
    },
    Compress {
        file: Vec<u8>,
        #[serde(default)]
        file_name: String,
    },
    ImagesToPdf {
        images: Vec<ImageInput>,
    },
    CsvToPdf {
        file: Vec<u8>,
        #[serde(default)]
        file_name: String,
    },
    XlsxToPdf {
        file: Vec<u8>,
        #[serde(default)]
        file_name: String,
    },
}

impl PdfCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PdfCommand::Merge { .. } => "merge",
            PdfCommand::Split { .. } => "split",
            PdfCommand::Compress { .. } => "compress",
            PdfCommand::ImagesToPdf { .. } => "images_to_pdf",
            PdfCommand::CsvToPdf { .. } => "csv_to_pdf",
            PdfCommand::XlsxToPdf { .. } => "xlsx_to_pdf",
        }
    }

    fn input_size(&self) -> usize {
        match self {
            PdfCommand::Merge { files } => files.iter().map(Vec::len).sum(),
            PdfCommand::Split { file, .. }
            | PdfCommand::Compress { file, .. }
            | PdfCommand::CsvToPdf { file, .. }
            | PdfCommand::XlsxToPdf { file, .. } => file.len(),
            PdfCommand::ImagesToPdf { images } => images.iter().map(|i| i.data.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    /// Base64-encoded PDF data
    pub data: Option<String>,
    pub file_name: Option<String>,
    pub error: Option<String>,
    pub metrics: Option<ProcessMetrics>,
    /// Command-specific extras (compression stats, skipped inputs, flatten report)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ProcessResult {
    pub fn ok(
        data: &[u8],
        file_name: String,
        metrics: ProcessMetrics,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            success: true,
            data: Some(STANDARD.encode(data)),
            file_name: Some(file_name),
            error: None,
            metrics: Some(metrics),
            details,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            file_name: None,
            error: Some(error.into()),
            metrics: None,
            details: None,
        }
    }

    /// Decode the base64 payload
    pub fn decoded_data(&self) -> Option<Vec<u8>> {
        self.data.as_ref().and_then(|d| STANDARD.decode(d).ok())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    pub processing_time_ms: u64,
}

struct CommandOutput {
    data: Vec<u8>,
    file_name: String,
    page_count: u32,
    details: Option<serde_json::Value>,
}

/// Run a command to completion. Failures are reported in the result.
pub fn execute(command: PdfCommand) -> ProcessResult {
    let started = Instant::now();
    let name = command.name();
    let input_size_bytes = command.input_size();

    match run(command) {
        Ok(output) => {
            let metrics = ProcessMetrics {
                input_size_bytes,
                output_size_bytes: output.data.len(),
                page_count: output.page_count,
                processing_time_ms: started.elapsed().as_millis() as u64,
            };
            info!(
                command = name,
                input_size_bytes,
                output_size_bytes = metrics.output_size_bytes,
                page_count = metrics.page_count,
                "Command finished"
            );
            ProcessResult::ok(&output.data, output.file_name, metrics, output.details)
        }
        Err(e) => {
            warn!(command = name, "Command failed: {}", e);
            ProcessResult::failed(e.to_string())
        }
    }
}

fn run(command: PdfCommand) -> Result<CommandOutput, PdfSuiteError> {
    match command {
        PdfCommand::Merge { files } => {
            let data = merge_documents(files)?;
            Ok(CommandOutput {
                page_count: get_page_count(&data)?,
                data,
                file_name: output_file_name(OutputKind::Merged, ""),
                details: None,
            })
        }
        PdfCommand::Split {
            file,
            file_name,
            ranges,
        } => {
            let data = split_selection(&file, &ranges)?;
            Ok(CommandOutput {
                page_count: get_page_count(&data)?,
                data,
                file_name: output_file_name(OutputKind::Split, &file_name),
                details: None,
            })
        }
        PdfCommand::Compress { file, file_name } => {
            let result = compress_document(&file)?;
            let details = json!({
                "original_size": result.original_size,
                "compressed_size": result.compressed_size,
                "saved_bytes": result.saved_bytes,
                "saved_percent": result.saved_percent(),
            });
            Ok(CommandOutput {
                page_count: get_page_count(&result.data)?,
                data: result.data,
                file_name: output_file_name(OutputKind::Compressed, &file_name),
                details: Some(details),
            })
        }
        PdfCommand::ImagesToPdf { images } => {
            let output = images_to_pdf(&images)?;
            Ok(CommandOutput {
                data: output.data,
                file_name: output_file_name(OutputKind::Images, ""),
                page_count: output.page_count,
                details: Some(json!({ "skipped": output.skipped })),
            })
        }
        PdfCommand::CsvToPdf { file, file_name } => {
            let output = csv_to_pdf(&file)?;
            Ok(CommandOutput {
                data: output.data,
                file_name: output_file_name(OutputKind::Converted, &file_name),
                page_count: output.page_count,
                details: Some(json!({ "rows": output.row_count })),
            })
        }
        PdfCommand::XlsxToPdf { file, file_name } => {
            let output = xlsx_to_pdf(&file)?;
            Ok(CommandOutput {
                data: output.data,
                file_name: output_file_name(OutputKind::Converted, &file_name),
                page_count: output.page_count,
                details: Some(json!({
                    "rows": output.row_count,
                    "sheets": output.table_count,
                })),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::test_images;
    use crate::test_support::create_test_pdf;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_output_names() {
        assert_eq!(output_file_name(OutputKind::Edited, "a.pdf"), "edited-a.pdf");
        assert_eq!(output_file_name(OutputKind::Split, "a.pdf"), "split-a.pdf");
        assert_eq!(output_file_name(OutputKind::Compressed, "a.pdf"), "compressed-a.pdf");
        assert_eq!(output_file_name(OutputKind::Merged, "a.pdf"), "merged-document.pdf");
        assert_eq!(output_file_name(OutputKind::Images, "x.png"), "images.pdf");
        assert_eq!(output_file_name(OutputKind::Converted, "data.CSV"), "data.pdf");
        assert_eq!(output_file_name(OutputKind::Converted, "notes"), "notes.pdf");
        assert_eq!(output_file_name(OutputKind::Converted, "q3.xlsx"), "q3.pdf");
        assert_eq!(output_file_name(OutputKind::Converted, "legacy.Xls"), "legacy.pdf");
        assert_eq!(output_file_name(OutputKind::Converted, "a.xlsx.csv"), "a.xlsx.pdf");
        assert_eq!(output_file_name(OutputKind::Edited, "  "), "edited-document.pdf");
    }

    #[test]
    fn test_execute_merge() {
        let result = execute(PdfCommand::Merge {
            files: vec![create_test_pdf(1, "A"), create_test_pdf(2, "B")],
        });
        assert!(result.success);
        assert_eq!(result.file_name.as_deref(), Some("merged-document.pdf"));
        let metrics = result.metrics.as_ref().unwrap();
        assert_eq!(metrics.page_count, 3);
        assert_eq!(metrics.output_size_bytes, result.decoded_data().unwrap().len());
    }

    #[test]
    fn test_execute_split_reports_error() {
        let result = execute(PdfCommand::Split {
            file: create_test_pdf(2, "S"),
            file_name: "s.pdf".into(),
            ranges: "5-9".into(),
        });
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("Invalid page range"));
    }

    #[test]
    fn test_execute_compress_has_stats() {
        let result = execute(PdfCommand::Compress {
            file: create_test_pdf(2, "C"),
            file_name: "c.pdf".into(),
        });
        assert!(result.success);
        assert_eq!(result.file_name.as_deref(), Some("compressed-c.pdf"));
        let details = result.details.unwrap();
        assert!(details.get("saved_bytes").is_some());
    }

    #[test]
    fn test_execute_images_lists_skipped() {
        let result = execute(PdfCommand::ImagesToPdf {
            images: vec![
                ImageInput {
                    name: "ok.png".into(),
                    data: test_images::png(4, 4, 255),
                },
                ImageInput {
                    name: "bad.gif".into(),
                    data: b"GIF89a".to_vec(),
                },
            ],
        });
        assert!(result.success);
        assert_eq!(result.metrics.as_ref().unwrap().page_count, 1);
        assert_eq!(result.details.unwrap()["skipped"], json!(["bad.gif"]));
    }

    #[test]
    fn test_execute_csv() {
        let result = execute(PdfCommand::CsvToPdf {
            file: b"a,b\n1,2\n".to_vec(),
            file_name: "table.csv".into(),
        });
        assert!(result.success);
        assert_eq!(result.file_name.as_deref(), Some("table.pdf"));
    }

    #[test]
    fn test_execute_xlsx() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "city").unwrap();
        sheet.write_string(1, 0, "Lagos").unwrap();
        let result = execute(PdfCommand::XlsxToPdf {
            file: workbook.save_to_buffer().unwrap(),
            file_name: "Budget.XLSX".into(),
        });
        assert!(result.success);
        assert_eq!(result.file_name.as_deref(), Some("Budget.pdf"));
        assert_eq!(result.metrics.as_ref().unwrap().page_count, 1);
        let details = result.details.unwrap();
        assert_eq!(details["rows"], json!(1));
        assert_eq!(details["sheets"], json!(1));
    }

    #[test]
    fn test_command_deserializes_merge() {
        let json = r#"{"type":"Merge","files":[]}"#;
        let cmd: PdfCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, PdfCommand::Merge { .. }));
    }

    #[test]
    fn test_command_deserializes_split() {
        let json = r#"{"type":"Split","file":[],"ranges":"1-3,5"}"#;
        let cmd: PdfCommand = serde_json::from_str(json).unwrap();
        match cmd {
            PdfCommand::Split { ranges, file_name, .. } => {
                assert_eq!(ranges, "1-3,5");
                assert_eq!(file_name, "");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
