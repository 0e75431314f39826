//! CSV and spreadsheet to PDF table conversion
//!
//! The first record of each table is its header. Rows are laid out on A4
//! portrait pages in equal-width columns; the header repeats at the top of
//! every page. Spreadsheets render one table per non-empty sheet, each
//! starting on a new page under the sheet name.

use std::io::Cursor;

use calamine::{DataType, Range, Reader};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::Serialize;
use tracing::{debug, warn};

use crate::assemble::{A4_HEIGHT, A4_WIDTH};
use crate::error::PdfSuiteError;
use crate::fonts::embed::encode_win_ansi;
use crate::fonts::standard::StandardFont;

const MM: f64 = 72.0 / 25.4;
const MARGIN: f64 = 14.0 * MM;
const FIRST_PAGE_TOP: f64 = 20.0 * MM;
const TITLE_BASELINE: f64 = 15.0 * MM;
const TITLE_SIZE: f64 = 14.0;
const CSV_FONT_SIZE: f64 = 9.0;
const SHEET_FONT_SIZE: f64 = 8.0;
const CELL_PADDING: f64 = 5.0;
const ELLIPSIS: &str = "...";

const HEADER_FILL: (f32, f32, f32) = (41.0 / 255.0, 128.0 / 255.0, 185.0 / 255.0);
const STRIPE_FILL: (f32, f32, f32) = (245.0 / 255.0, 245.0 / 255.0, 245.0 / 255.0);

#[derive(Debug, Clone, Serialize)]
pub struct ConvertOutput {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub page_count: u32,
    /// Body rows, headers excluded
    pub row_count: usize,
    /// Tables rendered (sheets for a spreadsheet, 1 for CSV)
    pub table_count: usize,
}

/// One table to render, optionally titled
struct TableSection {
    title: Option<String>,
    rows: Vec<Vec<String>>,
}

/// Render CSV bytes as a paginated table
pub fn csv_to_pdf(bytes: &[u8]) -> Result<ConvertOutput, PdfSuiteError> {
    let rows = read_rows(bytes)?;
    if rows.is_empty() {
        return Err(PdfSuiteError::OperationError("CSV file is empty".into()));
    }
    render_tables(&[TableSection { title: None, rows }], CSV_FONT_SIZE)
}

/// Render every non-empty sheet of an XLSX/XLS/ODS workbook as its own table
pub fn xlsx_to_pdf(bytes: &[u8]) -> Result<ConvertOutput, PdfSuiteError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| PdfSuiteError::OperationError(format!("Failed to read spreadsheet: {}", e)))?;

    let mut sections = Vec::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                warn!(sheet = %name, "Skipping unreadable sheet: {}", e);
                continue;
            }
        };
        let rows = sheet_rows(&range);
        if rows.is_empty() {
            debug!(sheet = %name, "Skipping empty sheet");
            continue;
        }
        sections.push(TableSection {
            title: Some(name),
            rows,
        });
    }

    if sections.is_empty() {
        return Err(PdfSuiteError::OperationError(
            "Spreadsheet has no data".into(),
        ));
    }
    render_tables(&sections, SHEET_FONT_SIZE)
}

fn render_tables(sections: &[TableSection], font_size: f64) -> Result<ConvertOutput, PdfSuiteError> {
    let regular = StandardFont::helvetica();
    let bold = StandardFont::new(regular.family, true, false);

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(standard_font_dict(&regular));
    let bold_id = doc.add_object(standard_font_dict(&bold));

    let mut kids = Vec::new();
    let mut row_count = 0;
    for section in sections {
        let Some((header, body)) = section.rows.split_first() else {
            continue;
        };
        row_count += body.len();

        let columns = section.rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let table = Table {
            columns,
            column_width: (A4_WIDTH - 2.0 * MARGIN) / columns as f64,
            font_size,
            regular,
            bold,
        };

        let mut remaining = body;
        let mut top = FIRST_PAGE_TOP;
        let mut title = section.title.as_deref();
        loop {
            let capacity = table.rows_per_page(top);
            let (chunk, rest) = remaining.split_at(capacity.min(remaining.len()));
            let mut operations = Vec::new();
            if let Some(title) = title.take() {
                title_operations(&mut operations, title);
            }
            operations.extend(table.page_operations(header, chunk, top));
            kids.push(Object::Reference(add_page(
                &mut doc,
                pages_id,
                operations,
                regular_id,
                bold_id,
            )?));

            remaining = rest;
            top = MARGIN;
            if remaining.is_empty() {
                break;
            }
        }
        debug!(
            title = section.title.as_deref().unwrap_or(""),
            rows = body.len(),
            columns,
            "Laid out table"
        );
    }

    let page_count = kids.len() as u32;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut data = Vec::new();
    doc.save_to(&mut data)
        .map_err(|e| PdfSuiteError::OperationError(format!("Failed to save PDF: {}", e)))?;

    Ok(ConvertOutput {
        data,
        page_count,
        row_count,
        table_count: sections.len(),
    })
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    operations: Vec<Operation>,
    regular_id: ObjectId,
    bold_id: ObjectId,
) -> Result<ObjectId, PdfSuiteError> {
    let encoded = Content { operations }
        .encode()
        .map_err(|e| PdfSuiteError::OperationError(format!("Failed to encode content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            Object::Real(A4_WIDTH as f32),
            Object::Real(A4_HEIGHT as f32),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        },
    }))
}

fn read_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, PdfSuiteError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| PdfSuiteError::OperationError(format!("Failed to parse CSV file: {}", e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Cell text per row. Columns left of the used range stay as empty cells;
/// trailing empty cells and blank rows are dropped.
fn sheet_rows(range: &Range<DataType>) -> Vec<Vec<String>> {
    let leading = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    range
        .rows()
        .filter_map(|row| {
            let mut cells = vec![String::new(); leading];
            cells.extend(row.iter().map(cell_text));
            while cells.last().is_some_and(|c| c.trim().is_empty()) {
                cells.pop();
            }
            (!cells.is_empty()).then_some(cells)
        })
        .collect()
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        DataType::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        other => other.to_string(),
    }
}

fn standard_font_dict(font: &StandardFont) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_name(),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn title_operations(ops: &mut Vec<Operation>, title: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(b"F1".to_vec()), Object::Real(TITLE_SIZE as f32)],
    ));
    ops.push(rgb("rg", (0.0, 0.0, 0.0)));
    ops.push(Operation::new(
        "Td",
        vec![
            Object::Real(MARGIN as f32),
            Object::Real((A4_HEIGHT - TITLE_BASELINE) as f32),
        ],
    ));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(title), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

struct Table {
    columns: usize,
    column_width: f64,
    font_size: f64,
    regular: StandardFont,
    bold: StandardFont,
}

impl Table {
    fn row_height(&self) -> f64 {
        self.font_size * 1.15 + 2.0 * CELL_PADDING
    }

    /// Body rows that fit below the header when the table starts `top` points down
    fn rows_per_page(&self, top: f64) -> usize {
        let row_height = self.row_height();
        let usable = A4_HEIGHT - top - MARGIN - row_height;
        ((usable / row_height).floor() as usize).max(1)
    }

    fn page_operations(&self, header: &[String], rows: &[Vec<String>], top: f64) -> Vec<Operation> {
        let mut ops = Vec::new();
        let width = self.column_width * self.columns as f64;
        let row_height = self.row_height();
        let mut y = A4_HEIGHT - top - row_height;

        fill_rect(&mut ops, HEADER_FILL, MARGIN, y, width, row_height);
        self.row_text(&mut ops, header, y, "F2", &self.bold, (1.0, 1.0, 1.0));

        for (index, row) in rows.iter().enumerate() {
            y -= row_height;
            if index % 2 == 1 {
                fill_rect(&mut ops, STRIPE_FILL, MARGIN, y, width, row_height);
            }
            self.row_text(&mut ops, row, y, "F1", &self.regular, (0.0, 0.0, 0.0));
        }
        ops
    }

    fn row_text(
        &self,
        ops: &mut Vec<Operation>,
        cells: &[String],
        y: f64,
        font_name: &str,
        font: &StandardFont,
        color: (f32, f32, f32),
    ) {
        let baseline = y + CELL_PADDING + self.font_size * 0.15;
        let available = self.column_width - 2.0 * CELL_PADDING;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font_name.as_bytes().to_vec()), Object::Real(self.font_size as f32)],
        ));
        ops.push(rgb("rg", color));
        for (column, cell) in cells.iter().take(self.columns).enumerate() {
            let encoded = fit_cell(cell, font, self.font_size, available);
            if encoded.is_empty() {
                continue;
            }
            let x = MARGIN + column as f64 * self.column_width + CELL_PADDING;
            ops.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    Object::Real(x as f32),
                    Object::Real(baseline as f32),
                ],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encoded, StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
    }
}

fn fill_rect(ops: &mut Vec<Operation>, color: (f32, f32, f32), x: f64, y: f64, w: f64, h: f64) {
    ops.push(rgb("rg", color));
    ops.push(Operation::new(
        "re",
        vec![
            Object::Real(x as f32),
            Object::Real(y as f32),
            Object::Real(w as f32),
            Object::Real(h as f32),
        ],
    ));
    ops.push(Operation::new("f", vec![]));
}

fn rgb(operator: &str, (r, g, b): (f32, f32, f32)) -> Operation {
    Operation::new(operator, vec![Object::Real(r), Object::Real(g), Object::Real(b)])
}

fn encoded_width(codes: &[u8], font: &StandardFont, size: f64) -> f64 {
    codes.iter().map(|&c| font.width(c) as f64).sum::<f64>() * size / 1000.0
}

/// WinAnsi bytes for `cell`, cut and suffixed with "..." when too wide
fn fit_cell(cell: &str, font: &StandardFont, size: f64, available: f64) -> Vec<u8> {
    let flat = cell.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut codes = encode_win_ansi(&flat);
    if encoded_width(&codes, font, size) <= available {
        return codes;
    }

    let suffix = ELLIPSIS.as_bytes();
    let suffix_width = encoded_width(suffix, font, size);
    while !codes.is_empty() && encoded_width(&codes, font, size) + suffix_width > available {
        codes.pop();
    }
    if suffix_width > available {
        return codes;
    }
    codes.extend_from_slice(suffix);
    codes
}
