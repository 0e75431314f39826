//! External font embedding as a WinAnsi simple font
//!
//! Text is written as single-byte WinAnsi codes, so the embedded font carries a
//! `Widths` array for codes 32..=255 measured from the font's own advances.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use ttf_parser::Face;

use crate::error::PdfSuiteError;

pub const FIRST_CHAR: u8 = 32;
pub const LAST_CHAR: u8 = 255;

/// WinAnsi codes 0x80..=0x9F that differ from Latin-1
#[rustfmt::skip]
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// Unicode character for a WinAnsi code
pub fn win_ansi_char(code: u8) -> Option<char> {
    match code {
        32..=126 | 160..=255 => Some(code as char),
        128..=159 => WIN_ANSI_HIGH[(code - 128) as usize],
        _ => None,
    }
}

/// WinAnsi code for a character; `?` when it has none
pub fn win_ansi_code(ch: char) -> u8 {
    let cp = ch as u32;
    match cp {
        32..=126 | 160..=255 => cp as u8,
        0x09 => b' ',
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|c| *c == Some(ch))
            .map(|idx| 128 + idx as u8)
            .unwrap_or(b'?'),
    }
}

pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_code).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgramKind {
    TrueType,
    OpenTypeCff,
}

fn program_kind(data: &[u8]) -> Result<ProgramKind, PdfSuiteError> {
    match data.get(..4) {
        Some(b"wOFF") | Some(b"wOF2") => Err(PdfSuiteError::FontError(
            "WOFF containers are not supported, provide a TTF or OTF file".to_string(),
        )),
        Some(b"OTTO") => Ok(ProgramKind::OpenTypeCff),
        Some(_) => Ok(ProgramKind::TrueType),
        None => Err(PdfSuiteError::FontError("Font data is empty".to_string())),
    }
}

/// Embedded font object plus the widths needed to measure text
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    pub id: ObjectId,
    /// Advances for codes FIRST_CHAR..=LAST_CHAR in 1/1000 em
    pub widths: Vec<u16>,
}

impl EmbeddedFont {
    pub fn width(&self, code: u8) -> u16 {
        if code < FIRST_CHAR {
            return 0;
        }
        self.widths
            .get((code - FIRST_CHAR) as usize)
            .copied()
            .unwrap_or(0)
    }
}

/// Strip characters not allowed in a PDF name
pub fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

/// Parse a TrueType/OpenType file and add Font, FontDescriptor and font
/// program objects to `doc`.
pub fn embed_font(
    doc: &mut Document,
    data: &[u8],
    base_name: &str,
) -> Result<EmbeddedFont, PdfSuiteError> {
    let kind = program_kind(data)?;
    let face = Face::parse(data, 0)
        .map_err(|e| PdfSuiteError::FontError(format!("Failed to parse font: {}", e)))?;

    let units_per_em = face.units_per_em().max(1) as f64;
    let scale = |v: f64| (v * 1000.0 / units_per_em).round() as i64;

    let notdef_advance = face
        .glyph_hor_advance(ttf_parser::GlyphId(0))
        .unwrap_or(0) as f64;
    let widths: Vec<u16> = (FIRST_CHAR..=LAST_CHAR)
        .map(|code| {
            let advance = win_ansi_char(code)
                .and_then(|ch| face.glyph_index(ch))
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map(|adv| adv as f64)
                .unwrap_or(notdef_advance);
            scale(advance).clamp(0, u16::MAX as i64) as u16
        })
        .collect();

    let bbox = face.global_bounding_box();
    let ascent = scale(face.ascender() as f64);
    let descent = scale(face.descender() as f64);
    let cap_height = face
        .capital_height()
        .map(|h| scale(h as f64))
        .unwrap_or((ascent as f64 * 0.7) as i64);

    // Nonsymbolic, optionally fixed pitch and italic
    let mut flags: i64 = 32;
    if face.is_monospaced() {
        flags |= 1;
    }
    if face.is_italic() {
        flags |= 64;
    }
    let italic_angle: i64 = if face.is_italic() { -12 } else { 0 };
    let stem_v: i64 = if face.is_bold() { 120 } else { 80 };

    let name = sanitize_font_name(base_name);

    let (file_key, font_subtype, file_stream) = match kind {
        ProgramKind::TrueType => (
            "FontFile2",
            "TrueType",
            Stream::new(
                dictionary! { "Length1" => data.len() as i64 },
                data.to_vec(),
            ),
        ),
        ProgramKind::OpenTypeCff => (
            "FontFile3",
            "Type1",
            Stream::new(dictionary! { "Subtype" => "OpenType" }, data.to_vec()),
        ),
    };
    let file_id = doc.add_object(file_stream);

    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(name.clone().into_bytes()),
        "Flags" => flags,
        "FontBBox" => vec![
            scale(bbox.x_min as f64).into(),
            scale(bbox.y_min as f64).into(),
            scale(bbox.x_max as f64).into(),
            scale(bbox.y_max as f64).into(),
        ],
        "ItalicAngle" => italic_angle,
        "Ascent" => ascent,
        "Descent" => descent,
        "CapHeight" => cap_height,
        "StemV" => stem_v,
        "MissingWidth" => scale(notdef_advance),
        file_key => file_id,
    });

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => font_subtype,
        "BaseFont" => Object::Name(name.into_bytes()),
        "FirstChar" => FIRST_CHAR as i64,
        "LastChar" => LAST_CHAR as i64,
        "Widths" => widths.iter().map(|w| Object::Integer(*w as i64)).collect::<Vec<_>>(),
        "FontDescriptor" => descriptor_id,
        "Encoding" => "WinAnsiEncoding",
    });

    Ok(EmbeddedFont {
        id: font_id,
        widths,
    })
}
