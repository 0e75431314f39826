//! Standard 14 fonts and their advance widths
//!
//! Widths are in 1/1000 em for WinAnsi codes 32..=126, taken from the Adobe
//! core AFM files. Oblique and italic faces share the upright widths.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StandardFamily {
    Helvetica,
    TimesRoman,
    Courier,
}

impl StandardFamily {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "helvetica" | "arial" | "sans-serif" => Some(Self::Helvetica),
            "times-roman" | "times" | "times-new-roman" | "serif" => Some(Self::TimesRoman),
            "courier" | "courier-new" | "monospace" => Some(Self::Courier),
            _ => None,
        }
    }
}

/// One of the twelve Latin standard 14 faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StandardFont {
    pub family: StandardFamily,
    pub bold: bool,
    pub italic: bool,
}

impl StandardFont {
    pub fn new(family: StandardFamily, bold: bool, italic: bool) -> Self {
        Self {
            family,
            bold,
            italic,
        }
    }

    pub fn helvetica() -> Self {
        Self::new(StandardFamily::Helvetica, false, false)
    }

    /// PDF BaseFont name
    pub fn base_name(&self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (StandardFamily::Helvetica, false, false) => "Helvetica",
            (StandardFamily::Helvetica, true, false) => "Helvetica-Bold",
            (StandardFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (StandardFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (StandardFamily::TimesRoman, false, false) => "Times-Roman",
            (StandardFamily::TimesRoman, true, false) => "Times-Bold",
            (StandardFamily::TimesRoman, false, true) => "Times-Italic",
            (StandardFamily::TimesRoman, true, true) => "Times-BoldItalic",
            (StandardFamily::Courier, false, false) => "Courier",
            (StandardFamily::Courier, true, false) => "Courier-Bold",
            (StandardFamily::Courier, false, true) => "Courier-Oblique",
            (StandardFamily::Courier, true, true) => "Courier-BoldOblique",
        }
    }

    /// Advance width of a WinAnsi code in 1/1000 em
    pub fn width(&self, code: u8) -> u16 {
        let table = match (self.family, self.bold) {
            (StandardFamily::Courier, _) => return 600,
            (StandardFamily::Helvetica, false) => &HELVETICA,
            (StandardFamily::Helvetica, true) => &HELVETICA_BOLD,
            (StandardFamily::TimesRoman, false) => &TIMES_ROMAN,
            (StandardFamily::TimesRoman, true) => &TIMES_BOLD,
        };
        match code {
            32..=126 => table[(code - 32) as usize],
            _ => self.default_width(),
        }
    }

    fn default_width(&self) -> u16 {
        match self.family {
            StandardFamily::Helvetica => 556,
            StandardFamily::TimesRoman => 500,
            StandardFamily::Courier => 600,
        }
    }
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];
