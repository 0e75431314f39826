//! Font catalog, per-pass font cache and text measurement
//!
//! A save pass resolves each `(family, bold, italic)` combination at most once.
//! Standard 14 families are referenced by name and never fetched. External
//! families are fetched through a [`FontSource`] and embedded as TrueType or
//! OpenType simple fonts. Any failure degrades to Helvetica so the pass can
//! always finish.

pub mod embed;
pub mod standard;

use std::collections::{BTreeSet, HashMap};

use lopdf::{dictionary, Document, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::elements::{ElementKind, OverlayElement};
use crate::error::PdfSuiteError;

pub use embed::{encode_win_ansi, EmbeddedFont};
pub use standard::{StandardFamily, StandardFont};

/// URLs for the four faces of an external family
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontUrls {
    pub regular: String,
    #[serde(default)]
    pub bold: Option<String>,
    #[serde(default)]
    pub italic: Option<String>,
    #[serde(default)]
    pub bold_italic: Option<String>,
}

impl FontUrls {
    /// URL for the requested face, falling back to the nearest available one
    pub fn select(&self, bold: bool, italic: bool) -> &str {
        let pick = match (bold, italic) {
            (true, true) => self
                .bold_italic
                .as_ref()
                .or(self.bold.as_ref())
                .or(self.italic.as_ref()),
            (true, false) => self.bold.as_ref(),
            (false, true) => self.italic.as_ref(),
            (false, false) => None,
        };
        pick.map(String::as_str).unwrap_or(&self.regular)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FontKind {
    Standard { family: StandardFamily },
    External { urls: FontUrls },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontDefinition {
    /// Display name
    pub name: String,
    /// Value stored in `TextStyle::font_family`
    pub value: String,
    #[serde(flatten)]
    pub kind: FontKind,
}

impl FontDefinition {
    pub fn standard(name: &str, family: StandardFamily) -> Self {
        Self {
            name: name.to_string(),
            value: name.to_string(),
            kind: FontKind::Standard { family },
        }
    }

    pub fn external(name: &str, urls: FontUrls) -> Self {
        Self {
            name: name.to_string(),
            value: name.to_string(),
            kind: FontKind::External { urls },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontCatalog {
    pub fonts: Vec<FontDefinition>,
}

impl Default for FontCatalog {
    fn default() -> Self {
        Self {
            fonts: vec![
                FontDefinition::standard("Helvetica", StandardFamily::Helvetica),
                FontDefinition::standard("Times-Roman", StandardFamily::TimesRoman),
                FontDefinition::standard("Courier", StandardFamily::Courier),
                FontDefinition::external(
                    "Open Sans",
                    FontUrls {
                        regular: "https://github.com/googlefonts/opensans/raw/main/fonts/ttf/OpenSans-Regular.ttf".to_string(),
                        bold: Some("https://github.com/googlefonts/opensans/raw/main/fonts/ttf/OpenSans-Bold.ttf".to_string()),
                        italic: Some("https://github.com/googlefonts/opensans/raw/main/fonts/ttf/OpenSans-Italic.ttf".to_string()),
                        bold_italic: Some("https://github.com/googlefonts/opensans/raw/main/fonts/ttf/OpenSans-BoldItalic.ttf".to_string()),
                    },
                ),
                FontDefinition::external(
                    "Roboto",
                    FontUrls {
                        regular: "https://github.com/googlefonts/roboto/raw/main/src/hinted/Roboto-Regular.ttf".to_string(),
                        bold: Some("https://github.com/googlefonts/roboto/raw/main/src/hinted/Roboto-Bold.ttf".to_string()),
                        italic: Some("https://github.com/googlefonts/roboto/raw/main/src/hinted/Roboto-Italic.ttf".to_string()),
                        bold_italic: Some("https://github.com/googlefonts/roboto/raw/main/src/hinted/Roboto-BoldItalic.ttf".to_string()),
                    },
                ),
            ],
        }
    }
}

impl FontCatalog {
    pub fn from_json(json: &str) -> Result<Self, PdfSuiteError> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| PdfSuiteError::SerializationError(e.to_string()))?;
        if catalog.fonts.is_empty() {
            return Err(PdfSuiteError::FontError(
                "Font catalog has no entries".to_string(),
            ));
        }
        Ok(catalog)
    }

    /// Catalog entry for a family; unknown families map to the first entry
    pub fn resolve(&self, family: &str) -> Option<&FontDefinition> {
        let family = family.trim();
        self.fonts
            .iter()
            .find(|def| {
                def.value.eq_ignore_ascii_case(family) || def.name.eq_ignore_ascii_case(family)
            })
            .or_else(|| self.fonts.first())
    }
}

/// Structured cache key for one resolved face.
///
/// The family is trimmed and lowercased to match how the catalog looks it up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.trim().to_ascii_lowercase(),
            bold,
            italic,
        }
    }
}

/// Where font bytes come from during a pass
pub trait FontSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, PdfSuiteError>;
}

/// Font bytes gathered ahead of a pass (for example by an async prefetch)
#[derive(Debug, Clone, Default)]
pub struct PrefetchedFonts {
    fonts: HashMap<String, Vec<u8>>,
}

impl PrefetchedFonts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, data: Vec<u8>) {
        self.fonts.insert(url.into(), data);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.fonts.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl FontSource for PrefetchedFonts {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, PdfSuiteError> {
        self.fonts
            .get(url)
            .cloned()
            .ok_or_else(|| PdfSuiteError::FontError(format!("Font not available: {}", url)))
    }
}

/// Source that never has anything; every external font falls back
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNetwork;

impl FontSource for NoNetwork {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, PdfSuiteError> {
        Err(PdfSuiteError::FontError(format!(
            "Network access disabled, cannot fetch {}",
            url
        )))
    }
}

/// External font URLs a pass over `elements` will request
pub fn required_font_urls(elements: &[OverlayElement], catalog: &FontCatalog) -> Vec<String> {
    let mut urls = BTreeSet::new();
    for element in elements {
        if let ElementKind::Text { style, .. } = &element.kind {
            if let Some(FontDefinition {
                kind: FontKind::External { urls: face_urls },
                ..
            }) = catalog.resolve(&style.font_family)
            {
                urls.insert(face_urls.select(style.bold, style.italic).to_string());
            }
        }
    }
    urls.into_iter().collect()
}

#[derive(Debug, Clone)]
pub enum FontMetrics {
    Standard(StandardFont),
    Embedded(Vec<u16>),
}

/// A face ready to be referenced from page content
#[derive(Debug, Clone)]
pub struct ResolvedFont {
    pub id: ObjectId,
    pub metrics: FontMetrics,
    /// True when this face stands in for one that failed to load
    pub fallback: bool,
}

impl ResolvedFont {
    pub fn encode(&self, text: &str) -> Vec<u8> {
        encode_win_ansi(text)
    }

    /// Advance width of `text` in points
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u64 = self
            .encode(text)
            .into_iter()
            .map(|code| match &self.metrics {
                FontMetrics::Standard(font) => font.width(code) as u64,
                FontMetrics::Embedded(widths) => code
                    .checked_sub(embed::FIRST_CHAR)
                    .and_then(|idx| widths.get(idx as usize))
                    .copied()
                    .unwrap_or(0) as u64,
            })
            .sum();
        units as f64 / 1000.0 * size
    }
}

/// Per-pass cache mapping [`FontKey`] to an embedded face
pub struct FontCache<'a> {
    catalog: &'a FontCatalog,
    source: &'a dyn FontSource,
    entries: HashMap<FontKey, ResolvedFont>,
    standard_ids: HashMap<&'static str, ObjectId>,
    fetches: usize,
}

impl<'a> FontCache<'a> {
    pub fn new(catalog: &'a FontCatalog, source: &'a dyn FontSource) -> Self {
        Self {
            catalog,
            source,
            entries: HashMap::new(),
            standard_ids: HashMap::new(),
            fetches: 0,
        }
    }

    /// Number of fetches issued so far
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(
        &mut self,
        doc: &mut Document,
        family: &str,
        bold: bool,
        italic: bool,
    ) -> ResolvedFont {
        let key = FontKey::new(family, bold, italic);
        if let Some(font) = self.entries.get(&key) {
            return font.clone();
        }

        let resolved = match self.load(doc, &key) {
            Ok(font) => font,
            Err(e) => {
                warn!(
                    family = %key.family,
                    bold = key.bold,
                    italic = key.italic,
                    "Font unavailable, using Helvetica: {}",
                    e
                );
                let mut fallback = self.standard(doc, StandardFont::helvetica());
                fallback.fallback = true;
                fallback
            }
        };

        self.entries.insert(key, resolved.clone());
        resolved
    }

    fn load(&mut self, doc: &mut Document, key: &FontKey) -> Result<ResolvedFont, PdfSuiteError> {
        let definition = self
            .catalog
            .resolve(&key.family)
            .ok_or_else(|| PdfSuiteError::FontError("Font catalog is empty".to_string()))?;

        match &definition.kind {
            FontKind::Standard { family } => Ok(self.standard(
                doc,
                StandardFont::new(*family, key.bold, key.italic),
            )),
            FontKind::External { urls } => {
                let url = urls.select(key.bold, key.italic);
                self.fetches += 1;
                debug!(url, "Fetching font");
                let data = self.source.fetch(url)?;
                let base_name = face_name(&definition.value, key.bold, key.italic);
                let embedded = embed::embed_font(doc, &data, &base_name)?;
                Ok(ResolvedFont {
                    id: embedded.id,
                    metrics: FontMetrics::Embedded(embedded.widths),
                    fallback: false,
                })
            }
        }
    }

    /// Standard faces share one Font object per pass
    fn standard(&mut self, doc: &mut Document, font: StandardFont) -> ResolvedFont {
        let id = *self.standard_ids.entry(font.base_name()).or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_name(),
                "Encoding" => "WinAnsiEncoding",
            })
        });
        ResolvedFont {
            id,
            metrics: FontMetrics::Standard(font),
            fallback: false,
        }
    }
}

fn face_name(family: &str, bold: bool, italic: bool) -> String {
    let suffix = match (bold, italic) {
        (false, false) => "Regular",
        (true, false) => "Bold",
        (false, true) => "Italic",
        (true, true) => "BoldItalic",
    };
    embed::sanitize_font_name(&format!("{}-{}", family, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElementStore, ElementUpdate};
    use crate::test_support::tiny_true_type_font;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl FontSource for CountingSource {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, PdfSuiteError> {
            self.calls.set(self.calls.get() + 1);
            Err(PdfSuiteError::FontError(format!("offline: {}", url)))
        }
    }

    fn urls() -> FontUrls {
        FontUrls {
            regular: "r.ttf".to_string(),
            bold: Some("b.ttf".to_string()),
            italic: None,
            bold_italic: None,
        }
    }

    #[test]
    fn test_select_exact_and_nearest() {
        let u = urls();
        assert_eq!(u.select(false, false), "r.ttf");
        assert_eq!(u.select(true, false), "b.ttf");
        assert_eq!(u.select(false, true), "r.ttf");
        assert_eq!(u.select(true, true), "b.ttf");
    }

    #[test]
    fn test_bold_italic_prefers_italic_over_regular() {
        let u = FontUrls {
            regular: "r.ttf".to_string(),
            bold: None,
            italic: Some("i.ttf".to_string()),
            bold_italic: None,
        };
        assert_eq!(u.select(true, true), "i.ttf");
    }

    #[test]
    fn test_catalog_resolve_unknown_falls_back_to_first() {
        let catalog = FontCatalog::default();
        assert_eq!(catalog.resolve("Roboto").unwrap().name, "Roboto");
        assert_eq!(catalog.resolve("roboto").unwrap().name, "Roboto");
        assert_eq!(catalog.resolve("Comic Sans").unwrap().name, "Helvetica");
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"{"fonts": [
            {"name": "Serif", "value": "Times-Roman", "kind": "standard", "family": "TimesRoman"},
            {"name": "Inter", "value": "Inter", "kind": "external", "urls": {"regular": "https://x/Inter.ttf"}}
        ]}"#;
        let catalog = FontCatalog::from_json(json).unwrap();
        assert_eq!(catalog.fonts.len(), 2);
        assert!(matches!(
            catalog.resolve("Inter").unwrap().kind,
            FontKind::External { .. }
        ));
        assert!(FontCatalog::from_json(r#"{"fonts": []}"#).is_err());
        assert!(FontCatalog::from_json("nope").is_err());
    }

    #[test]
    fn test_required_font_urls_dedupes_and_skips_standard() {
        let catalog = FontCatalog::default();
        let mut store = ElementStore::new();
        let a = store.add_text(1);
        let b = store.add_text(1);
        let c = store.add_text(2);
        store.add_rectangle(1);
        for id in [a, b] {
            store.update(
                id,
                &ElementUpdate {
                    font_family: Some("Roboto".to_string()),
                    ..Default::default()
                },
            );
        }
        store.update(
            c,
            &ElementUpdate {
                font_family: Some("Roboto".to_string()),
                bold: Some(true),
                ..Default::default()
            },
        );
        store.add_text(1);

        let urls = required_font_urls(store.elements(), &catalog);
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| u.contains("Roboto")));
    }

    #[test]
    fn test_standard_font_never_fetches() {
        let catalog = FontCatalog::default();
        let source = CountingSource {
            calls: Cell::new(0),
        };
        let mut doc = Document::with_version("1.7");
        let mut cache = FontCache::new(&catalog, &source);

        let a = cache.resolve(&mut doc, "Times-Roman", true, false);
        let b = cache.resolve(&mut doc, "Times-Roman", true, false);
        assert_eq!(a.id, b.id);
        assert_eq!(source.calls.get(), 0);
        assert_eq!(cache.fetches(), 0);

        let font = doc.get_dictionary(a.id).unwrap();
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Times-Bold");
    }

    #[test]
    fn test_same_key_fetched_once_and_falls_back() {
        let catalog = FontCatalog::default();
        let source = CountingSource {
            calls: Cell::new(0),
        };
        let mut doc = Document::with_version("1.7");
        let mut cache = FontCache::new(&catalog, &source);

        let first = cache.resolve(&mut doc, "Open Sans", false, false);
        let second = cache.resolve(&mut doc, "Open Sans", false, false);
        assert!(first.fallback);
        assert_eq!(first.id, second.id);
        assert_eq!(source.calls.get(), 1);
        assert_eq!(cache.fetches(), 1);

        // A different style is a different key
        cache.resolve(&mut doc, "Open Sans", true, false);
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_family_case_and_spacing_share_a_key() {
        let catalog = FontCatalog::default();
        let source = CountingSource {
            calls: Cell::new(0),
        };
        let mut doc = Document::with_version("1.7");
        let mut cache = FontCache::new(&catalog, &source);

        let a = cache.resolve(&mut doc, "Open Sans", false, false);
        let b = cache.resolve(&mut doc, "open sans", false, false);
        let c = cache.resolve(&mut doc, " OPEN SANS ", false, false);
        assert_eq!(a.id, b.id);
        assert_eq!(b.id, c.id);
        assert_eq!(source.calls.get(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(FontKey::new(" Open Sans", true, false), FontKey::new("open sans", true, false));
    }

    #[test]
    fn test_external_true_type_is_embedded_once() {
        let catalog = FontCatalog {
            fonts: vec![FontDefinition::external(
                "Tiny",
                FontUrls {
                    regular: "https://fonts.test/Tiny.ttf".to_string(),
                    bold: None,
                    italic: None,
                    bold_italic: None,
                },
            )],
        };
        let mut fonts = PrefetchedFonts::new();
        fonts.insert("https://fonts.test/Tiny.ttf", tiny_true_type_font());

        let mut doc = Document::with_version("1.7");
        let mut cache = FontCache::new(&catalog, &fonts);
        let font = cache.resolve(&mut doc, "Tiny", false, false);
        let again = cache.resolve(&mut doc, "tiny", false, false);
        assert!(!font.fallback);
        assert_eq!(font.id, again.id);
        assert_eq!(cache.fetches(), 1);

        // A=700 B=650 on a 1000 unit em
        assert!((font.text_width("AB", 10.0) - 13.5).abs() < 1e-9);
        // Unmapped characters use the .notdef advance
        assert!((font.text_width("z", 10.0) - 5.0).abs() < 1e-9);

        let dict = doc.get_dictionary(font.id).unwrap();
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"TrueType");
        assert_eq!(dict.get(b"FirstChar").unwrap().as_i64().unwrap(), 32);
        assert_eq!(dict.get(b"LastChar").unwrap().as_i64().unwrap(), 255);
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Tiny-Regular");
        let widths = dict.get(b"Widths").unwrap().as_array().unwrap();
        assert_eq!(widths.len(), 224);
        assert_eq!(widths[0].as_i64().unwrap(), 250);
        assert_eq!(widths[(b'A' - 32) as usize].as_i64().unwrap(), 700);

        let descriptor_id = dict.get(b"FontDescriptor").unwrap().as_reference().unwrap();
        let descriptor = doc.get_dictionary(descriptor_id).unwrap();
        assert_eq!(descriptor.get(b"Ascent").unwrap().as_i64().unwrap(), 800);
        assert_eq!(descriptor.get(b"Descent").unwrap().as_i64().unwrap(), -200);
        assert_eq!(descriptor.get(b"MissingWidth").unwrap().as_i64().unwrap(), 500);
        let file_id = descriptor.get(b"FontFile2").unwrap().as_reference().unwrap();
        let file = doc.get_object(file_id).unwrap().as_stream().unwrap();
        assert_eq!(file.content, tiny_true_type_font());
    }

    #[test]
    fn test_fallback_shares_helvetica_object() {
        let catalog = FontCatalog::default();
        let mut doc = Document::with_version("1.7");
        let mut cache = FontCache::new(&catalog, &NoNetwork);

        let helv = cache.resolve(&mut doc, "Helvetica", false, false);
        let roboto = cache.resolve(&mut doc, "Roboto", false, false);
        assert_eq!(helv.id, roboto.id);
        assert!(roboto.fallback);
        assert!(!helv.fallback);
    }

    #[test]
    fn test_prefetched_garbage_falls_back() {
        let catalog = FontCatalog::default();
        let mut fonts = PrefetchedFonts::new();
        let url = match &catalog.resolve("Roboto").unwrap().kind {
            FontKind::External { urls } => urls.regular.clone(),
            _ => unreachable!(),
        };
        fonts.insert(url.clone(), b"wOF2garbage".to_vec());
        assert!(fonts.contains(&url));

        let mut doc = Document::with_version("1.7");
        let mut cache = FontCache::new(&catalog, &fonts);
        let font = cache.resolve(&mut doc, "Roboto", false, false);
        assert!(font.fallback);
    }

    #[test]
    fn test_text_width_standard() {
        let font = ResolvedFont {
            id: (1, 0),
            metrics: FontMetrics::Standard(StandardFont::helvetica()),
            fallback: false,
        };
        // H=722 e=556 l=222 l=222 o=556 -> 2278 units
        let width = font.text_width("Hello", 10.0);
        assert!((width - 22.78).abs() < 1e-9);
        assert_eq!(font.text_width("", 12.0), 0.0);
    }

    #[test]
    fn test_text_width_embedded() {
        let mut widths = vec![0u16; 224];
        widths[(b'A' - 32) as usize] = 600;
        let font = ResolvedFont {
            id: (1, 0),
            metrics: FontMetrics::Embedded(widths),
            fallback: false,
        };
        assert!((font.text_width("AA", 20.0) - 24.0).abs() < 1e-9);
    }
}
