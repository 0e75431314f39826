//! Fixture documents shared by unit tests

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// Letter-size PDF with `num_pages` pages, each showing `<prefix>-Page-<n>`
pub fn create_test_pdf(num_pages: u32, content_prefix: &str) -> Vec<u8> {
    build_pdf(num_pages, content_prefix, [0.0, 0.0, 612.0, 792.0])
}

/// Single page PDF with the given MediaBox
pub fn create_sized_pdf(media_box: [f64; 4]) -> Vec<u8> {
    build_pdf(1, "Sized", media_box)
}

fn build_pdf(num_pages: u32, content_prefix: &str, media_box: [f64; 4]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut page_ids = Vec::new();
    for page_num in 0..num_pages {
        let content = format!(
            "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET",
            content_prefix,
            page_num + 1
        );
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set(
            "MediaBox",
            Object::Array(media_box.iter().map(|v| Object::Real(*v as f32)).collect()),
        );

        let page_id = doc.add_object(Object::Dictionary(page_dict));
        page_ids.push(Object::Reference(page_id));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(num_pages as i64));
    pages_dict.set("Kids", Object::Array(page_ids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    doc.objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Minimal TrueType font: `.notdef` (500), `A` (700), `B` (650) and space
/// (250) on a 1000 unit em. Only the tables a face needs for metrics and
/// character mapping are present.
pub fn tiny_true_type_font() -> Vec<u8> {
    fn be16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_be_bytes());
    }
    fn be32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    let mut cmap = Vec::new();
    for v in [0, 1, 3, 1] {
        be16(&mut cmap, v);
    }
    be32(&mut cmap, 12);
    // Format 4 with segments for space, A-B and the terminator
    for v in [4, 40, 0, 6, 4, 1, 2] {
        be16(&mut cmap, v);
    }
    for v in [32, 66, 0xFFFF, 0, 32, 65, 0xFFFF] {
        be16(&mut cmap, v);
    }
    for delta in [3i16 - 32, 1 - 65, 1] {
        be16(&mut cmap, delta as u16);
    }
    for _ in 0..3 {
        be16(&mut cmap, 0);
    }

    let mut head = Vec::new();
    for v in [0x0001_0000, 0x0001_0000, 0, 0x5F0F_3CF5] {
        be32(&mut head, v);
    }
    be16(&mut head, 0);
    be16(&mut head, 1000);
    head.extend_from_slice(&[0; 16]);
    for v in [0i16, -200, 800, 800] {
        be16(&mut head, v as u16);
    }
    for v in [0, 8, 2, 0, 0] {
        be16(&mut head, v);
    }

    let mut hhea = Vec::new();
    be32(&mut hhea, 0x0001_0000);
    for v in [800i16, -200, 0, 700, 0, 0, 700, 1, 0, 0, 0, 0, 0, 0, 0] {
        be16(&mut hhea, v as u16);
    }
    be16(&mut hhea, 4);

    let mut hmtx = Vec::new();
    for advance in [500, 700, 650, 250] {
        be16(&mut hmtx, advance);
        be16(&mut hmtx, 0);
    }

    let mut maxp = Vec::new();
    be32(&mut maxp, 0x0000_5000);
    be16(&mut maxp, 4);

    // Table records must be sorted by tag
    let tables: [(&[u8; 4], Vec<u8>); 5] = [
        (b"cmap", cmap),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"maxp", maxp),
    ];

    let mut font = Vec::new();
    be32(&mut font, 0x0001_0000);
    for v in [tables.len() as u16, 64, 2, 16] {
        be16(&mut font, v);
    }
    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend_from_slice(*tag);
        be32(&mut font, 0);
        be32(&mut font, offset as u32);
        be32(&mut font, data.len() as u32);
        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    font.extend(body);
    font
}
