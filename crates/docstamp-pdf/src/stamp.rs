//! # First-Page Stamping
//!
//! The stamp is a single line of Helvetica text placed at the horizontal
//! centre of the first page, a fixed distance below its top edge.
//!
//! Existing page content is wrapped in a `q`/`Q` pair so any graphics state
//! it leaves behind cannot displace the stamp. Page resources inherited from
//! the page tree are hoisted onto the page before the stamp font is added.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::StampError;

/// Resource name of the stamp font. Prefixed to avoid clashing with fonts
/// already present in the document.
const FONT_KEY: &str = "DocstampHelv";

/// Fallback page size (A4 portrait, in points) when no MediaBox is found.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 595.0, 842.0];

/// Guard against cyclic `Parent` chains in malformed page trees.
const MAX_TREE_DEPTH: usize = 32;

/// Font size of the stamp text, in points.
const FONT_SIZE: f32 = 16.0;

/// Distance of the stamp baseline below the page's top edge, in points.
const TOP_MARGIN: f64 = 32.0;

/// WinAnsi code points for the characters the encoding places in the
/// 0x80..=0x9F block, where it departs from Latin-1.
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('\u{20AC}', 0x80),
    ('\u{201A}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201E}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8A),
    ('\u{2039}', 0x8B),
    ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9A),
    ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C),
    ('\u{017E}', 0x9E),
    ('\u{0178}', 0x9F),
];

/// Stamps marker text onto PDF documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfStamper;

impl PdfStamper {
    /// Create a stamper.
    pub fn new() -> Self {
        Self
    }

    /// Stamp `text` onto the first page of the PDF in `source`.
    ///
    /// Returns the bytes of a complete new PDF. `source` is not modified.
    pub fn stamp(&self, source: &[u8], text: &str) -> Result<Vec<u8>, StampError> {
        let mut doc =
            Document::load_mem(source).map_err(|e| StampError::Malformed(e.to_string()))?;

        let page_id = doc
            .get_pages()
            .into_iter()
            .next()
            .map(|(_, id)| id)
            .ok_or(StampError::NoPages)?;

        let [x0, _y0, x1, y1] = media_box(&doc, page_id);
        let x = x0 + (x1 - x0) / 2.0;
        let y = y1 - TOP_MARGIN;

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        register_font(&mut doc, page_id, font_id)?;

        let stamp = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(FONT_KEY.as_bytes().to_vec()),
                        Object::Real(FONT_SIZE),
                    ],
                ),
                Operation::new(
                    "rg",
                    vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
                ),
                Operation::new("Td", vec![Object::Real(x as _), Object::Real(y as _)]),
                Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
                Operation::new("ET", vec![]),
            ],
        }
        .encode()
        .map_err(|e| StampError::Encode(e.to_string()))?;

        append_content(&mut doc, page_id, stamp)?;

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| StampError::Encode(e.to_string()))?;
        tracing::debug!(input = source.len(), output = out.len(), "stamped PDF");
        Ok(out)
    }
}

fn structure(e: impl std::fmt::Display) -> StampError {
    StampError::Structure(e.to_string())
}

/// Look up a page attribute, following the page tree's `Parent` chain for
/// inheritable attributes such as `Resources` and `MediaBox`.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let Some(object) = inherited(doc, page_id, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };
    let Ok(items) = resolve(doc, object).as_array() else {
        return DEFAULT_MEDIA_BOX;
    };
    let values: Vec<f64> = items
        .iter()
        .filter_map(|item| number(resolve(doc, item)))
        .collect();
    match values.as_slice() {
        [a, b, c, d] => [a.min(*c), b.min(*d), a.max(*c), b.max(*d)],
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// Make the page own a resources dictionary and add the stamp font to it.
fn register_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> Result<(), StampError> {
    let resources_id = match inherited(doc, page_id, b"Resources").cloned() {
        Some(Object::Reference(id)) => id,
        Some(Object::Dictionary(dict)) => doc.add_object(dict),
        _ => doc.add_object(Dictionary::new()),
    };
    doc.get_dictionary_mut(page_id)
        .map_err(structure)?
        .set("Resources", resources_id);

    let fonts_ref = {
        let resources = doc.get_dictionary(resources_id).map_err(structure)?;
        resources
            .get(b"Font")
            .ok()
            .and_then(|fonts| fonts.as_reference().ok())
    };

    match fonts_ref {
        Some(fonts_id) => {
            doc.get_dictionary_mut(fonts_id)
                .map_err(structure)?
                .set(FONT_KEY, font_id);
        }
        None => {
            let resources = doc.get_dictionary_mut(resources_id).map_err(structure)?;
            let mut fonts = resources
                .get(b"Font")
                .and_then(Object::as_dict)
                .cloned()
                .unwrap_or_else(|_| Dictionary::new());
            fonts.set(FONT_KEY, font_id);
            resources.set("Font", fonts);
        }
    }
    Ok(())
}

/// Append the stamp after the page's existing content streams, isolating
/// the existing content in its own graphics state.
fn append_content(doc: &mut Document, page_id: ObjectId, stamp: Vec<u8>) -> Result<(), StampError> {
    let existing: Vec<Object> = match doc.get_dictionary(page_id).map_err(structure)?.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut restore_and_stamp = b"\nQ\n".to_vec();
    restore_and_stamp.extend(stamp);
    let stamp_id = doc.add_object(Stream::new(Dictionary::new(), restore_and_stamp));

    let mut contents: Vec<Object> = Vec::with_capacity(existing.len() + 2);
    contents.push(save_id.into());
    contents.extend(existing);
    contents.push(stamp_id.into());

    doc.get_dictionary_mut(page_id)
        .map_err(structure)?
        .set("Contents", contents);
    Ok(())
}

/// Encode text for a WinAnsi-encoded Type1 font. Characters the encoding
/// cannot represent, control characters included, become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| win_ansi_byte(c).unwrap_or(b'?')).collect()
}

fn win_ansi_byte(c: char) -> Option<u8> {
    match u32::from(c) {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => u8::try_from(code).ok(),
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(ch, _)| *ch == c)
            .map(|(_, byte)| *byte),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a one-page PDF whose MediaBox and Resources live on the page
    /// tree root, so the stamper must follow inheritance.
    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let body_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal("Agenda item")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => body_font },
            },
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn first_page(doc: &Document) -> ObjectId {
        *doc.get_pages().values().next().unwrap()
    }

    fn show_text_operands(doc: &Document) -> Vec<Vec<u8>> {
        let bytes = doc.get_page_content(first_page(doc)).unwrap();
        Content::decode(&bytes)
            .unwrap()
            .operations
            .into_iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(s, _)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn stamp_adds_marker_text_to_first_page() {
        let stamped = PdfStamper::new().stamp(&sample_pdf(), "VR 2024 DOC.0001/1").unwrap();
        let doc = Document::load_mem(&stamped).unwrap();
        let texts = show_text_operands(&doc);
        assert!(texts.contains(&b"Agenda item".to_vec()), "existing text kept");
        assert!(texts.contains(&b"VR 2024 DOC.0001/1".to_vec()), "marker added");
    }

    #[test]
    fn stamp_keeps_inherited_fonts_and_adds_stamp_font() {
        let stamped = PdfStamper::new().stamp(&sample_pdf(), "marker").unwrap();
        let doc = Document::load_mem(&stamped).unwrap();
        let page = doc.get_dictionary(first_page(&doc)).unwrap();
        let resources = resolve(&doc, page.get(b"Resources").unwrap()).as_dict().unwrap();
        let fonts = resolve(&doc, resources.get(b"Font").unwrap()).as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(FONT_KEY.as_bytes()));
    }

    #[test]
    fn stamp_is_placed_relative_to_media_box() {
        let stamped = PdfStamper::new().stamp(&sample_pdf(), "m").unwrap();
        let doc = Document::load_mem(&stamped).unwrap();
        let bytes = doc.get_page_content(first_page(&doc)).unwrap();
        let ops = Content::decode(&bytes).unwrap().operations;
        let last_td = ops.iter().rev().find(|op| op.operator == "Td").unwrap();
        let coords: Vec<f64> = last_td.operands.iter().filter_map(number).collect();
        assert_eq!(coords, vec![306.0, 760.0]);
    }

    #[test]
    fn stamping_is_deterministic_in_text() {
        let stamper = PdfStamper::new();
        let once = stamper.stamp(&sample_pdf(), "same").unwrap();
        let again = stamper.stamp(&sample_pdf(), "same").unwrap();
        let a = show_text_operands(&Document::load_mem(&once).unwrap());
        let b = show_text_operands(&Document::load_mem(&again).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn garbage_input_is_malformed() {
        let err = PdfStamper::new().stamp(b"definitely not a pdf", "x").unwrap_err();
        assert!(matches!(err, StampError::Malformed(_)));
    }

    #[test]
    fn non_latin_characters_are_replaced() {
        assert_eq!(encode_win_ansi("Nota é ✓"), b"Nota \xe9 ?".to_vec());
    }

    #[test]
    fn win_ansi_punctuation_uses_its_own_code_points() {
        assert_eq!(
            encode_win_ansi("\u{201C}Nota\u{201D} \u{2013} 5\u{20AC}\u{2026}"),
            b"\x93Nota\x94 \x96 5\x80\x85".to_vec()
        );
    }

    #[test]
    fn c1_controls_are_not_passed_through() {
        assert_eq!(encode_win_ansi("a\u{0096}b\u{0080}"), b"a?b?".to_vec());
    }
}
