//! Renders composed pages to PDF bytes with `lopdf`.
//!
//! Text uses the standard Type1 Helvetica faces with WinAnsi encoding, so no
//! fonts are embedded. Images are decoded and embedded as RGB XObjects.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, warn};

use contenize_shared::{ContenizeError, InlineImage, ReportConfig, Result};

use crate::compose::ComposedReport;
use crate::layout::{Element, Rgb};
use crate::metrics::{Font, MM_PER_PT};

fn pt(mm: f32) -> f32 {
    mm / MM_PER_PT
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

fn font_resource(font: Font) -> &'static str {
    match font {
        Font::Regular => "F1",
        Font::Bold => "F2",
        Font::Oblique => "F3",
    }
}

/// Encode `text` as WinAnsi (CP1252) bytes; unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

fn color_operands(color: Rgb) -> Vec<Object> {
    [color.0, color.1, color.2]
        .into_iter()
        .map(|c| real(f32::from(c) / 255.0))
        .collect()
}

fn image_xobject(image: &InlineImage) -> Result<Stream> {
    let bytes = image.decode()?;
    let rgb = image::load_from_memory(&bytes)
        .map_err(|e| ContenizeError::Export(format!("unreadable {} image: {e}", image.mime_type)))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    ))
}

/// Render `report` to PDF bytes.
///
/// Images that cannot be decoded are skipped with a warning; their space stays blank.
pub fn render_pdf(report: &ComposedReport, geometry: &ReportConfig) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for (font, base) in [
        (Font::Regular, "Helvetica"),
        (Font::Bold, "Helvetica-Bold"),
        (Font::Oblique, "Helvetica-Oblique"),
    ] {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base,
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font_resource(font), id);
    }

    // Each distinct image payload is embedded once.
    let mut xobjects = Dictionary::new();
    let mut image_names: HashMap<&str, String> = HashMap::new();
    for element in report.pages.iter().flat_map(|p| &p.elements) {
        let Element::Image { image, .. } = element else {
            continue;
        };
        if image_names.contains_key(image.data.as_str()) {
            continue;
        }
        match image_xobject(image) {
            Ok(stream) => {
                let name = format!("Im{}", image_names.len() + 1);
                let id = doc.add_object(stream);
                xobjects.set(name.as_str(), id);
                image_names.insert(image.data.as_str(), name);
            }
            Err(e) => warn!(error = %e, "skipping image in report"),
        }
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
    });

    let page_height = pt(geometry.page_height);
    let mut kids: Vec<Object> = Vec::with_capacity(report.pages.len());

    for page in &report.pages {
        let mut operations = Vec::new();

        for element in &page.elements {
            match element {
                Element::Text { x, y, text, font, size, color } => {
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new("Tf", vec![font_resource(*font).into(), real(*size)]));
                    operations.push(Operation::new("rg", color_operands(*color)));
                    operations.push(Operation::new("Td", vec![real(pt(*x)), real(page_height - pt(*y))]));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
                Element::Image { x, y, width, height, image } => {
                    let Some(name) = image_names.get(image.data.as_str()) else {
                        continue;
                    };
                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new(
                        "cm",
                        vec![
                            real(pt(*width)),
                            0.into(),
                            0.into(),
                            real(pt(*height)),
                            real(pt(*x)),
                            real(page_height - pt(*y + *height)),
                        ],
                    ));
                    operations.push(Operation::new("Do", vec![name.as_str().into()]));
                    operations.push(Operation::new("Q", vec![]));
                }
                Element::Rule { x1, x2, y, width, color } => {
                    let y = page_height - pt(*y);
                    operations.push(Operation::new("RG", color_operands(*color)));
                    operations.push(Operation::new("w", vec![real(pt(*width))]));
                    operations.push(Operation::new("m", vec![real(pt(*x1)), real(y)]));
                    operations.push(Operation::new("l", vec![real(pt(*x2)), real(y)]));
                    operations.push(Operation::new("S", vec![]));
                }
            }
        }

        let encoded = Content { operations }
            .encode()
            .map_err(|e| ContenizeError::Export(format!("failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), real(pt(geometry.page_width)), real(page_height)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ContenizeError::Export(format!("failed to serialize PDF: {e}")))?;

    debug!(pages = page_count, images = image_names.len(), bytes = bytes.len(), "PDF rendered");
    Ok(bytes)
}
