//! JPEG/PNG to single-page PDF.
//!
//! The decoded image is embedded as an 8-bit DeviceRGB XObject on a US
//! Letter page, scaled to fit inside half-inch margins with its aspect
//! ratio preserved and centred. Alpha is discarded.

use super::{install_page_tree, LETTER_HEIGHT, LETTER_WIDTH};
use crate::error::ExhibitError;
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::debug;

const MARGIN: f32 = 36.0;

/// Whether the bytes look like an image this module can wrap.
pub fn is_supported_image(bytes: &[u8]) -> bool {
    matches!(
        image::guess_format(bytes),
        Ok(image::ImageFormat::Jpeg | image::ImageFormat::Png)
    )
}

/// Wrap an image into a one-page PDF.
pub fn image_to_pdf(name: &str, bytes: &[u8]) -> Result<Vec<u8>, ExhibitError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ExhibitError::InvalidImage {
        name: name.to_string(),
        detail: e.to_string(),
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(ExhibitError::InvalidImage {
            name: name.to_string(),
            detail: "image has no pixels".into(),
        });
    }
    debug!("Wrapping {name} ({width}x{height}) into a PDF page");

    let (draw_w, draw_h, x, y) = placement(width, height);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ]);
    let image_id = doc.add_object(Stream::new(image_dict, rgb.into_raw()));

    let content = format!("q\n{draw_w:.2} 0 0 {draw_h:.2} {x:.2} {y:.2} cm\n/Im1 Do\nQ\n");
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    let resources = Dictionary::from_iter(vec![(
        "XObject",
        Object::Dictionary(Dictionary::from_iter(vec![("Im1", Object::Reference(image_id))])),
    )]);
    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Contents", Object::Reference(content_id)),
        ("Resources", Object::Dictionary(resources)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(LETTER_WIDTH as i64),
                Object::Integer(LETTER_HEIGHT as i64),
            ]),
        ),
    ]));

    install_page_tree(&mut doc, pages_id, &[page_id]);
    super::save(doc)
}

/// Drawn size and lower-left corner of an image on a Letter page.
fn placement(width: u32, height: u32) -> (f32, f32, f32, f32) {
    let avail_w = LETTER_WIDTH - 2.0 * MARGIN;
    let avail_h = LETTER_HEIGHT - 2.0 * MARGIN;
    let scale = (avail_w / width as f32).min(avail_h / height as f32);
    let draw_w = width as f32 * scale;
    let draw_h = height as f32 * scale;
    let x = (LETTER_WIDTH - draw_w) / 2.0;
    let y = (LETTER_HEIGHT - draw_h) / 2.0;
    (draw_w, draw_h, x, y)
}
