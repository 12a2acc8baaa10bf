//! Output page assembly
//!
//! Card images become Flate-compressed image XObjects placed into their bleed
//! boxes; text the renderer could not rasterize is set over them in
//! Helvetica, followed by the printer's marks.

use crate::constants::mm_to_pt;
use crate::layout::{CardPlacement, Rect};
use crate::marks::{escape_pdf_string, generate_crop_marks, generate_page_number, generate_serial};
use crate::render::{RenderedCard, TextRun};
use crate::types::*;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Register the shared `/F1` Helvetica font
pub(crate) fn add_helvetica(doc: &mut Document) -> ObjectId {
    let mut font_dict = Dictionary::new();
    font_dict.set("Type", Object::Name(b"Font".to_vec()));
    font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
    font_dict.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(font_dict)
}

/// Compress a card raster into an image XObject stream
pub(crate) async fn encode_card_image(pixels: RgbImage) -> Result<Stream> {
    tokio::task::spawn_blocking(move || {
        let (width, height) = pixels.dimensions();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(pixels.as_raw())?;
        let data = encoder.finish()?;

        let dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(width as i64)),
            ("Height", Object::Integer(height as i64)),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"FlateDecode".to_vec())),
        ]);
        Ok::<_, ImposeError>(Stream::new(dict, data))
    })
    .await?
}

/// Vector text for one run, positioned relative to the card's bleed box
pub(crate) fn text_run_op(run: &TextRun, bleed_box: &Rect) -> String {
    let x = bleed_box.x + mm_to_pt(run.x_mm);
    let y = bleed_box.top() - mm_to_pt(run.baseline_mm);
    let size = mm_to_pt(run.size_mm);
    let [r, g, b, _] = run.color.0;
    // Screen angles turn clockwise; PDF y points up
    let matrix = if run.angle == 0.0 {
        "1 0 0 1".to_string()
    } else {
        let (sin, cos) = (-run.angle.to_radians()).sin_cos();
        format!("{} {} {} {}", cos, sin, -sin, cos)
    };
    format!(
        "q {} {} {} rg BT /F1 {} Tf {} {} {} Tm ({}) Tj ET Q\n",
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        size,
        matrix,
        x,
        y,
        escape_pdf_string(&run.text)
    )
}

/// One output page being filled with cards
#[derive(Debug)]
pub(crate) struct PageBuilder {
    content_ops: Vec<String>,
    xobjects: Dictionary,
    trim_boxes: Vec<Rect>,
    cards: usize,
}

impl PageBuilder {
    pub(crate) fn new() -> Self {
        Self {
            content_ops: Vec::new(),
            xobjects: Dictionary::new(),
            trim_boxes: Vec::new(),
            cards: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cards == 0
    }

    /// Composite a rendered card into its slot
    pub(crate) async fn add_card(
        &mut self,
        doc: &mut Document,
        placement: &CardPlacement,
        card: RenderedCard,
    ) -> Result<()> {
        let stream = encode_card_image(card.pixels).await?;
        let image_id = doc.add_object(stream);

        let name = format!("Im{}", self.cards);
        self.xobjects.set(name.as_bytes(), Object::Reference(image_id));

        let rect = &placement.bleed_box;
        self.content_ops.push(format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            rect.width, rect.height, rect.x, rect.y, name
        ));
        for run in &card.text_runs {
            self.content_ops.push(text_run_op(run, rect));
        }

        self.trim_boxes.push(placement.trim_box);
        self.cards += 1;
        Ok(())
    }

    pub(crate) fn add_serial(&mut self, serial: &str, placement: &CardPlacement) {
        self.content_ops.push(generate_serial(serial, &placement.trim_box));
    }

    /// Close the page, adding crop marks around every card on it
    pub(crate) fn finish(mut self, crop_marks: bool) -> FinishedPage {
        if crop_marks {
            self.content_ops.push(generate_crop_marks(&self.trim_boxes));
        }
        FinishedPage {
            content: self.content_ops.join(""),
            xobjects: self.xobjects,
        }
    }
}

/// A completed page waiting for its page number
#[derive(Debug)]
pub(crate) struct FinishedPage {
    content: String,
    xobjects: Dictionary,
}

/// Write finished pages, numbered "Page N of M", into a complete document
pub(crate) fn assemble_document(
    mut doc: Document,
    pages: Vec<FinishedPage>,
    page_size_pt: (f32, f32),
    font_id: ObjectId,
    page_numbers: bool,
) -> Result<Document> {
    let (page_width, page_height) = page_size_pt;
    let pages_tree_id = doc.new_object_id();
    let total = pages.len();
    let mut page_refs = Vec::with_capacity(total);

    for (index, page) in pages.into_iter().enumerate() {
        let mut content = page.content;
        if page_numbers {
            content.push_str(&generate_page_number(index + 1, total, page_width));
        }
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(page.xobjects));
        resources.set("Font", Object::Dictionary(fonts));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_tree_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_width),
                Object::Real(page_height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));
        page_refs.push(Object::Reference(doc.add_object(page_dict)));
    }

    let count = page_refs.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(page_refs)),
        ("Count", Object::Integer(count)),
    ]);
    doc.objects.insert(pages_tree_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_tree_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_text_run_position() {
        let run = TextRun {
            text: "A(b)".to_string(),
            x_mm: 0.0,
            baseline_mm: 10.0,
            size_mm: 5.0,
            color: Rgba([0, 0, 0, 255]),
            angle: 0.0,
        };
        let bleed = Rect::new(100.0, 200.0, 50.0, 100.0);
        let op = text_run_op(&run, &bleed);
        assert!(op.contains("(A\\(b\\)) Tj"));
        assert!(op.contains("0 0 0 rg"), "{}", op);
        assert!(op.contains(" Tf 1 0 0 1 100 "), "{}", op);
    }

    #[tokio::test]
    async fn test_encoded_image_dictionary() {
        let stream = encode_card_image(RgbImage::new(4, 3)).await.unwrap();
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"FlateDecode"
        );
    }

    #[test]
    fn test_assembled_pages_are_numbered() {
        let mut doc = Document::with_version("1.7");
        let font = add_helvetica(&mut doc);
        let pages = vec![PageBuilder::new().finish(true), PageBuilder::new().finish(true)];
        let doc = assemble_document(doc, pages, (595.0, 842.0), font, true).unwrap();

        assert_eq!(doc.get_pages().len(), 2);
        let second = doc.get_pages()[&2];
        let content = String::from_utf8(doc.get_page_content(second).unwrap()).unwrap();
        assert!(content.contains("(Page 2 of 2) Tj"));
    }
}
