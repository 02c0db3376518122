//! A4 rendering of a product sheet: title, category, description, bulleted
//! features and benefits, price, SEO tags and the call-to-action.

use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Rgb};

use crate::export::ExportError;
use crate::product::ProductSheet;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 14.0;
const BODY_SIZE: f32 = 12.0;
const HEADING_SIZE: f32 = 14.0;
const TITLE_SIZE: f32 = 18.0;
const TAG_SIZE: f32 = 10.0;
const PT_TO_MM: f32 = 0.3528;

fn pdf_error(e: printpdf::Error) -> ExportError {
    ExportError::Pdf(format!("{e:?}"))
}

struct Writer<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Writer<'_> {
    fn line_height(size: f32) -> f32 {
        size * PT_TO_MM * 1.4
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn text(&mut self, text: &str, size: f32, indent: f32, bold: bool) {
        let width = PAGE_WIDTH - 2.0 * MARGIN - indent;
        for line in wrap(&printable(text), chars_per_line(width, size)) {
            let height = Self::line_height(size);
            self.ensure_room(height);
            self.y -= height;
            let font = if bold { &self.bold } else { &self.regular };
            self.layer.use_text(line, size, Mm(MARGIN + indent), Mm(self.y), font);
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn heading(&mut self, text: &str) {
        self.gap(4.0);
        self.text(text, HEADING_SIZE, 0.0, true);
        self.gap(1.0);
    }

    fn items(&mut self, marker: &str, items: &[String]) {
        for item in items {
            self.text(&format!("{marker} {item}"), BODY_SIZE, 3.5, false);
        }
    }
}

pub fn render(sheet: &ProductSheet) -> Result<Vec<u8>, ExportError> {
    let content = &sheet.content;
    let (doc, page, layer) = PdfDocument::new(&content.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    {
        let mut w = Writer {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        };

        w.text(&content.title, TITLE_SIZE, 0.0, true);
        w.gap(1.0);
        w.text(&format!("Category : {}", content.category), BODY_SIZE, 0.0, false);

        w.heading("Description");
        w.text(&content.description, BODY_SIZE, 0.0, false);

        w.heading("Features");
        w.items("-", &content.features);

        w.heading("Benefits");
        w.items("+", &content.benefits);

        w.heading("Suggested price");
        w.text(&content.price_suggestion, BODY_SIZE, 0.0, false);

        w.heading("SEO Tags");
        let tags: Vec<String> = content.seo_tags.iter().map(|t| format!("#{t}")).collect();
        w.text(&tags.join("   "), TAG_SIZE, 0.0, false);

        w.heading("Call to Action");
        w.layer.set_fill_color(Color::Rgb(Rgb::new(0.102, 0.451, 0.910, None)));
        w.text(&content.cta, HEADING_SIZE, 0.0, true);
        w.layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }

    doc.save_to_bytes().map_err(pdf_error)
}

/// Rough Helvetica fit: average glyph is about half the font size wide.
fn chars_per_line(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * PT_TO_MM * 0.5)) as usize).max(10)
}

/// The built-in fonts have no glyphs for typographic punctuation.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '-',
            '\u{00A0}' => ' ',
            '\n' | '\t' => ' ',
            other => other,
        })
        .collect()
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let pending = current.chars().count();
        let extra = word.chars().count() + usize::from(pending > 0);
        if pending > 0 && pending + extra > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
