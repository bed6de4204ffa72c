//! Paginated PDF output using the built-in Helvetica faces.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use billforge_core::Money;

use crate::error::ExportError;
use crate::table::{Cell, Table};

const MARGIN: f32 = 12.0;
const BODY_SIZE: f32 = 8.5;
const ROW_HEIGHT: f32 = 5.0;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;

/// Built-in PDF fonts cover WinAnsi only; keep text to ASCII.
pub(crate) fn pdf_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '₹' => out.push_str("Rs. "),
            '\n' | '\r' | '\t' => out.push(' '),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

pub(crate) fn pdf_money(m: Money) -> String {
    m.format_grouped("Rs. ")
}

pub(crate) fn text_width(s: &str, size: f32) -> f32 {
    s.chars().count() as f32 * size * GLYPH_WIDTH * PT_TO_MM
}

/// Truncate `s` so it fits in `width` millimetres.
pub(crate) fn fit(s: &str, width: f32, size: f32) -> String {
    let max = (width / (size * GLYPH_WIDTH * PT_TO_MM)).floor().max(1.0) as usize;
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(2)).collect();
        cut.push_str("..");
        cut
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Right,
}

/// Cursor over a growing document; starts a new page when the current one is full.
pub(crate) struct PageWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    width: f32,
    height: f32,
    y: f32,
    pages: usize,
    footer: String,
}

impl PageWriter {
    pub fn new(title: &str, landscape: bool) -> Result<Self, ExportError> {
        let (width, height) = if landscape { (297.0, 210.0) } else { (210.0, 297.0) };
        let (doc, page, layer) = PdfDocument::new(pdf_text(title), Mm(width), Mm(height), "content");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        let mut writer = Self {
            doc,
            regular,
            bold,
            layer,
            width,
            height,
            y: height - MARGIN,
            pages: 1,
            footer: pdf_text(title),
        };
        writer.stamp_footer();
        Ok(writer)
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * MARGIN
    }

    pub fn left(&self) -> f32 {
        MARGIN
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Start a new page if fewer than `needed` millimetres remain. Returns
    /// whether a page was added.
    pub fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y - needed >= MARGIN + ROW_HEIGHT {
            return false;
        }
        let (page, layer) = self.doc.add_page(Mm(self.width), Mm(self.height), "content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.height - MARGIN;
        self.pages += 1;
        self.stamp_footer();
        true
    }

    fn stamp_footer(&self) {
        let label = format!("{} - page {}", self.footer, self.pages);
        self.layer
            .use_text(label, 7.0, Mm(MARGIN), Mm(MARGIN - 4.0), &self.regular);
    }

    pub fn text_at(&self, text: &str, size: f32, x: f32, bold: bool, align: Align) {
        let text = pdf_text(text);
        let x = match align {
            Align::Left => x,
            Align::Right => x - text_width(&text, size),
        };
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    /// Write one line of text at the left margin and move down.
    pub fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_space(size * PT_TO_MM + 1.5);
        self.text_at(text, size, MARGIN, bold, Align::Left);
        self.advance(size * PT_TO_MM + 1.5);
    }

    pub fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// One table row of already-formatted cells in fixed-width columns.
    pub fn row(&mut self, cells: &[(String, Align)], widths: &[f32], bold: bool) {
        let mut x = MARGIN;
        for ((text, align), width) in cells.iter().zip(widths) {
            let text = fit(&pdf_text(text), width - 1.5, BODY_SIZE);
            let anchor = match align {
                Align::Left => x,
                Align::Right => x + width - 1.5,
            };
            self.text_at(&text, BODY_SIZE, anchor, bold, *align);
            x += width;
        }
        self.advance(ROW_HEIGHT);
    }

    pub fn finish(self) -> Result<Vec<u8>, ExportError> {
        Ok(self.doc.save_to_bytes()?)
    }
}

fn alignment(cell: &Cell) -> Align {
    match cell {
        Cell::Money(_) | Cell::Integer(_) | Cell::Percent(_) => Align::Right,
        Cell::Text(_) | Cell::Date(_) | Cell::Empty => Align::Left,
    }
}

fn display(cell: &Cell) -> String {
    match cell {
        Cell::Money(m) => pdf_money(*m),
        Cell::Percent(p) => p.to_string(),
        other => other.plain(),
    }
}

/// Any table, with the header row repeated on every page. Wide tables are
/// laid out in landscape.
pub fn render_table(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut pdf = PageWriter::new(&table.title, table.width() > 6)?;
    pdf.line(&table.title, 14.0, true);
    pdf.advance(2.0);

    let columns = table.width().max(1);
    let widths = vec![pdf.content_width() / columns as f32; columns];
    let header: Vec<(String, Align)> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let align = table.rows.first().and_then(|r| r.get(i)).map_or(Align::Left, alignment);
            (h.clone(), align)
        })
        .collect();

    pdf.row(&header, &widths, true);
    if table.is_empty() {
        pdf.line("No records.", BODY_SIZE, false);
    }
    for row in &table.rows {
        if pdf.ensure_space(ROW_HEIGHT) {
            pdf.row(&header, &widths, true);
        }
        let cells: Vec<(String, Align)> = row.iter().map(|c| (display(c), alignment(c))).collect();
        pdf.row(&cells, &widths, false);
    }
    pdf.finish()
}
