//! Text rendering primitives for the generated front matter.
//!
//! [`Renderer`] is the capability the front-matter generator consumes: place
//! text at a position on the current page, start a new page, measure text.
//! [`PdfRenderer`] implements it with pdf-writer on the base-14 Helvetica
//! family, so the cover and contents pages need no font embedding.

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

#[derive(Clone, Copy, Debug)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub oblique: bool,
}

impl TextStyle {
    pub fn regular(size: f32) -> TextStyle {
        TextStyle { size, bold: false, oblique: false }
    }

    pub fn bold(size: f32) -> TextStyle {
        TextStyle { size, bold: true, oblique: false }
    }

    pub fn oblique(size: f32) -> TextStyle {
        TextStyle { size, bold: false, oblique: true }
    }

    fn resource_name(&self) -> Name<'static> {
        // Bold wins when both are set; the front matter never needs
        // bold-oblique.
        if self.bold {
            Name(b"F2")
        } else if self.oblique {
            Name(b"F3")
        } else {
            Name(b"F1")
        }
    }
}

/// Advancing-cursor text surface. `y` coordinates are measured in points from
/// the top of the page down to the baseline; implementations convert to PDF
/// user space themselves.
pub trait Renderer {
    /// 0-based index of the page currently being drawn.
    fn current_page(&self) -> usize;

    fn new_page(&mut self);

    fn draw_text(&mut self, x: f32, y: f32, style: TextStyle, text: &str);

    fn text_width(&self, style: TextStyle, text: &str) -> f32;
}

pub struct PdfRenderer {
    page_width: f32,
    page_height: f32,
    pages: Vec<Content>,
}

impl PdfRenderer {
    pub fn new(page_width: f32, page_height: f32) -> PdfRenderer {
        PdfRenderer {
            page_width,
            page_height,
            pages: vec![Content::new()],
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialize the accumulated pages into a standalone PDF.
    pub fn finish(self) -> Vec<u8> {
        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();

        let fonts: [(&[u8], &[u8]); 3] = [
            (b"F1", b"Helvetica"),
            (b"F2", b"Helvetica-Bold"),
            (b"F3", b"Helvetica-Oblique"),
        ];
        let font_refs: Vec<Ref> = fonts
            .iter()
            .map(|(_, base)| {
                let font_ref = alloc();
                pdf.type1_font(font_ref)
                    .base_font(Name(base))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
                font_ref
            })
            .collect();

        let n = self.pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

        for (i, content) in self.pages.into_iter().enumerate() {
            pdf.stream(content_ids[i], &content.finish());
        }

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for i in 0..n {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, self.page_width, self.page_height))
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            let mut font_dict = resources.fonts();
            for ((name, _), font_ref) in fonts.iter().zip(&font_refs) {
                font_dict.pair(Name(name), *font_ref);
            }
        }

        pdf.finish()
    }
}

impl Renderer for PdfRenderer {
    fn current_page(&self) -> usize {
        self.pages.len() - 1
    }

    fn new_page(&mut self) {
        self.pages.push(Content::new());
    }

    fn draw_text(&mut self, x: f32, y: f32, style: TextStyle, text: &str) {
        let baseline = self.page_height - y;
        // `pages` always holds at least one entry.
        let content = self.pages.last_mut().expect("current page");
        content.begin_text();
        content.set_font(style.resource_name(), style.size);
        content.next_line(x, baseline);
        content.show(Str(&to_winansi(text)));
        content.end_text();
    }

    fn text_width(&self, style: TextStyle, text: &str) -> f32 {
        let widths: &[u16; 95] = if style.bold {
            &HELVETICA_BOLD_WIDTHS
        } else {
            &HELVETICA_WIDTHS
        };
        let total: u32 = to_winansi(text)
            .iter()
            .map(|&b| match b {
                0x20..=0x7E => widths[(b - 0x20) as usize] as u32,
                _ => 556,
            })
            .sum();
        total as f32 * style.size / 1000.0
    }
}

fn to_winansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            0x0000..=0x007F => c as u8,
            0x00A0..=0x00FF => c as u8, // Latin-1 supplement maps directly
            0x20AC => 0x80,
            0x201A => 0x82,
            0x0192 => 0x83,
            0x201E => 0x84,
            0x2026 => 0x85,
            0x2020 => 0x86,
            0x2021 => 0x87,
            0x02C6 => 0x88,
            0x2030 => 0x89,
            0x0160 => 0x8A,
            0x2039 => 0x8B,
            0x0152 => 0x8C,
            0x017D => 0x8E,
            0x2018 => 0x91,
            0x2019 => 0x92,
            0x201C => 0x93,
            0x201D => 0x94,
            0x2022 => 0x95,
            0x2013 => 0x96,
            0x2014 => 0x97,
            0x02DC => 0x98,
            0x2122 => 0x99,
            0x0161 => 0x9A,
            0x203A => 0x9B,
            0x0153 => 0x9C,
            0x017E => 0x9E,
            0x0178 => 0x9F,
            _ => b'?',
        })
        .collect()
}

// AFM advance widths (1/1000 em) for chars 0x20..=0x7E.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
