//! Minimal PDF 1.4 writer.
//!
//! Enough to lay out text in the two standard Helvetica faces, filled and
//! stroked rectangles, and RGB images. Page content streams are left
//! uncompressed, images are Flate compressed.

use std::fmt::Write as _;
use std::io::Write;

use chrono::{DateTime, Utc};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

/// US Letter, in points.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const INCH: f32 = 72.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
        }
    }

    /// Advance width in 1/1000 em, from the standard Helvetica AFM metrics.
    fn char_width(&self, c: char) -> u16 {
        const REGULAR: [u16; 95] = [
            278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556,
            556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667,
            667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
            667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500,
            556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278,
            556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
        ];
        const BOLD: [u16; 95] = [
            278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556,
            556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722,
            722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
            667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556,
            611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556, 333,
            611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
        ];
        let table = match self {
            Font::Helvetica => &REGULAR,
            Font::HelveticaBold => &BOLD,
        };
        match c {
            ' '..='~' => table[c as usize - 0x20],
            _ => 556,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::hex(0x000000);
    pub const WHITE: Color = Color::hex(0xFFFFFF);
    pub const GREY: Color = Color::hex(0x808080);
    pub const WHITESMOKE: Color = Color::hex(0xF5F5F5);

    pub const fn hex(rgb: u32) -> Self {
        Color {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }

    /// Operands for the `rg` / `RG` operators.
    fn operands(&self) -> String {
        format!(
            "{:.3} {:.3} {:.3}",
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0
        )
    }
}

pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().map(|c| font.char_width(c) as f32).sum::<f32>() * size / 1000.0
}

/// Greedy word wrap. Explicit newlines start a new line, words longer than
/// `max_width` are broken between characters.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = match line.is_empty() {
                true => word.to_string(),
                false => format!("{line} {word}"),
            };
            if text_width(&candidate, font, size) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            for c in word.chars() {
                line.push(c);
                if text_width(&line, font, size) > max_width && line.chars().count() > 1 {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(c);
                }
            }
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Encode as a WinAnsi PDF literal string body, escaping as needed.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let byte: u8 = match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
                continue;
            }
            ' '..='~' => {
                out.push(c);
                continue;
            }
            '\t' | '\n' | '\r' => b' ',
            '\u{A0}'..='\u{FF}' => c as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        };
        match byte {
            0x20..=0x7E => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{byte:03o}");
            }
        }
    }
    out
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to compress image: {0}")]
    Compress(#[from] std::io::Error),
}

/// An RGB image ready to embed.
#[derive(Clone, Debug)]
pub struct PdfImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PdfImage {
    /// Decode any supported image format from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(rgb.as_raw())?;
        Ok(Self {
            width,
            height,
            data: encoder.finish()?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ImageId(usize);

impl ImageId {
    fn resource(&self) -> String {
        format!("Im{}", self.0)
    }
}

/// Drawing operations for one page. Coordinates are in points from the bottom left.
#[derive(Clone, Debug, Default)]
pub struct Page {
    content: String,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let _ = writeln!(
            self.content,
            "{} rg {x:.2} {y:.2} {width:.2} {height:.2} re f",
            color.operands()
        );
    }

    pub fn stroke_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        line_width: f32,
    ) {
        let _ = writeln!(
            self.content,
            "{} RG {line_width:.2} w {x:.2} {y:.2} {width:.2} {height:.2} re S",
            color.operands()
        );
    }

    /// Draw a single line of text with its baseline at `y`.
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Color, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = writeln!(
            self.content,
            "BT /{} {size:.1} Tf {} rg {x:.2} {y:.2} Td ({}) Tj ET",
            font.resource(),
            color.operands(),
            encode_text(text)
        );
    }

    pub fn image(&mut self, image: ImageId, x: f32, y: f32, width: f32, height: f32) {
        let _ = writeln!(
            self.content,
            "q {width:.2} 0 0 {height:.2} {x:.2} {y:.2} cm /{} Do Q",
            image.resource()
        );
    }
}

#[derive(Clone, Debug)]
pub struct PdfDocument {
    title: String,
    created: DateTime<Utc>,
    images: Vec<PdfImage>,
    pages: Vec<Page>,
}

impl PdfDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            created: Utc::now(),
            images: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn add_image(&mut self, image: PdfImage) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    pub fn push_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len().max(1)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pdf = Vec::new();
        pdf.extend_from_slice(b"%PDF-1.4\n");
        pdf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        // 1 catalog, 2 pages, 3-4 fonts, then images, then page/content pairs, then info
        let first_image = 5;
        let first_page = first_image + self.images.len();
        let empty_page = [Page::new()];
        let pages: &[Page] = match self.pages.is_empty() {
            true => &empty_page,
            false => &self.pages,
        };
        let info_id = first_page + pages.len() * 2;

        let mut offsets: Vec<usize> = Vec::with_capacity(info_id);
        let mut begin = |pdf: &mut Vec<u8>, id: usize| {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        };

        begin(&mut pdf, 1);
        pdf.extend_from_slice(b"<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        begin(&mut pdf, 2);
        let kids: Vec<String> = (0..pages.len())
            .map(|i| format!("{} 0 R", first_page + i * 2))
            .collect();
        pdf.extend_from_slice(
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
                kids.join(" "),
                pages.len()
            )
            .as_bytes(),
        );

        for (id, base_font) in [(3, "Helvetica"), (4, "Helvetica-Bold")] {
            begin(&mut pdf, id);
            pdf.extend_from_slice(
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{base_font} /Encoding /WinAnsiEncoding >>\nendobj\n"
                )
                .as_bytes(),
            );
        }

        for (i, image) in self.images.iter().enumerate() {
            begin(&mut pdf, first_image + i);
            pdf.extend_from_slice(
                format!(
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
                    image.width,
                    image.height,
                    image.data.len()
                )
                .as_bytes(),
            );
            pdf.extend_from_slice(&image.data);
            pdf.extend_from_slice(b"\nendstream\nendobj\n");
        }

        let xobjects: String = (0..self.images.len())
            .map(|i| format!("/{} {} 0 R ", ImageId(i).resource(), first_image + i))
            .collect();
        let resources = match xobjects.is_empty() {
            true => "<< /Font << /F1 3 0 R /F2 4 0 R >> >>".to_string(),
            false => format!("<< /Font << /F1 3 0 R /F2 4 0 R >> /XObject << {xobjects}>> >>"),
        };

        for (i, page) in pages.iter().enumerate() {
            let page_id = first_page + i * 2;
            begin(&mut pdf, page_id);
            pdf.extend_from_slice(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] /Contents {} 0 R /Resources {resources} >>\nendobj\n",
                    page_id + 1
                )
                .as_bytes(),
            );

            begin(&mut pdf, page_id + 1);
            pdf.extend_from_slice(
                format!(
                    "<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                    page.content.len(),
                    page.content
                )
                .as_bytes(),
            );
        }

        begin(&mut pdf, info_id);
        pdf.extend_from_slice(
            format!(
                "<< /Title ({}) /Producer (portfolio-backend) /CreationDate (D:{}) >>\nendobj\n",
                encode_text(&self.title),
                self.created.format("%Y%m%d%H%M%S")
            )
            .as_bytes(),
        );

        let xref_start = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
                offsets.len() + 1
            )
            .as_bytes(),
        );

        pdf
    }
}
