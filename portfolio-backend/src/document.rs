//! Portfolio PDF layout.
//!
//! Sections always come out in the same order: title, photo, contact table,
//! bio, skills. Content flows onto new pages as needed.

use std::io::Write;
use std::path::{Path, PathBuf};

use portfolio_shared::error::PortfolioError;
use tracing::{debug, error, warn};

use crate::asset::AssetStore;
use crate::entity::portfolio;
use crate::pdf::{
    text_width, wrap_text, Color, Font, ImageId, Page, PdfDocument, PdfImage, INCH, PAGE_HEIGHT,
    PAGE_WIDTH,
};

const MARGIN: f32 = INCH;
const FRAME_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 22.0;
const TITLE_COLOR: Color = Color::hex(0x2E86C1);
const HEADING_SIZE: f32 = 16.0;
const HEADING_COLOR: Color = Color::hex(0x1F618D);
const BODY_SIZE: f32 = 10.0;
const BODY_LEADING: f32 = 12.0;

const PHOTO_SIZE: f32 = 2.0 * INCH;

const TABLE_COLUMNS: [f32; 2] = [1.5 * INCH, 4.5 * INCH];
const TABLE_HEADER_COLOR: Color = Color::hex(0xAED6F1);
const TABLE_HEADER_SIZE: f32 = 12.0;
const CELL_PADDING: f32 = 6.0;

/// Tracks the current page and the vertical position on it.
struct Layout {
    pages: Vec<Page>,
    page: Page,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            page: Page::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        let finished = std::mem::take(&mut self.page);
        self.pages.push(finished);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Start a new page unless `height` more points fit on this one.
    fn ensure_space(&mut self, height: f32) {
        // an item taller than a whole page still goes on a fresh one
        if self.y - height < MARGIN && self.y < PAGE_HEIGHT - MARGIN {
            self.new_page();
        }
    }

    fn space(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        } else {
            self.y -= height;
        }
    }

    fn line(&mut self, x: f32, font: Font, size: f32, leading: f32, color: Color, text: &str) {
        self.ensure_space(leading);
        self.y -= leading;
        // baseline sits above the bottom of the line box by the descender allowance
        self.page
            .text(x, self.y + (leading - size), font, size, color, text);
    }

    fn paragraph(&mut self, font: Font, size: f32, leading: f32, color: Color, text: &str) {
        for line in wrap_text(text, font, size, FRAME_WIDTH) {
            self.line(MARGIN, font, size, leading, color, &line);
        }
    }

    fn centered(&mut self, font: Font, size: f32, leading: f32, color: Color, text: &str) {
        for line in wrap_text(text, font, size, FRAME_WIDTH) {
            let x = (PAGE_WIDTH - text_width(&line, font, size)) / 2.0;
            self.line(x, font, size, leading, color, &line);
        }
    }

    fn image(&mut self, image: ImageId, size: f32) {
        self.ensure_space(size);
        self.y -= size;
        self.page
            .image(image, (PAGE_WIDTH - size) / 2.0, self.y, size, size);
    }

    fn table_row(&mut self, cells: [&str; 2], header: bool) {
        let (font, size, background, color) = match header {
            true => (
                Font::HelveticaBold,
                TABLE_HEADER_SIZE,
                TABLE_HEADER_COLOR,
                Color::WHITE,
            ),
            false => (Font::Helvetica, BODY_SIZE, Color::WHITESMOKE, Color::BLACK),
        };
        let leading = size * 1.2;
        let bottom_padding = match header {
            true => 8.0,
            false => 3.0,
        };

        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .zip(TABLE_COLUMNS)
            .map(|(text, width)| wrap_text(text, font, size, width - 2.0 * CELL_PADDING))
            .collect();
        let total = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let padding = 3.0 + bottom_padding;

        // keep the row whole when a fresh page can hold it, split it otherwise
        self.ensure_space(total as f32 * leading + padding);
        let mut start = 0;
        while start < total {
            let fits = ((self.y - MARGIN - padding) / leading).floor();
            if fits < 1.0 && self.y < PAGE_HEIGHT - MARGIN {
                self.new_page();
                continue;
            }
            let count = (fits.max(1.0) as usize).min(total - start);
            let top = self.y;
            let height = count as f32 * leading + padding;
            let bottom = top - height;
            let mut x = (PAGE_WIDTH - TABLE_COLUMNS.iter().sum::<f32>()) / 2.0;
            for (cell_lines, width) in wrapped.iter().zip(TABLE_COLUMNS) {
                self.page.fill_rect(x, bottom, width, height, background);
                self.page.stroke_rect(x, bottom, width, height, Color::GREY, 1.0);
                for (i, line) in cell_lines.iter().skip(start).take(count).enumerate() {
                    let baseline = top - 3.0 - (i as f32 + 1.0) * leading + (leading - size);
                    self.page
                        .text(x + CELL_PADDING, baseline, font, size, color, line);
                }
                x += width;
            }
            self.y = bottom;
            start += count;
            if start < total {
                self.new_page();
            }
        }
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.page);
        self.pages
    }
}

/// Renders portfolios to PDF and keeps a copy of each in the output directory.
#[derive(Clone, Debug)]
pub struct DocumentRenderer {
    assets: AssetStore,
    output_dir: PathBuf,
}

impl DocumentRenderer {
    pub fn new(assets: AssetStore, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn filename(id: i32) -> String {
        format!("portfolio_{id}.pdf")
    }

    pub fn output_path(&self, id: i32) -> PathBuf {
        self.output_dir.join(Self::filename(id))
    }

    /// Read and decode the profile picture. A missing or unreadable picture
    /// is logged and the document goes out without it.
    fn load_picture(&self, portfolio: &portfolio::Model) -> Option<PdfImage> {
        let stored = portfolio.profile_picture.as_deref()?;
        let path = self.assets.resolve(stored)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    "Error loading image {} for portfolio {}: {}",
                    path.display(),
                    portfolio.id,
                    err
                );
                return None;
            }
        };
        PdfImage::from_bytes(&bytes)
            .inspect_err(|err| {
                warn!(
                    "Error loading image {} for portfolio {}: {}",
                    path.display(),
                    portfolio.id,
                    err
                )
            })
            .ok()
    }

    /// Lay out the document in memory.
    pub fn build(&self, portfolio: &portfolio::Model) -> PdfDocument {
        let full_name = portfolio.full_name();
        let mut doc = PdfDocument::new(format!("Portfolio of {full_name}"));
        let mut layout = Layout::new();

        layout.centered(
            Font::HelveticaBold,
            TITLE_SIZE,
            TITLE_SIZE * 1.2,
            TITLE_COLOR,
            &format!("Portfolio of {full_name}"),
        );
        layout.space(20.0);
        layout.space(0.5 * INCH);

        if let Some(picture) = self.load_picture(portfolio) {
            let id = doc.add_image(picture);
            layout.image(id, PHOTO_SIZE);
            layout.space(0.2 * INCH);
        }

        let rows = [
            ("Full Name:", full_name.as_str()),
            ("Email:", portfolio.email.as_str()),
            ("Phone:", portfolio.phone.as_str()),
            ("LinkedIn:", portfolio.linkedin.as_deref().unwrap_or_default()),
            ("GitHub:", portfolio.github.as_deref().unwrap_or_default()),
        ];
        for (i, (label, value)) in rows.into_iter().enumerate() {
            layout.table_row([label, value], i == 0);
        }
        layout.space(0.5 * INCH);

        for (heading, body) in [("Bio", &portfolio.bio), ("Skills", &portfolio.skills)] {
            layout.space(10.0);
            layout.paragraph(
                Font::HelveticaBold,
                HEADING_SIZE,
                HEADING_SIZE * 1.2,
                HEADING_COLOR,
                heading,
            );
            layout.space(10.0 + 6.0);
            layout.paragraph(Font::Helvetica, BODY_SIZE, BODY_LEADING, Color::BLACK, body);
            if heading == "Bio" {
                layout.space(0.5 * INCH);
            }
        }

        for page in layout.finish() {
            doc.push_page(page);
        }
        doc
    }

    /// Render, write `portfolio_{id}.pdf` into the output directory and return the bytes.
    pub fn render(&self, portfolio: &portfolio::Model) -> Result<Vec<u8>, PortfolioError> {
        let bytes = self.build(portfolio).to_bytes();

        let path = self.output_path(portfolio.id);
        std::fs::create_dir_all(&self.output_dir)
            .and_then(|_| {
                let mut file = std::fs::File::create(&path)?;
                file.write_all(&bytes)?;
                file.flush()
            })
            .inspect_err(|err| error!("Failed to write {}: {:?}", path.display(), err))?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(bytes)
    }
}
