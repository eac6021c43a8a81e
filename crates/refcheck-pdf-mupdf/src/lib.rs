use std::path::Path;

use mupdf::{Document, TextPageFlags};

use refcheck_core::{BackendError, BoundingBox, SpanSource, TextSpan};

/// MuPDF-based implementation of [`SpanSource`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that the parser and checker do not transitively
/// depend on it.
///
/// Each MuPDF text line becomes one span carrying the line's bounding box.
/// By default, blocks in the bottom 5% of each page (footers) and top 4%
/// (headers) are skipped so that running heads and page numbers do not end
/// up inside a citation that crosses a page break.
#[derive(Debug, Clone, PartialEq)]
pub struct MupdfSpanSource {
    /// Fraction of page height from bottom to exclude as footer (0.0–1.0).
    /// `None` disables footer exclusion.
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from top to exclude as header (0.0–1.0).
    /// `None` disables header exclusion.
    header_exclusion_ratio: Option<f32>,
}

impl Default for MupdfSpanSource {
    fn default() -> Self {
        Self {
            footer_exclusion_ratio: Some(0.05),
            header_exclusion_ratio: Some(0.04),
        }
    }
}

fn ratio(value: f32) -> Option<f32> {
    (value > 0.0).then_some(value)
}

/// Vertical page bands whose blocks are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bands {
    header_below: Option<f32>,
    footer_above: Option<f32>,
}

impl Bands {
    /// A block is a header when it ends inside the top band and a footer
    /// when it starts inside the bottom band.
    fn excludes(&self, block_top: f32, block_bottom: f32) -> bool {
        self.header_below.is_some_and(|t| block_bottom <= t)
            || self.footer_above.is_some_and(|t| block_top >= t)
    }
}

impl MupdfSpanSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, value: f32) -> Self {
        self.footer_exclusion_ratio = ratio(value);
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, value: f32) -> Self {
        self.header_exclusion_ratio = ratio(value);
        self
    }

    fn bands(&self, page_top: f32, page_bottom: f32) -> Bands {
        let height = page_bottom - page_top;
        Bands {
            header_below: self.header_exclusion_ratio.map(|r| page_top + height * r),
            footer_above: self.footer_exclusion_ratio.map(|r| page_bottom - height * r),
        }
    }
}

impl SpanSource for MupdfSpanSource {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Vec<TextSpan>>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut pages = Vec::new();

        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::PRESERVE_LIGATURES | TextPageFlags::PRESERVE_WHITESPACE)
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let page_bounds = page
                .bounds()
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let bands = self.bands(page_bounds.y0, page_bounds.y1);

            let mut spans = Vec::new();
            for block in text_page.blocks() {
                let block_bounds = block.bounds();
                if bands.excludes(block_bounds.y0, block_bounds.y1) {
                    continue;
                }

                for line in block.lines() {
                    let text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    let b = line.bounds();
                    spans.push(TextSpan::new(text, BoundingBox::new(b.x0, b.y0, b.x1, b.y1)));
                }
            }
            tracing::trace!(page = pages.len() + 1, spans = spans.len(), "page extracted");
            pages.push(spans);
        }

        Ok(pages)
    }
}
