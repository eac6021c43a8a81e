//! Reconstruction of visual lines from positioned text spans.

use refcheck_core::{BoundingBox, TextSpan};

/// Horizontal gap (page units) below which two spans are treated as touching.
pub const TOUCH_TOLERANCE: f32 = 0.5;

/// Lazily joins spans into logical lines using their bounding boxes.
///
/// Spans whose vertical extents overlap the previous span's are on the same
/// line; a space is inserted between them unless they touch.
pub struct LineReconstructor<I> {
    spans: I,
    prev: Option<BoundingBox>,
    buffer: String,
    done: bool,
}

impl<I> LineReconstructor<I>
where
    I: Iterator<Item = TextSpan>,
{
    pub fn new(spans: I) -> Self {
        Self {
            spans,
            prev: None,
            buffer: String::new(),
            done: false,
        }
    }
}

impl<I> Iterator for LineReconstructor<I>
where
    I: Iterator<Item = TextSpan>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        for span in self.spans.by_ref() {
            let Some(prev) = self.prev.replace(span.bbox) else {
                self.buffer = span.text;
                continue;
            };

            if prev.overlaps_vertically(&span.bbox) {
                if prev.right + TOUCH_TOLERANCE < span.bbox.left {
                    self.buffer.push(' ');
                }
                self.buffer.push_str(&span.text);
            } else {
                return Some(std::mem::replace(&mut self.buffer, span.text));
            }
        }

        self.done = true;
        self.prev
            .take()
            .map(|_| std::mem::take(&mut self.buffer))
    }
}

/// Logical lines of a whole document, page after page. Lines never span a
/// page boundary.
pub fn document_lines(pages: Vec<Vec<TextSpan>>) -> impl Iterator<Item = String> {
    pages
        .into_iter()
        .flat_map(|page| LineReconstructor::new(page.into_iter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, left: f32, top: f32, right: f32, bottom: f32) -> TextSpan {
        TextSpan::new(text, BoundingBox::new(left, top, right, bottom))
    }

    fn lines(spans: Vec<TextSpan>) -> Vec<String> {
        LineReconstructor::new(spans.into_iter()).collect()
    }

    #[test]
    fn touching_spans_concatenate() {
        let out = lines(vec![
            span("Ref", 10.0, 100.0, 30.0, 110.0),
            span("erences", 30.3, 100.0, 70.0, 110.0),
        ]);
        assert_eq!(out, vec!["References"]);
    }

    #[test]
    fn separated_spans_get_one_space() {
        let out = lines(vec![
            span("[1]", 10.0, 100.0, 25.0, 110.0),
            span("A. Smith,", 30.0, 101.0, 80.0, 111.0),
        ]);
        assert_eq!(out, vec!["[1] A. Smith,"]);
    }

    #[test]
    fn non_overlapping_spans_start_new_line() {
        let out = lines(vec![
            span("first", 10.0, 100.0, 50.0, 110.0),
            span("second", 60.0, 110.0, 100.0, 120.0),
            span("third", 10.0, 130.0, 50.0, 140.0),
        ]);
        assert_eq!(out, vec!["first", "second", "third"]);
    }

    #[test]
    fn same_line_compares_against_previous_span() {
        // The third span overlaps the second but not the first.
        let out = lines(vec![
            span("a", 0.0, 0.0, 5.0, 10.0),
            span("b", 10.0, 8.0, 15.0, 18.0),
            span("c", 20.0, 16.0, 25.0, 26.0),
        ]);
        assert_eq!(out, vec!["a b c"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(lines(vec![]).is_empty());
    }

    #[test]
    fn pages_are_reconstructed_independently() {
        let pages = vec![
            vec![span("end of page", 0.0, 700.0, 50.0, 710.0)],
            vec![span("start of next", 0.0, 700.0, 50.0, 710.0)],
        ];
        let out: Vec<String> = document_lines(pages).collect();
        assert_eq!(out, vec!["end of page", "start of next"]);
    }
}
