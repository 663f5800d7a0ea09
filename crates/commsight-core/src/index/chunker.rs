//! Overlapping text splitting on natural boundaries
//!
//! Sizes and offsets are UTF-8 byte positions, always snapped to char
//! boundaries so every span slices the source cleanly.

/// Break points, most preferred first
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", ", ", " "];

/// Soft cuts must land in the last 30% of the window
const SOFT_CUT_PERCENT: usize = 70;

/// Stop once less than this remains past the next window start
const MIN_TAIL: usize = 10;

/// Byte range of a trimmed chunk within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Find a valid char boundary at or before the given byte index
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find a valid char boundary at or after the given byte index
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Split `content` into overlapping spans.
///
/// Each window `[position, position + chunk_size]` is cut at the last
/// separator (in priority order) found in its final 30%, or at the hard
/// boundary. The cut text is trimmed and kept when at least
/// `min_chunk_size` long. The next window starts `overlap` before the cut.
pub fn split_spans(
    content: &str,
    chunk_size: usize,
    overlap: usize,
    min_chunk_size: usize,
) -> Vec<Span> {
    let len = content.len();
    let chunk_size = chunk_size.max(1);
    let soft_floor = chunk_size * SOFT_CUT_PERCENT / 100;
    let mut spans = Vec::new();
    let mut position = 0;

    while position < len {
        let mut end = floor_char_boundary(content, position + chunk_size);
        if end <= position {
            end = ceil_char_boundary(content, position + 1);
        }

        if position + chunk_size < len {
            let search_start = ceil_char_boundary(content, position + soft_floor);
            if search_start < end {
                let region = &content[search_start..end];
                for sep in SEPARATORS {
                    if let Some(idx) = region.rfind(sep) {
                        end = search_start + idx + sep.len();
                        break;
                    }
                }
            }
        }

        let raw = &content[position..end];
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.len() >= min_chunk_size {
            let start = position + (raw.len() - raw.trim_start().len());
            spans.push(Span {
                start,
                end: start + trimmed.len(),
            });
        }

        if end >= len {
            break;
        }

        let mut next = ceil_char_boundary(content, end.saturating_sub(overlap));
        if next <= position {
            next = end;
        }
        if len - next < MIN_TAIL {
            break;
        }
        position = next;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_content_single_span() {
        let content = "  Small content here.  ";
        let spans = split_spans(content, 100, 20, 5);
        assert_eq!(spans.len(), 1);
        assert_eq!(&content[spans[0].start..spans[0].end], "Small content here.");
    }

    #[test]
    fn test_below_min_size_dropped() {
        assert!(split_spans("tiny", 100, 20, 10).is_empty());
        assert!(split_spans("   \n\n  ", 100, 20, 0).is_empty());
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let content = format!("{}\n\n{}", "a".repeat(80), "b".repeat(80));
        let spans = split_spans(&content, 100, 10, 5);
        assert_eq!(&content[spans[0].start..spans[0].end], "a".repeat(80));
    }

    #[test]
    fn test_separator_priority_over_position() {
        // a later ". " loses to an earlier "\n" inside the soft-cut region
        let content = format!("{}\n{}. {}", "x".repeat(75), "y".repeat(10), "z".repeat(200));
        let spans = split_spans(&content, 100, 0, 1);
        assert_eq!(spans[0].end, 75);
    }

    #[test]
    fn test_separator_before_soft_floor_ignored() {
        let content = format!("{} {}", "x".repeat(10), "y".repeat(300));
        let spans = split_spans(&content, 100, 0, 1);
        assert_eq!(spans[0], Span { start: 0, end: 100 });
    }

    #[test]
    fn test_hard_cuts_respect_iteration_bound() {
        let content = "x".repeat(1000);
        let (size, overlap) = (100, 20);
        let spans = split_spans(&content, size, overlap, 1);
        let bound = (content.len() + (size - overlap) - 1) / (size - overlap) + 1;
        assert!(spans.len() <= bound);
        assert_eq!(spans[1].start, 80);
    }

    #[test]
    fn test_handles_unicode() {
        let content = "Hello 世界! Überweisung fehlgeschlagen 🎉 und noch mehr Text hier. ".repeat(10);
        let spans = split_spans(&content, 37, 7, 3);
        assert!(!spans.is_empty());
        for span in &spans {
            assert!(content.is_char_boundary(span.start));
            assert!(content.is_char_boundary(span.end));
        }
    }

    #[test]
    fn test_sizes_count_bytes() {
        // 3 bytes per char
        let content = "退款延迟".repeat(100);
        let spans = split_spans(&content, 300, 0, 30);
        assert_eq!(spans.len(), 4);
        for span in &spans {
            assert_eq!(span.len(), 300);
            assert_eq!(content[span.start..span.end].chars().count(), 100);
        }

        // 4 chars but 12 bytes clears a minimum of 10
        assert_eq!(split_spans("退款延迟", 100, 0, 10).len(), 1);
    }

    #[test]
    fn test_floor_char_boundary() {
        let s = "Hello 世界";
        assert_eq!(floor_char_boundary(s, 6), 6);
        assert_eq!(floor_char_boundary(s, 7), 6);
        assert_eq!(floor_char_boundary(s, 9), 9);
        assert_eq!(ceil_char_boundary(s, 7), 9);
    }

    proptest! {
        #[test]
        fn prop_span_invariants(
            content in "[a-zA-Z .,\n世🎉]{0,1500}",
            chunk_size in 20usize..400,
            overlap_pct in 0usize..50,
            min_pct in 0usize..50,
        ) {
            let overlap = chunk_size * overlap_pct / 100;
            let min_chunk_size = chunk_size * min_pct / 100;
            let spans = split_spans(&content, chunk_size, overlap, min_chunk_size);

            for span in &spans {
                prop_assert!(span.start < span.end);
                prop_assert!(span.end <= content.len());
                prop_assert!(span.len() >= min_chunk_size);
                let text = &content[span.start..span.end];
                prop_assert_eq!(text, text.trim());
            }

            for pair in spans.windows(2) {
                prop_assert!(pair[1].start >= pair[0].start);
                prop_assert!(pair[0].end.saturating_sub(pair[1].start) <= overlap);
            }

            let min_step = (chunk_size * SOFT_CUT_PERCENT / 100).saturating_sub(overlap).max(1);
            prop_assert!(spans.len() <= content.len() / min_step + 2);
        }
    }
}
