use unicode_segmentation::UnicodeSegmentation;

/// Represents a location in the text being lexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Locates a byte offset within `input`.
    ///
    /// Columns count grapheme clusters so that emoji and combining marks
    /// report the column a reader would expect.
    pub fn locate(input: &str, offset: usize) -> Self {
        let mut offset = offset.min(input.len());
        while !input.is_char_boundary(offset) {
            offset -= 1;
        }

        let before = &input[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        let column = input[line_start..offset].graphemes(true).count() + 1;

        Self {
            line,
            column,
            offset,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_offsets_across_lines() {
        let input = "first\nsecond line";
        let position = Position::locate(input, 9);
        assert_eq!(position.line, 2);
        assert_eq!(position.column, 4);
        assert_eq!(position.offset, 9);
    }

    #[test]
    fn counts_graphemes_for_columns() {
        let input = "e\u{301}x";
        let position = Position::locate(input, input.len() - 1);
        assert_eq!(position.column, 2);
    }

    #[test]
    fn clamps_offsets_past_the_end() {
        let position = Position::locate("ab", 10);
        assert_eq!(position.offset, 2);
        assert_eq!(position.column, 3);
    }
}
