/// Position tracking for syntax nodes
///
/// Stores the source location (line/column) of cells, statements and blocks
/// for completion, go-to-definition and diagnostics.
/// A span representing a range in source code (0-indexed for LSP compatibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// A position in source code (0-indexed, column counted in chars)
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a span from line/column coordinates
    pub fn from_coords(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start: Position::new(start_line, start_col),
            end: Position::new(end_line, end_col),
        }
    }

    /// A zero-width span at the start of a line.
    pub fn line_start(line: u32) -> Self {
        Self::from_coords(line, 0, line, 0)
    }

    /// Check if a position falls within this span (end inclusive, so a cursor
    /// placed right after the last char still hits the token).
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Check if the span covers any part of `line`.
    pub fn contains_line(&self, line: u32) -> bool {
        self.start.line <= line && line <= self.end.line
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_contains_is_end_inclusive() {
        let span = Span::from_coords(2, 4, 2, 13);
        assert!(span.contains(Position::new(2, 4)));
        assert!(span.contains(Position::new(2, 13)));
        assert!(!span.contains(Position::new(2, 14)));
        assert!(!span.contains(Position::new(1, 8)));
    }

    #[test]
    fn test_span_cover_multiline() {
        let a = Span::from_coords(1, 4, 1, 10);
        let b = Span::from_coords(3, 0, 3, 2);
        let c = a.cover(b);
        assert_eq!(c.start, Position::new(1, 4));
        assert_eq!(c.end, Position::new(3, 2));
        assert!(c.contains_line(2));
    }
}
