use std::ops::Range;

/// A single location within a template: 1-indexed line and column plus the
/// byte offset from the start of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Default for Point {
	fn default() -> Self {
		Self {
			line: 1,
			column: 1,
			offset: 0,
		}
	}
}

impl Point {
	pub fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// Locate the byte `offset` inside `source`. Offsets past the end clamp to
	/// the end of the source.
	pub fn locate(source: &str, offset: usize) -> Self {
		let mut point = Self::default();
		let end = offset.min(source.len());
		point.advance_str(source.get(..end).unwrap_or(source));
		point
	}

	/// Move the point past `text`, counting newlines.
	pub fn advance_str(&mut self, text: &str) {
		for ch in text.chars() {
			if ch == '\n' {
				self.line += 1;
				self.column = 1;
			} else {
				self.column += 1;
			}
		}

		self.offset += text.len();
	}
}

/// The start and end of a span of template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
	pub start: Point,
	pub end: Point,
}

impl Position {
	pub fn new(
		start_line: usize,
		start_column: usize,
		start_offset: usize,
		end_line: usize,
		end_column: usize,
		end_offset: usize,
	) -> Self {
		Self {
			start: Point::new(start_line, start_column, start_offset),
			end: Point::new(end_line, end_column, end_offset),
		}
	}

	/// Compute the position of a byte span within `source`.
	pub fn from_span(source: &str, span: &Range<usize>) -> Self {
		let start = Point::locate(source, span.start);
		let mut end = start;
		let end_offset = span.end.clamp(start.offset, source.len());
		end.advance_str(source.get(start.offset..end_offset).unwrap_or_default());

		Self { start, end }
	}
}
