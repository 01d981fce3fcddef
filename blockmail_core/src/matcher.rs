use std::fmt::Display;
use std::ops::Range;

use crate::RenderOptions;
use crate::lexer::Token;
use crate::lexer::TokenKind;
use crate::lexer::tokenize;

/// The two kinds of conditional block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
	/// `{{#if condition}}...{{/if}}`
	If,
	/// `{{#unless condition}}...{{/unless}}`
	Unless,
}

impl Display for BlockKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			BlockKind::If => write!(f, "if"),
			BlockKind::Unless => write!(f, "unless"),
		}
	}
}

/// Why a block could not be matched. The opening tag and everything after it
/// are kept as literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
	/// The opening tag has no closing `}}`.
	UnterminatedTag,
	/// The end of the text was reached before the block was closed.
	Unclosed,
	/// Strict mode only: the closer at depth zero is of the other kind.
	MismatchedClose {
		expected: BlockKind,
		found: BlockKind,
	},
}

/// A fully bounded block found by [`match_block`]. All ranges are byte
/// offsets into the source passed to the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedBlock<'a> {
	pub kind: BlockKind,
	/// Raw condition text between the opening literal and `}}`.
	pub condition: &'a str,
	/// The whole opening tag, e.g. `{{#if name}}`.
	pub open: Range<usize>,
	pub if_branch: Range<usize>,
	pub else_branch: Option<Range<usize>>,
	/// The closing tag that terminated the block.
	pub close: Range<usize>,
	/// The kind of the accepted closing tag. This differs from `kind` when a
	/// mismatched closer was accepted in lenient mode.
	pub closer: BlockKind,
}

impl MatchedBlock<'_> {
	pub fn is_mismatched(&self) -> bool {
		self.kind != self.closer
	}
}

/// The result of scanning for the next block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMatch<'a> {
	/// No opening tag at or after the cursor; the rest is literal.
	Literal,
	Block(MatchedBlock<'a>),
	/// An opening tag was found at byte `start` but the block is malformed.
	Malformed { start: usize, reason: MalformedReason },
}

/// Find the next conditional block in `source` at or after `cursor`.
pub fn match_block<'a>(source: &'a str, cursor: usize, options: &RenderOptions) -> BlockMatch<'a> {
	let Some(rest) = source.get(cursor..) else {
		return BlockMatch::Literal;
	};
	let tokens = tokenize(rest);
	let shift = |span: Range<usize>| cursor + span.start..cursor + span.end;

	match scan_block(&tokens, options) {
		Scan::Literal => BlockMatch::Literal,
		Scan::Malformed { open, reason, .. } => {
			BlockMatch::Malformed {
				start: cursor + tokens[open].span.start,
				reason,
			}
		}
		Scan::Block(block) => {
			let branch_end = block.else_at.unwrap_or(block.close);
			BlockMatch::Block(MatchedBlock {
				kind: block.kind,
				condition: block.condition,
				open: shift(tokens[block.open].span.clone()),
				if_branch: shift(tokens[block.open].span.end..tokens[branch_end].span.start),
				else_branch: block.else_at.map(|at| {
					shift(tokens[at].span.end..tokens[block.close].span.start)
				}),
				close: shift(tokens[block.close].span.clone()),
				closer: block.closer,
			})
		}
	}
}

/// A block found within a token slice. Fields are indices into that slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScannedBlock<'a> {
	pub open: usize,
	pub kind: BlockKind,
	pub condition: &'a str,
	pub else_at: Option<usize>,
	pub close: usize,
	pub closer: BlockKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan<'a> {
	Literal,
	Block(ScannedBlock<'a>),
	/// `open` is the index of the opening tag and `culprit` the index of the
	/// token that made the block malformed.
	Malformed {
		open: usize,
		culprit: usize,
		reason: MalformedReason,
	},
}

/// Locate the first block in `tokens`, tracking nesting depth so that inner
/// blocks of either kind are skipped over. Only an `else` seen at depth one
/// splits the branches, and only the first one does.
pub(crate) fn scan_block<'a>(tokens: &[Token<'a>], options: &RenderOptions) -> Scan<'a> {
	let Some((open, kind, condition)) =
		tokens
			.iter()
			.enumerate()
			.find_map(|(index, token)| {
				match token.kind {
					TokenKind::Open { kind, condition } => Some((index, kind, condition)),
					_ => None,
				}
			})
	else {
		return Scan::Literal;
	};

	let Some(condition) = condition else {
		return Scan::Malformed {
			open,
			culprit: open,
			reason: MalformedReason::UnterminatedTag,
		};
	};

	let mut depth = 1_usize;
	let mut else_at = None;

	for (index, token) in tokens.iter().enumerate().skip(open + 1) {
		match token.kind {
			TokenKind::Open { .. } => depth += 1,
			TokenKind::Else if depth == 1 && else_at.is_none() => else_at = Some(index),
			TokenKind::Close(closer) => {
				depth -= 1;

				if depth > 0 {
					continue;
				}

				if closer != kind && options.strict_closers {
					return Scan::Malformed {
						open,
						culprit: index,
						reason: MalformedReason::MismatchedClose {
							expected: kind,
							found: closer,
						},
					};
				}

				return Scan::Block(ScannedBlock {
					open,
					kind,
					condition,
					else_at,
					close: index,
					closer,
				});
			}
			TokenKind::Else | TokenKind::Text => {}
		}
	}

	Scan::Malformed {
		open,
		culprit: open,
		reason: MalformedReason::Unclosed,
	}
}
