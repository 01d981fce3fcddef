use std::collections::BTreeSet;
use std::ops::Range;

use tracing::debug;
use tracing::warn;

use crate::BlockKind;
use crate::BlockmailError;
use crate::BlockmailResult;
use crate::Condition;
use crate::ConditionError;
use crate::Context;
use crate::MalformedReason;
use crate::Point;
use crate::Position;
use crate::RenderOptions;
use crate::lexer::Token;
use crate::lexer::TokenKind;
use crate::lexer::tokenize;
use crate::matcher::Scan;
use crate::matcher::scan_block;
use crate::substitute::referenced_variables;
use crate::substitute::substitute_variables;

/// Blocks nested deeper than this are kept as literal text. Parsing and
/// expansion recurse once per level, so the limit bounds stack use.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A problem found while parsing a template. None of these stop rendering;
/// the affected markup is kept as literal text (or, for a lenient mismatched
/// closer, accepted).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateDiagnostic {
	/// An opening tag without a closing `}}`.
	UnterminatedTag { kind: BlockKind, point: Point },
	/// A block that is never closed.
	UnclosedBlock {
		kind: BlockKind,
		condition: String,
		point: Point,
	},
	/// A block closed by a tag of the other kind. `accepted` is true in lenient
	/// mode, where the closer still terminates the block.
	MismatchedClose {
		expected: BlockKind,
		found: BlockKind,
		condition: String,
		accepted: bool,
		point: Point,
	},
	/// A closing tag outside of any block.
	StrayClose { kind: BlockKind, point: Point },
	/// An `{{else}}` outside of any block, or a second `{{else}}` in the same
	/// block.
	StrayElse { point: Point },
	/// A condition that cannot be parsed. It always evaluates to false.
	InvalidCondition {
		condition: String,
		reason: ConditionError,
		point: Point,
	},
	/// A block nested deeper than [`MAX_NESTING_DEPTH`]. The whole block is
	/// kept as literal text.
	NestingTooDeep {
		kind: BlockKind,
		limit: usize,
		point: Point,
	},
}

impl TemplateDiagnostic {
	pub fn point(&self) -> Point {
		match self {
			Self::UnterminatedTag { point, .. }
			| Self::UnclosedBlock { point, .. }
			| Self::MismatchedClose { point, .. }
			| Self::StrayClose { point, .. }
			| Self::StrayElse { point }
			| Self::InvalidCondition { point, .. }
			| Self::NestingTooDeep { point, .. } => *point,
		}
	}
}

impl From<&TemplateDiagnostic> for BlockmailError {
	fn from(diagnostic: &TemplateDiagnostic) -> Self {
		match diagnostic {
			TemplateDiagnostic::UnterminatedTag { kind, point } => {
				BlockmailError::UnterminatedTag {
					kind: kind.to_string(),
					line: point.line,
					column: point.column,
				}
			}
			TemplateDiagnostic::UnclosedBlock {
				kind,
				condition,
				point,
			} => {
				BlockmailError::UnclosedBlock {
					kind: kind.to_string(),
					condition: condition.clone(),
					line: point.line,
					column: point.column,
				}
			}
			TemplateDiagnostic::MismatchedClose {
				expected,
				found,
				condition,
				point,
				..
			} => {
				BlockmailError::MismatchedClose {
					expected: expected.to_string(),
					found: found.to_string(),
					condition: condition.clone(),
					line: point.line,
					column: point.column,
				}
			}
			TemplateDiagnostic::StrayClose { kind, point } => {
				BlockmailError::StrayTag {
					tag: format!("{{{{/{kind}}}}}"),
					line: point.line,
					column: point.column,
				}
			}
			TemplateDiagnostic::StrayElse { point } => {
				BlockmailError::StrayTag {
					tag: "{{else}}".to_string(),
					line: point.line,
					column: point.column,
				}
			}
			TemplateDiagnostic::InvalidCondition {
				condition,
				reason,
				point,
			} => {
				BlockmailError::InvalidCondition {
					condition: condition.clone(),
					reason: reason.to_string(),
					line: point.line,
					column: point.column,
				}
			}
			TemplateDiagnostic::NestingTooDeep { kind, limit, point } => {
				BlockmailError::NestingTooDeep {
					kind: kind.to_string(),
					limit: *limit,
					line: point.line,
					column: point.column,
				}
			}
		}
	}
}

/// A node of the parsed template tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
	/// Text copied to the output as is. It may still contain `{{name}}`
	/// variables, and malformed block markup that was kept verbatim.
	Literal(&'a str),
	Block(Block<'a>),
}

/// A conditional block with its branches already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
	pub kind: BlockKind,
	/// The condition text, trimmed.
	pub condition: &'a str,
	pub test: Result<Condition<'a>, ConditionError>,
	pub if_branch: Vec<Node<'a>>,
	pub else_branch: Option<Vec<Node<'a>>>,
	/// Position of the opening tag.
	pub position: Position,
}

impl<'a> Block<'a> {
	/// Whether the if-branch is selected. An `unless` block negates its
	/// condition and an invalid condition counts as false.
	pub fn is_satisfied(&self, context: &Context) -> bool {
		let result = match &self.test {
			Ok(condition) => condition.evaluate(context),
			Err(error) => {
				warn!(
					condition = self.condition,
					line = self.position.start.line,
					column = self.position.start.column,
					%error,
					"invalid condition evaluates to false"
				);
				false
			}
		};

		match self.kind {
			BlockKind::If => result,
			BlockKind::Unless => !result,
		}
	}

	/// The branch selected for `context`, or `None` when the condition fails
	/// and there is no else-branch.
	pub fn select(&self, context: &Context) -> Option<&[Node<'a>]> {
		if self.is_satisfied(context) {
			Some(self.if_branch.as_slice())
		} else {
			self.else_branch.as_deref()
		}
	}
}

/// A template parsed into a tree of literals and conditional blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
	source: &'a str,
	nodes: Vec<Node<'a>>,
	diagnostics: Vec<TemplateDiagnostic>,
}

impl<'a> Template<'a> {
	/// Parse with the default, lenient options.
	pub fn parse(source: &'a str) -> Self {
		Self::parse_with_options(source, &RenderOptions::default())
	}

	/// Parse `source`. Malformed markup never fails the parse; it is kept as
	/// literal text and reported through [`Template::diagnostics`].
	pub fn parse_with_options(source: &'a str, options: &RenderOptions) -> Self {
		let tokens = tokenize(source);
		let mut builder = TreeBuilder {
			source,
			options: *options,
			diagnostics: Vec::new(),
		};
		let nodes = builder.build(&tokens, 0);

		Self {
			source,
			nodes,
			diagnostics: builder.diagnostics,
		}
	}

	pub fn source(&self) -> &'a str {
		self.source
	}

	pub fn nodes(&self) -> &[Node<'a>] {
		&self.nodes
	}

	pub fn diagnostics(&self) -> &[TemplateDiagnostic] {
		&self.diagnostics
	}

	/// Return the first diagnostic as an error.
	pub fn check(&self) -> BlockmailResult<()> {
		match self.diagnostics.first() {
			Some(diagnostic) => Err(diagnostic.into()),
			None => Ok(()),
		}
	}

	/// Resolve every block against `context`. Variables are left in place.
	pub fn expand(&self, context: &Context) -> String {
		let mut output = String::with_capacity(self.source.len());
		expand_nodes(&self.nodes, context, &mut output);
		output
	}

	/// Resolve every block and then substitute variables.
	pub fn render(&self, context: &Context) -> String {
		substitute_variables(&self.expand(context), context)
	}

	/// Every variable the template refers to, from block conditions and bare
	/// `{{name}}` tokens in any branch.
	pub fn variables(&self) -> BTreeSet<&'a str> {
		let mut variables = BTreeSet::new();
		collect_variables(&self.nodes, &mut variables);
		variables
	}

	/// Referenced variables that `context` does not define. They render as
	/// empty strings.
	pub fn missing_variables(&self, context: &Context) -> Vec<&'a str> {
		self.variables()
			.into_iter()
			.filter(|name| !context.contains_key(*name))
			.collect()
	}
}

fn expand_nodes(nodes: &[Node<'_>], context: &Context, output: &mut String) {
	for node in nodes {
		match node {
			Node::Literal(text) => output.push_str(text),
			Node::Block(block) => {
				let branch = block.select(context);
				debug!(
					kind = %block.kind,
					condition = block.condition,
					selected = if branch.is_some() { "branch" } else { "nothing" },
					"expanding block"
				);

				if let Some(branch) = branch {
					expand_nodes(branch, context, output);
				}
			}
		}
	}
}

fn collect_variables<'a>(nodes: &[Node<'a>], variables: &mut BTreeSet<&'a str>) {
	for node in nodes {
		match node {
			Node::Literal(text) => variables.extend(referenced_variables(*text)),
			Node::Block(block) => {
				if let Ok(condition) = &block.test {
					variables.insert(condition.left);
				}
				collect_variables(&block.if_branch, variables);
				if let Some(else_branch) = &block.else_branch {
					collect_variables(else_branch, variables);
				}
			}
		}
	}
}

/// Builds the node tree by repeatedly matching the next block in a token
/// slice and recursing into its branches.
struct TreeBuilder<'a> {
	source: &'a str,
	options: RenderOptions,
	diagnostics: Vec<TemplateDiagnostic>,
}

impl<'a> TreeBuilder<'a> {
	/// `depth` is the number of blocks enclosing `tokens`.
	fn build(&mut self, tokens: &[Token<'a>], depth: usize) -> Vec<Node<'a>> {
		let mut nodes = Vec::new();
		let mut rest = tokens;

		loop {
			match scan_block(rest, &self.options) {
				Scan::Literal => {
					self.report_strays(rest);
					self.push_literal(&mut nodes, rest);
					break;
				}
				Scan::Malformed {
					open,
					culprit,
					reason,
				} => {
					self.report_strays(&rest[..open]);
					self.report_malformed(&rest[open], &rest[culprit], reason);
					self.push_literal(&mut nodes, rest);
					break;
				}
				Scan::Block(block) => {
					self.report_strays(&rest[..block.open]);
					self.push_literal(&mut nodes, &rest[..block.open]);

					if depth >= MAX_NESTING_DEPTH {
						self.report_too_deep(&rest[block.open], block.kind);
						self.push_literal(&mut nodes, &rest[block.open..=block.close]);
						rest = &rest[block.close + 1..];
						continue;
					}

					let open = &rest[block.open];
					let position = Position::from_span(self.source, &open.span);
					let condition = block.condition.trim();
					let test = Condition::parse(condition);

					if let Err(reason) = &test {
						self.diagnostics.push(TemplateDiagnostic::InvalidCondition {
							condition: condition.to_string(),
							reason: reason.clone(),
							point: position.start,
						});
					}

					if block.kind != block.closer {
						let point = self.point(&rest[block.close].span);
						warn!(
							condition,
							line = point.line,
							column = point.column,
							"`{}` block closed by `{{{{/{}}}}}`; accepting it as the terminator",
							block.kind,
							block.closer
						);
						self.diagnostics.push(TemplateDiagnostic::MismatchedClose {
							expected: block.kind,
							found: block.closer,
							condition: condition.to_string(),
							accepted: true,
							point,
						});
					}

					let if_end = block.else_at.unwrap_or(block.close);
					let if_branch = self.build(&rest[block.open + 1..if_end], depth + 1);
					let else_branch = block
						.else_at
						.map(|at| self.build(&rest[at + 1..block.close], depth + 1));

					nodes.push(Node::Block(Block {
						kind: block.kind,
						condition,
						test,
						if_branch,
						else_branch,
						position,
					}));

					rest = &rest[block.close + 1..];
				}
			}
		}

		nodes
	}

	/// Push the source text covered by `tokens` as one literal.
	fn push_literal(&self, nodes: &mut Vec<Node<'a>>, tokens: &[Token<'a>]) {
		let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
			return;
		};
		let source = self.source;

		if let Some(text) = source.get(first.span.start..last.span.end) {
			nodes.push(Node::Literal(text));
		}
	}

	/// Closing and else tags outside of any block are kept as text.
	fn report_strays(&mut self, tokens: &[Token<'a>]) {
		for token in tokens {
			let diagnostic = match token.kind {
				TokenKind::Close(kind) => {
					TemplateDiagnostic::StrayClose {
						kind,
						point: self.point(&token.span),
					}
				}
				TokenKind::Else => {
					TemplateDiagnostic::StrayElse {
						point: self.point(&token.span),
					}
				}
				TokenKind::Text | TokenKind::Open { .. } => continue,
			};

			debug!(point = ?diagnostic.point(), "keeping stray tag as literal text");
			self.diagnostics.push(diagnostic);
		}
	}

	fn report_malformed(&mut self, open: &Token<'a>, culprit: &Token<'a>, reason: MalformedReason) {
		let TokenKind::Open { kind, condition } = open.kind else {
			return;
		};
		let condition = condition.unwrap_or_default().trim();
		let point = self.point(&culprit.span);

		let diagnostic = match reason {
			MalformedReason::UnterminatedTag => {
				warn!(
					line = point.line,
					column = point.column,
					"`{kind}` tag is never terminated; keeping the rest of the text as literal"
				);
				TemplateDiagnostic::UnterminatedTag { kind, point }
			}
			MalformedReason::Unclosed => {
				warn!(
					condition,
					line = point.line,
					column = point.column,
					"`{kind}` block is never closed; keeping the rest of the text as literal"
				);
				TemplateDiagnostic::UnclosedBlock {
					kind,
					condition: condition.to_string(),
					point,
				}
			}
			MalformedReason::MismatchedClose { expected, found } => {
				warn!(
					condition,
					line = point.line,
					column = point.column,
					"`{expected}` block closed by `{{{{/{found}}}}}` in strict mode; keeping the rest \
					 of the text as literal"
				);
				TemplateDiagnostic::MismatchedClose {
					expected,
					found,
					condition: condition.to_string(),
					accepted: false,
					point,
				}
			}
		};

		self.diagnostics.push(diagnostic);
	}

	fn report_too_deep(&mut self, open: &Token<'a>, kind: BlockKind) {
		let point = self.point(&open.span);
		warn!(
			line = point.line,
			column = point.column,
			limit = MAX_NESTING_DEPTH,
			"`{kind}` block is nested too deeply; keeping it as literal text"
		);
		self.diagnostics.push(TemplateDiagnostic::NestingTooDeep {
			kind,
			limit: MAX_NESTING_DEPTH,
			point,
		});
	}

	fn point(&self, span: &Range<usize>) -> Point {
		Point::locate(self.source, span.start)
	}
}
