use std::ops::Range;

use logos::Lexer;
use logos::Logos;

use crate::BlockKind;

/// What follows an opening literal such as `{{#if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagBody<'s> {
	/// The raw text between the opening literal and the first `}}`.
	Condition(&'s str),
	/// No `}}` follows; the token swallows the rest of the input.
	Unterminated,
}

/// Raw tokens produced by logos. Only the block literals are significant,
/// everything else is text.
#[derive(Logos, Debug, PartialEq)]
enum RawToken<'s> {
	#[token("{{#if", open_tag)]
	OpenIf(TagBody<'s>),
	#[token("{{#unless", open_tag)]
	OpenUnless(TagBody<'s>),
	#[token("{{else}}")]
	Else,
	#[token("{{/if}}")]
	CloseIf,
	#[token("{{/unless}}")]
	CloseUnless,
	#[token("{")]
	Brace,
	#[regex(r"[^{]+")]
	Text,
}

/// Read the condition of an opening tag up to its closing `}}`.
fn open_tag<'s>(lex: &mut Lexer<'s, RawToken<'s>>) -> TagBody<'s> {
	let remainder = lex.remainder();

	match remainder.find("}}") {
		Some(end) => {
			lex.bump(end + 2);
			TagBody::Condition(&remainder[..end])
		}
		None => {
			lex.bump(remainder.len());
			TagBody::Unterminated
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind<'a> {
	/// Literal text, including any `{` that doesn't start a block tag.
	Text,
	/// `{{#if condition}}` or `{{#unless condition}}`. The condition is `None`
	/// when the tag has no closing `}}`.
	Open {
		kind: BlockKind,
		condition: Option<&'a str>,
	},
	/// `{{else}}`
	Else,
	/// `{{/if}}` or `{{/unless}}`
	Close(BlockKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token<'a> {
	pub kind: TokenKind<'a>,
	/// Byte range of the token within the tokenized source.
	pub span: Range<usize>,
}

impl Token<'_> {
	pub fn is_text(&self) -> bool {
		matches!(self.kind, TokenKind::Text)
	}
}

/// Split a template into block tokens. Adjacent text is merged into a single
/// `Text` token so the token list stays proportional to the number of tags.
pub(crate) fn tokenize(source: &str) -> Vec<Token<'_>> {
	let mut tokens: Vec<Token<'_>> = Vec::new();

	for (result, span) in RawToken::lexer(source).spanned() {
		let kind = match result {
			Ok(RawToken::OpenIf(body)) => open_kind(BlockKind::If, body),
			Ok(RawToken::OpenUnless(body)) => open_kind(BlockKind::Unless, body),
			Ok(RawToken::Else) => TokenKind::Else,
			Ok(RawToken::CloseIf) => TokenKind::Close(BlockKind::If),
			Ok(RawToken::CloseUnless) => TokenKind::Close(BlockKind::Unless),
			Ok(RawToken::Brace | RawToken::Text) | Err(()) => TokenKind::Text,
		};

		if kind == TokenKind::Text {
			if let Some(last) = tokens.last_mut().filter(|token| token.is_text()) {
				last.span.end = span.end;
				continue;
			}
		}

		tokens.push(Token { kind, span });
	}

	tokens
}

fn open_kind(kind: BlockKind, body: TagBody<'_>) -> TokenKind<'_> {
	let condition = match body {
		TagBody::Condition(condition) => Some(condition),
		TagBody::Unterminated => None,
	};

	TokenKind::Open { kind, condition }
}
