use logos::Lexer;
use logos::Logos;
use tracing::trace;

use crate::Context;

/// Tokens for the substitution pass. Anything that isn't a bare variable
/// reference is copied through untouched, including leftover block syntax.
#[derive(Logos, Debug, PartialEq)]
enum SubstitutionToken<'s> {
	#[regex(
		r"\{\{[ \t\r\n]*[a-zA-Z_][a-zA-Z0-9_]*[ \t\r\n]*\}\}",
		variable_name
	)]
	Variable(&'s str),
	/// `else` is a block keyword, never a variable name.
	#[token("{{else}}")]
	Else,
	#[token("{")]
	Brace,
	#[regex(r"[^{]+")]
	Text,
}

/// `{{ else }}` with padding is still block syntax, so it is left as text.
fn variable_name<'s>(lex: &mut Lexer<'s, SubstitutionToken<'s>>) -> Option<&'s str> {
	let slice = lex.slice();
	let name = slice[2..slice.len() - 2].trim();
	(name != "else").then_some(name)
}

/// Replace every `{{name}}` in `text` with the string form of the matching
/// context value. Missing variables and `null` values become empty strings.
///
/// This is a single pass: substituted values are never scanned again.
pub fn substitute_variables(text: &str, context: &Context) -> String {
	let mut output = String::with_capacity(text.len());
	for (token, span) in SubstitutionToken::lexer(text).spanned() {
		match token {
			Ok(SubstitutionToken::Variable(name)) => {
				if let Some(value) = context.get(name) {
					output.push_str(&value.to_string());
				} else {
					trace!(name, "undefined variable substituted with an empty string");
				}
			}
			Ok(SubstitutionToken::Else | SubstitutionToken::Brace | SubstitutionToken::Text)
			| Err(()) => {
				output.push_str(&text[span]);
			}
		}
	}

	output
}

/// Every variable name referenced by a bare `{{name}}` token in `text`, in
/// order of appearance.
pub fn referenced_variables(text: &str) -> Vec<&str> {
	SubstitutionToken::lexer(text)
		.filter_map(|token| {
			match token {
				Ok(SubstitutionToken::Variable(name)) => Some(name),
				_ => None,
			}
		})
		.collect()
}
