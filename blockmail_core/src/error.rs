use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum BlockmailError {
	#[error(transparent)]
	#[diagnostic(code(blockmail::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(blockmail::config_parse),
		help("check that blockmail.toml is valid TOML with [render], [context] and/or [cache] sections")
	)]
	ConfigParse(String),

	#[error("failed to parse template context: {0}")]
	#[diagnostic(
		code(blockmail::context_parse),
		help("the context must be a flat JSON object")
	)]
	ContextParse(String),

	#[error("unsupported value for variable `{name}`: {reason}")]
	#[diagnostic(
		code(blockmail::unsupported_value),
		help("variables may only hold strings, booleans, numbers, arrays of strings or null")
	)]
	UnsupportedValue { name: String, reason: String },

	#[error("context provider failed: {0}")]
	#[diagnostic(code(blockmail::context_provider))]
	ContextProvider(String),

	#[error("opening `{kind}` tag at {line}:{column} is never terminated with `}}}}`")]
	#[diagnostic(
		code(blockmail::unterminated_tag),
		help("close the tag, e.g. `{{{{#{kind} condition}}}}`")
	)]
	UnterminatedTag {
		kind: String,
		line: usize,
		column: usize,
	},

	#[error("`{kind}` block `{condition}` opened at {line}:{column} is never closed")]
	#[diagnostic(
		code(blockmail::unclosed_block),
		help("add `{{{{/{kind}}}}}` to close this block")
	)]
	UnclosedBlock {
		kind: String,
		condition: String,
		line: usize,
		column: usize,
	},

	#[error("`{expected}` block `{condition}` is closed by `{{{{/{found}}}}}` at {line}:{column}")]
	#[diagnostic(
		code(blockmail::mismatched_close),
		help("close the block with `{{{{/{expected}}}}}`")
	)]
	MismatchedClose {
		expected: String,
		found: String,
		condition: String,
		line: usize,
		column: usize,
	},

	#[error("`{tag}` at {line}:{column} does not belong to any block")]
	#[diagnostic(
		code(blockmail::stray_tag),
		help("remove the tag or add the block it belongs to")
	)]
	StrayTag {
		tag: String,
		line: usize,
		column: usize,
	},

	#[error("invalid condition `{condition}` at {line}:{column}: {reason}")]
	#[diagnostic(
		code(blockmail::invalid_condition),
		help("conditions look like `name`, `name === 'value'`, `name !== 'value'`, `name == value` or `name != value`")
	)]
	InvalidCondition {
		condition: String,
		reason: String,
		line: usize,
		column: usize,
	},

	#[error("`{kind}` block at {line}:{column} is nested more than {limit} levels deep")]
	#[diagnostic(
		code(blockmail::nesting_too_deep),
		help("flatten the template; the block is rendered as literal text")
	)]
	NestingTooDeep {
		kind: String,
		limit: usize,
		line: usize,
		column: usize,
	},
}

pub type BlockmailResult<T> = Result<T, BlockmailError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
