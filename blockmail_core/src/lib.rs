//! `blockmail_core` renders personalized text, such as email subjects and
//! bodies, from a template and a flat per-recipient [`Context`].
//!
//! Templates mix literal text with two kinds of markup:
//!
//! - conditional blocks, `{{#if cond}}...{{else}}...{{/if}}` and
//!   `{{#unless cond}}...{{/unless}}`, nested to any depth;
//! - bare variables, `{{name}}`, replaced in a single final pass.
//!
//! ## Processing Pipeline
//!
//! ```text
//! template
//!   → Lexer (logos; block tags and text)
//!   → Block matcher (depth tracking, optional same-depth else)
//!   → Template tree (Literal / Block nodes, branches parsed recursively)
//!   → Expander (evaluates conditions, selects branches)
//!   → Variable substitutor
//!   → rendered string
//! ```
//!
//! Rendering never fails. Malformed markup is kept as literal text, logged
//! with `tracing`, and reported through [`Template::diagnostics`].
//!
//! ## Conditions
//!
//! - `name` is true when the value is truthy: a `true` boolean, a non-zero
//!   number, a non-empty array, or a non-empty string other than `"null"` and
//!   `"undefined"`.
//! - `name === 'value'` and `name !== 'value'` compare without coercion, so a
//!   boolean `true` is never `=== 'true'`.
//! - `name == value` and `name != value` coerce the variable first, so a
//!   boolean `true` is `== 'true'`.
//!
//! ## Quick Start
//!
//! ```rust
//! use blockmail_core::Context;
//! use blockmail_core::render;
//!
//! let context = Context::new()
//! 	.with("name", "Alice")
//! 	.with("rsvp_status", "attending");
//! let template = "Hi {{name}}! {{#if rsvp_status === 'attending'}}See you soon{{else}}Sorry to \
//!                 miss you{{/if}}";
//!
//! assert_eq!(render(template, &context), "Hi Alice! See you soon");
//! ```

pub use condition::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use matcher::*;
pub use position::*;
pub use provider::*;
pub use substitute::*;
pub use template::*;
pub use value::*;

mod condition;
pub mod config;
mod context;
#[allow(unused_assignments)]
mod error;
pub(crate) mod lexer;
mod matcher;
mod position;
mod provider;
mod substitute;
mod template;
mod value;


/// Render `template` with the default, lenient options.
pub fn render(template: &str, context: &Context) -> String {
	render_with_options(template, context, &RenderOptions::default())
}

/// Expand every conditional block and then substitute variables.
pub fn render_with_options(template: &str, context: &Context, options: &RenderOptions) -> String {
	Template::parse_with_options(template, options).render(context)
}

/// Expand every conditional block, leaving `{{name}}` variables in place.
pub fn expand_blocks(template: &str, context: &Context, options: &RenderOptions) -> String {
	Template::parse_with_options(template, options).expand(context)
}
