use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render and lint personalized email templates.",
	long_about = "blockmail renders email subjects and bodies from templates that mix literal text \
	              with conditional blocks ({{#if}}, {{#unless}}, {{else}}) and {{name}} \
	              variables.\n\nQuick start:\n  blockmail render invite.txt --var name=Alice\n  \
	              blockmail check  invite.txt\n  blockmail vars   invite.txt"
)]
pub struct BlockmailCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory, where `blockmail.toml` is looked
	/// up.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,

	/// Treat a block closed by a tag of the other kind as malformed instead of
	/// accepting the closer. Overrides `[render] strict_closers`.
	#[arg(long, global = true, default_value_t = false)]
	pub strict: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render a template and print the result.
	///
	/// Variables come from the `[context]` table of `blockmail.toml`, then
	/// from `--context`, then from each `--var`. Later sources win.
	Render {
		/// The template file to render.
		template: PathBuf,

		/// A JSON file holding a flat object of variables.
		#[arg(long, short)]
		context: Option<PathBuf>,

		/// A single variable as `name=value`. `true`, `false`, `null` and
		/// numbers keep their type. May be repeated.
		#[arg(long = "var", value_name = "NAME=VALUE")]
		vars: Vec<String>,

		/// Only expand conditional blocks and leave `{{name}}` variables in
		/// place.
		#[arg(long, default_value_t = false)]
		expand_only: bool,
	},
	/// Report malformed markup in one or more templates.
	///
	/// Exits with a non-zero status code if any template has diagnostics.
	/// Rendering never fails on malformed markup, so this is the way to
	/// catch it before a template is sent.
	Check {
		/// The template files to check.
		#[arg(required = true)]
		templates: Vec<PathBuf>,

		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List every variable a template refers to.
	Vars {
		/// The template file to inspect.
		template: PathBuf,
	},
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Text,
	Json,
}
