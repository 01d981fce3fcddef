use std::path::Path;
use std::path::PathBuf;
use std::process;

use blockmail_cli::BlockmailCli;
use blockmail_cli::Commands;
use blockmail_cli::OutputFormat;
use blockmail_core::BlockmailConfig;
use blockmail_core::BlockmailError;
use blockmail_core::BlockmailResult;
use blockmail_core::Context;
use blockmail_core::RenderOptions;
use blockmail_core::Template;
use blockmail_core::TemplateDiagnostic;
use blockmail_core::Value;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

/// Log filter environment variable, e.g. `BLOCKMAIL_LOG=debug`.
const LOG_ENV: &str = "BLOCKMAIL_LOG";

fn main() {
	let args = BlockmailCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Render {
			template,
			context,
			vars,
			expand_only,
		}) => run_render(&args, template, context.as_deref(), vars, *expand_only),
		Some(Commands::Check { templates, format }) => run_check(&args, templates, *format),
		Some(Commands::Vars { template }) => run_vars(&args, template),
		None => {
			eprintln!("No subcommand specified. Run `blockmail --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<BlockmailError>() {
			Ok(blockmail_err) => {
				let report: miette::Report = (*blockmail_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Logs go to stderr so rendered output on stdout stays clean.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.try_init()
		.ok();
}

fn resolve_root(args: &BlockmailCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(args: &BlockmailCli) -> BlockmailResult<BlockmailConfig> {
	let root = resolve_root(args);
	let config = BlockmailConfig::load(&root)?;

	match &config {
		Some(_) => {
			debug!(path = ?BlockmailConfig::resolve_path(&root), "loaded config");
		}
		None => debug!(root = %root.display(), "no config file found; using defaults"),
	}

	Ok(config.unwrap_or_default())
}

/// `--strict` always wins over the config file.
fn render_options(args: &BlockmailCli, config: &BlockmailConfig) -> RenderOptions {
	RenderOptions {
		strict_closers: args.strict || config.render.strict_closers,
	}
}

fn read_template(path: &Path) -> BlockmailResult<String> {
	Ok(std::fs::read_to_string(path)?)
}

/// Parse a `--var name=value` argument.
fn parse_var(raw: &str) -> BlockmailResult<(String, Value)> {
	let Some((name, value)) = raw.split_once('=') else {
		return Err(BlockmailError::ContextParse(format!(
			"`{raw}` is not a NAME=VALUE pair"
		)));
	};

	let name = name.trim();
	if name.is_empty() {
		return Err(BlockmailError::ContextParse(format!(
			"`{raw}` has an empty variable name"
		)));
	}

	Ok((name.to_string(), Value::parse_loose(value)))
}

fn run_render(
	args: &BlockmailCli,
	template_path: &Path,
	context_path: Option<&Path>,
	vars: &[String],
	expand_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(args)?;
	let options = render_options(args, &config);
	let source = read_template(template_path)?;

	let mut context = config.context.clone();
	if let Some(context_path) = context_path {
		let json = std::fs::read_to_string(context_path).map_err(BlockmailError::from)?;
		context.merge(&Context::from_json_str(&json)?);
	}
	for raw in vars {
		let (name, value) = parse_var(raw)?;
		context.set(name, value);
	}

	let template = Template::parse_with_options(&source, &options);
	if args.verbose {
		for name in template.missing_variables(&context) {
			eprintln!(
				"{} variable `{name}` is not set and renders as an empty string",
				colored!("warning:", yellow)
			);
		}
	}

	let output = if expand_only {
		template.expand(&context)
	} else {
		template.render(&context)
	};

	print!("{output}");
	if !output.ends_with('\n') {
		println!();
	}

	Ok(())
}

fn run_check(
	args: &BlockmailCli,
	templates: &[PathBuf],
	format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(args)?;
	let options = render_options(args, &config);

	let mut reports = Vec::with_capacity(templates.len());
	for path in templates {
		let source = read_template(path)?;
		let diagnostics = Template::parse_with_options(&source, &options)
			.diagnostics()
			.to_vec();
		reports.push((path, diagnostics));
	}

	let problems: usize = reports.iter().map(|(_, diagnostics)| diagnostics.len()).sum();

	match format {
		OutputFormat::Json => {
			let files: Vec<serde_json::Value> = reports
				.iter()
				.map(|(path, diagnostics)| {
					let problems: Vec<serde_json::Value> =
						diagnostics.iter().map(diagnostic_json).collect();
					serde_json::json!({
						"file": path.display().to_string(),
						"problems": problems,
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": problems == 0,
				"files": files,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			for (path, diagnostics) in &reports {
				if diagnostics.is_empty() {
					println!("{} {}", colored!("ok", green), path.display());
					continue;
				}

				for diagnostic in diagnostics {
					let point = diagnostic.point();
					println!(
						"{} {}:{}:{}: {}",
						severity_label(diagnostic),
						path.display(),
						point.line,
						point.column,
						BlockmailError::from(diagnostic)
					);
				}
			}

			if problems == 0 {
				println!("\nCheck passed: no problems found.");
			} else {
				println!(
					"\n{}",
					colored!(format!("Check failed: {problems} problem(s) found."), bold)
				);
			}
		}
	}

	if problems > 0 {
		process::exit(1);
	}

	Ok(())
}

/// Accepted mismatched closers still render, so they are only warnings.
fn severity_label(diagnostic: &TemplateDiagnostic) -> String {
	match diagnostic {
		TemplateDiagnostic::MismatchedClose { accepted: true, .. } => colored!("warning", yellow),
		_ => colored!("error", red),
	}
}

fn diagnostic_json(diagnostic: &TemplateDiagnostic) -> serde_json::Value {
	let point = diagnostic.point();
	let error = BlockmailError::from(diagnostic);
	let code = miette::Diagnostic::code(&error).map(|code| code.to_string());

	serde_json::json!({
		"code": code,
		"line": point.line,
		"column": point.column,
		"message": error.to_string(),
	})
}

fn run_vars(args: &BlockmailCli, template_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(args)?;
	let options = render_options(args, &config);
	let source = read_template(template_path)?;
	let template = Template::parse_with_options(&source, &options);

	for name in template.variables() {
		println!("{name}");
	}

	Ok(())
}
