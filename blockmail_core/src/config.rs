use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::BlockmailError;
use crate::BlockmailResult;
use crate::Context;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"blockmail.toml",
	".blockmail.toml",
	".config/blockmail.toml",
];

/// Default lifetime of a cached context, in seconds.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Options that change how templates are parsed.
///
/// ```toml
/// [render]
/// strict_closers = true
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RenderOptions {
	/// When `false` (the default) a block is terminated by the first closing
	/// tag that brings the nesting depth back to zero, even if it is of the
	/// other kind: `{{#if a}}...{{/unless}}` is accepted. When `true` such a
	/// block is treated as malformed and kept as literal text.
	#[serde(default)]
	pub strict_closers: bool,
}

impl RenderOptions {
	pub fn strict() -> Self {
		Self {
			strict_closers: true,
		}
	}
}

/// Cache settings for contexts produced by a
/// [`ContextProvider`](crate::ContextProvider).
///
/// ```toml
/// [cache]
/// ttl_seconds = 60
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
	#[serde(default = "default_ttl_seconds")]
	pub ttl_seconds: u64,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
		}
	}
}

impl CacheConfig {
	pub fn ttl(&self) -> Duration {
		Duration::from_secs(self.ttl_seconds)
	}
}

fn default_ttl_seconds() -> u64 {
	DEFAULT_CACHE_TTL_SECONDS
}

/// Configuration loaded from a `blockmail.toml` file.
///
/// ```toml
/// [render]
/// strict_closers = false
///
/// [context]
/// site_name = "Our Wedding"
/// rsvp_open = true
///
/// [cache]
/// ttl_seconds = 300
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BlockmailConfig {
	#[serde(default)]
	pub render: RenderOptions,
	/// Default variables, merged beneath every per-recipient context.
	#[serde(default)]
	pub context: Context,
	#[serde(default)]
	pub cache: CacheConfig,
}

impl BlockmailConfig {
	/// Resolve the first config file that exists under `root`.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> BlockmailResult<Option<Self>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::from_toml_str(&content).map(Some)
	}

	pub fn from_toml_str(content: &str) -> BlockmailResult<Self> {
		toml::from_str(content).map_err(|e| BlockmailError::ConfigParse(e.to_string()))
	}

	/// Layer a recipient context over the configured defaults.
	pub fn context_for(&self, recipient: &Context) -> Context {
		Context::layered([&self.context, recipient])
	}
}
