use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tracing::debug;

use crate::BlockmailResult;
use crate::Context;

/// A source of render contexts, such as site-wide settings loaded from a
/// database. Closures returning a context are providers too.
pub trait ContextProvider {
	fn load(&self) -> BlockmailResult<Context>;
}

impl<F> ContextProvider for F
where
	F: Fn() -> BlockmailResult<Context>,
{
	fn load(&self) -> BlockmailResult<Context> {
		self()
	}
}

/// A context together with the moment it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedContext {
	context: Context,
	/// `None` never expires.
	expires_at: Option<SystemTime>,
}

impl CachedContext {
	pub fn new(context: Context, expires_at: Option<SystemTime>) -> Self {
		Self {
			context,
			expires_at,
		}
	}

	/// Cache `context` for `ttl` starting at `now`. A ttl too large to
	/// represent never expires.
	pub fn with_ttl(context: Context, now: SystemTime, ttl: Duration) -> Self {
		Self::new(context, now.checked_add(ttl))
	}

	pub fn is_expired(&self, now: SystemTime) -> bool {
		self.expires_at.is_some_and(|expires_at| now >= expires_at)
	}

	pub fn expires_at(&self) -> Option<SystemTime> {
		self.expires_at
	}

	pub fn context(&self) -> &Context {
		&self.context
	}

	pub fn into_context(self) -> Context {
		self.context
	}
}

/// Caller-owned cache in front of a [`ContextProvider`]. The provider is only
/// asked for a new context once the cached one has expired.
///
/// The current time is always passed in, so the cache holds no hidden clock
/// and behaves the same in tests.
#[derive(Debug)]
pub struct ContextCache<P> {
	provider: P,
	ttl: Duration,
	cached: Option<CachedContext>,
}

impl<P> ContextCache<P>
where
	P: ContextProvider,
{
	pub fn new(provider: P, ttl: Duration) -> Self {
		Self {
			provider,
			ttl,
			cached: None,
		}
	}

	/// The cached context, reloading it from the provider when missing or
	/// expired at `now`. A failed reload leaves the cache empty.
	pub fn get(&mut self, now: SystemTime) -> BlockmailResult<&Context> {
		let cached = match self.cached.take() {
			Some(cached) if !cached.is_expired(now) => cached,
			_ => {
				let context = self.provider.load()?;
				let cached = CachedContext::with_ttl(context, now, self.ttl);
				debug!(
					variables = cached.context().len(),
					expires_at_unix_ms = ?cached.expires_at().map(unix_ms),
					"reloaded context"
				);
				cached
			}
		};

		Ok(self.cached.insert(cached).context())
	}

	/// The currently cached entry, if any, without reloading.
	pub fn peek(&self) -> Option<&CachedContext> {
		self.cached.as_ref()
	}

	/// Drop the cached context so the next [`ContextCache::get`] reloads it.
	pub fn invalidate(&mut self) {
		self.cached = None;
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}
}

fn unix_ms(time: SystemTime) -> u64 {
	time.duration_since(UNIX_EPOCH)
		.ok()
		.and_then(|duration| duration.as_millis().try_into().ok())
		.unwrap_or(0)
}
