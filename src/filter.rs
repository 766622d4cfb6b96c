//! Request path filter.
//!
//! Health checks and static assets would drown the latency numbers of the
//! endpoints that matter, so they are never timed. Neither is an exchange
//! that has already completed: a completion listener registered on it would
//! never fire.

/// Paths starting with any of these are never instrumented.
const IGNORED_PREFIXES: [&str; 2] = ["/ping", "/static"];

/// Paths ending with any of these are never instrumented.
const IGNORED_SUFFIXES: [&str; 2] = [".js", ".css"];

/// Returns `true` if a request for `path` should be timed.
///
/// Pure and allocation-free; safe to call from any number of concurrent
/// requests.
///
/// ```rust
/// use reqmeter::filter::should_instrument;
///
/// assert!(should_instrument("/track", false));
/// assert!(!should_instrument("/ping", false));
/// assert!(!should_instrument("/static/logo.png", false));
/// assert!(!should_instrument("/app.js", false));
/// assert!(!should_instrument("/track", true));
/// ```
pub fn should_instrument(path: &str, already_complete: bool) -> bool {
    !already_complete && !is_ignored_path(path)
}

/// Returns `true` if `path` matches one of the ignored prefixes or suffixes.
///
/// Matching is case-sensitive and over the whole path: `/pingdom` is
/// ignored (prefix `/ping`), `/APP.JS` is not.
pub fn is_ignored_path(path: &str) -> bool {
    IGNORED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || IGNORED_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}
