pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

// One typed log context per CLI operation
pub fn track() -> LogCtx<ops::track::Track> { LogCtx::new(config::logs_are_json()) }
pub fn check() -> LogCtx<ops::check::Check> { LogCtx::new(config::logs_are_json()) }
pub fn watch() -> LogCtx<ops::watch::Watch> { LogCtx::new(config::logs_are_json()) }
pub fn query() -> LogCtx<ops::query::Query> { LogCtx::new(config::logs_are_json()) }
pub fn extract() -> LogCtx<ops::extract::Extract> { LogCtx::new(config::logs_are_json()) }
pub fn label() -> LogCtx<ops::label::Label> { LogCtx::new(config::logs_are_json()) }
