//! Backward taint tracer, sink dispatcher, include resolution and the
//! public scan API for PHP (spec §2 items 2-7).
//!
//! [`scan_parser`] and [`analyse_params`] are the two entry points spec §6
//! names; everything else here is their supporting machinery, organized
//! one module per spec component:
//!
//! - [`oracle`] — the controllability oracle (§4.1)
//! - [`tracer`] — the backward parameter tracer and its sub-tracers (§4.3-4.7)
//! - [`deep`] — the deep tracer with include-following (§4.8)
//! - [`includes`] — the constant resolver (§4.9)
//! - [`dispatch`] — the sink dispatcher (§4.10)
//! - [`new_rule`] — the typed record emitted for code 4 (`NEW_RULE`)

pub mod api;
pub mod deep;
pub mod dispatch;
pub mod includes;
pub mod new_rule;
pub mod oracle;
pub mod tracer;

pub use api::{analyse_params, scan_parser};
pub use deep::trace_deep;
pub use dispatch::dispatch;
pub use new_rule::{NewRule, NewRuleKind};
pub use tracer::{trace_symbol, TraceCtx};
