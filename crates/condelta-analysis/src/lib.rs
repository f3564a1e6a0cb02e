//! # condelta-analysis
//!
//! **Tier 3 (Orchestration)**
//!
//! Analysis orchestration for condelta: given one analysis context per
//! content entry, dispatches to the strategy its method names (whole-file
//! compare, per-suite-module compare, sandbox work-dir compare, build-key or
//! device-image compare) and aggregates the shard results.
//!
//! The boundary is fail-closed: a context that cannot be analyzed is reported
//! as changed, and a request that cannot be interpreted at all yields
//! [`condelta_types::AnalysisOutcome::Unavailable`] so the caller re-runs
//! rather than trusting a stale cache entry.
//!
//! ## Example
//! ```ignore
//! use condelta_analysis::{AnalysisOptions, evaluate};
//! use condelta_metrics::NullMetrics;
//!
//! let outcome = evaluate(&contexts, &AnalysisOptions::default(), &NullMetrics)?;
//! if outcome.treat_as_changed() {
//!     // re-run affected modules
//! }
//! ```

#![forbid(unsafe_code)]

mod config;
mod error;
mod orchestrator;
mod walk;

pub use config::{AnalysisOptions, SandboxCommonDirs};
pub use error::AnalysisError;
pub use orchestrator::evaluate;
pub use walk::walk_reference_tree;
