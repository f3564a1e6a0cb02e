//! Error taxonomy for analysis orchestration.
//!
//! Every variant here is caught at the orchestrator boundary and converted to
//! a fail-closed verdict; only an invalid context under strict mode escapes
//! to the caller.

use std::path::PathBuf;

use condelta_catalog::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("manifest problem for {entry}: {source}")]
    Catalog {
        entry: String,
        #[source]
        source: CatalogError,
    },

    #[error("analysis aborted for {entry}: {reason}")]
    Aborted { entry: String, reason: String },

    #[error("no known common-directory mapping for entry {entry}")]
    UnknownCommonDirectory { entry: String },

    #[error("context for {entry} is missing a base or current manifest location")]
    InvalidContext { entry: String },

    #[error("FILE analysis for {entry} has no reference directory")]
    MissingReferenceDir { entry: String },

    #[error("failed to walk reference tree {path}: {source}")]
    ReferenceWalk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}
