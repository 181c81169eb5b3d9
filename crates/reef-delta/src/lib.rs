//! Delta-sync engine (§4.C4): canonicalises rows, hashes them with
//! [`reef_hash`], classifies them against previously committed state in
//! the catalog, and commits the new state only after a caller confirms the
//! delivery step succeeded.

mod canonical;
mod classify;
mod engine;
mod error;

pub use canonical::{
    build_canonical_row, canonicalize_value, normalize_reef_id, raw_reef_id, row_hash,
    schema_fingerprint,
};
pub use classify::{classify, Classification};
pub use engine::{ComputeResult, DeltaSyncEngine, BASELINE_EXECUTION_ID};
pub use error::DeltaError;
