//! Profile and import execution pipelines (§4.C8, §4.C9): the orchestration
//! layer sitting above `reef-catalog`/`reef-delta`/`reef-destinations`/
//! `reef-sources`/`reef-email`, owning phase sequencing, retry, and the
//! `Execution` record each run produces.

pub mod db;
pub mod error;
pub mod filename;
pub mod import_pipeline;
pub mod ingest;
pub mod output;
pub mod profile_pipeline;
pub mod reporter;
pub mod split;

pub use db::{execute_with_retry, query_retry_delay, query_with_retry, DbClient, DbError};
pub use error::PipelineError;
pub use filename::{expand as expand_filename, FilenameContext};
pub use import_pipeline::{run_import, ImportRunInputs};
pub use output::{render_csv, render_custom, render_json, render_xml, TransformContext};
pub use profile_pipeline::{run_profile, ProfileRunInputs};
pub use reporter::{NullReporter, Reporter, VecReporter};
pub use split::{batch, group_by_split_key, SplitGroup};
