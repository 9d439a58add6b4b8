#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Acquisition of prebuilt engine artifacts with a prioritised fallback chain.
//!
//! Layout: `model.rs` (artifact, candidate and destination types), `error.rs`
//! (per-candidate and fatal errors), `config.rs` (validated acquisition settings),
//! `chain.rs` (candidate ordering and store URLs), `shell.rs` (filesystem and
//! version-control capability), `store.rs` (remote artifact store), `acquirer.rs`
//! (the local-first, remote-fallback acquisition flow).

pub mod acquirer;
pub mod chain;
pub mod config;
pub mod error;
pub mod model;
pub mod shell;
pub mod store;

pub use acquirer::Acquirer;
pub use chain::{artifact_url, candidate_chain, commit_base_url, latest_base_url};
pub use config::AcquireConfig;
pub use error::{AcquisitionFailure, CandidateError, ConfigError};
pub use model::{
    AcquireOutcome, ArtifactLayout, ArtifactPair, Candidate, CandidateSource,
    DEFAULT_HARNESS_SCRIPT_NAME, DEFAULT_MEMORY_IMAGE_NAME, DEFAULT_SCRIPT_NAME,
    DEFAULT_WASM_NAME, DestinationSet, PairDigests, PayloadKind,
};
pub use shell::{
    CommandOutput, ResolvedCommit, ShellCommand, ShellRunner, SystemShell, resolve_commit,
};
pub use store::{ArtifactStore, HttpStore, classify_status};
