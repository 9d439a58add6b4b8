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
#![allow(clippy::redundant_pub_crate)]

//! Command-line front end that places the prebuilt engine bundle where the build expects it.
//!
//! Layout:
//! - `cli.rs`: argument parsing, wiring, and the acquisition run
//! - `client.rs`: CLI errors, exit codes, and the shared HTTP client
//! - `output.rs`: final report rendering
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod output;

pub use cli::run;
