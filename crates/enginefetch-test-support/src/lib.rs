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

//! Shared test doubles for acquisition suites.
//! Layout: shell.rs (in-memory filesystem and scripted git), store.rs (scripted artifact store).

pub mod shell;
pub mod store;

pub use shell::FakeShell;
pub use store::{FakeResponse, FakeStore};
