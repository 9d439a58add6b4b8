//! Candidate ordering and remote URL construction.
//!
//! The chain runs newest first: the artifact for the exact current commit is the best
//! match for the sources being built, ancestors cover merge commits whose own build is
//! still pending, and the latest build closes the chain.

use url::Url;

use crate::model::Candidate;

/// Ordered candidates: `HEAD`, then `ancestors` parents (`HEAD~1`, `HEAD~2`, ...), then latest.
#[must_use]
pub fn candidate_chain(ancestors: u8) -> Vec<Candidate> {
    let mut chain = Vec::with_capacity(usize::from(ancestors) + 2);
    chain.push(Candidate::Commit("HEAD".to_string()));
    chain.extend((1..=ancestors).map(|depth| Candidate::Commit(format!("HEAD~{depth}"))));
    chain.push(Candidate::Latest);
    chain
}

/// Base URL of the build for `hash` on `branch`.
#[must_use]
pub fn commit_base_url(store: &Url, branch: &str, hash: &str) -> String {
    format!("{}/{branch}/commit/{hash}", store_root(store))
}

/// Base URL of the latest build.
#[must_use]
pub fn latest_base_url(store: &Url, latest_path: &str) -> String {
    format!("{}/{}", store_root(store), latest_path.trim_matches('/'))
}

/// URL of `file` under `base_url`.
#[must_use]
pub fn artifact_url(base_url: &str, file: &str) -> String {
    format!("{}/{file}", base_url.trim_end_matches('/'))
}

fn store_root(store: &Url) -> &str {
    store.as_str().trim_end_matches('/')
}
