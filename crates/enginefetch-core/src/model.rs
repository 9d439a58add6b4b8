//! Artifact, candidate, and destination types shared by the acquisition flow.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Payload variants an engine build ships alongside its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// WebAssembly binary produced by newer toolchains.
    Wasm,
    /// Memory-image file produced by older toolchains.
    MemoryImage,
}

impl PayloadKind {
    /// Payload kinds in local preference order.
    pub const PREFERENCE: [Self; 2] = [Self::Wasm, Self::MemoryImage];

    /// Stable label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wasm => "wasm",
            Self::MemoryImage => "memory_image",
        }
    }
}

impl Display for PayloadKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Default script file name.
pub const DEFAULT_SCRIPT_NAME: &str = "libGD.js";
/// Default WebAssembly payload file name.
pub const DEFAULT_WASM_NAME: &str = "libGD.wasm";
/// Default memory-image payload file name.
pub const DEFAULT_MEMORY_IMAGE_NAME: &str = "libGD.js.mem";
/// Default script name inside the test-harness directory.
pub const DEFAULT_HARNESS_SCRIPT_NAME: &str = "index.js";

/// File names that make up an artifact pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    /// Script file name, used as-is in the build output, the store, and the public directory.
    pub script: String,
    /// WebAssembly payload file name.
    pub wasm: String,
    /// Memory-image payload file name.
    pub memory_image: String,
    /// Name the script takes inside the test-harness directory.
    pub harness_script: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            script: DEFAULT_SCRIPT_NAME.to_string(),
            wasm: DEFAULT_WASM_NAME.to_string(),
            memory_image: DEFAULT_MEMORY_IMAGE_NAME.to_string(),
            harness_script: DEFAULT_HARNESS_SCRIPT_NAME.to_string(),
        }
    }
}

impl ArtifactLayout {
    /// File name of the given payload kind.
    #[must_use]
    pub fn payload_name(&self, kind: PayloadKind) -> &str {
        match kind {
            PayloadKind::Wasm => &self.wasm,
            PayloadKind::MemoryImage => &self.memory_image,
        }
    }
}

/// Script and payload located in a concrete directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair {
    /// Path to the script file.
    pub script: PathBuf,
    /// Path to the payload file.
    pub payload: PathBuf,
    /// Kind of payload referenced by `payload`.
    pub kind: PayloadKind,
}

impl ArtifactPair {
    /// Resolve the pair for `kind` inside `dir` using the layout's source names.
    #[must_use]
    pub fn in_dir(dir: &Path, layout: &ArtifactLayout, kind: PayloadKind) -> Self {
        Self {
            script: dir.join(&layout.script),
            payload: dir.join(layout.payload_name(kind)),
            kind,
        }
    }
}

/// Point in version history used to locate a remote build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reference", rename_all = "snake_case")]
pub enum Candidate {
    /// A git revision such as `HEAD` or `HEAD~2`.
    Commit(String),
    /// The store's general-purpose latest build.
    Latest,
}

impl Display for Candidate {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit(reference) => formatter.write_str(reference),
            Self::Latest => formatter.write_str("latest"),
        }
    }
}

/// Where an acquired pair came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// A local build output directory.
    Local(PathBuf),
    /// A remote base URL.
    Remote(String),
}

impl Display for CandidateSource {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(dir) => write!(formatter, "{}", dir.display()),
            Self::Remote(base_url) => formatter.write_str(base_url),
        }
    }
}

/// The two directories that must both hold a usable pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSet {
    /// Public-serving directory; receives the script under its source name.
    pub public: PathBuf,
    /// Test-harness directory; receives the script under the harness name.
    pub harness: PathBuf,
}

impl DestinationSet {
    /// Both directories, public first.
    #[must_use]
    pub fn dirs(&self) -> [&Path; 2] {
        [&self.public, &self.harness]
    }

    /// Script path inside the public directory.
    #[must_use]
    pub fn public_script(&self, layout: &ArtifactLayout) -> PathBuf {
        self.public.join(&layout.script)
    }

    /// Script path inside the harness directory.
    #[must_use]
    pub fn harness_script(&self, layout: &ArtifactLayout) -> PathBuf {
        self.harness.join(&layout.harness_script)
    }

    /// Payload paths for `kind` in both directories, public first.
    #[must_use]
    pub fn payloads(&self, layout: &ArtifactLayout, kind: PayloadKind) -> [PathBuf; 2] {
        let name = layout.payload_name(kind);
        [self.public.join(name), self.harness.join(name)]
    }
}

/// SHA-256 digests of a distributed pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairDigests {
    /// Hex digest of the script.
    pub script: String,
    /// Hex digest of the payload.
    pub payload: String,
}

/// Successful result of an acquisition run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The pair was copied from the local build output.
    Local {
        /// Build output directory the pair was copied from.
        dir: PathBuf,
        /// Payload kind that was distributed.
        payload: PayloadKind,
        /// Digests of the distributed files.
        digests: PairDigests,
    },
    /// The pair was downloaded from the remote store.
    Remote {
        /// Candidate that produced the artifact.
        candidate: Candidate,
        /// Base URL the files were fetched from.
        base_url: String,
        /// Payload kind that was distributed.
        payload: PayloadKind,
        /// Digests of the distributed files.
        digests: PairDigests,
    },
    /// Every remote candidate failed but the destinations already held a pair.
    StaleCache,
}

impl AcquireOutcome {
    /// Short label for logs and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Remote { .. } => "remote",
            Self::StaleCache => "stale_cache",
        }
    }

    /// Source of the acquired pair; `None` when a cached copy was kept.
    #[must_use]
    pub fn source(&self) -> Option<CandidateSource> {
        match self {
            Self::Local { dir, .. } => Some(CandidateSource::Local(dir.clone())),
            Self::Remote { base_url, .. } => Some(CandidateSource::Remote(base_url.clone())),
            Self::StaleCache => None,
        }
    }

    /// Digests of the distributed files, when anything was distributed.
    #[must_use]
    pub const fn digests(&self) -> Option<&PairDigests> {
        match self {
            Self::Local { digests, .. } | Self::Remote { digests, .. } => Some(digests),
            Self::StaleCache => None,
        }
    }
}
