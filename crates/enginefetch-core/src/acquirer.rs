//! Local-first acquisition with a remote fallback chain.
//!
//! # Design
//! - The local build output wins whenever its script exists; a script without either
//!   payload is a malformed build and stops the run before any network access.
//! - Remote candidates are tried strictly in order, each exactly once. Both files of a
//!   candidate are fetched concurrently and buffered; nothing is written to the
//!   destinations unless both downloads succeed.
//! - Every recoverable failure is logged and turned into "try the next candidate".
//! - After distribution both destinations are hashed and compared.

use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use crate::chain::{artifact_url, candidate_chain, commit_base_url, latest_base_url};
use crate::config::AcquireConfig;
use crate::error::{AcquisitionFailure, CandidateError};
use crate::model::{AcquireOutcome, ArtifactPair, Candidate, PairDigests, PayloadKind};
use crate::shell::{ShellRunner, resolve_commit};
use crate::store::ArtifactStore;

/// Payload kind served by the remote store.
const REMOTE_PAYLOAD: PayloadKind = PayloadKind::MemoryImage;

/// Files downloaded for one candidate, held in memory until both are present.
struct Download {
    base_url: String,
    script: Vec<u8>,
    payload: Vec<u8>,
}

/// Drives acquisition over injected shell and store capabilities.
#[derive(Debug)]
pub struct Acquirer<S, A> {
    config: AcquireConfig,
    shell: S,
    store: A,
}

impl<S, A> Acquirer<S, A>
where
    S: ShellRunner,
    A: ArtifactStore,
{
    /// Assemble an acquirer.
    #[must_use]
    pub const fn new(config: AcquireConfig, shell: S, store: A) -> Self {
        Self {
            config,
            shell,
            store,
        }
    }

    /// Settings the acquirer runs with.
    #[must_use]
    pub const fn config(&self) -> &AcquireConfig {
        &self.config
    }

    /// Shell capability in use.
    #[must_use]
    pub const fn shell(&self) -> &S {
        &self.shell
    }

    /// Store capability in use.
    #[must_use]
    pub const fn store(&self) -> &A {
        &self.store
    }

    /// Whether both destinations already hold a script and the same kind of payload.
    ///
    /// Callers compute this once, before [`Self::acquire`] touches anything.
    #[must_use]
    pub fn destinations_hold_pair(&self) -> bool {
        let layout = &self.config.layout;
        let destinations = &self.config.destinations;
        if !self.shell.exists(&destinations.public_script(layout))
            || !self.shell.exists(&destinations.harness_script(layout))
        {
            return false;
        }
        PayloadKind::PREFERENCE.into_iter().any(|kind| {
            destinations
                .payloads(layout, kind)
                .iter()
                .all(|path| self.shell.exists(path))
        })
    }

    /// Make sure a usable pair sits in both destinations.
    ///
    /// `already_cached` is the result of [`Self::destinations_hold_pair`] taken before the
    /// run; it turns an exhausted chain into a stale-but-usable success.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionFailure::MalformedLocalBuild`] for a local script without a
    /// payload, [`AcquisitionFailure::ChainExhausted`] when no candidate worked and nothing
    /// was cached, and [`AcquisitionFailure::Distribution`] when the destinations could not
    /// be written or verified.
    pub async fn acquire(&self, already_cached: bool) -> Result<AcquireOutcome, AcquisitionFailure> {
        self.prepare_destinations();
        if let Some(outcome) = self.acquire_local()? {
            return Ok(outcome);
        }
        self.acquire_remote(already_cached).await
    }

    fn prepare_destinations(&self) {
        for dir in self.config.destinations.dirs() {
            if let Err(err) = self.shell.create_dir_all(dir) {
                error!(dir = %dir.display(), error = %err, "failed to create destination directory");
            }
        }
    }

    fn acquire_local(&self) -> Result<Option<AcquireOutcome>, AcquisitionFailure> {
        let dir = &self.config.local_dir;
        let layout = &self.config.layout;
        if !self.shell.exists(&dir.join(&layout.script)) {
            return Ok(None);
        }

        let Some(kind) = PayloadKind::PREFERENCE
            .into_iter()
            .find(|kind| self.shell.exists(&dir.join(layout.payload_name(*kind))))
        else {
            error!(
                dir = %dir.display(),
                wasm = %layout.wasm,
                memory_image = %layout.memory_image,
                "local build has a script but no payload"
            );
            return Err(AcquisitionFailure::MalformedLocalBuild { dir: dir.clone() });
        };

        let pair = ArtifactPair::in_dir(dir, layout, kind);
        self.remove_payloads(&PayloadKind::PREFERENCE)?;
        self.distribute(&pair)?;
        let digests = self.verify(kind)?;
        info!(
            dir = %dir.display(),
            payload = %kind,
            "copied local build to public and harness directories"
        );
        Ok(Some(AcquireOutcome::Local {
            dir: dir.clone(),
            payload: kind,
            digests,
        }))
    }

    async fn acquire_remote(
        &self,
        already_cached: bool,
    ) -> Result<AcquireOutcome, AcquisitionFailure> {
        info!(
            store = %self.config.store_url,
            "downloading prebuilt artifacts (be patient)"
        );
        let chain = candidate_chain(self.config.ancestors);
        let attempts = chain.len();
        for candidate in chain {
            match self.try_candidate(&candidate).await {
                Ok(download) => return self.install(candidate, download),
                Err(err) => report_skip(&candidate, &err),
            }
        }

        if already_cached {
            info!("no candidate could be downloaded; keeping the artifacts already present");
            return Ok(AcquireOutcome::StaleCache);
        }
        error!(attempts, "no candidate could be downloaded and no cached artifacts exist");
        Err(AcquisitionFailure::ChainExhausted { attempts })
    }

    async fn try_candidate(&self, candidate: &Candidate) -> Result<Download, CandidateError> {
        let base_url = match candidate {
            Candidate::Commit(reference) => {
                let resolved = resolve_commit(&self.shell, reference)?;
                commit_base_url(&self.config.store_url, &resolved.branch, &resolved.hash)
            }
            Candidate::Latest => latest_base_url(&self.config.store_url, &self.config.latest_path),
        };
        info!(candidate = %candidate, base_url = %base_url, "trying candidate");

        let layout = &self.config.layout;
        let script_url = artifact_url(&base_url, &layout.script);
        let payload_url = artifact_url(&base_url, layout.payload_name(REMOTE_PAYLOAD));
        let (script, payload) = tokio::try_join!(
            self.store.fetch(&script_url),
            self.store.fetch(&payload_url)
        )?;
        Ok(Download {
            base_url,
            script,
            payload,
        })
    }

    fn install(
        &self,
        candidate: Candidate,
        download: Download,
    ) -> Result<AcquireOutcome, AcquisitionFailure> {
        let layout = &self.config.layout;
        let destinations = &self.config.destinations;

        self.remove_payloads(&[PayloadKind::Wasm])?;
        let public_script = destinations.public_script(layout);
        let [public_payload, harness_payload] = destinations.payloads(layout, REMOTE_PAYLOAD);
        self.write(&public_script, &download.script)?;
        self.write(&public_payload, &download.payload)?;
        info!(
            candidate = %candidate,
            dir = %destinations.public.display(),
            "artifacts downloaded and stored in public directory"
        );

        self.copy(&public_script, &destinations.harness_script(layout))?;
        self.copy(&public_payload, &harness_payload)?;
        let digests = self.verify(REMOTE_PAYLOAD)?;
        info!(
            dir = %destinations.harness.display(),
            "copied artifacts to harness directory"
        );

        Ok(AcquireOutcome::Remote {
            candidate,
            base_url: download.base_url,
            payload: REMOTE_PAYLOAD,
            digests,
        })
    }

    fn distribute(&self, pair: &ArtifactPair) -> Result<(), AcquisitionFailure> {
        let layout = &self.config.layout;
        let destinations = &self.config.destinations;
        for target in destinations.payloads(layout, pair.kind) {
            self.copy(&pair.payload, &target)?;
        }
        self.copy(&pair.script, &destinations.public_script(layout))?;
        self.copy(&pair.script, &destinations.harness_script(layout))?;
        Ok(())
    }

    fn remove_payloads(&self, kinds: &[PayloadKind]) -> Result<(), AcquisitionFailure> {
        for kind in kinds {
            for path in self.config.destinations.payloads(&self.config.layout, *kind) {
                self.shell
                    .remove(&path)
                    .map_err(|source| AcquisitionFailure::distribution("remove", path, source))?;
            }
        }
        Ok(())
    }

    fn verify(&self, kind: PayloadKind) -> Result<PairDigests, AcquisitionFailure> {
        let layout = &self.config.layout;
        let destinations = &self.config.destinations;
        let script = self.matching_digest(
            &destinations.public_script(layout),
            &destinations.harness_script(layout),
        )?;
        let [public_payload, harness_payload] = destinations.payloads(layout, kind);
        let payload = self.matching_digest(&public_payload, &harness_payload)?;
        Ok(PairDigests { script, payload })
    }

    fn matching_digest(&self, public: &Path, harness: &Path) -> Result<String, AcquisitionFailure> {
        let public_digest = self.digest(public)?;
        let harness_digest = self.digest(harness)?;
        if public_digest != harness_digest {
            return Err(AcquisitionFailure::distribution(
                "verify",
                harness,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("copy differs from {}", public.display()),
                ),
            ));
        }
        Ok(public_digest)
    }

    fn digest(&self, path: &Path) -> Result<String, AcquisitionFailure> {
        let bytes = self
            .shell
            .read(path)
            .map_err(|source| AcquisitionFailure::distribution("read", path, source))?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), AcquisitionFailure> {
        self.shell
            .copy(from, to)
            .map_err(|source| AcquisitionFailure::distribution("copy", to, source))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), AcquisitionFailure> {
        self.shell
            .write(path, contents)
            .map_err(|source| AcquisitionFailure::distribution("write", path, source))
    }
}

fn report_skip(candidate: &Candidate, err: &CandidateError) {
    match err {
        CandidateError::RefResolutionFailed { reason, .. } => warn!(
            candidate = %candidate,
            reason = %reason,
            "can't find the hash or branch of the associated commit"
        ),
        CandidateError::NotYetBuilt { url } => info!(
            candidate = %candidate,
            url = %url,
            "artifact was maybe not built yet, try again in a few minutes"
        ),
        CandidateError::Unreachable { url, message } => warn!(
            candidate = %candidate,
            url = %url,
            error = %message,
            "can't download artifact, please check your internet connection"
        ),
        CandidateError::OtherHttpError { url, status } => warn!(
            candidate = %candidate,
            url = %url,
            status,
            "can't download artifact, try again later"
        ),
    }
}
