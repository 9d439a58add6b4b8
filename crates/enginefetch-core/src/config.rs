//! Acquisition settings and their validation.
//!
//! # Design
//! - Defaults mirror the repository layout the tool is run from (`newIDE/app/scripts`).
//! - Validation is explicit and returns the first offending field.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::ConfigError;
use crate::model::{ArtifactLayout, DestinationSet};

/// Default artifact store root.
pub const DEFAULT_STORE_URL: &str = "https://s3.amazonaws.com/gdevelop-gdevelop.js";
/// Default store path of the latest known-good build.
pub const DEFAULT_LATEST_PATH: &str = "master/latest";
/// Default number of ancestor commits tried after `HEAD`.
pub const DEFAULT_ANCESTORS: u8 = 3;
/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default local build output directory.
pub const DEFAULT_LOCAL_DIR: &str = "../../Binaries/embuild/GDevelop.js";
/// Default public-serving destination.
pub const DEFAULT_PUBLIC_DIR: &str = "../public";
/// Default test-harness destination.
pub const DEFAULT_HARNESS_DIR: &str = "../node_modules/libGD.js-for-tests-only";

/// Everything the acquirer needs to know about paths, the store, and file names.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Local build output directory probed first.
    pub local_dir: PathBuf,
    /// Directories that receive the pair.
    pub destinations: DestinationSet,
    /// Git working tree used to resolve commit candidates.
    pub repo_dir: PathBuf,
    /// Root of the remote artifact store.
    pub store_url: Url,
    /// Store path, relative to `store_url`, of the latest build.
    pub latest_path: String,
    /// Number of ancestor commits tried after `HEAD`.
    pub ancestors: u8,
    /// File names of the pair.
    pub layout: ArtifactLayout,
}

impl AcquireConfig {
    /// Build a configuration with default paths and layout for the given store.
    #[must_use]
    pub fn with_store(store_url: Url) -> Self {
        Self {
            local_dir: PathBuf::from(DEFAULT_LOCAL_DIR),
            destinations: DestinationSet {
                public: PathBuf::from(DEFAULT_PUBLIC_DIR),
                harness: PathBuf::from(DEFAULT_HARNESS_DIR),
            },
            repo_dir: PathBuf::from("."),
            store_url,
            latest_path: DEFAULT_LATEST_PATH.to_string(),
            ancestors: DEFAULT_ANCESTORS,
            layout: ArtifactLayout::default(),
        }
    }

    /// Check that the settings describe a usable acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first field that is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.store_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidField {
                field: "store_url",
                reason: "must use http or https",
                value: Some(self.store_url.to_string()),
            });
        }
        if self.latest_path.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidField {
                field: "latest_path",
                reason: "must not be empty",
                value: Some(self.latest_path.clone()),
            });
        }
        for (field, name) in [
            ("script", &self.layout.script),
            ("wasm", &self.layout.wasm),
            ("memory_image", &self.layout.memory_image),
            ("harness_script", &self.layout.harness_script),
        ] {
            validate_file_name(field, name)?;
        }
        if self.layout.wasm == self.layout.memory_image {
            return Err(ConfigError::InvalidField {
                field: "memory_image",
                reason: "must differ from the wasm payload name",
                value: Some(self.layout.memory_image.clone()),
            });
        }
        if self.destinations.public == self.destinations.harness {
            return Err(ConfigError::InvalidField {
                field: "harness_dir",
                reason: "must differ from the public directory",
                value: Some(self.destinations.harness.display().to_string()),
            });
        }
        if self.destinations.dirs().contains(&self.local_dir.as_path()) {
            return Err(ConfigError::InvalidField {
                field: "local_dir",
                reason: "must differ from both destination directories",
                value: Some(self.local_dir.display().to_string()),
            });
        }
        Ok(())
    }
}

fn validate_file_name(field: &'static str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            reason: "must not be empty",
            value: None,
        });
    }
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains(['/', '\\']) {
        return Err(ConfigError::InvalidField {
            field,
            reason: "must be a bare file name",
            value: Some(name.to_string()),
        });
    }
    Ok(())
}
