//! CLI error type, exit codes, and the HTTP client used for the artifact store.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use enginefetch_core::{AcquisitionFailure, ConfigError};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
/// Arguments or settings were rejected before anything ran.
pub(crate) const EXIT_VALIDATION: i32 = 2;
/// The run started but could not leave a usable pair behind.
pub(crate) const EXIT_FAILURE: i32 = 3;
/// The log subscriber could not be installed.
pub(crate) const EXIT_LOGGING: i32 = 4;

/// Why a run ended without a usable pair.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => EXIT_VALIDATION,
            Self::Failure(_) => EXIT_FAILURE,
        }
    }

    pub(crate) fn from_config(err: &ConfigError) -> Self {
        let ConfigError::InvalidField {
            field,
            reason,
            value,
        } = err;
        Self::Validation(match value {
            Some(value) => format!("invalid {field} '{value}': {reason}"),
            None => format!("invalid {field}: {reason}"),
        })
    }

    pub(crate) fn from_acquisition(err: AcquisitionFailure) -> Self {
        let detail = match &err {
            AcquisitionFailure::MalformedLocalBuild { dir } => format!(
                "local build in {} has a script but no payload; rebuild it or remove the script",
                dir.display()
            ),
            AcquisitionFailure::ChainExhausted { attempts } => format!(
                "none of the {attempts} candidate builds could be downloaded and no artifacts are cached; check your internet connection"
            ),
            AcquisitionFailure::Distribution {
                operation, path, ..
            } => format!("{operation} failed for {}", path.display()),
        };
        Self::Failure(anyhow::Error::new(err).context(detail))
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(message) => formatter.write_str(message),
            Self::Failure(error) => write!(formatter, "{error:#}"),
        }
    }
}

impl std::error::Error for CliError {}

/// HTTP client for the artifact store.
///
/// Every request carries the run identifier so store access logs can be matched to a
/// run, and gives up after `timeout_secs`.
pub(crate) fn store_client(timeout_secs: u64, run_id: &str) -> CliResult<Client> {
    let request_id = HeaderValue::from_str(run_id)
        .map_err(|_| CliError::failure(anyhow!("run id '{run_id}' is not a valid header value")))?;
    let headers = HeaderMap::from_iter([(HeaderName::from_static(HEADER_REQUEST_ID), request_id)]);

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(|err| CliError::failure(anyhow!("cannot build the store client: {err}")))
}

/// Parse the artifact store URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn exit_codes_separate_validation_from_failure() {
        assert_eq!(CliError::Validation("bad".to_string()).exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn config_errors_become_validation() {
        let err = CliError::from_config(&ConfigError::InvalidField {
            field: "store_url",
            reason: "must use http or https",
            value: Some("file:///tmp".to_string()),
        });
        assert!(matches!(
            err,
            CliError::Validation(ref message) if message == "invalid store_url 'file:///tmp': must use http or https"
        ));
    }

    #[test]
    fn distribution_failure_message_keeps_source() {
        let err = CliError::from_acquisition(AcquisitionFailure::Distribution {
            operation: "copy",
            path: PathBuf::from("public/libGD.js"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        });
        assert_eq!(err.exit_code(), 3);
        let message = err.to_string();
        assert!(message.starts_with("copy failed for public/libGD.js"));
        assert!(message.ends_with("permission denied"));
    }

    #[test]
    fn parse_url_rejects_garbage() {
        assert!(parse_url("not a url").is_err());
        assert!(parse_url("https://s3.amazonaws.com/gdevelop-gdevelop.js").is_ok());
    }

    #[tokio::test]
    async fn client_sends_request_id() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/master/latest/libGD.js")
                .header(HEADER_REQUEST_ID, "run-42");
            then.status(200);
        });

        let client = store_client(5, "run-42").map_err(|err| anyhow!(err.to_string()))?;
        client
            .get(server.url("/master/latest/libGD.js"))
            .send()
            .await?;

        mock.assert();
        Ok(())
    }
}
