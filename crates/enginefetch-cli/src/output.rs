//! Final report rendering.

use anyhow::anyhow;
use enginefetch_core::{AcquireOutcome, Candidate, PairDigests, PayloadKind};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

#[derive(Debug, Serialize)]
struct Report<'a> {
    run_id: &'a str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<&'a Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<PayloadKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digests: Option<&'a PairDigests>,
}

impl<'a> Report<'a> {
    fn new(outcome: &'a AcquireOutcome, run_id: &'a str) -> Self {
        let (candidate, payload) = match outcome {
            AcquireOutcome::Local { payload, .. } => (None, Some(*payload)),
            AcquireOutcome::Remote {
                candidate, payload, ..
            } => (Some(candidate), Some(*payload)),
            AcquireOutcome::StaleCache => (None, None),
        };
        Self {
            run_id,
            outcome: outcome.label(),
            source: outcome.source().map(|source| source.to_string()),
            candidate,
            payload,
            digests: outcome.digests(),
        }
    }

    fn table(&self) -> String {
        let mut lines = vec![format!("outcome: {}", self.outcome)];
        if let Some(source) = &self.source {
            lines.push(format!("source: {source}"));
        }
        if let Some(candidate) = self.candidate {
            lines.push(format!("candidate: {candidate}"));
        }
        if let Some(payload) = self.payload {
            lines.push(format!("payload: {payload}"));
        }
        if let Some(digests) = self.digests {
            lines.push(format!("script sha256: {}", digests.script));
            lines.push(format!("payload sha256: {}", digests.payload));
        }
        if self.source.is_none() {
            lines.push("note: kept the artifacts already present".to_string());
        }
        lines.push(format!("run: {}", self.run_id));
        lines.join("\n")
    }
}

pub(crate) fn render_outcome(
    outcome: &AcquireOutcome,
    run_id: &str,
    format: OutputFormat,
) -> CliResult<()> {
    println!("{}", format_outcome(outcome, run_id, format)?);
    Ok(())
}

fn format_outcome(outcome: &AcquireOutcome, run_id: &str, format: OutputFormat) -> CliResult<String> {
    let report = Report::new(outcome, run_id);
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}"))),
        OutputFormat::Table => Ok(report.table()),
    }
}
