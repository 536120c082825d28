//! Push command handler
//!
//! Sends one snapshot to the sync endpoint, the same way the form does on a
//! timer fire.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

use intake_core::schema::{parse_partial, SchemaError};
use intake_core::{Config, PartialPatientRecord, SyncClient};

use crate::output::Output;

/// Read a JSON snapshot from a file, or stdin when `source` is `-`
fn read_source(source: &str) -> Result<Vec<u8>> {
    if source == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        return Ok(buf);
    }

    std::fs::read(Path::new(source)).with_context(|| format!("Failed to read {}", source))
}

/// Validate locally so field errors are reported before anything is sent
fn parse_snapshot(bytes: &[u8]) -> Result<PartialPatientRecord> {
    match parse_partial(bytes) {
        Ok(record) => Ok(record),
        Err(SchemaError::Invalid(errors)) => {
            let details: Vec<String> = errors
                .iter()
                .map(|e| format!("  {}: {}", e.field, e.message))
                .collect();
            bail!("Invalid snapshot:\n{}", details.join("\n"))
        }
        Err(e) => Err(e).context("Invalid snapshot"),
    }
}

/// Post a snapshot from `source` to the configured server
pub async fn push(config: &Config, source: &str, output: &Output) -> Result<()> {
    let record = parse_snapshot(&read_source(source)?)?;
    let client = SyncClient::from_config(config);

    client
        .push(&record)
        .await
        .with_context(|| format!("Failed to push snapshot to {}", client.url()))?;

    output.print_record(&record)?;
    output.success(&format!("Snapshot sent to {}", client.url()));
    Ok(())
}
