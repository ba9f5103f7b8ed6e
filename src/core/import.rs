//! Import of an uploaded `mcpServers` configuration document.
//!
//! The document maps server names to launch descriptions. A malformed
//! document or a missing `mcpServers` key aborts the whole import; a single
//! malformed entry is skipped while the rest proceed.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::api::ServerSpec;

#[derive(Deserialize)]
struct ImportedServer {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
}

pub struct ImportOutcome {
    pub specs: Vec<ServerSpec>,
    /// Entries dropped for a per-entry validation failure: (name, reason).
    pub skipped: Vec<(String, String)>,
}

/// Parse an import document into registration payloads. Entries come back in
/// name order; absent `args` becomes `[]` and absent `env` becomes `{}`.
pub fn parse_import(contents: &str) -> Result<ImportOutcome, String> {
    let document: Value =
        serde_json::from_str(contents).map_err(|e| format!("invalid JSON: {e}"))?;
    let servers = document
        .get("mcpServers")
        .ok_or_else(|| "document has no 'mcpServers' key".to_string())?;

    // Entries are validated one at a time so a single bad entry cannot sink
    // the rest of the upload.
    let entries: BTreeMap<String, Value> = serde_json::from_value(servers.clone())
        .map_err(|e| format!("'mcpServers' is not an object: {e}"))?;

    let mut outcome = ImportOutcome {
        specs: Vec::new(),
        skipped: Vec::new(),
    };
    for (name, value) in entries {
        if name.is_empty() {
            outcome
                .skipped
                .push((name, "server name must be non-empty".to_string()));
            continue;
        }
        match serde_json::from_value::<ImportedServer>(value) {
            Ok(server) => outcome.specs.push(ServerSpec {
                name,
                command: server.command,
                args: server.args,
                env: Some(server.env),
            }),
            Err(e) => outcome.skipped.push((name, e.to_string())),
        }
    }
    Ok(outcome)
}
