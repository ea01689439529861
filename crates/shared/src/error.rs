use serde::{Deserialize, Serialize};

/// Body shape the API returns when it rejects a mutating action: a list of
/// human-readable messages, surfaced verbatim in the client's error slot.
/// A rejection is never a process-level error on this side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorsBody {
    #[serde(default)]
    pub errors: Vec<String>,
}
