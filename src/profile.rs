//! Candidate profiles and their fetched settings documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::compiler::SettingsDocument;
use crate::{AppliesSet, GlobalPolicy, PriorityKey};

/// Priority applied when a settings document does not declare one.
pub const DEFAULT_PRIORITY: u32 = 50;

/// Namespace carrying the global-policy permutation index.
pub const GLOBAL_POLICY_NAMESPACE: &str = "org.freedesktop.DirectoryProfiles";

/// Display name of the reserved profile that distributes the global policy.
pub const GLOBAL_POLICY_PROFILE_NAME: &str = "GLOBAL_POLICY__DO_NOT_MODIFY";

/// One directory policy object, as listed from the directory.
///
/// `applies` is derived once from the object's security descriptor; the
/// declared priority and settings only become known when the associated
/// [`ProfileData`] document is fetched from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Directory object identifier.
    pub id: String,
    /// Human-readable profile name.
    pub display_name: String,
    /// Storage path of the associated settings document.
    pub storage_path: String,
    /// Identities this profile targets.
    pub applies: AppliesSet,
}

impl Profile {
    /// File name under which this profile's settings are cached so that
    /// lexical file name order equals ascending priority-key order.
    ///
    /// Layout: `{priority:05}_{priority key}-{display name}`, with spaces in
    /// the display name replaced by underscores.
    #[must_use]
    pub fn cache_file_name(&self, priority: u32, key: &PriorityKey) -> String {
        format!(
            "{:05}_{}-{}",
            priority,
            key,
            self.display_name.replace(' ', "_")
        )
    }

    /// True for the reserved profile that distributes the global policy
    /// index; its document is read once per run instead of being merged.
    #[must_use]
    pub fn carries_global_policy(&self) -> bool {
        self.display_name == GLOBAL_POLICY_PROFILE_NAME
    }
}

/// Error raised when a fetched settings document is not valid JSON.
#[derive(Debug, Error)]
#[error("settings document is not valid JSON: {0}")]
pub struct UnparseableDocument(#[from] serde_json::Error);

/// A profile's fetched settings document: a declared priority plus one
/// settings payload per namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    /// Declared priority; [`DEFAULT_PRIORITY`] when absent.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Per-namespace settings payloads.
    #[serde(default)]
    pub settings: SettingsDocument,
}

impl ProfileData {
    /// Parses a settings document from raw fetched bytes.
    ///
    /// # Errors
    /// [`UnparseableDocument`] when the bytes are not a valid JSON document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, UnparseableDocument> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

const fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

/// Reads the global-policy permutation index out of a settings document.
///
/// Looks up the `global_policy` entry of [`GLOBAL_POLICY_NAMESPACE`]; an
/// absent or out-of-range value degrades to the default permutation.
#[must_use]
pub fn global_policy_from_document(settings: &SettingsDocument) -> GlobalPolicy {
    let Some(index) = settings
        .get(GLOBAL_POLICY_NAMESPACE)
        .and_then(|namespace| namespace.get("global_policy"))
        .and_then(Value::as_u64)
    else {
        return GlobalPolicy::default();
    };
    GlobalPolicy::from_index(index).unwrap_or_else(|err| {
        warn!(%err, "ignoring invalid global policy index");
        GlobalPolicy::default()
    })
}
