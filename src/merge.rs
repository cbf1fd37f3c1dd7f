//! Per-namespace merge policies for settings documents.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

/// Identity field used by the keyed-overwrite fallback.
const DEFAULT_KEY_FIELD: &str = "key";

/// How two payloads of one namespace combine.
///
/// Selected per namespace through [`MergePolicy::for_namespace`]; namespaces
/// without a mapping use the keyed fallback. The original dispatch was a
/// registry of merger classes; a closed set of behaviors maps naturally onto
/// a tagged enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Entries are a list of records identified by `key_field`; a later
    /// record overwrites an earlier one sharing the same identity, new
    /// identities are appended.
    Keyed {
        /// Name of the identity field inside each entry.
        key_field: &'static str,
    },
    /// The payload is a map from record id to record; later documents
    /// replace records wholesale by id, with no field-level merging.
    RecordReplace,
    /// Keyed overwrite, except the entry named by `distinguished_key` holds
    /// a tree of folders and leaves that is merged recursively instead of
    /// replaced.
    Tree {
        /// Identity value of the tree-carrying entry.
        distinguished_key: &'static str,
    },
}

impl MergePolicy {
    /// Resolves the merge policy for a namespace.
    pub fn for_namespace(namespace: &str) -> Self {
        match namespace {
            "org.freedesktop.NetworkManager" => Self::Keyed { key_field: "uuid" },
            "org.gnome.online-accounts" => Self::RecordReplace,
            "org.chromium.Policies" | "com.google.chrome.Policies" => Self::Tree {
                distinguished_key: "ManagedBookmarks",
            },
            // org.gnome.gsettings, org.libreoffice.registry,
            // org.mozilla.firefox and org.mozilla.firefox.Bookmarks all use
            // the default keyed policy, as does any unmapped namespace.
            _ => Self::Keyed {
                key_field: DEFAULT_KEY_FIELD,
            },
        }
    }

    /// Merges an incoming payload over an existing one.
    ///
    /// `incoming` carries higher precedence. Payloads whose shape does not
    /// match the policy contribute nothing; they never abort a run.
    pub fn merge(self, namespace: &str, existing: &Value, incoming: &Value) -> Value {
        match self {
            Self::Keyed { key_field } => merge_keyed(namespace, key_field, None, existing, incoming),
            Self::RecordReplace => merge_records(namespace, existing, incoming),
            Self::Tree { distinguished_key } => merge_keyed(
                namespace,
                DEFAULT_KEY_FIELD,
                Some(distinguished_key),
                existing,
                incoming,
            ),
        }
    }
}

/// Views a payload as a list of entries, logging and yielding nothing on a
/// shape mismatch.
fn entry_list<'v>(namespace: &str, payload: &'v Value) -> &'v [Value] {
    match payload.as_array() {
        Some(entries) => entries,
        None => {
            warn!(%namespace, "expected a list of settings entries, ignoring payload");
            &[]
        }
    }
}

/// Keyed overwrite over entry lists, optionally tree-merging one
/// distinguished entry.
///
/// First-insertion order is kept for unrelated identities; entries missing
/// the identity field share a single slot where the last one wins.
fn merge_keyed(
    namespace: &str,
    key_field: &str,
    distinguished_key: Option<&str>,
    existing: &Value,
    incoming: &Value,
) -> Value {
    let mut order: Vec<Option<String>> = Vec::new();
    let mut slots: HashMap<Option<String>, Value> = HashMap::new();

    for payload in [existing, incoming] {
        for entry in entry_list(namespace, payload) {
            let key = entry
                .get(key_field)
                .and_then(Value::as_str)
                .map(str::to_owned);
            let merged = match (&key, distinguished_key, slots.get(&key)) {
                (Some(key), Some(marker), Some(previous)) if key == marker => {
                    merge_tree_entry(previous, entry)
                }
                _ => entry.clone(),
            };
            if !slots.contains_key(&key) {
                order.push(key.clone());
            }
            slots.insert(key, merged);
        }
    }

    Value::Array(
        order
            .into_iter()
            .filter_map(|key| slots.remove(&key))
            .collect(),
    )
}

/// Replaces the distinguished entry's `value` with the recursive merge of
/// both bookmark trees; falls back to the incoming entry when either side
/// is not a tree.
fn merge_tree_entry(previous: &Value, incoming: &Value) -> Value {
    let (Some(old_tree), Some(new_tree)) = (
        previous.get("value").and_then(Value::as_array),
        incoming.get("value").and_then(Value::as_array),
    ) else {
        return incoming.clone();
    };
    let mut entry = incoming.clone();
    if let Some(fields) = entry.as_object_mut() {
        fields.insert(
            "value".to_owned(),
            Value::Array(merge_tree(old_tree, new_tree)),
        );
    }
    entry
}

/// Recursive bookmark-tree merge.
///
/// Folder nodes (those with a `children` list) merge with a same-named
/// existing folder: existing children keep their order, incoming children
/// append unless structurally identical to one already present. Leaf nodes
/// append unless structurally identical to an existing node. A folder with
/// no same-named counterpart is appended wholesale.
fn merge_tree(existing: &[Value], incoming: &[Value]) -> Vec<Value> {
    let mut result = existing.to_vec();
    for node in incoming {
        let Some(children) = node.get("children").and_then(Value::as_array) else {
            if !result.contains(node) {
                result.push(node.clone());
            }
            continue;
        };
        let name = node.get("name");
        let counterpart = result.iter().position(|candidate| {
            candidate.get("name") == name && candidate.get("children").is_some()
        });
        match counterpart {
            Some(slot) => {
                let merged = {
                    let folder = &result[slot];
                    let present = folder
                        .get("children")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    merge_tree(present, children)
                };
                if let Some(folder) = result[slot].as_object_mut() {
                    folder.insert("children".to_owned(), Value::Array(merged));
                }
            }
            None => result.push(node.clone()),
        }
    }
    result
}

/// Whole-record replacement keyed by record id.
fn merge_records(namespace: &str, existing: &Value, incoming: &Value) -> Value {
    let mut records = existing.as_object().cloned().unwrap_or_else(|| {
        warn!(%namespace, "expected a record map, dropping existing payload");
        serde_json::Map::new()
    });
    match incoming.as_object() {
        Some(incoming) => {
            for (id, record) in incoming {
                records.insert(id.clone(), record.clone());
            }
        }
        None => warn!(%namespace, "expected a record map, ignoring payload"),
    }
    Value::Object(records)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn keyed() -> MergePolicy {
        MergePolicy::for_namespace("org.gnome.gsettings")
    }

    #[test]
    fn policy_table_resolves_known_namespaces() {
        assert_eq!(
            MergePolicy::for_namespace("org.freedesktop.NetworkManager"),
            MergePolicy::Keyed { key_field: "uuid" }
        );
        assert_eq!(
            MergePolicy::for_namespace("org.gnome.online-accounts"),
            MergePolicy::RecordReplace
        );
        assert_eq!(
            MergePolicy::for_namespace("org.chromium.Policies"),
            MergePolicy::Tree {
                distinguished_key: "ManagedBookmarks"
            }
        );
        assert_eq!(
            MergePolicy::for_namespace("com.example.unmapped"),
            MergePolicy::Keyed { key_field: "key" }
        );
    }

    #[test]
    fn keyed_overwrite_later_value_wins() {
        let merged = keyed().merge(
            "org.gnome.gsettings",
            &json!([{"key": "x", "value": 1}]),
            &json!([{"key": "x", "value": 2}]),
        );
        assert_eq!(merged, json!([{"key": "x", "value": 2}]));
    }

    #[test]
    fn keyed_overwrite_disjoint_keys_union() {
        let a = json!([{"key": "a", "value": 1}]);
        let b = json!([{"key": "b", "value": 2}]);
        let ab = keyed().merge("ns", &a, &b);
        let ba = keyed().merge("ns", &b, &a);
        let mut ab = ab.as_array().cloned().unwrap_or_default();
        let mut ba = ba.as_array().cloned().unwrap_or_default();
        let sort = |list: &mut Vec<Value>| {
            list.sort_by_key(|entry| entry.get("key").and_then(Value::as_str).map(str::to_owned));
        };
        sort(&mut ab);
        sort(&mut ba);
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 2);
    }

    #[test]
    fn alternate_identity_field_merges_by_uuid() {
        let policy = MergePolicy::for_namespace("org.freedesktop.NetworkManager");
        let merged = policy.merge(
            "org.freedesktop.NetworkManager",
            &json!([
                {"uuid": "601d", "id": "Company VPN", "data": "old"},
                {"uuid": "c2e7", "id": "Marketing VPN", "data": "mkt"},
            ]),
            &json!([
                {"uuid": "601d", "id": "Company VPN", "data": "new"},
                {"uuid": "cf1b", "id": "IT VPN", "data": "it"},
            ]),
        );
        assert_eq!(
            merged,
            json!([
                {"uuid": "601d", "id": "Company VPN", "data": "new"},
                {"uuid": "c2e7", "id": "Marketing VPN", "data": "mkt"},
                {"uuid": "cf1b", "id": "IT VPN", "data": "it"},
            ])
        );
    }

    #[test]
    fn record_replace_has_no_field_union() {
        let policy = MergePolicy::for_namespace("org.gnome.online-accounts");
        let merged = policy.merge(
            "org.gnome.online-accounts",
            &json!({"A": {"Provider": "google", "MailEnabled": true}}),
            &json!({
                "A": {"Provider": "google", "ContactsEnabled": true},
                "B": {"Provider": "owncloud"},
            }),
        );
        assert_eq!(
            merged,
            json!({
                "A": {"Provider": "google", "ContactsEnabled": true},
                "B": {"Provider": "owncloud"},
            })
        );
    }

    #[test]
    fn bookmarks_tree_merges_recursively() {
        let policy = MergePolicy::for_namespace("org.chromium.Policies");
        let merged = policy.merge(
            "org.chromium.Policies",
            &json!([
                {"key": "ShutUpAndTakeMyMoney", "value": "FullMoney"},
                {"key": "FooBarBaz", "value": "BooFarFaz"},
                {"key": "ManagedBookmarks", "value": [
                    {"name": "Fedora", "children": [
                        {"name": "Get Fedora", "url": "https://getfedora.org/"},
                        {"name": "Fedora Project", "url": "https://start.fedoraproject.org/"},
                    ]},
                    {"name": "FreeIPA", "url": "http://freeipa.org"},
                    {"name": "Project Github", "url": "https://github.com/example/"},
                ]},
            ]),
            &json!([
                {"key": "ShutUpAndTakeMyMoney", "value": "NoMoney"},
                {"key": "AllWorkAndNoPlay", "value": "MakesJackADullBoy"},
                {"key": "ManagedBookmarks", "value": [
                    {"name": "Fedora", "children": [
                        {"name": "Get Fedora NOW!!!", "url": "https://getfedora.org/"},
                        {"name": "Fedora Project", "url": "https://start.fedoraproject.org/"},
                        {"name": "The Chromium Projects", "url": "https://www.chromium.org/"},
                        {"name": "SSSD", "url": "pagure.org/SSSD"},
                    ]},
                    {"name": "FreeIPA", "url": "http://freeipa.org"},
                    {"name": "Project Docs", "url": "http://example.org/documentation.html"},
                ]},
            ]),
        );
        assert_eq!(
            merged,
            json!([
                {"key": "ShutUpAndTakeMyMoney", "value": "NoMoney"},
                {"key": "FooBarBaz", "value": "BooFarFaz"},
                {"key": "ManagedBookmarks", "value": [
                    {"name": "Fedora", "children": [
                        {"name": "Get Fedora", "url": "https://getfedora.org/"},
                        {"name": "Fedora Project", "url": "https://start.fedoraproject.org/"},
                        {"name": "Get Fedora NOW!!!", "url": "https://getfedora.org/"},
                        {"name": "The Chromium Projects", "url": "https://www.chromium.org/"},
                        {"name": "SSSD", "url": "pagure.org/SSSD"},
                    ]},
                    {"name": "FreeIPA", "url": "http://freeipa.org"},
                    {"name": "Project Github", "url": "https://github.com/example/"},
                    {"name": "Project Docs", "url": "http://example.org/documentation.html"},
                ]},
                {"key": "AllWorkAndNoPlay", "value": "MakesJackADullBoy"},
            ])
        );
    }

    #[test]
    fn entries_without_identity_share_one_slot() {
        let merged = keyed().merge(
            "ns",
            &json!([{"value": "first"}]),
            &json!([{"value": "second"}]),
        );
        assert_eq!(merged, json!([{"value": "second"}]));
    }

    #[test]
    fn mismatched_shapes_contribute_nothing() {
        let merged = keyed().merge(
            "ns",
            &json!([{"key": "kept", "value": 1}]),
            &json!({"not": "a list"}),
        );
        assert_eq!(merged, json!([{"key": "kept", "value": 1}]));
    }
}
