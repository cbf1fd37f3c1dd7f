//! Settings compilation: folding ordered documents into effective settings.

use std::collections::BTreeMap;
use std::collections::btree_map;

use delegate::delegate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::MergePolicy;

/// One profile's settings contribution: namespace name to payload.
pub type SettingsDocument = BTreeMap<String, Value>;

/// Secondary namespace whose compiled result is additionally folded into
/// [`FOLD_TARGET_NAMESPACE`]: both are consumed by the same downstream
/// deployment mechanism.
const FOLD_SOURCE_NAMESPACE: &str = "org.libreoffice.registry";
const FOLD_TARGET_NAMESPACE: &str = "org.gnome.gsettings";

/// Folds ordered settings documents into one effective document per
/// namespace.
///
/// Documents are supplied in increasing precedence order: later documents
/// overwrite or extend earlier ones according to each namespace's
/// [`MergePolicy`]. The compiler holds no state between runs; independent
/// compilations may run concurrently.
///
/// # Examples
/// ```rust
/// use directory_profiles::SettingsCompiler;
/// use serde_json::json;
///
/// let weak = [(
///     "org.gnome.gsettings".to_owned(),
///     json!([{"key": "/desktop/background", "value": "'#FFFFFF'"}]),
/// )]
/// .into();
/// let strong = [(
///     "org.gnome.gsettings".to_owned(),
///     json!([{"key": "/desktop/background", "value": "'#000000'"}]),
/// )]
/// .into();
///
/// let compiled = SettingsCompiler::new().compile([weak, strong]);
/// let effective = compiled.get("org.gnome.gsettings");
/// assert_eq!(
///     effective,
///     Some(&json!([{"key": "/desktop/background", "value": "'#000000'"}])),
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsCompiler;

impl SettingsCompiler {
    /// Creates a compiler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compiles parsed documents, lowest precedence first.
    pub fn compile<I>(&self, documents: I) -> CompiledSettings
    where
        I: IntoIterator<Item = SettingsDocument>,
    {
        let mut compiled = BTreeMap::new();
        for document in documents {
            for (namespace, payload) in document {
                merge_into(&mut compiled, &namespace, payload);
            }
        }

        // The secondary namespace keeps its own result; a copy of it is
        // folded into the primary one after the per-namespace pass.
        if let Some(folded) = compiled.get(FOLD_SOURCE_NAMESPACE).cloned() {
            merge_into(&mut compiled, FOLD_TARGET_NAMESPACE, folded);
        }

        debug!(namespaces = compiled.len(), "settings compilation finished");
        CompiledSettings { inner: compiled }
    }

    /// Compiles raw document bytes, lowest precedence first.
    ///
    /// A document that fails to parse as JSON is logged and contributes
    /// nothing; it never aborts compilation of the remaining documents.
    pub fn compile_raw<I, B>(&self, documents: I) -> CompiledSettings
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        self.compile(documents.into_iter().filter_map(|bytes| {
            match serde_json::from_slice::<SettingsDocument>(bytes.as_ref()) {
                Ok(document) => Some(document),
                Err(err) => {
                    error!(%err, "ignoring unparseable settings document");
                    None
                }
            }
        }))
    }
}

fn merge_into(compiled: &mut BTreeMap<String, Value>, namespace: &str, payload: Value) {
    let policy = MergePolicy::for_namespace(namespace);
    let next = match compiled.get(namespace) {
        Some(existing) => policy.merge(namespace, existing, &payload),
        None => payload,
    };
    compiled.insert(namespace.to_owned(), next);
}

/// The effective settings of one compilation run, keyed by namespace.
///
/// Built fresh per run and handed to deployment adapters; this core knows
/// nothing about their output formats.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledSettings {
    inner: BTreeMap<String, Value>,
}

impl CompiledSettings {
    delegate! {
        to self.inner {
            /// The resolved payload for a namespace, when present.
            #[call(get)]
            pub fn get(&self, namespace: &str) -> Option<&Value>;
            /// True when a namespace received any settings.
            #[call(contains_key)]
            pub fn contains_namespace(&self, namespace: &str) -> bool;
            /// Number of namespaces with settings.
            pub fn len(&self) -> usize;
            /// True when no namespace received settings.
            pub fn is_empty(&self) -> bool;
            /// Iterates namespaces and payloads in namespace order.
            pub fn iter(&self) -> btree_map::Iter<'_, String, Value>;
        }
    }

    /// Consumes the result into its namespace map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.inner
    }
}

impl<'a> IntoIterator for &'a CompiledSettings {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
