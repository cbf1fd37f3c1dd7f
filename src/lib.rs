//! # Directory profile resolution core
//!
//! Building blocks for resolving directory-distributed desktop
//! configuration profiles on a client machine. The crate decides *which*
//! policy objects apply to a requesting identity and *how* the applicable
//! settings combine into one effective document per namespace:
//! - [`SecurityDescriptor`] / [`Ace`]: parsed SDDL security descriptors
//!   with their serialization inverse.
//! - [`AppliesSet`]: the users, groups and hosts a policy object targets,
//!   extracted from its descriptor through an injected [`AccountResolver`].
//! - [`PriorityKey`] and [`GlobalPolicy`]: sortable composite precedence
//!   keys under an administrator-selected dimension ordering.
//! - [`SettingsCompiler`]: folds ordered settings documents into
//!   [`CompiledSettings`] using per-namespace merge policies.
//!
//! ## Overview
//! Directory access, document retrieval and the per-application deployment
//! adapters are external collaborators. Everything here is synchronous and
//! pure over its inputs: malformed descriptors, unresolved SIDs and
//! unparseable documents degrade to "that profile contributes nothing",
//! never to an aborted run.
//!
//! ## Examples
//! ### Extract who a policy object applies to
//! ```rust
//! use directory_profiles::{
//!     AppliesSet, DirectoryObject, ObjectClass, SecurityDescriptor,
//! };
//!
//! let sddl =
//!     "O:DAG:DUD:(OA;;CR;edacfd8f-ffb3-11d1-b41d-00a0c968f939;;S-1-5-21-0-0-1111)";
//! let descriptor: SecurityDescriptor = sddl.parse()?;
//!
//! // The directory lookup is injected; any `Fn(&str) -> Option<DirectoryObject>` works.
//! let resolver = |sid: &str| {
//!     (sid == "S-1-5-21-0-0-1111")
//!         .then(|| DirectoryObject::new("editors", ObjectClass::Group))
//! };
//! let applies = AppliesSet::from_descriptor(&descriptor, &resolver);
//! assert!(applies.groups.contains("editors"));
//! # Ok::<(), directory_profiles::MalformedDescriptor>(())
//! ```
//!
//! ### Order candidates and compile their settings
//! ```rust
//! use directory_profiles::{
//!     AppliesSet, GlobalPolicy, Identity, PriorityKey, SettingsCompiler,
//! };
//! use serde_json::json;
//!
//! let identity = Identity::new("myuser", vec!["editors".to_owned()], "myhost");
//! let mut applies = AppliesSet::default();
//! applies.users.insert("myuser".to_owned());
//!
//! let key = PriorityKey::generate(&identity, 100, GlobalPolicy::default(), &applies);
//! assert_eq!(key.as_str(), "00100_00000_00000_00000");
//! assert!(!key.matches_none());
//!
//! // Candidates sorted by ascending key, then compiled lowest first.
//! let compiled = SettingsCompiler::new().compile([
//!     [("org.gnome.gsettings".to_owned(), json!([{"key": "/a", "value": 1}]))].into(),
//!     [("org.gnome.gsettings".to_owned(), json!([{"key": "/a", "value": 2}]))].into(),
//! ]);
//! assert_eq!(
//!     compiled.get("org.gnome.gsettings"),
//!     Some(&json!([{"key": "/a", "value": 2}])),
//! );
//! ```

#![warn(missing_docs)]

mod ace;
mod applies;
mod compiler;
mod merge;
mod priority;
mod profile;
mod security_descriptor;
mod serde_impl;

pub use ace::Ace;
pub use applies::{
    APPLY_POLICY_RIGHT_GUID, AccountResolver, AppliesSet, DirectoryObject, ObjectClass,
};
pub use compiler::{CompiledSettings, SettingsCompiler, SettingsDocument};
pub use merge::MergePolicy;
/// Error raised for SDDL strings that cannot be decomposed.
///
/// Re-exported from the parsing layer; fatal only to the one profile whose
/// descriptor failed to parse.
pub use parsing::MalformedDescriptor;
pub use priority::{
    Dimension, GlobalPolicy, Identity, InvalidGlobalPolicy, NO_MATCH_PRIORITY, PriorityKey,
};
pub use profile::{
    DEFAULT_PRIORITY, GLOBAL_POLICY_NAMESPACE, GLOBAL_POLICY_PROFILE_NAME, Profile, ProfileData,
    UnparseableDocument, global_policy_from_document,
};
pub use security_descriptor::SecurityDescriptor;
