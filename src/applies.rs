//! Applicability extraction: which identities a policy object targets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::SecurityDescriptor;

/// Well-known extended-right GUID granting "apply policy" on a policy object.
///
/// Only DACL entries scoped to this object GUID participate in applicability.
pub const APPLY_POLICY_RIGHT_GUID: &str = "edacfd8f-ffb3-11d1-b41d-00a0c968f939";

/// Class of a resolved directory object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    /// A user account.
    User,
    /// A security group.
    Group,
    /// A machine account.
    Computer,
}

/// A directory object as returned by SID resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryObject {
    /// Canonical object name.
    pub name: String,
    /// Object class, used to route the name into the right applies bucket.
    pub class: ObjectClass,
}

impl DirectoryObject {
    /// Builds a directory object from a name and class.
    pub fn new<N: Into<String>>(name: N, class: ObjectClass) -> Self {
        Self {
            name: name.into(),
            class,
        }
    }
}

/// SID-to-directory-object resolution, injected by the caller.
///
/// The directory itself is an external collaborator; this trait is the seam
/// that keeps applicability extraction testable without one. A resolver may
/// be expensive or transiently failing; returning `None` is never an error,
/// the unresolved SID is simply skipped.
pub trait AccountResolver {
    /// Resolves a SID string to a directory object, or `None` when the SID
    /// does not resolve to a user, group or computer.
    fn resolve_sid(&self, sid: &str) -> Option<DirectoryObject>;
}

impl<F> AccountResolver for F
where
    F: Fn(&str) -> Option<DirectoryObject>,
{
    fn resolve_sid(&self, sid: &str) -> Option<DirectoryObject> {
        self(sid)
    }
}

/// The resolved set of identities a policy object targets.
///
/// Sets are deduplicated and iterate in sorted order, keeping downstream
/// priority computation deterministic. `hostgroups` is a full targeting
/// dimension but stays empty when extracted from a security descriptor: the
/// directory schema modeled here has no host-group concept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliesSet {
    /// Targeted user names.
    pub users: BTreeSet<String>,
    /// Targeted group names.
    pub groups: BTreeSet<String>,
    /// Targeted host names.
    pub hosts: BTreeSet<String>,
    /// Targeted host-group names (never populated from a descriptor).
    pub hostgroups: BTreeSet<String>,
}

impl AppliesSet {
    /// Extracts the applies sets from a descriptor's DACL.
    ///
    /// Keeps only entries scoped to [`APPLY_POLICY_RIGHT_GUID`], resolves
    /// each entry's SID through `resolver` and routes the resolved name by
    /// object class (`Computer` lands in `hosts`). Entries whose SID does
    /// not resolve are skipped silently.
    pub fn from_descriptor<R>(descriptor: &SecurityDescriptor, resolver: &R) -> Self
    where
        R: AccountResolver + ?Sized,
    {
        let mut applies = Self::default();
        for ace in &descriptor.dacl {
            if !ace.object_guid.eq_ignore_ascii_case(APPLY_POLICY_RIGHT_GUID) {
                continue;
            }
            match resolver.resolve_sid(&ace.account_sid) {
                Some(object) => {
                    let bucket = match object.class {
                        ObjectClass::User => &mut applies.users,
                        ObjectClass::Group => &mut applies.groups,
                        ObjectClass::Computer => &mut applies.hosts,
                    };
                    bucket.insert(object.name);
                }
                None => {
                    debug!(sid = %ace.account_sid, "SID did not resolve, skipping entry");
                }
            }
        }
        applies
    }

    /// True when no dimension targets anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.groups.is_empty()
            && self.hosts.is_empty()
            && self.hostgroups.is_empty()
    }
}
