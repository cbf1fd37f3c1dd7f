//! Priority key generation: ordering candidate profiles by how they match.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppliesSet;

/// Sub-priority field emitted for a targeting dimension that does not match.
pub const NO_MATCH_PRIORITY: &str = "00000";

/// One targeting dimension of a priority key.
///
/// `HostGroup` is carried as a first-class dimension even though the
/// directory schema modeled here never populates it; matching stays uniform
/// across all four dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Profile targets the requesting user directly.
    User,
    /// Profile targets one of the requesting user's groups.
    Group,
    /// Profile targets the requesting host.
    Host,
    /// Profile targets one of the requesting host's host groups.
    HostGroup,
}

use Dimension::{Group, Host, HostGroup, User};

/// All 24 permutations of the four dimensions, 1-indexed by global policy.
///
/// Index 1 is `user, group, host, hostgroup`; the full table enumerates the
/// permutations in the fixed canonical order administrators select from.
const GLOBAL_POLICY_ORDERINGS: [[Dimension; 4]; 24] = [
    [User, Group, Host, HostGroup],
    [User, Group, HostGroup, Host],
    [User, Host, Group, HostGroup],
    [User, Host, HostGroup, Group],
    [User, HostGroup, Group, Host],
    [User, HostGroup, Host, Group],
    [Group, User, Host, HostGroup],
    [Group, User, HostGroup, Host],
    [Group, Host, User, HostGroup],
    [Group, Host, HostGroup, User],
    [Group, HostGroup, User, Host],
    [Group, HostGroup, Host, User],
    [Host, User, Group, HostGroup],
    [Host, User, HostGroup, Group],
    [Host, Group, User, HostGroup],
    [Host, Group, HostGroup, User],
    [Host, HostGroup, User, Group],
    [Host, HostGroup, Group, User],
    [HostGroup, User, Group, Host],
    [HostGroup, User, Host, Group],
    [HostGroup, Group, User, Host],
    [HostGroup, Group, Host, User],
    [HostGroup, Host, User, Group],
    [HostGroup, Host, Group, User],
];

/// Error returned for a global policy index outside `1..=24`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("global policy index {0} is outside 1..=24")]
pub struct InvalidGlobalPolicy(pub u64);

/// Administrator-selected precedence ordering among targeting dimensions.
///
/// The index is distributed centrally as its own profile; the default
/// (index 1) gives user targeting the highest precedence, then group, host
/// and host group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct GlobalPolicy(u8);

impl GlobalPolicy {
    /// Builds a global policy from its 1-based index.
    ///
    /// # Errors
    /// [`InvalidGlobalPolicy`] when `index` is outside `1..=24`.
    pub fn from_index(index: u64) -> Result<Self, InvalidGlobalPolicy> {
        u8::try_from(index)
            .ok()
            .filter(|small| (1..=GLOBAL_POLICY_ORDERINGS.len()).contains(&usize::from(*small)))
            .map(Self)
            .ok_or(InvalidGlobalPolicy(index))
    }

    /// The 1-based permutation index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// The dimension permutation this policy selects.
    #[must_use]
    pub fn ordering(self) -> [Dimension; 4] {
        let slot = usize::from(self.0).saturating_sub(1);
        GLOBAL_POLICY_ORDERINGS
            .get(slot)
            .copied()
            .unwrap_or([User, Group, Host, HostGroup])
    }
}

impl Default for GlobalPolicy {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u64> for GlobalPolicy {
    type Error = InvalidGlobalPolicy;

    fn try_from(index: u64) -> Result<Self, Self::Error> {
        Self::from_index(index)
    }
}

impl From<GlobalPolicy> for u64 {
    fn from(policy: GlobalPolicy) -> Self {
        Self::from(policy.0)
    }
}

/// The requesting identity a compilation run resolves profiles for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Login name, without any realm suffix.
    pub user: String,
    /// Names of the groups the user belongs to.
    pub groups: Vec<String>,
    /// Machine name.
    pub host: String,
    /// Host groups the machine belongs to; empty in this directory schema.
    #[serde(default)]
    pub hostgroups: Vec<String>,
}

impl Identity {
    /// Builds an identity with no host groups.
    pub fn new<U, H>(user: U, groups: Vec<String>, host: H) -> Self
    where
        U: Into<String>,
        H: Into<String>,
    {
        Self {
            user: user.into(),
            groups,
            host: host.into(),
            hostgroups: Vec::new(),
        }
    }
}

/// Sortable composite precedence key for one candidate profile.
///
/// Four zero-padded 5-digit decimal fields joined with `_`, arranged in the
/// order the active [`GlobalPolicy`] dictates. All fields are fixed width,
/// so lexicographic comparison of keys equals numeric precedence comparison
/// and the derived `Ord` is the precedence order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriorityKey(String);

impl PriorityKey {
    /// Computes the key for one profile.
    ///
    /// A dimension that matches the identity against `applies` contributes
    /// the zero-padded `priority`; a non-matching dimension contributes
    /// [`NO_MATCH_PRIORITY`].
    #[must_use]
    pub fn generate(
        identity: &Identity,
        priority: u32,
        global_policy: GlobalPolicy,
        applies: &AppliesSet,
    ) -> Self {
        let matched = format!("{priority:05}");
        let by_user = applies.users.contains(&identity.user);
        let by_group = identity
            .groups
            .iter()
            .any(|group| applies.groups.contains(group));
        let by_host = applies.hosts.contains(&identity.host);
        let by_hostgroup = identity
            .hostgroups
            .iter()
            .any(|hostgroup| applies.hostgroups.contains(hostgroup));

        let field = |matches: bool| if matches { matched.as_str() } else { NO_MATCH_PRIORITY };
        let parts = global_policy.ordering().map(|dimension| match dimension {
            User => field(by_user),
            Group => field(by_group),
            Host => field(by_host),
            HostGroup => field(by_hostgroup),
        });
        Self(parts.join("_"))
    }

    /// True when no dimension matched. Callers exclude such profiles from
    /// deployment instead of merging them with least priority.
    #[must_use]
    pub fn matches_none(&self) -> bool {
        self.0.split('_').all(|part| part == NO_MATCH_PRIORITY)
    }

    /// The key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PriorityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn identity() -> Identity {
        Identity::new(
            "myuser",
            vec!["mygroup1".to_owned(), "mygroup2".to_owned()],
            "myhost",
        )
    }

    fn applies(users: &[&str], groups: &[&str], hosts: &[&str]) -> AppliesSet {
        AppliesSet {
            users: set(users),
            groups: set(groups),
            hosts: set(hosts),
            hostgroups: BTreeSet::new(),
        }
    }

    fn generate(applies: &AppliesSet) -> PriorityKey {
        PriorityKey::generate(&identity(), 100, GlobalPolicy::default(), applies)
    }

    #[test]
    fn matches_by_user_only() {
        let key = generate(&applies(
            &["guest", "myuser", "admin"],
            &["admins", "editors"],
            &["client1"],
        ));
        assert_eq!(key.as_str(), "00100_00000_00000_00000");
    }

    #[test]
    fn matches_by_group_only() {
        let key = generate(&applies(
            &["guest", "admin"],
            &["admins", "mygroup2", "editors"],
            &["client1"],
        ));
        assert_eq!(key.as_str(), "00000_00100_00000_00000");
    }

    #[test]
    fn matches_by_host_only() {
        let key = generate(&applies(
            &["guest", "admin"],
            &["admins", "editors"],
            &["client1", "myhost"],
        ));
        assert_eq!(key.as_str(), "00000_00000_00100_00000");
    }

    #[test]
    fn matches_by_user_and_group() {
        let key = generate(&applies(
            &["myuser", "guest", "admin"],
            &["admins", "editors", "mygroup1"],
            &["client1"],
        ));
        assert_eq!(key.as_str(), "00100_00100_00000_00000");
    }

    #[test]
    fn matches_by_user_and_host() {
        let key = generate(&applies(
            &["guest", "admin", "myuser"],
            &["admins", "editors"],
            &["myhost", "client1"],
        ));
        assert_eq!(key.as_str(), "00100_00000_00100_00000");
    }

    #[test]
    fn matches_by_group_and_host() {
        let key = generate(&applies(
            &["guest", "admin"],
            &["admins", "mygroup1", "editors"],
            &["client1", "myhost", "client2"],
        ));
        assert_eq!(key.as_str(), "00000_00100_00100_00000");
    }

    #[test]
    fn matches_all_three_dimensions() {
        let key = generate(&applies(
            &["myuser", "guest", "admin"],
            &["admins", "mygroup2", "editors"],
            &["client1", "myhost"],
        ));
        assert_eq!(key.as_str(), "00100_00100_00100_00000");
    }

    #[test]
    fn no_match_yields_all_sentinel_key() {
        let key = generate(&applies(&["guest"], &["admins"], &["client1"]));
        assert_eq!(key.as_str(), "00000_00000_00000_00000");
        assert!(key.matches_none());
    }

    #[test]
    fn permutation_reorders_fields() {
        // Permutation 7 is group, user, host, hostgroup.
        let policy = GlobalPolicy::from_index(7).unwrap();
        let key = PriorityKey::generate(
            &identity(),
            100,
            policy,
            &applies(&["myuser"], &[], &[]),
        );
        assert_eq!(key.as_str(), "00000_00100_00000_00000");
    }

    #[test]
    fn all_orderings_are_distinct() {
        let mut seen = BTreeSet::new();
        for index in 1..=24 {
            let ordering = GlobalPolicy::from_index(index).unwrap().ordering();
            assert!(seen.insert(format!("{ordering:?}")), "duplicate permutation");
        }
        assert_eq!(seen.len(), 24);
    }

    #[test]
    fn rejects_out_of_range_index() {
        assert_eq!(GlobalPolicy::from_index(0), Err(InvalidGlobalPolicy(0)));
        assert_eq!(GlobalPolicy::from_index(25), Err(InvalidGlobalPolicy(25)));
        assert_eq!(GlobalPolicy::default().index(), 1);
    }

    #[test]
    fn key_order_is_numeric_precedence_order() {
        let low = generate(&applies(&[], &["mygroup1"], &[]));
        let high = generate(&applies(&["myuser"], &["mygroup1"], &[]));
        assert!(low < high);
        let lower_priority =
            PriorityKey::generate(&identity(), 99, GlobalPolicy::default(), &applies(&["myuser"], &[], &[]));
        let higher_priority =
            PriorityKey::generate(&identity(), 100, GlobalPolicy::default(), &applies(&["myuser"], &[], &[]));
        assert!(lower_priority < higher_priority);
    }
}
