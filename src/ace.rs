//! Access control entries in their SDDL textual form.

use std::fmt::{self, Display};
use std::str::FromStr;

use parsing::{AceFields, MalformedDescriptor};

/// One access control entry of a [`SecurityDescriptor`](crate::SecurityDescriptor).
///
/// Fields are kept as their raw SDDL tokens; this crate never interprets
/// rights or flags beyond the object GUID filter used for applicability.
/// Equality and hashing follow the canonical serialized form
/// `(type;flags;rights;object_guid;inherit_object_guid;account_sid[;resource_attribute])`,
/// which the derived impls match because the canonical form is injective over
/// the fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ace {
    /// ACE type token (e.g. `A`, `D`, `OA`).
    pub ace_type: String,
    /// ACE flag tokens.
    pub flags: String,
    /// Access rights tokens.
    pub rights: String,
    /// Object GUID the entry is scoped to, empty when unscoped.
    pub object_guid: String,
    /// Inherit object GUID, empty when unscoped.
    pub inherit_object_guid: String,
    /// SID of the principal the entry grants or denies.
    pub account_sid: String,
    /// Optional trailing resource attribute data.
    pub resource_attribute: Option<String>,
}

impl Ace {
    pub(crate) fn from_fields(fields: &AceFields<'_>) -> Self {
        Self {
            ace_type: fields.ace_type.to_owned(),
            flags: fields.flags.to_owned(),
            rights: fields.rights.to_owned(),
            object_guid: fields.object_guid.to_owned(),
            inherit_object_guid: fields.inherit_object_guid.to_owned(),
            account_sid: fields.account_sid.to_owned(),
            resource_attribute: fields.resource_attribute.map(str::to_owned),
        }
    }
}

impl Display for Ace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({};{};{};{};{};{}",
            self.ace_type,
            self.flags,
            self.rights,
            self.object_guid,
            self.inherit_object_guid,
            self.account_sid
        )?;
        if let Some(attribute) = &self.resource_attribute {
            write!(f, ";{attribute}")?;
        }
        f.write_str(")")
    }
}

impl FromStr for Ace {
    type Err = MalformedDescriptor;

    /// Parses one ACE segment, with or without its surrounding parentheses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segment = s
            .strip_prefix('(')
            .and_then(|tail| tail.strip_suffix(')'))
            .unwrap_or(s);
        AceFields::parse(segment).map(|fields| Self::from_fields(&fields))
    }
}

#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_parentheses() {
        let bare: Ace = "A;;RPWP;;;S-1-1-0".parse().unwrap();
        let wrapped: Ace = "(A;;RPWP;;;S-1-1-0)".parse().unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(wrapped.to_string(), "(A;;RPWP;;;S-1-1-0)");
    }

    #[test]
    fn display_round_trips_resource_attribute() {
        let source = "(RA;;;;;WD;(\"Dept\";TS;0;\"eng\"))";
        let ace: Ace = source.parse().unwrap();
        assert_eq!(ace.resource_attribute.as_deref(), Some("(\"Dept\";TS;0;\"eng\")"));
        assert_eq!(ace.to_string(), source);
    }

    #[test]
    fn rejects_short_segments() {
        assert_eq!(
            "(A;;RPWP)".parse::<Ace>(),
            Err(MalformedDescriptor::TruncatedAce)
        );
    }
}
