//! Owned security descriptor model with its SDDL parse/serialize pair.

use std::fmt::{self, Display};
use std::str::FromStr;

use parsing::{DescriptorComponents, MalformedDescriptor};
use tracing::debug;

use crate::Ace;

/// A parsed directory security descriptor.
///
/// Holds the owner and group SID tokens plus the two access control lists,
/// each as its flag string and an ordered list of [`Ace`] entries. ACE order
/// is preserved exactly as parsed; [`SecurityDescriptor::to_sddl`] is the
/// inverse of parsing for any descriptor built from parsed input or
/// [`SecurityDescriptor::add_dacl_ace`] calls.
///
/// # Examples
/// ```rust
/// use directory_profiles::SecurityDescriptor;
///
/// let sd: SecurityDescriptor = "O:DAG:DUD:(A;;RPWP;;;S-1-1-0)".parse()?;
/// assert_eq!(sd.owner, "DA");
/// assert_eq!(sd.dacl.len(), 1);
/// assert_eq!(sd.to_sddl(), "O:DAG:DUD:(A;;RPWP;;;S-1-1-0)S:");
/// # Ok::<(), directory_profiles::MalformedDescriptor>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDescriptor {
    /// Owner SID token.
    pub owner: String,
    /// Primary group SID token.
    pub group: String,
    /// DACL control flag string (may be empty).
    pub dacl_flags: String,
    /// Discretionary access control list, in parse order.
    pub dacl: Vec<Ace>,
    /// SACL control flag string (may be empty).
    pub sacl_flags: String,
    /// System access control list, in parse order.
    pub sacl: Vec<Ace>,
}

impl SecurityDescriptor {
    /// Parses an SDDL string into its descriptor model.
    ///
    /// # Errors
    /// [`MalformedDescriptor`] when the owner or group marker is missing or
    /// an ACE segment cannot be split into at least 6 fields.
    pub fn parse(sddl: &str) -> Result<Self, MalformedDescriptor> {
        let components = DescriptorComponents::parse(sddl)?;
        debug!(
            owner = components.owner,
            group = components.group,
            dacl_entries = components.dacl_aces.len(),
            sacl_entries = components.sacl_aces.len(),
            "parsed security descriptor"
        );
        Ok(Self {
            owner: components.owner.to_owned(),
            group: components.group.to_owned(),
            dacl_flags: components.dacl_flags.to_owned(),
            dacl: components.dacl_aces.iter().map(Ace::from_fields).collect(),
            sacl_flags: components.sacl_flags.to_owned(),
            sacl: components.sacl_aces.iter().map(Ace::from_fields).collect(),
        })
    }

    /// Serializes back to SDDL form.
    ///
    /// Both ACL sections are always emitted, so a descriptor parsed from a
    /// DACL-only string serializes with an empty trailing `S:` section; the
    /// result reparses to an equal descriptor.
    #[must_use]
    pub fn to_sddl(&self) -> String {
        self.to_string()
    }

    /// Appends an ACE to the DACL unless an equal entry is already present.
    ///
    /// Idempotent: adding the same entry twice leaves the list unchanged.
    pub fn add_dacl_ace(&mut self, ace: Ace) {
        if self.dacl.contains(&ace) {
            debug!(%ace, "ACE already present in DACL, not appending");
            return;
        }
        self.dacl.push(ace);
    }
}

impl Display for SecurityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O:{}G:{}D:{}", self.owner, self.group, self.dacl_flags)?;
        for ace in &self.dacl {
            write!(f, "{ace}")?;
        }
        write!(f, "S:{}", self.sacl_flags)?;
        for ace in &self.sacl {
            write!(f, "{ace}")?;
        }
        Ok(())
    }
}

impl FromStr for SecurityDescriptor {
    type Err = MalformedDescriptor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
