#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt::{self, Display};

use arrayvec::ArrayVec;
use thiserror::Error;

/// Smallest number of `;`-separated fields a valid ACE segment carries.
pub const MIN_ACE_FIELDS: usize = 6;
/// Largest number of fields an ACE segment carries (the 7th is the optional
/// resource attribute; anything after the 6th separator belongs to it).
pub const MAX_ACE_FIELDS: usize = 7;

/// Error type returned when an SDDL string cannot be decomposed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MalformedDescriptor {
    /// The string has no owner (`O:`) marker.
    MissingOwner,
    /// The string has no group (`G:`) marker.
    MissingGroup,
    /// An ACE segment has fewer than [`MIN_ACE_FIELDS`] fields.
    TruncatedAce,
    /// An ACE list opened with `(` but never closed with `)`.
    UnterminatedAceList,
}

impl Display for MalformedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOwner => f.write_str("security descriptor has no owner (O:) marker"),
            Self::MissingGroup => f.write_str("security descriptor has no group (G:) marker"),
            Self::TruncatedAce => f.write_str("ACE segment has fewer than 6 fields"),
            Self::UnterminatedAceList => f.write_str("ACE list is missing its closing parenthesis"),
        }
    }
}

/// The raw fields of one ACE segment, borrowed from the input string.
///
/// Field meaning follows the SDDL ACE grammar
/// `type;flags;rights;object_guid;inherit_object_guid;account_sid[;resource_attribute]`.
/// No per-field validation happens at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AceFields<'a> {
    pub ace_type: &'a str,
    pub flags: &'a str,
    pub rights: &'a str,
    pub object_guid: &'a str,
    pub inherit_object_guid: &'a str,
    pub account_sid: &'a str,
    /// Optional trailing field; keeps any embedded `;` separators.
    pub resource_attribute: Option<&'a str>,
}

impl<'a> AceFields<'a> {
    /// Splits one ACE segment (without its surrounding parentheses) into
    /// fields.
    ///
    /// # Errors
    /// [`MalformedDescriptor::TruncatedAce`] if the segment has fewer than
    /// [`MIN_ACE_FIELDS`] fields.
    pub fn parse(segment: &'a str) -> Result<Self, MalformedDescriptor> {
        let buf: ArrayVec<&'a str, MAX_ACE_FIELDS> = segment.splitn(MAX_ACE_FIELDS, ';').collect();
        let mut fields = buf.into_iter();
        let mut next = || fields.next().ok_or(MalformedDescriptor::TruncatedAce);
        let ace_type = next()?;
        let flags = next()?;
        let rights = next()?;
        let object_guid = next()?;
        let inherit_object_guid = next()?;
        let account_sid = next()?;
        let resource_attribute = fields.next();
        Ok(Self {
            ace_type,
            flags,
            rights,
            object_guid,
            inherit_object_guid,
            account_sid,
            resource_attribute,
        })
    }
}

/// Borrowed decomposition of a full SDDL string.
///
/// The parse is a marker-seeking pass over `O:`, `G:`, `D:` and `S:` rather
/// than fixed offsets, so descriptors with an absent DACL or SACL section
/// decompose without special cases: a missing section yields an empty flag
/// string and no ACEs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorComponents<'a> {
    pub owner: &'a str,
    pub group: &'a str,
    pub dacl_flags: &'a str,
    pub dacl_aces: Vec<AceFields<'a>>,
    pub sacl_flags: &'a str,
    pub sacl_aces: Vec<AceFields<'a>>,
}

impl<'a> DescriptorComponents<'a> {
    /// Decomposes an SDDL string.
    ///
    /// Region boundaries: owner runs from `O:` to `G:`; group runs from `G:`
    /// to the `D:` marker (or `S:`, or end of string, when the DACL is
    /// absent); the DACL region runs from `D:` to `S:` or end of string; the
    /// SACL region runs from `S:` to end of string.
    ///
    /// # Errors
    /// [`MalformedDescriptor`] if the owner or group marker is missing or an
    /// ACE list is malformed.
    pub fn parse(sddl: &'a str) -> Result<Self, MalformedDescriptor> {
        let owner_at = sddl.find("O:").ok_or(MalformedDescriptor::MissingOwner)?;
        let rest = split_at_marker(sddl, owner_at);
        let group_at = rest.find("G:").ok_or(MalformedDescriptor::MissingGroup)?;
        let owner = head(rest, group_at);
        let rest = split_at_marker(rest, group_at);

        let sacl_at = rest.find("S:");
        // Only a D: sitting before the SACL marker opens a DACL region.
        let dacl_at = rest
            .find("D:")
            .filter(|at| sacl_at.is_none_or(|sacl| *at < sacl));

        let group = head(rest, dacl_at.or(sacl_at).unwrap_or(rest.len()));

        let (dacl_flags, dacl_aces) = match dacl_at {
            Some(at) => {
                let region_end = sacl_at.unwrap_or(rest.len());
                split_region(slice(rest, at + 2, region_end))?
            }
            None => ("", Vec::new()),
        };
        let (sacl_flags, sacl_aces) = match sacl_at {
            Some(at) => split_region(split_at_marker(rest, at))?,
            None => ("", Vec::new()),
        };

        Ok(Self {
            owner,
            group,
            dacl_flags,
            dacl_aces,
            sacl_flags,
            sacl_aces,
        })
    }
}

/// Everything after a two-character marker found at `at`.
fn split_at_marker(s: &str, at: usize) -> &str {
    slice(s, at + 2, s.len())
}

fn head(s: &str, end: usize) -> &str {
    slice(s, 0, end)
}

fn slice(s: &str, start: usize, end: usize) -> &str {
    s.get(start..end).unwrap_or("")
}

/// Splits one ACL region into its flag string and ACE segments.
///
/// Everything before the first `(` is the flag string; the remainder must be
/// a `(..)(..)` concatenation which is split on the literal `)(` sequence.
fn split_region(region: &str) -> Result<(&str, Vec<AceFields<'_>>), MalformedDescriptor> {
    let Some(open) = region.find('(') else {
        return Ok((region, Vec::new()));
    };
    let flags = head(region, open);
    let list = slice(region, open, region.len());
    let inner = list
        .strip_prefix('(')
        .and_then(|tail| tail.strip_suffix(')'))
        .ok_or(MalformedDescriptor::UnterminatedAceList)?;
    let aces = inner
        .split(")(")
        .map(AceFields::parse)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((flags, aces))
}
