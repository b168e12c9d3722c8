//! The delegation rights algebra.
//!
//! [`Policy`] and [`PrincipalRights`] are immutable values: every transition
//! returns a new value and leaves the original untouched, so the rules can be
//! exercised without any storage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sdfs_engine::{AccessType, Cn, DelegationType, Right};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A principal tried to grant a right it does not hold in redelegatable form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{from} may not grant {right}")]
pub struct DelegationDenied {
    pub from: Cn,
    pub right: Right,
}

/// One principal's rights on one resource.
///
/// An owner has unconditional, non-expiring access. Anyone else holds zero or
/// more delegated rights, each with its own expiration. Expired entries are
/// kept but treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRights {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    owner: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    rights: BTreeMap<Right, DateTime<Utc>>,
}

impl PrincipalRights {
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Set or clear the owner flag. Delegated entries are untouched.
    pub fn set_owner(&self, owner: bool) -> Self {
        Self {
            owner,
            rights: self.rights.clone(),
        }
    }

    /// Stored expiration for exactly `right`, expired or not.
    pub fn expiration(&self, right: Right) -> Option<DateTime<Utc>> {
        self.rights.get(&right).copied()
    }

    /// Whether `right` is held and `now` is strictly before its expiration.
    pub fn has_delegated_right(&self, right: Right, now: DateTime<Utc>) -> bool {
        self.expiration(right).is_some_and(|expiration| now < expiration)
    }

    /// Whether this principal may grant `right`, in either form, to others.
    ///
    /// Only owners and holders of the unexpired star form may grant.
    pub fn may_grant(&self, right: Right, now: DateTime<Utc>) -> bool {
        self.owner || self.has_delegated_right(right.to_star(), now)
    }

    /// Whether this principal may perform `access`.
    pub fn may_do(&self, access: AccessType, now: DateTime<Utc>) -> bool {
        self.owner
            || self.has_delegated_right(Right::new(access, DelegationType::Direct), now)
            || self.has_delegated_right(Right::new(access, DelegationType::Redelegatable), now)
    }

    /// Receive `right` until `expiration`.
    ///
    /// An existing entry that already lasts at least as long wins; delegation
    /// only ever adds or extends.
    pub fn delegate(&self, right: Right, expiration: DateTime<Utc>) -> Self {
        match self.expiration(right) {
            Some(previous) if previous >= expiration => self.clone(),
            _ => {
                let mut rights = self.rights.clone();
                rights.insert(right, expiration);
                Self {
                    owner: self.owner,
                    rights,
                }
            }
        }
    }

    /// All stored delegated rights with their expirations, expired included.
    pub fn rights(&self) -> impl Iterator<Item = (Right, DateTime<Utc>)> + '_ {
        self.rights.iter().map(|(right, expiration)| (*right, *expiration))
    }
}

/// The rights ledger of one resource.
///
/// Principals that do not appear hold nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policy {
    principals: BTreeMap<Cn, PrincipalRights>,
}

impl Policy {
    /// Parse a policy document. An empty document is the empty policy.
    pub fn parse(document: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(document)
    }

    /// Render this policy as a document accepted by [`Policy::parse`].
    pub fn render(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    pub fn principal_rights(&self, cn: &Cn) -> PrincipalRights {
        self.principals.get(cn).cloned().unwrap_or_default()
    }

    /// All principals mentioned in this policy.
    pub fn principals(&self) -> impl Iterator<Item = (&Cn, &PrincipalRights)> {
        self.principals.iter()
    }

    pub fn grant_owner(&self, cn: &Cn) -> Self {
        self.with(cn, self.principal_rights(cn).set_owner(true))
    }

    /// Propagate `right` from `from` to `to` until `expiration`.
    ///
    /// `from` must be an owner or hold the unexpired star form of `right`.
    /// A non-owner can never hand out more lifetime than its own star right
    /// has left: the granted expiration is capped at it.
    pub fn delegate(
        &self,
        from: &Cn,
        to: &Cn,
        right: Right,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, DelegationDenied> {
        let from_rights = self.principal_rights(from);
        if !from_rights.may_grant(right, now) {
            return Err(DelegationDenied {
                from: from.clone(),
                right,
            });
        }

        let expiration = match from_rights.expiration(right.to_star()) {
            Some(cap) if !from_rights.is_owner() => expiration.min(cap),
            _ => expiration,
        };

        Ok(self.with(to, self.principal_rights(to).delegate(right, expiration)))
    }

    fn with(&self, cn: &Cn, rights: PrincipalRights) -> Self {
        let mut principals = self.principals.clone();
        principals.insert(cn.clone(), rights);
        Self { principals }
    }
}
