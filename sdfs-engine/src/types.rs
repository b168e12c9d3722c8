//! Core types for the access engine.
//!
//! Provides the principal and resource identifiers, the four concrete rights,
//! and the `PolicyStore` trait through which the engine asks authorization
//! questions.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EngineError;

/// Principal identity, taken from the Common Name of an authenticated
/// certificate.
///
/// CNs are opaque and case-sensitive. Equality and ordering are by string
/// value; the engine never parses them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cn(pub String);

impl Cn {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CN={}", self.0)
    }
}

impl From<&str> for Cn {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Cn {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name of a stored resource.
///
/// A resource occupies one top-level directory of the store:
///
/// ```text
/// <name>/content       published content
/// <name>/meta          published metadata
/// <name>/policy        delegation policy document
/// <name>/tmp/content   staged content of an in-flight put
/// <name>/tmp/meta      staged metadata of an in-flight put
/// ```
///
/// A name is always exactly one path component: never empty, never `.` or
/// `..`, and free of separators and NUL. Distinct names therefore map to
/// distinct directories, and no name can reach into another resource's
/// layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidResourceName> {
        let name = name.into();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(|c| matches!(c, '/' | '\\' | '\0'))
        {
            return Err(InvalidResourceName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn root(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    fn staging(&self) -> PathBuf {
        self.root().join("tmp")
    }

    pub fn content_path(&self) -> PathBuf {
        self.root().join("content")
    }

    pub fn meta_path(&self) -> PathBuf {
        self.root().join("meta")
    }

    pub fn policy_path(&self) -> PathBuf {
        self.root().join("policy")
    }

    pub fn staged_content_path(&self) -> PathBuf {
        self.staging().join("content")
    }

    pub fn staged_meta_path(&self) -> PathBuf {
        self.staging().join("meta")
    }
}

impl std::fmt::Display for ResourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceName {
    type Err = InvalidResourceName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ResourceName {
    type Error = InvalidResourceName;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceName {
    type Error = InvalidResourceName;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ResourceName> for String {
    fn from(name: ResourceName) -> Self {
        name.0
    }
}

/// A resource name was empty, `.`, `..`, or contained a separator or NUL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource name {0:?}")]
pub struct InvalidResourceName(pub String);

/// Kind of access to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessType {
    Get,
    Put,
}

impl AccessType {
    /// Protocol token for this access type.
    pub fn marshal(self) -> &'static str {
        match self {
            AccessType::Get => "get",
            AccessType::Put => "put",
        }
    }
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marshal())
    }
}

impl FromStr for AccessType {
    type Err = ParseRightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(AccessType::Get),
            "put" => Ok(AccessType::Put),
            _ => Err(ParseRightError(s.to_string())),
        }
    }
}

/// Whether a right may be passed on.
///
/// A `Direct` right lets the holder use the access. A `Redelegatable` ("star")
/// right also lets the holder grant that access to others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DelegationType {
    Direct,
    Redelegatable,
}

impl DelegationType {
    pub fn marshal(self) -> &'static str {
        match self {
            DelegationType::Direct => "_",
            DelegationType::Redelegatable => "*",
        }
    }
}

impl FromStr for DelegationType {
    type Err = ParseRightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "_" => Ok(DelegationType::Direct),
            "*" => Ok(DelegationType::Redelegatable),
            _ => Err(ParseRightError(s.to_string())),
        }
    }
}

/// A grantable capability: an access type paired with a delegation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Right {
    pub access: AccessType,
    pub delegation: DelegationType,
}

impl Right {
    pub const GET: Right = Right::new(AccessType::Get, DelegationType::Direct);
    pub const PUT: Right = Right::new(AccessType::Put, DelegationType::Direct);
    pub const GET_STAR: Right = Right::new(AccessType::Get, DelegationType::Redelegatable);
    pub const PUT_STAR: Right = Right::new(AccessType::Put, DelegationType::Redelegatable);

    pub const fn new(access: AccessType, delegation: DelegationType) -> Self {
        Self { access, delegation }
    }

    /// The redelegatable counterpart of this right.
    pub fn to_star(self) -> Self {
        Self::new(self.access, DelegationType::Redelegatable)
    }

    pub fn is_star(self) -> bool {
        self.delegation == DelegationType::Redelegatable
    }

    /// Stable key used in persisted policies, e.g. `get-_` or `put-*`.
    pub fn marshal(self) -> String {
        format!("{}-{}", self.access.marshal(), self.delegation.marshal())
    }
}

impl std::fmt::Display for Right {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.marshal())
    }
}

impl FromStr for Right {
    type Err = ParseRightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (access, delegation) = s
            .split_once('-')
            .ok_or_else(|| ParseRightError(s.to_string()))?;
        Ok(Self::new(access.parse()?, delegation.parse()?))
    }
}

impl Serialize for Right {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.marshal())
    }
}

impl<'de> Deserialize<'de> for Right {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

/// A marshaled right, access type or delegation type was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized right token '{0}'")]
pub struct ParseRightError(pub String);

/// What a principal attempted when it was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Access(AccessType),
    Delegate(Right),
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Access(access) => write!(f, "{access}"),
            Action::Delegate(right) => write!(f, "delegate {right}"),
        }
    }
}

/// Occupancy of a resource's in-memory lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No lock entry exists.
    Idle,
    /// The given number of `Get` handles are outstanding.
    Reading(usize),
    /// One `Put` handle is outstanding.
    Writing,
}

/// Persisted authorization decisions, one policy per resource.
///
/// Every call observes a consistent load, decide or transform, save sequence
/// for its resource. The default implementation is `DocumentPolicyStore` in
/// `sdfs-policy`.
///
/// Absence of a policy or of a principal within it is never an error: it
/// yields `false`. Storage failures and corrupt documents are.
pub trait PolicyStore: Send + Sync {
    /// Whether `cn` may currently perform `access` on `resource`.
    fn has_access(
        &self,
        cn: &Cn,
        resource: &ResourceName,
        access: AccessType,
    ) -> Result<bool, EngineError>;

    /// Whether `cn` owns `resource`.
    fn is_owner(&self, cn: &Cn, resource: &ResourceName) -> Result<bool, EngineError>;

    /// Make `cn` an owner of `resource`.
    fn grant_owner(&self, cn: &Cn, resource: &ResourceName) -> Result<(), EngineError>;

    /// Grant `right` on `resource` from `from` to `to` until `expiration`.
    ///
    /// Fails with `EngineError::AccessDenied` if `from` may not grant `right`,
    /// in which case nothing is saved.
    fn delegate(
        &self,
        from: &Cn,
        to: &Cn,
        resource: &ResourceName,
        right: Right,
        expiration: DateTime<Utc>,
    ) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_marshal() {
        assert_eq!(Right::GET.marshal(), "get-_");
        assert_eq!(Right::PUT.marshal(), "put-_");
        assert_eq!(Right::GET_STAR.marshal(), "get-*");
        assert_eq!(Right::PUT_STAR.marshal(), "put-*");
    }

    #[test]
    fn test_right_parse() {
        assert_eq!("put-*".parse::<Right>(), Ok(Right::PUT_STAR));
        assert_eq!("get-_".parse::<Right>(), Ok(Right::GET));
        assert!("get".parse::<Right>().is_err());
        assert!("delete-_".parse::<Right>().is_err());
        assert!("get-+".parse::<Right>().is_err());
    }

    #[test]
    fn test_to_star() {
        assert_eq!(Right::GET.to_star(), Right::GET_STAR);
        assert_eq!(Right::PUT_STAR.to_star(), Right::PUT_STAR);
        assert!(!Right::GET.is_star());
        assert!(Right::GET.to_star().is_star());
    }

    #[test]
    fn test_cn_ordering_is_by_value() {
        let mut cns = vec![Cn::new("bob"), Cn::new("Alice"), Cn::new("alice")];
        cns.sort();
        assert_eq!(cns, vec![Cn::new("Alice"), Cn::new("alice"), Cn::new("bob")]);
        assert_ne!(Cn::new("alice"), Cn::new("Alice"));
        assert_eq!(Cn::new("alice").to_string(), "CN=alice");
    }

    #[test]
    fn test_resource_layout() {
        let name = ResourceName::new("apples.pdf").expect("valid name");
        assert_eq!(name.content_path(), PathBuf::from("apples.pdf/content"));
        assert_eq!(name.meta_path(), PathBuf::from("apples.pdf/meta"));
        assert_eq!(name.policy_path(), PathBuf::from("apples.pdf/policy"));
        assert_eq!(
            name.staged_content_path(),
            PathBuf::from("apples.pdf/tmp/content")
        );
        assert_eq!(name.staged_meta_path(), PathBuf::from("apples.pdf/tmp/meta"));
    }

    #[test]
    fn test_resource_name_is_one_component() {
        let rejected = [
            "", ".", "..", "./a", "a/.", "a/tmp", "a/meta", "../a", "/a", "a\\b", "a\0",
        ];
        for bad in rejected {
            assert_eq!(
                ResourceName::new(bad),
                Err(InvalidResourceName(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
        for good in ["a", "apples.pdf", ".hidden", "...", "tmp", "meta"] {
            assert_eq!(ResourceName::new(good).expect("valid name").as_str(), good);
        }
    }

    #[test]
    fn test_resource_name_deserialize_validates() {
        #[derive(Deserialize)]
        struct Doc {
            name: ResourceName,
        }
        let doc: Doc = from_map("apples.pdf").expect("valid");
        assert_eq!(doc.name.as_str(), "apples.pdf");
        assert!(from_map::<Doc>("a/tmp").is_err());

        fn from_map<T: serde::de::DeserializeOwned>(name: &str) -> Result<T, String> {
            use serde::de::value::{Error, MapDeserializer};
            let map = MapDeserializer::<_, Error>::new(std::iter::once(("name", name)));
            T::deserialize(map).map_err(|e| e.to_string())
        }
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Access(AccessType::Put).to_string(), "put");
        assert_eq!(Action::Delegate(Right::GET_STAR).to_string(), "delegate get-*");
    }
}
