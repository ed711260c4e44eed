//! Relation references and the subsumption rules between them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to a set of users drawn from a type.
///
/// Three kinds exist:
/// - a *direct* reference (`user`): every object of the type;
/// - a *userset* reference (`group#member`): the objects assigned through
///   that relation;
/// - a *wildcard* reference (`user:*`): every object of the type, including
///   the unresolved public one.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "RawRelationReference", into = "RawRelationReference")]
pub enum RelationReference {
    Direct { type_name: String },
    Userset { type_name: String, relation: String },
    Wildcard { type_name: String },
}

impl RelationReference {
    /// A reference to every object of `type_name`.
    pub fn direct(type_name: impl Into<String>) -> Self {
        RelationReference::Direct {
            type_name: type_name.into(),
        }
    }

    /// A reference to the userset `type_name#relation`.
    pub fn userset(type_name: impl Into<String>, relation: impl Into<String>) -> Self {
        RelationReference::Userset {
            type_name: type_name.into(),
            relation: relation.into(),
        }
    }

    /// The wildcard reference `type_name:*`.
    pub fn wildcard(type_name: impl Into<String>) -> Self {
        RelationReference::Wildcard {
            type_name: type_name.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            RelationReference::Direct { type_name }
            | RelationReference::Userset { type_name, .. }
            | RelationReference::Wildcard { type_name } => type_name,
        }
    }

    /// The relation name for a userset reference, `None` otherwise.
    pub fn relation(&self) -> Option<&str> {
        match self {
            RelationReference::Userset { relation, .. } => Some(relation),
            _ => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, RelationReference::Wildcard { .. })
    }

    pub fn is_userset(&self) -> bool {
        matches!(self, RelationReference::Userset { .. })
    }

    /// Whether this allowed-type entry covers the given `source` reference.
    ///
    /// A userset entry covers only itself; a direct entry covers the direct
    /// reference of the same type; a wildcard entry covers both the direct
    /// and the wildcard reference of its type. A direct entry does not cover
    /// a wildcard source: a wildcard request is the stricter one.
    pub fn subsumes(&self, source: &RelationReference) -> bool {
        if self.type_name() != source.type_name() {
            return false;
        }
        match (self, source) {
            (RelationReference::Userset { relation: a, .. }, RelationReference::Userset { relation: b, .. }) => {
                a == b
            }
            (RelationReference::Direct { .. }, RelationReference::Direct { .. }) => true,
            (RelationReference::Wildcard { .. }, RelationReference::Direct { .. }) => true,
            (RelationReference::Wildcard { .. }, RelationReference::Wildcard { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RelationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationReference::Direct { type_name } => write!(f, "{type_name}"),
            RelationReference::Userset {
                type_name,
                relation,
            } => write!(f, "{type_name}#{relation}"),
            RelationReference::Wildcard { type_name } => write!(f, "{type_name}:*"),
        }
    }
}

/// Wire shape: `type` plus an optional `relation` or `wildcard` marker.
#[derive(Serialize, Deserialize)]
struct RawRelationReference {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wildcard: Option<WildcardMarker>,
}

#[derive(Serialize, Deserialize)]
struct WildcardMarker {}

impl From<RawRelationReference> for RelationReference {
    fn from(raw: RawRelationReference) -> Self {
        if raw.wildcard.is_some() {
            RelationReference::wildcard(raw.type_name)
        } else {
            match raw.relation {
                Some(relation) if !relation.is_empty() => {
                    RelationReference::userset(raw.type_name, relation)
                }
                _ => RelationReference::direct(raw.type_name),
            }
        }
    }
}

impl From<RelationReference> for RawRelationReference {
    fn from(reference: RelationReference) -> Self {
        match reference {
            RelationReference::Direct { type_name } => RawRelationReference {
                type_name,
                relation: None,
                wildcard: None,
            },
            RelationReference::Userset {
                type_name,
                relation,
            } => RawRelationReference {
                type_name,
                relation: Some(relation),
                wildcard: None,
            },
            RelationReference::Wildcard { type_name } => RawRelationReference {
                type_name,
                relation: None,
                wildcard: Some(WildcardMarker {}),
            },
        }
    }
}
