//! Entity type metadata used for member lookup.
//!
//! Entity types describe themselves with a static [`TypeInfo`] table. Each
//! [`MemberInfo`] is either a scalar column or a navigation to another entity
//! type. Navigation targets are `&'static` references, so a schema may contain
//! cycles (a mandator owns buildings, a building references its mandator).

use std::fmt;

use crate::errors::ExprError;

/// Logical scalar kinds carried by entity columns and constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    I32,
    Uuid,
    Bool,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => write!(f, "String"),
            ScalarKind::I32 => write!(f, "I32"),
            ScalarKind::Uuid => write!(f, "Uuid"),
            ScalarKind::Bool => write!(f, "Bool"),
        }
    }
}

/// What a member resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// A plain column.
    Scalar { column: &'static str, kind: ScalarKind },
    /// Many-to-one reference resolved through `foreign_key` on the declaring table.
    Reference {
        foreign_key: &'static str,
        target: &'static TypeInfo,
    },
    /// One-to-many collection resolved through `foreign_key` on the target table.
    Collection {
        foreign_key: &'static str,
        target: &'static TypeInfo,
    },
}

/// A single public member of an entity type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: &'static str,
    pub kind: MemberKind,
}

impl MemberInfo {
    #[must_use]
    pub const fn scalar(name: &'static str, column: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            kind: MemberKind::Scalar { column, kind },
        }
    }

    #[must_use]
    pub const fn reference(
        name: &'static str,
        foreign_key: &'static str,
        target: &'static TypeInfo,
    ) -> Self {
        Self {
            name,
            kind: MemberKind::Reference {
                foreign_key,
                target,
            },
        }
    }

    #[must_use]
    pub const fn collection(
        name: &'static str,
        foreign_key: &'static str,
        target: &'static TypeInfo,
    ) -> Self {
        Self {
            name,
            kind: MemberKind::Collection {
                foreign_key,
                target,
            },
        }
    }

    /// Target entity type for navigations, `None` for scalars.
    #[must_use]
    pub fn target(&self) -> Option<&'static TypeInfo> {
        match self.kind {
            MemberKind::Scalar { .. } => None,
            MemberKind::Reference { target, .. } | MemberKind::Collection { target, .. } => {
                Some(target)
            }
        }
    }

    #[must_use]
    pub fn is_navigation(&self) -> bool {
        !matches!(self.kind, MemberKind::Scalar { .. })
    }
}

/// Static description of an entity type and its table mapping.
pub struct TypeInfo {
    /// Reflection name of the type, e.g. `TBuilding`.
    pub name: &'static str,
    pub table: &'static str,
    /// Primary key column.
    pub key: &'static str,
    pub members: &'static [MemberInfo],
}

impl TypeInfo {
    /// Resolve a public member by name, ignoring ASCII case.
    ///
    /// # Errors
    /// Returns [`ExprError::UnknownMember`] if the type declares no such member.
    pub fn member(&'static self, name: &str) -> Result<&'static MemberInfo, ExprError> {
        self.members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ExprError::UnknownMember {
                type_name: self.name,
                member: name.to_owned(),
            })
    }
}

// Identity is the type name; comparing members structurally would recurse
// through navigation cycles.
impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeInfo {}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Resolve `member_name` on `parent`.
///
/// # Errors
/// Returns [`ExprError::UnknownMember`] if the member does not exist.
pub fn get_member_info(
    parent: &'static TypeInfo,
    member_name: &str,
) -> Result<&'static MemberInfo, ExprError> {
    parent.member(member_name)
}


#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::fixtures::{BUILDER, CITY, SITE};
    use super::*;

    #[test]
    fn member_lookup_ignores_case() {
        let m = get_member_info(&SITE, "builder").unwrap();
        assert_eq!(m.name, "Builder");
        assert_eq!(m.target(), Some(&BUILDER));
    }

    #[test]
    fn unknown_member_is_reported_with_type_name() {
        let err = get_member_info(&CITY, "Population").unwrap_err();
        assert_eq!(
            err,
            ExprError::UnknownMember {
                type_name: "TCity",
                member: "Population".to_owned(),
            }
        );
        assert_eq!(err.to_string(), "Member Population does not exist on TCity");
    }

    #[test]
    fn cyclic_schema_compares_by_name() {
        let owner = SITE.member("Owner").unwrap().target().unwrap();
        let sites = owner.member("Sites").unwrap();
        assert!(sites.is_navigation());
        assert_eq!(sites.target(), Some(&SITE));
        assert_eq!(format!("{owner}"), "TOwner");
    }
}
