//! Eager-load include paths.
//!
//! An [`Include`] is a chain of navigation members starting at a root entity
//! type, resolved by name the same way expression member access is. Including
//! `Builder.City` implies `Builder`.

use std::fmt;

use crate::errors::{ExprError, ExprResult};
use crate::schema::{MemberInfo, TypeInfo};

#[derive(Clone, Debug, PartialEq)]
pub struct Include {
    root: &'static TypeInfo,
    path: Vec<&'static MemberInfo>,
}

impl Include {
    /// Start an include at `root.member`.
    ///
    /// # Errors
    /// Fails when the member does not exist or is not a navigation.
    pub fn new(root: &'static TypeInfo, member: &str) -> ExprResult<Self> {
        let m = navigation(root, member)?;
        Ok(Self {
            root,
            path: vec![m],
        })
    }

    /// Extend the path from the last navigation's target.
    ///
    /// # Errors
    /// Fails when the member does not exist on the current target or is not a navigation.
    pub fn then_include(mut self, member: &str) -> ExprResult<Self> {
        let current = self.leaf_type();
        let m = navigation(current, member)?;
        self.path.push(m);
        Ok(self)
    }

    #[must_use]
    pub fn root(&self) -> &'static TypeInfo {
        self.root
    }

    #[must_use]
    pub fn path(&self) -> &[&'static MemberInfo] {
        &self.path
    }

    /// Entity type at the end of the path.
    #[must_use]
    pub fn leaf_type(&self) -> &'static TypeInfo {
        self.path
            .last()
            .and_then(|m| m.target())
            .unwrap_or(self.root)
    }

    /// Does this include cover `names` (as the whole path or a prefix of it)?
    #[must_use]
    pub fn covers(&self, names: &[&str]) -> bool {
        names.len() <= self.path.len()
            && names
                .iter()
                .zip(&self.path)
                .all(|(n, m)| m.name.eq_ignore_ascii_case(n))
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for m in &self.path {
            if !first {
                f.write_str(".")?;
            }
            f.write_str(m.name)?;
            first = false;
        }
        Ok(())
    }
}

fn navigation(owner: &'static TypeInfo, member: &str) -> ExprResult<&'static MemberInfo> {
    let m = owner.member(member)?;
    if m.is_navigation() {
        Ok(m)
    } else {
        Err(ExprError::NotANavigation(m.name))
    }
}

/// Set of include paths attached to one query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Includes {
    items: Vec<Include>,
}

impl Includes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path, ignoring exact duplicates.
    pub fn push(&mut self, include: Include) {
        if !self.items.contains(&include) {
            self.items.push(include);
        }
    }

    /// Whether any path covers `names`.
    #[must_use]
    pub fn contains(&self, names: &[&str]) -> bool {
        self.items.iter().any(|i| i.covers(names))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Include> {
        self.items.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::schema::fixtures::{CITY, OWNER, SITE};

    #[test]
    fn nested_include_implies_prefix() {
        let inc = Include::new(&SITE, "builder")
            .unwrap()
            .then_include("city")
            .unwrap();
        assert_eq!(inc.to_string(), "Builder.City");
        assert_eq!(inc.leaf_type(), &CITY);

        let mut set = Includes::new();
        set.push(inc.clone());
        set.push(inc);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&["Builder"]));
        assert!(set.contains(&["Builder", "City"]));
        assert!(!set.contains(&["Owner"]));
        assert!(!set.contains(&["Builder", "City", "Name"]));
    }

    #[test]
    fn scalar_members_cannot_be_included() {
        let err = Include::new(&SITE, "Label").unwrap_err();
        assert_eq!(err, ExprError::NotANavigation("Label"));
    }

    #[test]
    fn unknown_members_cannot_be_included() {
        let err = Include::new(&SITE, "Owner")
            .unwrap()
            .then_include("Nope")
            .unwrap_err();
        assert_eq!(
            err,
            ExprError::UnknownMember {
                type_name: OWNER.name,
                member: "Nope".to_owned(),
            }
        );
    }

    #[test]
    fn collections_can_be_included() {
        let inc = Include::new(&SITE, "Owner")
            .unwrap()
            .then_include("Sites")
            .unwrap();
        assert_eq!(inc.leaf_type(), &SITE);
        assert_eq!(inc.path().len(), 2);
    }
}
