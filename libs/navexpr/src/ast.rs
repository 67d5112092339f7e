//! Typed expression trees over entity navigations.
//!
//! Nodes are built through checked constructors that mirror the shape of
//! LINQ-style expression factories: every constructor validates operand types
//! and returns an [`ExprResult`].
//!
//! ```
//! use navexpr::ast::{Expr, Lambda};
//! # use navexpr::schema::{MemberInfo, ScalarKind, TypeInfo};
//! # static CITY: TypeInfo = TypeInfo {
//! #     name: "TCity", table: "TCities", key: "Id",
//! #     members: &[MemberInfo::scalar("Name", "Name", ScalarKind::String)],
//! # };
//! let c = Expr::parameter("c", &CITY);
//! let name = Expr::member_access(c.clone(), "Name")?;
//! let body = Expr::equal(name, Expr::string("Leeds"))?;
//! let lambda = Lambda::predicate(c, body)?;
//! assert_eq!(lambda.to_string(), r#"c => (c.Name == "Leeds")"#);
//! # Ok::<(), navexpr::ExprError>(())
//! ```

use std::fmt;

use uuid::Uuid;

use crate::errors::{ExprError, ExprResult};
use crate::schema::{MemberInfo, MemberKind, ScalarKind, TypeInfo};

/// Runtime scalar value. Entities are never values; they are navigated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    String(String),
    I32(i32),
    Uuid(Uuid),
    Bool(bool),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(ScalarKind::String),
            Value::I32(_) => Some(ScalarKind::I32),
            Value::Uuid(_) => Some(ScalarKind::Uuid),
            Value::Bool(_) => Some(ScalarKind::Bool),
        }
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map_or(Value::Null, Value::String)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::I32(i) => write!(f, "{i}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
        }
    }
}

/// Static type of an expression node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprType {
    Scalar(ScalarKind),
    Entity(&'static TypeInfo),
}

impl ExprType {
    pub const BOOL: ExprType = ExprType::Scalar(ScalarKind::Bool);

    #[must_use]
    pub fn entity(&self) -> Option<&'static TypeInfo> {
        match self {
            ExprType::Entity(t) => Some(*t),
            ExprType::Scalar(_) => None,
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Scalar(k) => write!(f, "{k}"),
            ExprType::Entity(t) => write!(f, "{t}"),
        }
    }
}

/// Expression tree node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Parameter {
        name: String,
        ty: &'static TypeInfo,
    },
    Member {
        target: Box<Expr>,
        member: &'static MemberInfo,
    },
    Constant {
        value: Value,
        ty: ExprType,
    },
    Equal(Box<Expr>, Box<Expr>),
    NotEqual(Box<Expr>, Box<Expr>),
    AndAlso(Box<Expr>, Box<Expr>),
    OrElse(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Condition {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
}

impl Expr {
    #[must_use]
    pub fn parameter(name: &str, ty: &'static TypeInfo) -> Self {
        Expr::Parameter {
            name: name.to_owned(),
            ty,
        }
    }

    /// Access `member_name` on an entity-typed expression.
    ///
    /// # Errors
    /// Fails with [`ExprError::UnknownMember`] when the member does not exist,
    /// [`ExprError::NotAnEntity`] on scalar targets and
    /// [`ExprError::CollectionMember`] on collection navigations.
    pub fn member_access(target: Expr, member_name: &str) -> ExprResult<Self> {
        let ty = target.ty();
        let entity = ty.entity().ok_or(ExprError::NotAnEntity(ty))?;
        let member = entity.member(member_name)?;
        Self::make_member_access(target, member)
    }

    /// Access an already-resolved member.
    ///
    /// # Errors
    /// Fails when `member` is not declared on the target's entity type, or is a collection.
    pub fn make_member_access(target: Expr, member: &'static MemberInfo) -> ExprResult<Self> {
        let ty = target.ty();
        let entity = ty.entity().ok_or(ExprError::NotAnEntity(ty))?;
        if !entity.members.iter().any(|m| m == member) {
            return Err(ExprError::UnknownMember {
                type_name: entity.name,
                member: member.name.to_owned(),
            });
        }
        if matches!(member.kind, MemberKind::Collection { .. }) {
            return Err(ExprError::CollectionMember(member.name));
        }
        Ok(Expr::Member {
            target: Box::new(target),
            member,
        })
    }

    /// Typed constant; `Value::Null` is allowed for any type.
    ///
    /// # Errors
    /// Fails when a non-null value does not match `ty`.
    pub fn constant(value: Value, ty: ExprType) -> ExprResult<Self> {
        match (&value, ty) {
            (Value::Null, _) => {}
            (v, ExprType::Scalar(kind)) if v.kind() == Some(kind) => {}
            (v, _) => {
                let got = v.kind().map_or(ty, ExprType::Scalar);
                return Err(ExprError::TypeMismatch {
                    context: "constant",
                    expected: ty,
                    got,
                });
            }
        }
        Ok(Expr::Constant { value, ty })
    }

    #[must_use]
    pub fn null_of(ty: ExprType) -> Self {
        Expr::Constant {
            value: Value::Null,
            ty,
        }
    }

    #[must_use]
    pub fn null_entity(ty: &'static TypeInfo) -> Self {
        Self::null_of(ExprType::Entity(ty))
    }

    #[must_use]
    pub fn string(s: &str) -> Self {
        Expr::Constant {
            value: Value::from(s),
            ty: ExprType::Scalar(ScalarKind::String),
        }
    }

    /// # Errors
    /// Fails when operand types differ, or when two entities are compared and
    /// neither side is a null constant.
    pub fn equal(left: Expr, right: Expr) -> ExprResult<Self> {
        check_comparable(&left, &right)?;
        Ok(Expr::Equal(Box::new(left), Box::new(right)))
    }

    /// # Errors
    /// Same rules as [`Expr::equal`].
    pub fn not_equal(left: Expr, right: Expr) -> ExprResult<Self> {
        check_comparable(&left, &right)?;
        Ok(Expr::NotEqual(Box::new(left), Box::new(right)))
    }

    /// # Errors
    /// Fails when either operand is not boolean.
    pub fn and_also(left: Expr, right: Expr) -> ExprResult<Self> {
        expect_bool("AndAlso", &left)?;
        expect_bool("AndAlso", &right)?;
        Ok(Expr::AndAlso(Box::new(left), Box::new(right)))
    }

    /// # Errors
    /// Fails when either operand is not boolean.
    pub fn or_else(left: Expr, right: Expr) -> ExprResult<Self> {
        expect_bool("OrElse", &left)?;
        expect_bool("OrElse", &right)?;
        Ok(Expr::OrElse(Box::new(left), Box::new(right)))
    }

    /// # Errors
    /// Fails when the operand is not boolean.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expr) -> ExprResult<Self> {
        expect_bool("Not", &inner)?;
        Ok(Expr::Not(Box::new(inner)))
    }

    /// Ternary `test ? if_true : if_false`.
    ///
    /// # Errors
    /// Fails when `test` is not boolean or the branches have different types.
    pub fn condition(test: Expr, if_true: Expr, if_false: Expr) -> ExprResult<Self> {
        expect_bool("Condition test", &test)?;
        let (t, f) = (if_true.ty(), if_false.ty());
        if t != f {
            return Err(ExprError::TypeMismatch {
                context: "Condition branches",
                expected: t,
                got: f,
            });
        }
        Ok(Expr::Condition {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        })
    }

    /// Static type of this node.
    #[must_use]
    pub fn ty(&self) -> ExprType {
        match self {
            Expr::Parameter { ty, .. } => ExprType::Entity(*ty),
            Expr::Member { member, .. } => match member.kind {
                MemberKind::Scalar { kind, .. } => ExprType::Scalar(kind),
                MemberKind::Reference { target, .. } | MemberKind::Collection { target, .. } => {
                    ExprType::Entity(target)
                }
            },
            Expr::Constant { ty, .. } => *ty,
            Expr::Equal(..)
            | Expr::NotEqual(..)
            | Expr::AndAlso(..)
            | Expr::OrElse(..)
            | Expr::Not(_) => ExprType::BOOL,
            Expr::Condition { if_true, .. } => if_true.ty(),
        }
    }

    #[must_use]
    pub fn is_null_constant(&self) -> bool {
        matches!(
            self,
            Expr::Constant {
                value: Value::Null,
                ..
            }
        )
    }
}

fn expect_bool(context: &'static str, e: &Expr) -> ExprResult<()> {
    let got = e.ty();
    if got == ExprType::BOOL {
        Ok(())
    } else {
        Err(ExprError::TypeMismatch {
            context,
            expected: ExprType::BOOL,
            got,
        })
    }
}

fn check_comparable(left: &Expr, right: &Expr) -> ExprResult<()> {
    let (l, r) = (left.ty(), right.ty());
    if l != r {
        return Err(ExprError::TypeMismatch {
            context: "comparison",
            expected: l,
            got: r,
        });
    }
    if l.entity().is_some() && !left.is_null_constant() && !right.is_null_constant() {
        return Err(ExprError::UnsupportedComparison { left: l, right: r });
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Parameter { name, .. } => f.write_str(name),
            Expr::Member { target, member } => write!(f, "{target}.{}", member.name),
            Expr::Constant { value, .. } => write!(f, "{value}"),
            Expr::Equal(l, r) => write!(f, "({l} == {r})"),
            Expr::NotEqual(l, r) => write!(f, "({l} != {r})"),
            Expr::AndAlso(l, r) => write!(f, "({l} AndAlso {r})"),
            Expr::OrElse(l, r) => write!(f, "({l} OrElse {r})"),
            Expr::Not(x) => write!(f, "Not({x})"),
            Expr::Condition {
                test,
                if_true,
                if_false,
            } => write!(f, "IIF({test}, {if_true}, {if_false})"),
        }
    }
}

/// Single-parameter predicate over a root entity type.
#[derive(Clone, Debug, PartialEq)]
pub struct Lambda {
    parameter: String,
    root: &'static TypeInfo,
    body: Expr,
}

impl Lambda {
    /// # Errors
    /// Fails when `parameter` is not a parameter node or `body` is not boolean.
    pub fn predicate(parameter: Expr, body: Expr) -> ExprResult<Self> {
        let Expr::Parameter { name, ty } = parameter else {
            return Err(ExprError::NotAParameter);
        };
        let body_ty = body.ty();
        if body_ty != ExprType::BOOL {
            return Err(ExprError::NotAPredicate(body_ty));
        }
        Ok(Self {
            parameter: name,
            root: ty,
            body,
        })
    }

    #[must_use]
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    #[must_use]
    pub fn root(&self) -> &'static TypeInfo {
        self.root
    }

    #[must_use]
    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Same parameter, different body. Used by rewriting passes.
    #[must_use]
    pub fn with_body(&self, body: Expr) -> Self {
        Self {
            parameter: self.parameter.clone(),
            root: self.root,
            body,
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.parameter, self.body)
    }
}
