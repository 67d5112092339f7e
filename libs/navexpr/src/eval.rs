//! In-memory evaluation with reference null semantics.
//!
//! Evaluation walks a materialized object graph through the [`Navigable`]
//! trait. Unlike the relational translation, a member access on an absent
//! reference is an error here; null guards in the expression are what keep
//! the walk safe.

use crate::ast::{Expr, Lambda, Value};
use crate::errors::{ExprError, ExprResult};
use crate::schema::{MemberInfo, TypeInfo};

/// An entity instance whose members can be read by reflection metadata.
pub trait Navigable {
    fn type_info(&self) -> &'static TypeInfo;

    /// Read a scalar member.
    ///
    /// # Errors
    /// Returns [`ExprError::UnknownMember`] when the member is not a scalar of this type.
    fn scalar(&self, member: &MemberInfo) -> ExprResult<Value>;

    /// Follow a reference navigation. `Ok(None)` means the reference is
    /// absent (or was not loaded).
    ///
    /// # Errors
    /// Returns [`ExprError::UnknownMember`] when the member is not a reference of this type.
    fn reference(&self, member: &MemberInfo) -> ExprResult<Option<&dyn Navigable>> {
        Err(ExprError::UnknownMember {
            type_name: self.type_info().name,
            member: member.name.to_owned(),
        })
    }
}

struct Scope<'a> {
    parameter: &'a str,
    root: &'a dyn Navigable,
}

enum Outcome<'a> {
    Value(Value),
    Entity(Option<&'a dyn Navigable>),
}

impl Outcome<'_> {
    fn as_bool(&self, context: &Expr) -> ExprResult<bool> {
        match self {
            Outcome::Value(Value::Bool(b)) => Ok(*b),
            Outcome::Value(Value::Null) => Ok(false),
            _ => Err(ExprError::NotAPredicate(context.ty())),
        }
    }
}

fn eval<'a>(expr: &Expr, scope: &Scope<'a>) -> ExprResult<Outcome<'a>> {
    match expr {
        Expr::Parameter { name, .. } => {
            if name == scope.parameter {
                Ok(Outcome::Entity(Some(scope.root)))
            } else {
                Err(ExprError::UnboundParameter { name: name.clone() })
            }
        }
        Expr::Member { target, member } => {
            let Outcome::Entity(instance) = eval(target, scope)? else {
                return Err(ExprError::NotAnEntity(target.ty()));
            };
            let instance = instance.ok_or(ExprError::NullReference {
                member: member.name,
            })?;
            if member.is_navigation() {
                Ok(Outcome::Entity(instance.reference(member)?))
            } else {
                Ok(Outcome::Value(instance.scalar(member)?))
            }
        }
        Expr::Constant { value, ty } => {
            if ty.entity().is_some() {
                Ok(Outcome::Entity(None))
            } else {
                Ok(Outcome::Value(value.clone()))
            }
        }
        Expr::Equal(l, r) => Ok(Outcome::Value(Value::Bool(equals(l, r, scope)?))),
        Expr::NotEqual(l, r) => Ok(Outcome::Value(Value::Bool(!equals(l, r, scope)?))),
        Expr::AndAlso(l, r) => {
            let result = eval(l, scope)?.as_bool(l)? && eval(r, scope)?.as_bool(r)?;
            Ok(Outcome::Value(Value::Bool(result)))
        }
        Expr::OrElse(l, r) => {
            let result = eval(l, scope)?.as_bool(l)? || eval(r, scope)?.as_bool(r)?;
            Ok(Outcome::Value(Value::Bool(result)))
        }
        Expr::Not(x) => Ok(Outcome::Value(Value::Bool(!eval(x, scope)?.as_bool(x)?))),
        Expr::Condition {
            test,
            if_true,
            if_false,
        } => {
            if eval(test, scope)?.as_bool(test)? {
                eval(if_true, scope)
            } else {
                eval(if_false, scope)
            }
        }
    }
}

fn equals(l: &Expr, r: &Expr, scope: &Scope<'_>) -> ExprResult<bool> {
    match (eval(l, scope)?, eval(r, scope)?) {
        (Outcome::Value(a), Outcome::Value(b)) => Ok(a == b),
        (Outcome::Entity(a), Outcome::Entity(b)) => match (a, b) {
            (None, None) => Ok(true),
            (None, Some(_)) | (Some(_), None) => Ok(false),
            (Some(_), Some(_)) => Err(ExprError::UnsupportedComparison {
                left: l.ty(),
                right: r.ty(),
            }),
        },
        _ => Err(ExprError::UnsupportedComparison {
            left: l.ty(),
            right: r.ty(),
        }),
    }
}

impl Lambda {
    /// Evaluate the predicate against one root instance.
    ///
    /// # Errors
    /// Returns [`ExprError::NullReference`] when an unguarded navigation hits
    /// an absent reference, or a type error when `root` is not of the lambda's
    /// root type.
    pub fn evaluate(&self, root: &dyn Navigable) -> ExprResult<bool> {
        if root.type_info() != self.root() {
            return Err(ExprError::TypeMismatch {
                context: "lambda argument",
                expected: crate::ast::ExprType::Entity(self.root()),
                got: crate::ast::ExprType::Entity(root.type_info()),
            });
        }
        let scope = Scope {
            parameter: self.parameter(),
            root,
        };
        eval(self.body(), &scope)?.as_bool(self.body())
    }

    /// Keep the items for which the predicate holds.
    ///
    /// # Errors
    /// Propagates the first evaluation error.
    pub fn filter<'i, T: Navigable>(&self, items: &'i [T]) -> ExprResult<Vec<&'i T>> {
        let mut out = Vec::new();
        for item in items {
            if self.evaluate(item)? {
                out.push(item);
            }
        }
        tracing::trace!(lambda = %self, matched = out.len(), "in-memory filter");
        Ok(out)
    }
}
