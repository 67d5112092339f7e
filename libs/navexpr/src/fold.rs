//! Null-guard folding.
//!
//! Under relational null propagation a member read through an absent
//! navigation already yields NULL, so a guard of the form
//! `IIF(x == null, null, x.m)` is equivalent to `x.m`. The rewrite is applied
//! bottom-up so that nested guards collapse into a plain member chain:
//!
//! ```text
//! IIF((IIF((s.Builder == null), null, s.Builder.City) == null), null, s.Builder.City.Name)
//!   => s.Builder.City.Name
//! ```
//!
//! Folding is NOT valid for in-memory evaluation, where reading through an
//! absent reference raises [`crate::ExprError::NullReference`].

use crate::ast::{Expr, Lambda};

/// Fold every recognised null guard in `expr`.
#[must_use]
pub fn fold_null_guards(expr: &Expr) -> Expr {
    match expr {
        Expr::Parameter { .. } | Expr::Constant { .. } => expr.clone(),
        Expr::Member { target, member } => Expr::Member {
            target: Box::new(fold_null_guards(target)),
            member: *member,
        },
        Expr::Equal(l, r) => {
            Expr::Equal(Box::new(fold_null_guards(l)), Box::new(fold_null_guards(r)))
        }
        Expr::NotEqual(l, r) => {
            Expr::NotEqual(Box::new(fold_null_guards(l)), Box::new(fold_null_guards(r)))
        }
        Expr::AndAlso(l, r) => {
            Expr::AndAlso(Box::new(fold_null_guards(l)), Box::new(fold_null_guards(r)))
        }
        Expr::OrElse(l, r) => {
            Expr::OrElse(Box::new(fold_null_guards(l)), Box::new(fold_null_guards(r)))
        }
        Expr::Not(x) => Expr::Not(Box::new(fold_null_guards(x))),
        Expr::Condition {
            test,
            if_true,
            if_false,
        } => {
            let test = fold_null_guards(test);
            let if_true = fold_null_guards(if_true);
            let if_false = fold_null_guards(if_false);
            match guarded_member(&test, &if_true, &if_false) {
                Some(member) => member,
                None => Expr::Condition {
                    test: Box::new(test),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                },
            }
        }
    }
}

impl Lambda {
    /// Copy of this lambda with null guards folded.
    #[must_use]
    pub fn fold_null_guards(&self) -> Lambda {
        self.with_body(fold_null_guards(self.body()))
    }
}

/// Recognise `IIF(x == null, null, x.m)` and `IIF(x != null, x.m, null)`.
fn guarded_member(test: &Expr, if_true: &Expr, if_false: &Expr) -> Option<Expr> {
    let (guarded, on_null, on_present) = match test {
        Expr::Equal(l, r) => (null_checked(l, r)?, if_true, if_false),
        Expr::NotEqual(l, r) => (null_checked(l, r)?, if_false, if_true),
        _ => return None,
    };
    if !on_null.is_null_constant() {
        return None;
    }
    match on_present {
        Expr::Member { target, .. } if **target == *guarded => Some(on_present.clone()),
        _ => None,
    }
}

fn null_checked<'e>(l: &'e Expr, r: &'e Expr) -> Option<&'e Expr> {
    match (l.is_null_constant(), r.is_null_constant()) {
        (false, true) => Some(l),
        (true, false) => Some(r),
        _ => None,
    }
}
