#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Navigation expression trees.
//!
//! This crate provides:
//! - Static entity metadata with by-name member lookup (`schema`)
//! - Typed, checked expression trees and predicate lambdas (`ast`)
//! - In-memory evaluation with reference null semantics (`eval`)
//! - Null-guard folding for relational translation (`fold`)
//! - Eager-load include paths (`include`)

pub mod ast;
pub mod errors;
pub mod eval;
pub mod fold;
pub mod include;
pub mod schema;

pub use ast::{Expr, ExprType, Lambda, Value};
pub use errors::{ExprError, ExprResult};
pub use eval::Navigable;
pub use fold::fold_null_guards;
pub use include::{Include, Includes};
pub use schema::{MemberInfo, MemberKind, ScalarKind, TypeInfo, get_member_info};
