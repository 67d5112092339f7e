use thiserror::Error;

use crate::ast::ExprType;

/// Errors raised while building or evaluating expression trees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("Member {member} does not exist on {type_name}")]
    UnknownMember {
        type_name: &'static str,
        member: String,
    },

    #[error("Type mismatch in {context}: expected {expected}, got {got}")]
    TypeMismatch {
        context: &'static str,
        expected: ExprType,
        got: ExprType,
    },

    #[error("Comparison between {left} and {right} is not supported")]
    UnsupportedComparison { left: ExprType, right: ExprType },

    #[error("Member access requires an entity, got {0}")]
    NotAnEntity(ExprType),

    #[error("Collection member {0} cannot be used in an expression")]
    CollectionMember(&'static str),

    #[error("Member {0} is not a navigation")]
    NotANavigation(&'static str),

    #[error("Null reference while reading member {member}")]
    NullReference { member: &'static str },

    #[error("Expression of type {0} is not a predicate")]
    NotAPredicate(ExprType),

    #[error("Lambda parameter must be a parameter expression")]
    NotAParameter,

    #[error("Parameter {name} is not bound")]
    UnboundParameter { name: String },
}

pub type ExprResult<T> = Result<T, ExprError>;
