//! Translation of predicate lambdas into `SeaORM` / `sea-query` conditions.
//!
//! Navigation reads become `LEFT JOIN`s, one per distinct path. Scalar reads
//! become qualified columns on the joined alias. Null semantics follow the
//! in-memory evaluator, not SQL three-valued logic:
//!
//! - `x == 'lit'` is false when `x` is NULL (`x = 'lit' AND x IS NOT NULL`)
//! - `x == y` is true when both are NULL
//! - `x == null` is `x IS NULL`; for entities, the joined key `IS NULL`
//!
//! Entity-typed conditionals (`IIF(b == null, null, b.City)`) cannot be
//! expressed as a SQL value, so they are tracked as the joined alias plus an
//! extra "null when" guard that is folded into every later read.

use navexpr::{Expr, Lambda, MemberInfo, MemberKind, TypeInfo, Value};
use sea_orm::sea_query::{
    Alias, CaseStatement, Expr as SqlExpr, JoinType, Keyword,
    SelectStatement, SimpleExpr, Value as SqlValue,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Parameter {0} is not bound")]
    UnboundParameter(String),

    #[error("Collection navigation {0} cannot be translated")]
    CollectionNavigation(&'static str),

    #[error("Unsupported expression: {0}")]
    Unsupported(String),
}

/// Knobs for [`translate_predicate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslateOptions {
    /// Run [`navexpr::fold_null_guards`] before translating.
    pub fold_null_guards: bool,
}

/// One `LEFT JOIN <table> AS <alias> ON <parent_alias>.<foreign_key> = <alias>.<key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub alias: String,
    pub table: &'static str,
    pub key: &'static str,
    pub parent_alias: String,
    pub foreign_key: &'static str,
    /// Navigation member that produced this join.
    pub member: &'static str,
}

/// Joins plus a two-valued `WHERE` condition.
#[derive(Debug, Clone)]
pub struct TranslatedFilter {
    pub condition: SimpleExpr,
    pub joins: Vec<JoinSpec>,
}

impl TranslatedFilter {
    /// Add the joins and the condition to `stmt`.
    pub fn apply(&self, stmt: &mut SelectStatement) {
        for j in &self.joins {
            stmt.join_as(
                JoinType::LeftJoin,
                Alias::new(j.table),
                Alias::new(&j.alias),
                SqlExpr::col((Alias::new(&j.parent_alias), Alias::new(j.foreign_key)))
                    .equals((Alias::new(&j.alias), Alias::new(j.key))),
            );
        }
        stmt.and_where(self.condition.clone());
    }
}

/// Translate `lambda` against its root table.
///
/// # Errors
/// Returns `TranslateError` for collection navigations, unbound parameters and
/// entity-valued conditionals whose branches point at different paths.
pub fn translate_predicate(
    lambda: &Lambda,
    options: TranslateOptions,
) -> Result<TranslatedFilter, TranslateError> {
    let folded;
    let lambda = if options.fold_null_guards {
        folded = lambda.fold_null_guards();
        &folded
    } else {
        lambda
    };

    let mut t = Translator {
        parameter: lambda.parameter(),
        root: lambda.root(),
        joins: Vec::new(),
    };
    let body = t.translate(lambda.body())?;
    let condition = Translator::predicate(body)?;
    debug!(
        lambda = %lambda,
        joins = t.joins.len(),
        folded = options.fold_null_guards,
        "translated predicate"
    );
    Ok(TranslatedFilter {
        condition,
        joins: t.joins,
    })
}

#[derive(Clone, Debug)]
struct EntityRef {
    alias: String,
    info: &'static TypeInfo,
    null_when: Option<SimpleExpr>,
}

/// Shape of a translated node.
#[derive(Clone, Debug)]
enum Operand {
    /// Typed null constant.
    Null,
    /// Non-null literal.
    Literal(SimpleExpr),
    /// Column or computed value that may be NULL.
    Nullable(SimpleExpr),
    /// Two-valued boolean condition, never NULL.
    Predicate(SimpleExpr),
    Entity(EntityRef),
}

/// Scalar view used by equality.
struct Scalar {
    expr: SimpleExpr,
    nullable: bool,
}

struct Translator<'l> {
    parameter: &'l str,
    root: &'static TypeInfo,
    joins: Vec<JoinSpec>,
}

fn col(alias: &str, column: &str) -> SimpleExpr {
    SqlExpr::col((Alias::new(alias), Alias::new(column))).into()
}

fn null() -> SimpleExpr {
    SimpleExpr::Keyword(Keyword::Null)
}

fn always(value: bool) -> SimpleExpr {
    SqlExpr::cust(if value { "1=1" } else { "1=0" })
}

fn literal(value: &Value) -> Option<SimpleExpr> {
    let v = match value {
        Value::Null => return None,
        Value::String(s) => SqlValue::from(s.clone()),
        Value::I32(i) => SqlValue::from(*i),
        Value::Uuid(u) => SqlValue::from(*u),
        Value::Bool(b) => SqlValue::from(*b),
    };
    Some(SimpleExpr::Value(v))
}

fn or_guard(extra: SimpleExpr, existing: Option<SimpleExpr>) -> SimpleExpr {
    match existing {
        Some(g) => extra.or(g),
        None => extra,
    }
}

fn case(test: SimpleExpr, if_true: SimpleExpr, if_false: SimpleExpr) -> SimpleExpr {
    CaseStatement::new().case(test, if_true).finally(if_false).into()
}

impl Translator<'_> {
    fn translate(&mut self, expr: &Expr) -> Result<Operand, TranslateError> {
        match expr {
            Expr::Parameter { name, ty } => {
                if name != self.parameter {
                    return Err(TranslateError::UnboundParameter(name.clone()));
                }
                Ok(Operand::Entity(EntityRef {
                    alias: self.root.table.to_owned(),
                    info: *ty,
                    null_when: None,
                }))
            }
            Expr::Member { target, member } => {
                let target = self.translate(target)?;
                self.member(target, *member)
            }
            Expr::Constant { value, .. } => Ok(literal(value).map_or(Operand::Null, Operand::Literal)),
            Expr::Equal(l, r) => {
                let (l, r) = (self.translate(l)?, self.translate(r)?);
                Ok(Operand::Predicate(Self::equal(l, r)?))
            }
            Expr::NotEqual(l, r) => {
                let (l, r) = (self.translate(l)?, self.translate(r)?);
                Ok(Operand::Predicate(SqlExpr::expr(Self::equal(l, r)?).not()))
            }
            Expr::AndAlso(l, r) => {
                let l = self.translate(l)?;
                let r = self.translate(r)?;
                Ok(Operand::Predicate(Self::predicate(l)?.and(Self::predicate(r)?)))
            }
            Expr::OrElse(l, r) => {
                let l = self.translate(l)?;
                let r = self.translate(r)?;
                Ok(Operand::Predicate(Self::predicate(l)?.or(Self::predicate(r)?)))
            }
            Expr::Not(x) => {
                let x = self.translate(x)?;
                Ok(Operand::Predicate(SqlExpr::expr(Self::predicate(x)?).not()))
            }
            Expr::Condition {
                test,
                if_true,
                if_false,
            } => {
                let test = self.translate(test)?;
                let test = Self::predicate(test)?;
                let a = self.translate(if_true)?;
                let b = self.translate(if_false)?;
                Self::condition(test, a, b)
            }
        }
    }

    fn member(
        &mut self,
        target: Operand,
        member: &'static MemberInfo,
    ) -> Result<Operand, TranslateError> {
        let entity = match target {
            // Relational null propagation: reading through null yields null.
            Operand::Null => return Ok(Operand::Null),
            Operand::Entity(e) => e,
            other => {
                return Err(TranslateError::Unsupported(format!(
                    "member {} on non-entity operand {other:?}",
                    member.name
                )));
            }
        };

        match member.kind {
            MemberKind::Scalar { column, .. } => {
                let value = col(&entity.alias, column);
                Ok(Operand::Nullable(match entity.null_when {
                    Some(guard) => case(guard, null(), value),
                    None => value,
                }))
            }
            MemberKind::Reference {
                foreign_key,
                target,
            } => {
                let alias = self.join(&entity.alias, member, foreign_key, target);
                Ok(Operand::Entity(EntityRef {
                    alias,
                    info: target,
                    null_when: entity.null_when,
                }))
            }
            MemberKind::Collection { .. } => Err(TranslateError::CollectionNavigation(member.name)),
        }
    }

    /// Alias for `parent.member`, adding the join on first use.
    fn join(
        &mut self,
        parent_alias: &str,
        member: &'static MemberInfo,
        foreign_key: &'static str,
        target: &'static TypeInfo,
    ) -> String {
        if let Some(existing) = self
            .joins
            .iter()
            .find(|j| j.parent_alias == parent_alias && j.member == member.name)
        {
            return existing.alias.clone();
        }
        let alias = format!("t{}", self.joins.len());
        self.joins.push(JoinSpec {
            alias: alias.clone(),
            table: target.table,
            key: target.key,
            parent_alias: parent_alias.to_owned(),
            foreign_key,
            member: member.name,
        });
        alias
    }

    fn condition(test: SimpleExpr, a: Operand, b: Operand) -> Result<Operand, TranslateError> {
        match (a, b) {
            (Operand::Null, Operand::Null) => Ok(Operand::Null),
            (Operand::Null, Operand::Entity(e)) => Ok(Operand::Entity(EntityRef {
                null_when: Some(or_guard(test, e.null_when)),
                ..e
            })),
            (Operand::Entity(e), Operand::Null) => Ok(Operand::Entity(EntityRef {
                null_when: Some(or_guard(SqlExpr::expr(test).not(), e.null_when)),
                ..e
            })),
            (Operand::Entity(x), Operand::Entity(y)) => {
                if x.alias == y.alias && x.null_when == y.null_when {
                    Ok(Operand::Entity(x))
                } else {
                    Err(TranslateError::Unsupported(format!(
                        "conditional over different navigations {} and {}",
                        x.alias, y.alias
                    )))
                }
            }
            (Operand::Entity(e), _) | (_, Operand::Entity(e)) => Err(TranslateError::Unsupported(
                format!("conditional mixing entity {} with a scalar", e.info.name),
            )),
            (a, b) => Ok(Operand::Nullable(case(test, value_of(a), value_of(b)))),
        }
    }

    fn equal(l: Operand, r: Operand) -> Result<SimpleExpr, TranslateError> {
        match (l, r) {
            (Operand::Null, Operand::Null) => Ok(always(true)),
            (Operand::Entity(e), Operand::Null) | (Operand::Null, Operand::Entity(e)) => {
                Ok(Self::entity_is_null(&e))
            }
            (Operand::Entity(a), Operand::Entity(b)) => Err(TranslateError::Unsupported(format!(
                "entity comparison between {} and {}",
                a.info.name, b.info.name
            ))),
            (Operand::Entity(e), _) | (_, Operand::Entity(e)) => Err(TranslateError::Unsupported(
                format!("entity {} compared with a scalar", e.info.name),
            )),
            (Operand::Null, other) | (other, Operand::Null) => {
                let s = scalar(other);
                Ok(if s.nullable {
                    SqlExpr::expr(s.expr).is_null()
                } else {
                    always(false)
                })
            }
            (l, r) => {
                let (a, b) = (scalar(l), scalar(r));
                let eq = SqlExpr::expr(a.expr.clone()).eq(b.expr.clone());
                Ok(match (a.nullable, b.nullable) {
                    (false, false) => eq,
                    (true, false) => eq.and(SqlExpr::expr(a.expr).is_not_null()),
                    (false, true) => eq.and(SqlExpr::expr(b.expr).is_not_null()),
                    (true, true) => {
                        let both_present = eq
                            .and(SqlExpr::expr(a.expr.clone()).is_not_null())
                            .and(SqlExpr::expr(b.expr.clone()).is_not_null());
                        let both_null = SqlExpr::expr(a.expr)
                            .is_null()
                            .and(SqlExpr::expr(b.expr).is_null());
                        both_present.or(both_null)
                    }
                })
            }
        }
    }

    fn entity_is_null(e: &EntityRef) -> SimpleExpr {
        let key_null = SqlExpr::expr(col(&e.alias, e.info.key)).is_null();
        or_guard(key_null, e.null_when.clone())
    }

    /// Coerce an operand into a two-valued condition.
    fn predicate(op: Operand) -> Result<SimpleExpr, TranslateError> {
        match op {
            Operand::Predicate(p) => Ok(p),
            Operand::Null => Ok(always(false)),
            Operand::Literal(v) => Ok(SqlExpr::expr(v).eq(true)),
            Operand::Nullable(v) => Self::equal(
                Operand::Nullable(v),
                Operand::Literal(SimpleExpr::Value(SqlValue::from(true))),
            ),
            Operand::Entity(e) => Err(TranslateError::Unsupported(format!(
                "entity {} used as a condition",
                e.info.name
            ))),
        }
    }
}

fn value_of(op: Operand) -> SimpleExpr {
    match op {
        Operand::Literal(v) | Operand::Nullable(v) | Operand::Predicate(v) => v,
        Operand::Null | Operand::Entity(_) => null(),
    }
}

fn scalar(op: Operand) -> Scalar {
    match op {
        Operand::Literal(expr) | Operand::Predicate(expr) => Scalar {
            expr,
            nullable: false,
        },
        Operand::Nullable(expr) => Scalar {
            expr,
            nullable: true,
        },
        Operand::Null | Operand::Entity(_) => Scalar {
            expr: null(),
            nullable: true,
        },
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use navexpr::{ExprType, MemberInfo, ScalarKind};
    use sea_orm::sea_query::{Query, SqliteQueryBuilder};

    static CITY: TypeInfo = TypeInfo {
        name: "TCity",
        table: "TCities",
        key: "Id",
        members: &[
            MemberInfo::scalar("Id", "Id", ScalarKind::I32),
            MemberInfo::scalar("Name", "Name", ScalarKind::String),
        ],
    };

    static BUILDER: TypeInfo = TypeInfo {
        name: "TBuilder",
        table: "TBuilders",
        key: "Id",
        members: &[
            MemberInfo::scalar("Id", "Id", ScalarKind::I32),
            MemberInfo::reference("City", "CityId", &CITY),
        ],
    };

    static OWNER: TypeInfo = TypeInfo {
        name: "TOwner",
        table: "TOwners",
        key: "Id",
        members: &[
            MemberInfo::scalar("Id", "Id", ScalarKind::I32),
            MemberInfo::collection("Sites", "OwnerId", &SITE),
        ],
    };

    static SITE: TypeInfo = TypeInfo {
        name: "TSite",
        table: "TSites",
        key: "Id",
        members: &[
            MemberInfo::scalar("Id", "Id", ScalarKind::I32),
            MemberInfo::scalar("Label", "Label", ScalarKind::String),
            MemberInfo::reference("Builder", "BuilderId", &BUILDER),
            MemberInfo::reference("Owner", "OwnerId", &OWNER),
        ],
    };

    fn guarded(city: &str) -> Lambda {
        let s = Expr::parameter("s", &SITE);
        let builder = Expr::member_access(s.clone(), "Builder").unwrap();
        let city_nav = Expr::member_access(builder.clone(), "City").unwrap();
        let name = Expr::member_access(city_nav.clone(), "Name").unwrap();
        let inner = Expr::condition(
            Expr::equal(builder, Expr::null_entity(&BUILDER)).unwrap(),
            Expr::null_entity(&CITY),
            city_nav,
        )
        .unwrap();
        let outer = Expr::condition(
            Expr::equal(inner, Expr::null_entity(&CITY)).unwrap(),
            Expr::null_of(ExprType::Scalar(ScalarKind::String)),
            name,
        )
        .unwrap();
        Lambda::predicate(s, Expr::equal(outer, Expr::string(city)).unwrap()).unwrap()
    }

    fn render(filter: &TranslatedFilter) -> String {
        let mut stmt = Query::select();
        stmt.column((Alias::new("TSites"), Alias::new("Id")))
            .from(Alias::new("TSites"));
        filter.apply(&mut stmt);
        stmt.to_string(SqliteQueryBuilder)
    }

    #[test]
    fn guarded_chain_reuses_one_join_per_navigation() {
        let filter = translate_predicate(&guarded("Leeds"), TranslateOptions::default()).unwrap();
        assert_eq!(filter.joins.len(), 2);
        assert_eq!(filter.joins[0].table, "TBuilders");
        assert_eq!(filter.joins[0].parent_alias, "TSites");
        assert_eq!(filter.joins[1].table, "TCities");
        assert_eq!(filter.joins[1].parent_alias, filter.joins[0].alias);

        let sql = render(&filter);
        assert!(sql.contains(r#"LEFT JOIN "TBuilders" AS "t0" ON "TSites"."BuilderId" = "t0"."Id""#), "{sql}");
        assert!(sql.contains(r#"LEFT JOIN "TCities" AS "t1" ON "t0"."CityId" = "t1"."Id""#), "{sql}");
        assert!(sql.contains("CASE WHEN"), "{sql}");
        assert!(sql.contains("'Leeds'"), "{sql}");
    }

    #[test]
    fn folding_removes_case_but_keeps_joins() {
        let options = TranslateOptions {
            fold_null_guards: true,
        };
        let filter = translate_predicate(&guarded("Leeds"), options).unwrap();
        assert_eq!(filter.joins.len(), 2);
        let sql = render(&filter);
        assert!(!sql.contains("CASE"), "{sql}");
        assert!(sql.contains(r#""t1"."Name" = 'Leeds'"#), "{sql}");
        assert!(sql.contains(r#""t1"."Name" IS NOT NULL"#), "{sql}");
    }

    #[test]
    fn entity_null_check_uses_joined_key() {
        let s = Expr::parameter("s", &SITE);
        let builder = Expr::member_access(s.clone(), "Builder").unwrap();
        let body = Expr::equal(builder, Expr::null_entity(&BUILDER)).unwrap();
        let filter =
            translate_predicate(&Lambda::predicate(s, body).unwrap(), TranslateOptions::default())
                .unwrap();
        let sql = render(&filter);
        assert!(sql.contains(r#""t0"."Id" IS NULL"#), "{sql}");
    }

    #[test]
    fn comparison_with_null_literal_is_is_null() {
        let s = Expr::parameter("s", &SITE);
        let label = Expr::member_access(s.clone(), "Label").unwrap();
        let body = Expr::equal(label, Expr::null_of(ExprType::Scalar(ScalarKind::String))).unwrap();
        let filter =
            translate_predicate(&Lambda::predicate(s, body).unwrap(), TranslateOptions::default())
                .unwrap();
        assert!(filter.joins.is_empty());
        let sql = render(&filter);
        assert!(sql.contains(r#""TSites"."Label" IS NULL"#), "{sql}");
    }

    #[test]
    fn unbound_parameter_is_rejected() {
        let s = Expr::parameter("s", &SITE);
        let other = Expr::parameter("x", &SITE);
        let label = Expr::member_access(other, "Label").unwrap();
        let body = Expr::equal(label, Expr::string("a")).unwrap();
        let err =
            translate_predicate(&Lambda::predicate(s, body).unwrap(), TranslateOptions::default())
                .unwrap_err();
        assert_eq!(err, TranslateError::UnboundParameter("x".to_owned()));
    }

    #[test]
    fn conditional_over_different_paths_is_rejected() {
        let s = Expr::parameter("s", &SITE);
        let builder = Expr::member_access(s.clone(), "Builder").unwrap();
        let missing = Expr::equal(builder.clone(), Expr::null_entity(&BUILDER)).unwrap();
        let city = Expr::member_access(builder, "City").unwrap();
        let other_city = Expr::member_access(
            Expr::condition(missing.clone(), Expr::null_entity(&BUILDER), Expr::member_access(s.clone(), "Builder").unwrap()).unwrap(),
            "City",
        )
        .unwrap();
        // Same alias, different guards.
        let pick = Expr::condition(missing, city, other_city).unwrap();
        let body = Expr::equal(pick, Expr::null_entity(&CITY)).unwrap();
        let err =
            translate_predicate(&Lambda::predicate(s, body).unwrap(), TranslateOptions::default())
                .unwrap_err();
        assert!(matches!(err, TranslateError::Unsupported(_)));
    }
}
