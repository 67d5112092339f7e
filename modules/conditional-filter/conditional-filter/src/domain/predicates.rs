//! Predicates over buildings, built by reflection.

use navexpr::{Expr, ExprResult, ExprType, Lambda, ScalarKind, get_member_info};

use super::model::{BUILDER, BUILDING, CITY};

/// Parameter name used for building predicates.
pub const PARAMETER: &str = "s";

/// `s => (IIF((IIF((s.Builder == null), null, s.Builder.City) == null), null, s.Builder.City.Name) == "<city>")`
///
/// Each navigation step is guarded, so evaluation never dereferences an
/// absent builder or city. An absent name compares false against `city`.
///
/// # Errors
/// Fails only if the reflection metadata no longer declares the members used.
pub fn city_name_predicate(city: &str) -> ExprResult<Lambda> {
    let s = Expr::parameter(PARAMETER, &BUILDING);
    let builder = Expr::make_member_access(s.clone(), get_member_info(&BUILDING, "Builder")?)?;
    let city_nav = Expr::make_member_access(builder.clone(), get_member_info(&BUILDER, "City")?)?;
    let name = Expr::make_member_access(city_nav.clone(), get_member_info(&CITY, "Name")?)?;

    let city_or_null = Expr::condition(
        Expr::equal(builder, Expr::null_entity(&BUILDER))?,
        Expr::null_entity(&CITY),
        city_nav,
    )?;
    let name_or_null = Expr::condition(
        Expr::equal(city_or_null, Expr::null_entity(&CITY))?,
        Expr::null_of(ExprType::Scalar(ScalarKind::String)),
        name,
    )?;

    Lambda::predicate(s, Expr::equal(name_or_null, Expr::string(city))?)
}

/// `s => (s.Builder.City.Name == "<city>")` with no guards.
///
/// Equivalent to [`city_name_predicate`] in SQL; in memory it fails on a
/// building whose builder or city is absent.
///
/// # Errors
/// Same as [`city_name_predicate`].
pub fn unguarded_city_name_predicate(city: &str) -> ExprResult<Lambda> {
    let s = Expr::parameter(PARAMETER, &BUILDING);
    let name = Expr::member_access(
        Expr::member_access(Expr::member_access(s.clone(), "Builder")?, "City")?,
        "Name",
    )?;
    Lambda::predicate(s, Expr::equal(name, Expr::string(city))?)
}
