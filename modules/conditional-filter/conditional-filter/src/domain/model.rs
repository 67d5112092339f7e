//! Reflection metadata for the four entities.
//!
//! Member names are the property names used when building expressions;
//! columns are the physical names from the migration.

use navexpr::{MemberInfo, ScalarKind, TypeInfo};
use navexpr_db::NavEntity;

use crate::infra::storage::entity::{builder, building, city, mandator};

pub static CITY: TypeInfo = TypeInfo {
    name: "TCity",
    table: "TCities",
    key: "Id",
    members: &[
        MemberInfo::scalar("Id", "Id", ScalarKind::I32),
        MemberInfo::scalar("Name", "Name", ScalarKind::String),
    ],
};

pub static BUILDER: TypeInfo = TypeInfo {
    name: "TBuilder",
    table: "TBuilders",
    key: "Id",
    members: &[
        MemberInfo::scalar("Id", "Id", ScalarKind::I32),
        MemberInfo::scalar("Name", "Name", ScalarKind::String),
        MemberInfo::scalar("CityId", "CityId", ScalarKind::I32),
        MemberInfo::reference("City", "CityId", &CITY),
    ],
};

pub static MANDATOR: TypeInfo = TypeInfo {
    name: "TMandator",
    table: "G_TMandator",
    key: "pkMandatorID",
    members: &[
        MemberInfo::scalar("Id", "pkMandatorID", ScalarKind::I32),
        MemberInfo::scalar("Identity", "gIdentity", ScalarKind::Uuid),
        MemberInfo::scalar("Name", "sName", ScalarKind::String),
        MemberInfo::collection("Buildings", "fkMandatorID", &BUILDING),
    ],
};

pub static BUILDING: TypeInfo = TypeInfo {
    name: "TBuilding",
    table: "OB_TBuilding",
    key: "pkBID",
    members: &[
        MemberInfo::scalar("Id", "pkBID", ScalarKind::I32),
        MemberInfo::scalar("Identity", "Identifier", ScalarKind::Uuid),
        MemberInfo::scalar("LongName", "sLongName", ScalarKind::String),
        MemberInfo::scalar("BuilderId", "BuilderId", ScalarKind::I32),
        MemberInfo::reference("Builder", "BuilderId", &BUILDER),
        MemberInfo::reference("Mandator", "fkMandatorID", &MANDATOR),
        MemberInfo::scalar("MandatorId", "fkMandatorID", ScalarKind::I32),
    ],
};

impl NavEntity for city::Entity {
    fn type_info() -> &'static TypeInfo {
        &CITY
    }
}

impl NavEntity for builder::Entity {
    fn type_info() -> &'static TypeInfo {
        &BUILDER
    }
}

impl NavEntity for mandator::Entity {
    fn type_info() -> &'static TypeInfo {
        &MANDATOR
    }
}

impl NavEntity for building::Entity {
    fn type_info() -> &'static TypeInfo {
        &BUILDING
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use navexpr::MemberKind;
    use sea_orm::{EntityTrait, IdenStatic, Iterable};

    fn columns<E: EntityTrait>() -> Vec<String> {
        E::Column::iter().map(|c| c.as_str().to_owned()).collect()
    }

    fn assert_matches_entity<E: EntityTrait + Default>(info: &'static TypeInfo) {
        assert_eq!(E::default().table_name(), info.table);
        let cols = columns::<E>();
        assert!(cols.iter().any(|c| c == info.key), "{} key {}", info.name, info.key);
        for m in info.members {
            match m.kind {
                MemberKind::Scalar { column, .. } => {
                    assert!(cols.iter().any(|c| c == column), "{}.{} -> {column}", info.name, m.name);
                }
                MemberKind::Reference { foreign_key, .. } => {
                    assert!(cols.iter().any(|c| c == foreign_key), "{}.{} fk", info.name, m.name);
                }
                MemberKind::Collection { foreign_key, target } => {
                    assert!(target.members.iter().any(|t| matches!(
                        t.kind,
                        MemberKind::Scalar { column, .. } if column == foreign_key
                    )));
                }
            }
        }
    }

    #[test]
    fn metadata_matches_entity_columns() {
        assert_matches_entity::<city::Entity>(&CITY);
        assert_matches_entity::<builder::Entity>(&BUILDER);
        assert_matches_entity::<mandator::Entity>(&MANDATOR);
        assert_matches_entity::<building::Entity>(&BUILDING);
    }

    #[test]
    fn entity_links_resolve_to_the_expected_types() {
        let builder = BUILDING.member("builder").unwrap();
        assert_eq!(builder.target(), Some(&BUILDER));
        let city = BUILDER.member("City").unwrap();
        assert_eq!(city.target(), Some(&CITY));
        assert!(MANDATOR.member("Buildings").unwrap().is_navigation());
    }
}
