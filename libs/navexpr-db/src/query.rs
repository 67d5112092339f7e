//! Filtered, eager-loading queries over `SeaORM` entities.
//!
//! Filtering and eager loading are kept apart: the predicate is translated
//! into `LEFT JOIN`s plus a `WHERE` on the root select, and includes are
//! loaded afterwards by [`Materialize`] with one extra query per navigation.
//! Loading an include therefore never changes how many roots come back.

use std::marker::PhantomData;

use async_trait::async_trait;
use navexpr::{Include, Includes, Lambda, Navigable, TypeInfo};
use sea_orm::sea_query::{Alias, Expr as SqlExpr, SimpleExpr};
use sea_orm::{
    DatabaseConnection, DbBackend, EntityTrait, Order, PaginatorTrait, QueryOrder, QueryTrait,
    Select,
};
use tracing::debug;

use crate::translate::{TranslateOptions, translate_predicate};
use crate::{DbError, Result};

/// Entity with reflection metadata for expression building.
pub trait NavEntity: EntityTrait {
    fn type_info() -> &'static TypeInfo;
}

type ModelOf<M> = <<M as Materialize>::Entity as EntityTrait>::Model;

/// Turns root rows into an object graph, loading the requested navigations.
#[async_trait]
pub trait Materialize: Sized + Send {
    type Entity: NavEntity;

    /// Navigation paths this graph can hold. Any prefix of a listed path is
    /// accepted too.
    const INCLUDABLE: &'static [&'static [&'static str]];

    /// # Errors
    /// Returns `DbError` when a related query fails.
    async fn materialize(
        conn: &DatabaseConnection,
        roots: Vec<ModelOf<Self>>,
        includes: &Includes,
    ) -> Result<Vec<Self>>;
}

/// Query over `E` with an optional predicate and eager-load paths.
#[must_use]
#[derive(Clone, Debug)]
pub struct NavQuery<E: NavEntity> {
    filter: Option<Lambda>,
    includes: Includes,
    options: TranslateOptions,
    _entity: PhantomData<E>,
}

impl<E: NavEntity> Default for NavQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: NavEntity> NavQuery<E> {
    pub fn new() -> Self {
        Self {
            filter: None,
            includes: Includes::new(),
            options: TranslateOptions::default(),
            _entity: PhantomData,
        }
    }

    /// Set the predicate. Replaces any previous one.
    ///
    /// # Errors
    /// Returns `DbError::RootMismatch` when the lambda is rooted at another type.
    pub fn filter(mut self, lambda: Lambda) -> Result<Self> {
        check_root::<E>(lambda.root())?;
        self.filter = Some(lambda);
        Ok(self)
    }

    /// Add an eager-load path.
    ///
    /// # Errors
    /// Returns `DbError::RootMismatch` when the path starts at another type.
    pub fn include(mut self, include: Include) -> Result<Self> {
        check_root::<E>(include.root())?;
        self.includes.push(include);
        Ok(self)
    }

    pub fn with_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn includes(&self) -> &Includes {
        &self.includes
    }

    #[must_use]
    pub fn predicate(&self) -> Option<&Lambda> {
        self.filter.as_ref()
    }

    /// Root select with the translated filter, ordered by primary key.
    ///
    /// # Errors
    /// Returns `DbError::Translate` when the predicate cannot be expressed in SQL.
    pub fn select(&self) -> Result<Select<E>> {
        let info = E::type_info();
        let mut select = E::find();
        if let Some(lambda) = &self.filter {
            let translated = translate_predicate(lambda, self.options)?;
            translated.apply(QueryTrait::query(&mut select));
        }
        let key: SimpleExpr = SqlExpr::col((Alias::new(info.table), Alias::new(info.key))).into();
        Ok(QueryOrder::order_by(select, key, Order::Asc))
    }

    /// SQL for [`NavQuery::select`] with values inlined.
    ///
    /// # Errors
    /// Same as [`NavQuery::select`].
    pub fn to_sql(&self, backend: DbBackend) -> Result<String> {
        Ok(self.select()?.build(backend).to_string())
    }

    /// Run the filtered select and materialize the requested includes.
    ///
    /// # Errors
    /// Returns `DbError::UnsupportedInclude` for paths `M` cannot hold, or any
    /// translation or database error.
    pub async fn to_list<M>(&self, conn: &DatabaseConnection) -> Result<Vec<M>>
    where
        M: Materialize<Entity = E>,
    {
        self.check_includes::<M>()?;
        let roots = self.select()?.all(conn).await?;
        debug!(
            entity = E::type_info().name,
            roots = roots.len(),
            includes = self.includes.len(),
            "loaded roots"
        );
        M::materialize(conn, roots, &self.includes).await
    }

    /// Count matching roots.
    ///
    /// # Errors
    /// Returns a translation or database error.
    pub async fn count(&self, conn: &DatabaseConnection) -> Result<u64>
    where
        E::Model: Sync,
    {
        Ok(self.select()?.count(conn).await?)
    }

    /// Load every root with all includable navigations and apply the predicate
    /// in memory.
    ///
    /// The result is the reference answer for [`NavQuery::to_list`]: same rows,
    /// same order. Returned graphs carry every navigation, not just the
    /// requested includes.
    ///
    /// # Errors
    /// Returns `DbError::Expr` when evaluation fails, e.g. on an unguarded
    /// navigation through an absent reference.
    pub async fn evaluate_in_memory<M>(&self, conn: &DatabaseConnection) -> Result<Vec<M>>
    where
        M: Materialize<Entity = E> + Navigable,
    {
        let info = E::type_info();
        let mut all = Includes::new();
        for path in M::INCLUDABLE {
            all.push(include_path(info, path)?);
        }
        for include in self.includes.iter() {
            all.push(include.clone());
        }
        self.check_includes::<M>()?;

        let key: SimpleExpr = SqlExpr::col((Alias::new(info.table), Alias::new(info.key))).into();
        let roots = QueryOrder::order_by(E::find(), key, Order::Asc).all(conn).await?;
        let graphs = M::materialize(conn, roots, &all).await?;

        let Some(lambda) = &self.filter else {
            return Ok(graphs);
        };
        let mut out = Vec::with_capacity(graphs.len());
        for graph in graphs {
            if lambda.evaluate(&graph)? {
                out.push(graph);
            }
        }
        debug!(lambda = %lambda, matched = out.len(), "evaluated in memory");
        Ok(out)
    }

    fn check_includes<M: Materialize>(&self) -> Result<()> {
        for include in self.includes.iter() {
            let supported = M::INCLUDABLE.iter().any(|allowed| {
                include.path().len() <= allowed.len()
                    && include
                        .path()
                        .iter()
                        .zip(allowed.iter())
                        .all(|(m, name)| m.name.eq_ignore_ascii_case(name))
            });
            if !supported {
                return Err(DbError::UnsupportedInclude {
                    root: E::type_info().name,
                    path: include.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn check_root<E: NavEntity>(got: &'static TypeInfo) -> Result<()> {
    let expected = E::type_info();
    if got == expected {
        Ok(())
    } else {
        Err(DbError::RootMismatch {
            expected: expected.name,
            got: got.name,
        })
    }
}

/// Resolve a dotted path of member names into an [`Include`].
///
/// # Errors
/// Returns `DbError::Expr` for unknown members or non-navigations.
pub fn include_path(root: &'static TypeInfo, path: &[&str]) -> Result<Include> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| DbError::InvalidConfig("empty include path".to_owned()))?;
    let mut include = Include::new(root, first)?;
    for name in rest {
        include = include.then_include(name)?;
    }
    Ok(include)
}
