//! Field resolvers bound into the generated schema.
//!
//! Root fields compile and run one statement each. Column fields read from the
//! parent [`Record`]. Relation fields hand the parent's primary key to the
//! request's batcher and wait for their share of the batch.

use std::sync::Arc;

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use async_graphql::{ErrorExtensions, SelectionField};

use super::errors::ResolveError;
use super::types::{arguments_to_json, to_graphql};
use crate::compiler::{compile_select, SelectionRequest, ToSql};
use crate::loader::{RelationLoader, RequestScope};
use crate::model::{Entity, Scalar};
use crate::warehouse::Record;

/// Leaf fields of a selection in request order. Fields with their own
/// selection set (relations) and introspection fields are skipped; fragments
/// are already flattened by the executor.
pub fn leaf_fields(field: SelectionField<'_>) -> Vec<String> {
    field
        .selection_set()
        .filter(|f| !f.name().starts_with("__"))
        .filter(|f| f.selection_set().next().is_none())
        .map(|f| f.name().to_string())
        .collect()
}

fn scope<'a>(ctx: &ResolverContext<'a>) -> Result<&'a RequestScope, ResolveError> {
    ctx.ctx
        .data::<RequestScope>()
        .map_err(|_| ResolveError::Internal("request scope missing from context".to_string()))
}

fn parent_record<'a>(ctx: &ResolverContext<'a>) -> Result<&'a Record, ResolveError> {
    ctx.parent_value
        .try_downcast_ref::<Record>()
        .map_err(|_| ResolveError::Internal("parent value is not a record".to_string()))
}

fn records_to_list(records: Vec<Record>) -> FieldValue<'static> {
    FieldValue::list(records.into_iter().map(FieldValue::owned_any))
}

pub fn root_resolver(
    entity: Arc<Entity>,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
    move |ctx| {
        let entity = entity.clone();
        FieldFuture::new(async move { resolve_root(&entity, &ctx).await.map_err(|e| e.extend()) })
    }
}

async fn resolve_root<'a>(
    entity: &Entity,
    ctx: &ResolverContext<'a>,
) -> Result<Option<FieldValue<'a>>, ResolveError> {
    let scope = scope(ctx)?;
    let arguments = arguments_to_json(ctx.args.as_index_map());
    log::trace!("Resolving {} with arguments {:?}", entity.name, arguments);

    let request = SelectionRequest::from_arguments(leaf_fields(ctx.ctx.field()), &arguments)?;
    let statement = compile_select(entity, &request, scope.identifier_case())?;
    let records = scope.run(&statement.to_sql()).await?;
    Ok(Some(records_to_list(records)))
}

pub fn column_resolver(
    column: String,
    scalar: Scalar,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
    move |ctx| {
        let column = column.clone();
        FieldFuture::new(async move {
            resolve_column(&column, scalar, &ctx).map_err(|e| e.extend())
        })
    }
}

fn resolve_column<'a>(
    column: &str,
    scalar: Scalar,
    ctx: &ResolverContext<'a>,
) -> Result<Option<FieldValue<'a>>, ResolveError> {
    let record = parent_record(ctx)?;
    let key = scope(ctx)?.identifier_case().normalize(column);
    Ok(record
        .get(&key)
        .and_then(|value| to_graphql(scalar, value))
        .map(FieldValue::value))
}

pub fn relation_resolver(
    relation: Arc<RelationLoader>,
    owner_primary_key: String,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
    move |ctx| {
        let relation = relation.clone();
        let owner_primary_key = owner_primary_key.clone();
        FieldFuture::new(async move {
            resolve_relation(&relation, &owner_primary_key, &ctx)
                .await
                .map_err(|e| e.extend())
        })
    }
}

async fn resolve_relation<'a>(
    relation: &Arc<RelationLoader>,
    owner_primary_key: &str,
    ctx: &ResolverContext<'a>,
) -> Result<Option<FieldValue<'a>>, ResolveError> {
    let scope = scope(ctx)?;
    let record = parent_record(ctx)?;
    let key = record
        .get(&scope.identifier_case().normalize(owner_primary_key))
        .cloned()
        .unwrap_or_default();
    let rows = scope.load(relation, key).await?;
    Ok(Some(records_to_list(rows)))
}
