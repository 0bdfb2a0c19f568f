//! Two-pass GraphQL schema generation.
//!
//! Pass one creates, for every entity, its object type (columns only) and the
//! `filter`/`sort` input types of its root field. Pass two adds one list field
//! per foreign key, named after the target entity. Only then are the objects
//! registered, so relation fields can refer to any entity regardless of
//! declaration order.
//!
//! Every generated type name goes through the builder's own registry, which
//! rejects collisions that the executor would otherwise accept silently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, Field, InputObject, InputValue, Object, Schema as DynamicSchema, Type, TypeRef,
};
use lazy_static::lazy_static;
use regex::Regex;

use super::errors::SchemaBuildError;
use super::resolvers::{column_resolver, relation_resolver, root_resolver};
use super::types::{datetime_scalar, type_name, DATETIME_SCALAR};
use crate::compiler::{FilterOp, DEFAULT_LIMIT};
use crate::loader::RelationLoader;
use crate::model::{Entity, Schema};

pub const QUERY_TYPE: &str = "RootQuery";
pub const DIRECTION_ENUM: &str = "direction";

lazy_static! {
    static ref GRAPHQL_NAME: Regex =
        Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").expect("name pattern should compile");
}

pub fn filter_type_name(entity: &str) -> String {
    format!("{}_filter", entity)
}

pub fn column_filter_type_name(entity: &str, column: &str) -> String {
    format!("filter_{}_{}", entity, column)
}

pub fn sort_type_name(entity: &str) -> String {
    format!("{}_sort", entity)
}

fn check_name(name: &str, usage: impl Into<String>) -> Result<(), SchemaBuildError> {
    if GRAPHQL_NAME.is_match(name) && !name.starts_with("__") {
        Ok(())
    } else {
        Err(SchemaBuildError::InvalidName {
            name: name.to_string(),
            usage: usage.into(),
        })
    }
}

/// Type names claimed so far and what claimed them.
#[derive(Debug, Default)]
struct TypeRegistry {
    owners: HashMap<String, String>,
    types: Vec<Type>,
}

impl TypeRegistry {
    fn with_builtins() -> Self {
        let mut registry = TypeRegistry::default();
        for builtin in [
            TypeRef::INT,
            TypeRef::FLOAT,
            TypeRef::STRING,
            TypeRef::BOOLEAN,
            TypeRef::ID,
        ] {
            registry
                .owners
                .insert(builtin.to_string(), "a built-in scalar".to_string());
        }
        registry
    }

    fn claim(&mut self, name: &str, owner: impl Into<String>) -> Result<(), SchemaBuildError> {
        let owner = owner.into();
        if let Some(first) = self.owners.get(name) {
            return Err(SchemaBuildError::DuplicateTypeName {
                name: name.to_string(),
                first: first.clone(),
                second: owner,
            });
        }
        self.owners.insert(name.to_string(), owner);
        Ok(())
    }

    fn register(
        &mut self,
        name: &str,
        owner: impl Into<String>,
        ty: impl Into<Type>,
    ) -> Result<(), SchemaBuildError> {
        self.claim(name, owner)?;
        self.types.push(ty.into());
        Ok(())
    }
}

/// Object type under construction plus the field names it already has.
struct ObjectDraft {
    object: Object,
    fields: HashSet<String>,
}

impl ObjectDraft {
    fn add_field(&mut self, name: &str, field: Field, reason: &str) -> Result<(), SchemaBuildError> {
        if !self.fields.insert(name.to_string()) {
            return Err(SchemaBuildError::DuplicateField {
                type_name: self.object.type_name().to_string(),
                field: name.to_string(),
                reason: reason.to_string(),
            });
        }
        let object = std::mem::replace(&mut self.object, Object::new(""));
        self.object = object.field(field);
        Ok(())
    }
}

pub struct SchemaBuilder {
    model: Arc<Schema>,
    registry: TypeRegistry,
    drafts: Vec<(String, ObjectDraft)>,
    query: Object,
}

impl SchemaBuilder {
    pub fn new(model: Arc<Schema>) -> Self {
        SchemaBuilder {
            model,
            registry: TypeRegistry::with_builtins(),
            drafts: Vec::new(),
            query: Object::new(QUERY_TYPE),
        }
    }

    pub fn build(mut self) -> Result<DynamicSchema, SchemaBuildError> {
        if self.model.is_empty() {
            return Err(SchemaBuildError::Empty);
        }
        self.registry.claim(QUERY_TYPE, "the query root")?;
        self.registry.register(
            DIRECTION_ENUM,
            "the sort direction enum",
            Enum::new(DIRECTION_ENUM).item("asc").item("desc"),
        )?;
        self.registry
            .register(DATETIME_SCALAR, "the DateTime scalar", datetime_scalar())?;

        let model = self.model.clone();
        for entity in model.entities() {
            self.add_entity(entity)?;
        }
        for entity in model.entities() {
            self.add_relations(entity)?;
        }

        let mut builder = DynamicSchema::build(QUERY_TYPE, None, None);
        for (_, draft) in self.drafts {
            builder = builder.register(draft.object);
        }
        for ty in self.registry.types {
            builder = builder.register(ty);
        }
        builder = builder.register(self.query);

        builder
            .finish()
            .map_err(|e| SchemaBuildError::Finish(e.to_string()))
    }

    /// Pass one: object type, root field and its input types.
    fn add_entity(&mut self, entity: &Entity) -> Result<(), SchemaBuildError> {
        check_name(&entity.name, "entity name")?;
        let owner = format!("entity `{}`", entity.name);
        self.registry.claim(&entity.name, &owner)?;

        let mut object = Object::new(&entity.name);
        if !entity.description.is_empty() {
            object = object.description(&entity.description);
        }
        let mut draft = ObjectDraft {
            object,
            fields: HashSet::new(),
        };

        let filter_name = filter_type_name(&entity.name);
        let sort_name = sort_type_name(&entity.name);
        let mut filter = InputObject::new(&filter_name)
            .description(format!("Filters on the columns of `{}`", entity.name));
        let mut sort = InputObject::new(&sort_name)
            .description(format!("Sort order for `{}`", entity.name));

        for column in entity.columns() {
            check_name(&column.name, format!("column of `{}`", entity.name))?;
            let scalar_type = type_name(column.scalar);

            let mut field = Field::new(
                &column.name,
                TypeRef::named(scalar_type),
                column_resolver(column.name.clone(), column.scalar),
            );
            if !column.description.is_empty() {
                field = field.description(&column.description);
            }
            draft.add_field(&column.name, field, "column")?;

            let column_filter_name = column_filter_type_name(&entity.name, &column.name);
            let mut column_filter = InputObject::new(&column_filter_name);
            for op in FilterOp::ALL {
                column_filter = column_filter.field(InputValue::new(op.name(), TypeRef::named(scalar_type)));
            }
            self.registry.register(
                &column_filter_name,
                format!("the filter of `{}.{}`", entity.name, column.name),
                column_filter,
            )?;

            filter = filter.field(InputValue::new(
                &column.name,
                TypeRef::named(&column_filter_name),
            ));
            sort = sort.field(InputValue::new(&column.name, TypeRef::named(DIRECTION_ENUM)));
        }

        self.registry
            .register(&filter_name, format!("the filter of `{}`", entity.name), filter)?;
        self.registry
            .register(&sort_name, format!("the sort of `{}`", entity.name), sort)?;

        let mut root_field = Field::new(
            &entity.name,
            TypeRef::named_list(&entity.name),
            root_resolver(Arc::new(entity.clone())),
        );
        if !entity.description.is_empty() {
            root_field = root_field.description(&entity.description);
        }
        let root_field = root_field
        .argument(InputValue::new("limit", TypeRef::named(TypeRef::INT)).default_value(DEFAULT_LIMIT))
        .argument(InputValue::new("offset", TypeRef::named(TypeRef::INT)).default_value(0))
        .argument(InputValue::new("filter", TypeRef::named(&filter_name)))
        .argument(InputValue::new("sort", TypeRef::named(&sort_name)));
        self.query = std::mem::replace(&mut self.query, Object::new("")).field(root_field);

        self.drafts.push((entity.name.clone(), draft));
        Ok(())
    }

    /// Pass two: one list field per foreign key.
    fn add_relations(&mut self, entity: &Entity) -> Result<(), SchemaBuildError> {
        let model = self.model.clone();
        let Some((_, draft)) = self.drafts.iter_mut().find(|(name, _)| name == &entity.name)
        else {
            return Ok(());
        };
        for fk in entity.foreign_keys() {
            // the model only accepts foreign keys to existing entities
            let Some(target) = model.entity(&fk.target) else {
                continue;
            };
            let relation = Arc::new(RelationLoader::new(
                &entity.name,
                target.clone(),
                &fk.join_column,
            ));
            let field = Field::new(
                &target.name,
                TypeRef::named_list(&target.name),
                relation_resolver(relation, entity.primary_key.clone()),
            )
            .description(format!("Associated {}", target.name));
            draft.add_field(&target.name, field, "relation")?;
        }
        Ok(())
    }
}
