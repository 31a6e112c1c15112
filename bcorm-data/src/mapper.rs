use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::descriptor::{EntityDescriptor, RelationKind, ResourceDescriptor};
use crate::entity::{Entity, EntityType, Id, Parent, Related, RelatedOwned};
use crate::error::{EntityError, MapperError, OrmError};
use crate::metadata::{Metadata, MetadataRegistry};

/// How [`Mapper::to_array`] keys its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// Wire names (`display_name`, `type`).
    #[default]
    FieldName,
    /// Rust property names (`display_name`, `kind`).
    PropertyName,
}

/// Translates between entity instances and wire-format maps.
///
/// Owns the [`MetadataRegistry`]; cloning a `Mapper` shares the registry.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    registry: MetadataRegistry,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: MetadataRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    /// Make `T` constructible by name through [`Mapper::object`].
    pub fn register<T: EntityType>(&self) {
        self.registry.register(T::entity_descriptor());
    }

    /// Zero-value entity of a registered type.
    pub fn object(&self, name: &str) -> Result<Box<dyn Entity>, OrmError> {
        self.check_class(name)?;
        let descriptor = self.registry.descriptor(name)?;
        Ok(descriptor.create())
    }

    /// Cached metadata of the entity's type.
    pub fn metadata(&self, entity: &dyn Entity) -> Arc<Metadata> {
        self.registry
            .get_or_build(entity.as_any().type_id(), entity.descriptor())
    }

    pub fn metadata_of<T: EntityType>(&self) -> Arc<Metadata> {
        self.registry
            .get_or_build(std::any::TypeId::of::<T>(), T::entity_descriptor())
    }

    pub fn class_annotation(&self, entity: &dyn Entity) -> Result<ResourceDescriptor, MapperError> {
        let descriptor = entity.descriptor();
        descriptor
            .resource
            .ok_or(MapperError::MissingResource(descriptor.name))
    }

    /// Resolve the resource path template of an entity.
    ///
    /// Placeholders are filled from the entity's fields first, then from the
    /// named params of `parent`. A single parent id fills the one placeholder
    /// left, if exactly one is left.
    pub fn resource_path(&self, entity: &dyn Entity, parent: &Parent) -> Result<String, MapperError> {
        let resource = self.class_annotation(entity)?;
        let descriptor = entity.descriptor();
        let mut path = resource.path.to_string();
        let mut unresolved = Vec::new();

        for param in resource.placeholders() {
            let value = descriptor
                .field_by_name(param)
                .and_then(|f| entity.property(f.property))
                .and_then(|v| Id::from_value(&v))
                .or_else(|| parent.get(param).cloned())
                .filter(|id| !id.is_empty());
            match value {
                Some(id) => path = path.replace(&format!("{{{param}}}"), &id.to_string()),
                None => unresolved.push(param),
            }
        }

        match (unresolved.as_slice(), parent.single()) {
            ([], _) => Ok(path),
            ([param], Some(parent)) if !parent.is_empty() => {
                Ok(path.replace(&format!("{{{param}}}"), &parent.to_string()))
            }
            ([param, ..], _) => Err(MapperError::UnresolvedPath {
                path: resource.path.to_string(),
                param: param.to_string(),
            }),
        }
    }

    /// Assign values from a wire map onto an entity.
    ///
    /// Readonly fields are only written when `from_wire` is set. Embedded
    /// objects of include/result relations become patched target entities.
    pub fn patch(&self, entity: &mut dyn Entity, data: &Value, from_wire: bool) -> Result<(), MapperError> {
        if entity.state().metadata.is_none() {
            let metadata = self.metadata(entity);
            entity.state_mut().metadata = Some(metadata);
        }

        if let Value::Object(map) = data {
            let descriptor = entity.descriptor();
            for field in descriptor.fields {
                if field.readonly && !from_wire {
                    continue;
                }
                if let Some(value) = map.get(field.field) {
                    entity.set_property(field.property, value.clone())?;
                }
            }

            for relation in descriptor.relations {
                if relation.readonly && !from_wire {
                    continue;
                }
                let Some(value) = lookup(data, relation.name) else {
                    continue;
                };
                let target = relation.target();
                match (relation.kind, value) {
                    (RelationKind::HasOne, Value::Object(_)) => {
                        let mut related = target.create();
                        self.patch(related.as_mut(), value, from_wire)?;
                        entity.set_related(relation.property, RelatedOwned::One(Some(related)))?;
                    }
                    (RelationKind::HasMany, Value::Array(items))
                        if items.iter().all(Value::is_object) =>
                    {
                        let mut list = Vec::with_capacity(items.len());
                        for item in items {
                            let mut related = target.create();
                            self.patch(related.as_mut(), item, from_wire)?;
                            list.push(related);
                        }
                        entity.set_related(relation.property, RelatedOwned::Many(list))?;
                    }
                    // Scalar ids are resolved by the relation handlers.
                    _ => {}
                }
            }
        }

        entity.state_mut().patched = true;
        Ok(())
    }

    /// Build a typed entity from a wire map.
    pub fn patch_new<T: EntityType>(&self, data: &Value, from_wire: bool) -> Result<T, MapperError> {
        let mut entity = T::default();
        self.patch(&mut entity, data, from_wire)?;
        Ok(entity)
    }

    /// Required fields that are unset, as `wire field -> property`.
    pub fn check_required_fields(&self, entity: &dyn Entity) -> BTreeMap<String, String> {
        let metadata = self.metadata(entity);
        metadata
            .required_fields()
            .iter()
            .filter(|f| entity.property(f.property).map_or(true, |v| is_blank(&v)))
            .map(|f| (f.field.to_string(), f.property.to_string()))
            .collect()
    }

    /// Failed validation rules, as `wire field -> "property: Rule"`.
    pub fn check_required_validations(&self, entity: &dyn Entity) -> BTreeMap<String, String> {
        let metadata = self.metadata(entity);
        metadata
            .validation_fields()
            .iter()
            .filter(|(field, rule)| !rule.validator().validate(entity, field, rule))
            .map(|(field, rule)| (field.field.to_string(), format!("{}: {}", field.property, rule)))
            .collect()
    }

    /// Non-null values of every writable field, overlaid with `overrides`.
    pub fn writable_field_values(&self, entity: &dyn Entity, overrides: &Map<String, Value>) -> Map<String, Value> {
        let descriptor = entity.descriptor();
        let mut out = Map::new();

        for field in descriptor.fields.iter().filter(|f| f.is_writable()) {
            match entity.property(field.property) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    out.insert(field.field.to_string(), value);
                }
            }
        }

        let empty = Map::new();
        for relation in descriptor.relations.iter().filter(|r| !r.readonly) {
            match entity.related(relation.property) {
                Some(Related::One(Some(related))) => {
                    let values = self.writable_field_values(related, &empty);
                    out.insert(relation.name.to_string(), Value::Object(values));
                }
                Some(Related::Many(list)) if !list.is_empty() => {
                    let values = list
                        .into_iter()
                        .map(|related| Value::Object(self.writable_field_values(related, &empty)))
                        .collect();
                    out.insert(relation.name.to_string(), Value::Array(values));
                }
                _ => {}
            }
        }

        for (key, value) in overrides {
            out.insert(key.clone(), value.clone());
        }
        out
    }

    /// Whether every key names a known, writable field of the entity's type.
    pub fn check_property_values(&self, entity: &dyn Entity, data: &Map<String, Value>) -> bool {
        let descriptor = entity.descriptor();
        data.keys().all(|key| is_writable_key(descriptor, key))
    }

    /// Like [`check_property_values`](Self::check_property_values), and the map is not empty.
    pub fn check_none_readonly_data(&self, entity: &dyn Entity, data: &Map<String, Value>) -> bool {
        !data.is_empty() && self.check_property_values(entity, data)
    }

    /// Every field value, nulls included.
    pub fn to_array(&self, entity: &dyn Entity, mode: KeyMode) -> Map<String, Value> {
        let descriptor = entity.descriptor();
        let mut out = Map::new();

        for field in descriptor.fields {
            let key = match mode {
                KeyMode::FieldName => field.field,
                KeyMode::PropertyName => field.property,
            };
            out.insert(key.to_string(), entity.property(field.property).unwrap_or(Value::Null));
        }

        for relation in descriptor.relations {
            let key = match mode {
                KeyMode::FieldName => relation.name,
                KeyMode::PropertyName => relation.property,
            };
            let value = match entity.related(relation.property) {
                Some(Related::One(Some(related))) => Value::Object(self.to_array(related, mode)),
                Some(Related::Many(list)) => Value::Array(
                    list.into_iter()
                        .map(|related| Value::Object(self.to_array(related, mode)))
                        .collect(),
                ),
                _ => Value::Null,
            };
            out.insert(key.to_string(), value);
        }
        out
    }

    pub fn property_value_by_name(&self, entity: &dyn Entity, property: &str) -> Result<Value, MapperError> {
        match property {
            "is_new" => return Ok(Value::Bool(entity.is_new())),
            "patched" => return Ok(Value::Bool(entity.is_patched())),
            _ => {}
        }
        if let Some(value) = entity.property(property) {
            return Ok(value);
        }
        match entity.related(property) {
            Some(Related::One(Some(related))) => Ok(Value::Object(self.to_array(related, KeyMode::FieldName))),
            Some(Related::One(None)) => Ok(Value::Null),
            Some(Related::Many(list)) => Ok(Value::Array(
                list.into_iter()
                    .map(|related| Value::Object(self.to_array(related, KeyMode::FieldName)))
                    .collect(),
            )),
            None => Err(MapperError::UnknownProperty {
                entity: entity.descriptor().name,
                property: property.to_string(),
            }),
        }
    }

    pub fn property_value_by_field_name(&self, entity: &dyn Entity, field: &str) -> Result<Value, MapperError> {
        let descriptor = entity.descriptor();
        if let Some(f) = descriptor.field_by_name(field) {
            return self.property_value_by_name(entity, f.property);
        }
        if let Some(r) = descriptor.relation_by_name(field) {
            return self.property_value_by_name(entity, r.property);
        }
        Err(MapperError::UnknownProperty {
            entity: descriptor.name,
            property: field.to_string(),
        })
    }

    /// Assign a property without validation. `is_new` and `patched` address
    /// the entity's bookkeeping flags.
    pub fn set_property_value_by_name(
        &self,
        entity: &mut dyn Entity,
        property: &str,
        value: Value,
    ) -> Result<(), MapperError> {
        match property {
            "is_new" => entity.state_mut().is_new = value.as_bool().unwrap_or(false),
            "patched" => entity.state_mut().patched = value.as_bool().unwrap_or(false),
            _ => entity.set_property(property, value)?,
        }
        Ok(())
    }

    pub fn check_class(&self, name: &str) -> Result<(), EntityError> {
        if name.trim().is_empty() {
            return Err(EntityError::EmptyClassName);
        }
        Ok(())
    }

    pub fn check_entity<'e>(&self, entity: Option<&'e dyn Entity>) -> Result<&'e dyn Entity, EntityError> {
        entity.ok_or(EntityError::MissingEntity)
    }

    pub fn check_id<'i>(&self, id: Option<&'i Id>) -> Result<&'i Id, EntityError> {
        match id {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(EntityError::InvalidId),
        }
    }

    /// Include names of relations embedded automatically on find.
    pub fn auto_includes(&self, entity: &dyn Entity) -> Vec<&'static str> {
        self.metadata(entity)
            .include_fields()
            .iter()
            .filter(|r| r.auto)
            .map(|r| r.name)
            .collect()
    }

    /// Payment access token carried by the entity, if it has a non-empty one.
    pub fn access_token(&self, entity: &dyn Entity) -> Option<String> {
        let field = entity.descriptor().fields.iter().find(|f| f.access_token)?;
        match entity.property(field.property)? {
            Value::String(token) if !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

fn is_writable_key(descriptor: &EntityDescriptor, key: &str) -> bool {
    if let Some(field) = descriptor.field_by_name(key) {
        return field.is_writable();
    }
    descriptor
        .relation_by_name(key)
        .is_some_and(|relation| !relation.readonly)
}

/// Null, empty string, empty array and empty object count as unset.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Find a value by key, falling back to a dotted path (`line_items.physical_items`).
pub fn lookup<'v>(data: &'v Value, name: &str) -> Option<&'v Value> {
    if let Some(value) = data.get(name) {
        return Some(value);
    }
    if !name.contains('.') {
        return None;
    }
    name.split('.').try_fold(data, |current, segment| current.get(segment))
}
