//! Relation handlers populate relation properties during auto-loading.

use serde_json::Value;

use crate::client::BoxFuture;
use crate::descriptor::{RelationDescriptor, RelationSource};
use crate::entity::{Entity, Id, Parent, RelatedOwned};
use crate::error::{HandlerError, MapperError, OrmError};
use crate::manager::EntityManager;
use crate::mapper::lookup;
use crate::query::QueryBuilder;

/// Loads one relation of an entity from its raw result map.
pub trait RelationHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        em: &'a EntityManager,
        entity: &'a mut dyn Entity,
        relation: &'static RelationDescriptor,
        data: &'a Value,
        parent: &'a Parent,
    ) -> BoxFuture<'a, Result<(), OrmError>>;
}

pub struct HasOneHandler;

impl RelationHandler for HasOneHandler {
    fn handle<'a>(
        &'a self,
        em: &'a EntityManager,
        entity: &'a mut dyn Entity,
        relation: &'static RelationDescriptor,
        data: &'a Value,
        parent: &'a Parent,
    ) -> BoxFuture<'a, Result<(), OrmError>> {
        Box::pin(async move {
            match relation.from {
                RelationSource::Api => {
                    let value = match data.get(relation.field) {
                        None | Some(Value::Null) => return Ok(()),
                        Some(value) => value,
                    };
                    let id = Id::from_value(value)
                        .ok_or_else(|| HandlerError::InvalidOneRelationValue(value.to_string()))?;
                    if id.is_empty() {
                        return Ok(());
                    }
                    let related = em
                        .find_dyn(relation.target(), id, parent.clone(), relation.auto)
                        .await?;
                    entity.set_related(relation.property, RelatedOwned::One(related))?;
                }
                RelationSource::Include | RelationSource::Result => {
                    if let Some(value @ Value::Object(_)) = lookup(data, relation.name) {
                        let mut related = relation.target().create();
                        em.mapper().patch(related.as_mut(), value, true)?;
                        entity.set_related(relation.property, RelatedOwned::One(Some(related)))?;
                    }
                }
            }
            Ok(())
        })
    }
}

pub struct HasManyHandler;

impl HasManyHandler {
    fn ids(value: &Value) -> Result<Vec<Id>, HandlerError> {
        let invalid = || HandlerError::InvalidManyRelationValue(value.to_string());
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| Id::from_value(item).ok_or_else(invalid))
                .collect(),
            Value::Number(_) | Value::String(_) => {
                Id::from_value(value).map(|id| vec![id]).ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }
}

impl RelationHandler for HasManyHandler {
    fn handle<'a>(
        &'a self,
        em: &'a EntityManager,
        entity: &'a mut dyn Entity,
        relation: &'static RelationDescriptor,
        data: &'a Value,
        parent: &'a Parent,
    ) -> BoxFuture<'a, Result<(), OrmError>> {
        Box::pin(async move {
            match relation.from {
                RelationSource::Api => {
                    let value = match data.get(relation.field) {
                        None | Some(Value::Null) => return Ok(()),
                        Some(value) => value,
                    };
                    let ids: Vec<Id> = Self::ids(value)?
                        .into_iter()
                        .filter(|id| !id.is_empty())
                        .collect();
                    if ids.is_empty() {
                        entity.set_related(relation.property, RelatedOwned::Many(Vec::new()))?;
                        return Ok(());
                    }

                    let target = relation.target();
                    let resource = target
                        .resource
                        .ok_or(MapperError::MissingResource(target.name))?;
                    let related = if !value.is_array() && resource.is_nested() {
                        // A scalar link on a nested target is the parent of the collection.
                        let link = Parent::from(ids.into_iter().next());
                        em.find_all_dyn(target, link, QueryBuilder::new(), relation.auto)
                            .await?
                    } else {
                        let keys: Vec<String> = ids.iter().map(Id::to_string).collect();
                        let query = QueryBuilder::new().where_in(relation.target_field, keys.as_slice());
                        em.find_by_dyn(target, parent.clone(), query, relation.auto)
                            .await?
                    };
                    entity.set_related(relation.property, RelatedOwned::Many(related))?;
                }
                RelationSource::Include | RelationSource::Result => {
                    if let Some(Value::Array(items)) = lookup(data, relation.name) {
                        let mut list = Vec::with_capacity(items.len());
                        for item in items.iter().filter(|item| item.is_object()) {
                            let mut related = relation.target().create();
                            em.mapper().patch(related.as_mut(), item, true)?;
                            list.push(related);
                        }
                        entity.set_related(relation.property, RelatedOwned::Many(list))?;
                    }
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_many_ids_from_scalar_and_array() {
        assert_eq!(HasManyHandler::ids(&json!(5)).unwrap(), vec![Id::Int(5)]);
        assert_eq!(
            HasManyHandler::ids(&json!([1, "a"])).unwrap(),
            vec![Id::Int(1), Id::Str("a".into())]
        );
    }

    #[test]
    fn test_many_ids_rejects_nested_map() {
        let err = HasManyHandler::ids(&json!({"id": 1})).unwrap_err();
        assert_eq!(err, HandlerError::InvalidManyRelationValue("{\"id\":1}".into()));
        let err = HasManyHandler::ids(&json!([1, {"id": 2}])).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidManyRelationValue(_)));
    }
}
