use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::EntityDescriptor;
use crate::error::MapperError;
use crate::metadata::Metadata;

/// Identity of a remote resource: numeric for most resources, a string
/// (UUID) for carts and checkouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Str(String),
}

impl Id {
    /// Read an id from a wire value. Only integers and strings qualify.
    pub fn from_value(value: &Value) -> Option<Id> {
        match value {
            Value::Number(n) => n.as_i64().map(Id::Int),
            Value::String(s) => Some(Id::Str(s.clone())),
            _ => None,
        }
    }

    /// Zero and the empty string do not identify anything.
    pub fn is_empty(&self) -> bool {
        match self {
            Id::Int(i) => *i == 0,
            Id::Str(s) => s.is_empty(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Id::Int(i) => Value::from(*i),
            Id::Str(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(i) => write!(f, "{i}"),
            Id::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Int(value)
    }
}

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Id::Int(value.into())
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Str(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::Str(value)
    }
}

/// Parent ids of a nested collection, used by reads where no entity
/// instance carries them.
///
/// ```
/// use bcorm_data::Parent;
///
/// // `/catalog/products/{product_id}/reviews`
/// let review = Parent::id(111);
/// // `/catalog/products/{product_id}/modifiers/{modifier_id}/values`
/// let value = Parent::params([("product_id", 111), ("modifier_id", 7)]);
/// assert_eq!(value.get("modifier_id"), Some(&7.into()));
/// assert_eq!(review.get("product_id"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Parent {
    #[default]
    None,
    /// Fills the one placeholder left once named params are applied.
    Id(Id),
    /// Placeholder values by name.
    Params(BTreeMap<String, Id>),
}

impl Parent {
    pub fn id(id: impl Into<Id>) -> Self {
        Parent::Id(id.into())
    }

    pub fn params<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Id>,
    {
        Parent::Params(
            params
                .into_iter()
                .map(|(name, id)| (name.into(), id.into()))
                .collect(),
        )
    }

    /// Named value of a placeholder.
    pub fn get(&self, param: &str) -> Option<&Id> {
        match self {
            Parent::Params(params) => params.get(param),
            _ => None,
        }
    }

    /// The single id, when given as one.
    pub fn single(&self) -> Option<&Id> {
        match self {
            Parent::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Parent::None)
    }
}

impl From<Id> for Parent {
    fn from(id: Id) -> Self {
        Parent::Id(id)
    }
}

impl From<Option<Id>> for Parent {
    fn from(id: Option<Id>) -> Self {
        id.map_or(Parent::None, Parent::Id)
    }
}

impl From<BTreeMap<String, Id>> for Parent {
    fn from(params: BTreeMap<String, Id>) -> Self {
        Parent::Params(params)
    }
}

/// Bookkeeping carried by every entity instance.
#[derive(Debug, Clone, Default)]
pub struct EntityState {
    pub patched: bool,
    pub is_new: bool,
    pub metadata: Option<Arc<Metadata>>,
}

/// Borrowed view of a relation property.
pub enum Related<'a> {
    One(Option<&'a dyn Entity>),
    Many(Vec<&'a dyn Entity>),
}

/// Owned relation value handed to [`Entity::set_related`].
pub enum RelatedOwned {
    One(Option<Box<dyn Entity>>),
    Many(Vec<Box<dyn Entity>>),
}

/// Object-safe access to an entity instance.
///
/// Implemented by `#[derive(Entity)]`; manual implementations must keep
/// `property`/`set_property` consistent with the descriptor's field list.
pub trait Entity: Any + Send + Sync + fmt::Debug {
    fn descriptor(&self) -> &'static EntityDescriptor;

    fn state(&self) -> &EntityState;

    fn state_mut(&mut self) -> &mut EntityState;

    /// Value of a plain field by property name, `None` if there is no such field.
    fn property(&self, property: &str) -> Option<Value>;

    /// Assign a plain field by property name. `Null` resets it to its default.
    fn set_property(&mut self, property: &str, value: Value) -> Result<(), MapperError>;

    fn related(&self, property: &str) -> Option<Related<'_>>;

    fn set_related(&mut self, property: &str, value: RelatedOwned) -> Result<(), MapperError>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    fn clone_entity(&self) -> Box<dyn Entity>;

    fn id(&self) -> Option<Id> {
        self.property("id").and_then(|v| Id::from_value(&v))
    }

    fn is_patched(&self) -> bool {
        self.state().patched
    }

    fn is_new(&self) -> bool {
        self.state().is_new
    }

    fn metadata(&self) -> Option<&Arc<Metadata>> {
        self.state().metadata.as_ref()
    }
}

impl Clone for Box<dyn Entity> {
    fn clone(&self) -> Self {
        self.clone_entity()
    }
}

/// Statically known entity types.
pub trait EntityType: Entity + Default + Clone {
    fn entity_descriptor() -> &'static EntityDescriptor;
}

/// Downcast a boxed entity into its concrete type.
pub fn downcast<T: EntityType>(entity: Box<dyn Entity>) -> Result<T, MapperError> {
    let found = entity.descriptor().name;
    entity
        .into_any()
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| MapperError::TypeMismatch {
            expected: T::entity_descriptor().name,
            found,
        })
}

/// Serialize a property for [`Entity::property`].
#[doc(hidden)]
pub fn property_to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Coerce a wire value into a property type.
///
/// Strict deserialization first; on failure numbers, booleans and strings
/// are converted into each other the way the API tends to mix them.
#[doc(hidden)]
pub fn property_from_value<T: DeserializeOwned + Default>(
    property: &str,
    value: Value,
) -> Result<T, MapperError> {
    if value.is_null() {
        return Ok(T::default());
    }
    match serde_json::from_value::<T>(value.clone()) {
        Ok(v) => Ok(v),
        Err(first) => {
            let lenient = match &value {
                Value::String(s) => lenient_from_str(s),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::from(u8::from(*b))),
                _ => None,
            };
            lenient
                .and_then(|v| serde_json::from_value::<T>(v).ok())
                .ok_or_else(|| MapperError::Coercion {
                    property: property.to_string(),
                    message: first.to_string(),
                })
        }
    }
}

fn lenient_from_str(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return serde_json::Number::from_f64(f).map(Value::Number);
    }
    match trimmed {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Downcast a boxed relation target for generated `set_related` code.
#[doc(hidden)]
pub fn relation_from_box<T: EntityType>(entity: Box<dyn Entity>) -> Result<T, MapperError> {
    downcast::<T>(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_from_value() {
        assert_eq!(Id::from_value(&json!(12)), Some(Id::Int(12)));
        assert_eq!(Id::from_value(&json!("abc")), Some(Id::Str("abc".into())));
        assert_eq!(Id::from_value(&json!([1])), None);
        assert_eq!(Id::from_value(&json!(1.5)), None);
    }

    #[test]
    fn test_id_is_empty() {
        assert!(Id::Int(0).is_empty());
        assert!(Id::Str(String::new()).is_empty());
        assert!(!Id::from("c4d2").is_empty());
        assert_eq!(Id::from(7).to_string(), "7");
    }

    #[test]
    fn test_parent_lookup() {
        let parent = Parent::params([("product_id", 111), ("modifier_id", 7)]);
        assert_eq!(parent.get("product_id"), Some(&Id::Int(111)));
        assert_eq!(parent.get("checkout_id"), None);
        assert!(parent.single().is_none());

        let parent = Parent::from(Some(Id::from("c4d2")));
        assert_eq!(parent.single(), Some(&Id::Str("c4d2".into())));
        assert!(Parent::from(None::<Id>).is_none());
    }

    #[test]
    fn test_property_from_value_lenient() {
        let n: Option<i64> = property_from_value("product_id", json!("111")).unwrap();
        assert_eq!(n, Some(111));
        let s: Option<String> = property_from_value("sku", json!(42)).unwrap();
        assert_eq!(s.as_deref(), Some("42"));
        let b: bool = property_from_value("required", json!(null)).unwrap();
        assert!(!b);
    }

    #[test]
    fn test_property_from_value_rejects_garbage() {
        let err = property_from_value::<Option<i64>>("rating", json!({"a": 1})).unwrap_err();
        assert!(matches!(err, MapperError::Coercion { ref property, .. } if property == "rating"));
    }
}
