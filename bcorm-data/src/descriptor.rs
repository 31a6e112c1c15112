//! Static entity descriptions emitted by `#[derive(Entity)]`.
//!
//! Every entity type owns one `&'static EntityDescriptor`. The descriptor is
//! plain data: resource path, field roles and relation declarations. All
//! per-type [`Metadata`](crate::metadata::Metadata) is computed from it.

use crate::entity::Entity;
use crate::relation::{HasManyHandler, HasOneHandler, RelationHandler};
use crate::validation::ValidationRule;

/// Which API root serves a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceKind {
    /// The store's REST API (`/stores/{hash}/v3`).
    #[default]
    Api,
    /// The payment processing API (`https://payments.bigcommerce.com/stores/{hash}`).
    Payment,
}

impl ResourceKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "api" => Some(ResourceKind::Api),
            "payment" => Some(ResourceKind::Payment),
            _ => None,
        }
    }
}

/// Resource name and URL path template of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub name: &'static str,
    /// Path template, e.g. `/catalog/products/{product_id}/reviews`.
    pub path: &'static str,
    /// Single-entity lookups use `{path}/{id}` instead of an `id:in` filter.
    pub id_in_path: bool,
    pub kind: ResourceKind,
}

impl ResourceDescriptor {
    /// Names of the `{placeholder}` segments in the path template.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let Some(end) = rest[start..].find('}') else {
                break;
            };
            out.push(&rest[start + 1..start + end]);
            rest = &rest[start + end + 1..];
        }
        out
    }

    /// Whether the path needs parent ids to be resolved.
    pub fn is_nested(&self) -> bool {
        self.path.contains('{')
    }
}

/// One declared plain field and its roles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub property: &'static str,
    /// Wire (JSON) field name.
    pub field: &'static str,
    pub required: bool,
    /// Only ever set from server responses.
    pub readonly: bool,
    /// Fills a `{placeholder}` of the resource path; never sent in payloads.
    pub param: bool,
    /// Holds a filesystem path sent as a multipart file on create.
    pub upload: bool,
    /// Payment access token, sent as `Authorization: PAT <token>`; never in payloads.
    pub access_token: bool,
    pub validation: Option<ValidationRule>,
    /// `validation` is checked on save. Date and file rules are opt-in.
    pub validate: bool,
}

impl FieldDescriptor {
    /// Whether the wire name differs from the property name.
    pub fn is_customised(&self) -> bool {
        self.property != self.field
    }

    pub fn is_writable(&self) -> bool {
        !self.readonly && !self.param && !self.access_token
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasOne,
    HasMany,
}

impl RelationKind {
    pub fn handler(&self) -> &'static dyn RelationHandler {
        match self {
            RelationKind::HasOne => &HasOneHandler,
            RelationKind::HasMany => &HasManyHandler,
        }
    }
}

/// Where the related data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationSource {
    /// Ids in the parent response; loaded with a follow-up request.
    Api,
    /// Embedded in the parent response through `include=`.
    Include,
    /// Already part of the parent's own result.
    Result,
}

impl RelationSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "api" => Some(RelationSource::Api),
            "include" => Some(RelationSource::Include),
            "result" => Some(RelationSource::Result),
            _ => None,
        }
    }
}

/// One declared relation.
#[derive(Debug, Clone, Copy)]
pub struct RelationDescriptor {
    /// Rust field name.
    pub property: &'static str,
    /// Wire key holding embedded data (dotted for nested keys) and include name.
    pub name: &'static str,
    pub kind: RelationKind,
    pub target: fn() -> &'static EntityDescriptor,
    /// Linking field on the parent.
    pub field: &'static str,
    /// Matching field on the target.
    pub target_field: &'static str,
    pub from: RelationSource,
    pub auto: bool,
    /// Never sent in payloads.
    pub readonly: bool,
}

impl RelationDescriptor {
    pub fn target(&self) -> &'static EntityDescriptor {
        (self.target)()
    }
}

impl PartialEq for RelationDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.property == other.property
            && self.name == other.name
            && self.kind == other.kind
            && self.target().name == other.target().name
    }
}

/// Full static description of an entity type.
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Type name used for registration and messages.
    pub name: &'static str,
    pub resource: Option<ResourceDescriptor>,
    pub fields: &'static [FieldDescriptor],
    pub relations: &'static [RelationDescriptor],
    pub factory: fn() -> Box<dyn Entity>,
}

impl EntityDescriptor {
    pub fn field_by_property(&self, property: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.property == property)
    }

    pub fn field_by_name(&self, field: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.field == field)
    }

    pub fn relation_by_property(&self, property: &str) -> Option<&'static RelationDescriptor> {
        self.relations.iter().find(|r| r.property == property)
    }

    pub fn relation_by_name(&self, name: &str) -> Option<&'static RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn create(&self) -> Box<dyn Entity> {
        (self.factory)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_in_order() {
        let resource = ResourceDescriptor {
            name: "ProductModifierValue",
            path: "/catalog/products/{product_id}/modifiers/{modifier_id}/values",
            id_in_path: false,
            kind: ResourceKind::Api,
        };
        assert_eq!(resource.placeholders(), vec!["product_id", "modifier_id"]);
        assert!(resource.is_nested());
    }

    #[test]
    fn test_flat_resource_has_no_placeholders() {
        let resource = ResourceDescriptor {
            name: "Customer",
            path: "/customers",
            id_in_path: false,
            kind: ResourceKind::default(),
        };
        assert!(resource.placeholders().is_empty());
        assert!(!resource.is_nested());
    }

    #[test]
    fn test_relation_source_parse() {
        assert_eq!(RelationSource::parse("include"), Some(RelationSource::Include));
        assert_eq!(RelationSource::parse("api"), Some(RelationSource::Api));
        assert_eq!(RelationSource::parse("result"), Some(RelationSource::Result));
        assert_eq!(RelationSource::parse("lazy"), None);
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!(ResourceKind::parse("payment"), Some(ResourceKind::Payment));
        assert_eq!(ResourceKind::parse("api"), Some(ResourceKind::Api));
        assert_eq!(ResourceKind::parse("storefront"), None);
        assert_eq!(ResourceKind::default(), ResourceKind::Api);
    }
}
