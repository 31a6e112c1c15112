use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;

use crate::descriptor::{
    EntityDescriptor, FieldDescriptor, RelationDescriptor, RelationSource, ResourceDescriptor,
};
use crate::error::MapperError;
use crate::validation::ValidationRule;

/// Per-type field classification, computed once from an [`EntityDescriptor`].
#[derive(Debug)]
pub struct Metadata {
    descriptor: &'static EntityDescriptor,
    resource: Option<ResourceDescriptor>,
    required_fields: Vec<&'static FieldDescriptor>,
    readonly_fields: Vec<&'static FieldDescriptor>,
    param_fields: Vec<&'static FieldDescriptor>,
    upload_fields: Vec<&'static FieldDescriptor>,
    customised_fields: Vec<&'static FieldDescriptor>,
    validation_fields: Vec<(&'static FieldDescriptor, ValidationRule)>,
    relation_fields: Vec<&'static RelationDescriptor>,
    include_fields: Vec<&'static RelationDescriptor>,
    in_result_fields: Vec<&'static RelationDescriptor>,
    auto_load_fields: Vec<&'static RelationDescriptor>,
}

impl Metadata {
    pub fn from_descriptor(descriptor: &'static EntityDescriptor) -> Self {
        let fields = descriptor.fields;
        let relations = descriptor.relations;
        let pick = |pred: fn(&FieldDescriptor) -> bool| -> Vec<&'static FieldDescriptor> {
            fields.iter().filter(|f| pred(f)).collect()
        };
        let pick_rel = |pred: fn(&RelationDescriptor) -> bool| -> Vec<&'static RelationDescriptor> {
            relations.iter().filter(|r| pred(r)).collect()
        };

        Metadata {
            descriptor,
            resource: descriptor.resource,
            required_fields: pick(|f| f.required),
            readonly_fields: pick(|f| f.readonly),
            param_fields: pick(|f| f.param),
            upload_fields: pick(|f| f.upload),
            customised_fields: pick(|f| f.is_customised()),
            validation_fields: fields
                .iter()
                .filter(|f| f.validate)
                .filter_map(|f| f.validation.map(|rule| (f, rule)))
                .collect(),
            relation_fields: pick_rel(|_| true),
            include_fields: pick_rel(|r| r.from == RelationSource::Include),
            in_result_fields: pick_rel(|r| r.from == RelationSource::Result),
            auto_load_fields: pick_rel(|r| r.auto),
        }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn resource(&self) -> Option<&ResourceDescriptor> {
        self.resource.as_ref()
    }

    pub fn required_fields(&self) -> &[&'static FieldDescriptor] {
        &self.required_fields
    }

    pub fn readonly_fields(&self) -> &[&'static FieldDescriptor] {
        &self.readonly_fields
    }

    pub fn param_fields(&self) -> &[&'static FieldDescriptor] {
        &self.param_fields
    }

    pub fn upload_fields(&self) -> &[&'static FieldDescriptor] {
        &self.upload_fields
    }

    pub fn customised_fields(&self) -> &[&'static FieldDescriptor] {
        &self.customised_fields
    }

    pub fn validation_fields(&self) -> &[(&'static FieldDescriptor, ValidationRule)] {
        &self.validation_fields
    }

    pub fn relation_fields(&self) -> &[&'static RelationDescriptor] {
        &self.relation_fields
    }

    pub fn include_fields(&self) -> &[&'static RelationDescriptor] {
        &self.include_fields
    }

    pub fn in_result_fields(&self) -> &[&'static RelationDescriptor] {
        &self.in_result_fields
    }

    pub fn auto_load_fields(&self) -> &[&'static RelationDescriptor] {
        &self.auto_load_fields
    }
}

/// Write-once cache of [`Metadata`], one entry per entity type.
///
/// Also maps type names to descriptors so entities can be created by name.
/// Cloning shares the same underlying maps.
#[derive(Clone, Default)]
pub struct MetadataRegistry {
    by_type: Arc<DashMap<TypeId, Arc<Metadata>>>,
    by_name: Arc<DashMap<&'static str, &'static EntityDescriptor>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for a type, built on first use.
    pub fn get_or_build(&self, type_id: TypeId, descriptor: &'static EntityDescriptor) -> Arc<Metadata> {
        if let Some(existing) = self.by_type.get(&type_id) {
            return existing.clone();
        }
        self.by_name.entry(descriptor.name).or_insert(descriptor);
        self.by_type
            .entry(type_id)
            .or_insert_with(|| {
                tracing::trace!(entity = descriptor.name, "Building entity metadata");
                Arc::new(Metadata::from_descriptor(descriptor))
            })
            .clone()
    }

    pub fn register(&self, descriptor: &'static EntityDescriptor) {
        self.by_name.insert(descriptor.name, descriptor);
    }

    pub fn descriptor(&self, name: &str) -> Result<&'static EntityDescriptor, MapperError> {
        self.by_name
            .get(name)
            .map(|entry| *entry.value())
            .ok_or_else(|| MapperError::UnknownEntity(name.to_string()))
    }

    /// Number of entity types known by name.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl std::fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataRegistry")
            .field("types", &self.by_type.len())
            .field("names", &self.by_name.len())
            .finish()
    }
}
