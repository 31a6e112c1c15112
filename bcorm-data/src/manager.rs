use std::path::Path;
use std::sync::Arc;

use bcorm_events::EventDispatcher;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::client::{ApiClient, BoxFuture, Endpoint, UploadFile};
use crate::descriptor::{EntityDescriptor, ResourceKind};
use crate::entity::{downcast, Entity, EntityType, Id, Parent};
use crate::error::{EntityError, OrmError};
use crate::event::EntityManagerEvent;
use crate::mapper::{is_blank, KeyMode, Mapper};
use crate::query::{with_query, QueryBuilder};
use crate::repository::ApiRepository;

/// Persists entities through an [`ApiClient`].
///
/// Cloning is cheap: the client, the metadata registry and the dispatcher
/// are shared.
#[derive(Clone)]
pub struct EntityManager {
    client: Arc<dyn ApiClient>,
    mapper: Mapper,
    dispatcher: Option<Arc<dyn EventDispatcher<EntityManagerEvent>>>,
}

impl EntityManager {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self {
            client,
            mapper: Mapper::new(),
            dispatcher: None,
        }
    }

    pub fn with_mapper(mut self, mapper: Mapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_event_dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher<EntityManagerEvent>>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn client(&self) -> &Arc<dyn ApiClient> {
        &self.client
    }

    pub fn has_event_dispatcher(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Typed repository over this manager.
    pub fn repository<T: EntityType>(&self) -> ApiRepository<T> {
        ApiRepository::new(self.clone())
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Number of entities in a collection.
    ///
    /// Nested collections take their parent ids from `parent`: a single
    /// [`Id`] or [`Parent::params`] keyed by placeholder name.
    pub async fn count<T: EntityType>(&self, parent: impl Into<Parent>) -> Result<u64, OrmError> {
        let prototype = T::default();
        let path = self.mapper.resource_path(&prototype, &parent.into())?;
        let endpoint = self.endpoint(&prototype, path)?;
        debug!(method = "GET", %endpoint, "Counting entities");
        Ok(self.client.count(&endpoint).await?)
    }

    pub async fn find<T: EntityType>(
        &self,
        id: impl Into<Id>,
        parent: impl Into<Parent>,
        auto: bool,
    ) -> Result<Option<T>, OrmError> {
        let descriptor = T::entity_descriptor();
        self.mapper.check_class(descriptor.name)?;
        match self.find_dyn(descriptor, id.into(), parent.into(), auto).await? {
            Some(entity) => Ok(Some(downcast::<T>(entity)?)),
            None => Ok(None),
        }
    }

    pub async fn find_all<T: EntityType>(
        &self,
        parent: impl Into<Parent>,
        order: Option<(&str, bool)>,
        auto: bool,
    ) -> Result<Vec<T>, OrmError> {
        let mut query = QueryBuilder::new();
        if let Some((field, ascending)) = order {
            query = query.order(field, ascending);
        }
        let found = self
            .find_all_dyn(T::entity_descriptor(), parent.into(), query, auto)
            .await?;
        Self::downcast_all(found)
    }

    pub async fn find_by<T: EntityType>(
        &self,
        parent: impl Into<Parent>,
        query: QueryBuilder,
        auto: bool,
    ) -> Result<Vec<T>, OrmError> {
        let found = self
            .find_by_dyn(T::entity_descriptor(), parent.into(), query, auto)
            .await?;
        Self::downcast_all(found)
    }

    fn downcast_all<T: EntityType>(found: Vec<Box<dyn Entity>>) -> Result<Vec<T>, OrmError> {
        found
            .into_iter()
            .map(|entity| downcast::<T>(entity).map_err(OrmError::from))
            .collect()
    }

    /// Untyped [`find`](Self::find), used by the relation handlers.
    pub fn find_dyn(
        &self,
        descriptor: &'static EntityDescriptor,
        id: Id,
        parent: Parent,
        auto: bool,
    ) -> BoxFuture<'_, Result<Option<Box<dyn Entity>>, OrmError>> {
        Box::pin(async move {
            self.mapper.check_id(Some(&id))?;
            let mut entity = descriptor.create();
            let resource = self.mapper.class_annotation(entity.as_ref())?;
            let base = self.mapper.resource_path(entity.as_ref(), &parent)?;
            let includes = self.mapper.auto_includes(entity.as_ref());

            let path = if resource.id_in_path {
                let query = QueryBuilder::new().include(includes.as_slice());
                with_query(&format!("{base}/{id}"), &query.query_string())
            } else {
                let query = QueryBuilder::new()
                    .where_in("id", &[id.to_string()])
                    .include(includes.as_slice());
                with_query(&base, &query.query_string())
            };

            let endpoint = self.endpoint(entity.as_ref(), path)?;
            debug!(method = "GET", %endpoint, entity = descriptor.name, "Finding entity");
            let result = self.client.find(&endpoint).await?;
            if is_blank(&result) {
                return Ok(None);
            }

            self.mapper.patch(entity.as_mut(), &result, true)?;
            if auto {
                self.auto_load(entity.as_mut(), &result, &parent).await?;
            }
            Ok(Some(entity))
        })
    }

    /// Untyped [`find_all`](Self::find_all).
    pub fn find_all_dyn(
        &self,
        descriptor: &'static EntityDescriptor,
        parent: Parent,
        query: QueryBuilder,
        auto: bool,
    ) -> BoxFuture<'_, Result<Vec<Box<dyn Entity>>, OrmError>> {
        Box::pin(async move {
            let endpoint = self.collection_endpoint(descriptor, &parent, query)?;
            debug!(method = "GET", %endpoint, entity = descriptor.name, "Finding all entities");
            let results = self.client.find_all(&endpoint).await?;
            self.hydrate(descriptor, results, &parent, auto).await
        })
    }

    /// Untyped [`find_by`](Self::find_by).
    pub fn find_by_dyn(
        &self,
        descriptor: &'static EntityDescriptor,
        parent: Parent,
        query: QueryBuilder,
        auto: bool,
    ) -> BoxFuture<'_, Result<Vec<Box<dyn Entity>>, OrmError>> {
        Box::pin(async move {
            let endpoint = self.collection_endpoint(descriptor, &parent, query)?;
            debug!(method = "GET", %endpoint, entity = descriptor.name, "Finding entities by query");
            let results = self.client.find_by(&endpoint).await?;
            self.hydrate(descriptor, results, &parent, auto).await
        })
    }

    fn collection_endpoint(
        &self,
        descriptor: &'static EntityDescriptor,
        parent: &Parent,
        query: QueryBuilder,
    ) -> Result<Endpoint, OrmError> {
        let prototype = descriptor.create();
        let base = self.mapper.resource_path(prototype.as_ref(), parent)?;
        let includes = self.mapper.auto_includes(prototype.as_ref());
        let query = query.include(includes.as_slice());
        self.endpoint(prototype.as_ref(), with_query(&base, &query.query_string()))
    }

    /// Endpoint of `path` on the API serving the entity's resource.
    fn endpoint(&self, entity: &dyn Entity, path: String) -> Result<Endpoint, OrmError> {
        let resource = self.mapper.class_annotation(entity)?;
        Ok(match resource.kind {
            ResourceKind::Api => Endpoint::api(path),
            ResourceKind::Payment => Endpoint::payment(path, self.mapper.access_token(entity)),
        })
    }

    async fn hydrate(
        &self,
        descriptor: &'static EntityDescriptor,
        results: Vec<Value>,
        parent: &Parent,
        auto: bool,
    ) -> Result<Vec<Box<dyn Entity>>, OrmError> {
        let mut entities = Vec::with_capacity(results.len());
        for item in &results {
            if !item.is_object() {
                warn!(entity = descriptor.name, value = %item, "Skipping non-object collection item");
                continue;
            }
            let mut entity = descriptor.create();
            self.mapper.patch(entity.as_mut(), item, true)?;
            if auto {
                self.auto_load(entity.as_mut(), item, parent).await?;
            }
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Run the handler of every auto-load relation of the entity, in declaration order.
    pub fn auto_load<'a>(
        &'a self,
        entity: &'a mut dyn Entity,
        data: &'a Value,
        parent: &'a Parent,
    ) -> BoxFuture<'a, Result<(), OrmError>> {
        Box::pin(async move {
            let metadata = self.mapper.metadata(entity);
            for relation in metadata.auto_load_fields().iter().copied() {
                relation
                    .kind
                    .handler()
                    .handle(self, &mut *entity, relation, data, parent)
                    .await?;
            }
            Ok(())
        })
    }

    // ── Writes ─────────────────────────────────────────────────────────

    /// Create or update, depending on whether the entity has an id.
    pub async fn save(&self, entity: &mut dyn Entity) -> Result<bool, OrmError> {
        self.prepare(entity)?;
        let data = self.mapper.writable_field_values(entity, &Map::new());
        match entity.id().filter(|id| !id.is_empty()) {
            Some(id) => self.send_update(entity, data, &id).await,
            None => self.send_create(entity, data).await,
        }
    }

    /// Create the entity regardless of its id.
    pub async fn create(&self, entity: &mut dyn Entity) -> Result<bool, OrmError> {
        self.prepare(entity)?;
        let data = self.mapper.writable_field_values(entity, &Map::new());
        self.send_create(entity, data).await
    }

    /// Send a partial update made of `data` only.
    ///
    /// Empty data, or data naming unknown or readonly fields, succeeds
    /// without a request.
    pub async fn update(&self, entity: &mut dyn Entity, data: Map<String, Value>) -> Result<bool, OrmError> {
        let id = entity.id();
        let id = self.mapper.check_id(id.as_ref())?.clone();
        if data.is_empty() {
            return Ok(true);
        }
        if !entity.is_patched() {
            self.mapper.patch(entity, &Value::Null, false)?;
        }
        self.check_validations(entity)?;
        if !self.mapper.check_none_readonly_data(entity, &data) {
            warn!(
                entity = entity.descriptor().name,
                "Update data names no writable field, nothing sent"
            );
            return Ok(true);
        }
        self.send_update(entity, data, &id).await
    }

    /// Create several entities of one type with a single request.
    ///
    /// When the API answers with one object per entity, each entity is
    /// patched from its object.
    pub async fn batch_create<T: EntityType>(&self, entities: &mut [T]) -> Result<bool, OrmError> {
        let Some(first) = entities.first() else {
            return Ok(false);
        };
        let path = self.mapper.resource_path(first, &Parent::None)?;
        let endpoint = self.endpoint(first, path)?;

        let mut payload = Vec::with_capacity(entities.len());
        for entity in entities.iter_mut() {
            self.prepare(entity)?;
            let data = self.mapper.writable_field_values(entity, &Map::new());
            if !self.mapper.check_none_readonly_data(entity, &data) {
                return Err(EntityError::EmptyWritableData.into());
            }
            payload.push(Value::Object(data));
        }

        debug!(method = "POST", %endpoint, count = payload.len(), "Batch creating entities");
        let result = self
            .client
            .create(&endpoint, Value::Array(payload), Vec::new())
            .await?;
        if is_blank(&result) {
            return Ok(false);
        }

        if let Value::Array(items) = &result {
            if items.len() == entities.len() {
                for (entity, item) in entities.iter_mut().zip(items) {
                    self.mapper.patch(entity, item, true)?;
                    entity.state_mut().is_new = true;
                    self.dispatch(EntityManagerEvent::created(entity)).await;
                }
            }
        }
        Ok(true)
    }

    /// Delete by id, or by the value of the field named `key`.
    pub async fn delete(&self, entity: &dyn Entity, key: Option<&str>) -> Result<bool, OrmError> {
        let path = self.mapper.resource_path(entity, &Parent::None)?;
        let id = match key {
            None | Some("id") => entity.id(),
            Some(field) => Id::from_value(&self.mapper.property_value_by_field_name(entity, field)?),
        };
        let id = self.mapper.check_id(id.as_ref())?;
        let endpoint = self.endpoint(entity, format!("{path}/{id}"))?;
        debug!(method = "DELETE", %endpoint, "Deleting entity");
        Ok(self.client.delete(&endpoint).await?)
    }

    fn prepare(&self, entity: &mut dyn Entity) -> Result<(), OrmError> {
        if !entity.is_patched() {
            self.mapper.patch(entity, &Value::Null, false)?;
        }
        let missing = self.mapper.check_required_fields(entity);
        if !missing.is_empty() {
            return Err(EntityError::RequiredFields(missing.into_keys().collect()).into());
        }
        self.check_validations(entity)
    }

    fn check_validations(&self, entity: &dyn Entity) -> Result<(), OrmError> {
        let failed = self.mapper.check_required_validations(entity);
        if !failed.is_empty() {
            return Err(EntityError::RequiredValidations(failed.into_values().collect()).into());
        }
        Ok(())
    }

    async fn send_create(&self, entity: &mut dyn Entity, mut data: Map<String, Value>) -> Result<bool, OrmError> {
        if !self.mapper.check_none_readonly_data(entity, &data) {
            return Err(EntityError::EmptyWritableData.into());
        }
        let files = self.upload_files(entity)?;
        for file in &files {
            data.remove(&file.field);
        }

        let path = self.mapper.resource_path(entity, &Parent::None)?;
        let endpoint = self.endpoint(entity, path)?;
        debug!(method = "POST", %endpoint, files = files.len(), "Creating entity");
        let result = self.client.create(&endpoint, Value::Object(data), files).await?;
        if is_blank(&result) {
            return Ok(false);
        }

        self.mapper.patch(entity, &result, true)?;
        entity.state_mut().is_new = true;
        self.dispatch(EntityManagerEvent::created(entity)).await;
        Ok(true)
    }

    async fn send_update(&self, entity: &mut dyn Entity, data: Map<String, Value>, id: &Id) -> Result<bool, OrmError> {
        if !self.mapper.check_none_readonly_data(entity, &data) {
            return Ok(true);
        }
        let path = format!("{}/{id}", self.mapper.resource_path(entity, &Parent::None)?);
        let endpoint = self.endpoint(entity, path)?;
        debug!(method = "PUT", %endpoint, "Updating entity");
        let result = self.client.update(&endpoint, Value::Object(data)).await?;
        if is_blank(&result) {
            return Ok(false);
        }

        self.mapper.patch(entity, &result, true)?;
        entity.state_mut().is_new = false;
        self.dispatch(EntityManagerEvent::updated(entity)).await;
        Ok(true)
    }

    /// Files behind the entity's upload fields. Unset fields are skipped.
    fn upload_files(&self, entity: &dyn Entity) -> Result<Vec<UploadFile>, EntityError> {
        let metadata = self.mapper.metadata(entity);
        let mut files = Vec::new();
        for field in metadata.upload_fields() {
            let Some(Value::String(location)) = entity.property(field.property) else {
                continue;
            };
            if location.is_empty() {
                continue;
            }
            if !Path::new(&location).is_file() {
                return Err(EntityError::InvalidUploadFile(location));
            }
            files.push(UploadFile {
                field: field.field.to_string(),
                path: location.into(),
            });
        }
        Ok(files)
    }

    async fn dispatch(&self, event: EntityManagerEvent) {
        if let Some(dispatcher) = &self.dispatcher {
            let name = event.name();
            dispatcher.dispatch(event, name).await;
        }
    }

    // ── Pass-throughs ──────────────────────────────────────────────────

    /// Build a typed entity from user data. Readonly fields are ignored.
    pub fn new_entity<T: EntityType>(&self, data: &Value) -> Result<T, OrmError> {
        Ok(self.mapper.patch_new::<T>(data, false)?)
    }

    /// Build an entity registered under `name` from user data.
    pub fn new_object(&self, name: &str, data: &Value) -> Result<Box<dyn Entity>, OrmError> {
        let mut entity = self.mapper.object(name)?;
        self.mapper.patch(entity.as_mut(), data, false)?;
        Ok(entity)
    }

    pub fn patch(&self, entity: &mut dyn Entity, data: &Value) -> Result<(), OrmError> {
        Ok(self.mapper.patch(entity, data, false)?)
    }

    pub fn to_array(&self, entity: &dyn Entity, mode: KeyMode) -> Map<String, Value> {
        self.mapper.to_array(entity, mode)
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("mapper", &self.mapper)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}
