use std::future::Future;
use std::marker::PhantomData;

use crate::entity::{EntityType, Id, Parent};
use crate::error::OrmError;
use crate::manager::EntityManager;
use crate::page::{Page, Pageable};
use crate::query::QueryBuilder;

/// Generic async repository over one entity type.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
pub trait Repository<T>: Send + Sync
where
    T: EntityType,
{
    fn find_by_id(&self, id: &Id) -> impl Future<Output = Result<Option<T>, OrmError>> + Send;
    fn find_all(&self) -> impl Future<Output = Result<Vec<T>, OrmError>> + Send;
    fn find_all_paged(&self, pageable: &Pageable) -> impl Future<Output = Result<Page<T>, OrmError>> + Send;
    fn find_by(&self, query: QueryBuilder) -> impl Future<Output = Result<Vec<T>, OrmError>> + Send;
    fn save(&self, entity: &mut T) -> impl Future<Output = Result<bool, OrmError>> + Send;
    fn delete(&self, entity: &T) -> impl Future<Output = Result<bool, OrmError>> + Send;
    fn count(&self) -> impl Future<Output = Result<u64, OrmError>> + Send;
}

/// [`Repository`] backed by an [`EntityManager`].
///
/// Nested resources (`/catalog/products/{product_id}/reviews`) are scoped
/// with [`under`](Self::under), resources with several placeholders with
/// [`with_parent`](Self::with_parent).
#[derive(Debug, Clone)]
pub struct ApiRepository<T> {
    em: EntityManager,
    parent: Parent,
    auto_load: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: EntityType> ApiRepository<T> {
    pub fn new(em: EntityManager) -> Self {
        Self {
            em,
            parent: Parent::None,
            auto_load: false,
            _marker: PhantomData,
        }
    }

    /// Scope the repository to the collection under `parent_id`.
    pub fn under(mut self, parent_id: impl Into<Id>) -> Self {
        self.parent = Parent::id(parent_id);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<Parent>) -> Self {
        self.parent = parent.into();
        self
    }

    pub fn with_auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }

    pub fn entity_manager(&self) -> &EntityManager {
        &self.em
    }
}

impl<T: EntityType> Repository<T> for ApiRepository<T> {
    async fn find_by_id(&self, id: &Id) -> Result<Option<T>, OrmError> {
        self.em
            .find::<T>(id.clone(), self.parent.clone(), self.auto_load)
            .await
    }

    async fn find_all(&self) -> Result<Vec<T>, OrmError> {
        self.em
            .find_all::<T>(self.parent.clone(), None, self.auto_load)
            .await
    }

    async fn find_all_paged(&self, pageable: &Pageable) -> Result<Page<T>, OrmError> {
        let total = self.count().await?;
        let content = self
            .em
            .find_by::<T>(
                self.parent.clone(),
                pageable.apply(QueryBuilder::new()),
                self.auto_load,
            )
            .await?;
        Ok(Page::new(content, pageable, total))
    }

    async fn find_by(&self, query: QueryBuilder) -> Result<Vec<T>, OrmError> {
        self.em
            .find_by::<T>(self.parent.clone(), query, self.auto_load)
            .await
    }

    async fn save(&self, entity: &mut T) -> Result<bool, OrmError> {
        self.em.save(entity).await
    }

    async fn delete(&self, entity: &T) -> Result<bool, OrmError> {
        self.em.delete(entity, None).await
    }

    async fn count(&self) -> Result<u64, OrmError> {
        self.em.count::<T>(self.parent.clone()).await
    }
}
