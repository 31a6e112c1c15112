pub mod client;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod event;
pub mod manager;
pub mod mapper;
pub mod metadata;
pub mod page;
pub mod query;
pub mod relation;
pub mod repository;
pub mod validation;

pub use client::{ApiClient, BoxFuture, Endpoint, UploadFile};
pub use descriptor::{
    EntityDescriptor, FieldDescriptor, RelationDescriptor, RelationKind, RelationSource,
    ResourceDescriptor, ResourceKind,
};
pub use entity::{Entity, EntityState, EntityType, Id, Parent, Related, RelatedOwned};
pub use error::{ClientError, EntityError, HandlerError, MapperError, OrmError, TransportError};
pub use event::{EntityManagerEvent, ENTITY_CREATED, ENTITY_UPDATED};
pub use manager::EntityManager;
pub use mapper::{KeyMode, Mapper};
pub use metadata::{Metadata, MetadataRegistry};
pub use page::{Page, Pageable};
pub use query::QueryBuilder;
pub use relation::{HasManyHandler, HasOneHandler, RelationHandler};
pub use repository::{ApiRepository, Repository};
pub use validation::{ValidationRule, Validator};

pub use bcorm_macros::Entity;

#[doc(hidden)]
pub use serde_json;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        ApiClient, ApiRepository, Entity, EntityManager, EntityManagerEvent, EntityType, Id,
        KeyMode, Mapper, OrmError, Page, Pageable, Parent, QueryBuilder, Repository,
    };
}
