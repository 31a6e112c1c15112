use crate::entity::{Entity, EntityType};

pub const ENTITY_CREATED: &str = "entity.created";
pub const ENTITY_UPDATED: &str = "entity.updated";

/// Emitted after a successful create or update, carrying a snapshot of the entity.
#[derive(Debug, Clone)]
pub struct EntityManagerEvent {
    name: &'static str,
    entity: Box<dyn Entity>,
}

impl EntityManagerEvent {
    pub fn new(name: &'static str, entity: Box<dyn Entity>) -> Self {
        Self { name, entity }
    }

    pub fn created(entity: &dyn Entity) -> Self {
        Self::new(ENTITY_CREATED, entity.clone_entity())
    }

    pub fn updated(entity: &dyn Entity) -> Self {
        Self::new(ENTITY_UPDATED, entity.clone_entity())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entity(&self) -> &dyn Entity {
        self.entity.as_ref()
    }

    /// The snapshot as a concrete type, if it is one.
    pub fn entity_as<T: EntityType>(&self) -> Option<&T> {
        self.entity.as_any().downcast_ref::<T>()
    }
}
