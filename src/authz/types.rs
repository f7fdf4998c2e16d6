use async_trait::async_trait;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entities::resource;

pub type ResourceId = i32;
pub type PartyId = i32;

/// Kind tag of the abstract resource table. Never registrable, never queryable.
pub const ABSTRACT_KIND: &str = "resource";

/// Opaque privilege tag, e.g. "admin". The closed set of valid values is held
/// by the [`Registry`](crate::authz::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Privilege(String);

impl Privilege {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Privilege {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abstract handle to a resource: its identity plus the concrete kind tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub kind: String,
}

impl From<resource::Model> for ResourceRef {
    fn from(model: resource::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A resource that takes part in privilege propagation.
pub trait PermissionNode: Send + Sync {
    fn resource_id(&self) -> ResourceId;

    /// Immediate resources this one inherits privilege visibility from.
    fn permission_parents(&self) -> Vec<ResourceId>;
}

/// A type backed by rows keyed by the abstract resource id.
#[async_trait]
pub trait ResourceKind: Sized + Send + Sync + 'static {
    const KIND: &'static str;

    async fn load_many<C>(db: &C, ids: &[ResourceId]) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait;
}

/// A concrete resource type that can be registered and saved.
#[async_trait]
pub trait ConcreteResource: ResourceKind + PermissionNode {
    /// Insert or update the concrete record.
    async fn store<C>(&self, db: &C) -> Result<(), DbErr>
    where
        C: ConnectionTrait;
}

// The abstract table is loadable like any other kind, which is what lets
// typed queries against it be rejected at runtime rather than misread.
#[async_trait]
impl ResourceKind for resource::Model {
    const KIND: &'static str = ABSTRACT_KIND;

    async fn load_many<C>(db: &C, ids: &[ResourceId]) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        resource::Entity::find()
            .filter(resource::Column::Id.is_in(ids.iter().copied()))
            .all(db)
            .await
    }
}

/// Whether a save reconciles the closure immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Reconcile,
    /// Skip reconciliation; the caller triggers it later, e.g. after a bulk load.
    Deferred,
}

/// Outcome of a reconcile pass, including its cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Resources whose stored closure was rewritten.
    pub rewritten: usize,
}

impl Reconciled {
    pub fn is_noop(&self) -> bool {
        self.rewritten == 0
    }
}
