pub mod closure;
pub mod engine;
pub mod membership;
pub mod registry;
pub mod types;
mod walk;

pub use registry::{Registry, RegistryBuilder};
pub use types::{
    ConcreteResource, PartyId, PermissionNode, Privilege, Reconciled, ResourceId, ResourceKind,
    ResourceRef, SaveMode, ABSTRACT_KIND,
};
