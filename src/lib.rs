//! Ancestry - materialized ancestor closure for privilege propagation
//!
//! Resources form a hierarchy through their permission parents. Every save
//! reconciles a stored `(child, ancestor)` closure so that authorization
//! queries join direct grants against it instead of walking the graph.
//! Parties inherit grants from the groups they belong to when the membership
//! edge says so.

pub mod authz;
pub mod entities;
pub mod errors;
pub mod settings;
pub mod storage;

pub use authz::closure::{
    create, get_permission_ancestors, reconcile, reconcile_all, save, save_with,
};
pub use authz::engine::{
    direct_permissions, get_permitted_items, has_privilege, permitted_resources,
};
pub use authz::membership::get_memberships;
pub use errors::AuthzError;
