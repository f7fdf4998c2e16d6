use std::collections::{BTreeSet, VecDeque};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::authz::types::{ConcreteResource, Reconciled, ResourceId, ResourceRef, SaveMode};
use crate::authz::walk::AncestorWalk;
use crate::authz::Registry;
use crate::errors::AuthzError;
use crate::storage;

/// Walk live parent links from `id`; the result starts with `id` itself.
async fn derive_in(
    txn: &DatabaseTransaction,
    registry: &Registry,
    id: ResourceId,
) -> Result<Vec<ResourceRef>, AuthzError> {
    let mut walk = AncestorWalk::new(id);
    let mut found = Vec::new();
    while let Some(next) = walk.next() {
        let (reference, node) = registry.fetch(txn, next).await?;
        walk.expand(next, &node.permission_parents())?;
        found.push(reference);
    }
    Ok(found)
}

/// Derived ancestor set of `id`, itself included exactly once.
pub async fn get_permission_ancestors(
    db: &DatabaseConnection,
    registry: &Registry,
    id: ResourceId,
) -> Result<Vec<ResourceRef>, AuthzError> {
    let txn = db.begin().await?;
    let ancestors = derive_in(&txn, registry, id).await?;
    txn.commit().await?;
    Ok(ancestors)
}

/// Rewrite the stored closure of `id` if it differs from the derived one.
/// Returns whether anything was written.
async fn reconcile_one(
    txn: &DatabaseTransaction,
    registry: &Registry,
    id: ResourceId,
) -> Result<bool, AuthzError> {
    storage::lock_resource(txn, id).await?;

    let derived: BTreeSet<ResourceId> = derive_in(txn, registry, id)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    let stored = storage::stored_ancestors(txn, id).await?;

    if derived == stored {
        tracing::debug!(resource = id, "Ancestor closure unchanged");
        return Ok(false);
    }

    storage::replace_closure(txn, id, &derived).await?;
    tracing::info!(
        resource = id,
        ancestors = derived.len(),
        previous = stored.len(),
        "Rewrote ancestor closure"
    );
    Ok(true)
}

/// Reconcile `root`, then cascade to every resource recorded as its descendant.
/// Each descendant re-derives from its own live parents and stops there if
/// nothing changed.
async fn reconcile_in(
    txn: &DatabaseTransaction,
    registry: &Registry,
    root: ResourceId,
) -> Result<Reconciled, AuthzError> {
    let mut queue = VecDeque::from([root]);
    let mut outcome = Reconciled::default();

    while let Some(id) = queue.pop_front() {
        if !reconcile_one(txn, registry, id).await? {
            continue;
        }
        outcome.rewritten += 1;

        let descendants = storage::stored_descendants(txn, id).await?;
        tracing::debug!(
            resource = id,
            descendants = descendants.len(),
            "Cascading closure update"
        );
        for child in descendants {
            if !queue.contains(&child) {
                queue.push_back(child);
            }
        }
    }

    Ok(outcome)
}

/// Explicitly reconcile one resource and its descendants in a single transaction.
pub async fn reconcile(
    db: &DatabaseConnection,
    registry: &Registry,
    id: ResourceId,
) -> Result<Reconciled, AuthzError> {
    let txn = db.begin().await?;
    let outcome = reconcile_in(&txn, registry, id).await?;
    txn.commit().await?;
    Ok(outcome)
}

/// Reconcile every resource, e.g. after a bulk load with deferred saves.
pub async fn reconcile_all(
    db: &DatabaseConnection,
    registry: &Registry,
) -> Result<Reconciled, AuthzError> {
    let txn = db.begin().await?;
    let ids = storage::all_resource_ids(&txn).await?;
    let mut outcome = Reconciled::default();
    for id in &ids {
        outcome.rewritten += reconcile_in(&txn, registry, *id).await?.rewritten;
    }
    txn.commit().await?;

    tracing::info!(
        resources = ids.len(),
        rewritten = outcome.rewritten,
        "Rebuilt ancestor closures"
    );
    Ok(outcome)
}

/// Allocate an identity for a new resource, build it, store it and reconcile
/// according to the registry's save policy.
pub async fn create<T, F>(
    db: &DatabaseConnection,
    registry: &Registry,
    build: F,
) -> Result<T, AuthzError>
where
    T: ConcreteResource,
    F: FnOnce(ResourceId) -> T,
{
    registry.ensure_concrete(T::KIND)?;

    let txn = db.begin().await?;
    let row = storage::register_resource(&txn, T::KIND).await?;
    let resource = build(row.id);
    if resource.resource_id() != row.id {
        return Err(AuthzError::Configuration(format!(
            "{} record must use the allocated id {}, got {}",
            T::KIND,
            row.id,
            resource.resource_id()
        )));
    }
    resource.store(&txn).await?;
    if registry.reconcile_on_save() {
        reconcile_in(&txn, registry, row.id).await?;
    }
    txn.commit().await?;

    tracing::debug!(resource = row.id, kind = T::KIND, "Created resource");
    Ok(resource)
}

/// Persist `resource` and reconcile according to the registry's save policy.
pub async fn save<T: ConcreteResource>(
    db: &DatabaseConnection,
    registry: &Registry,
    resource: &T,
) -> Result<Reconciled, AuthzError> {
    let mode = if registry.reconcile_on_save() {
        SaveMode::Reconcile
    } else {
        SaveMode::Deferred
    };
    save_with(db, registry, resource, mode).await
}

pub async fn save_with<T: ConcreteResource>(
    db: &DatabaseConnection,
    registry: &Registry,
    resource: &T,
    mode: SaveMode,
) -> Result<Reconciled, AuthzError> {
    registry.ensure_concrete(T::KIND)?;
    let id = resource.resource_id();

    let txn = db.begin().await?;
    let row = storage::get_resource(&txn, id)
        .await?
        .ok_or(AuthzError::ResourceNotFound(id))?;
    if row.kind != T::KIND {
        return Err(AuthzError::Configuration(format!(
            "resource {id} is a `{}`, not a `{}`",
            row.kind,
            T::KIND
        )));
    }

    resource.store(&txn).await?;
    let outcome = match mode {
        SaveMode::Reconcile => reconcile_in(&txn, registry, id).await?,
        SaveMode::Deferred => Reconciled::default(),
    };
    txn.commit().await?;
    Ok(outcome)
}
