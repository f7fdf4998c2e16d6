use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};

use crate::authz::membership::get_memberships;
use crate::authz::types::{PartyId, Privilege, ResourceId, ResourceKind, ResourceRef};
use crate::authz::Registry;
use crate::entities::resource;
use crate::errors::AuthzError;
use crate::storage;

/// Resources of `kind` on which `party` holds `privilege`, directly or
/// through resource ancestry and inherited group membership.
async fn permitted_rows<C: ConnectionTrait>(
    db: &C,
    registry: &Registry,
    kind: &str,
    party: PartyId,
    privilege: &Privilege,
) -> Result<Vec<resource::Model>, AuthzError> {
    registry.ensure_concrete(kind)?;
    registry.ensure_privilege(privilege)?;

    // 1. Parties whose grants count for `party`
    let parties = get_memberships(db, party, true).await?;

    // 2. Directly granted resources
    let targets = storage::granted_resources(db, &parties, privilege).await?;
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    // 3. Resources of the requested kind below any granted resource
    let rows = storage::descendants_of_kind(db, &targets, kind).await?;

    tracing::debug!(
        party,
        %privilege,
        kind,
        granted = targets.len(),
        permitted = rows.len(),
        "Resolved permitted resources"
    );
    Ok(rows)
}

/// Resources of type `T` that `party` may act on with `privilege`.
///
/// Calling this with the abstract `entities::resource::Model` fails with
/// [`AuthzError::Configuration`].
pub async fn get_permitted_items<T: ResourceKind>(
    db: &DatabaseConnection,
    registry: &Registry,
    party: PartyId,
    privilege: &Privilege,
) -> Result<Vec<T>, AuthzError> {
    let txn = db.begin().await?;
    let rows = permitted_rows(&txn, registry, T::KIND, party, privilege).await?;
    let items = if rows.is_empty() {
        Vec::new()
    } else {
        let ids: Vec<ResourceId> = rows.iter().map(|r| r.id).collect();
        T::load_many(&txn, &ids).await?
    };
    txn.commit().await?;
    Ok(items)
}

/// Same as [`get_permitted_items`], addressed by kind tag.
pub async fn permitted_resources(
    db: &DatabaseConnection,
    registry: &Registry,
    kind: &str,
    party: PartyId,
    privilege: &Privilege,
) -> Result<Vec<ResourceRef>, AuthzError> {
    let txn = db.begin().await?;
    let rows = permitted_rows(&txn, registry, kind, party, privilege).await?;
    txn.commit().await?;
    Ok(rows.into_iter().map(ResourceRef::from).collect())
}

/// Whether `party` holds `privilege` on `resource`, directly or inherited.
pub async fn has_privilege(
    db: &DatabaseConnection,
    registry: &Registry,
    party: PartyId,
    resource: ResourceId,
    privilege: &Privilege,
) -> Result<bool, AuthzError> {
    registry.ensure_privilege(privilege)?;

    let txn = db.begin().await?;
    if storage::get_resource(&txn, resource).await?.is_none() {
        return Err(AuthzError::ResourceNotFound(resource));
    }
    let parties = get_memberships(&txn, party, true).await?;
    let ancestors = storage::stored_ancestors(&txn, resource).await?;
    let allowed = !ancestors.is_empty()
        && storage::has_any_grant(&txn, &parties, &ancestors, privilege).await?;
    txn.commit().await?;
    Ok(allowed)
}

/// Resources on which `party`, or a group it inherits from, holds `privilege`
/// through a direct grant. Ancestry is not expanded.
pub async fn direct_permissions(
    db: &DatabaseConnection,
    registry: &Registry,
    party: PartyId,
    privilege: &Privilege,
) -> Result<Vec<ResourceRef>, AuthzError> {
    registry.ensure_privilege(privilege)?;

    let txn = db.begin().await?;
    let parties = get_memberships(&txn, party, true).await?;
    let targets = storage::granted_resources(&txn, &parties, privilege).await?;
    let rows = storage::get_resources(&txn, &targets).await?;
    txn.commit().await?;
    Ok(rows.into_iter().map(ResourceRef::from).collect())
}
