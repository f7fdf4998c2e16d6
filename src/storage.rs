use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
};

use crate::authz::types::{PartyId, Privilege, ResourceId};
use crate::authz::Registry;
use crate::entities::{closure_edge, grant, membership, party, resource};
use crate::errors::AuthzError;
use crate::settings::Database as DbCfg;
use migration::MigratorTrait;

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, AuthzError> {
    let db = Database::connect(&cfg.url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

// ---------- Resources ----------

/// Allocate a new abstract resource identity tagged with its concrete kind.
pub async fn register_resource<C: ConnectionTrait>(
    db: &C,
    kind: &str,
) -> Result<resource::Model, AuthzError> {
    let row = resource::ActiveModel {
        kind: Set(kind.to_string()),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

pub async fn get_resource<C: ConnectionTrait>(
    db: &C,
    id: ResourceId,
) -> Result<Option<resource::Model>, AuthzError> {
    Ok(resource::Entity::find_by_id(id).one(db).await?)
}

pub async fn get_resources<C: ConnectionTrait>(
    db: &C,
    ids: &BTreeSet<ResourceId>,
) -> Result<Vec<resource::Model>, AuthzError> {
    Ok(resource::Entity::find()
        .filter(resource::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(resource::Column::Id)
        .all(db)
        .await?)
}

/// Read the resource row with an exclusive row lock held until the
/// surrounding transaction ends. SQLite has no row locks and serializes
/// writers on the database instead.
pub async fn lock_resource<C: ConnectionTrait>(
    db: &C,
    id: ResourceId,
) -> Result<resource::Model, AuthzError> {
    resource::Entity::find_by_id(id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or(AuthzError::ResourceNotFound(id))
}

pub async fn all_resource_ids<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<ResourceId>, AuthzError> {
    let ids = resource::Entity::find()
        .select_only()
        .column(resource::Column::Id)
        .order_by_asc(resource::Column::Id)
        .into_tuple::<ResourceId>()
        .all(db)
        .await?;
    Ok(ids)
}

// ---------- Closure edges ----------

/// Ancestors currently materialized for `child`, including itself once reconciled.
pub async fn stored_ancestors<C: ConnectionTrait>(
    db: &C,
    child: ResourceId,
) -> Result<BTreeSet<ResourceId>, AuthzError> {
    let ids = closure_edge::Entity::find()
        .select_only()
        .column(closure_edge::Column::AncestorId)
        .filter(closure_edge::Column::ChildId.eq(child))
        .into_tuple::<ResourceId>()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Resources whose stored closure lists `ancestor`, excluding `ancestor` itself.
pub async fn stored_descendants<C: ConnectionTrait>(
    db: &C,
    ancestor: ResourceId,
) -> Result<Vec<ResourceId>, AuthzError> {
    let ids = closure_edge::Entity::find()
        .select_only()
        .column(closure_edge::Column::ChildId)
        .filter(closure_edge::Column::AncestorId.eq(ancestor))
        .filter(closure_edge::Column::ChildId.ne(ancestor))
        .order_by_asc(closure_edge::Column::ChildId)
        .into_tuple::<ResourceId>()
        .all(db)
        .await?;
    Ok(ids)
}

/// Replace every stored closure row of `child` with `ancestors`.
/// Only the closure maintainer calls this, inside its transaction.
pub(crate) async fn replace_closure<C: ConnectionTrait>(
    db: &C,
    child: ResourceId,
    ancestors: &BTreeSet<ResourceId>,
) -> Result<(), AuthzError> {
    closure_edge::Entity::delete_many()
        .filter(closure_edge::Column::ChildId.eq(child))
        .exec(db)
        .await?;

    if ancestors.is_empty() {
        return Ok(());
    }

    let rows = ancestors.iter().map(|&ancestor| closure_edge::ActiveModel {
        child_id: Set(child),
        ancestor_id: Set(ancestor),
    });
    closure_edge::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await
        .map_err(AuthzError::from_write)?;
    Ok(())
}

/// Resources of `kind` whose stored closure contains any of `ancestors`.
pub async fn descendants_of_kind<C: ConnectionTrait>(
    db: &C,
    ancestors: &BTreeSet<ResourceId>,
    kind: &str,
) -> Result<Vec<resource::Model>, AuthzError> {
    let children = closure_edge::Entity::find()
        .select_only()
        .column(closure_edge::Column::ChildId)
        .filter(closure_edge::Column::AncestorId.is_in(ancestors.iter().copied()))
        .into_query();

    let rows = resource::Entity::find()
        .filter(resource::Column::Kind.eq(kind))
        .filter(resource::Column::Id.in_subquery(children))
        .order_by_asc(resource::Column::Id)
        .all(db)
        .await?;
    Ok(rows)
}

// ---------- Parties & memberships ----------

pub async fn create_party<C: ConnectionTrait>(
    db: &C,
    kind: &str,
    display_name: Option<String>,
) -> Result<party::Model, AuthzError> {
    let row = party::ActiveModel {
        kind: Set(kind.to_string()),
        display_name: Set(display_name),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

pub async fn get_party<C: ConnectionTrait>(
    db: &C,
    id: PartyId,
) -> Result<Option<party::Model>, AuthzError> {
    Ok(party::Entity::find_by_id(id).one(db).await?)
}

/// Add `member -> group`, or update the inheritance flag if the edge exists.
pub async fn add_membership<C: ConnectionTrait>(
    db: &C,
    member: PartyId,
    group: PartyId,
    inherit_privileges: bool,
) -> Result<membership::Model, AuthzError> {
    for id in [member, group] {
        if get_party(db, id).await?.is_none() {
            return Err(AuthzError::PartyNotFound(id));
        }
    }

    let existing = membership::Entity::find()
        .filter(membership::Column::MemberId.eq(member))
        .filter(membership::Column::GroupId.eq(group))
        .one(db)
        .await?;

    if let Some(edge) = existing {
        if edge.inherit_privileges == inherit_privileges {
            return Ok(edge);
        }
        let mut active = edge.into_active_model();
        active.inherit_privileges = Set(inherit_privileges);
        return Ok(active.update(db).await?);
    }

    let edge = membership::ActiveModel {
        member_id: Set(member),
        group_id: Set(group),
        inherit_privileges: Set(inherit_privileges),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };
    Ok(edge.insert(db).await?)
}

/// Returns whether an edge was removed.
pub async fn remove_membership<C: ConnectionTrait>(
    db: &C,
    member: PartyId,
    group: PartyId,
) -> Result<bool, AuthzError> {
    let result = membership::Entity::delete_many()
        .filter(membership::Column::MemberId.eq(member))
        .filter(membership::Column::GroupId.eq(group))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Outgoing membership edges of every party in `members`.
pub async fn memberships_from<C: ConnectionTrait>(
    db: &C,
    members: &[PartyId],
) -> Result<Vec<membership::Model>, AuthzError> {
    Ok(membership::Entity::find()
        .filter(membership::Column::MemberId.is_in(members.iter().copied()))
        .order_by_asc(membership::Column::Id)
        .all(db)
        .await?)
}

// ---------- Grants ----------

/// Record a direct grant. Granting an existing triple returns the stored row.
pub async fn grant_privilege<C: ConnectionTrait>(
    db: &C,
    registry: &Registry,
    party: PartyId,
    resource: ResourceId,
    privilege: &Privilege,
) -> Result<grant::Model, AuthzError> {
    registry.ensure_privilege(privilege)?;
    if get_party(db, party).await?.is_none() {
        return Err(AuthzError::PartyNotFound(party));
    }
    if get_resource(db, resource).await?.is_none() {
        return Err(AuthzError::ResourceNotFound(resource));
    }

    if let Some(existing) = grant::Entity::find()
        .filter(grant::Column::PartyId.eq(party))
        .filter(grant::Column::ResourceId.eq(resource))
        .filter(grant::Column::Privilege.eq(privilege.as_str()))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let row = grant::ActiveModel {
        party_id: Set(party),
        resource_id: Set(resource),
        privilege: Set(privilege.as_str().to_string()),
        granted_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };
    row.insert(db).await.map_err(AuthzError::from_write)
}

/// Returns whether a grant was removed.
pub async fn revoke_privilege<C: ConnectionTrait>(
    db: &C,
    party: PartyId,
    resource: ResourceId,
    privilege: &Privilege,
) -> Result<bool, AuthzError> {
    let result = grant::Entity::delete_many()
        .filter(grant::Column::PartyId.eq(party))
        .filter(grant::Column::ResourceId.eq(resource))
        .filter(grant::Column::Privilege.eq(privilege.as_str()))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn grants_for_party<C: ConnectionTrait>(
    db: &C,
    party: PartyId,
) -> Result<Vec<grant::Model>, AuthzError> {
    Ok(grant::Entity::find()
        .filter(grant::Column::PartyId.eq(party))
        .order_by_asc(grant::Column::Id)
        .all(db)
        .await?)
}

/// Resources on which any of `parties` directly holds `privilege`.
pub async fn granted_resources<C: ConnectionTrait>(
    db: &C,
    parties: &BTreeSet<PartyId>,
    privilege: &Privilege,
) -> Result<BTreeSet<ResourceId>, AuthzError> {
    let ids = grant::Entity::find()
        .select_only()
        .column(grant::Column::ResourceId)
        .filter(grant::Column::PartyId.is_in(parties.iter().copied()))
        .filter(grant::Column::Privilege.eq(privilege.as_str()))
        .into_tuple::<ResourceId>()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Whether any of `parties` holds `privilege` directly on any of `resources`.
pub async fn has_any_grant<C: ConnectionTrait>(
    db: &C,
    parties: &BTreeSet<PartyId>,
    resources: &BTreeSet<ResourceId>,
    privilege: &Privilege,
) -> Result<bool, AuthzError> {
    let count = grant::Entity::find()
        .filter(grant::Column::PartyId.is_in(parties.iter().copied()))
        .filter(grant::Column::ResourceId.is_in(resources.iter().copied()))
        .filter(grant::Column::Privilege.eq(privilege.as_str()))
        .count(db)
        .await?;
    Ok(count > 0)
}
