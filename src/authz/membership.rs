use std::collections::{BTreeMap, BTreeSet};

use sea_orm::ConnectionTrait;

use crate::authz::types::PartyId;
use crate::authz::walk::AncestorWalk;
use crate::errors::AuthzError;
use crate::storage;

/// Resolve `party` plus every group it effectively acts as.
///
/// With `require_inherit` set, only membership edges flagged
/// `inherit_privileges` are followed; otherwise every edge is.
///
/// The visited set bounds the search, so cycles do not fail resolution. A
/// cycle among the followed edges is logged with its path.
pub async fn get_memberships<C: ConnectionTrait>(
    db: &C,
    party: PartyId,
    require_inherit: bool,
) -> Result<BTreeSet<PartyId>, AuthzError> {
    if storage::get_party(db, party).await?.is_none() {
        return Err(AuthzError::PartyNotFound(party));
    }

    let mut resolved = BTreeSet::from([party]);
    let mut followed: BTreeMap<PartyId, Vec<PartyId>> = BTreeMap::new();
    let mut frontier = vec![party];

    while !frontier.is_empty() {
        let edges = storage::memberships_from(db, &frontier).await?;
        let mut next = Vec::new();
        for edge in edges {
            if require_inherit && !edge.inherit_privileges {
                continue;
            }
            followed.entry(edge.member_id).or_default().push(edge.group_id);
            if resolved.insert(edge.group_id) {
                next.push(edge.group_id);
            }
        }
        frontier = next;
    }

    if let Some(cycle) = find_cycle(&followed, party) {
        tracing::warn!(party, %cycle, "Membership cycle");
    }

    tracing::debug!(
        party,
        require_inherit,
        groups = resolved.len() - 1,
        "Resolved memberships"
    );
    Ok(resolved)
}

/// Path of the first cycle reachable from `root`, e.g. `"2 -> 3 -> 2"`.
fn find_cycle(edges: &BTreeMap<PartyId, Vec<PartyId>>, root: PartyId) -> Option<String> {
    let mut walk = AncestorWalk::new(root);
    while let Some(id) = walk.next() {
        let groups = edges.get(&id).map(Vec::as_slice).unwrap_or_default();
        if let Err(AuthzError::CycleDetected { path }) = walk.expand(id, groups) {
            return Some(path);
        }
    }
    None
}
