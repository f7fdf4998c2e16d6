use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{DatabaseTransaction, DbErr};

use crate::authz::types::{
    ConcreteResource, PermissionNode, Privilege, ResourceId, ResourceRef, ABSTRACT_KIND,
};
use crate::errors::AuthzError;
use crate::settings;
use crate::storage;

/// Loads the concrete record behind an abstract resource id.
#[async_trait]
trait KindLoader: Send + Sync {
    async fn load(
        &self,
        txn: &DatabaseTransaction,
        id: ResourceId,
    ) -> Result<Option<Box<dyn PermissionNode>>, DbErr>;
}

struct Loader<T>(PhantomData<fn() -> T>);

#[async_trait]
impl<T: ConcreteResource> KindLoader for Loader<T> {
    async fn load(
        &self,
        txn: &DatabaseTransaction,
        id: ResourceId,
    ) -> Result<Option<Box<dyn PermissionNode>>, DbErr> {
        let mut found = T::load_many(txn, &[id]).await?;
        Ok(found.pop().map(|r| Box::new(r) as Box<dyn PermissionNode>))
    }
}

/// Registration table of resource kinds and privileges.
/// Built once at startup and read-only afterwards.
pub struct Registry {
    kinds: HashMap<&'static str, Box<dyn KindLoader>>,
    privileges: BTreeSet<Privilege>,
    reconcile_on_save: bool,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.kinds.keys().collect();
        kinds.sort();
        f.debug_struct("Registry")
            .field("kinds", &kinds)
            .field("privileges", &self.privileges)
            .field("reconcile_on_save", &self.reconcile_on_save)
            .finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Fail unless `kind` names a registered concrete resource type.
    pub fn ensure_concrete(&self, kind: &str) -> Result<(), AuthzError> {
        if kind == ABSTRACT_KIND {
            return Err(AuthzError::Configuration(format!(
                "`{ABSTRACT_KIND}` is the abstract resource type; use a concrete resource type"
            )));
        }
        if !self.is_registered(kind) {
            return Err(AuthzError::Configuration(format!(
                "resource kind `{kind}` is not registered"
            )));
        }
        Ok(())
    }

    pub fn ensure_privilege(&self, privilege: &Privilege) -> Result<(), AuthzError> {
        if self.privileges.contains(privilege) {
            Ok(())
        } else {
            Err(AuthzError::Configuration(format!(
                "unknown privilege `{privilege}`"
            )))
        }
    }

    pub fn privileges(&self) -> impl Iterator<Item = &Privilege> {
        self.privileges.iter()
    }

    pub fn reconcile_on_save(&self) -> bool {
        self.reconcile_on_save
    }

    /// Polymorphic retrieval: read the kind tag, then dispatch to that kind's loader.
    pub(crate) async fn fetch(
        &self,
        txn: &DatabaseTransaction,
        id: ResourceId,
    ) -> Result<(ResourceRef, Box<dyn PermissionNode>), AuthzError> {
        let row = storage::get_resource(txn, id)
            .await?
            .ok_or(AuthzError::ResourceNotFound(id))?;
        let loader = self.kinds.get(row.kind.as_str()).ok_or_else(|| {
            AuthzError::Configuration(format!(
                "resource {id} has unregistered kind `{}`",
                row.kind
            ))
        })?;
        let node = loader
            .load(txn, id)
            .await?
            .ok_or(AuthzError::ResourceNotFound(id))?;
        Ok((row.into(), node))
    }
}

pub struct RegistryBuilder {
    kinds: HashMap<&'static str, Box<dyn KindLoader>>,
    duplicates: Vec<&'static str>,
    privileges: BTreeSet<Privilege>,
    reconcile_on_save: bool,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::from_settings(&settings::Authz::default())
    }
}

impl RegistryBuilder {
    pub fn from_settings(cfg: &settings::Authz) -> Self {
        Self {
            kinds: HashMap::new(),
            duplicates: Vec::new(),
            privileges: cfg.privileges.iter().map(|p| Privilege::new(p.as_str())).collect(),
            reconcile_on_save: cfg.reconcile_on_save,
        }
    }

    pub fn register<T: ConcreteResource>(mut self) -> Self {
        if self.kinds.contains_key(T::KIND) {
            self.duplicates.push(T::KIND);
        } else {
            self.kinds.insert(T::KIND, Box::new(Loader::<T>(PhantomData)));
        }
        self
    }

    /// Replace the privilege set.
    pub fn privileges<I, P>(mut self, privileges: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Privilege>,
    {
        self.privileges = privileges.into_iter().map(Into::into).collect();
        self
    }

    pub fn reconcile_on_save(mut self, enabled: bool) -> Self {
        self.reconcile_on_save = enabled;
        self
    }

    pub fn build(self) -> Result<Registry, AuthzError> {
        if let Some(kind) = self.duplicates.first() {
            return Err(AuthzError::Configuration(format!(
                "resource kind `{kind}` registered more than once"
            )));
        }
        if self.kinds.contains_key(ABSTRACT_KIND) {
            return Err(AuthzError::Configuration(format!(
                "`{ABSTRACT_KIND}` is reserved for the abstract resource type"
            )));
        }
        if self.privileges.is_empty() {
            return Err(AuthzError::Configuration(
                "at least one privilege must be configured".into(),
            ));
        }

        tracing::info!(
            kinds = self.kinds.len(),
            privileges = self.privileges.len(),
            reconcile_on_save = self.reconcile_on_save,
            "Built resource registry"
        );

        Ok(Registry {
            kinds: self.kinds,
            privileges: self.privileges,
            reconcile_on_save: self.reconcile_on_save,
        })
    }
}
