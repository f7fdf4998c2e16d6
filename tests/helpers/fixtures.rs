//! Concrete resource types used by the integration tests.
//!
//! `W <- X <- Y <- Z` each point at a single typed parent. `Folder` may point at
//! up to two parents of any kind, which is how cycles and multi-path hierarchies
//! are built.

use ancestry::authz::{ConcreteResource, PermissionNode, RegistryBuilder, ResourceId, ResourceKind};
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};

pub mod w {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "fixture_w")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub resource_id: i32,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod x {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "fixture_x")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub resource_id: i32,
        pub name: String,
        pub w_id: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod y {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "fixture_y")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub resource_id: i32,
        pub name: String,
        pub x_id: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod z {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "fixture_z")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub resource_id: i32,
        pub name: String,
        pub y_id: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod folder {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "fixture_folders")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub resource_id: i32,
        pub name: String,
        pub parent_id: Option<i32>,
        pub secondary_parent_id: Option<i32>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Registry builder with every fixture kind registered.
pub fn registry_builder() -> RegistryBuilder {
    RegistryBuilder::default()
        .register::<w::Model>()
        .register::<x::Model>()
        .register::<y::Model>()
        .register::<z::Model>()
        .register::<folder::Model>()
}

// ---------- W ----------

impl PermissionNode for w::Model {
    fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    fn permission_parents(&self) -> Vec<ResourceId> {
        vec![]
    }
}

#[async_trait]
impl ResourceKind for w::Model {
    const KIND: &'static str = "w";

    async fn load_many<C>(db: &C, ids: &[ResourceId]) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        w::Entity::find()
            .filter(w::Column::ResourceId.is_in(ids.iter().copied()))
            .all(db)
            .await
    }
}

#[async_trait]
impl ConcreteResource for w::Model {
    async fn store<C>(&self, db: &C) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let row = w::ActiveModel {
            resource_id: Set(self.resource_id),
            name: Set(self.name.clone()),
        };
        w::Entity::insert(row)
            .on_conflict(
                OnConflict::column(w::Column::ResourceId)
                    .update_column(w::Column::Name)
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }
}

// ---------- X ----------

impl PermissionNode for x::Model {
    fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    fn permission_parents(&self) -> Vec<ResourceId> {
        vec![self.w_id]
    }
}

#[async_trait]
impl ResourceKind for x::Model {
    const KIND: &'static str = "x";

    async fn load_many<C>(db: &C, ids: &[ResourceId]) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        x::Entity::find()
            .filter(x::Column::ResourceId.is_in(ids.iter().copied()))
            .all(db)
            .await
    }
}

#[async_trait]
impl ConcreteResource for x::Model {
    async fn store<C>(&self, db: &C) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let row = x::ActiveModel {
            resource_id: Set(self.resource_id),
            name: Set(self.name.clone()),
            w_id: Set(self.w_id),
        };
        x::Entity::insert(row)
            .on_conflict(
                OnConflict::column(x::Column::ResourceId)
                    .update_columns([x::Column::Name, x::Column::WId])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }
}

// ---------- Y ----------

impl PermissionNode for y::Model {
    fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    fn permission_parents(&self) -> Vec<ResourceId> {
        vec![self.x_id]
    }
}

#[async_trait]
impl ResourceKind for y::Model {
    const KIND: &'static str = "y";

    async fn load_many<C>(db: &C, ids: &[ResourceId]) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        y::Entity::find()
            .filter(y::Column::ResourceId.is_in(ids.iter().copied()))
            .all(db)
            .await
    }
}

#[async_trait]
impl ConcreteResource for y::Model {
    async fn store<C>(&self, db: &C) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let row = y::ActiveModel {
            resource_id: Set(self.resource_id),
            name: Set(self.name.clone()),
            x_id: Set(self.x_id),
        };
        y::Entity::insert(row)
            .on_conflict(
                OnConflict::column(y::Column::ResourceId)
                    .update_columns([y::Column::Name, y::Column::XId])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }
}

// ---------- Z ----------

impl PermissionNode for z::Model {
    fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    fn permission_parents(&self) -> Vec<ResourceId> {
        vec![self.y_id]
    }
}

#[async_trait]
impl ResourceKind for z::Model {
    const KIND: &'static str = "z";

    async fn load_many<C>(db: &C, ids: &[ResourceId]) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        z::Entity::find()
            .filter(z::Column::ResourceId.is_in(ids.iter().copied()))
            .all(db)
            .await
    }
}

#[async_trait]
impl ConcreteResource for z::Model {
    async fn store<C>(&self, db: &C) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let row = z::ActiveModel {
            resource_id: Set(self.resource_id),
            name: Set(self.name.clone()),
            y_id: Set(self.y_id),
        };
        z::Entity::insert(row)
            .on_conflict(
                OnConflict::column(z::Column::ResourceId)
                    .update_columns([z::Column::Name, z::Column::YId])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }
}

// ---------- Folder ----------

impl PermissionNode for folder::Model {
    fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    fn permission_parents(&self) -> Vec<ResourceId> {
        self.parent_id
            .into_iter()
            .chain(self.secondary_parent_id)
            .collect()
    }
}

#[async_trait]
impl ResourceKind for folder::Model {
    const KIND: &'static str = "folder";

    async fn load_many<C>(db: &C, ids: &[ResourceId]) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        folder::Entity::find()
            .filter(folder::Column::ResourceId.is_in(ids.iter().copied()))
            .all(db)
            .await
    }
}

#[async_trait]
impl ConcreteResource for folder::Model {
    async fn store<C>(&self, db: &C) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let row = folder::ActiveModel {
            resource_id: Set(self.resource_id),
            name: Set(self.name.clone()),
            parent_id: Set(self.parent_id),
            secondary_parent_id: Set(self.secondary_parent_id),
        };
        folder::Entity::insert(row)
            .on_conflict(
                OnConflict::column(folder::Column::ResourceId)
                    .update_columns([
                        folder::Column::Name,
                        folder::Column::ParentId,
                        folder::Column::SecondaryParentId,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }
}
