use ancestry::authz::{Registry, RegistryBuilder};
use ancestry::settings;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema};
use tempfile::NamedTempFile;

use super::fixtures::{self, folder, w, x, y, z};

/// Test database with automatic cleanup
pub struct TestDb {
    connection: DatabaseConnection,
    registry: Registry,
    _temp_file: NamedTempFile,
}

impl TestDb {
    /// Create a new test database with migrations applied and every fixture
    /// kind registered
    pub async fn new() -> Self {
        Self::with_registry(fixtures::registry_builder()).await
    }

    pub async fn with_registry(builder: RegistryBuilder) -> Self {
        // Create temporary SQLite database file
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_str().expect("Invalid temp file path");
        let cfg = settings::Database {
            url: format!("sqlite://{}?mode=rwc", db_path),
        };

        // Connect and run migrations
        let connection = ancestry::storage::init(&cfg)
            .await
            .expect("Failed to initialize test database");

        create_fixture_table(&connection, w::Entity).await;
        create_fixture_table(&connection, x::Entity).await;
        create_fixture_table(&connection, y::Entity).await;
        create_fixture_table(&connection, z::Entity).await;
        create_fixture_table(&connection, folder::Entity).await;

        let registry = builder.build().expect("Failed to build registry");

        Self {
            connection,
            registry,
            _temp_file: temp_file,
        }
    }

    /// Get database connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

async fn create_fixture_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) {
    let backend = db.get_database_backend();
    let stmt = Schema::new(backend).create_table_from_entity(entity);
    db.execute(backend.build(&stmt))
        .await
        .expect("Failed to create fixture table");
}
