use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Schema,
    Set, TransactionTrait,
};
use time::OffsetDateTime;
use tracing::debug;

use super::{decode_snapshot, encode_snapshot, SessionStorage, SNAPSHOT_VERSION};
use crate::config::DEFAULT_STORAGE_KEY;
use crate::entity::session_snapshot::{ActiveModel as SnapshotActiveModel, Entity as SnapshotEntity};
use crate::error::Result;
use crate::model::SessionSnapshot;

/// Session storage backed by a Sea-ORM connection.
///
/// SQLite is the natural fit for device-local persistence; PostgreSQL works
/// the same way behind the `postgres` feature. Each store reads and writes a
/// single named row of the `session_snapshot` table.
///
/// ```no_run
/// use sea_orm::Database;
/// use admin_session::SeaOrmStorage;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Database::connect("sqlite://admin-session.db?mode=rwc").await?;
/// let storage = SeaOrmStorage::new(conn).with_name("staging-auth");
/// storage.create_table().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Error Mapping
///
/// - Database errors → `SessionError::Storage`
/// - MessagePack serialization errors → `SessionError::Encode`
/// - MessagePack deserialization errors → `SessionError::Decode`
#[derive(Debug, Clone)]
pub struct SeaOrmStorage {
    conn: DatabaseConnection,
    name: String,
}

impl SeaOrmStorage {
    /// Creates a store for the default record name `auth-storage`.
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            name: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Sets the name of the row this store reads and writes.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Creates the `session_snapshot` table if it does not exist yet.
    pub async fn create_table(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);
        let mut table = schema.create_table_from_entity(SnapshotEntity);
        table.if_not_exists();

        self.conn.execute(backend.build(&table)).await?;
        Ok(())
    }

    async fn write(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let data = encode_snapshot(snapshot)?;
        let updated_at = convert_time_to_datetime(OffsetDateTime::now_utc());

        let txn = self.conn.begin().await?;

        match SnapshotEntity::find_by_id(self.name.clone()).one(&txn).await? {
            Some(existing) => {
                let mut active_model = existing.into_active_model();
                active_model.version = Set(SNAPSHOT_VERSION);
                active_model.data = Set(data);
                active_model.updated_at = Set(updated_at);
                active_model.update(&txn).await?;
            }
            None => {
                SnapshotActiveModel {
                    name: Set(self.name.clone()),
                    version: Set(SNAPSHOT_VERSION),
                    data: Set(data),
                    updated_at: Set(updated_at),
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for SeaOrmStorage {
    async fn load(&self) -> Result<Option<SessionSnapshot>> {
        let Some(model) = SnapshotEntity::find_by_id(self.name.clone())
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let (snapshot, migrated) = decode_snapshot(model.version, &model.data)?;
        if migrated {
            self.write(&snapshot).await?;
        }
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        debug!(name = %self.name, "saving session snapshot");
        self.write(snapshot).await
    }

    async fn clear(&self) -> Result<()> {
        SnapshotEntity::delete_by_id(self.name.clone())
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}

// time::OffsetDateTime -> chrono-based DateTimeWithTimeZone used by the entity
fn convert_time_to_datetime(time: OffsetDateTime) -> DateTimeWithTimeZone {
    use chrono::{DateTime, Utc};

    DateTime::from_timestamp(time.unix_timestamp(), time.nanosecond())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .into()
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use sea_orm::{Database, EntityTrait};

    use super::*;
    use crate::model::Admin;

    async fn storage() -> SeaOrmStorage {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        let storage = SeaOrmStorage::new(conn);
        storage.create_table().await.unwrap();
        storage
    }

    fn snapshot(token: &str) -> SessionSnapshot {
        SessionSnapshot {
            admin: Some(Admin {
                id: "1".into(),
                email: "admin@example.com".into(),
                name: "Admin".into(),
                role: "admin".into(),
                active: true,
                created_at: "2024-01-01".into(),
            }),
            access_token: Some(token.into()),
            refresh_token: Some("RT1".into()),
            is_authenticated: true,
            last_activity_timestamp: Some(OffsetDateTime::now_utc()),
        }
    }

    #[tokio::test]
    async fn save_overwrites_a_single_row() {
        let storage = storage().await;

        storage.save(&snapshot("AT1")).await.unwrap();
        storage.save(&snapshot("AT2")).await.unwrap();

        let rows = SnapshotEntity::find().all(&storage.conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "auth-storage");
        assert_eq!(rows[0].version, SNAPSHOT_VERSION);

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("AT2"));
    }

    #[tokio::test]
    async fn named_records_are_independent() {
        let storage = storage().await;
        let other = storage.clone().with_name("other-tab");

        storage.save(&snapshot("AT1")).await.unwrap();
        assert!(other.load().await.unwrap().is_none());

        storage.clear().await.unwrap();
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outdated_version_is_rewritten_on_load() {
        let storage = storage().await;
        storage.save(&snapshot("AT1")).await.unwrap();

        let row = SnapshotEntity::find_by_id("auth-storage".to_string())
            .one(&storage.conn)
            .await
            .unwrap()
            .unwrap();
        let mut stale = row.into_active_model();
        stale.version = Set(0);
        stale.update(&storage.conn).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("AT1"));

        let row = SnapshotEntity::find_by_id("auth-storage".to_string())
            .one(&storage.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.version, SNAPSHOT_VERSION);
    }

    #[cfg(feature = "migration")]
    #[tokio::test]
    async fn migrator_creates_the_table() {
        use crate::migration::{Migrator, MigratorTrait};

        let conn = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&conn, None).await.unwrap();

        let storage = SeaOrmStorage::new(conn);
        storage.save(&snapshot("AT1")).await.unwrap();
        assert!(storage.load().await.unwrap().is_some());
    }
}
