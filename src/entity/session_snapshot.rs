//! Entity model for the `session_snapshot` table.

use sea_orm::entity::prelude::*;

/// One persisted session record.
///
/// | Column     | Type               | Description                              |
/// |------------|--------------------|------------------------------------------|
/// | name       | TEXT (Primary Key) | Record name, `auth-storage` by default   |
/// | version    | INTEGER            | Schema version of `data`                 |
/// | data       | BLOB / BYTEA       | MessagePack-encoded `SessionSnapshot`    |
/// | updated_at | TIMESTAMPTZ        | Time of the last write                   |
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "session_snapshot")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub name: String,

    pub version: i32,

    pub data: Vec<u8>,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
