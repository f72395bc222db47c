use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::group, types::PermissionKey};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Group not found")]
    GroupNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<PermissionKey>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateGroup {
    pub name: String,
    pub permissions: Vec<PermissionKey>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct UpdateGroup {
    pub name: String,
    pub permissions: Vec<PermissionKey>,
}

/// The permission list is stored as a JSON string array. Unknown entries are
/// skipped on read so a downgrade never locks a group out entirely.
fn parse_permissions(value: &serde_json::Value) -> Vec<PermissionKey> {
    let raw: Vec<String> = serde_json::from_value(value.clone()).unwrap_or_default();
    raw.iter()
        .filter_map(|key| PermissionKey::from_str(key).ok())
        .collect()
}

fn serialize_permissions(permissions: &[PermissionKey]) -> serde_json::Value {
    serde_json::Value::Array(
        permissions
            .iter()
            .map(|key| serde_json::Value::String(key.to_string()))
            .collect(),
    )
}

impl Group {
    fn from_model(model: group::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            permissions: parse_permissions(&model.permissions),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = group::Entity::find()
            .order_by_asc(group::Column::Name)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = group::Entity::find()
            .filter(group::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_row_id<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<Self>, DbErr> {
        let record = group::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateGroup,
        group_id: Uuid,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = group::ActiveModel {
            uuid: Set(group_id),
            name: Set(data.name.clone()),
            permissions: Set(serialize_permissions(&data.permissions)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateGroup,
    ) -> Result<Self, GroupError> {
        let record = group::Entity::find()
            .filter(group::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(GroupError::GroupNotFound)?;

        let mut active: group::ActiveModel = record.into();
        active.name = Set(data.name.clone());
        active.permissions = Set(serialize_permissions(&data.permissions));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Member users keep existing; the FK nulls their group assignment.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = group::Entity::delete_many()
            .filter(group::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
