use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{board, board_member, user},
    models::ids,
};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("User not found")]
    UserNotFound,
    #[error("Username already taken")]
    UsernameTaken,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub group_id: Option<Uuid>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

/// Minimal projection for pickers and activity context.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub group_id: Option<Uuid>,
}

impl User {
    fn from_model(model: user::Model, group_uuid: Option<Uuid>) -> Self {
        Self {
            id: model.uuid,
            username: model.username,
            is_admin: model.is_admin,
            group_id: group_uuid,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    async fn resolve<C: ConnectionTrait>(db: &C, model: user::Model) -> Result<Self, DbErr> {
        let group_uuid = match model.group_id {
            Some(id) => ids::group_uuid_by_id(db, id).await?,
            None => None,
        };
        Ok(Self::from_model(model, group_uuid))
    }

    pub async fn count<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        user::Entity::find().count(db).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::resolve(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Exact-match lookup first, then the original's case-insensitive
    /// fallback for small instances.
    pub async fn find_model_by_username<C: ConnectionTrait>(
        db: &C,
        username: &str,
    ) -> Result<Option<user::Model>, DbErr> {
        let exact = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?;
        if exact.is_some() {
            return Ok(exact);
        }

        let lowered = username.to_lowercase();
        let all = user::Entity::find().all(db).await?;
        Ok(all
            .into_iter()
            .find(|candidate| candidate.username.to_lowercase() == lowered))
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;
        let mut users = Vec::with_capacity(models.len());
        for model in models {
            users.push(Self::resolve(db, model).await?);
        }
        Ok(users)
    }

    pub async fn find_all_refs<C: ConnectionTrait>(db: &C) -> Result<Vec<UserRef>, DbErr> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| UserRef {
                id: model.uuid,
                username: model.username,
            })
            .collect())
    }

    /// Users that may appear in a board's assignee picker: admins, the
    /// owner, and members.
    pub async fn find_eligible_for_board<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<UserRef>, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let board = board::Entity::find_by_id(board_row_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let member_ids: Vec<i64> = board_member::Entity::find()
            .filter(board_member::Column::BoardId.eq(board_row_id))
            .all(db)
            .await?
            .into_iter()
            .map(|row| row.user_id)
            .collect();

        let models = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .filter(|model| {
                model.is_admin || model.id == board.owner_id || member_ids.contains(&model.id)
            })
            .map(|model| UserRef {
                id: model.uuid,
                username: model.username,
            })
            .collect())
    }

    /// Enforces the exclusive role representation: admins never carry a
    /// group, group members are never admins.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(data.username.clone()))
            .count(db)
            .await?;
        if existing > 0 {
            return Err(UserError::UsernameTaken);
        }

        let group_row_id = if data.is_admin {
            None
        } else {
            match data.group_id {
                Some(id) => Some(
                    ids::group_id_by_uuid(db, id)
                        .await?
                        .ok_or(DbErr::RecordNotFound("Group not found".to_string()))?,
                ),
                None => None,
            }
        };

        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(user_id),
            username: Set(data.username.clone()),
            password_hash: Set(data.password_hash.clone()),
            is_admin: Set(data.is_admin),
            group_id: Set(group_row_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::resolve(db, model).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = user::Entity::delete_many()
            .filter(user::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::group::{CreateGroup, Group};
    use crate::types::PermissionKey;

    use crate::test_utils::memory_db;

    #[tokio::test]
    async fn admin_creation_drops_group_assignment() {
        let db = memory_db().await;
        let group = Group::create(
            &db,
            &CreateGroup {
                name: "Crew".to_string(),
                permissions: vec![PermissionKey::CreateTask],
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let admin = User::create(
            &db,
            &CreateUser {
                username: "root".to_string(),
                password_hash: "hash".to_string(),
                is_admin: true,
                group_id: Some(group.id),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        assert!(admin.is_admin);
        assert!(admin.group_id.is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let db = memory_db().await;
        let data = CreateUser {
            username: "sam".to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
            group_id: None,
        };
        User::create(&db, &data, Uuid::new_v4()).await.unwrap();

        let err = User::create(&db, &data, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, UserError::UsernameTaken));
    }

    #[tokio::test]
    async fn username_lookup_falls_back_to_case_insensitive() {
        let db = memory_db().await;
        User::create(
            &db,
            &CreateUser {
                username: "Avery".to_string(),
                password_hash: "hash".to_string(),
                is_admin: false,
                group_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let found = User::find_model_by_username(&db, "avery").await.unwrap();
        assert_eq!(found.map(|m| m.username), Some("Avery".to_string()));
    }
}
