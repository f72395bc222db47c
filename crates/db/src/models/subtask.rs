use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::subtask, models::ids};

#[derive(Debug, Error)]
pub enum SubtaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Subtask not found")]
    SubtaskNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub is_completed: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

impl Subtask {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: subtask::Model,
    ) -> Result<Self, DbErr> {
        let task_id = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            task_id,
            title: model.title,
            is_completed: model.is_completed,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = subtask::Entity::find()
            .filter(subtask::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Checklist order is creation order.
    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let models = subtask::Entity::find()
            .filter(subtask::Column::TaskId.eq(task_row_id))
            .order_by_asc(subtask::Column::Id)
            .all(db)
            .await?;
        let mut subtasks = Vec::with_capacity(models.len());
        for model in models {
            subtasks.push(Self::from_model(db, model).await?);
        }
        Ok(subtasks)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        title: String,
        subtask_id: Uuid,
    ) -> Result<Self, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let now = Utc::now();
        let active = subtask::ActiveModel {
            uuid: Set(subtask_id),
            task_id: Set(task_row_id),
            title: Set(title),
            is_completed: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn set_completed<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        is_completed: bool,
    ) -> Result<(), SubtaskError> {
        let record = subtask::Entity::find()
            .filter(subtask::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(SubtaskError::SubtaskNotFound)?;
        let mut active: subtask::ActiveModel = record.into();
        active.is_completed = Set(is_completed);
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = subtask::Entity::delete_many()
            .filter(subtask::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
