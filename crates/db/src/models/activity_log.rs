use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{activity_log, board, board_column, task, user},
    models::{ids, user::UserRef},
};

/// One feed entry with enough context to render "who did what, where".
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub action: String,
    #[ts(type = "Date")]
    pub timestamp: DateTime<Utc>,
    pub user: Option<UserRef>,
    pub task: Option<ActivityTaskRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActivityTaskRef {
    pub id: Uuid,
    pub title: String,
    pub board_id: Option<Uuid>,
    pub board_title: Option<String>,
}

impl ActivityEntry {
    /// Appends an entry. Failures are the caller's to log and swallow; the
    /// feed is best-effort and never blocks the mutation it annotates.
    pub async fn record<C: ConnectionTrait>(
        db: &C,
        action: &str,
        task_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<(), DbErr> {
        let task_row_id = match task_id {
            Some(id) => ids::task_id_by_uuid(db, id).await?,
            None => None,
        };
        let user_row_id = match user_id {
            Some(id) => ids::user_id_by_uuid(db, id).await?,
            None => None,
        };

        let active = activity_log::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            action: Set(action.to_string()),
            task_id: Set(task_row_id),
            user_id: Set(user_row_id),
            timestamp: Set(Utc::now().into()),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(())
    }

    /// Newest first, with task/board/user context resolved.
    pub async fn recent<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<Self>, DbErr> {
        let models = activity_log::Entity::find()
            .order_by_desc(activity_log::Column::Timestamp)
            .order_by_desc(activity_log::Column::Id)
            .limit(limit)
            .all(db)
            .await?;
        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            entries.push(Self::resolve(db, model).await?);
        }
        Ok(entries)
    }

    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let models = activity_log::Entity::find()
            .filter(activity_log::Column::TaskId.eq(task_row_id))
            .order_by_desc(activity_log::Column::Timestamp)
            .order_by_desc(activity_log::Column::Id)
            .all(db)
            .await?;
        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            entries.push(Self::resolve(db, model).await?);
        }
        Ok(entries)
    }

    async fn resolve<C: ConnectionTrait>(
        db: &C,
        model: activity_log::Model,
    ) -> Result<Self, DbErr> {
        let user_ref = match model.user_id {
            Some(id) => user::Entity::find_by_id(id).one(db).await?.map(|u| UserRef {
                id: u.uuid,
                username: u.username,
            }),
            None => None,
        };

        let task_ref = match model.task_id {
            Some(id) => match task::Entity::find_by_id(id).one(db).await? {
                Some(task_model) => {
                    let board_context = match board_column::Entity::find_by_id(task_model.column_id)
                        .one(db)
                        .await?
                    {
                        Some(column) => board::Entity::find_by_id(column.board_id)
                            .one(db)
                            .await?
                            .map(|b| (b.uuid, b.title)),
                        None => None,
                    };
                    Some(ActivityTaskRef {
                        id: task_model.uuid,
                        title: task_model.title,
                        board_id: board_context.as_ref().map(|(id, _)| *id),
                        board_title: board_context.map(|(_, title)| title),
                    })
                }
                None => None,
            },
            None => None,
        };

        Ok(Self {
            id: model.uuid,
            action: model.action,
            timestamp: model.timestamp.into(),
            user: user_ref,
            task: task_ref,
        })
    }
}
