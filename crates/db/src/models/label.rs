use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{label, task_label},
    models::ids,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Label {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub color: String,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateLabel {
    pub name: String,
    pub color: String,
}

impl Label {
    async fn from_model<C: ConnectionTrait>(db: &C, model: label::Model) -> Result<Self, DbErr> {
        let board_id = ids::board_uuid_by_id(db, model.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            board_id,
            name: model.name,
            color: model.color,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_board<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let models = label::Entity::find()
            .filter(label::Column::BoardId.eq(board_row_id))
            .order_by_asc(label::Column::Id)
            .all(db)
            .await?;
        let mut labels = Vec::with_capacity(models.len());
        for model in models {
            labels.push(Self::from_model(db, model).await?);
        }
        Ok(labels)
    }

    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let links = task_label::Entity::find()
            .filter(task_label::Column::TaskId.eq(task_row_id))
            .all(db)
            .await?;
        let mut labels = Vec::with_capacity(links.len());
        for link in links {
            if let Some(model) = label::Entity::find_by_id(link.label_id).one(db).await? {
                labels.push(Self::from_model(db, model).await?);
            }
        }
        Ok(labels)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
        data: &CreateLabel,
        label_id: Uuid,
    ) -> Result<Self, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let now = Utc::now();
        let active = label::ActiveModel {
            uuid: Set(label_id),
            board_id: Set(board_row_id),
            name: Set(data.name.clone()),
            color: Set(data.color.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = label::Entity::delete_many()
            .filter(label::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Connects or disconnects a label on a task; attaching twice is a
    /// no-op.
    pub async fn set_on_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        label_id: Uuid,
        attach: bool,
    ) -> Result<(), DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let label_row_id = ids::label_id_by_uuid(db, label_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Label not found".to_string()))?;

        if attach {
            let existing = task_label::Entity::find()
                .filter(task_label::Column::TaskId.eq(task_row_id))
                .filter(task_label::Column::LabelId.eq(label_row_id))
                .count(db)
                .await?;
            if existing == 0 {
                let link = task_label::ActiveModel {
                    task_id: Set(task_row_id),
                    label_id: Set(label_row_id),
                    ..Default::default()
                };
                link.insert(db).await?;
            }
        } else {
            task_label::Entity::delete_many()
                .filter(task_label::Column::TaskId.eq(task_row_id))
                .filter(task_label::Column::LabelId.eq(label_row_id))
                .exec(db)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        board::{Board, CreateBoard},
        board_column::BoardColumn,
        task::{CreateTask, Task},
        user::{CreateUser, User},
    };
    use crate::test_utils::memory_db;

    #[tokio::test]
    async fn labels_attach_and_detach_on_tasks() {
        let db = memory_db().await;
        let owner = User::create(
            &db,
            &CreateUser {
                username: "owner".to_string(),
                password_hash: "hash".to_string(),
                is_admin: false,
                group_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let board = Board::create(
            &db,
            &CreateBoard {
                title: "Board".to_string(),
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();
        let columns = BoardColumn::find_by_board(&db, board.id).await.unwrap();
        let task = Task::create(
            &db,
            &CreateTask {
                column_id: columns[0].id,
                title: "task".to_string(),
                position: 0,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let label = Label::create(
            &db,
            board.id,
            &CreateLabel {
                name: "urgent".to_string(),
                color: "#ff0000".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        Label::set_on_task(&db, task.id, label.id, true).await.unwrap();
        Label::set_on_task(&db, task.id, label.id, true).await.unwrap();
        let attached = Label::find_by_task(&db, task.id).await.unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].name, "urgent");

        Label::set_on_task(&db, task.id, label.id, false).await.unwrap();
        assert!(Label::find_by_task(&db, task.id).await.unwrap().is_empty());
    }
}
