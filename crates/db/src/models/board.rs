use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{board, board_column, board_member, task, user},
    models::ids,
};

/// Columns every new board starts with, left to right.
const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Board not found")]
    BoardNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateBoard {
    pub title: String,
}

/// Sidebar projection: board plus per-column task counts.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardSummary {
    #[serde(flatten)]
    #[ts(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ColumnCount {
    pub id: Uuid,
    pub title: String,
    pub task_count: u64,
}

impl Board {
    async fn from_model<C: ConnectionTrait>(db: &C, model: board::Model) -> Result<Self, DbErr> {
        let owner_id = ids::user_uuid_by_id(db, model.owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            title: model.title,
            owner_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = board::Entity::find()
            .filter(board::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Admins see every board; everyone else sees boards they own or were
    /// added to.
    pub async fn find_visible_to<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<Vec<BoardSummary>, DbErr> {
        let models = if is_admin {
            board::Entity::find()
                .order_by_asc(board::Column::CreatedAt)
                .all(db)
                .await?
        } else {
            let user_row_id = ids::user_id_by_uuid(db, user_id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
            let member_board_ids: Vec<i64> = board_member::Entity::find()
                .filter(board_member::Column::UserId.eq(user_row_id))
                .all(db)
                .await?
                .into_iter()
                .map(|row| row.board_id)
                .collect();

            board::Entity::find()
                .filter(
                    Condition::any()
                        .add(board::Column::OwnerId.eq(user_row_id))
                        .add(board::Column::Id.is_in(member_board_ids)),
                )
                .order_by_asc(board::Column::CreatedAt)
                .all(db)
                .await?
        };

        let mut summaries = Vec::with_capacity(models.len());
        for model in models {
            let board_row_id = model.id;
            let board = Self::from_model(db, model).await?;
            let columns = board_column::Entity::find()
                .filter(board_column::Column::BoardId.eq(board_row_id))
                .order_by_asc(board_column::Column::Position)
                .order_by_asc(board_column::Column::Id)
                .all(db)
                .await?;
            let mut counts = Vec::with_capacity(columns.len());
            for column in columns {
                let task_count = task::Entity::find()
                    .filter(task::Column::ColumnId.eq(column.id))
                    .count(db)
                    .await?;
                counts.push(ColumnCount {
                    id: column.uuid,
                    title: column.title,
                    task_count,
                });
            }
            summaries.push(BoardSummary {
                board,
                columns: counts,
            });
        }
        Ok(summaries)
    }

    /// True when the user owns the board, is a member, or is an admin.
    pub async fn is_visible_to<C: ConnectionTrait>(
        db: &C,
        board_row_id: i64,
        user_row_id: i64,
        is_admin: bool,
    ) -> Result<bool, DbErr> {
        if is_admin {
            return Ok(true);
        }
        let board = board::Entity::find_by_id(board_row_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        if board.owner_id == user_row_id {
            return Ok(true);
        }
        let membership = board_member::Entity::find()
            .filter(board_member::Column::BoardId.eq(board_row_id))
            .filter(board_member::Column::UserId.eq(user_row_id))
            .count(db)
            .await?;
        Ok(membership > 0)
    }

    /// Creates the board with its default column set.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateBoard,
        board_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Self, DbErr> {
        let owner_row_id = ids::user_id_by_uuid(db, owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let now = Utc::now();
        let active = board::ActiveModel {
            uuid: Set(board_id),
            title: Set(data.title.clone()),
            owner_id: Set(owner_row_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        for (position, title) in DEFAULT_COLUMNS.iter().enumerate() {
            let column = board_column::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                board_id: Set(model.id),
                title: Set(title.to_string()),
                position: Set(position as i32),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };
            column.insert(db).await?;
        }

        tracing::debug!(board = %board_id, "Created board with default columns");
        Self::from_model(db, model).await
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = board::Entity::delete_many()
            .filter(board::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Replaces the member list wholesale, the way the admin board manager
    /// submits it.
    pub async fn set_members<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
        member_ids: &[Uuid],
    ) -> Result<(), DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        board_member::Entity::delete_many()
            .filter(board_member::Column::BoardId.eq(board_row_id))
            .exec(db)
            .await?;

        for member_id in member_ids {
            let user_row_id = ids::user_id_by_uuid(db, *member_id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
            let row = board_member::ActiveModel {
                board_id: Set(board_row_id),
                user_id: Set(user_row_id),
                ..Default::default()
            };
            row.insert(db).await?;
        }
        Ok(())
    }

    pub async fn member_ids<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<Uuid>, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let rows = board_member::Entity::find()
            .filter(board_member::Column::BoardId.eq(board_row_id))
            .all(db)
            .await?;
        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(model) = user::Entity::find_by_id(row.user_id).one(db).await? {
                members.push(model.uuid);
            }
        }
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{CreateUser, User};

    use crate::test_utils::memory_db;

    async fn make_user(db: &sea_orm::DatabaseConnection, name: &str, is_admin: bool) -> User {
        User::create(
            db,
            &CreateUser {
                username: name.to_string(),
                password_hash: "hash".to_string(),
                is_admin,
                group_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn new_boards_get_default_columns_in_order() {
        let db = memory_db().await;
        let owner = make_user(&db, "owner", false).await;
        let board = Board::create(
            &db,
            &CreateBoard {
                title: "Launch".to_string(),
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();

        let summaries = Board::find_visible_to(&db, owner.id, false).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].board.id, board.id);
        let titles: Vec<&str> = summaries[0]
            .columns
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);
    }

    #[tokio::test]
    async fn visibility_covers_owner_member_and_admin() {
        let db = memory_db().await;
        let owner = make_user(&db, "owner", false).await;
        let member = make_user(&db, "member", false).await;
        let outsider = make_user(&db, "outsider", false).await;
        let admin = make_user(&db, "admin", true).await;

        let board = Board::create(
            &db,
            &CreateBoard {
                title: "Shared".to_string(),
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();
        Board::set_members(&db, board.id, &[member.id]).await.unwrap();

        assert_eq!(
            Board::find_visible_to(&db, owner.id, false).await.unwrap().len(),
            1
        );
        assert_eq!(
            Board::find_visible_to(&db, member.id, false)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            Board::find_visible_to(&db, outsider.id, false)
                .await
                .unwrap()
                .len(),
            0
        );
        assert_eq!(
            Board::find_visible_to(&db, admin.id, true).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn deleting_a_board_removes_it_from_member_listings() {
        let db = memory_db().await;
        let owner = make_user(&db, "owner", false).await;
        let member = make_user(&db, "member", false).await;

        let board = Board::create(
            &db,
            &CreateBoard {
                title: "Doomed".to_string(),
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();
        Board::set_members(&db, board.id, &[member.id]).await.unwrap();

        assert_eq!(Board::delete(&db, board.id).await.unwrap(), 1);
        assert!(Board::find_visible_to(&db, owner.id, false)
            .await
            .unwrap()
            .is_empty());
        assert!(Board::find_visible_to(&db, member.id, false)
            .await
            .unwrap()
            .is_empty());
    }
}
