use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::board_column,
    models::ids,
};

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Column not found")]
    ColumnNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardColumn {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub position: i32,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

impl BoardColumn {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: board_column::Model,
    ) -> Result<Self, DbErr> {
        let board_id = ids::board_uuid_by_id(db, model.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            board_id,
            title: model.title,
            position: model.position,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = board_column::Entity::find()
            .filter(board_column::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Columns of a board in display order; row id breaks position ties so
    /// concurrent appenders stay stable.
    pub async fn find_by_board<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let models = board_column::Entity::find()
            .filter(board_column::Column::BoardId.eq(board_row_id))
            .order_by_asc(board_column::Column::Position)
            .order_by_asc(board_column::Column::Id)
            .all(db)
            .await?;
        let mut columns = Vec::with_capacity(models.len());
        for model in models {
            columns.push(Self::from_model(db, model).await?);
        }
        Ok(columns)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
        title: String,
        position: i32,
        column_id: Uuid,
    ) -> Result<Self, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let now = Utc::now();
        let active = board_column::ActiveModel {
            uuid: Set(column_id),
            board_id: Set(board_row_id),
            title: Set(title),
            position: Set(position),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn rename<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        title: String,
    ) -> Result<Self, ColumnError> {
        let record = board_column::Entity::find()
            .filter(board_column::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ColumnError::ColumnNotFound)?;
        let mut active: board_column::ActiveModel = record.into();
        active.title = Set(title);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = board_column::Entity::delete_many()
            .filter(board_column::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Renumbers the given columns 0..N-1 in one transaction. An unknown id
    /// aborts the batch and leaves every stored position untouched.
    pub async fn update_order<C>(db: &C, column_ids: &[Uuid]) -> Result<(), DbErr>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let tx = db.begin().await?;
        for (index, id) in column_ids.iter().enumerate() {
            let record = board_column::Entity::find()
                .filter(board_column::Column::Uuid.eq(*id))
                .one(&tx)
                .await?
                .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
            let mut active: board_column::ActiveModel = record.into();
            active.position = Set(index as i32);
            active.updated_at = Set(Utc::now().into());
            active.update(&tx).await?;
        }
        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        board::{Board, CreateBoard},
        user::{CreateUser, User},
    };

    use crate::test_utils::memory_db;

    async fn board_with_defaults(db: &sea_orm::DatabaseConnection) -> Board {
        let owner = User::create(
            db,
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
        Board::create(
            db,
            &CreateBoard {
                title: "Board".to_string(),
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn update_order_renumbers_sequence() {
        let db = memory_db().await;
        let board = board_with_defaults(&db).await;
        let columns = BoardColumn::find_by_board(&db, board.id).await.unwrap();
        let [c1, c2, c3] = [&columns[0], &columns[1], &columns[2]];

        BoardColumn::update_order(&db, &[c3.id, c1.id, c2.id])
            .await
            .unwrap();

        let reordered = BoardColumn::find_by_board(&db, board.id).await.unwrap();
        assert_eq!(reordered[0].id, c3.id);
        assert_eq!(reordered[0].position, 0);
        assert_eq!(reordered[1].id, c1.id);
        assert_eq!(reordered[1].position, 1);
        assert_eq!(reordered[2].id, c2.id);
        assert_eq!(reordered[2].position, 2);
    }

    #[tokio::test]
    async fn update_order_with_unknown_id_changes_nothing() {
        let db = memory_db().await;
        let board = board_with_defaults(&db).await;
        let columns = BoardColumn::find_by_board(&db, board.id).await.unwrap();
        let before: Vec<(Uuid, i32)> = columns.iter().map(|c| (c.id, c.position)).collect();

        let result = BoardColumn::update_order(
            &db,
            &[columns[2].id, Uuid::new_v4(), columns[0].id],
        )
        .await;
        assert!(result.is_err());

        let after: Vec<(Uuid, i32)> = BoardColumn::find_by_board(&db, board.id)
            .await
            .unwrap()
            .iter()
            .map(|c| (c.id, c.position))
            .collect();
        assert_eq!(before, after);
    }
}
