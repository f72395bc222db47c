use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{board, board_column, group, label, subtask, task, user};

pub async fn user_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn user_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Uuid)
        .filter(user::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn group_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    group::Entity::find()
        .select_only()
        .column(group::Column::Id)
        .filter(group::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn group_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    group::Entity::find()
        .select_only()
        .column(group::Column::Uuid)
        .filter(group::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn board_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    board::Entity::find()
        .select_only()
        .column(board::Column::Id)
        .filter(board::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn board_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    board::Entity::find()
        .select_only()
        .column(board::Column::Uuid)
        .filter(board::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn column_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    board_column::Entity::find()
        .select_only()
        .column(board_column::Column::Id)
        .filter(board_column::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn column_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    board_column::Entity::find()
        .select_only()
        .column(board_column::Column::Uuid)
        .filter(board_column::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Uuid)
        .filter(task::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn subtask_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    subtask::Entity::find()
        .select_only()
        .column(subtask::Column::Id)
        .filter(subtask::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn label_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    label::Entity::find()
        .select_only()
        .column(label::Column::Id)
        .filter(label::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}
