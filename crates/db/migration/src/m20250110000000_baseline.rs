use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Groups::Table)
                    .col(pk_id_col(manager, Groups::Id))
                    .col(uuid_col(Groups::Uuid))
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(
                        ColumnDef::new(Groups::Permissions)
                            .json()
                            .not_null()
                            .default(Expr::val("[]")),
                    )
                    .col(timestamp_col(Groups::CreatedAt))
                    .col(timestamp_col(Groups::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_groups_uuid")
                    .table(Groups::Table)
                    .col(Groups::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(uuid_col(Users::Uuid))
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(fk_id_nullable_col(manager, Users::GroupId))
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_group_id")
                            .from(Users::Table, Users::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_uuid")
                    .table(Users::Table)
                    .col(Users::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Boards::Table)
                    .col(pk_id_col(manager, Boards::Id))
                    .col(uuid_col(Boards::Uuid))
                    .col(ColumnDef::new(Boards::Title).string().not_null())
                    .col(fk_id_col(manager, Boards::OwnerId))
                    .col(timestamp_col(Boards::CreatedAt))
                    .col(timestamp_col(Boards::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boards_owner_id")
                            .from(Boards::Table, Boards::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_boards_uuid")
                    .table(Boards::Table)
                    .col(Boards::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(BoardMembers::Table)
                    .col(pk_id_col(manager, BoardMembers::Id))
                    .col(fk_id_col(manager, BoardMembers::BoardId))
                    .col(fk_id_col(manager, BoardMembers::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_board_members_board_id")
                            .from(BoardMembers::Table, BoardMembers::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_board_members_user_id")
                            .from(BoardMembers::Table, BoardMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_board_members_pair")
                    .table(BoardMembers::Table)
                    .col(BoardMembers::BoardId)
                    .col(BoardMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(BoardColumns::Table)
                    .col(pk_id_col(manager, BoardColumns::Id))
                    .col(uuid_col(BoardColumns::Uuid))
                    .col(fk_id_col(manager, BoardColumns::BoardId))
                    .col(ColumnDef::new(BoardColumns::Title).string().not_null())
                    .col(
                        ColumnDef::new(BoardColumns::Position)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(timestamp_col(BoardColumns::CreatedAt))
                    .col(timestamp_col(BoardColumns::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_board_columns_board_id")
                            .from(BoardColumns::Table, BoardColumns::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_board_columns_uuid")
                    .table(BoardColumns::Table)
                    .col(BoardColumns::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_board_columns_board_id")
                    .table(BoardColumns::Table)
                    .col(BoardColumns::BoardId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(fk_id_col(manager, Tasks::ColumnId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Position)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(
                        ColumnDef::new(Tasks::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(ColumnDef::new(Tasks::DueDate).timestamp())
                    .col(fk_id_nullable_col(manager, Tasks::AssigneeId))
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_column_id")
                            .from(Tasks::Table, Tasks::ColumnId)
                            .to(BoardColumns::Table, BoardColumns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_assignee_id")
                            .from(Tasks::Table, Tasks::AssigneeId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_column_id")
                    .table(Tasks::Table)
                    .col(Tasks::ColumnId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_assignee_id")
                    .table(Tasks::Table)
                    .col(Tasks::AssigneeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Subtasks::Table)
                    .col(pk_id_col(manager, Subtasks::Id))
                    .col(uuid_col(Subtasks::Uuid))
                    .col(fk_id_col(manager, Subtasks::TaskId))
                    .col(ColumnDef::new(Subtasks::Title).string().not_null())
                    .col(
                        ColumnDef::new(Subtasks::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(Subtasks::CreatedAt))
                    .col(timestamp_col(Subtasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subtasks_task_id")
                            .from(Subtasks::Table, Subtasks::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_subtasks_uuid")
                    .table(Subtasks::Table)
                    .col(Subtasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_subtasks_task_id")
                    .table(Subtasks::Table)
                    .col(Subtasks::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Labels::Table)
                    .col(pk_id_col(manager, Labels::Id))
                    .col(uuid_col(Labels::Uuid))
                    .col(fk_id_col(manager, Labels::BoardId))
                    .col(ColumnDef::new(Labels::Name).string().not_null())
                    .col(ColumnDef::new(Labels::Color).string_len(32).not_null())
                    .col(timestamp_col(Labels::CreatedAt))
                    .col(timestamp_col(Labels::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_labels_board_id")
                            .from(Labels::Table, Labels::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_labels_uuid")
                    .table(Labels::Table)
                    .col(Labels::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskLabels::Table)
                    .col(pk_id_col(manager, TaskLabels::Id))
                    .col(fk_id_col(manager, TaskLabels::TaskId))
                    .col(fk_id_col(manager, TaskLabels::LabelId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_labels_task_id")
                            .from(TaskLabels::Table, TaskLabels::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_labels_label_id")
                            .from(TaskLabels::Table, TaskLabels::LabelId)
                            .to(Labels::Table, Labels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_labels_pair")
                    .table(TaskLabels::Table)
                    .col(TaskLabels::TaskId)
                    .col(TaskLabels::LabelId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskDependencies::Table)
                    .col(pk_id_col(manager, TaskDependencies::Id))
                    .col(fk_id_col(manager, TaskDependencies::TaskId))
                    .col(fk_id_col(manager, TaskDependencies::BlockedById))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_dependencies_task_id")
                            .from(TaskDependencies::Table, TaskDependencies::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_dependencies_blocked_by_id")
                            .from(TaskDependencies::Table, TaskDependencies::BlockedById)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_dependencies_pair")
                    .table(TaskDependencies::Table)
                    .col(TaskDependencies::TaskId)
                    .col(TaskDependencies::BlockedById)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_dependencies_blocked_by_id")
                    .table(TaskDependencies::Table)
                    .col(TaskDependencies::BlockedById)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ActivityLogs::Table)
                    .col(pk_id_col(manager, ActivityLogs::Id))
                    .col(uuid_col(ActivityLogs::Uuid))
                    .col(ColumnDef::new(ActivityLogs::Action).text().not_null())
                    .col(fk_id_nullable_col(manager, ActivityLogs::TaskId))
                    .col(fk_id_nullable_col(manager, ActivityLogs::UserId))
                    .col(timestamp_col(ActivityLogs::Timestamp))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_logs_task_id")
                            .from(ActivityLogs::Table, ActivityLogs::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_logs_user_id")
                            .from(ActivityLogs::Table, ActivityLogs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_activity_logs_timestamp")
                    .table(ActivityLogs::Table)
                    .col(ActivityLogs::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskDependencies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskLabels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Labels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subtasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BoardColumns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BoardMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Uuid,
    Username,
    PasswordHash,
    IsAdmin,
    GroupId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Uuid,
    Name,
    Permissions,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Boards {
    Table,
    Id,
    Uuid,
    Title,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum BoardMembers {
    Table,
    Id,
    BoardId,
    UserId,
}

#[derive(Iden)]
enum BoardColumns {
    Table,
    Id,
    Uuid,
    BoardId,
    Title,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    ColumnId,
    Title,
    Description,
    Position,
    IsCompleted,
    DueDate,
    AssigneeId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Subtasks {
    Table,
    Id,
    Uuid,
    TaskId,
    Title,
    IsCompleted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Labels {
    Table,
    Id,
    Uuid,
    BoardId,
    Name,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskLabels {
    Table,
    Id,
    TaskId,
    LabelId,
}

#[derive(Iden)]
enum TaskDependencies {
    Table,
    Id,
    TaskId,
    BlockedById,
}

#[derive(Iden)]
enum ActivityLogs {
    Table,
    Id,
    Uuid,
    Action,
    TaskId,
    UserId,
    Timestamp,
}
