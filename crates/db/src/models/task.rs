use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{board, board_column, subtask, task, task_dependency},
    models::{
        activity_log::ActivityEntry,
        ids,
        label::Label,
        subtask::Subtask,
        task_dependency::TaskDependency,
        user::UserRef,
    },
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Column not found")]
    ColumnNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub is_completed: bool,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTask {
    pub column_id: Uuid,
    pub title: String,
    pub position: i32,
}

/// Minimal projection used by the dependency picker and simple listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
    pub column_title: String,
}

/// Board-view card: the task plus everything the column renders on it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskCard {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub labels: Vec<Label>,
    pub assignee: Option<UserRef>,
    pub subtask_count: u64,
    pub blocked_by_count: u64,
}

/// Everything the task detail modal shows at once.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub column_title: String,
    pub board_id: Uuid,
    pub labels: Vec<Label>,
    pub subtasks: Vec<Subtask>,
    pub activity: Vec<ActivityEntry>,
    pub assignee: Option<UserRef>,
    pub blocked_by: Vec<TaskRef>,
    pub blocking: Vec<TaskRef>,
}

/// A task with its board context, for the "my tasks" and deadline lists.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AssignedTask {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub column_title: String,
    pub board_id: Uuid,
    pub board_title: String,
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DashboardStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub pending_tasks: u64,
    pub efficiency: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineRange {
    Day,
    Week,
    Month,
    Overdue,
    #[default]
    All,
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let column_id = ids::column_uuid_by_id(db, model.column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let assignee_id = match model.assignee_id {
            Some(id) => ids::user_uuid_by_id(db, id).await?,
            None => None,
        };
        Ok(Self {
            id: model.uuid,
            column_id,
            title: model.title,
            description: model.description,
            position: model.position,
            is_completed: model.is_completed,
            due_date: model.due_date.map(Into::into),
            assignee_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Tasks of one column in display order, position ties broken by row id.
    pub async fn find_by_column<C: ConnectionTrait>(
        db: &C,
        column_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let column_row_id = ids::column_id_by_uuid(db, column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let models = task::Entity::find()
            .filter(task::Column::ColumnId.eq(column_row_id))
            .order_by_asc(task::Column::Position)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn find_cards_by_column<C: ConnectionTrait>(
        db: &C,
        column_id: Uuid,
    ) -> Result<Vec<TaskCard>, DbErr> {
        let column_row_id = ids::column_id_by_uuid(db, column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let models = task::Entity::find()
            .filter(task::Column::ColumnId.eq(column_row_id))
            .order_by_asc(task::Column::Position)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;

        let mut cards = Vec::with_capacity(models.len());
        for model in models {
            let row_id = model.id;
            let assignee = match model.assignee_id {
                Some(id) => {
                    crate::entities::user::Entity::find_by_id(id)
                        .one(db)
                        .await?
                        .map(|user| UserRef {
                            id: user.uuid,
                            username: user.username,
                        })
                }
                None => None,
            };
            let task = Self::from_model(db, model).await?;
            let labels = Label::find_by_task(db, task.id).await?;
            let subtask_count = subtask::Entity::find()
                .filter(subtask::Column::TaskId.eq(row_id))
                .count(db)
                .await?;
            let blocked_by_count = task_dependency::Entity::find()
                .filter(task_dependency::Column::TaskId.eq(row_id))
                .count(db)
                .await?;
            cards.push(TaskCard {
                task,
                labels,
                assignee,
                subtask_count,
                blocked_by_count,
            });
        }
        Ok(cards)
    }

    pub async fn details<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<TaskDetails>, DbErr> {
        let Some(task) = Self::find_by_id(db, id).await? else {
            return Ok(None);
        };

        let column_row_id = ids::column_id_by_uuid(db, task.column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let column = board_column::Entity::find_by_id(column_row_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let board_id = ids::board_uuid_by_id(db, column.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let assignee = match task.assignee_id {
            Some(assignee_id) => {
                crate::models::user::User::find_by_id(db, assignee_id)
                    .await?
                    .map(|user| UserRef {
                        id: user.id,
                        username: user.username,
                    })
            }
            None => None,
        };

        let labels = Label::find_by_task(db, task.id).await?;
        let subtasks = Subtask::find_by_task(db, task.id).await?;
        let activity = ActivityEntry::find_by_task(db, task.id).await?;
        let blocked_by = TaskDependency::blocked_by(db, task.id).await?;
        let blocking = TaskDependency::blocking(db, task.id).await?;

        Ok(Some(TaskDetails {
            task,
            column_title: column.title,
            board_id,
            labels,
            subtasks,
            activity,
            assignee,
            blocked_by,
            blocking,
        }))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        let column_row_id = ids::column_id_by_uuid(db, data.column_id)
            .await?
            .ok_or(TaskError::ColumnNotFound)?;
        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            column_id: Set(column_row_id),
            title: Set(data.title.clone()),
            description: Set(None),
            position: Set(data.position),
            is_completed: Set(false),
            due_date: Set(None),
            assignee_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        title: String,
        description: Option<String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let mut active: task::ActiveModel = record.into();
        active.title = Set(title);
        active.description = Set(description);
        active.due_date = Set(due_date.map(Into::into));
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// The move protocol writes only the moved task: its new column and the
    /// destination index. Sibling rows keep their stored positions.
    pub async fn move_to_column<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        column_id: Uuid,
        position: i32,
    ) -> Result<(), TaskError> {
        let column_row_id = ids::column_id_by_uuid(db, column_id)
            .await?
            .ok_or(TaskError::ColumnNotFound)?;
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let mut active: task::ActiveModel = record.into();
        active.column_id = Set(column_row_id);
        active.position = Set(position);
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }

    /// Completion gating against open blockers happens at the mutation
    /// boundary; this write is unconditional.
    pub async fn set_completed<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        is_completed: bool,
    ) -> Result<(), TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;
        let mut active: task::ActiveModel = record.into();
        active.is_completed = Set(is_completed);
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }

    pub async fn assign<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> Result<(), TaskError> {
        let assignee_row_id = match assignee_id {
            Some(user_id) => Some(
                ids::user_id_by_uuid(db, user_id)
                    .await?
                    .ok_or(DbErr::RecordNotFound("User not found".to_string()))?,
            ),
            None => None,
        };
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;
        let mut active: task::ActiveModel = record.into();
        active.assignee_id = Set(assignee_row_id);
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Simple projections of every task on a board, for the dependency
    /// picker.
    pub async fn find_refs_by_board<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<TaskRef>, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let columns = board_column::Entity::find()
            .filter(board_column::Column::BoardId.eq(board_row_id))
            .all(db)
            .await?;

        let mut refs = Vec::new();
        for column in columns {
            let models = task::Entity::find()
                .filter(task::Column::ColumnId.eq(column.id))
                .order_by_asc(task::Column::Position)
                .order_by_asc(task::Column::Id)
                .all(db)
                .await?;
            for model in models {
                refs.push(TaskRef {
                    id: model.uuid,
                    title: model.title,
                    column_title: column.title.clone(),
                });
            }
        }
        Ok(refs)
    }

    /// Open tasks assigned to the user, "open" meaning the column is not the
    /// terminal "Done" column.
    pub async fn find_assigned_open<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<AssignedTask>, DbErr> {
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let models = task::Entity::find()
            .filter(task::Column::AssigneeId.eq(user_row_id))
            .order_by_asc(task::Column::Position)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;

        let mut tasks = Vec::new();
        for model in models {
            let Some(context) = Self::board_context(db, model.column_id).await? else {
                continue;
            };
            if context.column_title == "Done" {
                continue;
            }
            let task = Self::from_model(db, model).await?;
            let labels = Label::find_by_task(db, task.id).await?;
            tasks.push(AssignedTask {
                task,
                column_title: context.column_title,
                board_id: context.board_id,
                board_title: context.board_title,
                labels,
            });
        }
        Ok(tasks)
    }

    /// Incomplete tasks with a due date inside the requested window, limited
    /// to boards the user can see, soonest first, capped at ten.
    pub async fn upcoming_deadlines<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        is_admin: bool,
        range: DeadlineRange,
    ) -> Result<Vec<AssignedTask>, DbErr> {
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let now = Utc::now();
        let (gte, lte) = match range {
            DeadlineRange::Overdue => (None, Some(now)),
            DeadlineRange::Day => (Some(now), Some(now + Duration::days(1))),
            DeadlineRange::Week => (Some(now), Some(now + Duration::days(7))),
            DeadlineRange::Month => (Some(now), Some(now + Duration::days(30))),
            DeadlineRange::All => (None, None),
        };

        let mut query = task::Entity::find()
            .filter(task::Column::IsCompleted.eq(false))
            .filter(task::Column::DueDate.is_not_null());
        if let Some(gte) = gte {
            query = query.filter(task::Column::DueDate.gte(gte));
        }
        if let Some(lte) = lte {
            query = query.filter(task::Column::DueDate.lte(lte));
        }
        let models = query.order_by_asc(task::Column::DueDate).all(db).await?;

        let mut tasks = Vec::new();
        for model in models {
            if tasks.len() >= 10 {
                break;
            }
            let column = board_column::Entity::find_by_id(model.column_id)
                .one(db)
                .await?
                .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
            let assigned_to_user = model.assignee_id == Some(user_row_id);
            let visible = assigned_to_user
                || crate::models::board::Board::is_visible_to(
                    db,
                    column.board_id,
                    user_row_id,
                    is_admin,
                )
                .await?;
            if !visible {
                continue;
            }
            let board_title: String = board::Entity::find_by_id(column.board_id)
                .one(db)
                .await?
                .map(|b| b.title)
                .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
            let board_id = ids::board_uuid_by_id(db, column.board_id)
                .await?
                .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
            let task = Self::from_model(db, model).await?;
            let labels = Label::find_by_task(db, task.id).await?;
            tasks.push(AssignedTask {
                task,
                column_title: column.title,
                board_id,
                board_title,
                labels,
            });
        }
        Ok(tasks)
    }

    /// Instance-wide counters for the dashboard header. "Completed" counts
    /// tasks sitting in a column titled "Done", matching how the board reads.
    pub async fn stats<C: ConnectionTrait>(db: &C) -> Result<DashboardStats, DbErr> {
        let total_tasks = task::Entity::find().count(db).await?;
        let done_columns: Vec<i64> = board_column::Entity::find()
            .filter(board_column::Column::Title.eq("Done"))
            .all(db)
            .await?
            .into_iter()
            .map(|column| column.id)
            .collect();
        let completed_tasks = if done_columns.is_empty() {
            0
        } else {
            task::Entity::find()
                .filter(task::Column::ColumnId.is_in(done_columns))
                .count(db)
                .await?
        };
        let pending_tasks = total_tasks.saturating_sub(completed_tasks);
        let efficiency = if total_tasks > 0 {
            format!(
                "{}%",
                ((completed_tasks as f64 / total_tasks as f64) * 100.0).round() as u64
            )
        } else {
            "0%".to_string()
        };
        Ok(DashboardStats {
            total_tasks,
            completed_tasks,
            pending_tasks,
            efficiency,
        })
    }

    async fn board_context<C: ConnectionTrait>(
        db: &C,
        column_row_id: i64,
    ) -> Result<Option<BoardContext>, DbErr> {
        let Some(column) = board_column::Entity::find_by_id(column_row_id).one(db).await? else {
            return Ok(None);
        };
        let Some(board_model) = board::Entity::find_by_id(column.board_id).one(db).await? else {
            return Ok(None);
        };
        Ok(Some(BoardContext {
            column_title: column.title,
            board_id: board_model.uuid,
            board_title: board_model.title,
        }))
    }

    /// Membership-aware existence check used when gating board-scoped reads.
    pub async fn is_on_visible_board<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<bool, DbErr> {
        let Some(task_row_id) = ids::task_id_by_uuid(db, task_id).await? else {
            return Ok(false);
        };
        let Some(model) = task::Entity::find_by_id(task_row_id).one(db).await? else {
            return Ok(false);
        };
        let Some(column) = board_column::Entity::find_by_id(model.column_id).one(db).await?
        else {
            return Ok(false);
        };
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(false);
        };
        if model.assignee_id == Some(user_row_id) {
            return Ok(true);
        }
        crate::models::board::Board::is_visible_to(db, column.board_id, user_row_id, is_admin)
            .await
    }
}

struct BoardContext {
    column_title: String,
    board_id: Uuid,
    board_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        board::{Board, CreateBoard},
        board_column::BoardColumn,
        user::{CreateUser, User},
    };
    use crate::test_utils::memory_db;

    async fn seed_board(db: &sea_orm::DatabaseConnection) -> (User, Board, Vec<BoardColumn>) {
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
        let board = Board::create(
            db,
            &CreateBoard {
                title: "Board".to_string(),
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();
        let columns = BoardColumn::find_by_board(db, board.id).await.unwrap();
        (owner, board, columns)
    }

    async fn add_task(
        db: &sea_orm::DatabaseConnection,
        column_id: Uuid,
        title: &str,
        position: i32,
    ) -> Task {
        Task::create(
            db,
            &CreateTask {
                column_id,
                title: title.to_string(),
                position,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn moving_a_task_leaves_siblings_untouched() {
        let db = memory_db().await;
        let (_owner, _board, columns) = seed_board(&db).await;
        let todo = columns[0].id;
        let done = columns[2].id;

        let moved = add_task(&db, todo, "moved", 0).await;
        let sibling = add_task(&db, todo, "sibling", 1).await;
        let resident = add_task(&db, done, "resident", 0).await;

        Task::move_to_column(&db, moved.id, done, 0).await.unwrap();

        let moved_after = Task::find_by_id(&db, moved.id).await.unwrap().unwrap();
        assert_eq!(moved_after.column_id, done);
        assert_eq!(moved_after.position, 0);

        let sibling_after = Task::find_by_id(&db, sibling.id).await.unwrap().unwrap();
        assert_eq!(sibling_after.column_id, todo);
        assert_eq!(sibling_after.position, 1);

        let resident_after = Task::find_by_id(&db, resident.id).await.unwrap().unwrap();
        assert_eq!(resident_after.column_id, done);
        assert_eq!(resident_after.position, 0);
    }

    #[tokio::test]
    async fn column_listing_breaks_position_ties_by_row_id() {
        let db = memory_db().await;
        let (_owner, _board, columns) = seed_board(&db).await;
        let todo = columns[0].id;

        let first = add_task(&db, todo, "first", 0).await;
        let second = add_task(&db, todo, "second", 0).await;

        let listed = Task::find_by_column(&db, todo).await.unwrap();
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn stats_count_done_column_tasks_as_completed() {
        let db = memory_db().await;
        let (_owner, _board, columns) = seed_board(&db).await;

        add_task(&db, columns[0].id, "open", 0).await;
        add_task(&db, columns[2].id, "shipped", 0).await;

        let stats = Task::stats(&db).await.unwrap();
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.pending_tasks, 1);
        assert_eq!(stats.efficiency, "50%");
    }

    #[tokio::test]
    async fn deadline_window_excludes_completed_and_far_future_tasks() {
        let db = memory_db().await;
        let (owner, _board, columns) = seed_board(&db).await;
        let todo = columns[0].id;

        let soon = add_task(&db, todo, "due soon", 0).await;
        let far = add_task(&db, todo, "due far", 1).await;
        let finished = add_task(&db, todo, "finished", 2).await;

        let now = Utc::now();
        Task::update(&db, soon.id, "due soon".into(), None, Some(now + Duration::days(2)))
            .await
            .unwrap();
        Task::update(&db, far.id, "due far".into(), None, Some(now + Duration::days(60)))
            .await
            .unwrap();
        Task::update(
            &db,
            finished.id,
            "finished".into(),
            None,
            Some(now + Duration::days(2)),
        )
        .await
        .unwrap();
        Task::set_completed(&db, finished.id, true).await.unwrap();

        let upcoming = Task::upcoming_deadlines(&db, owner.id, false, DeadlineRange::Week)
            .await
            .unwrap();
        let titles: Vec<&str> = upcoming.iter().map(|t| t.task.title.as_str()).collect();
        assert_eq!(titles, vec!["due soon"]);
    }
}
