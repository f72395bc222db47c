pub mod activity_log;
pub mod board;
pub mod board_column;
pub mod board_member;
pub mod group;
pub mod label;
pub mod subtask;
pub mod system_setting;
pub mod task;
pub mod task_dependency;
pub mod task_label;
pub mod user;
