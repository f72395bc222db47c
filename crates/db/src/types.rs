use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use ts_rs::TS;

/// Capability identifiers gating board and task mutations. Stored inside a
/// group's serialized permission list; admins bypass the lookup entirely.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    EnumIter,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermissionKey {
    CreateBoard,
    EditBoard,
    CreateTask,
    EditTask,
    DeleteTask,
}
