//! 联机同步：共享房间文档与本地对局状态之间的映射。

pub mod document;
pub mod seat;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::game::RuleError;

pub use document::{DocumentPatch, RoomDocument, RoomStatus, SeatRecord};
pub use seat::{plan_update, start_room, start_room_with, OnlineSeat, RoomUpdate};
pub use store::{DocumentStore, MemoryStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "type")]
pub enum SyncError {
    #[error("rejected: {error}")]
    Rule { error: RuleError },
    #[error("document is at version {actual}, patch was planned against {expected}")]
    StaleVersion { expected: u64, actual: u64 },
    #[error("room {room_id} does not exist")]
    RoomNotFound { room_id: String },
    #[error("handle {handle} has no seat in this room")]
    UnknownSeat { handle: String },
    #[error("room is {status:?}, not playing")]
    NotPlaying { status: RoomStatus },
    #[error("room already started ({status:?})")]
    AlreadyStarted { status: RoomStatus },
    #[error("malformed room document: {message}")]
    Malformed { message: String },
    #[error("cannot seat this room: {error}")]
    Config { error: ConfigError },
}

impl From<RuleError> for SyncError {
    fn from(error: RuleError) -> Self {
        SyncError::Rule { error }
    }
}

impl From<ConfigError> for SyncError {
    fn from(error: ConfigError) -> Self {
        SyncError::Config { error }
    }
}
