use std::collections::HashMap;

use super::{DocumentPatch, RoomDocument, SyncError};

/// 按房间号存取共享记录；写入携带计划时的版本。
pub trait DocumentStore {
    fn create(&mut self, room_id: &str, document: RoomDocument) -> Result<(), SyncError>;

    fn read(&self, room_id: &str) -> Result<RoomDocument, SyncError>;

    fn update(&mut self, room_id: &str, patch: &DocumentPatch) -> Result<RoomDocument, SyncError>;
}

/// 进程内存储，用于测试与本地主持。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rooms: HashMap<String, RoomDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn create(&mut self, room_id: &str, document: RoomDocument) -> Result<(), SyncError> {
        self.rooms.insert(room_id.to_string(), document);
        Ok(())
    }

    fn read(&self, room_id: &str) -> Result<RoomDocument, SyncError> {
        self.rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| SyncError::RoomNotFound {
                room_id: room_id.to_string(),
            })
    }

    fn update(&mut self, room_id: &str, patch: &DocumentPatch) -> Result<RoomDocument, SyncError> {
        let document = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| SyncError::RoomNotFound {
                room_id: room_id.to_string(),
            })?;
        let version = document.apply(patch)?;
        log::debug!("room {room_id} now at version {version}");
        Ok(document.clone())
    }
}
