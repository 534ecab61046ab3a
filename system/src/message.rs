use serde::{Deserialize, Serialize};

pub type ConnectionId = u16;
pub type RoomId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

/// Client → server. Push-only; none of these produce a direct reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomCommand {
    /// Enter a room, creating it implicitly if this is the first member.
    Join {
        room_id: RoomId,
        display_name: String,
    },
    /// Relay the new buffer text to every other member of the room.
    BufferChange { room_id: RoomId, text: String },
    /// Directed sync handoff: deliver `text` to `target` only.
    SyncBuffer {
        target: ConnectionId,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomEvent {
    /// Sent individually to every member of the room, the joiner included.
    /// `joined_connection_id` lets a client tell its own initial roster
    /// apart from someone else arriving.
    Joined {
        roster: Vec<Participant>,
        joined_connection_id: ConnectionId,
        joined_name: String,
    },
    BufferChange {
        text: String,
    },
    /// Initial-state fill for a new joiner; never broadcast.
    SyncBuffer {
        text: String,
    },
    Left {
        connection_id: ConnectionId,
        display_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerEvent {
    Connected { connection_id: ConnectionId },
    Room(RoomEvent),
}
