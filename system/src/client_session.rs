use crate::message::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientSessionState {
    Disconnected,
    Joining,
    Active,
}

/// Something the embedding client has to do after an event was handled:
/// put a command on the wire, or replace the editing widget's text.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEffect {
    Send(RoomCommand),
    BufferReplaced(String),
}

/// Client-side half of the room protocol. Owns the local copy of the
/// buffer (the editing widget's text) and the last roster it saw; the
/// transport feeds it `ServerEvent`s and executes the returned effects.
pub struct ClientSession {
    connection_id: Option<ConnectionId>,
    room_id: Option<RoomId>,
    state: ClientSessionState,
    roster: Vec<Participant>,
    buffer: String,
}

impl ClientSession {
    pub fn new() -> Self {
        Self {
            connection_id: None,
            room_id: None,
            state: ClientSessionState::Disconnected,
            roster: Vec::new(),
            buffer: String::new(),
        }
    }

    pub fn state(&self) -> ClientSessionState {
        self.state
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Returns the join command to put on the wire.
    pub fn join(&mut self, room_id: RoomId, display_name: String) -> RoomCommand {
        log::info!("Joining room {} as {}", room_id, display_name);
        self.room_id = Some(room_id.clone());
        self.state = ClientSessionState::Joining;
        RoomCommand::Join {
            room_id,
            display_name,
        }
    }

    /// The local editing widget changed the buffer. Returns the relay
    /// command, or `None` before any room was joined.
    pub fn edit(&mut self, text: String) -> Option<RoomCommand> {
        self.buffer = text.clone();
        self.room_id
            .clone()
            .map(|room_id| RoomCommand::BufferChange { room_id, text })
    }

    pub fn handle_event(&mut self, event: ServerEvent) -> Vec<ClientEffect> {
        match event {
            ServerEvent::Connected { connection_id } => {
                self.connection_id = Some(connection_id);
                Vec::new()
            }
            ServerEvent::Room(room_event) => self.handle_room_event(room_event),
        }
    }

    /// Transport closed. Roster and membership are gone; the widget keeps
    /// whatever text it had.
    pub fn transport_closed(&mut self) {
        self.connection_id = None;
        self.room_id = None;
        self.state = ClientSessionState::Disconnected;
        self.roster.clear();
    }

    fn handle_room_event(&mut self, event: RoomEvent) -> Vec<ClientEffect> {
        log::debug!("Handle room event: {:?}", event);
        match event {
            RoomEvent::Joined {
                roster,
                joined_connection_id,
                ..
            } => {
                self.roster = roster;
                let me = match self.connection_id {
                    Some(id) => id,
                    None => return Vec::new(),
                };
                if joined_connection_id == me {
                    // Own join. If the room was empty there is nobody to
                    // sync from and the buffer stays at its default.
                    self.state = ClientSessionState::Active;
                    Vec::new()
                } else if self.state == ClientSessionState::Active
                    && self.is_sync_source(me, joined_connection_id)
                {
                    vec![ClientEffect::Send(RoomCommand::SyncBuffer {
                        target: joined_connection_id,
                        text: self.buffer.clone(),
                    })]
                } else {
                    Vec::new()
                }
            }
            RoomEvent::BufferChange { text } | RoomEvent::SyncBuffer { text } => {
                self.buffer = text.clone();
                vec![ClientEffect::BufferReplaced(text)]
            }
            RoomEvent::Left { connection_id, .. } => {
                self.roster.retain(|p| p.connection_id != connection_id);
                Vec::new()
            }
        }
    }

    /// The sync handoff has exactly one sender: the first roster entry
    /// that is not the joiner. Every member evaluates this against the
    /// same roster, so the election needs no extra round trip.
    fn is_sync_source(&self, me: ConnectionId, joiner: ConnectionId) -> bool {
        self.roster
            .iter()
            .find(|p| p.connection_id != joiner)
            .map_or(false, |p| p.connection_id == me)
    }
}
