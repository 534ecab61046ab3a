use crate::room::Room;
use std::collections::HashMap;
use std::num::Wrapping;
use system::{ConnectionId, Participant, RoomId};

pub struct ServerState {
    connection_id_source: Wrapping<ConnectionId>,
    display_names: HashMap<ConnectionId, String>,
    rooms: HashMap<RoomId, Room>,
    memberships: HashMap<ConnectionId, Vec<RoomId>>,
}

#[derive(Debug)]
pub enum ServerError {
    InvalidRoomId,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            connection_id_source: Wrapping(0),
            display_names: HashMap::new(),
            rooms: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    pub fn create_connection(&mut self) -> ConnectionId {
        self.connection_id_source += Wrapping(1);
        self.connection_id_source.0
    }

    /// Joining a room that does not exist yet creates it. There is no
    /// rejection path; display names are recorded as-is.
    pub fn join_room(&mut self, connection_id: &ConnectionId, room_id: &RoomId, display_name: &str) {
        self.display_names
            .insert(*connection_id, display_name.to_string());

        let room = self.rooms.entry(room_id.clone()).or_insert_with(Room::new);
        if !room.connections.contains(connection_id) {
            room.connections.push(*connection_id);
        }

        let rooms = self
            .memberships
            .entry(*connection_id)
            .or_insert_with(Vec::new);
        if !rooms.contains(room_id) {
            rooms.push(room_id.clone());
        }
        log::info!("Connection {} joined room {}", connection_id, room_id);
    }

    pub fn is_member(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        self.rooms
            .get(room_id)
            .map_or(false, |room| room.connections.contains(connection_id))
    }

    /// Derived on demand from the membership index and the name registry.
    pub fn roster(&self, room_id: &RoomId) -> Result<Vec<Participant>, ServerError> {
        self.rooms
            .get(room_id)
            .map(|room| {
                room.connections
                    .iter()
                    .map(|connection_id| Participant {
                        connection_id: *connection_id,
                        display_name: self
                            .display_names
                            .get(connection_id)
                            .cloned()
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .ok_or(ServerError::InvalidRoomId)
    }

    pub fn connection_ids_in_room(&self, room_id: &RoomId) -> Result<&[ConnectionId], ServerError> {
        self.rooms
            .get(room_id)
            .map(|room| room.connections.as_slice())
            .ok_or(ServerError::InvalidRoomId)
    }

    /// Removes the connection from every structure. Returns its last-known
    /// display name and the rooms it was a member of; a room left without
    /// members ceases to exist.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> (Option<String>, Vec<RoomId>) {
        let display_name = self.display_names.remove(connection_id);
        let room_ids = self.memberships.remove(connection_id).unwrap_or_default();
        for room_id in &room_ids {
            if let Some(room) = self.rooms.get_mut(room_id) {
                room.connections.retain(|c| c != connection_id);
                if room.connections.is_empty() {
                    self.rooms.remove(room_id);
                }
            }
        }
        (display_name, room_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_room_implicitly_on_first_join() {
        let mut state = ServerState::new();
        let a = state.create_connection();
        state.join_room(&a, &"R1".to_string(), "alice");
        assert!(state.is_member(&a, &"R1".to_string()));
    }

    #[test]
    fn it_removes_room_when_all_connections_disconnect() {
        let mut state = ServerState::new();
        let a = state.create_connection();
        state.join_room(&a, &"R1".to_string(), "alice");
        let (name, rooms) = state.disconnect(&a);
        assert_eq!(name.as_deref(), Some("alice"));
        assert_eq!(rooms, vec!["R1".to_string()]);
        assert!(state.roster(&"R1".to_string()).is_err());
    }

    #[test]
    fn roster_equals_joins_minus_leaves_in_join_order() {
        let room = "R1".to_string();
        let mut state = ServerState::new();
        let a = state.create_connection();
        let b = state.create_connection();
        let c = state.create_connection();
        state.join_room(&a, &room, "alice");
        state.join_room(&b, &room, "bob");
        state.join_room(&c, &room, "carol");
        state.disconnect(&b);

        let roster = state.roster(&room).expect("room must exist");
        let ids: Vec<_> = roster.iter().map(|p| p.connection_id).collect();
        let names: Vec<_> = roster.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[test]
    fn disconnect_leaves_every_room_the_connection_was_in() {
        let mut state = ServerState::new();
        let a = state.create_connection();
        let b = state.create_connection();
        state.join_room(&a, &"R1".to_string(), "alice");
        state.join_room(&a, &"R2".to_string(), "alice");
        state.join_room(&b, &"R2".to_string(), "bob");

        let (_, mut rooms) = state.disconnect(&a);
        rooms.sort();
        assert_eq!(rooms, vec!["R1".to_string(), "R2".to_string()]);
        // R2 still has bob; R1 is gone
        assert_eq!(state.connection_ids_in_room(&"R2".to_string()).unwrap(), &[b]);
        assert!(state.connection_ids_in_room(&"R1".to_string()).is_err());
    }

    #[test]
    fn rejoining_the_same_room_does_not_duplicate_membership() {
        let room = "R1".to_string();
        let mut state = ServerState::new();
        let a = state.create_connection();
        state.join_room(&a, &room, "alice");
        state.join_room(&a, &room, "alice");
        assert_eq!(state.connection_ids_in_room(&room).unwrap().len(), 1);
    }
}
