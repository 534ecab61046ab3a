use tokio::sync::mpsc::{channel, Sender};

use system::{ConnectionId, RoomCommand, RoomEvent, RoomId};

use super::connection::{ConnectionCommand, ConnectionEvent};
use crate::connection_tx_storage::ConnectionTxStorage;
use crate::server_state::ServerState;

pub type ServerTx = Sender<ConnectionCommand>;

struct Server {
    server_state: ServerState,
    connections: ConnectionTxStorage,
}

impl Server {
    fn new() -> Self {
        Self {
            server_state: ServerState::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    async fn handle_connection_command(&mut self, command: &ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { tx } => {
                let connection_id = self.server_state.create_connection();
                self.connections.insert(connection_id, tx.clone());
                self.connections
                    .send(&connection_id, ConnectionEvent::Connected { connection_id })
                    .await;
            }
            ConnectionCommand::Disconnect { from } => {
                self.disconnect(from).await;
            }
            ConnectionCommand::RoomCommand { from, command } => {
                self.handle_room_command(from, command).await;
            }
        }
    }

    async fn handle_room_command(&mut self, from: &ConnectionId, command: &RoomCommand) {
        match command {
            RoomCommand::Join {
                room_id,
                display_name,
            } => {
                self.server_state.join_room(from, room_id, display_name);
                let roster = self
                    .server_state
                    .roster(room_id)
                    .expect("room must exist right after join");
                // Every member gets the full roster individually, tagged
                // with who joined - the joiner included, so it can tell its
                // own initial roster from later arrivals.
                for participant in &roster {
                    self.connections
                        .send(
                            &participant.connection_id,
                            ConnectionEvent::Room(RoomEvent::Joined {
                                roster: roster.clone(),
                                joined_connection_id: *from,
                                joined_name: display_name.clone(),
                            }),
                        )
                        .await;
                }
            }
            RoomCommand::BufferChange { room_id, text } => {
                if !self.server_state.is_member(from, room_id) {
                    log::warn!(
                        "Dropping buffer change from {} for room {} it never joined",
                        from,
                        room_id
                    );
                    return;
                }
                self.broadcast_room_event(
                    room_id,
                    RoomEvent::BufferChange { text: text.clone() },
                    Some(from),
                )
                .await;
            }
            RoomCommand::SyncBuffer { target, text } => {
                self.connections
                    .send(
                        target,
                        ConnectionEvent::Room(RoomEvent::SyncBuffer { text: text.clone() }),
                    )
                    .await;
            }
        }
    }

    async fn broadcast_room_event(
        &mut self,
        room_id: &RoomId,
        event: RoomEvent,
        without: Option<&ConnectionId>,
    ) {
        if let Ok(conns) = self.server_state.connection_ids_in_room(room_id) {
            for connection_id in conns {
                if without.map_or(true, |c| c != connection_id) {
                    self.connections
                        .send(connection_id, ConnectionEvent::Room(event.clone()))
                        .await;
                }
            }
        }
    }

    async fn disconnect(&mut self, connection_id: &ConnectionId) {
        let (display_name, room_ids) = self.server_state.disconnect(connection_id);
        for room_id in room_ids {
            // membership is already gone, so this reaches the remaining
            // members only; an emptied room no longer exists to broadcast to
            self.broadcast_room_event(
                &room_id,
                RoomEvent::Left {
                    connection_id: *connection_id,
                    display_name: display_name.clone().unwrap_or_default(),
                },
                Some(connection_id),
            )
            .await;
        }
        if let Some(mut tx) = self.connections.remove(connection_id) {
            let _ = tx
                .send(ConnectionEvent::Disconnected {
                    connection_id: *connection_id,
                })
                .await;
        }
    }
}

pub fn spawn_server() -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ConnectionCommand>(16);

    tokio::spawn(async move {
        let mut server = Box::new(Server::new());

        while let Some(command) = srv_rx.recv().await {
            server.handle_connection_command(&command).await;
        }
    });

    srv_tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    async fn connect(server: &mut Server) -> (ConnectionId, Receiver<ConnectionEvent>) {
        let (tx, mut rx) = channel(32);
        server
            .handle_connection_command(&ConnectionCommand::Connect { tx })
            .await;
        match rx.recv().await {
            Some(ConnectionEvent::Connected { connection_id }) => (connection_id, rx),
            other => panic!("expected Connected, got {:?}", other),
        }
    }

    async fn join(server: &mut Server, from: ConnectionId, room_id: &str, name: &str) {
        server
            .handle_connection_command(&ConnectionCommand::RoomCommand {
                from,
                command: RoomCommand::Join {
                    room_id: room_id.to_string(),
                    display_name: name.to_string(),
                },
            })
            .await;
    }

    fn drain(rx: &mut Receiver<ConnectionEvent>) {
        while rx.try_recv().is_ok() {}
    }

    fn room_event(rx: &mut Receiver<ConnectionEvent>) -> RoomEvent {
        match rx.try_recv() {
            Ok(ConnectionEvent::Room(event)) => event,
            other => panic!("expected a room event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn join_pushes_tagged_roster_to_every_member_including_joiner() {
        let mut server = Server::new();
        let (a, mut rx_a) = connect(&mut server).await;
        let (b, mut rx_b) = connect(&mut server).await;
        join(&mut server, a, "R1", "alice").await;
        drain(&mut rx_a);
        join(&mut server, b, "R1", "bob").await;

        for rx in [&mut rx_a, &mut rx_b].iter_mut() {
            match room_event(rx) {
                RoomEvent::Joined {
                    roster,
                    joined_connection_id,
                    joined_name,
                } => {
                    assert_eq!(joined_connection_id, b);
                    assert_eq!(joined_name, "bob");
                    let ids: Vec<_> = roster.iter().map(|p| p.connection_id).collect();
                    assert_eq!(ids, vec![a, b]);
                }
                other => panic!("expected Joined, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn buffer_change_reaches_everyone_but_the_sender() {
        let mut server = Server::new();
        let (a, mut rx_a) = connect(&mut server).await;
        let (b, mut rx_b) = connect(&mut server).await;
        let (c, mut rx_c) = connect(&mut server).await;
        join(&mut server, a, "R1", "alice").await;
        join(&mut server, b, "R1", "bob").await;
        join(&mut server, c, "R1", "carol").await;
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        server
            .handle_connection_command(&ConnectionCommand::RoomCommand {
                from: b,
                command: RoomCommand::BufferChange {
                    room_id: "R1".to_string(),
                    text: "print(1)".to_string(),
                },
            })
            .await;

        for rx in [&mut rx_a, &mut rx_c].iter_mut() {
            assert_eq!(
                room_event(rx),
                RoomEvent::BufferChange {
                    text: "print(1)".to_string()
                }
            );
        }
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn buffer_change_for_a_room_never_joined_is_dropped() {
        let mut server = Server::new();
        let (a, mut rx_a) = connect(&mut server).await;
        let (b, mut rx_b) = connect(&mut server).await;
        join(&mut server, a, "R1", "alice").await;
        drain(&mut rx_a);

        server
            .handle_connection_command(&ConnectionCommand::RoomCommand {
                from: b,
                command: RoomCommand::BufferChange {
                    room_id: "R1".to_string(),
                    text: "evil".to_string(),
                },
            })
            .await;
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn sync_buffer_is_delivered_only_to_its_target() {
        let mut server = Server::new();
        let (a, mut rx_a) = connect(&mut server).await;
        let (b, mut rx_b) = connect(&mut server).await;
        let (c, mut rx_c) = connect(&mut server).await;
        join(&mut server, a, "R1", "alice").await;
        join(&mut server, b, "R1", "bob").await;
        join(&mut server, c, "R1", "carol").await;
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        server
            .handle_connection_command(&ConnectionCommand::RoomCommand {
                from: a,
                command: RoomCommand::SyncBuffer {
                    target: c,
                    text: "print(1)".to_string(),
                },
            })
            .await;

        assert_eq!(
            room_event(&mut rx_c),
            RoomEvent::SyncBuffer {
                text: "print(1)".to_string()
            }
        );
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_notifies_each_room_exactly_once() {
        let mut server = Server::new();
        let (a, mut rx_a) = connect(&mut server).await;
        let (b, mut rx_b) = connect(&mut server).await;
        let (c, mut rx_c) = connect(&mut server).await;
        join(&mut server, a, "R1", "alice").await;
        join(&mut server, b, "R1", "bob").await;
        join(&mut server, b, "R2", "bob").await;
        join(&mut server, c, "R2", "carol").await;
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        server
            .handle_connection_command(&ConnectionCommand::Disconnect { from: b })
            .await;

        for rx in [&mut rx_a, &mut rx_c].iter_mut() {
            assert_eq!(
                room_event(rx),
                RoomEvent::Left {
                    connection_id: b,
                    display_name: "bob".to_string()
                }
            );
            assert!(rx.try_recv().is_err());
        }
        // the departing connection gets the transport-level close signal
        match rx_b.try_recv() {
            Ok(ConnectionEvent::Disconnected { connection_id }) => assert_eq!(connection_id, b),
            other => panic!("expected Disconnected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sole_member_disconnect_leaves_nothing_behind() {
        let mut server = Server::new();
        let (a, mut rx_a) = connect(&mut server).await;
        join(&mut server, a, "R1", "alice").await;
        drain(&mut rx_a);

        server
            .handle_connection_command(&ConnectionCommand::Disconnect { from: a })
            .await;

        // rejoining the same room id starts from scratch
        let (b, mut rx_b) = connect(&mut server).await;
        join(&mut server, b, "R1", "bob").await;
        match room_event(&mut rx_b) {
            RoomEvent::Joined { roster, .. } => {
                assert_eq!(roster.len(), 1);
                assert_eq!(roster[0].connection_id, b);
            }
            other => panic!("expected Joined, got {:?}", other),
        }
    }
}
