use system::ConnectionId;

/// A room is nothing but the set of connections that joined it; the
/// shared buffer lives only in the members' editing widgets.
pub struct Room {
    pub connections: Vec<ConnectionId>,
}

impl Room {
    pub fn new() -> Self {
        Self {
            connections: Vec::new(),
        }
    }
}
