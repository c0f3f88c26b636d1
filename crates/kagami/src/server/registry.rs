//! Room registry: membership bookkeeping for hosts and viewers.
//!
//! All membership mutation funnels through this struct so the
//! "no stale routing after disconnect" invariant is enforced in one
//! place and testable without a live transport. The registry is a
//! plain synchronous structure; the session coordinator owns it behind
//! a single lock (single-writer discipline).

use std::collections::{HashMap, HashSet};

use crate::{ConnId, RoomId};

/// A named group of connections: at most one host, any number of viewers.
///
/// Invariant: a connection id appears as host or as a viewer, never
/// both, and never twice in the viewer set.
#[derive(Debug, Default)]
pub struct Room {
    host: Option<ConnId>,
    viewers: HashSet<ConnId>,
}

impl Room {
    /// Current host, if one is joined
    pub fn host(&self) -> Option<&ConnId> {
        self.host.as_ref()
    }

    /// Current viewer set
    pub fn viewers(&self) -> &HashSet<ConnId> {
        &self.viewers
    }

    /// True when the room has no host and no viewers.
    ///
    /// Empty rooms must not persist in the registry; they are deleted
    /// eagerly by whichever mutation emptied them.
    fn is_empty(&self) -> bool {
        self.host.is_none() && self.viewers.is_empty()
    }
}

/// Result of a host join
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Took an empty host slot (the room may have just been created)
    NewHost,
    /// Displaced a sitting host: last-writer-wins, and the displaced
    /// connection is not notified by this operation. Role replacement
    /// is distinct from disconnect-driven cleanup.
    ReplacedHost(ConnId),
}

/// Rooms affected by removing a connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalEffect {
    /// Rooms whose host slot the departed connection held. The caller
    /// broadcasts `HostDisconnected` to the survivors of each.
    pub host_departed: Vec<RoomId>,
}

/// In-memory room map, process-lifetime only
#[derive(Debug, Default)]
pub struct Registry {
    rooms: HashMap<RoomId, Room>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a room as host, creating the room if it does not exist.
    ///
    /// An occupied host slot is silently overwritten (last-writer-wins);
    /// the outcome reports the displaced host so the caller can apply
    /// policy. Joining as host also clears the connection from the
    /// room's viewer set, keeping the host-XOR-viewer invariant.
    pub fn join_as_host(&mut self, room_id: &RoomId, conn: &ConnId) -> JoinOutcome {
        let room = self.rooms.entry(room_id.clone()).or_default();
        room.viewers.remove(conn);
        match room.host.replace(conn.clone()) {
            Some(prev) if prev != *conn => JoinOutcome::ReplacedHost(prev),
            _ => JoinOutcome::NewHost,
        }
    }

    /// Join a room as viewer, creating a hostless room if needed.
    ///
    /// Idempotent when already a viewer. A connection holding the host
    /// slot of this room is demoted: the latest join wins, mirroring
    /// host replacement, with no notification for the role change.
    pub fn join_as_viewer(&mut self, room_id: &RoomId, conn: &ConnId) {
        let room = self.rooms.entry(room_id.clone()).or_default();
        if room.host.as_ref() == Some(conn) {
            room.host = None;
        }
        room.viewers.insert(conn.clone());
    }

    /// Current host of a room, if the room exists and has one
    pub fn current_host(&self, room_id: &RoomId) -> Option<ConnId> {
        self.rooms.get(room_id).and_then(|room| room.host.clone())
    }

    /// Remove a connection from every room it appears in.
    ///
    /// By convention a connection belongs to at most one room, but the
    /// registry does not assume that: the scan covers all rooms, host
    /// and viewer slots both. Rooms left empty are deleted on the spot.
    pub fn remove_connection(&mut self, conn: &ConnId) -> RemovalEffect {
        let mut effect = RemovalEffect::default();
        self.rooms.retain(|room_id, room| {
            if room.host.as_ref() == Some(conn) {
                room.host = None;
                effect.host_departed.push(room_id.clone());
            }
            room.viewers.remove(conn);
            !room.is_empty()
        });
        effect
    }

    /// Snapshot of a room's members (host + viewers) for broadcast.
    ///
    /// Joins that land after the snapshot is taken are not part of it.
    pub fn members(&self, room_id: &RoomId) -> Vec<ConnId> {
        match self.rooms.get(room_id) {
            Some(room) => room
                .host
                .iter()
                .chain(room.viewers.iter())
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Look up a room
    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Number of live rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Iterate over all rooms
    pub fn iter(&self) -> impl Iterator<Item = (&RoomId, &Room)> {
        self.rooms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str) -> ConnId {
        ConnId::new(id)
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id)
    }

    // ========== Host joins ==========

    #[test]
    fn host_join_creates_room() {
        let mut reg = Registry::new();
        let outcome = reg.join_as_host(&room("r1"), &conn("h"));

        assert_eq!(outcome, JoinOutcome::NewHost);
        assert_eq!(reg.current_host(&room("r1")), Some(conn("h")));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn host_join_fills_empty_slot() {
        let mut reg = Registry::new();
        reg.join_as_viewer(&room("r1"), &conn("v"));
        assert_eq!(reg.current_host(&room("r1")), None);

        let outcome = reg.join_as_host(&room("r1"), &conn("h"));
        assert_eq!(outcome, JoinOutcome::NewHost);
        assert_eq!(reg.current_host(&room("r1")), Some(conn("h")));
    }

    #[test]
    fn second_host_replaces_first() {
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("h1"));
        let outcome = reg.join_as_host(&room("r1"), &conn("h2"));

        assert_eq!(outcome, JoinOutcome::ReplacedHost(conn("h1")));
        // At most one host at any time: replaced, never duplicated
        assert_eq!(reg.current_host(&room("r1")), Some(conn("h2")));
    }

    #[test]
    fn host_rejoin_is_not_a_replacement() {
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("h"));
        let outcome = reg.join_as_host(&room("r1"), &conn("h"));

        assert_eq!(outcome, JoinOutcome::NewHost);
        assert_eq!(reg.current_host(&room("r1")), Some(conn("h")));
    }

    #[test]
    fn viewer_promoting_to_host_leaves_viewer_set() {
        let mut reg = Registry::new();
        reg.join_as_viewer(&room("r1"), &conn("a"));
        reg.join_as_host(&room("r1"), &conn("a"));

        let r = reg.room(&room("r1")).unwrap();
        assert_eq!(r.host(), Some(&conn("a")));
        assert!(!r.viewers().contains(&conn("a")));
    }

    // ========== Viewer joins ==========

    #[test]
    fn viewer_join_creates_hostless_room() {
        let mut reg = Registry::new();
        reg.join_as_viewer(&room("r1"), &conn("v"));

        let r = reg.room(&room("r1")).unwrap();
        assert_eq!(r.host(), None);
        assert!(r.viewers().contains(&conn("v")));
    }

    #[test]
    fn viewer_join_is_idempotent() {
        let mut reg = Registry::new();
        reg.join_as_viewer(&room("r1"), &conn("v"));
        reg.join_as_viewer(&room("r1"), &conn("v"));

        assert_eq!(reg.room(&room("r1")).unwrap().viewers().len(), 1);
    }

    #[test]
    fn host_demoting_to_viewer_clears_host_slot() {
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("a"));
        reg.join_as_viewer(&room("r1"), &conn("a"));

        let r = reg.room(&room("r1")).unwrap();
        assert_eq!(r.host(), None);
        assert!(r.viewers().contains(&conn("a")));
    }

    // ========== Removal and eager GC ==========

    #[test]
    fn remove_host_reports_departure_and_keeps_room_with_viewers() {
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("h"));
        reg.join_as_viewer(&room("r1"), &conn("v"));

        let effect = reg.remove_connection(&conn("h"));
        assert_eq!(effect.host_departed, vec![room("r1")]);

        // Room survives: the viewer is still in it
        let r = reg.room(&room("r1")).unwrap();
        assert_eq!(r.host(), None);
        assert_eq!(r.viewers().len(), 1);
    }

    #[test]
    fn remove_sole_host_deletes_room() {
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("h"));

        let effect = reg.remove_connection(&conn("h"));
        assert_eq!(effect.host_departed, vec![room("r1")]);
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_sole_viewer_deletes_room() {
        let mut reg = Registry::new();
        reg.join_as_viewer(&room("r1"), &conn("v"));

        let effect = reg.remove_connection(&conn("v"));
        assert!(effect.host_departed.is_empty());
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_viewer_reports_nothing() {
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("h"));
        reg.join_as_viewer(&room("r1"), &conn("v"));

        let effect = reg.remove_connection(&conn("v"));
        assert!(effect.host_departed.is_empty());
        assert_eq!(reg.room(&room("r1")).unwrap().viewers().len(), 0);
    }

    #[test]
    fn remove_unknown_connection_is_noop() {
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("h"));

        let effect = reg.remove_connection(&conn("ghost"));
        assert!(effect.host_departed.is_empty());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn removal_scans_every_room() {
        // The registry does not assume one-room-per-connection
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("x"));
        reg.join_as_viewer(&room("r2"), &conn("x"));
        reg.join_as_viewer(&room("r2"), &conn("other"));

        let effect = reg.remove_connection(&conn("x"));
        assert_eq!(effect.host_departed, vec![room("r1")]);
        assert!(reg.room(&room("r1")).is_none()); // emptied, deleted
        assert!(!reg.room(&room("r2")).unwrap().viewers().contains(&conn("x")));
    }

    #[test]
    fn no_stale_references_after_removal() {
        let mut reg = Registry::new();
        for i in 0..5 {
            reg.join_as_viewer(&room(&format!("r{}", i)), &conn("x"));
            reg.join_as_viewer(&room(&format!("r{}", i)), &conn("keep"));
        }
        reg.join_as_host(&room("r0"), &conn("x"));

        reg.remove_connection(&conn("x"));
        for (_, r) in reg.iter() {
            assert_ne!(r.host(), Some(&conn("x")));
            assert!(!r.viewers().contains(&conn("x")));
        }
    }

    // ========== Snapshots ==========

    #[test]
    fn members_includes_host_and_viewers() {
        let mut reg = Registry::new();
        reg.join_as_host(&room("r1"), &conn("h"));
        reg.join_as_viewer(&room("r1"), &conn("v1"));
        reg.join_as_viewer(&room("r1"), &conn("v2"));

        let members = reg.members(&room("r1"));
        assert_eq!(members.len(), 3);
        assert!(members.contains(&conn("h")));
        assert!(members.contains(&conn("v1")));
        assert!(members.contains(&conn("v2")));
    }

    #[test]
    fn members_of_unknown_room_is_empty() {
        let reg = Registry::new();
        assert!(reg.members(&room("nope")).is_empty());
    }
}
