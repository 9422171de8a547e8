//! Conn-stream table.
//!
//! # Responsibilities
//! - Own every conn-stream in a slot arena
//! - Hand out generational ids so a stale back-reference resolves to `None`
//! - Build conn-streams for muxes, applets, streams and health checks
//! - Refuse to free a conn-stream that is still attached
//!
//! # Design Decisions
//! - Freed slots are reused, with their generation bumped
//! - Capacity is bounded by configuration (0 = unbounded)

use std::fmt;

use bytes::Bytes;

use crate::app::{CheckId, Session, StreamEngine, StreamId};
use crate::config::TableConfig;
use crate::conn_stream::{ConnStream, ConnStreamFlags};
use crate::endpoint::{Endpoint, EndpointKind};
use crate::error::{ConnStreamError, ConnStreamResult};
use crate::net::Connection;
use crate::observability::metrics;

/// Handle to a conn-stream in a [`ConnStreamTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ConnStreamId {
    index: u32,
    generation: u32,
}

impl ConnStreamId {
    /// Packs the id into a single word, for atomics.
    pub(crate) fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl fmt::Display for ConnStreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cs-{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<ConnStream>,
}

/// Owner of all conn-streams of an execution context.
#[derive(Debug)]
pub struct ConnStreamTable {
    slots: Vec<Slot>,
    vacant: Vec<u32>,
    live: usize,
    max: usize,
}

impl ConnStreamTable {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            slots: Vec::with_capacity(config.initial_capacity),
            vacant: Vec::new(),
            live: 0,
            max: config.max_conn_streams,
        }
    }

    /// Number of live conn-streams.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, id: ConnStreamId) -> Option<&ConnStream> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    pub fn get_mut(&mut self, id: ConnStreamId) -> Option<&mut ConnStream> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    pub fn contains(&self, id: ConnStreamId) -> bool {
        self.get(id).is_some()
    }

    /// Live conn-streams with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ConnStreamId, &ConnStream)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|cs| {
                (
                    ConnStreamId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    cs,
                )
            })
        })
    }

    fn insert(&mut self, cs: ConnStream, origin: &'static str) -> ConnStreamResult<ConnStreamId> {
        if self.max != 0 && self.live >= self.max {
            tracing::warn!(max = self.max, origin, "Conn-stream table full");
            return Err(ConnStreamError::TableFull(self.max));
        }

        let id = match self.vacant.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(cs);
                ConnStreamId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(cs),
                });
                ConnStreamId {
                    index,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        metrics::record_created(origin);
        tracing::trace!(cs = %id, origin, "Conn-stream allocated");
        Ok(id)
    }

    /// Drop the slot's content without any attachment check.
    fn release(&mut self, id: ConnStreamId) -> Option<ConnStream> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let cs = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(id.index);
        self.live -= 1;
        metrics::record_freed();
        Some(cs)
    }

    /// New conn-stream on `endpoint` (possibly empty), no application.
    pub fn new_cs(&mut self, endpoint: Endpoint) -> ConnStreamResult<ConnStreamId> {
        self.insert(ConnStream::new(endpoint), "endpoint")
    }

    /// New conn-stream for a mux stream, with a stream built right away by
    /// `engine` for `session`, seeded with `input`.
    pub fn new_from_mux(
        &mut self,
        endpoint: Endpoint,
        session: &Session,
        input: Bytes,
        engine: &mut dyn StreamEngine,
    ) -> ConnStreamResult<ConnStreamId> {
        self.new_from_endpoint(EndpointKind::Mux, endpoint, session, input, engine)
    }

    /// New conn-stream for an applet, with a stream built right away.
    pub fn new_from_applet(
        &mut self,
        endpoint: Endpoint,
        session: &Session,
        input: Bytes,
        engine: &mut dyn StreamEngine,
    ) -> ConnStreamResult<ConnStreamId> {
        self.new_from_endpoint(EndpointKind::Applet, endpoint, session, input, engine)
    }

    fn new_from_endpoint(
        &mut self,
        expected: EndpointKind,
        endpoint: Endpoint,
        session: &Session,
        input: Bytes,
        engine: &mut dyn StreamEngine,
    ) -> ConnStreamResult<ConnStreamId> {
        let actual = endpoint.kind();
        if actual != expected {
            return Err(ConnStreamError::EndpointKind { expected, actual });
        }

        let origin = match expected {
            EndpointKind::Applet => "applet",
            _ => "mux",
        };
        let id = self.insert(ConnStream::new(endpoint), origin)?;

        match engine.create_stream(session, id, input) {
            Ok(stream) => {
                if let Some(cs) = self.get_mut(id) {
                    cs.attach_strm(stream)?;
                }
                tracing::debug!(cs = %id, session = %session.id, stream = %stream, "Stream created for conn-stream");
                Ok(id)
            }
            Err(e) => {
                // the endpoint owner gets the error back and keeps its resources
                self.release(id);
                tracing::warn!(session = %session.id, error = %e, "Stream creation failed");
                Err(ConnStreamError::Engine(e.to_string()))
            }
        }
    }

    /// New conn-stream driven by `stream`, endpoint left for the caller.
    pub fn new_from_strm(
        &mut self,
        stream: StreamId,
        flags: ConnStreamFlags,
    ) -> ConnStreamResult<ConnStreamId> {
        self.insert(ConnStream::from_strm(stream, flags), "stream")
    }

    /// New conn-stream driven by health check `check`, endpoint left for the
    /// caller.
    pub fn new_from_check(
        &mut self,
        check: CheckId,
        flags: ConnStreamFlags,
    ) -> ConnStreamResult<ConnStreamId> {
        self.insert(ConnStream::from_check(check, flags), "check")
    }

    /// Free a conn-stream. Both sides must be detached first.
    pub fn free(&mut self, id: ConnStreamId) -> ConnStreamResult<()> {
        let cs = self.get(id).ok_or(ConnStreamError::UnknownConnStream(id))?;
        let side = if cs.endpoint().kind() != EndpointKind::None {
            Some("endpoint")
        } else if !cs.app().is_none() {
            Some("application")
        } else {
            None
        };
        if let Some(side) = side {
            tracing::warn!(cs = %id, side, "Refusing to free attached conn-stream");
            return Err(ConnStreamError::StillAttached { id, side });
        }

        self.release(id);
        tracing::trace!(cs = %id, "Conn-stream freed");
        Ok(())
    }

    /// Recycle the endpoint of conn-stream `id`.
    pub fn reset_endp(&mut self, id: ConnStreamId) -> ConnStreamResult<()> {
        self.get_mut(id)
            .ok_or(ConnStreamError::UnknownConnStream(id))?
            .reset_endp()
    }
}

impl Default for ConnStreamTable {
    fn default() -> Self {
        Self::new(&TableConfig::default())
    }
}

/// Any valid conn-stream carried by `conn`, preferably the first one.
///
/// Used for source binding or PROXY header emission on private connections.
/// `None` when there is no connection, no mux, no such capability, or no
/// live conn-stream.
pub fn get_first(conn: Option<&Connection>) -> Option<ConnStreamId> {
    let conn = conn?;
    conn.mux()?.get_first_stream(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppRef;

    #[test]
    fn stale_id_does_not_resolve() {
        let mut table = ConnStreamTable::default();
        let first = table.new_cs(Endpoint::new()).unwrap();
        table.free(first).unwrap();
        assert!(table.get(first).is_none());

        // slot reused with a new generation
        let second = table.new_cs(Endpoint::new()).unwrap();
        assert_eq!(first.index, second.index);
        assert_ne!(first, second);
        assert!(table.get(first).is_none());
        assert!(table.get(second).is_some());
        assert_eq!(
            table.free(first),
            Err(ConnStreamError::UnknownConnStream(first))
        );
    }

    #[test]
    fn free_refuses_attached_app() {
        let mut table = ConnStreamTable::default();
        let id = table
            .new_from_strm(StreamId::new(1), ConnStreamFlags::NONE)
            .unwrap();
        assert_eq!(
            table.free(id),
            Err(ConnStreamError::StillAttached {
                id,
                side: "application"
            })
        );

        table.get_mut(id).unwrap().detach_app();
        table.free(id).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut table = ConnStreamTable::new(&TableConfig {
            initial_capacity: 1,
            max_conn_streams: 2,
        });
        let a = table.new_cs(Endpoint::new()).unwrap();
        table.new_cs(Endpoint::new()).unwrap();
        assert_eq!(
            table.new_cs(Endpoint::new()),
            Err(ConnStreamError::TableFull(2))
        );

        table.free(a).unwrap();
        assert!(table.new_cs(Endpoint::new()).is_ok());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn new_from_check_binds_app() {
        let mut table = ConnStreamTable::default();
        let id = table
            .new_from_check(CheckId::new(3), ConnStreamFlags::ISBACK)
            .unwrap();
        let cs = table.get(id).unwrap();
        assert_eq!(cs.app(), AppRef::Check(CheckId::new(3)));
        assert!(cs.is_back());
        assert_eq!(cs.endpoint().kind(), EndpointKind::None);
    }

    #[test]
    fn caller_flags_are_stored_as_given() {
        let mut table = ConnStreamTable::default();
        let strm_flags = ConnStreamFlags::NOHALF | ConnStreamFlags::DONT_WAKE;
        let strm = table.new_from_strm(StreamId::new(1), strm_flags).unwrap();
        let check_flags = ConnStreamFlags::ISBACK | ConnStreamFlags::NOLINGER | ConnStreamFlags::DONT_WAKE;
        let check = table.new_from_check(CheckId::new(1), check_flags).unwrap();

        let cs = table.get(strm).unwrap();
        assert_eq!(cs.flags(), strm_flags);
        assert_eq!(cs.flags().to_string(), "NOHALF|DONT_WAKE");
        assert!(!cs.is_back());

        let cs = table.get(check).unwrap();
        assert_eq!(cs.flags(), check_flags);
        assert!(cs.is_back());
    }

    #[test]
    fn raw_round_trip() {
        let id = ConnStreamId {
            index: 7,
            generation: 3,
        };
        assert_eq!(ConnStreamId::from_raw(id.to_raw()), id);
    }

    #[test]
    fn get_first_without_connection() {
        assert_eq!(get_first(None), None);
        let conn = Connection::new(None);
        assert_eq!(get_first(Some(&conn)), None);
    }

    #[test]
    fn iter_lists_live_entries() {
        let mut table = ConnStreamTable::default();
        let a = table.new_cs(Endpoint::new()).unwrap();
        let b = table.new_cs(Endpoint::new()).unwrap();
        table.free(a).unwrap();
        let ids: Vec<_> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b]);
    }
}
