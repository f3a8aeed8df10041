//! Per-user sale batch buffers.
//!
//! Staff queue sales during a rush and flush them in one `log_buffer_sales` call.
//! Buffers live in memory only and are lost on restart.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use uuid::Uuid;

use crate::store::rpc::SaleLineParam;

/// A pending sale entry
#[derive(Debug, Clone, Serialize)]
pub struct BufferEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub line: SaleLineParam,
    pub added_at: DateTime<Utc>,
}

/// All users' buffers
pub struct SaleBuffers {
    entries: DashMap<Uuid, Vec<BufferEntry>>,
    /// Users with a flush in flight
    flushing: DashSet<Uuid>,
    capacity: usize,
}

impl SaleBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            flushing: DashSet::new(),
            capacity,
        }
    }

    pub fn add(&self, user_id: Uuid, line: SaleLineParam) -> Result<BufferEntry, BufferError> {
        let mut buffer = self.entries.entry(user_id).or_default();
        if buffer.len() >= self.capacity {
            return Err(BufferError::Full { capacity: self.capacity });
        }

        let entry = BufferEntry {
            id: Uuid::new_v4(),
            line,
            added_at: Utc::now(),
        };
        buffer.push(entry.clone());
        Ok(entry)
    }

    /// Entries in insertion order
    pub fn list(&self, user_id: Uuid) -> Vec<BufferEntry> {
        self.entries
            .get(&user_id)
            .map(|buffer| buffer.value().clone())
            .unwrap_or_default()
    }

    pub fn remove(&self, user_id: Uuid, entry_id: Uuid) -> Result<BufferEntry, BufferError> {
        self.ensure_idle(user_id)?;
        let mut buffer = self
            .entries
            .get_mut(&user_id)
            .ok_or(BufferError::NotFound(entry_id))?;
        let index = buffer
            .iter()
            .position(|entry| entry.id == entry_id)
            .ok_or(BufferError::NotFound(entry_id))?;
        Ok(buffer.remove(index))
    }

    /// Drop every entry; returns how many were dropped
    pub fn clear(&self, user_id: Uuid) -> Result<usize, BufferError> {
        self.ensure_idle(user_id)?;
        Ok(self
            .entries
            .remove(&user_id)
            .map(|(_, buffer)| buffer.len())
            .unwrap_or(0))
    }

    /// Snapshot the buffer and mark it in flight until the returned flush is dropped.
    ///
    /// A second flush for the same user fails with [`BufferError::FlushInProgress`].
    pub fn begin_flush(&self, user_id: Uuid) -> Result<PendingFlush<'_>, BufferError> {
        if !self.flushing.insert(user_id) {
            return Err(BufferError::FlushInProgress);
        }
        Ok(PendingFlush {
            buffers: self,
            user_id,
            entries: self.list(user_id),
        })
    }

    /// Entries buffered across all users
    pub fn total_entries(&self) -> usize {
        self.entries.iter().map(|buffer| buffer.len()).sum()
    }

    fn ensure_idle(&self, user_id: Uuid) -> Result<(), BufferError> {
        if self.flushing.contains(&user_id) {
            Err(BufferError::FlushInProgress)
        } else {
            Ok(())
        }
    }

    /// Remove exactly the flushed entries, keeping anything added meanwhile
    fn commit(&self, user_id: Uuid, flushed: &HashSet<Uuid>) -> usize {
        let (removed, now_empty) = match self.entries.get_mut(&user_id) {
            Some(mut buffer) => {
                let before = buffer.len();
                buffer.retain(|entry| !flushed.contains(&entry.id));
                (before - buffer.len(), buffer.is_empty())
            }
            None => (0, false),
        };
        if now_empty {
            self.entries.remove_if(&user_id, |_, buffer| buffer.is_empty());
        }
        removed
    }
}

/// A buffer snapshot being flushed; dropping it without [`PendingFlush::commit`] leaves the
/// buffer as it was
pub struct PendingFlush<'a> {
    buffers: &'a SaleBuffers,
    user_id: Uuid,
    entries: Vec<BufferEntry>,
}

impl PendingFlush<'_> {
    pub fn entries(&self) -> &[BufferEntry] {
        &self.entries
    }

    /// Remove the snapshot's entries after a successful flush; returns how many were removed
    pub fn commit(self) -> usize {
        let flushed: HashSet<Uuid> = self.entries.iter().map(|e| e.id).collect();
        self.buffers.commit(self.user_id, &flushed)
    }
}

impl Drop for PendingFlush<'_> {
    fn drop(&mut self) {
        self.buffers.flushing.remove(&self.user_id);
    }
}

/// Buffer errors
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Sale buffer is full ({capacity} entries)")]
    Full { capacity: usize },

    #[error("Buffer entry not found: {0}")]
    NotFound(Uuid),

    #[error("A flush of this sale buffer is already in progress")]
    FlushInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: f64) -> SaleLineParam {
        SaleLineParam {
            menu_item_id: Uuid::new_v4(),
            quantity: 1.0,
            unit_price: price,
        }
    }

    #[test]
    fn buffers_are_per_user_and_ordered() {
        let buffers = SaleBuffers::new(10);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        buffers.add(alice, line(1.0)).unwrap();
        buffers.add(alice, line(2.0)).unwrap();
        buffers.add(bob, line(3.0)).unwrap();

        let prices: Vec<f64> = buffers.list(alice).iter().map(|e| e.line.unit_price).collect();
        assert_eq!(prices, vec![1.0, 2.0]);
        assert_eq!(buffers.list(bob).len(), 1);
        assert_eq!(buffers.total_entries(), 3);
    }

    #[test]
    fn capacity_is_enforced() {
        let buffers = SaleBuffers::new(2);
        let user = Uuid::new_v4();
        buffers.add(user, line(1.0)).unwrap();
        buffers.add(user, line(1.0)).unwrap();
        assert!(matches!(buffers.add(user, line(1.0)), Err(BufferError::Full { capacity: 2 })));
    }

    #[test]
    fn remove_and_clear() {
        let buffers = SaleBuffers::new(10);
        let user = Uuid::new_v4();
        let first = buffers.add(user, line(1.0)).unwrap();
        buffers.add(user, line(2.0)).unwrap();

        assert_eq!(buffers.remove(user, first.id).unwrap().id, first.id);
        assert!(matches!(buffers.remove(user, first.id), Err(BufferError::NotFound(_))));
        assert_eq!(buffers.clear(user).unwrap(), 1);
        assert_eq!(buffers.clear(user).unwrap(), 0);
        assert!(buffers.list(user).is_empty());
    }

    #[test]
    fn commit_keeps_entries_added_during_flush() {
        let buffers = SaleBuffers::new(10);
        let user = Uuid::new_v4();
        buffers.add(user, line(1.0)).unwrap();
        buffers.add(user, line(2.0)).unwrap();

        let flush = buffers.begin_flush(user).unwrap();
        let late = buffers.add(user, line(3.0)).unwrap();
        assert_eq!(flush.entries().len(), 2);
        assert_eq!(flush.commit(), 2);

        let remaining = buffers.list(user);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, late.id);

        buffers.begin_flush(user).unwrap().commit();
        assert_eq!(buffers.total_entries(), 0);
    }

    #[test]
    fn second_flush_is_refused_while_one_is_in_flight() {
        let buffers = SaleBuffers::new(10);
        let user = Uuid::new_v4();
        let entry = buffers.add(user, line(1.0)).unwrap();

        let first = buffers.begin_flush(user).unwrap();
        assert!(matches!(buffers.begin_flush(user), Err(BufferError::FlushInProgress)));
        assert!(matches!(buffers.remove(user, entry.id), Err(BufferError::FlushInProgress)));
        assert!(matches!(buffers.clear(user), Err(BufferError::FlushInProgress)));

        // Other users are unaffected
        assert!(buffers.begin_flush(Uuid::new_v4()).is_ok());

        drop(first);
        let retry = buffers.begin_flush(user).unwrap();
        assert_eq!(retry.entries().len(), 1);
    }

    #[test]
    fn abandoned_flush_leaves_the_buffer_intact() {
        let buffers = SaleBuffers::new(10);
        let user = Uuid::new_v4();
        buffers.add(user, line(1.0)).unwrap();
        buffers.add(user, line(2.0)).unwrap();

        drop(buffers.begin_flush(user).unwrap());

        assert_eq!(buffers.list(user).len(), 2);
        assert!(buffers.clear(user).is_ok());
    }
}
