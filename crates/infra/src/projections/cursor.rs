//! Per-stream sequence cursors shared by the ledger projections.

use std::collections::HashMap;
use std::sync::Mutex;

use stockroom_core::{AggregateId, TenantId};

use super::ProjectionError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// Last applied sequence number per `(tenant, aggregate)` stream.
///
/// Gives at-least-once delivery exactly-once effect: replays at or below the
/// cursor are skipped, and a jump past `last + 1` is reported as a gap so the
/// caller can catch up from the store instead of silently losing events.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: Mutex<HashMap<CursorKey, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `apply` if `sequence_number` is the next one for the stream, then advance.
    ///
    /// The cursor lock is held while applying so two deliveries of the same
    /// stream cannot interleave. Returns whether `apply` ran.
    pub fn advance_with(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        sequence_number: u64,
        apply: impl FnOnce() -> Result<(), ProjectionError>,
    ) -> Result<bool, ProjectionError> {
        let mut cursors = self.inner.lock().map_err(|_| ProjectionError::Poisoned)?;
        let key = CursorKey {
            tenant_id,
            aggregate_id,
        };
        let last = cursors.get(&key).copied().unwrap_or(0);

        if sequence_number == 0 {
            return Err(ProjectionError::Gap {
                last,
                found: sequence_number,
            });
        }
        if sequence_number <= last {
            return Ok(false);
        }
        if sequence_number != last + 1 {
            return Err(ProjectionError::Gap {
                last,
                found: sequence_number,
            });
        }

        apply()?;
        cursors.insert(key, sequence_number);
        Ok(true)
    }

    pub fn position(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> u64 {
        self.inner
            .lock()
            .ok()
            .and_then(|c| {
                c.get(&CursorKey {
                    tenant_id,
                    aggregate_id,
                })
                .copied()
            })
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut cursors) = self.inner.lock() {
            cursors.clear();
        }
    }
}
