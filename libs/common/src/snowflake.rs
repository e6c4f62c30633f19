use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// 2025-01-01T00:00:00Z, in Unix milliseconds.
const TELEHEALTH_EPOCH_MS: u64 = 1_735_689_600_000;

const WORKER_SHIFT: u32 = 12;
const TIME_SHIFT: u32 = 22;
const SEQUENCE_LIMIT: u64 = 1 << WORKER_SHIFT;

/// Largest worker id that fits in the 10-bit worker field.
pub const MAX_WORKER_ID: u16 = (1 << (TIME_SHIFT - WORKER_SHIFT)) - 1;

/// Allocates the 64-bit ids of persisted chat messages.
///
/// An id packs the milliseconds since the service epoch (42 bits), the worker
/// id (10 bits) and a per-millisecond sequence (12 bits). Ids from one
/// generator strictly increase, which orders messages stored within the same
/// millisecond.
pub struct SnowflakeGenerator {
    worker_bits: u64,
    clock: fn() -> u64,
    /// (millisecond of the last id, sequence used in it)
    last: Mutex<(u64, u64)>,
}

impl SnowflakeGenerator {
    /// Worker ids wider than 10 bits are masked down.
    pub fn new(worker_id: u16) -> Self {
        Self::with_clock(worker_id, unix_ms)
    }

    fn with_clock(worker_id: u16, clock: fn() -> u64) -> Self {
        Self {
            worker_bits: u64::from(worker_id & MAX_WORKER_ID) << WORKER_SHIFT,
            clock,
            last: Mutex::new((0, 0)),
        }
    }

    pub fn generate(&self) -> i64 {
        let mut last = self.last.lock();
        let (last_ms, last_seq) = *last;

        // Never step back in time, even if the wall clock does.
        let mut ms = (self.clock)().max(last_ms);
        let mut seq = 0;
        if ms == last_ms {
            seq = last_seq + 1;
            if seq == SEQUENCE_LIMIT {
                // Run ahead of the clock; later calls catch up via `max`.
                ms = last_ms + 1;
                seq = 0;
            }
        }
        *last = (ms, seq);

        let elapsed = ms.saturating_sub(TELEHEALTH_EPOCH_MS);
        ((elapsed << TIME_SHIFT) | self.worker_bits | seq) as i64
    }
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(TELEHEALTH_EPOCH_MS)
}
