use crate::scanlog::{RecordId, ScanRecord};

/// Result of one persistence attempt, reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Synced,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub record_id: RecordId,
    pub outcome: SinkOutcome,
}

/// Durable-store hand-off.
///
/// `submit` must return immediately; outcomes come back later through
/// `poll_reports`, at most one report per submitted record. A sink never
/// mutates records; the scan log applies its reports.
pub trait ScanSink: Send {
    fn submit(&mut self, record: &ScanRecord);
    fn poll_reports(&mut self) -> Vec<SinkReport>;
}

/// Acknowledges every submitted record on the next poll.
#[derive(Debug, Default)]
pub struct InstantSink {
    queued: Vec<RecordId>,
}

impl InstantSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScanSink for InstantSink {
    fn submit(&mut self, record: &ScanRecord) {
        self.queued.push(record.id);
    }

    fn poll_reports(&mut self) -> Vec<SinkReport> {
        self.queued
            .drain(..)
            .map(|record_id| SinkReport {
                record_id,
                outcome: SinkOutcome::Synced,
            })
            .collect()
    }
}

/// Accepts submissions and never reports back; records stay `Pending`.
#[derive(Debug, Default)]
pub struct DropSink {
    submitted: u64,
}

impl DropSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }
}

impl ScanSink for DropSink {
    fn submit(&mut self, _record: &ScanRecord) {
        self.submitted += 1;
    }

    fn poll_reports(&mut self) -> Vec<SinkReport> {
        Vec::new()
    }
}

/// Fails a configurable percentage of records, deterministically per seed.
#[derive(Debug)]
pub struct FlakySink {
    queued: Vec<RecordId>,
    fail_percent: u8,
    rng_state: u64,
}

impl FlakySink {
    pub fn new(fail_percent: u8, seed: u64) -> Self {
        Self {
            queued: Vec::new(),
            fail_percent: fail_percent.min(100),
            rng_state: seed,
        }
    }

    fn next_random(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.rng_state
    }
}

impl ScanSink for FlakySink {
    fn submit(&mut self, record: &ScanRecord) {
        self.queued.push(record.id);
    }

    fn poll_reports(&mut self) -> Vec<SinkReport> {
        let queued: Vec<RecordId> = self.queued.drain(..).collect();
        queued
            .into_iter()
            .map(|record_id| {
                let roll = (self.next_random() % 100) as u8;
                let outcome = if roll < self.fail_percent {
                    SinkOutcome::Failed("store rejected write".to_string())
                } else {
                    SinkOutcome::Synced
                };
                SinkReport { record_id, outcome }
            })
            .collect()
    }
}
