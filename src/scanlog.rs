use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type RecordId = u64;

/// Persistence status of one scan record. Advances exactly once, from
/// `Pending` to either terminal variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "Pending",
            SyncStatus::Synced => "Synced",
            SyncStatus::Failed => "Failed",
        }
    }
}

/// One inventory scan. Immutable once appended, apart from the single
/// sync-status advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: RecordId,
    pub session: u32,
    pub item_label: String,
    pub timestamp_ms: u64,
    pub sync_status: SyncStatus,
    pub sync_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLogStats {
    pub appended: u64,
    pub synced: u64,
    pub failed: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanLogError {
    #[error("no scan record with id {0}")]
    UnknownRecord(RecordId),
    #[error("scan record {id} already resolved to {status:?}")]
    AlreadyResolved { id: RecordId, status: SyncStatus },
}

/// Append-only record store and the sole writer of sync status.
///
/// `append` is local-only: it never talks to the durable store and never
/// fails. Sink outcomes arrive later through `mark_synced`/`mark_failed`.
#[derive(Debug)]
pub struct ScanLog {
    records: Vec<ScanRecord>,
    next_id: RecordId,
    synced: u64,
    failed: u64,
}

impl ScanLog {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
            synced: 0,
            failed: 0,
        }
    }

    /// Appends a `Pending` record and returns its id. Ids are assigned
    /// monotonically from 1.
    pub fn append(&mut self, item_label: &str, session: u32, timestamp_ms: u64) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;

        self.records.push(ScanRecord {
            id,
            session,
            item_label: item_label.to_string(),
            timestamp_ms,
            sync_status: SyncStatus::Pending,
            sync_error: None,
        });

        id
    }

    pub fn mark_synced(&mut self, id: RecordId) -> Result<(), ScanLogError> {
        let record = self.pending_mut(id)?;
        record.sync_status = SyncStatus::Synced;
        self.synced += 1;
        Ok(())
    }

    pub fn mark_failed(&mut self, id: RecordId, reason: &str) -> Result<(), ScanLogError> {
        let record = self.pending_mut(id)?;
        record.sync_status = SyncStatus::Failed;
        record.sync_error = Some(reason.to_string());
        self.failed += 1;
        Ok(())
    }

    /// Most-recent-first window over the log, bounded by `n` or the total
    /// count.
    pub fn recent(&self, n: usize) -> Vec<ScanRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    pub fn get(&self, id: RecordId) -> Option<&ScanRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> ScanLogStats {
        let appended = self.records.len() as u64;
        ScanLogStats {
            appended,
            synced: self.synced,
            failed: self.failed,
            pending: appended - self.synced - self.failed,
        }
    }

    fn pending_mut(&mut self, id: RecordId) -> Result<&mut ScanRecord, ScanLogError> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(ScanLogError::UnknownRecord(id))?;

        if record.sync_status != SyncStatus::Pending {
            return Err(ScanLogError::AlreadyResolved {
                id,
                status: record.sync_status,
            });
        }

        Ok(record)
    }
}

impl Default for ScanLog {
    fn default() -> Self {
        Self::new()
    }
}
