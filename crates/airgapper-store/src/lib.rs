//! Generic, file-backed store of approval-tracking records (spec.md §4.2).
//!
//! One JSON file per record at `<data_dir>/<id>.json`. Parameterized over any
//! `T: ApprovalRecord` so the same expiry/approval/quorum logic serves both
//! `RestoreRequest` and `DeletionRequest` (spec.md §9 "polymorphic store").

pub mod error;
pub mod fsutil;

pub use error::StoreError;

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use airgapper_core::{Approval, ApprovalRecord, RequestStatus, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

pub struct RequestStore<T> {
    data_dir: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> RequestStore<T>
where
    T: ApprovalRecord + Serialize + DeserializeOwned + Clone,
{
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fsutil::ensure_dir_0700(&data_dir)?;
        Ok(Self { data_dir, _marker: PhantomData })
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{id}.json"))
    }

    /// Sibling lock file for `id`, distinct from the record file itself so
    /// that acquiring a lock never has the side effect of creating (and thus
    /// masking the absence of) the record (spec.md §4.2 "Get").
    fn lock_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{id}.json.lock"))
    }

    fn read_raw(&self, id: &str) -> Result<T, StoreError> {
        let path = self.record_path(id);
        let bytes = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(id.to_string())
            } else {
                StoreError::from(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_raw(&self, record: &T) -> Result<(), StoreError> {
        let path = self.record_path(record.id());
        let bytes = serde_json::to_vec_pretty(record)?;
        fsutil::write_atomic_0600(&path, &bytes)?;
        Ok(())
    }

    /// Persist `record` as-is.
    pub fn save(&self, record: &T) -> Result<(), StoreError> {
        self.write_raw(record)
    }

    /// Fetch a record by ID. If it is `Pending` and past its `expires_at`,
    /// transitions it to `Expired` and persists that transition before
    /// returning it (spec.md §4.2 "Get", lazy + idempotent expiry, §5).
    pub fn get(&self, id: &str, now: Timestamp) -> Result<T, StoreError> {
        let _lock = fsutil::RecordLock::acquire(&self.lock_path(id))?;
        let mut record = self.read_raw(id)?;
        if record.status() == RequestStatus::Pending && now > record.expires_at() {
            record.set_status(RequestStatus::Expired);
            self.write_raw(&record)?;
            warn!(id, "request expired on read");
        }
        Ok(record)
    }

    /// Enumerate all well-formed `*.json` records, skipping any that fail
    /// to parse (spec.md §4.2 "List").
    pub fn list(&self) -> Result<Vec<T>, StoreError> {
        let mut out = Vec::new();
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read(&path).and_then(|b| {
                serde_json::from_slice::<T>(&b).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }) {
                Ok(record) => out.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unparseable record"),
            }
        }
        Ok(out)
    }

    /// `list()` filtered to currently-pending records (without triggering
    /// lazy expiry transitions — callers that need fresh status should call
    /// `get` on the IDs of interest).
    pub fn list_pending(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.list()?.into_iter().filter(|r| r.status() == RequestStatus::Pending).collect())
    }

    /// Append a verified approval/signature to a pending, non-expired
    /// record, transitioning it to `Approved` the moment quorum is reached
    /// (spec.md §4.2 "AddApproval").
    pub fn add_approval(
        &self,
        id: &str,
        key_holder_id: &str,
        key_holder_name: &str,
        signature: Vec<u8>,
        now: Timestamp,
    ) -> Result<T, StoreError> {
        let _lock = fsutil::RecordLock::acquire(&self.lock_path(id))?;

        let mut record = self.read_raw(id)?;
        if record.status() != RequestStatus::Pending {
            return Err(StoreError::NotPending);
        }
        if now > record.expires_at() {
            record.set_status(RequestStatus::Expired);
            self.write_raw(&record)?;
            return Err(StoreError::Expired);
        }
        if record.approvals().iter().any(|a| a.key_holder_id == key_holder_id) {
            return Err(StoreError::AlreadyApproved(key_holder_id.to_string()));
        }

        record.push_approval(Approval {
            key_holder_id: key_holder_id.to_string(),
            key_holder_name: key_holder_name.to_string(),
            signature,
            approved_at: now,
        });
        if record.approvals().len() >= record.required_approvals() {
            record.set_status(RequestStatus::Approved);
            info!(id, "quorum reached, request approved");
        }
        self.write_raw(&record)?;
        Ok(record)
    }

    /// Deny a pending record (spec.md §4.2 "Deny").
    pub fn deny(&self, id: &str, now: Timestamp) -> Result<T, StoreError> {
        let _lock = fsutil::RecordLock::acquire(&self.lock_path(id))?;

        let mut record = self.read_raw(id)?;
        if record.status() != RequestStatus::Pending {
            return Err(StoreError::NotPending);
        }
        let _ = now;
        record.set_status(RequestStatus::Denied);
        self.write_raw(&record)?;
        Ok(record)
    }

    pub fn has_enough_approvals(&self, id: &str) -> Result<bool, StoreError> {
        let record = self.read_raw(id)?;
        Ok(record.approvals().len() >= record.required_approvals())
    }

    pub fn get_approval_progress(&self, id: &str) -> Result<(usize, usize), StoreError> {
        let record = self.read_raw(id)?;
        Ok((record.approvals().len(), record.required_approvals()))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
