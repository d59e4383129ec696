#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Owned report store.
//!
//! [`ReportStore`] holds the live report collection behind a single
//! `RwLock`: readers take cheap snapshots for the zone engine, and every
//! mutation (append, vote, deduplicated submit) runs under the one write
//! lock. A store opened with [`ReportStore::open`] additionally rewrites its
//! JSON snapshot file after each mutation.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use civic_pulse_report_models::{NewReport, Report};
use civic_pulse_zones::find_duplicate;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No report has the requested id.
    #[error("Report {id} not found")]
    NotFound {
        /// The requested id.
        id: i64,
    },

    /// A snapshot contained the same id twice.
    #[error("Duplicate report id {id} in snapshot")]
    DuplicateId {
        /// The repeated id.
        id: i64,
    },

    /// Reading or writing the snapshot file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot file could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Every representable id has been assigned.
    #[error("Report ids exhausted at {last}")]
    IdsExhausted {
        /// The id that could not be advanced past.
        last: i64,
    },
}

/// Result of a deduplicated submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The report was new and has been appended.
    Created(Report),
    /// The report duplicated an existing one, whose votes were incremented.
    Duplicate(Report),
}

impl SubmitOutcome {
    /// The stored report the submission resolved to.
    #[must_use]
    pub const fn report(&self) -> &Report {
        match self {
            Self::Created(report) | Self::Duplicate(report) => report,
        }
    }

    /// Whether the submission was folded into an existing report.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

#[derive(Debug)]
struct Inner {
    reports: Vec<Report>,
    next_id: i64,
}

impl Inner {
    fn position(&self, id: i64) -> Result<usize, StoreError> {
        self.reports
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound { id })
    }

    fn push(&mut self, report: NewReport) -> Result<Report, StoreError> {
        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or(StoreError::IdsExhausted { last: self.next_id })?;
        let report = Report::from_new(self.next_id, report, Utc::now());
        self.next_id = next_id;
        self.reports.push(report.clone());
        Ok(report)
    }

    /// Reverts the most recent [`Inner::push`].
    fn unpush(&mut self) {
        if let Some(report) = self.reports.pop() {
            self.next_id = report.id;
        }
    }

    fn upvote(&mut self, index: usize) -> Report {
        let report = &mut self.reports[index];
        report.votes += 1;
        report.clone()
    }

    fn downvote(&mut self, index: usize) {
        let report = &mut self.reports[index];
        report.votes = report.votes.saturating_sub(1);
    }
}

/// The live report collection.
#[derive(Debug)]
pub struct ReportStore {
    inner: RwLock<Inner>,
    path: Option<PathBuf>,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore {
    /// Creates an empty in-memory store. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                reports: Vec::new(),
                next_id: 1,
            }),
            path: None,
        }
    }

    /// Creates an in-memory store seeded with `reports`, preserving their
    /// order. New ids continue after the highest existing id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if two reports share an id, or
    /// [`StoreError::IdsExhausted`] if one of them already holds
    /// `i64::MAX`.
    pub fn from_reports(reports: Vec<Report>) -> Result<Self, StoreError> {
        let mut seen = BTreeSet::new();
        for report in &reports {
            if !seen.insert(report.id) {
                return Err(StoreError::DuplicateId { id: report.id });
            }
        }
        let next_id = match reports.iter().map(|r| r.id).max() {
            Some(last) => last
                .checked_add(1)
                .ok_or(StoreError::IdsExhausted { last })?,
            None => 1,
        };

        Ok(Self {
            inner: RwLock::new(Inner { reports, next_id }),
            path: None,
        })
    }

    /// Opens a store backed by the JSON snapshot at `path`.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read or parsed,
    /// or contains duplicate ids.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let reports = if path.exists() {
            load(&path)?
        } else {
            log::info!("No snapshot at {}, starting empty", path.display());
            Vec::new()
        };

        let mut store = Self::from_reports(reports)?;
        store.path = Some(path);
        Ok(store)
    }

    /// Returns a snapshot of every report in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn list(&self) -> Vec<Report> {
        self.read().reports.clone()
    }

    /// Returns a snapshot of every report, most recently added first.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn list_newest_first(&self) -> Vec<Report> {
        let mut reports = self.list();
        reports.reverse();
        reports
    }

    /// Looks up a report by id.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<Report> {
        self.read().reports.iter().find(|r| r.id == id).cloned()
    }

    /// Number of stored reports.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().reports.len()
    }

    /// Whether the store holds no reports.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a validated report, assigning its id and creation time.
    ///
    /// Nothing changes when the snapshot cannot be written.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot file cannot be written or no ids
    /// are left.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn append(&self, report: NewReport) -> Result<Report, StoreError> {
        let mut inner = self.write();
        let report = inner.push(report)?;
        if let Err(e) = self.persist(&inner) {
            inner.unpush();
            return Err(e);
        }
        log::debug!("Appended report {} ({})", report.id, report.category);
        Ok(report)
    }

    /// Adds one vote to the report with `id`.
    ///
    /// The vote is discarded when the snapshot cannot be written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id, or an error if
    /// the snapshot file cannot be written.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn increment_votes(&self, id: i64) -> Result<Report, StoreError> {
        let mut inner = self.write();
        let index = inner.position(id)?;
        let report = inner.upvote(index);
        if let Err(e) = self.persist(&inner) {
            inner.downvote(index);
            return Err(e);
        }
        log::debug!("Report {id} now has {} votes", report.votes);
        Ok(report)
    }

    /// Appends `report` unless it near-duplicates an existing report, in
    /// which case the existing report receives a vote instead.
    ///
    /// The duplicate check and the mutation happen under the same write
    /// lock, so concurrent submissions of the same issue cannot both be
    /// appended. Nothing changes when the snapshot cannot be written.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot file cannot be written or no ids
    /// are left.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn submit(&self, report: NewReport, threshold: f64) -> Result<SubmitOutcome, StoreError> {
        let mut inner = self.write();

        let duplicate_of = find_duplicate(&report, &inner.reports, threshold).map(|r| r.id);

        match duplicate_of {
            Some(id) => {
                let index = inner.position(id)?;
                let existing = inner.upvote(index);
                if let Err(e) = self.persist(&inner) {
                    inner.downvote(index);
                    return Err(e);
                }
                log::info!(
                    "Submission duplicates report {id} ({}); votes now {}",
                    existing.category,
                    existing.votes
                );
                Ok(SubmitOutcome::Duplicate(existing))
            }
            None => {
                let created = inner.push(report)?;
                if let Err(e) = self.persist(&inner) {
                    inner.unpush();
                    return Err(e);
                }
                Ok(SubmitOutcome::Created(created))
            }
        }
    }

    /// Writes the current collection to `path` as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        save(path, &self.read().reports)
    }

    fn persist(&self, inner: &Inner) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            save(path, &inner.reports)?;
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("report store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("report store lock poisoned")
    }
}

/// Reads a JSON snapshot of reports from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn load(path: &Path) -> Result<Vec<Report>, StoreError> {
    let file = File::open(path)?;
    let reports: Vec<Report> = serde_json::from_reader(BufReader::new(file))?;
    log::info!("Loaded {} reports from {}", reports.len(), path.display());
    Ok(reports)
}

/// Writes `reports` to `path` as a pretty-printed JSON array.
///
/// The array is written to a sibling `.tmp` file which then replaces
/// `path`, so an interrupted write leaves the previous snapshot intact.
///
/// # Errors
///
/// Returns an error if the file cannot be created, written, or moved into
/// place.
pub fn save(path: &Path, reports: &[Report]) -> Result<(), StoreError> {
    let tmp = temp_sibling(path);

    let written = write_snapshot(&tmp, reports)
        .and_then(|()| std::fs::rename(&tmp, path).map_err(StoreError::from));
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written?;

    log::debug!("Saved {} reports to {}", reports.len(), path.display());
    Ok(())
}

fn write_snapshot(path: &Path, reports: &[Report]) -> Result<(), StoreError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, reports)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const THRESHOLD: f64 = 0.0012;

    fn new_report(category: &str, latitude: f64, longitude: f64) -> NewReport {
        NewReport {
            title: format!("{category} issue"),
            category: category.to_string(),
            latitude,
            longitude,
            severity: 6.0,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "civic_pulse_store_{name}_{}.json",
            std::process::id()
        ))
    }

    #[test]
    fn append_assigns_sequential_ids() {
        let store = ReportStore::new();
        let a = store.append(new_report("Pothole", 1.0, 1.0)).unwrap();
        let b = store.append(new_report("Garbage", 2.0, 2.0)).unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.votes, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = ReportStore::new();
        for i in 0..5 {
            store
                .append(new_report("Pothole", f64::from(i), 0.0))
                .unwrap();
        }

        let ids: Vec<i64> = store.list().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let newest: Vec<i64> = store.list_newest_first().iter().map(|r| r.id).collect();
        assert_eq!(newest, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn votes_only_increase() {
        let store = ReportStore::new();
        let report = store.append(new_report("Pothole", 1.0, 1.0)).unwrap();

        store.increment_votes(report.id).unwrap();
        let updated = store.increment_votes(report.id).unwrap();

        assert_eq!(updated.votes, 2);
        assert_eq!(store.get(report.id).unwrap().votes, 2);
        assert_eq!(updated.created_at, report.created_at);
    }

    #[test]
    fn voting_unknown_report_fails() {
        let store = ReportStore::new();
        assert!(matches!(
            store.increment_votes(42),
            Err(StoreError::NotFound { id: 42 })
        ));
    }

    #[test]
    fn submit_folds_duplicates_into_votes() {
        let store = ReportStore::new();
        let first = store
            .submit(new_report("Pothole", 28.4595, 77.0266), THRESHOLD)
            .unwrap();
        assert!(!first.is_duplicate());

        let second = store
            .submit(new_report("Pothole", 28.45955, 77.02665), THRESHOLD)
            .unwrap();
        assert!(second.is_duplicate());
        assert_eq!(second.report().id, first.report().id);
        assert_eq!(second.report().votes, 1);
        assert_eq!(store.len(), 1);

        let other = store
            .submit(new_report("Streetlight", 28.4595, 77.0266), THRESHOLD)
            .unwrap();
        assert!(!other.is_duplicate());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn seeded_store_continues_ids() {
        let seed = ReportStore::new();
        seed.append(new_report("Pothole", 1.0, 1.0)).unwrap();
        seed.append(new_report("Pothole", 2.0, 2.0)).unwrap();

        let store = ReportStore::from_reports(seed.list()).unwrap();
        let next = store.append(new_report("Garbage", 3.0, 3.0)).unwrap();
        assert_eq!(next.id, 3);
    }

    #[test]
    fn seeded_store_rejects_duplicate_ids() {
        let seed = ReportStore::new();
        let report = seed.append(new_report("Pothole", 1.0, 1.0)).unwrap();

        let err = ReportStore::from_reports(vec![report.clone(), report]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { id: 1 }));
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let path = temp_path("round_trip");
        let _ = std::fs::remove_file(&path);

        {
            let store = ReportStore::open(&path).unwrap();
            assert!(store.is_empty());
            let report = store.append(new_report("Pothole", 28.46, 77.03)).unwrap();
            store.increment_votes(report.id).unwrap();
        }

        let reopened = ReportStore::open(&path).unwrap();
        let reports = reopened.list();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, "Pothole");
        assert_eq!(reports[0].votes, 1);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn failed_writes_leave_the_store_unchanged() {
        let path = std::env::temp_dir()
            .join(format!("civic_pulse_missing_{}", std::process::id()))
            .join("reports.json");
        let store = ReportStore::open(&path).unwrap();

        let first = store.submit(new_report("Pothole", 28.4595, 77.0266), THRESHOLD);
        assert!(matches!(first, Err(StoreError::Io(_))));
        assert!(store.is_empty());

        let retry = store.submit(new_report("Pothole", 28.4595, 77.0266), THRESHOLD);
        assert!(matches!(retry, Err(StoreError::Io(_))));
        assert!(store.is_empty());

        assert!(store.append(new_report("Garbage", 1.0, 1.0)).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn failed_writes_discard_votes_and_keep_ids() {
        let mut store = ReportStore::new();
        let report = store.append(new_report("Pothole", 28.4595, 77.0266)).unwrap();
        store.path = Some(
            std::env::temp_dir()
                .join(format!("civic_pulse_missing_votes_{}", std::process::id()))
                .join("reports.json"),
        );

        assert!(store.increment_votes(report.id).is_err());
        let duplicate = store.submit(new_report("Pothole", 28.4595, 77.0266), THRESHOLD);
        assert!(duplicate.is_err());
        assert_eq!(store.get(report.id).unwrap().votes, 0);

        store.path = None;
        let next = store.append(new_report("Garbage", 2.0, 2.0)).unwrap();
        assert_eq!(next.id, report.id + 1);
    }

    #[test]
    fn save_replaces_snapshot_without_leftovers() {
        let path = temp_path("replace");
        let store = ReportStore::new();
        store.append(new_report("Pothole", 1.0, 1.0)).unwrap();
        store.save(&path).unwrap();

        store.append(new_report("Garbage", 2.0, 2.0)).unwrap();
        store.save(&path).unwrap();

        assert_eq!(load(&path).unwrap().len(), 2);
        assert!(!temp_sibling(&path).exists());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn seeded_store_rejects_exhausted_ids() {
        let seed = ReportStore::new();
        let mut report = seed.append(new_report("Pothole", 1.0, 1.0)).unwrap();

        report.id = i64::MAX;
        let err = ReportStore::from_reports(vec![report.clone()]).unwrap_err();
        assert!(matches!(err, StoreError::IdsExhausted { last: i64::MAX }));

        report.id = i64::MAX - 1;
        let store = ReportStore::from_reports(vec![report]).unwrap();
        assert!(matches!(
            store.append(new_report("Garbage", 2.0, 2.0)),
            Err(StoreError::IdsExhausted { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_submissions_are_serialized() {
        let store = Arc::new(ReportStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .submit(new_report("Pothole", 28.4595, 77.0266), THRESHOLD)
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let reports = store.list();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].votes, 7);
    }
}
