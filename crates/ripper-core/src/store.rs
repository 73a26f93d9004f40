//! In-memory job store.
//!
//! The map of id -> record lives behind a single lock. Records are handed out
//! as clones; mutation happens inside [`JobStore::update`] while the lock is
//! held, so a reader never observes a half-applied change.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::AppError;
use crate::job::{JobId, JobRecord};

/// Process-wide registry of conversion jobs. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh `queued` record under a newly generated id.
    pub fn create(&self, total: usize) -> JobRecord {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let mut id = JobId::generate();
        while jobs.contains_key(&id) {
            id = JobId::generate();
        }
        let record = JobRecord::new(id.clone(), total);
        jobs.insert(id, record.clone());
        record
    }

    /// Snapshot of a record.
    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(id).cloned()
    }

    /// Apply `f` to the record under the store lock.
    pub fn update<F, T>(&self, id: &JobId, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut JobRecord) -> Result<T, AppError>,
    {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| AppError::JobNotFound(id.to_string()))?;
        f(record)
    }

    pub fn remove(&self, id: &JobId) -> Option<JobRecord> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.remove(id)
    }

    /// Drop every failed job created more than `window` before `now`.
    /// Returns the evicted ids.
    pub fn remove_stale_errors(&self, now: DateTime<Utc>, window: TimeDelta) -> Vec<JobId> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let stale: Vec<JobId> = jobs
            .values()
            .filter(|job| job.is_stale_error(now, window))
            .map(|job| job.id.clone())
            .collect();
        for id in &stale {
            jobs.remove(id);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    #[test]
    fn test_create_and_get() {
        let store = JobStore::new();
        let job = store.create(3);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.total, 3);

        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched, job);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = JobStore::new();
        let ids: std::collections::HashSet<_> = (0..200).map(|_| store.create(1).id).collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(store.len(), 200);
    }

    #[test]
    fn test_update_mutates_in_place() {
        let store = JobStore::new();
        let id = store.create(1).id;
        store.update(&id, |job| job.start()).unwrap();
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Downloading);
    }

    #[test]
    fn test_update_propagates_closure_error() {
        let store = JobStore::new();
        let id = store.create(1).id;
        let err = store
            .update(&id, |job| job.fail("too early".into()))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Queued);
    }

    #[test]
    fn test_update_unknown_job() {
        let store = JobStore::new();
        let err = store
            .update(&JobId::from("missing"), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, AppError::JobNotFound(_)));
    }

    #[test]
    fn test_remove() {
        let store = JobStore::new();
        let id = store.create(1).id;
        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
        assert!(store.remove(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_stale_errors_only_touches_old_failures() {
        let store = JobStore::new();
        let window = TimeDelta::seconds(300);
        let old = Utc::now() - TimeDelta::seconds(600);

        let stale = store.create(1).id;
        store
            .update(&stale, |job| {
                job.start()?;
                job.fail("boom".into())?;
                job.created = old;
                Ok(())
            })
            .unwrap();

        let fresh_error = store.create(1).id;
        store
            .update(&fresh_error, |job| {
                job.start()?;
                job.fail("boom".into())
            })
            .unwrap();

        let old_running = store.create(1).id;
        store
            .update(&old_running, |job| {
                job.start()?;
                job.created = old;
                Ok(())
            })
            .unwrap();

        let removed = store.remove_stale_errors(Utc::now(), window);
        assert_eq!(removed, vec![stale.clone()]);
        assert!(store.get(&stale).is_none());
        assert!(store.get(&fresh_error).is_some());
        assert!(store.get(&old_running).is_some());
    }

    #[test]
    fn test_concurrent_access() {
        let store = JobStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let id = store.create(1).id;
                        store.update(&id, |job| job.start()).unwrap();
                        assert!(store.get(&id).is_some());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 400);
    }
}
