//! Job repository.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::domain::{Job, JobStatus};
use crate::{Error, Result};

/// Job repository trait.
///
/// Only the dispatcher that owns a job id writes its terminal status, so
/// implementations need per-key consistency, not cross-job locking.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job. Fails if the id is already taken.
    async fn create_job(&self, job: &Job) -> Result<()>;
    /// Current snapshot of a job.
    async fn get_job(&self, id: &str) -> Result<Job>;
    /// Apply the single pending -> terminal transition.
    async fn update_job_status(&self, id: &str, status: JobStatus) -> Result<Job>;
    /// Number of stored jobs in the given status.
    async fn count_by_status(&self, status: JobStatus) -> Result<usize>;
}

/// In-memory implementation of JobRepository.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: DashMap<String, Job>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with a finished `test_job` for smoke testing.
    pub fn with_demo_data() -> Self {
        let repo = Self::new();
        let mut job = Job::with_id("test_job");
        job.status = JobStatus::Success;
        repo.jobs.insert(job.id.clone(), job);
        repo
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create_job(&self, job: &Job) -> Result<()> {
        match self.jobs.entry(job.id.clone()) {
            Entry::Occupied(_) => Err(Error::already_exists("Job", &job.id)),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                debug!(job_id = %job.id, "Job created");
                Ok(())
            }
        }
    }

    async fn get_job(&self, id: &str) -> Result<Job> {
        self.jobs
            .get(id)
            .map(|job| job.clone())
            .ok_or_else(|| Error::not_found("Job", id))
    }

    async fn update_job_status(&self, id: &str, status: JobStatus) -> Result<Job> {
        let mut job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| Error::not_found("Job", id))?;
        job.transition(status)?;
        debug!(job_id = %id, status = %status, "Job status updated");
        Ok(job.clone())
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<usize> {
        Ok(self.jobs.iter().filter(|j| j.status == status).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryJobRepository::new();
        let job = Job::new();
        repo.create_job(&job).await.unwrap();

        let stored = repo.get_job(&job.id).await.unwrap();
        assert_eq!(stored, job);
        assert_eq!(stored.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let repo = InMemoryJobRepository::new();
        let job = Job::with_id("dup");
        repo.create_job(&job).await.unwrap();

        let err = repo.create_job(&job).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let repo = InMemoryJobRepository::new();
        let err = repo.get_job("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let err = repo
            .update_job_status("missing", JobStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_terminal_status_is_stable() {
        let repo = InMemoryJobRepository::new();
        let job = Job::new();
        repo.create_job(&job).await.unwrap();

        repo.update_job_status(&job.id, JobStatus::Failed)
            .await
            .unwrap();
        let err = repo
            .update_job_status(&job.id, JobStatus::Success)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));

        for _ in 0..3 {
            let snapshot = repo.get_job(&job.id).await.unwrap();
            assert_eq!(snapshot.status, JobStatus::Failed);
            assert_eq!(snapshot.created_at, job.created_at);
        }
    }

    #[tokio::test]
    async fn test_demo_data() {
        let repo = InMemoryJobRepository::with_demo_data();
        let job = repo.get_job("test_job").await.unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(repo.count_by_status(JobStatus::Success).await.unwrap(), 1);
        assert_eq!(repo.count_by_status(JobStatus::Pending).await.unwrap(), 0);
    }
}
