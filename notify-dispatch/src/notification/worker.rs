//! Background dispatch worker pool.
//!
//! The request boundary enqueues a [`DispatchRequest`] and answers the client
//! right away. A single intake loop pulls requests off the queue and runs
//! each dispatch as its own task, bounded by a semaphore.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{Id, JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::service::NotificationService;
use crate::domain::Message;
use crate::{Error, Result};

/// Configuration for the dispatch worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchWorkerConfig {
    /// Maximum dispatches running at the same time.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Maximum requests waiting in the queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_concurrent() -> usize {
    16
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for DispatchWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// One unit of background work: notify a recipient for a job.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub job_id: String,
    pub recipient_id: String,
    pub message: Message,
}

/// Bounded pool running dispatches in the background.
pub struct DispatchWorkerPool {
    config: DispatchWorkerConfig,
    tx: mpsc::Sender<DispatchRequest>,
    active: Arc<AtomicUsize>,
    cancellation_token: CancellationToken,
    intake: Mutex<Option<JoinHandle<()>>>,
}

impl DispatchWorkerPool {
    /// Start the pool. Must be called inside a Tokio runtime.
    pub fn start(service: Arc<NotificationService>, config: DispatchWorkerConfig) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let active = Arc::new(AtomicUsize::new(0));
        let cancellation_token = CancellationToken::new();

        let intake = tokio::spawn(run_intake(
            rx,
            service,
            Arc::new(Semaphore::new(max_concurrent)),
            active.clone(),
            cancellation_token.clone(),
        ));

        info!(
            max_concurrent,
            queue_capacity = config.queue_capacity,
            "Dispatch worker pool started"
        );

        Self {
            config,
            tx,
            active,
            cancellation_token,
            intake: Mutex::new(Some(intake)),
        }
    }

    /// Queue a dispatch without waiting for it to run.
    pub fn submit(&self, request: DispatchRequest) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(Error::QueueClosed);
        }
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull(self.config.queue_capacity),
            mpsc::error::TrySendError::Closed(_) => Error::QueueClosed,
        })
    }

    /// Dispatches currently running.
    pub fn active_dispatches(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Requests waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Stop accepting work, then wait for queued and running dispatches.
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();
        let intake = self.intake.lock().take();
        if let Some(intake) = intake
            && let Err(e) = intake.await
        {
            error!(error = %e, "Dispatch intake task panicked");
        }
        info!("Dispatch worker pool stopped");
    }
}

/// Holds one slot of the active dispatch count until dropped.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn acquire(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active.clone())
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn run_intake(
    mut rx: mpsc::Receiver<DispatchRequest>,
    service: Arc<NotificationService>,
    semaphore: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    cancellation_token: CancellationToken,
) {
    let mut tasks = JoinSet::new();
    // Job id of every running dispatch, keyed by task.
    let mut running: HashMap<Id, String> = HashMap::new();

    loop {
        let request = tokio::select! {
            _ = cancellation_token.cancelled(), if !rx.is_closed() => {
                // Refuse new requests but keep draining what is queued.
                rx.close();
                continue;
            }
            Some(finished) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                reap(&service, &mut running, finished).await;
                continue;
            }
            request = rx.recv() => request,
        };
        let Some(request) = request else {
            break;
        };

        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };

        let guard = ActiveGuard::acquire(&active);
        debug!(job_id = %request.job_id, "Starting dispatch");

        let job_id = request.job_id.clone();
        let task_service = service.clone();
        let handle = tasks.spawn(async move {
            let _permit = permit;
            let _guard = guard;
            task_service
                .dispatch(&request.recipient_id, &request.message, Some(&request.job_id))
                .await;
        });
        running.insert(handle.id(), job_id);
    }

    if !tasks.is_empty() {
        warn!(remaining = tasks.len(), "Waiting for in-flight dispatches");
    }
    while let Some(finished) = tasks.join_next_with_id().await {
        reap(&service, &mut running, finished).await;
    }
}

/// Forget a finished dispatch; fail its job if the task died mid-flight.
async fn reap(
    service: &NotificationService,
    running: &mut HashMap<Id, String>,
    finished: std::result::Result<(Id, ()), JoinError>,
) {
    match finished {
        Ok((id, ())) => {
            running.remove(&id);
        }
        Err(join_err) => {
            let job_id = running.remove(&join_err.id());
            if join_err.is_panic() {
                error!(error = ?join_err, job_id = ?job_id, "Dispatch task panicked");
            } else {
                warn!(error = ?join_err, job_id = ?job_id, "Dispatch task cancelled");
            }
            if let Some(job_id) = job_id {
                service.abandon(&job_id).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::database::repositories::{
        InMemoryJobRepository, InMemoryRecipientRepository, JobRepository,
    };
    use async_trait::async_trait;

    use crate::domain::{Address, AddressKind, Job, JobStatus, Recipient, RetryPolicy};
    use crate::notification::channels::{
        ChannelSet, ChannelsConfig, ChatChannel, NotificationChannel, SmsChannel,
    };
    use crate::notification::transport::SimulationConfig;

    /// Email channel whose every attempt panics.
    struct PanickingEmail;

    #[async_trait]
    impl NotificationChannel for PanickingEmail {
        fn channel_type(&self) -> &'static str {
            "Email"
        }

        fn address_kind(&self) -> AddressKind {
            AddressKind::Email
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn attempt(&self, _address: &Address, _message: &Message) -> bool {
            panic!("email transport blew up");
        }
    }

    fn reliable_service(jobs: Arc<InMemoryJobRepository>) -> Arc<NotificationService> {
        let mut channels = ChannelsConfig::default();
        channels.email.simulation = SimulationConfig::new(0.0, 0);
        let recipients = Arc::new(InMemoryRecipientRepository::from_recipients([
            Recipient::new("u1", "Ivan").with_email("ivan@gmail.com"),
        ]));
        Arc::new(NotificationService::new(
            recipients,
            jobs,
            ChannelSet::from_config(&channels),
            RetryPolicy::immediate(0),
        ))
    }

    async fn wait_terminal(jobs: &InMemoryJobRepository, id: &str) -> JobStatus {
        for _ in 0..200 {
            let status = jobs.get_job(id).await.unwrap().status;
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} never reached a terminal state");
    }

    #[tokio::test]
    async fn test_submitted_dispatch_runs_in_background() {
        let jobs = Arc::new(InMemoryJobRepository::new());
        let pool = DispatchWorkerPool::start(reliable_service(jobs.clone()), Default::default());

        let job = Job::new();
        jobs.create_job(&job).await.unwrap();
        pool.submit(DispatchRequest {
            job_id: job.id.clone(),
            recipient_id: "u1".to_string(),
            message: Message::new("hi"),
        })
        .unwrap();

        assert_eq!(wait_terminal(&jobs, &job.id).await, JobStatus::Success);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_and_rejects_new_work() {
        let jobs = Arc::new(InMemoryJobRepository::new());
        let pool = DispatchWorkerPool::start(
            reliable_service(jobs.clone()),
            DispatchWorkerConfig {
                max_concurrent: 1,
                queue_capacity: 16,
            },
        );

        let mut ids = Vec::new();
        for _ in 0..5 {
            let job = Job::new();
            jobs.create_job(&job).await.unwrap();
            pool.submit(DispatchRequest {
                job_id: job.id.clone(),
                recipient_id: "u1".to_string(),
                message: Message::new("hi"),
            })
            .unwrap();
            ids.push(job.id);
        }

        pool.shutdown().await;

        for id in &ids {
            assert!(jobs.get_job(id).await.unwrap().status.is_terminal());
        }
        assert_eq!(pool.active_dispatches(), 0);

        let err = pool
            .submit(DispatchRequest {
                job_id: "late".to_string(),
                recipient_id: "u1".to_string(),
                message: Message::new("hi"),
            })
            .unwrap_err();
        assert!(matches!(err, Error::QueueClosed));
    }

    #[tokio::test]
    async fn test_panicking_dispatch_fails_job_and_frees_slot() {
        let jobs = Arc::new(InMemoryJobRepository::new());
        let recipients = Arc::new(InMemoryRecipientRepository::from_recipients([
            Recipient::new("u1", "Ivan").with_email("ivan@gmail.com"),
        ]));
        let channels = ChannelSet::new(
            Arc::new(PanickingEmail),
            Arc::new(SmsChannel::simulated(Default::default())),
            Arc::new(ChatChannel::simulated(Default::default())),
        )
        .unwrap();
        let service = Arc::new(NotificationService::new(
            recipients,
            jobs.clone(),
            channels,
            RetryPolicy::immediate(0),
        ));
        let pool = DispatchWorkerPool::start(service, Default::default());

        let job = Job::new();
        jobs.create_job(&job).await.unwrap();
        pool.submit(DispatchRequest {
            job_id: job.id.clone(),
            recipient_id: "u1".to_string(),
            message: Message::new("hi"),
        })
        .unwrap();

        assert_eq!(wait_terminal(&jobs, &job.id).await, JobStatus::Failed);
        assert_eq!(pool.active_dispatches(), 0);

        pool.shutdown().await;
        assert_eq!(pool.active_dispatches(), 0);
    }
}
