use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::board::TaskBoard;
use crate::channel::{self, ChannelConfig, ChannelEvent, DEFAULT_BACKOFF};
use crate::error::SyncError;
use crate::models::{CreateTask, Employee, Notification, PushEvent, Session, Task, UpdateTask};
use crate::reorder::{self, DragOutcome};
use crate::rest::{RestClient, DEFAULT_TIMEOUT};
use crate::session::SessionStore;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub backend_url: String,
    pub ws_url: String,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
    pub reconnect_backoff: Duration,
}

impl SyncConfig {
    pub fn new(backend_url: &str, ws_url: &str, session_file: impl Into<PathBuf>) -> Self {
        SyncConfig {
            backend_url: backend_url.to_string(),
            ws_url: ws_url.to_string(),
            session_file: session_file.into(),
            request_timeout: DEFAULT_TIMEOUT,
            reconnect_backoff: DEFAULT_BACKOFF,
        }
    }
}

/// What the signed-in subject can see: an admin fetches every employee under
/// them, an employee fetches only their own group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Admin,
    Employee,
}

/// Reducer-style owner of the task board. Snapshot rebuilds, realtime pushes
/// and optimistic reorders all funnel through `&mut self` methods here, so
/// their precedence rules live in one place: a snapshot applies only if its
/// fetch generation is still current, and a completed reorder bumps the
/// generation so a stale in-flight rebuild cannot clobber it.
pub struct SyncEngine {
    scope: Scope,
    session: Session,
    store: SessionStore,
    rest: RestClient,
    config: SyncConfig,
    board: TaskBoard,
    generation: u64,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl SyncEngine {
    /// Builds an engine from the persisted session. A missing session means
    /// signed out: the caller must authenticate first.
    pub fn connect(
        config: &SyncConfig,
        scope: Scope,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Notification>), SyncError> {
        let store = SessionStore::new(&config.session_file);
        let session = store.load()?.ok_or(SyncError::Unauthorized)?;
        let rest = RestClient::new(&config.backend_url, &session.token, config.request_timeout)?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok((
            SyncEngine {
                scope,
                session,
                store,
                rest,
                config: config.clone(),
                board: TaskBoard::new(),
                generation: 0,
                notifications: tx,
            },
            rx,
        ))
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    pub fn subject_id(&self) -> i64 {
        self.session.subject_id
    }

    /// Marks the start of a snapshot fetch. The returned generation must be
    /// handed back to [`apply_snapshot`]; any mutation that lands in between
    /// invalidates it.
    ///
    /// [`apply_snapshot`]: SyncEngine::apply_snapshot
    pub fn begin_refresh(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Installs a snapshot unless it went stale while in flight. Returns
    /// whether it was applied.
    pub fn apply_snapshot(
        &mut self,
        generation: u64,
        employees: Vec<Employee>,
        tasks: Vec<Task>,
    ) -> bool {
        if generation != self.generation {
            info!(generation, current = self.generation, "Discarding stale snapshot");
            return false;
        }
        self.board.rebuild(employees, tasks);
        true
    }

    pub async fn fetch_snapshot(&self) -> Result<(Vec<Employee>, Vec<Task>), SyncError> {
        match self.scope {
            Scope::Admin => {
                let employees = self.rest.fetch_employees(self.session.subject_id).await?;
                let tasks = self
                    .rest
                    .fetch_assigned_tasks(self.session.subject_id)
                    .await?;
                Ok((employees, tasks))
            }
            Scope::Employee => {
                let snapshot = self
                    .rest
                    .fetch_employee_tasks(self.session.subject_id)
                    .await?;
                Ok((vec![snapshot.employee], snapshot.tasks))
            }
        }
    }

    /// Full rebuild from a fresh REST snapshot, the fallback source of truth.
    pub async fn refresh(&mut self) -> Result<(), SyncError> {
        let generation = self.begin_refresh();
        match self.fetch_snapshot().await {
            Ok((employees, tasks)) => {
                self.apply_snapshot(generation, employees, tasks);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Applies one realtime push and surfaces its notification.
    pub fn apply_push(&mut self, event: &PushEvent) {
        if let Some(notification) = self.board.apply_push(event) {
            info!(?notification, "Applied push event");
            let _ = self.notifications.send(notification);
        }
    }

    /// Drag gesture: applies the reorder locally first, then persists it.
    /// On failure the board is rolled back to a fresh snapshot.
    pub async fn reorder(
        &mut self,
        employee_id: i64,
        source_index: usize,
        destination_index: Option<usize>,
    ) -> Result<DragOutcome, SyncError> {
        match reorder::apply(
            &mut self.board,
            &self.rest,
            employee_id,
            source_index,
            destination_index,
        )
        .await
        {
            Ok(outcome) => {
                if matches!(outcome, DragOutcome::Persisted { .. }) {
                    // A rebuild that started before this reorder is now stale.
                    self.generation += 1;
                }
                Ok(outcome)
            }
            Err(err) => {
                let err = self.fail(err);
                // Never leave an unconfirmed optimistic order in place.
                if !matches!(err, SyncError::Unauthorized) {
                    if let Err(refresh_err) = self.refresh().await {
                        warn!(error = %refresh_err, "Rollback refresh failed");
                    }
                }
                Err(err)
            }
        }
    }

    pub async fn create_task(&mut self, req: &CreateTask) -> Result<Task, SyncError> {
        let task = match self.rest.create_task(req).await {
            Ok(task) => task,
            Err(err) => return Err(self.fail(err)),
        };
        self.refresh().await?;
        Ok(task)
    }

    pub async fn update_task(&mut self, id: i64, req: &UpdateTask) -> Result<Task, SyncError> {
        let task = match self.rest.update_task(id, req).await {
            Ok(task) => task,
            Err(err) => return Err(self.fail(err)),
        };
        self.refresh().await?;
        Ok(task)
    }

    /// Deleting an already-deleted task is benign: the board just resyncs.
    pub async fn delete_task(&mut self, id: i64) -> Result<(), SyncError> {
        match self.rest.delete_task(id).await {
            Ok(()) => self.refresh().await,
            Err(SyncError::NotFound) => {
                info!(id, "Task already gone, refreshing");
                self.refresh().await
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub async fn toggle_employee_status(
        &mut self,
        employee_id: i64,
        active: bool,
    ) -> Result<Employee, SyncError> {
        let employee = match self.rest.toggle_employee_status(employee_id, active).await {
            Ok(employee) => employee,
            Err(err) => return Err(self.fail(err)),
        };
        self.refresh().await?;
        Ok(employee)
    }

    /// Mount flow: initial rebuild, then live updates until shutdown. The
    /// realtime connection is exclusively owned by this call; no event is
    /// applied once shutdown begins.
    pub async fn run(&mut self, mut shutdown: oneshot::Receiver<()>) -> Result<(), SyncError> {
        self.refresh().await?;

        let (handle, mut events) = channel::spawn(ChannelConfig {
            ws_url: self.config.ws_url.clone(),
            token: self.session.token.clone(),
            subject_id: self.session.subject_id,
            reconnect_backoff: self.config.reconnect_backoff,
        });

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(ChannelEvent::Connected) => {
                        info!("Realtime channel joined");
                    }
                    Some(ChannelEvent::Push(push)) => self.apply_push(&push),
                    Some(ChannelEvent::AuthFailed) => {
                        let err = self.fail(SyncError::Unauthorized);
                        handle.close().await;
                        return Err(err);
                    }
                    None => {
                        warn!("Realtime channel task ended");
                        handle.close().await;
                        return Ok(());
                    }
                },
                _ = &mut shutdown => {
                    handle.close().await;
                    return Ok(());
                }
            }
        }
    }

    /// Central failure handler: auth errors clear the session (once, here)
    /// and notify; everything else stays local to the failing operation.
    fn fail(&mut self, err: SyncError) -> SyncError {
        if matches!(err, SyncError::Unauthorized) {
            if let Err(clear_err) = self.store.clear() {
                warn!(error = %clear_err, "Failed to clear session");
            }
            let _ = self.notifications.send(Notification::SessionExpired);
        }
        err
    }
}
