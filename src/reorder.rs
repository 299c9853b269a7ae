use futures::future::join_all;
use tracing::info;

use crate::board::TaskBoard;
use crate::error::SyncError;
use crate::models::UpdateTask;
use crate::rest::RestClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Guarded out: no state change, no network traffic.
    Noop,
    /// Optimistic order applied and confirmed by the backend.
    Persisted { updates: usize },
}

/// Turns one drag gesture into a durable position change.
///
/// The local list is reordered synchronously before any network traffic, so
/// the UI shows the new order immediately. One update is then issued per task
/// whose position changed, all awaited together. On any failure the optimistic
/// order is unconfirmed and the caller MUST force a full rebuild from a fresh
/// snapshot before trusting the board again.
pub async fn apply(
    board: &mut TaskBoard,
    rest: &RestClient,
    employee_id: i64,
    source_index: usize,
    destination_index: Option<usize>,
) -> Result<DragOutcome, SyncError> {
    let Some(destination) = destination_index else {
        return Ok(DragOutcome::Noop);
    };
    if destination == source_index {
        return Ok(DragOutcome::Noop);
    }

    let Some(changed) = board.reorder(employee_id, source_index, destination) else {
        return Ok(DragOutcome::Noop);
    };

    let updates: Vec<(i64, UpdateTask)> = changed
        .iter()
        .map(|task| (task.id, UpdateTask::from_task(task)))
        .collect();
    let results = join_all(updates.iter().map(|(id, req)| rest.update_task(*id, req))).await;
    let persisted = results.len();
    for result in results {
        result?;
    }

    info!(employee_id, updates = persisted, "Persisted reorder");
    Ok(DragOutcome::Persisted { updates: persisted })
}
