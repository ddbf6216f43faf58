//! Task polling
//!
//! Mutating CDS actions return a task id instead of a result. The task is
//! polled until it reports Finished or Failed, bounded by a timeout.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use super::vdc::TaskStatus;
use super::{CdsError, Result, VdcApi};

/// Polling configuration for task completion
#[derive(Debug, Clone)]
pub struct TaskWaitConfig {
    /// Delay between DescribeTask calls
    pub interval: Duration,

    /// Give up after this much time
    pub timeout: Duration,
}

impl Default for TaskWaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Poll a task until it finishes
///
/// Returns the resource id the task reports, if any (creation tasks report
/// the id of the new resource, teardown tasks usually report nothing).
pub async fn wait_for_task<A: VdcApi + ?Sized>(
    api: &A,
    task_id: &str,
    config: &TaskWaitConfig,
) -> Result<Option<String>> {
    let started = Instant::now();

    loop {
        let task = api.describe_task(task_id).await?;
        match task.status {
            TaskStatus::Finished => {
                tracing::debug!(task_id, resource_id = ?task.resource_id, "task finished");
                return Ok(task.resource_id);
            }
            TaskStatus::Failed => {
                return Err(CdsError::TaskFailed {
                    task_id: task_id.to_string(),
                    message: task
                        .message
                        .unwrap_or_else(|| "no failure detail reported".to_string()),
                });
            }
            TaskStatus::Doing => {
                if started.elapsed() >= config.timeout {
                    return Err(CdsError::TaskTimeout {
                        task_id: task_id.to_string(),
                        timeout_secs: config.timeout.as_secs(),
                    });
                }
                sleep(config.interval).await;
            }
        }
    }
}
