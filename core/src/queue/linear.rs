use crate::errors::TaskLoomErrors;
use crate::queue::{TaskQueue, empty_queue_error, insertion_index, unknown_id_error};
use crate::task::QueuedTask;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// The simplest in-memory [`TaskQueue`], one ordered sequence holding every
/// queue. Dispatch filters by queue name on iteration; the sequence itself
/// is kept in dispatch order at insertion time, so the first task matching a
/// queue name is always that queue's dispatch candidate.
///
/// Best suited for tests and small workloads; [`crate::queue::MapQueue`]
/// avoids the repeated filtering once queue counts grow.
#[derive(Default)]
pub struct LinearQueue {
    tasks: Mutex<Vec<QueuedTask>>,
}

impl LinearQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the dispatch candidate for `queue_name`, if it is eligible.
    fn eligible_index(
        tasks: &[QueuedTask],
        queue_name: &str,
        now: DateTime<Utc>,
    ) -> Option<usize> {
        let (idx, task) = tasks
            .iter()
            .enumerate()
            .find(|(_, task)| task.queue_name == queue_name)?;
        task.is_eligible_at(now).then_some(idx)
    }
}

impl TaskQueue for LinearQueue {
    fn enqueue(&self, task: QueuedTask) -> Result<(), TaskLoomErrors> {
        let mut tasks = self.tasks.lock().unwrap();
        tasks.retain(|existing| existing.id != task.id);
        match insertion_index(tasks.iter(), task.eta) {
            Some(idx) => tasks.insert(idx, task),
            None => tasks.push(task),
        }
        Ok(())
    }

    fn dequeue(&self, queue_name: &str) -> Result<QueuedTask, TaskLoomErrors> {
        let mut tasks = self.tasks.lock().unwrap();
        match Self::eligible_index(&tasks, queue_name, Utc::now()) {
            Some(idx) => Ok(tasks.remove(idx)),
            None => Err(empty_queue_error(queue_name)),
        }
    }

    fn peek(&self, queue_name: &str) -> Result<Option<QueuedTask>, TaskLoomErrors> {
        let tasks = self.tasks.lock().unwrap();
        Ok(Self::eligible_index(&tasks, queue_name, Utc::now()).map(|idx| tasks[idx].clone()))
    }

    fn bulk_peek(
        &self,
        queue_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<QueuedTask>, TaskLoomErrors> {
        let tasks = self.tasks.lock().unwrap();
        let now = Utc::now();
        let mut eligible = Vec::new();
        for task in tasks.iter().filter(|task| task.queue_name == queue_name) {
            // The sequence is ETA-ordered, the first future task ends it.
            if !task.is_eligible_at(now) {
                break;
            }
            eligible.push(task.clone());
            if limit.is_some_and(|limit| eligible.len() >= limit) {
                break;
            }
        }
        Ok(eligible)
    }

    fn dequeue_any_unsafe(&self, queue_name: &str) -> Result<QueuedTask, TaskLoomErrors> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter().position(|task| task.queue_name == queue_name) {
            Some(idx) => Ok(tasks.remove(idx)),
            None => Err(empty_queue_error(queue_name)),
        }
    }

    fn remove(&self, id: &str) -> Result<(), TaskLoomErrors> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter().position(|task| task.id == id) {
            Some(idx) => {
                tasks.remove(idx);
                Ok(())
            }
            None => Err(unknown_id_error(id)),
        }
    }

    fn reschedule(&self, id: &str, eta: Option<DateTime<Utc>>) -> Result<(), TaskLoomErrors> {
        let mut tasks = self.tasks.lock().unwrap();
        let idx = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| unknown_id_error(id))?;
        let mut task = tasks.remove(idx);
        task.eta = eta;
        match insertion_index(tasks.iter(), task.eta) {
            Some(idx) => tasks.insert(idx, task),
            None => tasks.push(task),
        }
        Ok(())
    }

    fn move_task(&self, id: &str, queue_name: &str) -> Result<(), TaskLoomErrors> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| unknown_id_error(id))?;
        task.queue_name = queue_name.to_owned();
        Ok(())
    }

    fn total_tasks(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    fn total_tasks_by_queue(&self) -> HashMap<String, usize> {
        let tasks = self.tasks.lock().unwrap();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for task in tasks.iter() {
            *counts.entry(task.queue_name.clone()).or_default() += 1;
        }
        counts
    }
}
