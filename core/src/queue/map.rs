use crate::errors::TaskLoomErrors;
use crate::queue::{TaskQueue, empty_queue_error, insertion_index, unknown_id_error};
use crate::task::QueuedTask;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// The default in-memory [`TaskQueue`]: a map of `queue_name` to an
/// ETA-ordered deque. Dispatch only ever inspects the front of a deque,
/// since insertion keeps each deque in dispatch order.
#[derive(Default)]
pub struct MapQueue {
    queues: Mutex<HashMap<String, VecDeque<QueuedTask>>>,
}

impl MapQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn remove_by_id(queues: &mut HashMap<String, VecDeque<QueuedTask>>, id: &str) -> Option<QueuedTask> {
        for deque in queues.values_mut() {
            if let Some(idx) = deque.iter().position(|task| task.id == id) {
                return deque.remove(idx);
            }
        }
        None
    }

    fn insert_ordered(queues: &mut HashMap<String, VecDeque<QueuedTask>>, task: QueuedTask) {
        let deque = queues.entry(task.queue_name.clone()).or_default();
        match insertion_index(deque.iter(), task.eta) {
            Some(idx) => deque.insert(idx, task),
            None => deque.push_back(task),
        }
    }
}

impl TaskQueue for MapQueue {
    fn enqueue(&self, task: QueuedTask) -> Result<(), TaskLoomErrors> {
        let mut queues = self.queues.lock().unwrap();
        Self::remove_by_id(&mut queues, &task.id);
        Self::insert_ordered(&mut queues, task);
        Ok(())
    }

    fn dequeue(&self, queue_name: &str) -> Result<QueuedTask, TaskLoomErrors> {
        let mut queues = self.queues.lock().unwrap();
        let now = Utc::now();
        let deque = queues.get_mut(queue_name);
        match deque {
            Some(deque) if deque.front().is_some_and(|task| task.is_eligible_at(now)) => {
                Ok(deque.pop_front().unwrap())
            }
            _ => Err(empty_queue_error(queue_name)),
        }
    }

    fn peek(&self, queue_name: &str) -> Result<Option<QueuedTask>, TaskLoomErrors> {
        let queues = self.queues.lock().unwrap();
        let now = Utc::now();
        Ok(queues
            .get(queue_name)
            .and_then(|deque| deque.front())
            .filter(|task| task.is_eligible_at(now))
            .cloned())
    }

    fn bulk_peek(
        &self,
        queue_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<QueuedTask>, TaskLoomErrors> {
        let queues = self.queues.lock().unwrap();
        let now = Utc::now();
        let mut eligible = Vec::new();
        if let Some(deque) = queues.get(queue_name) {
            for task in deque {
                if !task.is_eligible_at(now) {
                    break;
                }
                eligible.push(task.clone());
                if limit.is_some_and(|limit| eligible.len() >= limit) {
                    break;
                }
            }
        }
        Ok(eligible)
    }

    fn dequeue_any_unsafe(&self, queue_name: &str) -> Result<QueuedTask, TaskLoomErrors> {
        let mut queues = self.queues.lock().unwrap();
        queues
            .get_mut(queue_name)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| empty_queue_error(queue_name))
    }

    fn remove(&self, id: &str) -> Result<(), TaskLoomErrors> {
        let mut queues = self.queues.lock().unwrap();
        Self::remove_by_id(&mut queues, id)
            .map(|_| ())
            .ok_or_else(|| unknown_id_error(id))
    }

    fn reschedule(&self, id: &str, eta: Option<DateTime<Utc>>) -> Result<(), TaskLoomErrors> {
        let mut queues = self.queues.lock().unwrap();
        let mut task = Self::remove_by_id(&mut queues, id).ok_or_else(|| unknown_id_error(id))?;
        task.eta = eta;
        Self::insert_ordered(&mut queues, task);
        Ok(())
    }

    fn move_task(&self, id: &str, queue_name: &str) -> Result<(), TaskLoomErrors> {
        let mut queues = self.queues.lock().unwrap();
        let mut task = Self::remove_by_id(&mut queues, id).ok_or_else(|| unknown_id_error(id))?;
        task.queue_name = queue_name.to_owned();
        Self::insert_ordered(&mut queues, task);
        Ok(())
    }

    fn total_tasks(&self) -> usize {
        self.queues
            .lock()
            .unwrap()
            .values()
            .map(VecDeque::len)
            .sum()
    }

    fn total_tasks_by_queue(&self) -> HashMap<String, usize> {
        self.queues
            .lock()
            .unwrap()
            .iter()
            .map(|(name, deque)| (name.clone(), deque.len()))
            .collect()
    }
}
