//! Cooperative task queue
//!
//! Work that must not run inside the current dispatch (player event handlers,
//! staggered overlay transitions) is submitted here and executed when the host
//! drives the queue. Time is virtual: `advance` moves the clock and runs every
//! task that became due, in due order.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct QueueState {
    now: Duration,
    seq: u64,
    tasks: BTreeMap<(Duration, u64), Task>,
}

/// Single-threaded queue of deferred tasks
#[derive(Clone, Default)]
pub struct TaskQueue {
    state: Rc<RefCell<QueueState>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a task to the next scheduling turn
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.schedule(Duration::ZERO, task);
    }

    /// Submit a task to run once `delay` of virtual time has passed
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        let due = state.now + delay;
        let seq = state.seq;
        state.seq += 1;
        state.tasks.insert((due, seq), Box::new(task));
        trace!(due_ms = due.as_millis() as u64, seq, "Task scheduled");
    }

    /// Run every task that is due now, including tasks they submit
    pub fn run_until_idle(&self) -> usize {
        let now = self.now();
        self.run_due(now)
    }

    /// Move the clock forward, running due tasks in order
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let ran = self.run_due(target);
        self.state.borrow_mut().now = target;
        ran
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of tasks waiting
    pub fn pending(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    /// Drop every waiting task and rewind the clock
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.tasks.clear();
        state.now = Duration::ZERO;
        state.seq = 0;
    }

    fn run_due(&self, until: Duration) -> usize {
        let mut ran = 0;
        loop {
            // the borrow must end before the task runs; tasks may schedule more work
            let task = {
                let mut state = self.state.borrow_mut();
                let due = match state.tasks.keys().next() {
                    Some(&(due, _)) if due <= until => due,
                    _ => break,
                };
                state.now = state.now.max(due);
                state.tasks.pop_first().map(|(_, task)| task)
            };
            if let Some(task) = task {
                task();
                ran += 1;
            }
        }
        ran
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_defer_does_not_run_synchronously() {
        let queue = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&log);
        queue.defer(move || l.borrow_mut().push("deferred"));
        log.borrow_mut().push("sync");

        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(*log.borrow(), vec!["sync", "deferred"]);
    }

    #[test]
    fn test_delayed_tasks_run_in_due_order() {
        let queue = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, name) in [(200, "late"), (50, "early"), (0, "now")] {
            let l = Rc::clone(&log);
            queue.schedule(Duration::from_millis(delay), move || l.borrow_mut().push(name));
        }

        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(queue.advance(Duration::from_millis(100)), 1);
        assert_eq!(*log.borrow(), vec!["now", "early"]);
        assert_eq!(queue.now(), Duration::from_millis(100));

        queue.advance(Duration::from_millis(100));
        assert_eq!(*log.borrow(), vec!["now", "early", "late"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_tasks_may_submit_tasks() {
        let queue = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let q = queue.clone();
        let l = Rc::clone(&log);
        queue.defer(move || {
            l.borrow_mut().push(1);
            let l = Rc::clone(&l);
            q.defer(move || l.borrow_mut().push(2));
        });

        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_clear() {
        let queue = TaskQueue::new();
        queue.schedule(Duration::from_secs(1), || {});
        queue.advance(Duration::from_millis(10));
        queue.clear();
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.now(), Duration::ZERO);
    }
}
