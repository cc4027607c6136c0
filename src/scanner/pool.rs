//! A fixed-width work-stealing task pool.
//!
//! Each worker owns a double-ended queue. Submitters push to queue backs,
//! picking a starting queue round-robin; workers pop their own queue's front
//! and steal from the backs of peers when idle. When every queue is at its
//! share of the soft cap, `enqueue` runs the task inline on the caller, so a
//! worker submitting from inside a task can never deadlock on queue space.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Soft bound on queued tasks across all workers.
const QUEUE_SOFT_CAP: usize = 50_000;
/// Idle workers park on the condvar at most this long, bounding the effect
/// of a wakeup lost to a racing enqueue.
const IDLE_WAIT: Duration = Duration::from_millis(10);
/// Poll interval for [`WorkStealingPool::wait_all`].
const DRAIN_POLL: Duration = Duration::from_millis(10);

struct WorkQueue {
    tasks: Mutex<VecDeque<Task>>,
    depth: AtomicUsize,
}

impl WorkQueue {
    fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            depth: AtomicUsize::new(0),
        }
    }
}

struct Shared {
    queues: Vec<WorkQueue>,
    stop: AtomicBool,
    total_tasks: AtomicUsize,
    active_workers: AtomicUsize,
    next_queue: AtomicUsize,
    idle_lock: Mutex<()>,
    work_available: Condvar,
}

pub struct WorkStealingPool {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkStealingPool {
    /// Spawn a pool with `threads` workers. 0 probes hardware concurrency;
    /// macOS is capped at 3 workers.
    pub fn new(threads: usize) -> Self {
        let requested = if threads == 0 { num_cpus::get() } else { threads };
        #[cfg(target_os = "macos")]
        let requested = requested.min(3);
        let count = requested.max(1);

        let shared = Arc::new(Shared {
            queues: (0..count).map(|_| WorkQueue::new()).collect(),
            stop: AtomicBool::new(false),
            total_tasks: AtomicUsize::new(0),
            active_workers: AtomicUsize::new(0),
            next_queue: AtomicUsize::new(0),
            idle_lock: Mutex::new(()),
            work_available: Condvar::new(),
        });

        let workers = (0..count)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(&shared, id))
            })
            .collect();

        Self { shared, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.shared.queues.len()
    }

    /// Submit a task.
    ///
    /// Never blocks on a full queue: the starting queue is chosen
    /// round-robin, up to `n` queues are tried, and if all of them are above
    /// their share of the soft cap the task runs inline on the caller.
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let shared = &self.shared;
        if shared.stop.load(Ordering::Acquire) {
            return;
        }

        let queue_count = shared.queues.len();
        let per_queue_cap = (QUEUE_SOFT_CAP / queue_count).max(1);
        let mut queue_id = shared.next_queue.fetch_add(1, Ordering::Relaxed) % queue_count;

        for _ in 0..queue_count {
            let queue = &shared.queues[queue_id];
            if queue.depth.load(Ordering::Relaxed) < per_queue_cap {
                queue.tasks.lock().unwrap().push_back(Box::new(task));
                queue.depth.fetch_add(1, Ordering::Relaxed);
                shared.total_tasks.fetch_add(1, Ordering::Release);
                shared.work_available.notify_one();
                return;
            }
            queue_id = (queue_id + 1) % queue_count;
        }

        task();
    }

    /// Block until no tasks are queued and no worker is mid-task.
    pub fn wait_all(&self) {
        while self.shared.total_tasks.load(Ordering::Acquire) > 0
            || self.shared.active_workers.load(Ordering::Acquire) > 0
        {
            thread::sleep(DRAIN_POLL);
        }
    }
}

impl Drop for WorkStealingPool {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.work_available.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: &Shared, id: usize) {
    loop {
        if shared.stop.load(Ordering::Acquire) && shared.total_tasks.load(Ordering::Acquire) == 0 {
            return;
        }

        let task = pop_local(shared, id).or_else(|| steal(shared, id));
        match task {
            Some(task) => {
                shared.active_workers.fetch_add(1, Ordering::AcqRel);
                task();
                shared.active_workers.fetch_sub(1, Ordering::AcqRel);
                shared.total_tasks.fetch_sub(1, Ordering::AcqRel);
            }
            None => {
                let guard = shared.idle_lock.lock().unwrap();
                let _ = shared
                    .work_available
                    .wait_timeout_while(guard, IDLE_WAIT, |_| {
                        !shared.stop.load(Ordering::Acquire)
                            && shared.total_tasks.load(Ordering::Acquire) == 0
                    });
            }
        }
    }
}

fn pop_local(shared: &Shared, id: usize) -> Option<Task> {
    let queue = &shared.queues[id];
    if queue.depth.load(Ordering::Relaxed) == 0 {
        return None;
    }
    let mut tasks = queue.tasks.lock().unwrap();
    let task = tasks.pop_front();
    if task.is_some() {
        queue.depth.fetch_sub(1, Ordering::Relaxed);
    }
    task
}

fn steal(shared: &Shared, thief: usize) -> Option<Task> {
    let queue_count = shared.queues.len();
    for offset in 1..queue_count {
        let victim = &shared.queues[(thief + offset) % queue_count];
        if victim.depth.load(Ordering::Relaxed) == 0 {
            continue;
        }
        if let Ok(mut tasks) = victim.tasks.try_lock() {
            if let Some(task) = tasks.pop_back() {
                victim.depth.fetch_sub(1, Ordering::Relaxed);
                return Some(task);
            }
        }
    }
    None
}
