//! Fixed-size worker pool with a pending-job barrier.
//!
//! Workers block on a shared multi-producer/multi-consumer channel and run
//! whatever they pull off it. Counted jobs bump an atomic pending counter
//! before they are queued and drop it once they have run; [`JobManager::wait`]
//! synchronizes on that counter while helping to drain the queue.
//!
//! A job that calls `wait` parks its own slot: it no longer counts as running
//! work. Waiters inside jobs return once every pending job is parked, so jobs
//! waiting on each other from different threads cannot deadlock.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, SendError, Sender};

/// Cores left to the caller (the thread driving frames and the one presenting them).
const RESERVED_THREADS: usize = 2;

/// How long a waiting thread parks between queue checks while jobs are in flight.
const WAIT_POLL: Duration = Duration::from_millis(1);

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a [`JobManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed, no worker threads yet. Jobs still run during `wait`.
    Idle,
    /// Workers are pulling jobs off the queue.
    Running,
    /// Queued jobs drained and all workers joined.
    Stopped,
}

/// A unit of work, executed exactly once by exactly one thread.
struct Job {
    task: Task,
    /// Whether the job holds a slot in the pending counter.
    counted: bool,
}

thread_local! {
    /// Barriers whose counted jobs are executing further up this thread's stack.
    static ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };

    /// Barrier slots this thread has parked, one entry per enclosing `wait`.
    static PARKED: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Pending-job counter plus the parking spot for threads waiting on it.
struct Barrier {
    /// Counted jobs added but not finished.
    pending: AtomicUsize,
    /// Pending jobs that are not blocked in `wait`.
    running: AtomicUsize,
    lock: Mutex<()>,
    idle: Condvar,
}

impl Barrier {
    fn new() -> Self {
        Self {
            pending: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            lock: Mutex::new(()),
            idle: Condvar::new(),
        }
    }

    fn id(&self) -> usize {
        self as *const Barrier as usize
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn enter(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.running.fetch_add(1, Ordering::AcqRel);
    }

    fn leave(&self) {
        let running = self.running.fetch_sub(1, Ordering::AcqRel);
        let pending = self.pending.fetch_sub(1, Ordering::AcqRel);
        if running == 1 || pending == 1 {
            self.notify();
        }
    }

    fn notify(&self) {
        // Taken so a waiter cannot miss the notification between its check and its park.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.idle.notify_all();
    }

    /// Move `slots` of the current thread's jobs out of the running count.
    fn park(&self, slots: usize) {
        if slots == 0 {
            return;
        }
        PARKED.with(|parked| parked.borrow_mut().push((self.id(), slots)));
        if self.running.fetch_sub(slots, Ordering::AcqRel) == slots {
            self.notify();
        }
    }

    fn unpark(&self, slots: usize) {
        if slots == 0 {
            return;
        }
        let id = self.id();
        PARKED.with(|parked| {
            let mut parked = parked.borrow_mut();
            if let Some(pos) = parked.iter().rposition(|&(b, _)| b == id) {
                parked.remove(pos);
            }
        });
        self.running.fetch_add(slots, Ordering::AcqRel);
    }

    /// Slots already parked by `wait` calls further up this thread's stack.
    fn parked_by_current_thread(&self) -> usize {
        let id = self.id();
        PARKED.with(|parked| {
            parked
                .borrow()
                .iter()
                .filter(|&&(b, _)| b == id)
                .map(|&(_, slots)| slots)
                .sum()
        })
    }

    /// Whether a waiter holding `held` slots of its own may return.
    ///
    /// Outside any job that means no pending work at all. Inside a job it
    /// means everything still pending is parked in some `wait`.
    fn settled(&self, held: usize) -> bool {
        if held == 0 {
            self.pending() == 0
        } else {
            self.running.load(Ordering::Acquire) == 0
        }
    }

    /// Number of this barrier's counted jobs the current thread is inside of.
    fn held_by_current_thread(&self) -> usize {
        let id = self.id();
        ACTIVE.with(|active| active.borrow().iter().filter(|&&b| b == id).count())
    }
}

impl Job {
    fn run(self, barrier: &Barrier) {
        let Job { task, counted } = self;
        let id = barrier.id();

        if counted {
            ACTIVE.with(|active| active.borrow_mut().push(id));
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(task));

        if counted {
            ACTIVE.with(|active| {
                let mut active = active.borrow_mut();
                if let Some(pos) = active.iter().rposition(|&b| b == id) {
                    active.remove(pos);
                }
            });
            barrier.leave();
        }

        if outcome.is_err() {
            log::error!("Job panicked on thread {:?}", thread::current().name());
        }
    }
}

/// Thread pool that runs per-pixel (or per-row) render jobs.
///
/// `add_job` and `wait` take `&self`, so a manager can be shared by reference
/// or behind an `Arc` once `init` has run.
pub struct JobManager {
    barrier: Arc<Barrier>,
    sender: Option<Sender<Job>>,
    receiver: Receiver<Job>,
    workers: Vec<JoinHandle<()>>,
    thread_count: usize,
    state: SchedulerState,
}

impl JobManager {
    /// Create an idle manager sized for this machine.
    ///
    /// Uses all logical cores minus two when more than two are available.
    pub fn new() -> Self {
        Self::with_threads(default_thread_count())
    }

    /// Create an idle manager that will spawn exactly `threads` workers.
    ///
    /// Zero is allowed: every job then runs on whichever thread calls `wait`.
    pub fn with_threads(threads: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            barrier: Arc::new(Barrier::new()),
            sender: Some(sender),
            receiver,
            workers: Vec::new(),
            thread_count: threads,
            state: SchedulerState::Idle,
        }
    }

    /// Spawn the worker threads.
    pub fn init(&mut self) {
        if self.state == SchedulerState::Running {
            log::warn!("Job manager already running {} workers", self.workers.len());
            return;
        }

        if self.sender.is_none() {
            let (sender, receiver) = crossbeam_channel::unbounded();
            self.sender = Some(sender);
            self.receiver = receiver;
        }

        log::info!("Starting {} worker threads...", self.thread_count);

        for index in 0..self.thread_count {
            let receiver = self.receiver.clone();
            let barrier = Arc::clone(&self.barrier);
            let spawned = thread::Builder::new()
                .name(format!("raytracey-worker-{index}"))
                .spawn(move || worker_loop(index, receiver, barrier));

            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(e) => log::error!("Failed to spawn worker thread {}: {}", index, e),
            }
        }

        self.state = SchedulerState::Running;
    }

    /// Queue a job that `wait` will block on.
    ///
    /// The pending counter is raised before the job becomes visible to any
    /// consumer. After `release`, the job runs inline on the caller.
    pub fn add_job<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.barrier.enter();
        self.submit(Job {
            task: Box::new(f),
            counted: true,
        });
    }

    /// Queue a fire-and-forget job; `callback` runs right after `f` on the
    /// same thread. The job is not part of the `wait` barrier.
    pub fn add_signaling_job<F, C>(&self, f: F, callback: C)
    where
        F: FnOnce() + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.submit(Job {
            task: Box::new(move || {
                f();
                callback();
            }),
            counted: false,
        });
    }

    /// Block until every counted job has run, executing queued jobs on the
    /// calling thread meanwhile.
    ///
    /// Callable from any thread, including from inside a job. Inside a job
    /// it returns once all other work has finished, apart from jobs that are
    /// themselves blocked in `wait`. There is no quiescence guarantee: if
    /// another thread keeps adding jobs, this may not return until it stops.
    pub fn wait(&self) {
        let barrier = &self.barrier;
        let held = barrier.held_by_current_thread();
        let slots = held.saturating_sub(barrier.parked_by_current_thread());

        barrier.park(slots);
        loop {
            if barrier.settled(held) {
                break;
            }

            match self.receiver.try_recv() {
                Ok(job) => job.run(barrier),
                Err(_) => {
                    // Queue is empty but jobs are still in flight on workers.
                    let guard = barrier.lock.lock().unwrap_or_else(PoisonError::into_inner);
                    if barrier.settled(held) {
                        break;
                    }
                    let _parked = barrier.idle.wait_timeout(guard, WAIT_POLL);
                }
            }
        }
        barrier.unpark(slots);
    }

    /// Stop the pool: workers finish everything already queued, then exit
    /// and are joined.
    pub fn release(&mut self) {
        if self.state == SchedulerState::Stopped {
            return;
        }

        // Workers leave their receive loop once the queue is empty and no sender remains.
        self.sender = None;

        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::error!("Worker thread exited with a panic");
            }
        }

        // Anything queued while no worker existed still runs exactly once.
        while let Ok(job) = self.receiver.try_recv() {
            job.run(&self.barrier);
        }

        self.state = SchedulerState::Stopped;
        log::info!("Job manager stopped");
    }

    /// Counted jobs that have been added but not yet finished.
    pub fn pending(&self) -> usize {
        self.barrier.pending()
    }

    /// Worker threads this manager spawns on `init`.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Worker threads currently alive.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn submit(&self, job: Job) {
        match &self.sender {
            Some(sender) => {
                if let Err(SendError(job)) = sender.send(job) {
                    job.run(&self.barrier);
                }
            }
            None => {
                log::debug!("Job manager stopped, running job inline");
                job.run(&self.barrier);
            }
        }
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.release();
    }
}

fn worker_loop(index: usize, receiver: Receiver<Job>, barrier: Arc<Barrier>) {
    log::debug!("Starting worker thread {}", index);

    for job in receiver.iter() {
        job.run(&barrier);
    }

    log::debug!("Exiting worker thread {}", index);
}

fn default_thread_count() -> usize {
    let cpus = num_cpus::get();
    if cpus > RESERVED_THREADS {
        cpus - RESERVED_THREADS
    } else {
        cpus
    }
}
