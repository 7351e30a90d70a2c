use std::fmt::{self, Debug, Formatter};
use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use event_listener::Event;

struct State {
    running: AtomicBool,
    shutdown: Event,
}

/// A named background thread running a task at a fixed interval until it is
/// stopped or dropped.
pub struct Worker {
    handle: Option<thread::JoinHandle<()>>,
    state: Arc<State>,
}

impl Worker {
    /// Spawn a thread calling `tick` once per `interval` for as long as it
    /// returns `true`. The first call happens after one interval has elapsed.
    pub fn spawn<F>(name: String, interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let state = Arc::new(State {
            running: AtomicBool::new(true),
            shutdown: Event::new(),
        });
        let int_state = state.clone();
        let handle = thread::Builder::new().name(name).spawn(move || {
            loop {
                // register before checking the flag so a stop cannot be missed
                let listener = int_state.shutdown.listen();
                if !int_state.running.load(Ordering::Acquire) {
                    break;
                }
                if !listener.wait_timeout(interval) && !tick() {
                    break;
                }
            }
            int_state.running.store(false, Ordering::Release);
        })?;
        Ok(Self {
            handle: Some(handle),
            state,
        })
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Signal the thread to exit and wait for the current tick to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.state.running.store(false, Ordering::Release);
        self.state.shutdown.notify(usize::MAX);
        if let Some(handle) = self.handle.take() {
            // joining from the worker thread itself would never return
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::error!("background worker panicked");
            }
        }
    }
}

impl Debug for Worker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn worker_ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let worker = Worker::spawn("tick".to_owned(), Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();
        let start = Instant::now();
        while ticks.load(Ordering::SeqCst) < 3 {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::yield_now();
        }
        worker.stop();
        let after = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ticks.load(Ordering::SeqCst), after);
    }

    #[test]
    fn worker_stop_interrupts_wait() {
        let worker = Worker::spawn("idle".to_owned(), Duration::from_secs(3600), || true).unwrap();
        assert!(worker.is_running());
        let start = Instant::now();
        drop(worker);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn worker_exits_when_tick_declines() {
        let worker = Worker::spawn("once".to_owned(), Duration::from_millis(1), || false).unwrap();
        let start = Instant::now();
        while worker.is_running() {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::yield_now();
        }
        worker.stop();
    }
}
