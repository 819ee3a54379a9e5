use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a running tick loop. Possession of the handle is exclusive
/// ownership of the periodic callback; dropping it signals the loop to stop
/// without waiting for the thread.
#[derive(Debug)]
pub struct TickHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TickHandle {
    /// Signal the loop to stop. Takes effect before the next tick fires.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Signal the loop and wait for the thread to finish.
    pub fn join(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Spawn a strictly serial tick loop: `on_tick` always runs to completion
/// before the next tick is scheduled, so ticks never overlap. The loop exits
/// when `on_tick` returns false or the handle is stopped.
pub fn spawn_ticker<F>(period: Duration, mut on_tick: F) -> TickHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let thread = thread::spawn(move || loop {
        thread::sleep(period);
        if flag.load(Ordering::SeqCst) {
            break;
        }
        if !on_tick() {
            break;
        }
    });
    TickHandle {
        stop,
        thread: Some(thread),
    }
}
