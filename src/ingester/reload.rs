use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cv: Condvar,
}

/// Background thread that runs a task every `interval` until stopped or dropped.
pub(crate) struct ReloadWorker {
    signal: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl ReloadWorker {
    /// Spawn the worker. The first run happens one `interval` after spawning.
    pub(crate) fn spawn<F>(name: &str, interval: Duration, mut task: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            loop {
                let guard = thread_signal.stopped.lock().unwrap_or_else(PoisonError::into_inner);
                let (guard, _) = thread_signal
                    .cv
                    .wait_timeout_while(guard, interval, |stopped| !*stopped)
                    .unwrap_or_else(PoisonError::into_inner);
                if *guard {
                    break;
                }
                drop(guard);
                task();
            }
        })?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Signal the worker to stop and wait for it. A task already running is finished.
    pub(crate) fn stop(&mut self) {
        {
            let mut stopped = self.signal.stopped.lock().unwrap_or_else(PoisonError::into_inner);
            *stopped = true;
        }
        self.signal.cv.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("reload worker panicked");
            }
        }
    }
}

impl Drop for ReloadWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
