use std::panic::{catch_unwind, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a worker does when a task body panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Abort the process.
    Abort,
    /// Swallow the panic and keep the worker running.
    Isolate,
    /// Log the panic and keep the worker running.
    #[default]
    LogAndContinue,
}

#[derive(Debug)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    panic_count: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            panic_count: AtomicUsize::new(0),
        }
    }

    /// Runs `f`, containing any panic according to the strategy. `posted_from`
    /// is reported alongside the panic message.
    pub fn execute<F, R>(
        &self,
        posted_from: &'static Location<'static>,
        f: F,
    ) -> Result<R, PanicInfo>
    where
        F: FnOnce() -> R,
    {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => Ok(result),
            Err(panic_payload) => {
                self.panic_count.fetch_add(1, Ordering::Relaxed);

                let panic_info = PanicInfo::from_payload(panic_payload, posted_from);

                match self.strategy {
                    PanicStrategy::Abort => {
                        tracing::error!(
                            posted_from = %panic_info.posted_from,
                            "task panicked (abort strategy): {}",
                            panic_info.message
                        );
                        std::process::abort();
                    }
                    PanicStrategy::Isolate => {}
                    PanicStrategy::LogAndContinue => {
                        tracing::error!(
                            posted_from = %panic_info.posted_from,
                            thread = std::thread::current().name().unwrap_or("<unnamed>"),
                            "task panicked: {}",
                            panic_info.message
                        );
                    }
                }

                Err(panic_info)
            }
        }
    }

    pub fn panic_count(&self) -> usize {
        self.panic_count.load(Ordering::Relaxed)
    }

    pub fn strategy(&self) -> PanicStrategy {
        self.strategy
    }
}

impl Default for PanicHandler {
    fn default() -> Self {
        Self::new(PanicStrategy::default())
    }
}

#[derive(Debug, Clone)]
pub struct PanicInfo {
    pub message: String,
    pub posted_from: &'static Location<'static>,
}

impl PanicInfo {
    fn from_payload(
        payload: Box<dyn std::any::Any + Send>,
        posted_from: &'static Location<'static>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        Self {
            message,
            posted_from,
        }
    }
}
