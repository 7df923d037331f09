use crate::error::{Error, Result};
use crate::executor::PanicStrategy;

const MAX_THREADS_PER_POOL: usize = 1024;

/// What happens to queued work when the scheduler is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Workers finish the unit they already claimed; everything still queued
    /// is dropped without running.
    #[default]
    Discard,
    /// Workers keep claiming until their queues are empty, then exit.
    Drain,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Threads in each foreground pool. `None` means one per logical CPU.
    pub foreground_threads: Option<usize>,
    /// Threads in each background pool. `None` means half the logical CPUs.
    pub background_threads: Option<usize>,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
    pub panic_strategy: PanicStrategy,
    pub join_policy: JoinPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            foreground_threads: None,
            background_threads: None,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "strand-worker".to_string(),
            panic_strategy: PanicStrategy::default(),
            join_policy: JoinPolicy::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, threads) in [
            ("foreground_threads", self.foreground_threads),
            ("background_threads", self.background_threads),
        ] {
            if let Some(n) = threads {
                if n == 0 {
                    return Err(Error::config(format!("{} must be > 0", name)));
                }
                if n > MAX_THREADS_PER_POOL {
                    return Err(Error::config(format!(
                        "{} too large (max {})",
                        name, MAX_THREADS_PER_POOL
                    )));
                }
            }
        }

        if self.stack_size == Some(0) {
            return Err(Error::config("stack_size must be > 0"));
        }

        Ok(())
    }

    pub fn foreground_worker_threads(&self) -> usize {
        self.foreground_threads
            .unwrap_or_else(|| num_cpus::get().max(1))
    }

    pub fn background_worker_threads(&self) -> usize {
        self.background_threads
            .unwrap_or_else(|| (num_cpus::get() / 2).max(1))
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn foreground_threads(mut self, n: usize) -> Self {
        self.config.foreground_threads = Some(n);
        self
    }

    pub fn background_threads(mut self, n: usize) -> Self {
        self.config.background_threads = Some(n);
        self
    }

    /// Same thread count for every pool.
    pub fn threads_per_pool(self, n: usize) -> Self {
        self.foreground_threads(n).background_threads(n)
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn join_policy(mut self, policy: JoinPolicy) -> Self {
        self.config.join_policy = policy;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
