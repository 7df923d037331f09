pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to spawn worker for pool `{pool}`: {source}")]
    ThreadSpawn {
        pool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("scheduler not initialized")]
    NotInitialized,

    #[error("already initialized")]
    AlreadyInitialized,
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn thread_spawn(pool: &'static str, source: std::io::Error) -> Self {
        Error::ThreadSpawn { pool, source }
    }
}
