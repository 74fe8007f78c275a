//! Orchestration layer: transports to the wiki, the edit executor, and the
//! import / export / bot-update / move workflows used by the CLI.

pub mod bot_update;
pub mod dir;
pub mod executor;
pub mod export;
pub mod import;
pub mod mediawiki;
pub mod moves;
pub mod remote;
pub mod report;
pub mod retry;
pub mod transport;
pub mod validate;

pub use dir::DirTransport;
pub use executor::{CancelToken, ExecutionReport, Executor, OperationResult, Outcome};
pub use mediawiki::MediaWikiTransport;
pub use retry::RetryConfig;
pub use termwiki_core::Result;
pub use transport::{ListFilter, RemotePage, TransportError, WikiTransport};

/// What every workflow that talks to the wiki needs.
pub struct Session<'a> {
    pub transport: &'a dyn WikiTransport,
    pub retry: RetryConfig,
    /// Edit summary written with every save and delete.
    pub summary: String,
    pub cancel: CancelToken,
}

impl<'a> Session<'a> {
    pub fn new(transport: &'a dyn WikiTransport) -> Self {
        Self {
            transport,
            retry: RetryConfig::default(),
            summary: termwiki_config::DEFAULT_SUMMARY.to_string(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn executor(&self) -> Executor<'_> {
        Executor::new(self.transport, self.retry.clone(), self.summary.clone())
    }
}
