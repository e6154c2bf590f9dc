use crate::application::Application;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Drives collection-and-publish passes for one application at a fixed
/// frequency.
pub struct Runner {
    application: Arc<Application>,
    frequency: Duration,
    iterations: Option<u64>,
    roles: Option<Vec<String>>,
}

impl Runner {
    /// `iterations = None` runs until stopped.
    pub fn new(application: Arc<Application>, frequency: Duration, iterations: Option<u64>) -> Self {
        Self {
            application,
            frequency,
            iterations,
            roles: None,
        }
    }

    /// Only collect role-scoped groups matching one of `roles`.
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.application
    }

    /// Runs until the iteration bound is reached. Returns the number of
    /// completed passes.
    pub async fn start(&self) -> u64 {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs until the iteration bound is reached or `shutdown` completes,
    /// whichever comes first. A pass in progress is never interrupted.
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut tick = interval(self.frequency.max(Duration::from_millis(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            application = %self.application.name(),
            frequency_secs = self.frequency.as_secs_f64(),
            iterations = ?self.iterations,
            "Runner starting"
        );

        let mut passes = 0;
        while self.iterations.map_or(true, |max| passes < max) {
            tokio::select! {
                _ = tick.tick() => {
                    self.pass().await;
                    passes += 1;
                }
                _ = &mut shutdown => {
                    tracing::info!(passes, "Runner stopped");
                    return passes;
                }
            }
        }

        tracing::info!(passes, "Runner finished");
        passes
    }

    async fn pass(&self) {
        match self.application.publish_all(self.roles.as_deref()).await {
            Ok(count) => tracing::debug!(count, "Runner pass complete"),
            Err(e) => tracing::warn!(
                application = %self.application.name(),
                error = %e,
                "Runner pass failed"
            ),
        }
    }
}
