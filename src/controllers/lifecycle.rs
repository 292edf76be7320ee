//! Start-once guard for long-running sub-controllers

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client};
use tokio::sync::Mutex;
use tracing::info;

#[cfg(test)]
use mockall::automock;

use crate::controllers::{gatewayclass_controller, Context};
use crate::crd::GatewayClass;
use crate::{Error, Result};

/// Process-wide handle to a sub-controller
///
/// Moves from not started to started at most once. The flag is checked and
/// set under one lock, so concurrent callers of [`ensure_started`] never run
/// the start function twice.
///
/// [`ensure_started`]: ControllerHandle::ensure_started
#[derive(Debug)]
pub struct ControllerHandle {
    name: String,
    started: Mutex<bool>,
}

impl ControllerHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Mutex::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn is_started(&self) -> bool {
        *self.started.lock().await
    }

    /// Run `start` unless the controller is already running
    ///
    /// Returns `Ok(true)` when this call started it. If `start` fails the
    /// handle stays not started and a later call will try again.
    pub async fn ensure_started<F, Fut>(&self, start: F) -> Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut started = self.started.lock().await;
        if *started {
            return Ok(false);
        }
        start()
            .await
            .map_err(|e| e.during(format!("start {} controller", self.name)))?;
        *started = true;
        info!(controller = %self.name, "Started controller");
        Ok(true)
    }
}

/// Starts a sub-controller in the background
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControllerLauncher: Send + Sync {
    /// Spawn the controller; returns once it is running
    async fn launch(&self, ctx: Arc<Context>) -> Result<()>;
}

/// Launches the GatewayClass controller against the cluster
pub struct GatewayClassLauncher {
    client: Client,
}

impl GatewayClassLauncher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ControllerLauncher for GatewayClassLauncher {
    async fn launch(&self, ctx: Arc<Context>) -> Result<()> {
        // Controller::new would spin on a missing CRD; fail instead so the handle stays unstarted
        let gateway_classes: Api<GatewayClass> = Api::all(self.client.clone());
        gateway_classes
            .list(&ListParams::default().limit(1))
            .await
            .map_err(|e| Error::ControllerStart {
                controller: "gatewayclass".to_string(),
                message: format!("GatewayClass API is not served: {}", e),
            })?;

        tokio::spawn(gatewayclass_controller::run(self.client.clone(), ctx));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_start_once() {
        let handle = Arc::new(ControllerHandle::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let handle = Arc::clone(&handle);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    handle
                        .ensure_started(|| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        let mut started_here = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                started_here += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started_here, 1);
        assert!(handle.is_started().await);
    }

    #[tokio::test]
    async fn failed_start_can_be_retried() {
        let handle = ControllerHandle::new("test");

        let err = handle
            .ensure_started(|| async { Err(Error::Transport("api down".to_string())) })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("start test controller"));
        assert!(!handle.is_started().await);

        assert!(handle.ensure_started(|| async { Ok(()) }).await.unwrap());
        assert!(handle.is_started().await);
    }

    #[tokio::test]
    async fn started_handle_skips_start() {
        let handle = ControllerHandle::new("test");
        handle.ensure_started(|| async { Ok(()) }).await.unwrap();

        let calls = AtomicUsize::new(0);
        let started = handle
            .ensure_started(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        assert!(!started);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "controller was started twice");
    }

    #[tokio::test]
    async fn launcher_runs_through_handle_once() {
        let mut launcher = MockControllerLauncher::new();
        launcher.expect_launch().times(1).returning(|_| Ok(()));
        let launcher: Arc<dyn ControllerLauncher> = Arc::new(launcher);

        let ctx = crate::controllers::tests::memory_context(Arc::clone(&launcher));
        for _ in 0..3 {
            let launcher = Arc::clone(&launcher);
            let launch_ctx = Arc::clone(&ctx);
            ctx.gatewayclass_controller
                .ensure_started(|| async move { launcher.launch(launch_ctx).await })
                .await
                .unwrap();
        }
    }
}
