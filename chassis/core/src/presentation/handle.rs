// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

/// Running listener returned by an adapter's `start()`.
///
/// Dropping the handle leaves the server running in the background.
#[derive(Debug)]
pub struct ServerHandle {
    name: &'static str,
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl ServerHandle {
    pub(crate) fn new(
        name: &'static str,
        local_addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<()>>,
    ) -> Self {
        Self {
            name,
            local_addr,
            shutdown,
            task,
        }
    }

    /// Address actually bound (useful when the configured port is 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections, lets in-flight requests finish and waits
    /// for the server task to exit.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down {} on {}", self.name, self.local_addr);
        // The receiver is gone only if the server already exited.
        let _ = self.shutdown.send(());
        self.task
            .await
            .with_context(|| format!("{} task panicked", self.name))?
    }

    /// Waits until the server exits on its own.
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .with_context(|| format!("{} task panicked", self.name))?
    }
}

/// Resolves once `shutdown()` is called. A dropped handle never resolves it.
pub(crate) async fn shutdown_requested(rx: oneshot::Receiver<()>) {
    if rx.await.is_err() {
        std::future::pending::<()>().await;
    }
}
