//! Worker subprocess lifecycle

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::BufWriter;
use tokio::process::{Child, Command};

use crate::error::{BridgeError, Result};
use crate::mcp::Transport;
use crate::types::WorkerConfig;

/// A running worker process
///
/// The worker reads requests on stdin and writes responses on stdout; its
/// stderr is inherited so worker logs land next to ours. Dropping the
/// process kills it.
pub struct WorkerProcess {
    child: Child,
}

impl WorkerProcess {
    /// Spawn the worker and wrap its pipes in a transport
    pub fn spawn(config: &WorkerConfig) -> Result<(Self, Transport)> {
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(BridgeError::Spawn)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(BridgeError::Spawn(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "worker pipes not captured",
            )));
        };

        tracing::info!(
            pid = child.id(),
            "Spawned worker {}",
            config.program.display()
        );

        let transport =
            Transport::new(stdout, BufWriter::new(stdin)).with_read_timeout(config.read_timeout());
        Ok((Self { child }, transport))
    }

    /// Wait up to `grace` for the worker to exit, then kill it
    ///
    /// Returns the exit status when the worker exited on its own.
    pub async fn shutdown(mut self, grace: Duration) -> Result<Option<ExitStatus>> {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("Worker exited with {}", status);
                Ok(Some(status))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                tracing::warn!("Worker still running after {:?}, killing it", grace);
                self.child.kill().await?;
                Ok(None)
            }
        }
    }
}
