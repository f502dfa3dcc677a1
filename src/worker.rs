//! The connection-dispatch runtime's worker half (§4.4): one worker owns
//! one connection at a time, looping read → parse → dispatch → reply,
//! enforcing the per-connection idle deadline and the cooperative
//! shutdown protocol.
//!
//! Grounded on `pkg/server/worker.go` in the original implementation,
//! generalized from an OS-thread-per-worker model with a buffered `int64`
//! shutdown channel to `tokio` tasks with a `oneshot` shutdown signal and a
//! `mpsc` rendezvous intake, per REDESIGN FLAG RF-3 in SPEC_FULL.md.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;
use crate::parser::Parser;
use crate::reply::Reply;
use crate::store::KeyStore;

/// The key store as shared across every worker: one mutex, guarding
/// whichever [`KeyStore`] implementation the dispatcher was built with.
pub type SharedStore = Arc<Mutex<Box<dyn KeyStore>>>;

/// One accepted connection, handed from the accept loop to a worker over
/// the intake channel.
pub type Accepted = (TcpStream, SocketAddr);

/// The receiving half of the intake rendezvous, shared by every worker.
/// `tokio::sync::mpsc::Receiver` cannot be cloned, so workers take turns
/// locking it to pull the next connection — this is itself the admission
/// control described in §4.5: only one worker at a time can be mid-`recv`.
pub type Intake = Arc<tokio::sync::Mutex<mpsc::Receiver<Accepted>>>;

/// Per-worker construction parameters (§3 "Worker context").
pub struct WorkerContext {
    pub id: u64,
    pub store: SharedStore,
    pub intake: Intake,
    /// Fires once, carrying the shutdown grace period, when the dispatcher
    /// signals this worker to drain (§4.5).
    pub shutdown: oneshot::Receiver<Duration>,
    /// Kept alive for the worker's lifetime; dropped (along with the rest
    /// of the worker) when its task returns, which is how the dispatcher's
    /// shutdown waiter (§4.5, §9) detects every worker has finished.
    pub done: mpsc::Sender<()>,
    pub idle_timeout: Duration,
    pub message_size_limit: usize,
}

/// One worker: owns a connection from acceptance until it closes, then
/// blocks on the intake channel for the next one.
pub struct Worker {
    id: u64,
    store: SharedStore,
    intake: Intake,
    shutdown: oneshot::Receiver<Duration>,
    _done: mpsc::Sender<()>,
    idle_timeout: Duration,
    message_size_limit: usize,
    draining: bool,
}

impl Worker {
    /// Spawns this worker's loop as a `tokio` task and returns its handle.
    pub fn spawn(ctx: WorkerContext) -> JoinHandle<()> {
        let worker = Worker {
            id: ctx.id,
            store: ctx.store,
            intake: ctx.intake,
            shutdown: ctx.shutdown,
            _done: ctx.done,
            idle_timeout: ctx.idle_timeout,
            message_size_limit: ctx.message_size_limit,
            draining: false,
        };
        tokio::spawn(worker.run())
    }

    /// Pulls connections off the intake channel and serves them one at a
    /// time until the channel is closed (the dispatcher is shutting down),
    /// at which point this worker's task returns and `_done` is dropped.
    async fn run(mut self) {
        loop {
            let accepted = {
                let mut intake = self.intake.lock().await;
                intake.recv().await
            };
            match accepted {
                Some((socket, peer)) => self.handle_connection(socket, peer).await,
                None => {
                    debug!(worker = self.id, "intake closed, worker exiting");
                    return;
                }
            }
        }
    }

    /// Serves exactly one connection until it closes, per the loop in
    /// §4.4.
    async fn handle_connection(&mut self, mut socket: TcpStream, peer: SocketAddr) {
        debug!(worker = self.id, %peer, "connection accepted");
        let mut parser = Parser::new(self.message_size_limit);
        let mut deadline = self.idle_timeout;

        loop {
            // Step 2: non-blocking shutdown check. Once signaled, the
            // grace period replaces the normal idle deadline and the
            // check is not repeated (`draining` latches).
            if !self.draining {
                if let Ok(grace) = self.shutdown.try_recv() {
                    debug!(worker = self.id, %peer, "draining for shutdown");
                    self.draining = true;
                    deadline = grace;
                }
            }

            // Steps 1 and 3: the idle deadline bounds this read; expiry is
            // a transport-level close, identical in effect to EOF/reset.
            let read_outcome = tokio::time::timeout(deadline, parser.read(&mut socket)).await;
            match read_outcome {
                Err(_elapsed) => {
                    debug!(worker = self.id, %peer, "idle deadline exceeded");
                    return;
                }
                Ok(Err(Error::Transport(err))) => {
                    debug!(worker = self.id, %peer, error = %err, "connection closed");
                    return;
                }
                Ok(Err(Error::SizeExceeded { limit })) => {
                    warn!(worker = self.id, %peer, limit, "message size limit exceeded");
                    let reply = Reply::Error(
                        Error::SizeExceeded { limit }.client_message().to_string(),
                    );
                    if self.write_reply(&mut socket, &reply.encode()).await.is_err() {
                        return;
                    }
                    continue;
                }
                Ok(Err(other)) => {
                    // read() only ever produces Transport or SizeExceeded.
                    debug!(worker = self.id, %peer, error = %other, "unexpected read error");
                    return;
                }
                Ok(Ok(())) => {}
            }

            // Step 4: extract whatever complete frames are now available.
            let batch = parser.parse_command();

            // Step 5: dispatch each record in order, locking the store for
            // exactly one command's execution at a time (§4.3, §4.4 step 5)
            // so a large pipeline from one connection never starves the
            // others for longer than a single command.
            let mut out = Vec::new();
            for record in &batch.records {
                match record {
                    Ok(cmd) => {
                        debug!(worker = self.id, %peer, ?cmd, "dispatching command");
                        let mut store = self.store.lock().unwrap();
                        cmd.execute(&mut **store).encode_into(&mut out);
                    }
                    Err(err) => {
                        warn!(worker = self.id, %peer, error = %err, "command rejected");
                        Reply::Error(err.client_message().to_string()).encode_into(&mut out);
                    }
                }
            }

            // Step 6: one write for the whole batch.
            if self.write_reply(&mut socket, &out).await.is_err() {
                return;
            }

            if batch.fatal {
                warn!(worker = self.id, %peer, "malformed frame, closing connection");
                return;
            }

            // Step 7: deadline restarts automatically on the next loop's
            // `timeout(deadline, ...)` call.
        }
    }

    async fn write_reply(
        &self,
        socket: &mut TcpStream,
        bytes: &[u8],
    ) -> std::io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        socket.write_all(bytes).await
    }
}
