/// Engine adapter backed by a child process.
///
/// `initialize()` spawns the configured executable and resolves on its first
/// `ready` line. Three local tasks then serve the pipes:
///   - stdout: protocol events → ready signal / `EngineHooks`
///   - stdin:  queued command lines (so every adapter call is non-blocking)
///   - stderr: forwarded to the log
///
/// If the child goes away after `ready`, the reader reports
/// `EngineEvent::Exited` and further calls fail with `Disconnected`.
/// The child is killed when the adapter is dropped or re-initialized; a
/// replaced child loses its hooks first, so none of its output or its exit
/// reaches the session.
/// Must be driven from inside a `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::process::Stdio;
use std::rc::Rc;

use futures_util::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::protocol::{self, EngineMessage, HostCommand};
use super::{Engine, EngineError, EngineHooks, InitFuture};
use crate::options::GameOptions;

#[derive(Clone, Debug)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// State shared with the stdout reader of the current child.
#[derive(Default)]
struct Link {
    ready: Cell<bool>,
    exited: Cell<bool>,
    hooks: RefCell<Option<EngineHooks>>,
}

impl Link {
    fn retire(&self) {
        self.hooks.borrow_mut().take();
    }

    fn emit(&self, f: impl FnOnce(&EngineHooks)) {
        match self.hooks.borrow().as_ref() {
            Some(hooks) => f(hooks),
            None => debug!("engine event before configure dropped"),
        }
    }
}

pub struct ProcessEngine {
    command: EngineCommand,
    _child: Option<Child>,
    outbox: Option<mpsc::UnboundedSender<String>>,
    link: Rc<Link>,
}

impl ProcessEngine {
    pub fn new(command: EngineCommand) -> Self {
        ProcessEngine {
            command,
            _child: None,
            outbox: None,
            link: Rc::new(Link::default()),
        }
    }

    fn spawn(&mut self) -> Result<oneshot::Receiver<Result<(), EngineError>>, EngineError> {
        // Retrying: detach and kill the previous child first.
        self.link.retire();
        self._child = None;
        self.outbox = None;
        self.link = Rc::new(Link::default());

        let program = &self.command.program;
        info!(program = %program.display(), args = ?self.command.args, "starting engine");

        let mut child = Command::new(program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {e}", program.display())))?;

        let missing = |pipe: &str| EngineError::Spawn(format!("engine {pipe} not captured"));
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        tokio::task::spawn_local(read_events(stdout, self.link.clone(), ready_tx));
        tokio::task::spawn_local(write_commands(stdin, out_rx));
        tokio::task::spawn_local(forward_stderr(stderr));

        self._child = Some(child);
        self.outbox = Some(out_tx);
        Ok(ready_rx)
    }

    fn send(&self, cmd: HostCommand<'_>) -> Result<(), EngineError> {
        if self.link.exited.get() {
            return Err(EngineError::Disconnected);
        }
        if !self.link.ready.get() {
            return Err(EngineError::NotInitialized);
        }
        let outbox = self.outbox.as_ref().ok_or(EngineError::NotInitialized)?;
        let line = protocol::encode(&cmd)?;
        outbox.send(line).map_err(|_| EngineError::Disconnected)
    }
}

impl Engine for ProcessEngine {
    fn initialize(&mut self) -> InitFuture {
        match self.spawn() {
            Ok(ready) => async move { ready.await.unwrap_or(Err(EngineError::ExitedEarly)) }
                .boxed_local(),
            Err(e) => futures_util::future::ready(Err(e)).boxed_local(),
        }
    }

    fn configure(&mut self, options: &GameOptions, hooks: EngineHooks) -> Result<(), EngineError> {
        *self.link.hooks.borrow_mut() = Some(hooks);
        self.send(HostCommand::Configure { options })
    }

    fn set_running(&mut self, reset_score: bool) -> Result<(), EngineError> {
        self.send(HostCommand::SetRunning { reset_score })
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.send(HostCommand::Stop)
    }

    fn apply_options(&mut self, options: &GameOptions) -> Result<(), EngineError> {
        self.send(HostCommand::ApplyOptions { options })
    }
}

// ── Pipe tasks ──

async fn read_events(
    stdout: ChildStdout,
    link: Rc<Link>,
    ready_tx: oneshot::Sender<Result<(), EngineError>>,
) {
    let mut ready_tx = Some(ready_tx);
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "engine stdout read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match protocol::decode(&line) {
            Ok(EngineMessage::Ready) => match ready_tx.take() {
                Some(tx) => {
                    link.ready.set(true);
                    let _ = tx.send(Ok(()));
                }
                None => debug!("duplicate ready ignored"),
            },
            Ok(EngineMessage::Score) => link.emit(EngineHooks::on_score),
            Ok(EngineMessage::GameOver) => link.emit(EngineHooks::on_game_over),
            Ok(EngineMessage::Error { message }) => match ready_tx.take() {
                Some(tx) => {
                    let _ = tx.send(Err(EngineError::Reported(message)));
                }
                None => error!(%message, "engine reported an error"),
            },
            Err(e) => warn!(error = %e, "skipping engine line"),
        }
    }

    // Dropping an unsent ready_tx rejects initialize() with ExitedEarly.
    if link.ready.replace(false) {
        link.exited.set(true);
        warn!("engine exited");
        link.emit(EngineHooks::on_exited);
    } else {
        info!("engine output closed");
    }
}

async fn write_commands(mut stdin: ChildStdin, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        let written = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(error = %e, "engine stdin closed");
            break;
        }
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "engine", "{line}");
    }
}
