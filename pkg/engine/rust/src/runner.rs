// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Supervision of one engine process.
//!
//! [`Runner::start`] spawns the engine and returns a one-shot receiver that
//! yields exactly one [`RunnerExitInfo`]. A single task owns the child: it
//! forwards queued signals, kills the engine when the parent token is
//! cancelled, and publishes the exit once the child is reaped.

use crate::binary::{DEFAULT_ENGINE_BIN, find_binary};
use crate::config::Config;
use crate::env::{delete_key_value, find_key_value, split_key_value, update_key_value};
use crate::errors::{ConfigError, ExitCause, ExitError, RunnerError};
use crate::logmask::{DEBUG_SUBSYS_ENV, LOG_MASK_ENV, merge_log_env_vars};
use crate::state::{AtomicState, RunnerState};
use log::{debug, error, info, log, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// How a supervised engine ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerExitInfo {
    pub error: ExitError,
    pub pid: u32,
}

impl RunnerExitInfo {
    pub fn is_normal_exit(&self) -> bool {
        self.error.cause() == ExitCause::NormalExit
    }
}

/// Receives the single exit notification of a started engine.
pub type RunnerExitChan = oneshot::Receiver<RunnerExitInfo>;

pub struct Runner {
    config: Config,
    engine_bin: String,
    state: Arc<AtomicState>,
    sig_tx: Mutex<Option<mpsc::UnboundedSender<Signal>>>,
}

impl Runner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            engine_bin: DEFAULT_ENGINE_BIN.to_string(),
            state: Arc::new(AtomicState::new(RunnerState::Idle)),
            sig_tx: Mutex::new(None),
        }
    }

    /// Override the engine binary. A name containing `/` is used as a path.
    pub fn with_engine_binary(mut self, name: impl Into<String>) -> Self {
        self.engine_bin = name.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> RunnerState {
        self.state.load()
    }

    pub fn is_running(&self) -> bool {
        self.state.load().is_alive()
    }

    /// Queue `sig` for delivery to the engine. Does nothing when no engine is
    /// running.
    pub fn signal(&self, sig: Signal) {
        if !self.is_running() {
            return;
        }
        let guard = self.sig_tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref()
            && tx.send(sig).is_err()
        {
            debug!("engine {}: dropped {sig}, relay stopped", self.config.index);
        }
    }

    /// Start the engine. Returns once the process has been spawned; the exit
    /// is delivered on the returned channel. Cancelling `cancel` kills the
    /// engine.
    pub async fn start(&self, cancel: CancellationToken) -> Result<RunnerExitChan, RunnerError> {
        let prev = self.state.load();
        self.state
            .transition(prev, RunnerState::Starting)
            .map_err(RunnerError::AlreadyStarted)?;

        self.spawn_engine(cancel).inspect_err(|_| self.state.store(prev))
    }

    fn spawn_engine(&self, cancel: CancellationToken) -> Result<RunnerExitChan, RunnerError> {
        let index = self.config.index;
        let args = self.config.cmd_line_args()?;
        let mut env = self.config.effective_env()?;
        process_log_envs(&mut env)?;

        let binary =
            find_binary(&self.engine_bin).map_err(|source| RunnerError::BinaryNotFound {
                name: self.engine_bin.clone(),
                source,
            })?;
        let prefix = format!("{}:{index}", display_name(&binary));

        let mut cmd = Command::new(&binary);
        cmd.args(&args)
            .env_clear()
            .envs(env.iter().filter_map(|kv| split_key_value(kv)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // SAFETY: the closure only performs async-signal-safe syscalls.
        unsafe {
            cmd.pre_exec(drop_privileges);
        }

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            path: binary.clone(),
            index,
            source,
        })?;
        let pid = child.id().unwrap_or(0);
        info!("{prefix}: started (pid={pid}, binary={})", binary.display());
        debug!("{prefix}: args {args:?}");
        debug!("{prefix}: env {env:?}");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, prefix.clone(), log::Level::Info));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, prefix.clone(), log::Level::Error));
        }

        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        *self.sig_tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(sig_tx);

        self.state.store(RunnerState::Running);

        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(supervise(
            child,
            ExitContext {
                binary,
                index,
                pid,
                prefix,
            },
            Arc::clone(&self.state),
            cancel,
            sig_rx,
            exit_tx,
        ));

        Ok(exit_rx)
    }
}

struct ExitContext {
    binary: PathBuf,
    index: u32,
    pid: u32,
    prefix: String,
}

fn display_name(binary: &Path) -> String {
    binary
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| binary.display().to_string())
}

/// Fold `DD_SUBSYS` into `D_LOG_MASK` when both are set.
fn process_log_envs(env: &mut Vec<String>) -> Result<(), RunnerError> {
    let (Some(masks), Some(subsystems)) = (
        find_key_value(env, LOG_MASK_ENV).filter(|v| !v.is_empty()),
        find_key_value(env, DEBUG_SUBSYS_ENV).filter(|v| !v.is_empty()),
    ) else {
        return Ok(());
    };

    let merged = merge_log_env_vars(masks, subsystems).map_err(RunnerError::LogEnv)?;
    if merged.is_empty() {
        return Err(RunnerError::EmptyLogMask {
            masks_env: LOG_MASK_ENV,
            subsystems_env: DEBUG_SUBSYS_ENV,
        });
    }
    debug!("{LOG_MASK_ENV} merged with {DEBUG_SUBSYS_ENV}: {merged}");

    update_key_value(env, LOG_MASK_ENV, &merged).map_err(ConfigError::from)?;
    delete_key_value(env, DEBUG_SUBSYS_ENV);
    Ok(())
}

/// Runs in the child between fork and exec: drop to the real ids and ask to
/// be killed along with the parent. Supplementary groups are left alone.
fn drop_privileges() -> std::io::Result<()> {
    use nix::unistd::{getgid, getuid, setgid, setuid};

    setgid(getgid())?;
    setuid(getuid())?;
    #[cfg(target_os = "linux")]
    nix::sys::prctl::set_pdeathsig(Signal::SIGKILL)?;
    Ok(())
}

/// Hand each line of `reader` to `emit` until end of stream. Lines are not
/// required to be UTF-8; invalid sequences are replaced.
async fn drain_lines<R, F>(reader: R, mut emit: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = buf.strip_suffix(b"\n").unwrap_or(buf.as_slice());
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        emit(&String::from_utf8_lossy(line));
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, prefix: String, level: log::Level) {
    if let Err(e) = drain_lines(reader, |line| log!(level, "{prefix}: {line}")).await {
        warn!("{prefix}: reading output: {e}");
    }
}

fn exit_cause(status: std::io::Result<std::process::ExitStatus>) -> ExitCause {
    match status {
        Ok(status) if status.success() => ExitCause::NormalExit,
        Ok(status) => match (status.code(), status.signal()) {
            (Some(code), _) => ExitCause::ExitCode(code),
            (None, Some(signo)) => ExitCause::Signaled(signo),
            (None, None) => ExitCause::ExitCode(-1),
        },
        Err(e) => ExitCause::Wait(e.kind()),
    }
}

async fn supervise(
    mut child: Child,
    ctx: ExitContext,
    state: Arc<AtomicState>,
    cancel: CancellationToken,
    mut sig_rx: mpsc::UnboundedReceiver<Signal>,
    exit_tx: oneshot::Sender<RunnerExitInfo>,
) {
    let prefix = &ctx.prefix;
    let mut killed = false;
    let status = loop {
        tokio::select! {
            biased;
            status = child.wait() => break status,
            _ = cancel.cancelled(), if !killed => {
                killed = true;
                match child.start_kill() {
                    Ok(()) => info!("{prefix}: killed on cancellation"),
                    Err(e) => error!("{prefix}: failed to kill: {e}"),
                }
            }
            Some(sig) = sig_rx.recv() => forward_signal(&child, sig, prefix),
        }
    };

    state.store(RunnerState::Exited);
    let info = RunnerExitInfo {
        error: ExitError {
            binary: ctx.binary,
            index: ctx.index,
            cause: exit_cause(status),
        },
        pid: ctx.pid,
    };
    if info.is_normal_exit() {
        info!("{prefix}: {}", info.error);
    } else {
        error!("{prefix}: {}", info.error);
    }

    if exit_tx.send(info).is_err() {
        debug!("{prefix}: exit notification receiver dropped");
    }
}

/// Deliver `sig` to a child that has not been reaped yet.
fn forward_signal(child: &Child, sig: Signal, prefix: &str) {
    let Some(pid) = child.id() else {
        debug!("{prefix}: not running, {sig} dropped");
        return;
    };
    match signal::kill(Pid::from_raw(pid as i32), sig) {
        Ok(()) => info!("{prefix}: sent {sig}"),
        Err(Errno::ESRCH) => debug!("{prefix}: not running, {sig} dropped"),
        Err(e) => warn!("{prefix}: failed to send {sig}: {e}"),
    }
}
