// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use nix::sys::signal::Signal;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while projecting a configuration value into arguments or
/// environment variables. Only reachable through a programming error in a
/// `CmdTags` implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("unhandled cmd field {field:?} (tag {tag:?}): {kind} values cannot be tagged")]
    UnhandledField {
        field: &'static str,
        tag: &'static str,
        kind: &'static str,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogMaskError {
    #[error("{what} exceeds maximum length ({len}>{max})")]
    TooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },
    #[error("{what} {input:?} contains invalid characters, allowed: {allowed}")]
    InvalidCharacters {
        what: &'static str,
        input: String,
        allowed: &'static str,
    },
    #[error("'all' identifier can not be used with any other {what}")]
    AllWithOther { what: &'static str },
    #[error("illegal log mask assignment {0:?}, must be of the form PREFIX=LEVEL")]
    Assignment(String),
    #[error("unknown log level {token:?}, want one of [{valid}]")]
    UnknownLevel { token: String, valid: String },
    #[error("unknown log subsystem {token:?}, want one of [{valid}]")]
    UnknownSubsystem { token: String, valid: String },
    #[error("unknown debug stream {token:?}, want one of [{valid}]")]
    UnknownStream { token: String, valid: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("undefined environment variable {0:?}")]
    NotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("missing storage tier configuration")]
    NoTiers,
    #[error("first storage tier must be scm class (ram or dcpm), got {0}")]
    FirstTierNotScm(String),
    #[error("only one scm tier may be configured, found another at tier {0}")]
    MultipleScmTiers(usize),
    #[error("tier {tier} ({class}): {field} must be set")]
    MissingField {
        tier: usize,
        class: String,
        field: &'static str,
    },
    #[error("tier {tier} ({class}): {field} must not be set")]
    UnexpectedField {
        tier: usize,
        class: String,
        field: &'static str,
    },
    #[error("tier {tier} (dcpm): scm_list must contain exactly one device, got {count}")]
    DcpmDeviceCount { tier: usize, count: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    NotSet(&'static str),
    #[error("provider count ({providers}) does not match fabric_iface count ({interfaces})")]
    InterfaceCountMismatch { providers: usize, interfaces: usize },
    #[error("fabric_iface_port {0} is invalid, must be non-negative")]
    NegativePort(i32),
    #[error(
        "secondary_provider_endpoints must have one entry per secondary provider (want {want}, got {got})"
    )]
    SecondaryEndpointCount { want: usize, got: usize },
    #[error("secondary_provider_endpoints values must be positive, got {0}")]
    SecondaryEndpointValue(i32),
    #[error("target count must be nonzero")]
    ZeroTargetCount,
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: i64 },
    #[error("cannot specify both pinned_numa_node and first_core")]
    NumaAndFirstCore,
    #[error("configured NUMA node {configured} does not match detected NUMA node {detected}")]
    NumaMismatch { configured: u32, detected: u32 },
    #[error("fabric config validation failed: {0}")]
    Fabric(Box<ConfigError>),
    #[error("storage config validation failed: {0}")]
    Storage(#[from] StorageError),
    #[error("validate engine log masks: {0}")]
    LogMask(#[source] LogMaskError),
    #[error("validate engine debug streams: {0}")]
    DebugStreams(#[source] LogMaskError),
    #[error("validate engine log subsystems: {0}")]
    LogSubsystems(#[source] LogMaskError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Env(#[from] EnvError),
}

impl ConfigError {
    /// True for the advisory NUMA mismatch reported by `set_numa_affinity`.
    pub fn is_numa_mismatch(&self) -> bool {
        matches!(self, ConfigError::NumaMismatch { .. })
    }
}

/// Synchronous failures from `Runner::start`. No process exists when one of
/// these is returned.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("runner is already {0}")]
    AlreadyStarted(crate::state::RunnerState),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("processing engine log environment: {0}")]
    LogEnv(#[source] LogMaskError),
    #[error("empty log masks after merging {subsystems_env} into {masks_env}")]
    EmptyLogMask {
        masks_env: &'static str,
        subsystems_env: &'static str,
    },
    #[error("can't start {name}: {source}")]
    BinaryNotFound {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{} (instance {index}) failed to start: {source}", path.display())]
    Spawn {
        path: PathBuf,
        index: u32,
        #[source]
        source: std::io::Error,
    },
}

/// How a supervised process ended. `NormalExit` is returned for a zero exit
/// status so that every exit is reported as an error value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCause {
    #[error("process exited with 0")]
    NormalExit,
    #[error("exit status {0}")]
    ExitCode(i32),
    #[error("signal: {}", signal_name(.0))]
    Signaled(i32),
    #[error("waiting for process failed: {0}")]
    Wait(std::io::ErrorKind),
}

fn signal_name(signo: &i32) -> String {
    match Signal::try_from(*signo) {
        Ok(sig) => sig.to_string(),
        Err(_) => signo.to_string(),
    }
}

/// Exit of an engine process, wrapped with the binary and instance that
/// produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} (instance {index}) exited: {cause}", binary.display())]
pub struct ExitError {
    pub binary: PathBuf,
    pub index: u32,
    #[source]
    pub cause: ExitCause,
}

impl ExitError {
    pub fn cause(&self) -> ExitCause {
        self.cause
    }
}
