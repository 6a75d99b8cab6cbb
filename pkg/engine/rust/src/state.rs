// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunnerState {
    /// Never started.
    Idle = 0,
    /// Computing arguments and spawning.
    Starting = 1,
    /// Child process is alive.
    Running = 2,
    /// Child exited and the exit has been published.
    Exited = 3,
}

impl RunnerState {
    pub fn is_alive(self) -> bool {
        self == RunnerState::Running
    }

    pub(crate) fn can_transition_to(self, next: RunnerState) -> bool {
        use RunnerState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Exited, Starting)
                | (Starting, Running)
                | (Starting, Idle)
                | (Starting, Exited)
                | (Running, Exited)
        )
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => RunnerState::Starting,
            2 => RunnerState::Running,
            3 => RunnerState::Exited,
            _ => RunnerState::Idle,
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerState::Idle => write!(f, "idle"),
            RunnerState::Starting => write!(f, "starting"),
            RunnerState::Running => write!(f, "running"),
            RunnerState::Exited => write!(f, "exited"),
        }
    }
}

/// Lock-free holder for a [`RunnerState`], shared between the caller and the
/// supervising tasks.
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: RunnerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> RunnerState {
        RunnerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`. Fails with the observed state if the current
    /// state is not `from` or the transition is not allowed.
    pub(crate) fn transition(&self, from: RunnerState, to: RunnerState) -> Result<(), RunnerState> {
        if !from.can_transition_to(to) {
            return Err(self.load());
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(RunnerState::from_u8)
    }

    /// Unconditionally record `state`.
    pub(crate) fn store(&self, state: RunnerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
