// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

pub mod binary;
pub mod cmdtags;
pub mod config;
pub mod env;
pub mod errors;
pub mod fabric;
pub mod logmask;
pub mod runner;
pub mod state;
pub mod storage;

pub use config::Config;
pub use errors::{ConfigError, ExitCause, ExitError, RunnerError};
pub use fabric::FabricConfig;
pub use runner::{Runner, RunnerExitChan, RunnerExitInfo};
pub use state::RunnerState;
