// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use engine_supervisor::storage::{TierClass, TierConfig};
use engine_supervisor::{Config, Runner, RunnerError, RunnerExitChan};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// Writing an executable while another test forks can leave it open for
// writing in the child, making exec fail with ETXTBSY.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

/// A shell script standing in for the engine binary.
pub struct FakeEngine {
    dir: TempDir,
    path: PathBuf,
}

impl FakeEngine {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("daos_engine");
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("failed to chmod script");
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A path inside the script's directory for the script to write to.
    pub fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn runner(&self, config: Config) -> Runner {
        Runner::new(config).with_engine_binary(self.path.to_str().expect("non-UTF-8 tempdir"))
    }

    pub async fn start(
        &self,
        runner: &Runner,
        cancel: CancellationToken,
    ) -> Result<RunnerExitChan, RunnerError> {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        runner.start(cancel).await
    }
}

pub fn minimal_config() -> Config {
    Config::new()
        .with_fabric_provider("ofi+tcp")
        .with_fabric_interface("eth0")
        .with_fabric_interface_port(31416)
        .with_storage(vec![
            TierConfig::new()
                .with_storage_class(TierClass::Ram)
                .with_scm_mount_point("/mnt/daos")
                .with_scm_ramdisk_size(16),
        ])
        .with_target_count(4)
        .with_pinned_numa_node(0)
        .with_env_pass_through(["PATH"])
}

/// Wait until `path` exists and is non-empty, or timeout.
pub fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if fs::metadata(path).is_ok_and(|m| m.len() > 0) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

/// Records every log line so tests can check where engine output went.
struct CaptureLogger {
    records: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for CaptureLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static CAPTURE: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

/// Install the capturing logger for this test binary.
pub fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&CAPTURE).expect("logger already installed");
        log::set_max_level(log::LevelFilter::Debug);
    });
}

/// Captured records whose message starts with `prefix`.
pub fn logged_with_prefix(prefix: &str) -> Vec<(log::Level, String)> {
    CAPTURE
        .records
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .filter(|(_, msg)| msg.starts_with(prefix))
        .cloned()
        .collect()
}

/// Wait until a record `(level, msg)` has been captured, or timeout. Output
/// is forwarded by tasks on the test runtime, so this yields instead of
/// blocking.
pub async fn wait_for_record(level: log::Level, msg: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let found = CAPTURE
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|(l, m)| *l == level && m == msg);
        if found {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
