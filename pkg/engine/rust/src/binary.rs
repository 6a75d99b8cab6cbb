// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Resolution of the engine binary.

use std::ffi::OsStr;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENGINE_BIN: &str = "daos_engine";

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn search_dirs(dirs: impl IntoIterator<Item = PathBuf>, name: &str) -> Option<PathBuf> {
    dirs.into_iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Locate `name` in `path_var` (a `PATH`-style list), then next to `exe`.
/// Names containing `/` are taken as paths and are not searched for.
pub fn find_binary_in(
    name: &str,
    path_var: Option<&OsStr>,
    exe: Option<&Path>,
) -> io::Result<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        if is_executable(&path) {
            return Ok(path);
        }
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{name}: no such executable file"),
        ));
    }

    if let Some(path_var) = path_var
        && let Some(found) = search_dirs(std::env::split_paths(path_var), name)
    {
        return Ok(found);
    }

    if let Some(dir) = exe.and_then(Path::parent)
        && let Some(found) = search_dirs([dir.to_path_buf()], name)
    {
        return Ok(found);
    }

    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{name}: executable file not found in $PATH or next to the current executable"),
    ))
}

/// Locate `name` using this process's `PATH` and executable location.
pub fn find_binary(name: &str) -> io::Result<PathBuf> {
    let path_var = std::env::var_os("PATH");
    let exe = std::env::current_exe().ok();
    find_binary_in(name, path_var.as_deref(), exe.as_deref())
}
