// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Validation and merging of engine logging controls.
//!
//! - `D_LOG_MASK`: `LEVEL[,SUBSYS=LEVEL...]`, the first token may be a bare
//!   level that applies to every subsystem.
//! - `DD_MASK`: comma separated debug streams.
//! - `DD_SUBSYS`: comma separated subsystems whose debug output is enabled.
//!
//! Comparisons are case-insensitive. `all` must appear alone.

use crate::errors::LogMaskError;

pub const LOG_MASK_ENV: &str = "D_LOG_MASK";
pub const DEBUG_STREAMS_ENV: &str = "DD_MASK";
pub const DEBUG_SUBSYS_ENV: &str = "DD_SUBSYS";

pub const MAX_LOG_MASK_LEN: usize = 1023;

/// Level applied to subsystems not listed in `DD_SUBSYS` after a merge.
pub const DEFAULT_LOG_LEVEL: &str = "ERROR";

const ALL: &str = "all";

const LOG_LEVELS: &[&str] = &[
    "DEBUG", "DBUG", "INFO", "NOTE", "WARN", "ERROR", "ERR", "CRIT", "ALRT", "FATAL", "EMRG",
    "EMIT",
];

const LOG_SUBSYSTEMS: &[&str] = &[
    "all", "common", "tree", "vos", "client", "server", "rdb", "rsvc", "pool", "container",
    "object", "placement", "rebuild", "mgmt", "bio", "tests", "dfs", "duns", "drpc", "security",
    "dtx", "dfuse", "il", "csum", "pipeline", "stack", "misc", "mem", "swim", "fi", "telem", "rpc",
    "hg", "external", "st", "iv", "ctl", "chk",
];

const DEBUG_STREAMS: &[&str] = &[
    "all", "md", "pl", "mgmt", "epc", "df", "rebuild", "sec", "csum", "daos_default",
    "group_default", "group_metadata", "group_metadata_only", "trace", "mem", "net", "io",
];

const MASK_CHARSET: &str = "[a-zA-Z,=]";
const SUBSYS_CHARSET: &str = "[a-zA-Z,]";
const NAME_CHARSET: &str = "[a-zA-Z,_]";

fn check_input(
    what: &'static str,
    input: &str,
    allowed: &'static str,
    extra: &[char],
) -> Result<(), LogMaskError> {
    if input.len() > MAX_LOG_MASK_LEN {
        return Err(LogMaskError::TooLong {
            what,
            len: input.len(),
            max: MAX_LOG_MASK_LEN,
        });
    }
    if !input
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == ',' || extra.contains(&c))
    {
        return Err(LogMaskError::InvalidCharacters {
            what,
            input: input.to_string(),
            allowed,
        });
    }
    Ok(())
}

fn check_all_alone<'a>(
    what: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), LogMaskError> {
    let names: Vec<&str> = names.collect();
    if names.len() > 1 && names.iter().any(|n| n.eq_ignore_ascii_case(ALL)) {
        return Err(LogMaskError::AllWithOther { what });
    }
    Ok(())
}

fn is_one_of(token: &str, valid: &[&str]) -> bool {
    valid.iter().any(|v| v.eq_ignore_ascii_case(token))
}

fn validate_level(token: &str) -> Result<(), LogMaskError> {
    if is_one_of(token, LOG_LEVELS) {
        return Ok(());
    }
    Err(LogMaskError::UnknownLevel {
        token: token.to_string(),
        valid: LOG_LEVELS.join(","),
    })
}

fn validate_subsystem(token: &str) -> Result<(), LogMaskError> {
    if is_one_of(token, LOG_SUBSYSTEMS) {
        return Ok(());
    }
    Err(LogMaskError::UnknownSubsystem {
        token: token.to_string(),
        valid: LOG_SUBSYSTEMS.join(","),
    })
}

/// Validate a `D_LOG_MASK` value. Empty is valid.
pub fn validate_log_masks(masks: &str) -> Result<(), LogMaskError> {
    if masks.is_empty() {
        return Ok(());
    }
    check_input("log masks", masks, MASK_CHARSET, &['='])?;
    check_all_alone(
        "log mask",
        masks
            .split(',')
            .map(|tok| tok.split_once('=').map_or(tok, |(prefix, _)| prefix)),
    )?;

    for (i, tok) in masks.split(',').enumerate() {
        match tok.split_once('=') {
            None if i == 0 => validate_level(tok)?,
            None => return Err(LogMaskError::Assignment(tok.to_string())),
            Some((prefix, level)) => {
                if prefix.is_empty() {
                    return Err(LogMaskError::Assignment(tok.to_string()));
                }
                validate_subsystem(prefix)?;
                validate_level(level)?;
            }
        }
    }
    Ok(())
}

/// Validate a `DD_MASK` value. Empty is valid.
pub fn validate_log_streams(streams: &str) -> Result<(), LogMaskError> {
    if streams.is_empty() {
        return Ok(());
    }
    check_input("debug streams", streams, NAME_CHARSET, &['_'])?;
    check_all_alone("debug stream", streams.split(','))?;

    for tok in streams.split(',') {
        if !is_one_of(tok, DEBUG_STREAMS) {
            return Err(LogMaskError::UnknownStream {
                token: tok.to_string(),
                valid: DEBUG_STREAMS.join(","),
            });
        }
    }
    Ok(())
}

/// Validate a `DD_SUBSYS` value. Empty is valid.
pub fn validate_log_subsystems(subsystems: &str) -> Result<(), LogMaskError> {
    if subsystems.is_empty() {
        return Ok(());
    }
    check_input("log subsystems", subsystems, SUBSYS_CHARSET, &[])?;
    check_all_alone("log subsystem", subsystems.split(','))?;

    for tok in subsystems.split(',') {
        validate_subsystem(tok)?;
    }
    Ok(())
}

/// Fold a `DD_SUBSYS` allow-list into a `D_LOG_MASK` value.
///
/// With an empty subsystem list the masks are returned unchanged. Otherwise
/// the result starts with a bare base level and keeps only the assignments
/// for listed subsystems. A bare level in `masks` is moved onto every listed
/// subsystem lacking an explicit assignment and the base becomes
/// `DEFAULT_LOG_LEVEL`. `all` keeps every assignment and the bare level.
pub fn merge_log_env_vars(masks: &str, subsystems: &str) -> Result<String, LogMaskError> {
    if subsystems.is_empty() {
        return Ok(masks.to_string());
    }
    validate_log_masks(masks)?;
    validate_log_subsystems(subsystems)?;

    let mut bare_level: Option<String> = None;
    let mut assignments: Vec<(&str, &str)> = Vec::new();
    for tok in masks.split(',').filter(|tok| !tok.is_empty()) {
        match tok.split_once('=') {
            Some(assignment) => assignments.push(assignment),
            None => bare_level = Some(tok.to_ascii_uppercase()),
        }
    }

    if subsystems.eq_ignore_ascii_case(ALL) {
        let base = bare_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        return Ok(join_masks(&base, assignments.iter().copied()));
    }

    let listed: Vec<&str> = subsystems.split(',').collect();
    let is_listed = |name: &str| listed.iter().any(|s| s.eq_ignore_ascii_case(name));

    let mut kept: Vec<(&str, String)> = assignments
        .iter()
        .filter(|(prefix, _)| is_listed(prefix))
        .map(|(prefix, level)| (*prefix, level.to_string()))
        .collect();

    if let Some(level) = bare_level {
        for subsys in &listed {
            if !kept.iter().any(|(prefix, _)| prefix.eq_ignore_ascii_case(subsys)) {
                kept.push((*subsys, level.clone()));
            }
        }
    }

    Ok(join_masks(
        DEFAULT_LOG_LEVEL,
        kept.iter().map(|(prefix, level)| (*prefix, level.as_str())),
    ))
}

fn join_masks<'a>(base: &str, assignments: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    std::iter::once(base.to_string())
        .chain(assignments.map(|(prefix, level)| format!("{prefix}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}
