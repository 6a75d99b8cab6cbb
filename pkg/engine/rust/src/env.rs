// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Helpers over `KEY=VALUE` environment lists, the representation used for
//! both configured and generated engine environments.

use crate::errors::EnvError;

/// Split `KEY=VALUE` at the first `=`. Entries without one are malformed.
pub fn split_key_value(pair: &str) -> Option<(&str, &str)> {
    pair.split_once('=')
}

fn key_of(pair: &str) -> &str {
    split_key_value(pair).map_or(pair, |(key, _)| key)
}

/// Overlay `overrides` on `base`. Keys present in both keep their position in
/// `base` and take the value from `overrides`; new keys are appended in order.
/// Later duplicates win. Malformed entries are dropped.
pub fn merge_key_values(base: &[String], overrides: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(base.len() + overrides.len());
    for pair in base.iter().chain(overrides) {
        let Some((key, _)) = split_key_value(pair) else {
            continue;
        };
        match merged.iter_mut().find(|existing| key_of(existing) == key) {
            Some(existing) => existing.clone_from(pair),
            None => merged.push(pair.clone()),
        }
    }
    merged
}

/// Value of the first entry named `key`.
pub fn find_key_value<'a>(env: &'a [String], key: &str) -> Option<&'a str> {
    env.iter()
        .filter_map(|pair| split_key_value(pair))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Replace the value of every entry named `key`.
pub fn update_key_value(env: &mut [String], key: &str, value: &str) -> Result<(), EnvError> {
    let mut found = false;
    for pair in env.iter_mut().filter(|pair| key_of(pair) == key) {
        *pair = format!("{key}={value}");
        found = true;
    }
    if found {
        Ok(())
    } else {
        Err(EnvError::NotFound(key.to_string()))
    }
}

/// Remove every entry named `key`.
pub fn delete_key_value(env: &mut Vec<String>, key: &str) {
    env.retain(|pair| key_of(pair) != key);
}

/// Keep only entries whose key is in `allowed`.
pub fn filter_allowed(env: &[String], allowed: &[String]) -> Vec<String> {
    env.iter()
        .filter(|pair| allowed.iter().any(|name| name == key_of(pair)))
        .cloned()
        .collect()
}

/// The environment of the current process as `KEY=VALUE` entries. Entries
/// that are not valid UTF-8 are skipped.
pub fn ambient() -> Vec<String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some(format!("{}={}", k.to_str()?, v.to_str()?)))
        .collect()
}
