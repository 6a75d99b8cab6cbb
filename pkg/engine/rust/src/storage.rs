// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Storage tiers attached to an engine.
//!
//! The first tier is always SCM (a ramdisk or a persistent memory device
//! mounted at `scm_mount`); any following tiers are block devices.

use crate::cmdtags::{CmdTags, Field, Tag, Value};
use crate::errors::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierClass {
    #[default]
    Ram,
    Dcpm,
    Nvme,
    Kdev,
    File,
}

impl TierClass {
    pub fn is_scm(self) -> bool {
        matches!(self, TierClass::Ram | TierClass::Dcpm)
    }

    /// Value of `VOS_BDEV_CLASS` for a block device tier. Empty for SCM.
    pub fn bdev_class(self) -> &'static str {
        match self {
            TierClass::Ram | TierClass::Dcpm => "",
            TierClass::Nvme => "NVME",
            TierClass::Kdev | TierClass::File => "AIO",
        }
    }
}

impl fmt::Display for TierClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierClass::Ram => write!(f, "ram"),
            TierClass::Dcpm => write!(f, "dcpm"),
            TierClass::Nvme => write!(f, "nvme"),
            TierClass::Kdev => write!(f, "kdev"),
            TierClass::File => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmConfig {
    #[serde(rename = "scm_mount", default, skip_serializing_if = "String::is_empty")]
    pub mount_point: String,
    /// Ramdisk size in GiB.
    #[serde(rename = "scm_size", default, skip_serializing_if = "is_zero")]
    pub ramdisk_size: u32,
    #[serde(rename = "scm_list", default, skip_serializing_if = "Vec::is_empty")]
    pub device_list: Vec<String>,
}

impl CmdTags for ScmConfig {
    fn cmd_fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::tagged(
                "mount_point",
                &[(Tag::ShortFlag, "s"), (Tag::LongFlag, "storage")],
                &self.mount_point,
            ),
            Field::new("ramdisk_size", self.ramdisk_size),
            Field::new("device_list", &self.device_list),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BdevConfig {
    #[serde(rename = "bdev_list", default, skip_serializing_if = "Vec::is_empty")]
    pub device_list: Vec<String>,
    /// Backing file size in GiB, `file` class only.
    #[serde(rename = "bdev_size", default, skip_serializing_if = "is_zero")]
    pub file_size: u32,
    #[serde(rename = "bdev_busid_range", default, skip_serializing_if = "String::is_empty")]
    pub bus_id_range: String,
}

impl CmdTags for BdevConfig {
    fn cmd_fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("device_list", &self.device_list),
            Field::new("file_size", self.file_size),
            Field::new("bus_id_range", &self.bus_id_range),
        ]
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(skip)]
    pub tier: usize,
    pub class: TierClass,
    #[serde(flatten)]
    pub scm: ScmConfig,
    #[serde(flatten)]
    pub bdev: BdevConfig,
}

impl TierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage_class(mut self, class: TierClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_scm_mount_point(mut self, path: impl Into<String>) -> Self {
        self.scm.mount_point = path.into();
        self
    }

    pub fn with_scm_ramdisk_size(mut self, size: u32) -> Self {
        self.scm.ramdisk_size = size;
        self
    }

    pub fn with_scm_device_list(mut self, devices: Vec<String>) -> Self {
        self.scm.device_list = devices;
        self
    }

    pub fn with_bdev_device_list(mut self, devices: Vec<String>) -> Self {
        self.bdev.device_list = devices;
        self
    }

    pub fn with_bdev_file_size(mut self, size: u32) -> Self {
        self.bdev.file_size = size;
        self
    }

    pub fn with_bdev_busid_range(mut self, range: impl Into<String>) -> Self {
        self.bdev.bus_id_range = range.into();
        self
    }

    fn missing(&self, field: &'static str) -> StorageError {
        StorageError::MissingField {
            tier: self.tier,
            class: self.class.to_string(),
            field,
        }
    }

    fn unexpected(&self, field: &'static str) -> StorageError {
        StorageError::UnexpectedField {
            tier: self.tier,
            class: self.class.to_string(),
            field,
        }
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        match self.class {
            TierClass::Ram => {
                if self.scm.mount_point.is_empty() {
                    return Err(self.missing("scm_mount"));
                }
                if self.scm.ramdisk_size == 0 {
                    return Err(self.missing("scm_size"));
                }
                if !self.scm.device_list.is_empty() {
                    return Err(self.unexpected("scm_list"));
                }
            }
            TierClass::Dcpm => {
                if self.scm.mount_point.is_empty() {
                    return Err(self.missing("scm_mount"));
                }
                if self.scm.device_list.len() != 1 {
                    return Err(StorageError::DcpmDeviceCount {
                        tier: self.tier,
                        count: self.scm.device_list.len(),
                    });
                }
                if self.scm.ramdisk_size != 0 {
                    return Err(self.unexpected("scm_size"));
                }
            }
            TierClass::Nvme | TierClass::Kdev => {
                if self.bdev.device_list.is_empty() {
                    return Err(self.missing("bdev_list"));
                }
            }
            TierClass::File => {
                if self.bdev.device_list.is_empty() {
                    return Err(self.missing("bdev_list"));
                }
                if self.bdev.file_size == 0 {
                    return Err(self.missing("bdev_size"));
                }
            }
        }
        Ok(())
    }
}

impl CmdTags for TierConfig {
    fn cmd_fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("tier", self.tier),
            Field::new("scm", Value::Struct(&self.scm)),
            Field::new("bdev", Value::Struct(&self.bdev)),
            Field::tagged(
                "bdev_class",
                &[(Tag::Env, "VOS_BDEV_CLASS")],
                self.class.bdev_class(),
            ),
        ]
    }
}

/// Storage owned by one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "storage", default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<TierConfig>,
    /// Where the engine writes the generated NVMe configuration.
    #[serde(skip)]
    pub config_output_path: String,
    #[serde(skip)]
    pub numa_node_index: u32,
}

impl Config {
    /// Replace the tier list, numbering tiers from 0.
    pub fn with_tiers(mut self, tiers: Vec<TierConfig>) -> Self {
        self.tiers = tiers;
        self.renumber();
        self
    }

    pub fn with_config_output_path(mut self, path: impl Into<String>) -> Self {
        self.config_output_path = path.into();
        self
    }

    pub fn with_numa_node_index(mut self, node: u32) -> Self {
        self.numa_node_index = node;
        self
    }

    pub(crate) fn renumber(&mut self) {
        for (i, tier) in self.tiers.iter_mut().enumerate() {
            tier.tier = i;
        }
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        let first = self.tiers.first().ok_or(StorageError::NoTiers)?;
        if !first.class.is_scm() {
            return Err(StorageError::FirstTierNotScm(first.class.to_string()));
        }
        if let Some(tier) = self.tiers.iter().skip(1).find(|t| t.class.is_scm()) {
            return Err(StorageError::MultipleScmTiers(tier.tier));
        }
        self.tiers.iter().try_for_each(TierConfig::validate)
    }
}

impl CmdTags for Config {
    fn cmd_fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("tiers", &self.tiers),
            Field::tagged(
                "config_output_path",
                &[(Tag::ShortFlag, "n"), (Tag::LongFlag, "nvme")],
                &self.config_output_path,
            ),
            Field::new("numa_node_index", self.numa_node_index),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmdtags::{join_env_vars, join_short_args, parse_cmd_tags};

    fn ram_tier() -> TierConfig {
        TierConfig::new()
            .with_storage_class(TierClass::Ram)
            .with_scm_mount_point("/mnt/daos")
            .with_scm_ramdisk_size(16)
    }

    fn nvme_tier() -> TierConfig {
        TierConfig::new()
            .with_storage_class(TierClass::Nvme)
            .with_bdev_device_list(vec!["0000:81:00.0".to_string()])
    }

    #[test]
    fn test_validate_ok() {
        let cfg = Config::default().with_tiers(vec![ram_tier(), nvme_tier()]);
        cfg.validate().unwrap();
        assert_eq!(cfg.tiers[1].tier, 1);

        let dcpm = TierConfig::new()
            .with_storage_class(TierClass::Dcpm)
            .with_scm_mount_point("/mnt/daos")
            .with_scm_device_list(vec!["/dev/pmem0".to_string()]);
        Config::default().with_tiers(vec![dcpm]).validate().unwrap();
    }

    #[test]
    fn test_validate_tier_layout() {
        assert_eq!(Config::default().validate(), Err(StorageError::NoTiers));
        assert_eq!(
            Config::default().with_tiers(vec![nvme_tier()]).validate(),
            Err(StorageError::FirstTierNotScm("nvme".to_string()))
        );
        assert_eq!(
            Config::default()
                .with_tiers(vec![ram_tier(), ram_tier()])
                .validate(),
            Err(StorageError::MultipleScmTiers(1))
        );
    }

    #[test]
    fn test_validate_tier_fields() {
        let cases = [
            (vec![ram_tier().with_scm_mount_point("")], "scm_mount"),
            (vec![ram_tier().with_scm_ramdisk_size(0)], "scm_size"),
            (
                vec![ram_tier(), nvme_tier().with_bdev_device_list(vec![])],
                "bdev_list",
            ),
        ];
        for (tiers, field) in cases {
            let err = Config::default()
                .with_tiers(tiers)
                .validate()
                .unwrap_err();
            assert!(
                err.to_string().contains(field),
                "{err} should mention {field}"
            );
        }

        let file = TierConfig::new()
            .with_storage_class(TierClass::File)
            .with_bdev_device_list(vec!["/tmp/daos-bdev".to_string()]);
        assert!(matches!(
            Config::default()
                .with_tiers(vec![ram_tier(), file])
                .validate(),
            Err(StorageError::MissingField {
                tier: 1,
                field: "bdev_size",
                ..
            })
        ));

        let dcpm = TierConfig::new()
            .with_storage_class(TierClass::Dcpm)
            .with_scm_mount_point("/mnt/daos");
        assert_eq!(
            Config::default().with_tiers(vec![dcpm]).validate(),
            Err(StorageError::DcpmDeviceCount { tier: 0, count: 0 })
        );
    }

    #[test]
    fn test_tier_cmd_tags() {
        let args = parse_cmd_tags(&ram_tier(), Tag::ShortFlag, join_short_args, None).unwrap();
        assert_eq!(args, vec!["-s", "/mnt/daos"]);

        let env = parse_cmd_tags(&ram_tier(), Tag::Env, join_env_vars, None).unwrap();
        assert!(env.is_empty());
        let env = parse_cmd_tags(&nvme_tier(), Tag::Env, join_env_vars, None).unwrap();
        assert_eq!(env, vec!["VOS_BDEV_CLASS=NVME"]);
    }

    #[test]
    fn test_config_output_path_flag() {
        let cfg = Config::default()
            .with_tiers(vec![ram_tier()])
            .with_config_output_path("/mnt/daos/daos_nvme.conf");
        let args = parse_cmd_tags(&cfg, Tag::ShortFlag, join_short_args, None).unwrap();
        assert_eq!(args, vec!["-n", "/mnt/daos/daos_nvme.conf"]);
    }

    #[test]
    fn test_tier_yaml() {
        let yaml = r#"
storage:
  - class: ram
    scm_mount: /mnt/daos
    scm_size: 16
  - class: nvme
    bdev_list: ["0000:81:00.0", "0000:82:00.0"]
"#;
        let mut cfg: Config = serde_yaml::from_str(yaml).unwrap();
        cfg.renumber();
        assert_eq!(cfg.tiers.len(), 2);
        assert_eq!(cfg.tiers[0].class, TierClass::Ram);
        assert_eq!(cfg.tiers[0].scm.ramdisk_size, 16);
        assert_eq!(cfg.tiers[1].bdev.device_list.len(), 2);
        assert_eq!(cfg.tiers[1].tier, 1);
        cfg.validate().unwrap();
    }
}
