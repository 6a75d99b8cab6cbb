// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::cmdtags::{
    CmdTags, Field, Tag, Value, join_env_vars, join_long_args, join_short_args, parse_cmd_tags,
};
use crate::env::{ambient, filter_allowed, find_key_value, merge_key_values};
use crate::errors::{ConfigError, EnvError};
use crate::fabric::FabricConfig;
use crate::logmask::{
    DEBUG_STREAMS_ENV, DEBUG_SUBSYS_ENV, validate_log_masks, validate_log_streams,
    validate_log_subsystems,
};
use crate::storage::{self, TierConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "/etc/daos/daos_engine.yml";
pub const CONFIG_PATH_ENV: &str = "ENGINE_SUPERVISOR_CONFIG";

pub const DEFAULT_HELPER_STREAMS: i32 = 2;

fn default_helper_streams() -> i32 {
    DEFAULT_HELPER_STREAMS
}

/// Configuration of one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub modules: String,
    #[serde(rename = "targets", default)]
    pub target_count: i32,
    #[serde(rename = "nr_xs_helpers", default = "default_helper_streams")]
    pub helper_stream_count: i32,
    #[serde(rename = "first_core", default)]
    pub service_thread_core: i32,
    #[serde(rename = "name", default, skip_serializing_if = "String::is_empty")]
    pub system_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub socket_dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_mask: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_file: String,
    #[serde(flatten)]
    pub storage: storage::Config,
    #[serde(flatten)]
    pub fabric: FabricConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_pass_through: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_numa_node: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_health_chk: Option<bool>,
    #[serde(skip)]
    pub index: u32,
    #[serde(skip)]
    pub mem_size: i32,
    #[serde(skip)]
    pub hugepage_size: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modules: String::new(),
            target_count: 0,
            helper_stream_count: DEFAULT_HELPER_STREAMS,
            service_thread_core: 0,
            system_name: String::new(),
            socket_dir: String::new(),
            log_mask: String::new(),
            log_file: String::new(),
            storage: storage::Config::default(),
            fabric: FabricConfig::default(),
            env_vars: Vec::new(),
            env_pass_through: Vec::new(),
            pinned_numa_node: None,
            bypass_health_chk: None,
            index: 0,
            mem_size: 0,
            hugepage_size: 0,
        }
    }
}

impl CmdTags for Config {
    fn cmd_fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::tagged(
                "modules",
                &[(Tag::ShortFlag, "m"), (Tag::LongFlag, "modules")],
                &self.modules,
            ),
            Field::tagged(
                "target_count",
                &[(Tag::ShortFlag, "t,nonzero"), (Tag::LongFlag, "targets,nonzero")],
                self.target_count,
            ),
            Field::tagged(
                "helper_stream_count",
                &[(Tag::ShortFlag, "x"), (Tag::LongFlag, "xshelpernr")],
                self.helper_stream_count,
            ),
            Field::tagged(
                "service_thread_core",
                &[(Tag::ShortFlag, "f,nonzero"), (Tag::LongFlag, "firstcore,nonzero")],
                self.service_thread_core,
            ),
            Field::tagged(
                "system_name",
                &[(Tag::ShortFlag, "g"), (Tag::LongFlag, "group")],
                &self.system_name,
            ),
            Field::tagged(
                "socket_dir",
                &[(Tag::ShortFlag, "d"), (Tag::LongFlag, "socket_dir")],
                &self.socket_dir,
            ),
            Field::tagged("log_mask", &[(Tag::Env, "D_LOG_MASK")], &self.log_mask),
            Field::tagged("log_file", &[(Tag::Env, "D_LOG_FILE")], &self.log_file),
            Field::new("storage", Value::Struct(&self.storage)),
            Field::new("fabric", Value::Struct(&self.fabric)),
            Field::new("env_vars", &self.env_vars),
            Field::new("env_pass_through", &self.env_pass_through),
            Field::tagged(
                "pinned_numa_node",
                &[(Tag::ShortFlag, "p"), (Tag::LongFlag, "pinned_numa_node")],
                Value::optional(self.pinned_numa_node.map(Value::from)),
            ),
            Field::tagged(
                "bypass_health_chk",
                &[(Tag::ShortFlag, "b"), (Tag::LongFlag, "bypass_health_chk")],
                Value::optional(self.bypass_health_chk.map(Value::from)),
            ),
            Field::tagged(
                "index",
                &[(Tag::ShortFlag, "I"), (Tag::LongFlag, "instance_idx")],
                self.index,
            ),
            Field::tagged(
                "mem_size",
                &[(Tag::ShortFlag, "r,nonzero"), (Tag::LongFlag, "mem_size,nonzero")],
                self.mem_size,
            ),
            Field::tagged(
                "hugepage_size",
                &[(Tag::ShortFlag, "H,nonzero"), (Tag::LongFlag, "hugepage_size,nonzero")],
                self.hugepage_size,
            ),
        ]
    }
}

fn check_non_negative(field: &'static str, value: i32) -> Result<(), ConfigError> {
    if value < 0 {
        return Err(ConfigError::Negative {
            field,
            value: i64::from(value),
        });
    }
    Ok(())
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modules(mut self, modules: impl Into<String>) -> Self {
        self.modules = modules.into();
        self
    }

    pub fn with_target_count(mut self, count: i32) -> Self {
        self.target_count = count;
        self
    }

    pub fn with_helper_stream_count(mut self, count: i32) -> Self {
        self.helper_stream_count = count;
        self
    }

    pub fn with_service_thread_core(mut self, core: i32) -> Self {
        self.service_thread_core = core;
        self
    }

    pub fn with_system_name(mut self, name: impl Into<String>) -> Self {
        self.system_name = name.into();
        self
    }

    pub fn with_socket_dir(mut self, dir: impl Into<String>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    pub fn with_log_mask(mut self, mask: impl Into<String>) -> Self {
        self.log_mask = mask.into();
        self
    }

    pub fn with_log_file(mut self, path: impl Into<String>) -> Self {
        self.log_file = path.into();
        self
    }

    /// Replace the storage tiers, numbering them from 0.
    pub fn with_storage(mut self, tiers: Vec<TierConfig>) -> Self {
        self.storage = std::mem::take(&mut self.storage).with_tiers(tiers);
        self
    }

    pub fn with_storage_config_output_path(mut self, path: impl Into<String>) -> Self {
        self.storage.config_output_path = path.into();
        self
    }

    pub fn with_fabric(mut self, fabric: FabricConfig) -> Self {
        self.fabric = fabric;
        self
    }

    pub fn with_fabric_provider(mut self, provider: impl Into<String>) -> Self {
        self.fabric.provider = provider.into();
        self
    }

    pub fn with_fabric_interface(mut self, interface: impl Into<String>) -> Self {
        self.fabric.interface = interface.into();
        self
    }

    pub fn with_fabric_interface_port(mut self, port: i32) -> Self {
        self.fabric.interface_port = port;
        self
    }

    pub fn with_fabric_num_secondary_endpoints(mut self, endpoints: Vec<i32>) -> Self {
        self.fabric.num_secondary_endpoints = endpoints;
        self
    }

    pub fn with_crt_ctx_share_addr(mut self, addr: u32) -> Self {
        self.fabric.crt_ctx_share_addr = addr;
        self
    }

    pub fn with_crt_timeout(mut self, timeout: u32) -> Self {
        self.fabric.crt_timeout = timeout;
        self
    }

    pub fn with_disable_srx(mut self, disable: bool) -> Self {
        self.fabric.disable_srx = disable;
        self
    }

    pub fn with_fabric_auth_key(mut self, key: impl Into<String>) -> Self {
        self.fabric.auth_key = key.into();
        self
    }

    /// Merge `vars` into the explicit environment; later values win.
    pub fn with_env_vars<S: Into<String>>(mut self, vars: impl IntoIterator<Item = S>) -> Self {
        let vars: Vec<String> = vars.into_iter().map(Into::into).collect();
        self.env_vars = merge_key_values(&self.env_vars, &vars);
        self
    }

    pub fn with_env_pass_through<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.env_pass_through
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_pinned_numa_node(mut self, node: u32) -> Self {
        self.pinned_numa_node = Some(node);
        self
    }

    pub fn with_bypass_health_chk(mut self, bypass: bool) -> Self {
        self.bypass_health_chk = Some(bypass);
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn with_mem_size(mut self, size: i32) -> Self {
        self.mem_size = size;
        self
    }

    pub fn with_hugepage_size(mut self, size: i32) -> Self {
        self.hugepage_size = size;
        self
    }

    /// Record the NUMA node detected for this engine and propagate it to the
    /// fabric and storage settings.
    ///
    /// A pinned node that disagrees with `node` is reported as
    /// [`ConfigError::NumaMismatch`]; the detected node is still propagated
    /// and the pinned value kept.
    pub fn set_numa_affinity(&mut self, node: u32) -> Result<(), ConfigError> {
        if self.pinned_numa_node.is_some() && self.service_thread_core != 0 {
            return Err(ConfigError::NumaAndFirstCore);
        }

        self.fabric.numa_node_index = node;
        self.storage.numa_node_index = node;

        match self.pinned_numa_node {
            Some(pinned) if pinned != node => Err(ConfigError::NumaMismatch {
                configured: pinned,
                detected: node,
            }),
            _ => {
                self.pinned_numa_node = Some(node);
                Ok(())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_count == 0 {
            return Err(ConfigError::ZeroTargetCount);
        }
        check_non_negative("targets", self.target_count)?;
        check_non_negative("nr_xs_helpers", self.helper_stream_count)?;
        check_non_negative("first_core", self.service_thread_core)?;
        check_non_negative("mem_size", self.mem_size)?;
        check_non_negative("hugepage_size", self.hugepage_size)?;

        if self.pinned_numa_node.is_some() && self.service_thread_core != 0 {
            return Err(ConfigError::NumaAndFirstCore);
        }

        self.fabric
            .validate()
            .map_err(|e| ConfigError::Fabric(Box::new(e)))?;
        self.storage.validate()?;

        validate_log_masks(&self.log_mask).map_err(ConfigError::LogMask)?;
        if let Some(streams) = find_key_value(&self.env_vars, DEBUG_STREAMS_ENV) {
            validate_log_streams(streams).map_err(ConfigError::DebugStreams)?;
        }
        if let Some(subsystems) = find_key_value(&self.env_vars, DEBUG_SUBSYS_ENV) {
            validate_log_subsystems(subsystems).map_err(ConfigError::LogSubsystems)?;
        }
        Ok(())
    }

    fn render_args(
        &self,
        filter: Tag,
        joiner: crate::cmdtags::Joiner,
    ) -> Result<Vec<String>, ConfigError> {
        let mut args = parse_cmd_tags(self, filter, joiner, None)?;
        for tier in &self.storage.tiers {
            args.extend(parse_cmd_tags(tier, filter, joiner, None)?);
        }
        Ok(args)
    }

    /// Engine arguments in short-flag form.
    pub fn cmd_line_args(&self) -> Result<Vec<String>, ConfigError> {
        self.render_args(Tag::ShortFlag, join_short_args)
    }

    /// Engine arguments in long-flag form.
    pub fn cmd_line_long_args(&self) -> Result<Vec<String>, ConfigError> {
        self.render_args(Tag::LongFlag, join_long_args)
    }

    /// Engine environment generated from the configuration, overlaid with
    /// `env_vars`.
    pub fn cmd_line_env(&self) -> Result<Vec<String>, ConfigError> {
        let mut env = parse_cmd_tags(self, Tag::Env, join_env_vars, None)?;
        for tier in &self.storage.tiers {
            let tier_env = parse_cmd_tags(tier, Tag::Env, join_env_vars, None)?;
            env = merge_key_values(&env, &tier_env);
        }
        Ok(merge_key_values(&env, &self.env_vars))
    }

    /// Environment the engine would be started with: allowed ambient
    /// variables overlaid with [`Config::cmd_line_env`].
    pub fn effective_env(&self) -> Result<Vec<String>, ConfigError> {
        let ambient = filter_allowed(&ambient(), &self.env_pass_through);
        Ok(merge_key_values(&ambient, &self.cmd_line_env()?))
    }

    pub fn get_env_var(&self, name: &str) -> Result<String, ConfigError> {
        let env = self.effective_env()?;
        find_key_value(&env, name)
            .map(String::from)
            .ok_or_else(|| EnvError::NotFound(name.to_string()).into())
    }

    /// Whether `name` is set in `env_vars`.
    pub fn has_env_var(&self, name: &str) -> bool {
        let prefix = format!("{name}=");
        self.env_vars.iter().any(|kv| kv.starts_with(&prefix))
    }
}

pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Read one engine section from a YAML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut config: Config =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    config.storage.renumber();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TierClass;
    use std::fs;

    fn ram_tier() -> TierConfig {
        TierConfig::new()
            .with_storage_class(TierClass::Ram)
            .with_scm_mount_point("/mnt/daos")
            .with_scm_ramdisk_size(16)
    }

    fn valid_config() -> Config {
        Config::new()
            .with_fabric_provider("ofi+tcp")
            .with_fabric_interface("eth0")
            .with_fabric_interface_port(31416)
            .with_storage(vec![ram_tier()])
            .with_target_count(8)
            .with_pinned_numa_node(0)
    }

    #[test]
    fn test_new_defaults() {
        let cfg = Config::new();
        assert_eq!(cfg.helper_stream_count, DEFAULT_HELPER_STREAMS);
        assert!(cfg.pinned_numa_node.is_none());
    }

    #[test]
    fn test_validate_minimal() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn test_validate_errors() {
        let err = valid_config()
            .with_pinned_numa_node(1)
            .with_service_thread_core(1)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("cannot specify both"), "{err}");

        let err = valid_config().with_target_count(0).validate().unwrap_err();
        assert_eq!(err.to_string(), "target count must be nonzero");

        let cases = [
            (valid_config().with_target_count(-1), "targets"),
            (valid_config().with_helper_stream_count(-1), "nr_xs_helpers"),
            (valid_config().with_mem_size(-1), "mem_size"),
            (valid_config().with_hugepage_size(-2), "hugepage_size"),
        ];
        for (cfg, field) in cases {
            let err = cfg.validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::Negative { field: f, .. } if f == field),
                "{err}"
            );
        }
    }

    #[test]
    fn test_validate_delegates() {
        let err = valid_config()
            .with_fabric_interface("")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Fabric(_)), "{err}");

        let err = valid_config().with_storage(vec![]).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Storage(_)), "{err}");

        let err = valid_config()
            .with_log_mask("ERROR,all=DEBUG")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::LogMask(_)), "{err}");

        let err = valid_config()
            .with_env_vars(["DD_MASK=all,mgmt"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DebugStreams(_)), "{err}");

        let err = valid_config()
            .with_env_vars(["DD_SUBSYS=vos,bogus"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::LogSubsystems(_)), "{err}");
    }

    #[test]
    fn test_set_numa_affinity() {
        let mut cfg = valid_config().with_service_thread_core(0);
        cfg.pinned_numa_node = None;
        cfg.set_numa_affinity(1).unwrap();
        assert_eq!(cfg.pinned_numa_node, Some(1));
        assert_eq!(cfg.fabric.numa_node_index, 1);
        assert_eq!(cfg.storage.numa_node_index, 1);

        let mut cfg = valid_config().with_pinned_numa_node(0);
        let err = cfg.set_numa_affinity(1).unwrap_err();
        assert!(err.is_numa_mismatch());
        assert_eq!(cfg.pinned_numa_node, Some(0));
        assert_eq!(cfg.fabric.numa_node_index, 1);
        assert_eq!(cfg.storage.numa_node_index, 1);

        let mut cfg = valid_config().with_service_thread_core(2);
        assert_eq!(
            cfg.set_numa_affinity(0),
            Err(ConfigError::NumaAndFirstCore)
        );

        let mut cfg = Config::new().with_service_thread_core(2);
        cfg.set_numa_affinity(1).unwrap();
        assert_eq!(cfg.pinned_numa_node, Some(1));
    }

    fn full_config() -> Config {
        Config::new()
            .with_target_count(42)
            .with_helper_stream_count(1)
            .with_fabric_interface("qib0")
            .with_log_mask("DEBUG,MGMT=DEBUG,RPC=ERR,MEM=ERR")
            .with_pinned_numa_node(1)
    }

    #[test]
    fn test_cmd_line_args() {
        let args = full_config().cmd_line_args().unwrap();
        assert_eq!(args, vec!["-t", "42", "-x", "1", "-p", "1", "-I", "0"]);

        let cfg = full_config()
            .with_modules("vos,rdb")
            .with_system_name("daos_server")
            .with_socket_dir("/var/run/daos_server")
            .with_storage(vec![ram_tier()])
            .with_storage_config_output_path("/mnt/daos/daos_nvme.conf")
            .with_bypass_health_chk(true)
            .with_index(1)
            .with_mem_size(4096)
            .with_hugepage_size(2);
        assert_eq!(
            cfg.cmd_line_args().unwrap(),
            vec![
                "-m",
                "vos,rdb",
                "-t",
                "42",
                "-x",
                "1",
                "-g",
                "daos_server",
                "-d",
                "/var/run/daos_server",
                "-n",
                "/mnt/daos/daos_nvme.conf",
                "-p",
                "1",
                "-b",
                "-I",
                "1",
                "-r",
                "4096",
                "-H",
                "2",
                "-s",
                "/mnt/daos",
            ]
        );
    }

    #[test]
    fn test_cmd_line_long_args() {
        let cfg = full_config().with_bypass_health_chk(false);
        assert_eq!(
            cfg.cmd_line_long_args().unwrap(),
            vec![
                "--targets=42",
                "--xshelpernr=1",
                "--pinned_numa_node=1",
                "--instance_idx=0",
            ]
        );
    }

    #[test]
    fn test_cmd_line_env() {
        let cfg = full_config()
            .with_fabric_provider("ofi+verbs")
            .with_crt_timeout(30)
            .with_env_vars(["FI_SOCKETS_CONN_TIMEOUT=2000", "CRT_TIMEOUT=60"]);
        assert_eq!(
            cfg.cmd_line_env().unwrap(),
            vec![
                "D_LOG_MASK=DEBUG,MGMT=DEBUG,RPC=ERR,MEM=ERR",
                "D_PROVIDER=ofi+verbs",
                "D_INTERFACE=qib0",
                "CRT_CTX_SHARE_ADDR=0",
                "CRT_TIMEOUT=60",
                "FI_OFI_RXM_USE_SRX=1",
                "FI_SOCKETS_CONN_TIMEOUT=2000",
            ]
        );
    }

    #[test]
    fn test_cmd_line_env_tiers() {
        let nvme = TierConfig::new()
            .with_storage_class(TierClass::Nvme)
            .with_bdev_device_list(vec!["0000:81:00.0".to_string()]);
        let file = TierConfig::new()
            .with_storage_class(TierClass::File)
            .with_bdev_device_list(vec!["/tmp/bdev".to_string()])
            .with_bdev_file_size(4);
        let cfg = full_config().with_storage(vec![ram_tier(), nvme, file]);
        let env = cfg.cmd_line_env().unwrap();
        assert_eq!(find_key_value(&env, "VOS_BDEV_CLASS"), Some("AIO"));
        assert_eq!(
            env.iter()
                .filter(|kv| kv.starts_with("VOS_BDEV_CLASS="))
                .count(),
            1
        );
    }

    #[test]
    fn test_env_var_lookup() {
        let cfg = full_config().with_env_vars(["FOO=bar", "FOOBAR=baz"]);
        assert!(cfg.has_env_var("FOO"));
        assert!(cfg.has_env_var("FOOBAR"));
        assert!(!cfg.has_env_var("FO"));

        assert_eq!(cfg.get_env_var("FOO").unwrap(), "bar");
        assert_eq!(
            cfg.get_env_var("D_LOG_MASK").unwrap(),
            "DEBUG,MGMT=DEBUG,RPC=ERR,MEM=ERR"
        );
        assert_eq!(
            cfg.get_env_var("NOPE"),
            Err(ConfigError::Env(EnvError::NotFound("NOPE".to_string())))
        );
    }

    #[test]
    fn test_get_env_var_pass_through() {
        temp_env::with_var("ENGINE_TEST_PASSED", Some("yes"), || {
            let cfg = full_config();
            assert!(cfg.get_env_var("ENGINE_TEST_PASSED").is_err());

            let cfg = full_config().with_env_pass_through(["ENGINE_TEST_PASSED"]);
            assert_eq!(cfg.get_env_var("ENGINE_TEST_PASSED").unwrap(), "yes");

            let cfg = cfg.with_env_vars(["ENGINE_TEST_PASSED=no"]);
            assert_eq!(cfg.get_env_var("ENGINE_TEST_PASSED").unwrap(), "no");
        });
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yml");
        let yaml = r#"
targets: 16
first_core: 0
name: daos_server
log_mask: INFO
log_file: /tmp/daos_engine.0.log
provider: ofi+tcp
fabric_iface: eth0
fabric_iface_port: 31416
crt_timeout: 30
disable_srx: true
env_vars:
  - FI_SOCKETS_MAX_CONN_RETRY=1
env_pass_through:
  - FI_UNIVERSE_SIZE
pinned_numa_node: 1
storage:
  - class: ram
    scm_mount: /mnt/daos
    scm_size: 16
  - class: nvme
    bdev_list: ["0000:81:00.0"]
"#;
        fs::write(&path, yaml).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.target_count, 16);
        assert_eq!(cfg.helper_stream_count, DEFAULT_HELPER_STREAMS);
        assert_eq!(cfg.system_name, "daos_server");
        assert_eq!(cfg.fabric.provider, "ofi+tcp");
        assert_eq!(cfg.fabric.interface_port, 31416);
        assert_eq!(cfg.fabric.crt_timeout, 30);
        assert!(cfg.fabric.disable_srx);
        assert_eq!(cfg.pinned_numa_node, Some(1));
        assert_eq!(cfg.env_pass_through, vec!["FI_UNIVERSE_SIZE"]);
        assert_eq!(cfg.storage.tiers.len(), 2);
        assert_eq!(cfg.storage.tiers[1].tier, 1);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_load_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        let err = load_config(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("reading"));

        let bad = dir.path().join("bad.yml");
        fs::write(&bad, "targets: [").unwrap();
        let err = load_config(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn test_config_path() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/tmp/engine.yml"), || {
            assert_eq!(config_path(), PathBuf::from("/tmp/engine.yml"));
        });
        temp_env::with_var_unset(CONFIG_PATH_ENV, || {
            assert_eq!(config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
        });
    }
}
