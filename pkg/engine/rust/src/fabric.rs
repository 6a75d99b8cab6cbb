// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::cmdtags::{CmdTags, Field, Tag, Value};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Separator between entries of a multi-provider value.
pub const MULTI_PROVIDER_SEPARATOR: char = ',';

/// Network fabric settings for one engine. `provider` and `interface` may
/// list several entries; the first is the primary provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(rename = "fabric_iface", default, skip_serializing_if = "String::is_empty")]
    pub interface: String,
    #[serde(rename = "fabric_iface_port", default)]
    pub interface_port: i32,
    #[serde(
        rename = "secondary_provider_endpoints",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub num_secondary_endpoints: Vec<i32>,
    #[serde(default)]
    pub crt_ctx_share_addr: u32,
    #[serde(default)]
    pub crt_timeout: u32,
    #[serde(default)]
    pub disable_srx: bool,
    #[serde(rename = "fabric_auth_key", default, skip_serializing_if = "String::is_empty")]
    pub auth_key: String,
    #[serde(skip)]
    pub numa_node_index: u32,
}

fn split_multi_provider(value: &str) -> Vec<String> {
    value
        .split(MULTI_PROVIDER_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn split_required(value: &str, name: &'static str) -> Result<Vec<String>, ConfigError> {
    let parts = split_multi_provider(value);
    if parts.is_empty() {
        return Err(ConfigError::NotSet(name));
    }
    Ok(parts)
}

impl FabricConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    pub fn with_interface_port(mut self, port: i32) -> Self {
        self.interface_port = port;
        self
    }

    pub fn with_num_secondary_endpoints(mut self, endpoints: Vec<i32>) -> Self {
        self.num_secondary_endpoints = endpoints;
        self
    }

    pub fn with_crt_ctx_share_addr(mut self, addr: u32) -> Self {
        self.crt_ctx_share_addr = addr;
        self
    }

    pub fn with_crt_timeout(mut self, timeout: u32) -> Self {
        self.crt_timeout = timeout;
        self
    }

    pub fn with_disable_srx(mut self, disable: bool) -> Self {
        self.disable_srx = disable;
        self
    }

    pub fn with_auth_key(mut self, key: impl Into<String>) -> Self {
        self.auth_key = key.into();
        self
    }

    pub fn with_numa_node_index(mut self, node: u32) -> Self {
        self.numa_node_index = node;
        self
    }

    /// Fill every unset field from `other`. Set fields are never overwritten.
    pub fn update(&mut self, other: &FabricConfig) {
        if self.provider.is_empty() {
            self.provider.clone_from(&other.provider);
        }
        if self.interface.is_empty() {
            self.interface.clone_from(&other.interface);
        }
        if self.interface_port == 0 {
            self.interface_port = other.interface_port;
        }
        if self.num_secondary_endpoints.is_empty() {
            self.num_secondary_endpoints
                .clone_from(&other.num_secondary_endpoints);
        }
        if self.crt_ctx_share_addr == 0 {
            self.crt_ctx_share_addr = other.crt_ctx_share_addr;
        }
        if self.crt_timeout == 0 {
            self.crt_timeout = other.crt_timeout;
        }
        if !self.disable_srx {
            self.disable_srx = other.disable_srx;
        }
        if self.auth_key.is_empty() {
            self.auth_key.clone_from(&other.auth_key);
        }
    }

    pub fn get_providers(&self) -> Result<Vec<String>, ConfigError> {
        split_required(&self.provider, "provider")
    }

    pub fn get_primary_provider(&self) -> Result<String, ConfigError> {
        let mut providers = self.get_providers()?;
        Ok(providers.swap_remove(0))
    }

    pub fn get_num_providers(&self) -> usize {
        split_multi_provider(&self.provider).len()
    }

    pub fn get_interfaces(&self) -> Result<Vec<String>, ConfigError> {
        split_required(&self.interface, "fabric_iface")
    }

    /// One port per configured interface port. A single port is supported.
    pub fn get_interface_ports(&self) -> Result<Vec<i32>, ConfigError> {
        if self.interface_port == 0 {
            return Err(ConfigError::NotSet("fabric_iface_port"));
        }
        Ok(vec![self.interface_port])
    }

    /// Endpoint counts for each secondary provider, defaulting to one each
    /// when none were configured.
    pub fn get_secondary_endpoints(&self) -> Vec<i32> {
        let secondaries = self.get_num_providers().saturating_sub(1);
        if self.num_secondary_endpoints.is_empty() {
            return vec![1; secondaries];
        }
        self.num_secondary_endpoints.clone()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let providers = self.get_providers()?;
        let interfaces = self.get_interfaces()?;
        if providers.len() != interfaces.len() {
            return Err(ConfigError::InterfaceCountMismatch {
                providers: providers.len(),
                interfaces: interfaces.len(),
            });
        }

        if self.interface_port < 0 {
            return Err(ConfigError::NegativePort(self.interface_port));
        }

        let secondaries = providers.len() - 1;
        if !self.num_secondary_endpoints.is_empty() {
            if self.num_secondary_endpoints.len() != secondaries {
                return Err(ConfigError::SecondaryEndpointCount {
                    want: secondaries,
                    got: self.num_secondary_endpoints.len(),
                });
            }
            if let Some(bad) = self.num_secondary_endpoints.iter().find(|n| **n <= 0) {
                return Err(ConfigError::SecondaryEndpointValue(*bad));
            }
        }
        Ok(())
    }
}

impl CmdTags for FabricConfig {
    fn cmd_fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::tagged("provider", &[(Tag::Env, "D_PROVIDER")], &self.provider),
            Field::tagged("interface", &[(Tag::Env, "D_INTERFACE")], &self.interface),
            Field::tagged(
                "interface_port",
                &[(Tag::Env, "D_PORT,nonzero")],
                self.interface_port,
            ),
            Field::tagged(
                "num_secondary_endpoints",
                &[
                    (Tag::ShortFlag, "S,nonzero"),
                    (Tag::LongFlag, "nr_sec_ctx,nonzero"),
                ],
                Value::Len(self.get_secondary_endpoints().len()),
            ),
            Field::tagged(
                "crt_ctx_share_addr",
                &[(Tag::Env, "CRT_CTX_SHARE_ADDR")],
                self.crt_ctx_share_addr,
            ),
            Field::tagged("crt_timeout", &[(Tag::Env, "CRT_TIMEOUT")], self.crt_timeout),
            Field::tagged(
                "disable_srx",
                &[(Tag::Env, "FI_OFI_RXM_USE_SRX,invertBool,intBool")],
                self.disable_srx,
            ),
            Field::tagged("auth_key", &[(Tag::Env, "D_PROVIDER_AUTH_KEY")], &self.auth_key),
            Field::new("numa_node_index", self.numa_node_index),
        ]
    }
}
