//! Command-line flags and config resolution

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use bridge_core::BridgeConfig;
use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Bridges NodePort Services annotated `route: "true"` into the service mesh
#[derive(Debug, Parser)]
#[command(name = "bridge-controller", version)]
pub struct Cli {
    /// YAML config file; flags below override its values
    #[arg(long, env = "BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Kubeconfig file (default: ~/.kube/istio-config, then in-cluster)
    #[arg(long, env = "BRIDGE_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Address of the worker node that node-port traffic is sent to
    #[arg(long, env = "BRIDGE_WORKER_ADDRESS")]
    pub worker_address: Option<IpAddr>,

    /// Namespace the bridge objects are created in
    #[arg(long, env = "BRIDGE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Only watch Services in this namespace
    #[arg(long, env = "BRIDGE_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "BRIDGE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Load the config file (if any), apply flag overrides, and validate
    pub fn resolve_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };

        if let Some(path) = &self.kubeconfig {
            config.kubeconfig = Some(path.clone());
        }
        if let Some(addr) = self.worker_address {
            config.worker_address = Some(addr);
        }
        if let Some(ns) = &self.namespace {
            config.namespace = ns.clone();
        }
        if let Some(ns) = &self.watch_namespace {
            config.watch_namespace = Some(ns.clone());
        }

        config.validate()?;
        Ok(config)
    }
}
