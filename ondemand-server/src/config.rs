//! Server configuration

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use ondemand::manager::{DEFAULT_ON_DEMAND_NAME, ManagerContext};
use ondemand::presets::Preset;
use ondemand::redirect::DEFAULT_REDIRECT_BASE;
use ondemand::rule::{Rule, parse_rules};
use rustls::pki_types::CertificateDer;

/// On-demand dashboard lifecycle server
#[derive(Parser, Clone, Debug)]
#[command(name = "ondemand-server")]
#[command(about = "Keeps dashboards in the hot or archive tier according to archive rules")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database holding both tiers
    #[arg(long, env = "DB_PATH", default_value = "dashboards.db")]
    pub db_path: String,

    /// Rule list as JSON
    #[arg(long, env = "RULES", conflicts_with_all = ["rules_file", "preset"])]
    pub rules: Option<String>,

    /// File containing the rule list as JSON
    #[arg(long, env = "RULES_FILE", conflicts_with = "preset")]
    pub rules_file: Option<PathBuf>,

    /// Named rule preset: Demo1, Demo2, AllManualExceptODD, AllEnabledExceptODD,
    /// AllEnabled or AllDisabled
    #[arg(long, env = "RULES_PRESET")]
    pub preset: Option<String>,

    /// Name of the on-demand admin dashboard
    #[arg(long, env = "ON_DEMAND_DASHBOARD_NAME", default_value = DEFAULT_ON_DEMAND_NAME)]
    pub on_demand_name: String,

    /// Interval of the scheduled reconciliation job in seconds
    #[arg(long, env = "JOB_INTERVAL", default_value = "3600")]
    pub job_interval: u64,

    /// Path prefix of the redirect endpoint
    #[arg(long, env = "REDIRECT_BASE", default_value = DEFAULT_REDIRECT_BASE)]
    pub redirect_base: String,

    /// Redirect target after activation; `{name}` is replaced by the dashboard name
    #[arg(
        long,
        env = "CONSOLE_URL",
        default_value = "https://console.aws.amazon.com/cloudwatch/home#dashboards:name={name}"
    )]
    pub console_url: String,

    /// TLS certificate path (PEM format)
    #[arg(long)]
    pub tls_cert: Option<String>,

    /// TLS private key path (PEM format)
    #[arg(long)]
    pub tls_key: Option<String>,
}

impl Config {
    /// Resolve the configured rule list.
    ///
    /// Inline JSON wins over a rules file, which wins over a preset. With
    /// none of them every dashboard falls back to the builtin rule.
    pub fn load_rules(&self) -> anyhow::Result<Vec<Rule>> {
        if let Some(json) = &self.rules {
            return parse_rules(json).map_err(|report| anyhow::anyhow!("{report:?}"));
        }
        if let Some(path) = &self.rules_file {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading rules file {}", path.display()))?;
            return parse_rules(&json).map_err(|report| anyhow::anyhow!("{report:?}"));
        }
        if let Some(name) = &self.preset {
            let preset: Preset = name.parse()?;
            return Ok(preset.rules());
        }
        Ok(Vec::new())
    }

    pub fn manager_context(&self) -> anyhow::Result<ManagerContext> {
        Ok(ManagerContext::new(self.load_rules()?, &self.on_demand_name))
    }

    /// Where the redirect endpoint sends the browser for `name`
    pub fn redirect_location(&self, name: &str) -> String {
        self.console_url.replace("{name}", name)
    }

    /// Link that activates `name` through the redirect endpoint
    pub fn redirect_path(&self, name: &str) -> String {
        format!("{}/{}", self.redirect_base.trim_end_matches('/'), name)
    }
}

/// Load TLS configuration from cert and key files
pub fn load_tls_config(cert_path: &str, key_path: &str) -> anyhow::Result<RustlsConfig> {
    let cert_file = File::open(cert_path)?;
    let key_file = File::open(key_path)?;

    let mut cert_reader = BufReader::new(cert_file);
    let mut key_reader = BufReader::new(key_file);

    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;

    let key = rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow::anyhow!("No private key found in {}", key_path))?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    Ok(RustlsConfig::from_config(Arc::new(config)))
}
