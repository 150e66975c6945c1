//! Configuration types for the mimic server.
//!
//! Values are layered: built-in defaults, then the `mimic.yaml` file found in
//! the config directory, then command-line / environment options.

mod home;
mod listen;

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub use home::{home_dir, home_dir_from};
pub use listen::{ListenConfig, TlsConfig, DEFAULT_IP, DEFAULT_PORT};

/// File name looked up inside the config directory.
pub const CONFIG_FILE_NAME: &str = "mimic.yaml";

/// Expectations directory relative to the home directory.
pub const DEFAULT_EXPECTATIONS_SUBDIR: &str = ".mimic/expectations";

/// One layer of optional settings, either from the config file or the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub ip: Option<IpAddr>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub expectations_dir: Option<PathBuf>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub certificate: Option<PathBuf>,
    #[serde(default)]
    pub certificate_key: Option<PathBuf>,
    #[serde(default)]
    pub cert_passphrase: Option<String>,
}

impl ConfigLayer {
    /// Load a layer from a YAML file. An empty file is an empty layer.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    /// Values set in `over` win over values set in `self`.
    pub fn merge(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            ip: over.ip.or(self.ip),
            port: over.port.or(self.port),
            expectations_dir: over.expectations_dir.or(self.expectations_dir),
            debug: over.debug.or(self.debug),
            certificate: over.certificate.or(self.certificate),
            certificate_key: over.certificate_key.or(self.certificate_key),
            cert_passphrase: over.cert_passphrase.or(self.cert_passphrase),
        }
    }
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: ListenConfig,
    pub expectations_dir: PathBuf,
    /// Whether `expectations_dir` is the home-based default.
    pub expectations_dir_is_default: bool,
    pub debug: bool,
    pub tls: Option<TlsConfig>,
}

impl ServerConfig {
    /// Read `mimic.yaml` from `config_dir` if present, then apply `cli` over it.
    pub fn load(config_dir: &Path, cli: ConfigLayer) -> Result<Self, anyhow::Error> {
        let file = config_dir.join(CONFIG_FILE_NAME);
        let file_layer = if file.is_file() {
            ConfigLayer::from_file(&file)?
        } else {
            ConfigLayer::default()
        };
        Self::resolve(file_layer.merge(cli), home_dir())
    }

    /// Apply defaults to a merged layer and validate the result.
    pub fn resolve(layer: ConfigLayer, home: Option<PathBuf>) -> Result<Self, anyhow::Error> {
        let (expectations_dir, expectations_dir_is_default) = match layer.expectations_dir {
            Some(dir) => (dir, false),
            None => {
                let home = home.context(
                    "Could not determine the home directory (HOME, USERPROFILE or HOMEDRIVE/HOMEPATH)",
                )?;
                (home.join(DEFAULT_EXPECTATIONS_SUBDIR), true)
            }
        };

        let tls = match (layer.certificate, layer.certificate_key) {
            (Some(certificate), Some(certificate_key)) => Some(TlsConfig {
                certificate,
                certificate_key,
                passphrase: layer.cert_passphrase,
            }),
            (None, None) => {
                if layer.cert_passphrase.is_some() {
                    anyhow::bail!("A certificate passphrase was given without a certificate");
                }
                None
            }
            (Some(_), None) => {
                anyhow::bail!("A certificate was given without its private key")
            }
            (None, Some(_)) => {
                anyhow::bail!("A private key was given without its certificate")
            }
        };

        let config = Self {
            listen: ListenConfig::new(
                layer.ip.unwrap_or(DEFAULT_IP),
                layer.port.unwrap_or(DEFAULT_PORT),
            ),
            expectations_dir,
            expectations_dir_is_default,
            debug: layer.debug.unwrap_or(false),
            tls,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.expectations_dir.as_os_str().is_empty() {
            anyhow::bail!("Expectations directory must not be empty");
        }
        if let Some(tls) = &self.tls {
            if tls.certificate.as_os_str().is_empty() || tls.certificate_key.as_os_str().is_empty()
            {
                anyhow::bail!("Certificate and private key paths must not be empty");
            }
        }
        Ok(())
    }

    /// Create the default expectations directory when missing. Fails when the
    /// path exists but is not a directory.
    pub fn prepare_expectations_dir(&self) -> Result<(), anyhow::Error> {
        let dir = &self.expectations_dir;
        if dir.exists() {
            if !dir.is_dir() {
                anyhow::bail!("Expectations path must be a directory: {}", dir.display());
            }
        } else if self.expectations_dir_is_default {
            std::fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create expectations directory '{}'", dir.display())
            })?;
        }
        Ok(())
    }
}
