// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use nazif_app::{DiscountType, QuoteDraft, TaxMode};
use nazif_archive::ArchiveConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub archive: Archive,
    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            archive: Archive::default(),
            defaults: Defaults::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

/// Remote archive settings. All three of url, api_key and tenant must be
/// present before any archive command works; nothing falls back to process
/// globals or hard-coded credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Archive {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub tenant: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_base_delay: Option<String>,
    pub read_timeout: Option<String>,
    pub write_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    pub currency: Option<String>,
    pub tax: Option<f64>,
    pub tax_mode: Option<String>,
    pub discount_type: Option<String>,
    pub validity_days: Option<i64>,
    pub page_size: Option<u32>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("NAZIF_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set NAZIF_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(nazif_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and move values under [storage], [archive], and [defaults]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            nazif_store::validate_store_path(db_path)?;
        }

        if let Some(retries) = self.archive.max_retries
            && retries == 0
        {
            bail!(
                "archive.max_retries in {} must be at least 1",
                path.display()
            );
        }

        for (name, raw) in [
            ("archive.retry_base_delay", &self.archive.retry_base_delay),
            ("archive.read_timeout", &self.archive.read_timeout),
            ("archive.write_timeout", &self.archive.write_timeout),
        ] {
            if let Some(raw) = raw {
                let parsed = parse_duration(raw)?;
                if parsed <= Duration::ZERO {
                    bail!("{name} in {} must be positive, got {raw}", path.display());
                }
            }
        }

        if let Some(tax) = self.defaults.tax
            && !(tax.is_finite() && (0.0..=100.0).contains(&tax))
        {
            bail!(
                "defaults.tax in {} must be between 0 and 100, got {tax}",
                path.display()
            );
        }

        if let Some(mode) = &self.defaults.tax_mode
            && TaxMode::parse(mode).is_none()
        {
            bail!(
                "defaults.tax_mode in {} must be \"inclusive\" or \"exclusive\", got {mode:?}",
                path.display()
            );
        }

        if let Some(kind) = &self.defaults.discount_type
            && DiscountType::parse(kind).is_none()
        {
            bail!(
                "defaults.discount_type in {} must be \"amount\" or \"percent\", got {kind:?}",
                path.display()
            );
        }

        if let Some(days) = self.defaults.validity_days
            && days <= 0
        {
            bail!(
                "defaults.validity_days in {} must be positive, got {days}",
                path.display()
            );
        }

        if let Some(size) = self.defaults.page_size
            && size == 0
        {
            bail!("defaults.page_size in {} must be positive", path.display());
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => nazif_store::default_store_path(),
        }
    }

    pub fn archive_configured(&self) -> bool {
        let set = |value: &Option<String>| {
            value.as_deref().is_some_and(|value| !value.trim().is_empty())
        };
        set(&self.archive.url) && set(&self.archive.api_key) && set(&self.archive.tenant)
    }

    pub fn archive_config(&self) -> Result<ArchiveConfig> {
        let mut config = ArchiveConfig::new(
            self.archive.url.as_deref().unwrap_or(""),
            self.archive.api_key.as_deref().unwrap_or(""),
            self.archive.tenant.as_deref().unwrap_or(""),
        );
        if let Some(retries) = self.archive.max_retries {
            config.max_retries = retries;
        }
        if let Some(raw) = &self.archive.retry_base_delay {
            config.retry_base_delay = parse_duration(raw)?;
        }
        if let Some(raw) = &self.archive.read_timeout {
            config.read_timeout = parse_duration(raw)?;
        }
        if let Some(raw) = &self.archive.write_timeout {
            config.write_timeout = parse_duration(raw)?;
        }
        Ok(config)
    }

    pub fn page_size(&self) -> usize {
        self.defaults
            .page_size
            .map(|size| size as usize)
            .unwrap_or(nazif_app::DEFAULT_PAGE_SIZE)
    }

    /// A blank draft carrying the configured business defaults.
    pub fn default_draft(&self) -> QuoteDraft {
        let mut draft = QuoteDraft::default();
        if let Some(currency) = &self.defaults.currency
            && !currency.trim().is_empty()
        {
            draft.currency = currency.clone();
        }
        if let Some(tax) = self.defaults.tax {
            draft.tax_rate = tax;
        }
        if let Some(mode) = self.defaults.tax_mode.as_deref().and_then(TaxMode::parse) {
            draft.tax_mode = mode;
        }
        if let Some(kind) = self
            .defaults
            .discount_type
            .as_deref()
            .and_then(DiscountType::parse)
        {
            draft.discount_type = kind;
        }
        if let Some(days) = self.defaults.validity_days {
            draft.validity_days = days;
        }
        draft
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# nazif config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/nazif/nazif.db)\n# db_path = \"/absolute/path/to/nazif.db\"\n\n[archive]\n# All three values are required before archive commands work.\n# url = \"https://YOUR-PROJECT.supabase.co\"\n# api_key = \"YOUR-ANON-KEY\"\n# tenant = \"your-business\"\nmax_retries = 3\nretry_base_delay = \"1s\"\nread_timeout = \"10s\"\nwrite_timeout = \"15s\"\n\n[defaults]\ncurrency = \"SAR\"\ntax = 15.0\ntax_mode = \"exclusive\"\ndiscount_type = \"amount\"\nvalidity_days = 30\npage_size = 20\n",
            path.display(),
        )
    }
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
