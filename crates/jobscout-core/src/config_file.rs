use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Config, MAX_JOBS_PER_SITE};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub scrape: Option<ScrapeSection>,
    pub sites: Option<SitesSection>,
    pub queue: Option<QueueSection>,
    pub storage: Option<StorageSection>,
    pub maintenance: Option<MaintenanceSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeSection {
    pub location: Option<String>,
    pub jobs_per_site: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub politeness_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub fallback_records: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitesSection {
    pub disabled: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueSection {
    pub num_workers: Option<usize>,
    pub max_attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
    pub db_path: Option<String>,
    pub upload_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceSection {
    pub stale_after_days: Option<u32>,
}

/// Platform config directory path: `<config_dir>/jobscout/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jobscout").join("config.toml"))
}

/// Load config by cascading CWD `.jobscout.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".jobscout.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Field from `overlay` if set, else from `base`.
fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bs, os) = (&base.scrape, &overlay.scrape);
    let (bq, oq) = (&base.queue, &overlay.queue);
    let (bst, ost) = (&base.storage, &overlay.storage);

    ConfigFile {
        scrape: Some(ScrapeSection {
            location: pick(os, bs, |s| s.location.clone()),
            jobs_per_site: pick(os, bs, |s| s.jobs_per_site),
            request_timeout_secs: pick(os, bs, |s| s.request_timeout_secs),
            politeness_delay_ms: pick(os, bs, |s| s.politeness_delay_ms),
            user_agent: pick(os, bs, |s| s.user_agent.clone()),
            fallback_records: pick(os, bs, |s| s.fallback_records),
        }),
        sites: Some(SitesSection {
            disabled: pick(&overlay.sites, &base.sites, |s| s.disabled.clone()),
        }),
        queue: Some(QueueSection {
            num_workers: pick(oq, bq, |q| q.num_workers),
            max_attempts: pick(oq, bq, |q| q.max_attempts),
            retry_delay_secs: pick(oq, bq, |q| q.retry_delay_secs),
        }),
        storage: Some(StorageSection {
            db_path: pick(ost, bst, |s| s.db_path.clone()),
            upload_dir: pick(ost, bst, |s| s.upload_dir.clone()),
        }),
        maintenance: Some(MaintenanceSection {
            stale_after_days: pick(&overlay.maintenance, &base.maintenance, |m| {
                m.stale_after_days
            }),
        }),
    }
}

impl ConfigFile {
    /// Overlay every value set in the file onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(scrape) = &self.scrape {
            if let Some(v) = &scrape.location {
                config.location = v.clone();
            }
            if let Some(v) = scrape.jobs_per_site {
                config.jobs_per_site = v.min(MAX_JOBS_PER_SITE);
            }
            if let Some(v) = scrape.request_timeout_secs {
                config.request_timeout_secs = v;
            }
            if let Some(v) = scrape.politeness_delay_ms {
                config.politeness_delay_ms = v;
            }
            if let Some(v) = &scrape.user_agent {
                config.user_agent = v.clone();
            }
            if let Some(v) = scrape.fallback_records {
                config.fallback_records = v;
            }
        }
        if let Some(disabled) = self.sites.as_ref().and_then(|s| s.disabled.clone()) {
            config.disabled_sites = disabled;
        }
        if let Some(queue) = &self.queue {
            if let Some(v) = queue.num_workers {
                config.num_workers = v;
            }
            if let Some(v) = queue.max_attempts {
                config.max_attempts = v;
            }
            if let Some(v) = queue.retry_delay_secs {
                config.retry_delay_secs = v;
            }
        }
        if let Some(storage) = &self.storage {
            if let Some(v) = &storage.db_path {
                config.db_path = Some(PathBuf::from(v));
            }
            if let Some(v) = &storage.upload_dir {
                config.upload_dir = PathBuf::from(v);
            }
        }
        if let Some(days) = self.maintenance.as_ref().and_then(|m| m.stale_after_days) {
            config.stale_after_days = days;
        }
    }

    /// Defaults with this file applied.
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();
        self.apply_to(&mut config);
        config
    }
}
