//! On-disk TTL cache for the team-membership map. Best-effort: any failure
//! reads as a miss and write errors are only logged.

use crate::config::CacheConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

pub const CACHE_DIR_ENV: &str = "GITHUB_CODE_SEARCH_CACHE_DIR";
const APP_DIR: &str = "github-code-search";

/// Env override, then config, then the OS cache dir.
pub fn cache_dir(config: &CacheConfig) -> PathBuf {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        let dir = dir.trim();
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Some(dir) = &config.dir {
        return dir.clone();
    }
    match dirs::cache_dir() {
        Some(base) => base.join(APP_DIR),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!(".{}", APP_DIR))
            .join("cache"),
    }
}

fn safe_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// File name for an org + prefix set. Prefix order does not matter.
pub fn team_cache_key(org: &str, prefixes: &[String]) -> String {
    let mut sorted: Vec<&String> = prefixes.iter().collect();
    sorted.sort();
    let parts: Vec<String> = std::iter::once(org)
        .chain(sorted.into_iter().map(String::as_str))
        .map(safe_filename)
        .collect();
    format!("teams__{}.json", parts.join("__"))
}

pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(cache_dir(config), Duration::from_secs(config.ttl_hours * 3600))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `None` when missing, unreadable, unparsable or older than the TTL.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.dir.join(key);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > self.ttl {
            debug!(key, ?age, "cache entry expired");
            return None;
        }
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "cache entry unreadable");
                None
            }
        }
    }

    /// Write through a temp file and rename so readers never see a torn file.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_write(key, value) {
            debug!(key, error = %e, "cache write skipped");
        }
    }

    fn try_write<T: Serialize>(&self, key: &str, value: &T) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_string(value)?;
        let tmp = self.dir.join(format!("{}.{}.tmp", key, std::process::id()));
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, self.dir.join(key)).inspect_err(|_| {
            let _ = std::fs::remove_file(&tmp);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    type Teams = BTreeMap<String, Vec<String>>;

    fn sample() -> Teams {
        let mut m = Teams::new();
        m.insert("acme/api".into(), vec!["squad-core".into()]);
        m
    }

    #[test]
    fn key_is_sanitised_and_order_independent() {
        let a = team_cache_key("acme", &["squad-".into(), "chapter-".into()]);
        let b = team_cache_key("acme", &["chapter-".into(), "squad-".into()]);
        assert_eq!(a, b);
        assert_eq!(a, "teams__acme__chapter-__squad-.json");
        assert_eq!(
            team_cache_key("my org", &["a/b".into()]),
            "teams__my_org__a_b.json"
        );
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().join("nested"), Duration::from_secs(3600));
        cache.write("k.json", &sample());
        assert_eq!(cache.read::<Teams>("k.json"), Some(sample()));
        // no temp file left behind
        let names: Vec<_> = std::fs::read_dir(cache.dir()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn missing_and_corrupt_entries_are_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path(), Duration::from_secs(3600));
        assert_eq!(cache.read::<Teams>("absent.json"), None);
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert_eq!(cache.read::<Teams>("bad.json"), None);
    }

    #[test]
    fn expired_entries_are_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path(), Duration::from_secs(3600));
        cache.write("old.json", &sample());
        let file = std::fs::File::options()
            .write(true)
            .open(dir.path().join("old.json"))
            .unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(2 * 3600))
            .unwrap();
        assert_eq!(cache.read::<Teams>("old.json"), None);
    }

    #[test]
    fn unwritable_dir_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let cache = Cache::new(blocker.join("sub"), Duration::from_secs(60));
        cache.write("k.json", &sample());
        assert_eq!(cache.read::<Teams>("k.json"), None);
    }

    #[test]
    fn config_dir_used_without_env_override() {
        if std::env::var_os(CACHE_DIR_ENV).is_some() {
            return;
        }
        let cfg = CacheConfig {
            dir: Some(PathBuf::from("/tmp/gcs-cache")),
            ..CacheConfig::default()
        };
        assert_eq!(cache_dir(&cfg), PathBuf::from("/tmp/gcs-cache"));
    }
}
