// src/load/cache.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
    time::SystemTime,
};
use tracing::{debug, info};

use super::{load_indicator_table, RawIndicatorTable};
use crate::indicator::Indicator;

/// Where each of the four indicator tables lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcePaths {
    pub population: PathBuf,
    pub output: PathBuf,
    pub unemployment: PathBuf,
    pub mobile: PathBuf,
}

impl SourcePaths {
    /// Default file names (`population.csv`, ...) inside `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            population: dir.join(Indicator::Population.file_name()),
            output: dir.join(Indicator::Output.file_name()),
            unemployment: dir.join(Indicator::Unemployment.file_name()),
            mobile: dir.join(Indicator::Mobile.file_name()),
        }
    }

    pub fn path(&self, indicator: Indicator) -> &Path {
        match indicator {
            Indicator::Population => &self.population,
            Indicator::Output => &self.output,
            Indicator::Unemployment => &self.unemployment,
            Indicator::Mobile => &self.mobile,
        }
    }

    /// Resolve relative entries against `base`.
    pub fn relative_to<P: AsRef<Path>>(&self, base: P) -> Self {
        let base = base.as_ref();
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        Self {
            population: join(&self.population),
            output: join(&self.output),
            unemployment: join(&self.unemployment),
            mobile: join(&self.mobile),
        }
    }
}

/// The four loaded tables of one run.
#[derive(Debug, Clone)]
pub struct IndicatorTables {
    pub population: Arc<RawIndicatorTable>,
    pub output: Arc<RawIndicatorTable>,
    pub unemployment: Arc<RawIndicatorTable>,
    pub mobile: Arc<RawIndicatorTable>,
}

impl IndicatorTables {
    pub fn get(&self, indicator: Indicator) -> &RawIndicatorTable {
        match indicator {
            Indicator::Population => &self.population,
            Indicator::Output => &self.output,
            Indicator::Unemployment => &self.unemployment,
            Indicator::Mobile => &self.mobile,
        }
    }
}

/// What we know about a file without reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    len: u64,
    modified: Option<SystemTime>,
}

impl FileIdentity {
    fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct CachedTable {
    identity: FileIdentity,
    table: Arc<RawIndicatorTable>,
}

/// Loaded tables keyed by indicator and source path.
///
/// A hit hands back the same `Arc` without touching the file contents; an
/// entry is reloaded only when the file's size or mtime changes or when it
/// is invalidated explicitly.
#[derive(Default)]
pub struct TableCache {
    map: RwLock<HashMap<(Indicator, PathBuf), CachedTable>>,
    loads: AtomicUsize,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `(indicator, path)`, loading it on a miss.
    pub fn get_or_load<P: AsRef<Path>>(
        &self,
        indicator: Indicator,
        path: P,
    ) -> Result<Arc<RawIndicatorTable>> {
        let path = path.as_ref();
        let key_path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let identity = FileIdentity::of(&key_path)?;
        let key = (indicator, key_path);

        // 1) fast path under the read lock
        {
            let map_r = self.map.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = map_r.get(&key) {
                if cached.identity == identity {
                    debug!(%indicator, "cache hit");
                    return Ok(Arc::clone(&cached.table));
                }
            }
        }

        // 2) miss or stale: load outside the lock, then publish
        let table = Arc::new(load_indicator_table(indicator, &key.1)?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        let mut map_w = self.map.write().unwrap_or_else(|e| e.into_inner());
        map_w.insert(
            key,
            CachedTable {
                identity,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Load (or reuse) all four tables.
    pub fn load_all(&self, sources: &SourcePaths) -> Result<IndicatorTables> {
        let tables = IndicatorTables {
            population: self.get_or_load(Indicator::Population, &sources.population)?,
            output: self.get_or_load(Indicator::Output, &sources.output)?,
            unemployment: self.get_or_load(Indicator::Unemployment, &sources.unemployment)?,
            mobile: self.get_or_load(Indicator::Mobile, &sources.mobile)?,
        };
        info!(loads = self.load_count(), "indicator tables ready");
        Ok(tables)
    }

    /// Drop every entry for `indicator`.
    pub fn invalidate(&self, indicator: Indicator) {
        let mut map_w = self.map.write().unwrap_or_else(|e| e.into_inner());
        map_w.retain(|(ind, _), _| *ind != indicator);
    }

    pub fn clear(&self) {
        self.map.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// How many times a source file has actually been read.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::tests::csv_fixture;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_mobile(path: &Path, rows: &[(&str, &str, Vec<Option<f64>>)]) -> Result<()> {
        let mut f = fs::File::create(path)?;
        f.write_all(csv_fixture(Indicator::Mobile, rows).as_bytes())?;
        Ok(())
    }

    #[test]
    fn hit_returns_the_same_table_without_reloading() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mobile.csv");
        write_mobile(&path, &[("Chile", "CHL", vec![Some(1.0)])])?;

        let cache = TableCache::new();
        let a = cache.get_or_load(Indicator::Mobile, &path)?;
        let b = cache.get_or_load(Indicator::Mobile, &path)?;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.load_count(), 1);
        Ok(())
    }

    #[test]
    fn changed_content_or_invalidation_reloads() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mobile.csv");
        write_mobile(&path, &[("Chile", "CHL", vec![Some(1.0)])])?;

        let cache = TableCache::new();
        let first = cache.get_or_load(Indicator::Mobile, &path)?;
        assert_eq!(first.len(), 1);

        // grows the file, so the identity changes even on coarse mtime clocks
        write_mobile(
            &path,
            &[
                ("Chile", "CHL", vec![Some(1.0)]),
                ("Peru", "PER", vec![Some(2.0)]),
            ],
        )?;
        let second = cache.get_or_load(Indicator::Mobile, &path)?;
        assert_eq!(second.len(), 2);
        assert_eq!(cache.load_count(), 2);

        cache.invalidate(Indicator::Mobile);
        let third = cache.get_or_load(Indicator::Mobile, &path)?;
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(cache.load_count(), 3);
        Ok(())
    }

    #[test]
    fn same_file_under_another_indicator_is_a_separate_entry() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mobile.csv");
        write_mobile(&path, &[("Chile", "CHL", vec![Some(1.0)])])?;

        let cache = TableCache::new();
        cache.get_or_load(Indicator::Mobile, &path)?;
        // mobile fixture lacks 2016..2022 so loading it as population fails
        assert!(cache.get_or_load(Indicator::Population, &path).is_err());
        assert_eq!(cache.load_count(), 1);
        Ok(())
    }

    #[test]
    fn relative_sources_resolve_against_base() {
        let sources = SourcePaths::from_dir("data").relative_to("/srv");
        assert_eq!(sources.path(Indicator::Output), Path::new("/srv/data/output.csv"));
    }
}
