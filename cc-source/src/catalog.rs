//! Registry of logical series and the adapters that feed them.

use crate::adapter::{Provider, SourceAdapter};
use crate::error::{Result, SourceError};
use cc_cache::{CacheError, VersionedCache};
use cc_data::TimeSeries;
use cc_geo::{GeoTree, GeoTriple};
use cc_utils::stamps::{timed_name, TimedStyle};
use chrono::{DateTime, Local};
use log::{debug, warn};
use std::collections::BTreeMap;

/// A logical series such as `cases_NYT`, fed by one or more adapters.
#[derive(Debug, Clone)]
pub struct Series {
    pub name_internal: String,
    pub provider: Provider,
    pub hide_box: Vec<String>,
    pub hide_name: Vec<String>,
    pub adapters: Vec<SourceAdapter>,
}

/// Title-case every run of letters: `hosp_admits` becomes `Hosp_Admits`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

impl Series {
    fn new(name_internal: &str, adapter: &SourceAdapter) -> Self {
        let provider = adapter.provider();
        Series {
            name_internal: name_internal.to_string(),
            provider,
            hide_box: provider.hide_box().iter().map(|s| s.to_string()).collect(),
            hide_name: provider.hide_name().iter().map(|s| s.to_string()).collect(),
            adapters: Vec::new(),
        }
    }

    fn parts(&self) -> (&str, &str) {
        self.name_internal
            .rsplit_once('_')
            .unwrap_or((self.name_internal.as_str(), ""))
    }

    /// `cases_NYT` becomes `cases [NYT]`.
    pub fn external_name(&self) -> String {
        let (stem, unit) = self.parts();
        format!("{} [{}]", stem, unit.to_uppercase())
    }

    /// `cases_NYT` becomes `Cases`.
    pub fn simplest_name(&self) -> String {
        title_case(self.parts().0)
    }
}

/// All known series, built once at startup.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    cache: VersionedCache,
    adapters: Vec<SourceAdapter>,
    series: BTreeMap<String, Series>,
}

impl SourceCatalog {
    pub fn new(cache: VersionedCache) -> Self {
        SourceCatalog {
            cache,
            adapters: Vec::new(),
            series: BTreeMap::new(),
        }
    }

    /// A catalog holding every adapter in `adapters`.
    pub fn with_adapters(cache: VersionedCache, adapters: Vec<SourceAdapter>) -> Self {
        let mut catalog = SourceCatalog::new(cache);
        for adapter in adapters {
            catalog.register(adapter);
        }
        catalog
    }

    /// Add an adapter to every series it contributes to, creating the series
    /// on first sight. An adapter with an already registered directory name
    /// replaces the earlier one.
    pub fn register(&mut self, adapter: SourceAdapter) {
        for name in adapter.series_names() {
            let series = self
                .series
                .entry(name.to_string())
                .or_insert_with(|| Series::new(name, &adapter));
            replace_or_push(&mut series.adapters, adapter.clone());
        }
        replace_or_push(&mut self.adapters, adapter);
    }

    pub fn cache(&self) -> &VersionedCache {
        &self.cache
    }

    /// Every registered adapter, in registration order.
    pub fn adapters(&self) -> &[SourceAdapter] {
        &self.adapters
    }

    pub fn series(&self, name: &str) -> Result<&Series> {
        self.series
            .get(name)
            .ok_or_else(|| SourceError::UnknownSeries(name.to_string()))
    }

    /// Series sorted by external name.
    pub fn list_series_alphabetical(&self) -> Vec<&Series> {
        let mut list: Vec<&Series> = self.series.values().collect();
        list.sort_by_key(|s| s.external_name());
        list
    }

    /// Alphabetical series grouped under their provider, providers in sort
    /// order.
    pub fn list_by_provider(&self) -> Vec<(Provider, Vec<&Series>)> {
        let mut groups: BTreeMap<u8, (Provider, Vec<&Series>)> = BTreeMap::new();
        for series in self.list_series_alphabetical() {
            groups
                .entry(series.provider.sort_number())
                .or_insert_with(|| (series.provider, Vec::new()))
                .1
                .push(series);
        }
        groups.into_values().collect()
    }

    /// Merge of the published coverage trees of every adapter feeding
    /// `series_name`, read fresh from disk. Adapters without a snapshot are
    /// skipped.
    pub fn geo_tree(&self, series_name: &str) -> Result<GeoTree> {
        let series = self.series(series_name)?;
        let mut trees = Vec::new();
        for adapter in &series.adapters {
            match self.cache.snapshot(&adapter.dir_name) {
                Some(snapshot) => trees.push(snapshot.geo_tree()?),
                None => warn!("{}: no snapshot yet", adapter.dir_name),
            }
        }
        Ok(GeoTree::merge_all(trees))
    }

    /// The series for `triple`, from the single adapter that serves it.
    pub fn resolve(&self, series_name: &str, triple: &GeoTriple) -> Result<TimeSeries> {
        let series = self.series(series_name)?;
        let applicable: Vec<&SourceAdapter> = series
            .adapters
            .iter()
            .filter(|a| a.applies_to(triple))
            .collect();
        match applicable.as_slice() {
            [] => Err(SourceError::NoDataForGeography {
                series: series_name.to_string(),
                place: triple.display_name(),
            }),
            [adapter] => {
                debug!("{} for {} from {}", series_name, triple, adapter.dir_name);
                adapter
                    .resolve(&self.cache, series_name, triple)?
                    .ok_or_else(|| SourceError::NoDataForGeography {
                        series: series_name.to_string(),
                        place: triple.display_name(),
                    })
            }
            many => Err(SourceError::DataConflict {
                series: series_name.to_string(),
                place: triple.display_name(),
                count: many.len(),
            }),
        }
    }

    /// Latest modification time of the contents of any adapter feeding
    /// `series_name`.
    pub fn freshness_timestamp(&self, series_name: &str) -> Result<DateTime<Local>> {
        let series = self.series(series_name)?;
        let mut latest: Option<DateTime<Local>> = None;
        for adapter in &series.adapters {
            if let Some(snapshot) = self.cache.snapshot(&adapter.dir_name) {
                let modified = snapshot.modified()?;
                latest = Some(latest.map_or(modified, |l| l.max(modified)));
            }
        }
        latest.ok_or_else(|| CacheError::NoSnapshot(series_name.to_string()).into())
    }

    pub fn timed_name(&self, series_name: &str, style: TimedStyle) -> Result<String> {
        Ok(timed_name(&self.freshness_timestamp(series_name)?, style))
    }
}

fn replace_or_push(adapters: &mut Vec<SourceAdapter>, adapter: SourceAdapter) {
    match adapters.iter_mut().find(|a| a.dir_name == adapter.dir_name) {
        Some(existing) => {
            debug!("{}: registered again, replacing", adapter.dir_name);
            *existing = adapter;
        }
        None => adapters.push(adapter),
    }
}
