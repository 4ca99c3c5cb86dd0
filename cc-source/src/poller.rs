//! Fetch, deduplicate and publish every source.

use crate::adapter::SourceAdapter;
use crate::error::Result;
use crate::fetch::Fetch;
use cc_cache::{digest, VersionedCache};
use log::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Upstream content matched the published digest.
    Unchanged,
    /// A new snapshot with this many spray files was published.
    Published { files: usize },
}

/// Per-source results of one polling pass.
#[derive(Debug, Default)]
pub struct PollReport {
    pub results: Vec<(String, Result<PollOutcome>)>,
}

impl PollReport {
    /// True only if every source was polled without error.
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(name, _)| name.as_str())
    }
}

pub struct Poller<F> {
    cache: VersionedCache,
    fetcher: F,
}

impl<F: Fetch> Poller<F> {
    pub fn new(cache: VersionedCache, fetcher: F) -> Self {
        Poller { cache, fetcher }
    }

    /// Fetch one source and publish it if its content changed.
    ///
    /// Any failure after staging drops the staged snapshot, leaving the
    /// published one in place.
    pub async fn poll_source(&self, adapter: &SourceAdapter) -> Result<PollOutcome> {
        let payload = self.fetcher.fetch(&adapter.url).await?;
        let digest = digest(&payload);
        let Some(staged) = self.cache.publish(&adapter.dir_name, &payload, &digest)? else {
            return Ok(PollOutcome::Unchanged);
        };
        info!("Starting spray of {}", adapter.dir_name);
        let spray = adapter.reshape_and_index(&payload)?;
        for (key, bytes) in &spray.files {
            staged.write_spray_file(key, bytes)?;
        }
        staged.write_geotree(&spray.geo_tree)?;
        staged.commit()?;
        info!("Finished spray of {}", adapter.dir_name);
        Ok(PollOutcome::Published {
            files: spray.files.len(),
        })
    }

    /// Poll every source in order. A failing source is logged and recorded
    /// and the remaining sources are still polled.
    pub async fn poll_all(&self, adapters: &[SourceAdapter]) -> PollReport {
        let mut report = PollReport::default();
        for adapter in adapters {
            info!("Starting check of {}", adapter.dir_name);
            let result = self.poll_source(adapter).await;
            match &result {
                Ok(outcome) => info!("Finished check of {}: {:?}", adapter.dir_name, outcome),
                Err(e) => error!("Failed with check of {}: {}", adapter.dir_name, e),
            }
            report.results.push((adapter.dir_name.clone(), result));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SourceKind;
    use crate::error::SourceError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const NYT_STATES: &str = "date,state,fips,cases,deaths\n\
2020-04-01,Texas,48,100,2\n\
2020-04-02,Texas,48,150,3\n";

    #[derive(Default)]
    struct MemoryFetcher {
        payloads: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryFetcher {
        fn set(&self, url: &str, body: &str) {
            self.payloads
                .lock()
                .unwrap()
                .insert(url.to_string(), body.as_bytes().to_vec());
        }
    }

    #[async_trait]
    impl Fetch for MemoryFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.payloads
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| SourceError::FetchFailure {
                    url: url.to_string(),
                    reason: "not found".to_string(),
                })
        }
    }

    fn sources() -> Vec<SourceAdapter> {
        vec![
            SourceAdapter::new(SourceKind::NytCounties, "nyt_us_counties", "mem://counties"),
            SourceAdapter::new(SourceKind::NytStates, "nyt_us_states", "mem://states"),
        ]
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionedCache::new(dir.path());
        let fetcher = MemoryFetcher::default();
        fetcher.set("mem://states", NYT_STATES);
        let poller = Poller::new(cache.clone(), fetcher);

        let report = poller.poll_all(&sources()).await;
        assert!(!report.all_ok());
        assert_eq!(report.failures().collect::<Vec<_>>(), vec!["nyt_us_counties"]);
        assert!(matches!(
            report.results[1].1,
            Ok(PollOutcome::Published { files: 1 })
        ));
        assert!(cache.snapshot("nyt_us_states").is_some());
        assert!(cache.snapshot("nyt_us_counties").is_none());
    }

    #[tokio::test]
    async fn test_poll_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionedCache::new(dir.path());
        let fetcher = MemoryFetcher::default();
        fetcher.set("mem://states", NYT_STATES);
        let poller = Poller::new(cache.clone(), fetcher);
        let all = sources();
        let states = &all[1..];

        assert!(poller.poll_all(states).await.all_ok());
        let second = poller.poll_all(states).await;
        assert!(second.all_ok());
        assert!(matches!(second.results[0].1, Ok(PollOutcome::Unchanged)));
        assert_eq!(cache.archive_count("nyt_us_states"), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionedCache::new(dir.path());
        let fetcher = MemoryFetcher::default();
        fetcher.set("mem://states", NYT_STATES);
        let poller = Poller::new(cache.clone(), fetcher);
        let all = sources();
        let states = &all[1..];
        assert!(poller.poll_all(states).await.all_ok());

        poller.fetcher.set("mem://states", "date,fips\n2020-04-03,48\n");
        let report = poller.poll_all(states).await;
        assert!(matches!(
            report.results[0].1,
            Err(SourceError::MalformedSource { .. })
        ));
        let snapshot = cache.snapshot("nyt_us_states").unwrap();
        assert_eq!(snapshot.digest().unwrap(), digest(NYT_STATES.as_bytes()));
        assert!(snapshot.spray_path("Texas").unwrap().is_file());
        assert!(std::fs::read_dir(dir.path().join(cc_cache::STAGING_DIR))
            .unwrap()
            .next()
            .is_none());
    }
}
