//! Poll every embedded source once.

use crate::Settings;
use cc_source::{HttpFetcher, Poller};
use log::info;

/// Fetch every source, publishing the ones whose content changed. Fails if
/// any source failed, after all of them have been attempted.
pub async fn run_poll(settings: &Settings) -> anyhow::Result<()> {
    let catalog = settings.catalog()?;
    let fetcher = HttpFetcher::new(settings.timeout())?;
    let poller = Poller::new(settings.cache(), fetcher);

    info!(
        "Polling {} sources into {}",
        catalog.adapters().len(),
        settings.data_dir.display()
    );
    let report = poller.poll_all(catalog.adapters()).await;
    if !report.all_ok() {
        let failed: Vec<&str> = report.failures().collect();
        anyhow::bail!("{} source(s) failed: {}", failed.len(), failed.join(", "));
    }
    info!("Poll complete");
    Ok(())
}
