use crate::Settings;

/// Print providers, each followed by its series.
pub fn run_list(settings: &Settings) -> anyhow::Result<()> {
    let catalog = settings.catalog()?;
    for (provider, series) in catalog.list_by_provider() {
        println!("{}", provider.name());
        for s in series {
            println!("  {:<24} {}", s.external_name(), s.simplest_name());
        }
    }
    Ok(())
}

pub fn run_geotree(settings: &Settings, series_name: &str) -> anyhow::Result<()> {
    let catalog = settings.catalog()?;
    let tree = catalog.geo_tree(series_name)?;
    println!("{}", tree.to_json()?);
    Ok(())
}
