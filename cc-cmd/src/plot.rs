//! Figure building with memoized output paths.
//!
//! A figure is identified by its series and places; its directory is the
//! compact timed name of the series, so new data lands in a new directory
//! while repeated requests for the same data reuse the file.

use crate::Settings;
use cc_geo::{
    batch::expand_batch,
    places::{decode_place, decode_places},
    GeoTriple,
};
use cc_source::SourceCatalog;
use cc_stack::{draw_stacks, Figure, FigureRecorder, Stack, StackList, LEFT_TIME};
use cc_utils::stamps::TimedStyle;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// File name derived from the series name and every place, in order.
pub fn figure_file_name(series_name: &str, places: &[GeoTriple]) -> String {
    let specs = places
        .iter()
        .map(|p| p.components().join(","))
        .collect::<Vec<_>>()
        .join("/");
    format!("{:x}.json", md5::compute(format!("{}{}", series_name, specs)))
}

/// `<output>/<compact timed name>/<digest>.json`
pub fn figure_path(
    settings: &Settings,
    catalog: &SourceCatalog,
    series_name: &str,
    places: &[GeoTriple],
) -> anyhow::Result<PathBuf> {
    let version = catalog.timed_name(series_name, TimedStyle::Compact)?;
    Ok(settings
        .output_dir
        .join(version)
        .join(figure_file_name(series_name, places)))
}

/// Resolve every place and lay out the stacked figure.
pub fn build_figure(
    catalog: &SourceCatalog,
    series_name: &str,
    places: &[GeoTriple],
) -> anyhow::Result<Figure> {
    if places.is_empty() {
        anyhow::bail!("No places given for {}", series_name);
    }
    let stacks = places
        .iter()
        .map(|triple| {
            let series = catalog.resolve(series_name, triple)?.tail(LEFT_TIME);
            Ok(Stack::from_cumulative(&series))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let dataset_when = catalog.timed_name(series_name, TimedStyle::Alpha)?;
    let mut recorder = FigureRecorder::new();
    draw_stacks(
        &mut recorder,
        &StackList::new(stacks),
        series_name,
        &dataset_when,
    );
    Ok(recorder.into_figure())
}

/// Build the figure and write it to `path`.
pub fn build_image(
    catalog: &SourceCatalog,
    path: &Path,
    series_name: &str,
    places: &[GeoTriple],
) -> anyhow::Result<PathBuf> {
    let figure = build_figure(catalog, series_name, places)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, figure.to_json()?)?;
    info!("Wrote figure to {}", path.display());
    Ok(path.to_path_buf())
}

/// The figure's memoized path, building it first if it does not exist.
pub fn memoized_figure(
    settings: &Settings,
    catalog: &SourceCatalog,
    series_name: &str,
    places: &[GeoTriple],
) -> anyhow::Result<PathBuf> {
    let path = figure_path(settings, catalog, series_name, places)?;
    if path.is_file() {
        info!("Reusing {}", path.display());
        return Ok(path);
    }
    build_image(catalog, &path, series_name, places)
}

pub fn run_build(settings: &Settings, request: &str) -> anyhow::Result<()> {
    let request = decode_places(request)?;
    info!("Building image for {}", request.encode()?);
    let catalog = settings.catalog()?;
    let path = if request.path.is_empty() {
        memoized_figure(settings, &catalog, &request.series_name, &request.places)?
    } else {
        build_image(
            &catalog,
            Path::new(&request.path),
            &request.series_name,
            &request.places,
        )?
    };
    println!("{}", path.display());
    Ok(())
}

pub fn run_plot(settings: &Settings, series_name: &str, geos: &[String]) -> anyhow::Result<()> {
    let mut places = geos
        .iter()
        .map(|g| decode_place(g))
        .collect::<cc_geo::Result<Vec<_>>>()?;
    places.sort();
    let catalog = settings.catalog()?;
    let path = memoized_figure(settings, &catalog, series_name, &places)?;
    println!("{}", path.display());
    Ok(())
}

pub fn run_batch(settings: &Settings, yaml: &Path) -> anyhow::Result<()> {
    let document = fs::read_to_string(yaml)?;
    let channels = expand_batch(&document)?;
    let catalog = settings.catalog()?;
    info!("{} channels in {}", channels.len(), yaml.display());
    for channel in channels {
        let path = memoized_figure(settings, &catalog, &channel.series_name, &channel.places)?;
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_cache::{digest, VersionedCache};
    use cc_source::{SourceAdapter, SourceKind};

    fn settings(root: &Path) -> Settings {
        Settings {
            data_dir: root.join("data"),
            output_dir: root.join("static"),
            timeout_secs: 1,
        }
    }

    /// Publish 45 days of growing state totals for Texas and Ohio.
    fn publish_nyt_states(cache: &VersionedCache) {
        let mut csv = String::from("date,state,fips,cases,deaths\n");
        for day in 0..45u32 {
            let date = nyt_date(day);
            let texas = (1000.0 * 1.05f64.powi(day as i32)).round();
            let ohio = (500.0 * 1.03f64.powi(day as i32)).round();
            csv.push_str(&format!("{},Texas,48,{},1\n", date, texas));
            csv.push_str(&format!("{},Ohio,39,{},1\n", date, ohio));
        }
        let adapter = SourceAdapter::new(SourceKind::NytStates, "nyt_us_states", "");
        let spray = adapter.reshape_and_index(csv.as_bytes()).unwrap();
        let staged = cache
            .publish("nyt_us_states", csv.as_bytes(), &digest(csv.as_bytes()))
            .unwrap()
            .unwrap();
        for (key, bytes) in &spray.files {
            staged.write_spray_file(key, bytes).unwrap();
        }
        staged.write_geotree(&spray.geo_tree).unwrap();
        staged.commit().unwrap();
    }

    fn nyt_date(day: u32) -> String {
        use cc_utils::dates::{date_to_ordinal, format_date, ordinal_to_date, parse_date};
        let start = parse_date("2020-03-01").unwrap();
        format_date(&ordinal_to_date(date_to_ordinal(&start) + day as i64).unwrap())
    }

    #[test]
    fn test_file_name_depends_on_order() {
        let a = GeoTriple::new("USA", "Texas", "Bexar");
        let b = GeoTriple::new("USA", "Texas", "");
        let name = figure_file_name("cases_NYT", &[a.clone(), b.clone()]);
        assert_eq!(
            name,
            format!("{:x}.json", md5::compute("cases_NYTUSA,Texas,Bexar/USA,Texas,"))
        );
        assert_ne!(name, figure_file_name("cases_NYT", &[b, a]));
    }

    #[test]
    fn test_figure_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        publish_nyt_states(&settings.cache());
        let catalog = settings.catalog().unwrap();
        let places = vec![
            GeoTriple::new("USA", "Texas", ""),
            GeoTriple::new("USA", "Ohio", ""),
        ];

        let path = memoized_figure(&settings, &catalog, "cases_NYT", &places).unwrap();
        assert!(path.is_file());
        assert!(path.starts_with(&settings.output_dir));
        let json = fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"Texas\""));

        fs::write(&path, "stale").unwrap();
        let again = memoized_figure(&settings, &catalog, "cases_NYT", &places).unwrap();
        assert_eq!(again, path);
        assert_eq!(fs::read_to_string(&again).unwrap(), "stale");
    }

    #[test]
    fn test_unknown_place_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        publish_nyt_states(&settings.cache());
        let catalog = settings.catalog().unwrap();
        assert!(build_figure(&catalog, "cases_NYT", &[GeoTriple::new("USA", "Utah", "")]).is_err());
        assert!(build_figure(&catalog, "cases_NYT", &[]).is_err());
    }
}
