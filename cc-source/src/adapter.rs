//! Upstream source adapters.
//!
//! Every adapter is one [`SourceKind`] plus where to fetch it and which cache
//! directory it publishes to. The kind decides how a payload is reshaped into
//! per-geography spray files and how a spray file is read back as a series.
//!
//! Two table shapes exist upstream:
//! - long: one row per date and geography (Covid Tracking Project, New York
//!   Times)
//! - wide: one row per geography, one column per date (Johns Hopkins)

use crate::error::{Result, SourceError};
use crate::table::{is_date_column, Table};
use cc_cache::{Snapshot, VersionedCache};
use cc_data::{DataPoint, TimeSeries};
use cc_geo::{states::expand_state, GeoTree, GeoTriple, EMPTY, USA};
use cc_utils::dates::parse_any_date;
use chrono::NaiveDate;
use log::{debug, info};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Embedded list of upstream sources.
pub static SOURCES_CSV: &str = include_str!("../fixtures/sources.csv");

const K8_STATE: &str = "k8state";
const K8_COUNTY: &str = "k8county";
const K8_COUNTRY: &str = "k8country";

const CTP_RENAMES: &[(&str, &str)] = &[
    ("positive", "cases_CTP"),
    ("death", "deaths_CTP"),
    ("totalTestResults", "tests_CTP"),
    ("hospitalizedCumulative", "hosp_admits_CTP"),
    ("onVentilatorCumulative", "new_vents_CTP"),
    ("inIcuCumulative", "icu_admits_CTP"),
    ("date", "YYYYMMDD"),
    ("state", K8_STATE),
];

const NYT_RENAMES: &[(&str, &str)] = &[
    ("date", "date"),
    ("cases", "cases_NYT"),
    ("deaths", "deaths_NYT"),
    ("county", K8_COUNTY),
    ("state", K8_STATE),
];

const JHU_US_RENAMES: &[(&str, &str)] = &[("Province_State", K8_STATE), ("Admin2", K8_COUNTY)];

const JHU_GLOBAL_RENAMES: &[(&str, &str)] =
    &[("Province/State", K8_STATE), ("Country/Region", K8_COUNTRY)];

/// Data provider behind one or more adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    Jhu,
    Nyt,
    Ctp,
}

impl Provider {
    /// Position in provider listings.
    pub fn sort_number(&self) -> u8 {
        match self {
            Provider::Jhu => 1,
            Provider::Nyt => 2,
            Provider::Ctp => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Jhu => "Johns Hopkins University",
            Provider::Nyt => "New York Times",
            Provider::Ctp => "Covid Tracking Project",
        }
    }

    /// Geographies drawn without a box in figures.
    pub fn hide_box(&self) -> &'static [&'static str] {
        &[USA]
    }

    /// Geographies drawn without a name in figures.
    pub fn hide_name(&self) -> &'static [&'static str] {
        match self {
            Provider::Jhu => &["US"],
            Provider::Nyt | Provider::Ctp => &[USA],
        }
    }
}

/// How a kind lays out its spray files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Long rows keyed by state abbreviation, `YYYYMMDD` dates.
    CtpStates,
    /// Long rows keyed by state, one file per state, county rows inside.
    NytCounties,
    /// Long rows keyed by state, state totals only.
    NytStates,
    /// Wide rows keyed by state, one row per county.
    JhuCounties,
    /// Wide rows keyed by country, one row per region.
    JhuNations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    CtpStates,
    CtpHosp,
    CtpVent,
    CtpIcu,
    NytCounties,
    NytStates,
    JhuCasesCounties,
    JhuCasesNations,
    JhuDeathsCounties,
    JhuDeathsNations,
}

impl SourceKind {
    fn layout(&self) -> Layout {
        use SourceKind::*;
        match self {
            CtpStates | CtpHosp | CtpVent | CtpIcu => Layout::CtpStates,
            NytCounties => Layout::NytCounties,
            NytStates => Layout::NytStates,
            JhuCasesCounties | JhuDeathsCounties => Layout::JhuCounties,
            JhuCasesNations | JhuDeathsNations => Layout::JhuNations,
        }
    }

    pub fn provider(&self) -> Provider {
        match self.layout() {
            Layout::CtpStates => Provider::Ctp,
            Layout::NytCounties | Layout::NytStates => Provider::Nyt,
            Layout::JhuCounties | Layout::JhuNations => Provider::Jhu,
        }
    }

    /// Internal names of the series this kind contributes to.
    pub fn series_names(&self) -> &'static [&'static str] {
        use SourceKind::*;
        match self {
            CtpStates => &["cases_CTP", "deaths_CTP", "tests_CTP"],
            CtpHosp => &["hosp_admits_CTP"],
            CtpVent => &["new_vents_CTP"],
            CtpIcu => &["icu_admits_CTP"],
            NytCounties | NytStates => &["cases_NYT", "deaths_NYT"],
            JhuCasesCounties | JhuCasesNations => &["cases_JHU"],
            JhuDeathsCounties | JhuDeathsNations => &["deaths_JHU"],
        }
    }

    fn renames(&self) -> &'static [(&'static str, &'static str)] {
        match self.layout() {
            Layout::CtpStates => CTP_RENAMES,
            Layout::NytCounties | Layout::NytStates => NYT_RENAMES,
            Layout::JhuCounties => JHU_US_RENAMES,
            Layout::JhuNations => JHU_GLOBAL_RENAMES,
        }
    }

    /// Column the payload is partitioned on.
    fn spray_field(&self) -> &'static str {
        match self.layout() {
            Layout::JhuNations => K8_COUNTRY,
            _ => K8_STATE,
        }
    }

    /// Column naming the geography one level below the spray key.
    fn sub_field(&self) -> Option<&'static str> {
        match self.layout() {
            Layout::NytCounties | Layout::JhuCounties => Some(K8_COUNTY),
            Layout::JhuNations => Some(K8_STATE),
            Layout::CtpStates | Layout::NytStates => None,
        }
    }

    fn date_field(&self) -> Option<&'static str> {
        match self.layout() {
            Layout::CtpStates => Some("YYYYMMDD"),
            Layout::NytCounties | Layout::NytStates => Some("date"),
            Layout::JhuCounties | Layout::JhuNations => None,
        }
    }
}

/// Per-geography files and the coverage tree produced from one payload.
#[derive(Debug, Clone, Default)]
pub struct Spray {
    pub files: Vec<(String, Vec<u8>)>,
    pub geo_tree: GeoTree,
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(rename = "KIND")]
    kind: SourceKind,
    #[serde(rename = "DIRECTORY")]
    directory: String,
    #[serde(rename = "URL")]
    url: String,
}

/// One upstream dataset: a kind, its URL and its cache directory name.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAdapter {
    pub kind: SourceKind,
    pub dir_name: String,
    pub url: String,
}

fn is_us(nation: Option<&str>) -> bool {
    matches!(nation, None | Some(USA))
}

impl SourceAdapter {
    pub fn new(kind: SourceKind, dir_name: &str, url: &str) -> Self {
        SourceAdapter {
            kind,
            dir_name: dir_name.to_string(),
            url: url.to_string(),
        }
    }

    /// Parse a source list with `KIND,DIRECTORY,URL` columns.
    pub fn parse_sources_csv(csv_data: &str) -> Result<Vec<SourceAdapter>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());
        let mut adapters = Vec::new();
        for record in rdr.deserialize::<SourceRecord>() {
            let record = record.map_err(|e| SourceError::SourceList(e.to_string()))?;
            adapters.push(SourceAdapter::new(
                record.kind,
                record.directory.trim(),
                record.url.trim(),
            ));
        }
        Ok(adapters)
    }

    /// The adapters listed in the embedded source list.
    pub fn embedded_sources() -> Result<Vec<SourceAdapter>> {
        SourceAdapter::parse_sources_csv(SOURCES_CSV)
    }

    pub fn provider(&self) -> Provider {
        self.kind.provider()
    }

    pub fn series_names(&self) -> &'static [&'static str] {
        self.kind.series_names()
    }

    fn malformed(&self, reason: impl Into<String>) -> SourceError {
        SourceError::malformed(&self.dir_name, reason)
    }

    fn require(&self, table: &Table, column: &str) -> Result<usize> {
        table
            .column(column)
            .ok_or_else(|| self.malformed(format!("missing column {}", column)))
    }

    /// Split a raw payload into per-geography spray files and a coverage tree.
    ///
    /// Columns are renamed to the internal names and anything that is neither
    /// a geography key nor data is dropped. Rows with an empty spray key are
    /// skipped.
    pub fn reshape_and_index(&self, raw: &[u8]) -> Result<Spray> {
        let mut table = Table::from_csv(raw).map_err(|e| self.malformed(e.to_string()))?;
        table.rename(self.kind.renames());
        match self.kind.layout() {
            Layout::JhuCounties | Layout::JhuNations => {
                let spray_field = self.kind.spray_field();
                let sub_field = self.kind.sub_field();
                table.retain_columns(|h| {
                    is_date_column(h) || h == spray_field || Some(h) == sub_field
                });
            }
            _ => {
                let targets: Vec<&str> = self.kind.renames().iter().map(|(_, to)| *to).collect();
                table.retain_columns(|h| targets.contains(&h));
            }
        }

        let spray_col = self.require(&table, self.kind.spray_field())?;
        let sub_col = match self.kind.sub_field() {
            Some(field) => Some(self.require(&table, field)?),
            None => None,
        };

        if self.kind.layout() == Layout::CtpStates {
            let date_col = self.require(&table, "YYYYMMDD")?;
            table.map_column(spray_col, |s| expand_state(s).to_string());
            table.sort_by_column(date_col);
        }
        // Single-series sources keep only the rows that carry their series.
        let series_cols = match self.series_names() {
            [only] if self.kind.layout() == Layout::CtpStates => vec![self.require(&table, only)?],
            _ => Vec::new(),
        };

        let mut spray = Spray::default();
        for (key, mut part) in table.partition_by(spray_col) {
            if key.is_empty() {
                debug!("{}: skipping {} rows with no key", self.dir_name, part.len());
                continue;
            }
            if !series_cols.is_empty() {
                part.retain_rows(|row| series_cols.iter().any(|&c| !row[c].is_empty()));
            }
            match self.kind.layout() {
                Layout::CtpStates => {
                    // A trend needs at least two rows.
                    if part.len() <= 1 {
                        continue;
                    }
                    spray.geo_tree.insert_state(USA, &key);
                }
                Layout::NytStates => spray.geo_tree.insert_state(USA, &key),
                Layout::NytCounties | Layout::JhuCounties => {
                    let counties = sub_col.map(|c| part.unique(c)).unwrap_or_default();
                    spray.geo_tree.insert(USA, &key, counties);
                }
                Layout::JhuNations => {
                    for region in sub_col.map(|c| part.unique(c)).unwrap_or_default() {
                        spray.geo_tree.insert_state(&key, &region);
                    }
                }
            }
            let bytes = part.to_csv()?;
            spray.files.push((key, bytes));
        }
        info!(
            "{}: {} spray files from {} bytes",
            self.dir_name,
            spray.files.len(),
            raw.len()
        );
        Ok(spray)
    }

    /// Whether this adapter serves `triple`.
    pub fn applies_to(&self, triple: &GeoTriple) -> bool {
        let nation = triple.nation();
        let state = triple.state();
        let county = triple.county();
        match self.kind.layout() {
            Layout::CtpStates | Layout::NytStates => {
                is_us(nation) && state.is_some() && county.is_none()
            }
            Layout::NytCounties => is_us(nation) && state.is_some() && county.is_some(),
            Layout::JhuCounties => nation == Some(USA) && state.is_some(),
            Layout::JhuNations => county.is_none() && nation.is_some() && nation != Some(USA),
        }
    }

    /// Read `series_name` for `triple` from the published snapshot.
    ///
    /// `Ok(None)` means this adapter does not serve the triple.
    pub fn resolve(
        &self,
        cache: &VersionedCache,
        series_name: &str,
        triple: &GeoTriple,
    ) -> Result<Option<TimeSeries>> {
        if !self.applies_to(triple) {
            return Ok(None);
        }
        let no_data = || SourceError::NoDataForGeography {
            series: series_name.to_string(),
            place: triple.display_name(),
        };
        let snapshot = cache.snapshot(&self.dir_name).ok_or_else(no_data)?;
        let key = match self.kind.layout() {
            Layout::JhuNations => &triple.nation,
            _ => &triple.state,
        };
        let table = self.read_spray(&snapshot, key)?.ok_or_else(no_data)?;

        let points = match self.kind.layout() {
            Layout::CtpStates | Layout::NytStates => self.long_points(&table, series_name, None)?,
            Layout::NytCounties => {
                self.long_points(&table, series_name, Some(triple.county.as_str()))?
            }
            Layout::JhuCounties => {
                let county_col = self.require(&table, K8_COUNTY)?;
                let rows: Vec<&Vec<String>> = match triple.county() {
                    Some(county) => table.rows.iter().filter(|r| r[county_col] == county).collect(),
                    None => table.rows.iter().collect(),
                };
                self.wide_points(&table, &rows)?
            }
            Layout::JhuNations => {
                let region_col = self.require(&table, K8_STATE)?;
                let region = triple.state().unwrap_or(EMPTY);
                let mut rows: Vec<&Vec<String>> =
                    table.rows.iter().filter(|r| r[region_col] == region).collect();
                if rows.is_empty() && region.is_empty() {
                    rows = table.rows.iter().collect();
                }
                self.wide_points(&table, &rows)?
            }
        };
        if points.is_empty() {
            return Err(no_data());
        }
        debug!(
            "{}: {} points of {} for {}",
            self.dir_name,
            points.len(),
            series_name,
            triple
        );
        Ok(Some(TimeSeries::new(series_name, triple.label(), points)))
    }

    fn read_spray(&self, snapshot: &Snapshot, key: &str) -> Result<Option<Table>> {
        let path = match snapshot.spray_path(key) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Table::from_csv(&bytes)
            .map(Some)
            .map_err(|e| self.malformed(format!("{}: {}", path.display(), e)))
    }

    fn long_points(
        &self,
        table: &Table,
        series_name: &str,
        county: Option<&str>,
    ) -> Result<Vec<DataPoint>> {
        let date_field = self.kind.date_field().unwrap_or("date");
        let date_col = self.require(table, date_field)?;
        let value_col = self.require(table, series_name)?;
        let county_col = match county {
            Some(_) => Some(self.require(table, K8_COUNTY)?),
            None => None,
        };
        let mut points = Vec::new();
        for row in &table.rows {
            if let (Some(col), Some(county)) = (county_col, county) {
                if row[col] != county {
                    continue;
                }
            }
            let date = parse_any_date(&row[date_col])
                .ok_or_else(|| self.malformed(format!("bad date {:?}", row[date_col])))?;
            points.push(DataPoint {
                date,
                value: parse_value(&row[value_col]),
            });
        }
        Ok(points)
    }

    /// Sum `rows` column by column from the first date column onward.
    fn wide_points(&self, table: &Table, rows: &[&Vec<String>]) -> Result<Vec<DataPoint>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let first = table
            .first_date_column()
            .ok_or_else(|| self.malformed("no date columns"))?;
        let mut sums: BTreeMap<NaiveDate, Option<f64>> = BTreeMap::new();
        for (col, header) in table.headers.iter().enumerate().skip(first) {
            let date = parse_any_date(header)
                .ok_or_else(|| self.malformed(format!("bad date column {:?}", header)))?;
            let total = rows
                .iter()
                .filter_map(|row| parse_value(&row[col]))
                .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v));
            sums.insert(date, total);
        }
        Ok(sums
            .into_iter()
            .map(|(date, value)| DataPoint { date, value })
            .collect())
    }
}

fn parse_value(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
