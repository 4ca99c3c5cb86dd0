use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder meaning "not specified, aggregate at this level".
pub const EMPTY: &str = "";

/// Top-level key used by every US-only source.
pub const USA: &str = "USA";

/// A (nation, state, county) geography key.
///
/// Components are stored as given; [`GeoTriple::state`] and friends return
/// `None` for the empty placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeoTriple {
    pub nation: String,
    pub state: String,
    pub county: String,
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl GeoTriple {
    pub fn new(nation: &str, state: &str, county: &str) -> Self {
        GeoTriple {
            nation: nation.to_string(),
            state: state.to_string(),
            county: county.to_string(),
        }
    }

    pub fn nation(&self) -> Option<&str> {
        non_empty(&self.nation)
    }

    pub fn state(&self) -> Option<&str> {
        non_empty(&self.state)
    }

    pub fn county(&self) -> Option<&str> {
        non_empty(&self.county)
    }

    /// The most specific component, used as the label of a plotted geography.
    pub fn label(&self) -> &str {
        self.county()
            .or_else(|| self.state())
            .or_else(|| self.nation())
            .unwrap_or(EMPTY)
    }

    /// Human readable name, most specific first: `Bexar, Texas, USA`.
    pub fn display_name(&self) -> String {
        [self.county(), self.state(), self.nation()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn components(&self) -> [&str; 3] {
        [&self.nation, &self.state, &self.county]
    }
}

impl fmt::Display for GeoTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.nation, self.state, self.county)
    }
}

impl From<(&str, &str, &str)> for GeoTriple {
    fn from((nation, state, county): (&str, &str, &str)) -> Self {
        GeoTriple::new(nation, state, county)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_components_read_as_none() {
        let triple = GeoTriple::new("USA", "Louisiana", "");
        assert_eq!(triple.nation(), Some("USA"));
        assert_eq!(triple.state(), Some("Louisiana"));
        assert_eq!(triple.county(), None);
        assert_eq!(triple.label(), "Louisiana");
    }

    #[test]
    fn test_display_name_is_most_specific_first() {
        let triple: GeoTriple = ("USA", "Texas", "Bexar").into();
        assert_eq!(triple.display_name(), "Bexar, Texas, USA");
        assert_eq!(GeoTriple::new("Brazil", "", "").display_name(), "Brazil");
    }
}
