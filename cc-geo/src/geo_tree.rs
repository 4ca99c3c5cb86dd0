//! Coverage tree: nation -> state -> counties.

use crate::{error::Result, triple::GeoTriple, EMPTY};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which nations, states and counties a source (or a merged series) covers.
///
/// A state whose only county is [`EMPTY`] is covered at state level only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoTree(pub BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl GeoTree {
    pub fn new() -> Self {
        GeoTree(BTreeMap::new())
    }

    /// Record `counties` under `nation`/`state`, appending to any existing list.
    pub fn insert(&mut self, nation: &str, state: &str, counties: Vec<String>) {
        self.0
            .entry(nation.to_string())
            .or_default()
            .entry(state.to_string())
            .or_default()
            .extend(counties);
    }

    /// Record a state (or region) that has no county breakdown.
    pub fn insert_state(&mut self, nation: &str, state: &str) {
        self.insert(nation, state, vec![EMPTY.to_string()]);
    }

    /// Merge `other` into `self`.
    ///
    /// Keys are unioned. When both sides carry a county list for the same
    /// state and the lists differ, they are concatenated without removing
    /// duplicates, so callers must tolerate repeated entries.
    pub fn merge(&mut self, other: GeoTree) {
        for (nation, other_states) in other.0 {
            let states = self.0.entry(nation).or_default();
            for (state, other_counties) in other_states {
                match states.get_mut(&state) {
                    Some(counties) if *counties == other_counties => {}
                    Some(counties) => {
                        debug!("geo tree leaf conflict at {}, concatenating", state);
                        counties.extend(other_counties);
                    }
                    None => {
                        states.insert(state, other_counties);
                    }
                }
            }
        }
    }

    /// Merge every tree in order, starting from an empty tree.
    pub fn merge_all(trees: impl IntoIterator<Item = GeoTree>) -> GeoTree {
        trees.into_iter().fold(GeoTree::new(), |mut acc, tree| {
            acc.merge(tree);
            acc
        })
    }

    pub fn nations(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn states(&self, nation: &str) -> Vec<&str> {
        self.0
            .get(nation)
            .map(|states| states.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn counties(&self, nation: &str, state: &str) -> Option<&[String]> {
        self.0
            .get(nation)
            .and_then(|states| states.get(state))
            .map(Vec::as_slice)
    }

    /// Whether the tree lists the given triple. An empty state means the nation
    /// itself, an empty county the state itself.
    pub fn contains(&self, triple: &GeoTriple) -> bool {
        let Some(states) = self.0.get(&triple.nation) else {
            return false;
        };
        match (triple.state(), triple.county()) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some(state), None) => states.contains_key(state),
            (Some(state), Some(county)) => states
                .get(state)
                .map(|counties| counties.iter().any(|c| c == county))
                .unwrap_or(false),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<GeoTree> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn tree(nation: &str, state: &str, counties: &[&str]) -> GeoTree {
        let mut t = GeoTree::new();
        t.insert(
            nation,
            state,
            counties.iter().map(|c| c.to_string()).collect(),
        );
        t
    }

    #[test]
    fn test_merge_concatenates_county_lists() {
        let mut a = tree("USA", "TX", &["Bexar"]);
        a.merge(tree("USA", "TX", &["Harris"]));
        assert_eq!(a, tree("USA", "TX", &["Bexar", "Harris"]));
    }

    #[test]
    fn test_merge_order_keeps_key_set() {
        let mut ab = tree("USA", "TX", &["Bexar"]);
        ab.merge(tree("USA", "LA", &["Orleans"]));
        let mut ba = tree("USA", "LA", &["Orleans"]);
        ba.merge(tree("USA", "TX", &["Bexar"]));

        let keys = |t: &GeoTree| {
            t.0.iter()
                .flat_map(|(n, states)| states.keys().map(move |s| (n.clone(), s.clone())))
                .collect::<BTreeSet<_>>()
        };
        assert_eq!(keys(&ab), keys(&ba));
    }

    #[test]
    fn test_merge_keeps_repeated_entries() {
        let mut a = tree("USA", "TX", &["Bexar", "Harris"]);
        a.merge(tree("USA", "TX", &["Harris"]));
        assert_eq!(
            a.counties("USA", "TX").unwrap(),
            &["Bexar".to_string(), "Harris".to_string(), "Harris".to_string()]
        );
    }

    #[test]
    fn test_merge_identical_leaves_is_noop() {
        let mut a = tree("USA", "TX", &["Bexar"]);
        a.merge(tree("USA", "TX", &["Bexar"]));
        assert_eq!(a, tree("USA", "TX", &["Bexar"]));
    }

    #[test]
    fn test_contains_respects_rollup_levels() {
        let mut t = tree("USA", "Texas", &["Bexar"]);
        t.insert_state("Brazil", "");
        assert!(t.contains(&GeoTriple::new("USA", "", "")));
        assert!(t.contains(&GeoTriple::new("USA", "Texas", "")));
        assert!(t.contains(&GeoTriple::new("USA", "Texas", "Bexar")));
        assert!(!t.contains(&GeoTriple::new("USA", "Texas", "Harris")));
        assert!(!t.contains(&GeoTriple::new("Canada", "", "")));
        assert!(t.contains(&GeoTriple::new("Brazil", "", "")));
    }

    #[test]
    fn test_json_shape_is_nested_maps() {
        let t = tree("USA", "TX", &["Bexar"]);
        let json = t.to_json().unwrap();
        assert_eq!(json, r#"{"USA":{"TX":["Bexar"]}}"#);
        assert_eq!(GeoTree::from_json(&json).unwrap(), t);
    }
}
