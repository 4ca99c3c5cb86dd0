//! Expansion of structured batch documents into place lists.
//!
//! A batch document is a YAML list of channels, each mapping a series name to
//! arbitrarily nested geography groupings:
//!
//! ```yaml
//! - cases_NYT:
//!     USA:
//!       Texas: [Bexar, Harris]
//!       Louisiana: ""
//!       New Hampshire:
//! - cases_JHU: [Brazil, Italy]
//! ```
//!
//! Every string leaf becomes one triple, prefixed by the mapping keys above it
//! and padded with empty components. Empty values are skipped.

use crate::{
    error::{GeoError, Result},
    triple::GeoTriple,
    EMPTY,
};
use log::debug;
use serde_yaml::Value;

/// One channel of a batch document: a series and the places to plot for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchChannel {
    pub series_name: String,
    pub places: Vec<GeoTriple>,
}

fn key_string(key: &Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        other => Err(GeoError::BatchItem(format!("{:?}", other))),
    }
}

fn is_empty_item(item: &Value) -> bool {
    match item {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        _ => false,
    }
}

fn expand(places: &mut Vec<GeoTriple>, prefixes: &[String], item: &Value) -> Result<()> {
    if is_empty_item(item) {
        return Ok(());
    }
    match item {
        Value::Sequence(seq) => {
            for element in seq {
                expand(places, prefixes, element)?;
            }
        }
        Value::Mapping(map) => {
            for (geo, sub_item) in map {
                let mut nested = prefixes.to_vec();
                nested.push(key_string(geo)?);
                expand(places, &nested, sub_item)?;
            }
        }
        Value::String(s) => {
            let mut parts = prefixes.to_vec();
            parts.push(s.clone());
            if parts.len() > 3 {
                return Err(GeoError::BatchItem(format!(
                    "geography nested deeper than nation/state/county: {}",
                    parts.join(" / ")
                )));
            }
            parts.resize(3, EMPTY.to_string());
            places.push(GeoTriple::new(&parts[0], &parts[1], &parts[2]));
        }
        other => return Err(GeoError::BatchItem(format!("{:?}", other))),
    }
    Ok(())
}

/// Expand a parsed batch value.
pub fn expand_channels(doc: &Value) -> Result<Vec<BatchChannel>> {
    let channel_maps: Vec<&Value> = match doc {
        Value::Sequence(seq) => seq.iter().collect(),
        Value::Mapping(_) => vec![doc],
        other => return Err(GeoError::BatchItem(format!("{:?}", other))),
    };
    let mut channels = Vec::new();
    for channel_map in channel_maps {
        let Value::Mapping(map) = channel_map else {
            return Err(GeoError::BatchItem(format!("{:?}", channel_map)));
        };
        for (channel, sub_list) in map {
            let series_name = key_string(channel)?;
            let mut places = Vec::new();
            expand(&mut places, &[], sub_list)?;
            debug!("batch channel {} expands to {} places", series_name, places.len());
            channels.push(BatchChannel {
                series_name,
                places,
            });
        }
    }
    Ok(channels)
}

/// Parse and expand a batch document.
pub fn expand_batch(yaml: &str) -> Result<Vec<BatchChannel>> {
    let doc: Value = serde_yaml::from_str(yaml)?;
    expand_channels(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
- cases_NYT:
    USA:
      Texas: [Bexar, Harris]
      Louisiana: ""
      New Hampshire:
        - ""
        - Grafton
- cases_JHU: [Brazil, Italy]
"#;

    #[test]
    fn test_expands_nested_groupings() {
        let channels = expand_batch(DOC).unwrap();
        assert_eq!(channels.len(), 2);

        let nyt = &channels[0];
        assert_eq!(nyt.series_name, "cases_NYT");
        assert_eq!(
            nyt.places,
            vec![
                GeoTriple::new("USA", "Texas", "Bexar"),
                GeoTriple::new("USA", "Texas", "Harris"),
                GeoTriple::new("USA", "New Hampshire", "Grafton"),
            ]
        );

        let jhu = &channels[1];
        assert_eq!(
            jhu.places,
            vec![GeoTriple::new("Brazil", "", ""), GeoTriple::new("Italy", "", "")]
        );
    }

    #[test]
    fn test_state_leaf_pads_county() {
        let channels = expand_batch("- deaths_NYT:\n    USA: [Louisiana]\n").unwrap();
        assert_eq!(channels[0].places, vec![GeoTriple::new("USA", "Louisiana", "")]);
    }

    #[test]
    fn test_rejects_numeric_leaf() {
        let err = expand_batch("- cases_NYT:\n    USA: [42]\n").unwrap_err();
        assert!(matches!(err, GeoError::BatchItem(_)));
    }

    #[test]
    fn test_rejects_too_deep_nesting() {
        let doc = "- cases_NYT:\n    USA:\n      Texas:\n        Bexar: [Downtown]\n";
        assert!(matches!(expand_batch(doc), Err(GeoError::BatchItem(_))));
    }

    #[test]
    fn test_rejects_invalid_yaml() {
        assert!(matches!(
            expand_batch("- cases_NYT: [unclosed"),
            Err(GeoError::BatchParse(_))
        ));
    }
}
