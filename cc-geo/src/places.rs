//! The place-request encoding shared by the plot builder and its callers.
//!
//! `xyz.json@cases_NYT@USA~New Hampshire~@USA~Texas~Bexar@USA~Louisiana~`
//!
//! The output path, the series name and every triple are joined with `@`;
//! the components of one triple are joined with `~`.

use crate::{
    error::{GeoError, Result},
    triple::GeoTriple,
};

/// Separator between the components of one triple.
pub const PLACE_SEP1: char = '~';

/// Separator between path, series and triples.
pub const PLACE_SEP2: char = '@';

/// A decoded figure request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceRequest {
    pub path: String,
    pub series_name: String,
    pub places: Vec<GeoTriple>,
}

fn check_component(component: &str) -> Result<()> {
    if component.contains(PLACE_SEP1) || component.contains(PLACE_SEP2) {
        return Err(GeoError::PlaceDecode(format!(
            "component {:?} contains a separator",
            component
        )));
    }
    Ok(())
}

/// Encode one triple as `nation~state~county`.
pub fn encode_place(triple: &GeoTriple) -> Result<String> {
    for component in triple.components() {
        check_component(component)?;
    }
    Ok(triple.components().join(&PLACE_SEP1.to_string()))
}

/// Decode one `nation~state~county` string.
pub fn decode_place(s: &str) -> Result<GeoTriple> {
    let parts = s.split(PLACE_SEP1).collect::<Vec<_>>();
    match parts.as_slice() {
        [nation, state, county] => Ok(GeoTriple::new(nation, state, county)),
        _ => Err(GeoError::PlaceArity {
            place: s.to_string(),
            found: parts.len(),
        }),
    }
}

/// Encode a figure request. Fails if any field contains a separator, since
/// such a request could not be decoded back to the same value.
pub fn encode_places(path: &str, series_name: &str, places: &[GeoTriple]) -> Result<String> {
    check_component(path)?;
    check_component(series_name)?;
    let encoded = places
        .iter()
        .map(encode_place)
        .collect::<Result<Vec<_>>>()?;
    let sep = PLACE_SEP2.to_string();
    Ok([path.to_string(), series_name.to_string(), encoded.join(&sep)].join(&sep))
}

/// Decode a figure request produced by [`encode_places`].
pub fn decode_places(s: &str) -> Result<PlaceRequest> {
    let mut parts = s.splitn(3, PLACE_SEP2);
    let (Some(path), Some(series_name), Some(rest)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(GeoError::PlaceDecode(s.to_string()));
    };
    let places = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(PLACE_SEP2)
            .map(decode_place)
            .collect::<Result<Vec<_>>>()?
    };
    Ok(PlaceRequest {
        path: path.to_string(),
        series_name: series_name.to_string(),
        places,
    })
}

impl PlaceRequest {
    pub fn encode(&self) -> Result<String> {
        encode_places(&self.path, &self.series_name, &self.places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_triples() {
        let places = vec![
            GeoTriple::new("USA", "Texas", "Bexar"),
            GeoTriple::new("USA", "Louisiana", ""),
        ];
        let encoded = encode_places("static/x.json", "cases_NYT", &places).unwrap();
        assert_eq!(
            encoded,
            "static/x.json@cases_NYT@USA~Texas~Bexar@USA~Louisiana~"
        );
        let decoded = decode_places(&encoded).unwrap();
        assert_eq!(decoded.path, "static/x.json");
        assert_eq!(decoded.series_name, "cases_NYT");
        assert_eq!(decoded.places, places);
    }

    #[test]
    fn test_decodes_request_with_empty_path() {
        let decoded =
            decode_places("@cases_NYT@USA~New Hampshire~@USA~New Hampshire~Grafton").unwrap();
        assert_eq!(decoded.path, "");
        assert_eq!(decoded.places.len(), 2);
        assert_eq!(decoded.places[1].county(), Some("Grafton"));
    }

    #[test]
    fn test_empty_place_list_round_trips() {
        let encoded = encode_places("p", "cases_JHU", &[]).unwrap();
        assert_eq!(decode_places(&encoded).unwrap().places, vec![]);
    }

    #[test]
    fn test_rejects_wrong_arity() {
        assert!(matches!(
            decode_places("p@cases_NYT@USA~Texas"),
            Err(GeoError::PlaceArity { found: 2, .. })
        ));
        assert!(decode_places("just-a-path").is_err());
    }

    #[test]
    fn test_rejects_separator_in_component() {
        let places = vec![GeoTriple::new("USA", "Tex~as", "")];
        assert!(encode_places("p", "cases_NYT", &places).is_err());
    }
}
