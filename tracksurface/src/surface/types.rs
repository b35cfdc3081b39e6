//! Surface classification labels.

use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete classification of the ground material at a coordinate.
///
/// The variants mirror the labels returned by the geospatial lookup
/// provider. Labels outside the modeled set are preserved verbatim in
/// `Other` rather than treated as an error — a provider returning a label
/// we have never seen is a normal outcome, not a failure.
///
/// Serializes as the plain label string (`"gravel"`, `"fine_gravel"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurfaceType {
    Paved,
    Unpaved,
    Dirt,
    Gravel,
    FineGravel,
    Path,
    Track,
    Service,
    Unknown,
    /// Any provider label outside the modeled set.
    Other(String),
}

impl SurfaceType {
    /// Parses a provider label into a surface type.
    ///
    /// Unrecognized labels map to `Other`; an empty label maps to
    /// `Unknown` (providers report missing data as an absent label).
    pub fn from_label(label: &str) -> Self {
        match label {
            "paved" => Self::Paved,
            "unpaved" => Self::Unpaved,
            "dirt" => Self::Dirt,
            "gravel" => Self::Gravel,
            "fine_gravel" => Self::FineGravel,
            "path" => Self::Path,
            "track" => Self::Track,
            "service" => Self::Service,
            "unknown" | "" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the label string for this surface type.
    pub fn as_label(&self) -> &str {
        match self {
            Self::Paved => "paved",
            Self::Unpaved => "unpaved",
            Self::Dirt => "dirt",
            Self::Gravel => "gravel",
            Self::FineGravel => "fine_gravel",
            Self::Path => "path",
            Self::Track => "track",
            Self::Service => "service",
            Self::Unknown => "unknown",
            Self::Other(label) => label,
        }
    }

    /// Returns true if this surface counts as non-paved for segmentation.
    ///
    /// The non-paved set is `{unpaved, dirt, gravel, fine_gravel, path,
    /// track, service, unknown}`. Every other label, including ones we do
    /// not model, counts as paved.
    pub fn is_unpaved(&self) -> bool {
        matches!(
            self,
            Self::Unpaved
                | Self::Dirt
                | Self::Gravel
                | Self::FineGravel
                | Self::Path
                | Self::Track
                | Self::Service
                | Self::Unknown
        )
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl Serialize for SurfaceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_label())
    }
}

impl<'de> Deserialize<'de> for SurfaceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        if label.chars().any(|c| c.is_whitespace()) {
            return Err(D::Error::custom("surface label must not contain whitespace"));
        }
        Ok(Self::from_label(&label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_known_types() {
        assert_eq!(SurfaceType::from_label("paved"), SurfaceType::Paved);
        assert_eq!(SurfaceType::from_label("gravel"), SurfaceType::Gravel);
        assert_eq!(
            SurfaceType::from_label("fine_gravel"),
            SurfaceType::FineGravel
        );
        assert_eq!(SurfaceType::from_label("unknown"), SurfaceType::Unknown);
    }

    #[test]
    fn test_from_label_unmodeled_label() {
        assert_eq!(
            SurfaceType::from_label("cobblestone"),
            SurfaceType::Other("cobblestone".to_string())
        );
    }

    #[test]
    fn test_from_label_empty_is_unknown() {
        assert_eq!(SurfaceType::from_label(""), SurfaceType::Unknown);
    }

    #[test]
    fn test_label_round_trip() {
        for label in [
            "paved",
            "unpaved",
            "dirt",
            "gravel",
            "fine_gravel",
            "path",
            "track",
            "service",
            "unknown",
            "cobblestone",
        ] {
            assert_eq!(SurfaceType::from_label(label).as_label(), label);
        }
    }

    #[test]
    fn test_non_paved_set() {
        let non_paved = [
            SurfaceType::Unpaved,
            SurfaceType::Dirt,
            SurfaceType::Gravel,
            SurfaceType::FineGravel,
            SurfaceType::Path,
            SurfaceType::Track,
            SurfaceType::Service,
            SurfaceType::Unknown,
        ];
        for surface in &non_paved {
            assert!(surface.is_unpaved(), "{} should be non-paved", surface);
        }
        assert!(!SurfaceType::Paved.is_unpaved());
        assert!(!SurfaceType::Other("asphalt".to_string()).is_unpaved());
    }

    #[test]
    fn test_serialize_as_label_string() {
        let json = serde_json::to_string(&SurfaceType::FineGravel).unwrap();
        assert_eq!(json, "\"fine_gravel\"");
    }

    #[test]
    fn test_deserialize_from_label_string() {
        let surface: SurfaceType = serde_json::from_str("\"track\"").unwrap();
        assert_eq!(surface, SurfaceType::Track);
    }

    #[test]
    fn test_display_matches_label() {
        assert_eq!(format!("{}", SurfaceType::Dirt), "dirt");
    }
}
