//! Track parsing contract and the default GPX implementation.

use crate::coord::TrackPoint;
use gpx::read;
use std::io::Cursor;
use thiserror::Error;

/// Errors that can occur while parsing an uploaded track file.
///
/// Parse failures are not retried; the job that issued the parse goes
/// straight to `Failed`.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document could not be read as GPX XML
    #[error("malformed track file: {0}")]
    Malformed(String),

    /// The document parsed but contained no usable track points
    #[error("no track points found")]
    NoTrackPoints,
}

/// A parsed track: ordered coordinates plus the optional track name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTrack {
    /// Track name from the document, if present
    pub name: Option<String>,
    /// Track points in document order
    pub points: Vec<TrackPoint>,
}

/// Trait for turning raw uploaded bytes into an ordered coordinate
/// sequence.
///
/// The pipeline owns no file-format knowledge; it asks the parser and
/// treats any failure as a failed job.
pub trait TrackParser: Send + Sync {
    /// Parses raw track bytes.
    fn parse(&self, raw: &[u8]) -> Result<ParsedTrack, ParseError>;
}

/// GPX parser over the `gpx` crate.
///
/// Walks every segment of every track in document order. Points with
/// out-of-range coordinates are skipped rather than failing the whole
/// file; GPS units occasionally emit garbage fixes.
#[derive(Debug, Default, Clone)]
pub struct GpxTrackParser;

impl GpxTrackParser {
    pub fn new() -> Self {
        Self
    }
}

impl TrackParser for GpxTrackParser {
    fn parse(&self, raw: &[u8]) -> Result<ParsedTrack, ParseError> {
        let document = read(Cursor::new(raw)).map_err(|e| ParseError::Malformed(e.to_string()))?;

        let name = document
            .tracks
            .iter()
            .find_map(|track| track.name.clone())
            .or_else(|| document.metadata.as_ref().and_then(|m| m.name.clone()));

        let mut points = Vec::new();
        for track in &document.tracks {
            for track_segment in &track.segments {
                for waypoint in &track_segment.points {
                    let position = waypoint.point();
                    match TrackPoint::new(position.x(), position.y()) {
                        Ok(point) => points.push(point),
                        Err(err) => {
                            tracing::debug!("skipping out-of-range track point: {}", err);
                        }
                    }
                }
            }
        }

        if points.is_empty() {
            return Err(ParseError::NoTrackPoints);
        }

        Ok(ParsedTrack { name, points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpx_document(name: Option<&str>, points: &[(f64, f64)]) -> Vec<u8> {
        let mut doc = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <gpx version=\"1.1\" creator=\"tracksurface-tests\" \
             xmlns=\"http://www.topografix.com/GPX/1/1\">\n<trk>",
        );
        if let Some(name) = name {
            doc.push_str(&format!("<name>{}</name>", name));
        }
        doc.push_str("<trkseg>");
        for (lon, lat) in points {
            doc.push_str(&format!("<trkpt lat=\"{}\" lon=\"{}\"></trkpt>", lat, lon));
        }
        doc.push_str("</trkseg></trk></gpx>");
        doc.into_bytes()
    }

    #[test]
    fn test_parse_points_in_document_order() {
        let raw = gpx_document(None, &[(147.0, -42.0), (147.1, -42.1), (147.2, -42.2)]);
        let parsed = GpxTrackParser::new().parse(&raw).unwrap();

        assert_eq!(parsed.points.len(), 3);
        assert_eq!(parsed.points[0], TrackPoint::new(147.0, -42.0).unwrap());
        assert_eq!(parsed.points[2], TrackPoint::new(147.2, -42.2).unwrap());
    }

    #[test]
    fn test_parse_extracts_track_name() {
        let raw = gpx_document(Some("Kunanyi loop"), &[(147.0, -42.0)]);
        let parsed = GpxTrackParser::new().parse(&raw).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Kunanyi loop"));
    }

    #[test]
    fn test_parse_missing_name_is_none() {
        let raw = gpx_document(None, &[(147.0, -42.0)]);
        let parsed = GpxTrackParser::new().parse(&raw).unwrap();
        assert!(parsed.name.is_none());
    }

    #[test]
    fn test_parse_malformed_xml() {
        let result = GpxTrackParser::new().parse(b"this is not xml");
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_parse_empty_track() {
        let raw = gpx_document(None, &[]);
        let result = GpxTrackParser::new().parse(&raw);
        assert!(matches!(result, Err(ParseError::NoTrackPoints)));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::Malformed("unexpected end of stream".to_string());
        assert!(err.to_string().contains("malformed track file"));
        assert_eq!(ParseError::NoTrackPoints.to_string(), "no track points found");
    }
}
