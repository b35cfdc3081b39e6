//! Run segmentation: turns a per-point surface classification into a
//! compact list of contiguous unpaved sections.

use crate::coord::TrackPoint;
use crate::surface::SurfaceType;
use serde::{Deserialize, Serialize};

/// A maximal contiguous run of track points sharing a non-paved surface.
///
/// Indices are inclusive and refer to the original coordinate sequence.
/// By construction every point in the run carries the same label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnpavedSection {
    /// Index of the first point in the run
    pub start_index: usize,
    /// Index of the last point in the run (inclusive)
    pub end_index: usize,
    /// The points covered by the run
    pub coordinates: Vec<TrackPoint>,
    /// The label shared by all points in the run
    pub surface_type: SurfaceType,
}

impl UnpavedSection {
    fn open(index: usize, point: TrackPoint, surface: SurfaceType) -> Self {
        Self {
            start_index: index,
            end_index: index,
            coordinates: vec![point],
            surface_type: surface,
        }
    }

    fn extend(&mut self, index: usize, point: TrackPoint) {
        self.end_index = index;
        self.coordinates.push(point);
    }

    /// Number of points in the run.
    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// Always false: a section covers at least one point.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Segments a classified coordinate sequence into unpaved sections.
///
/// Single left-to-right scan, O(n): a section opens at the first
/// non-paved point, extends while the label stays the same, and closes
/// on a paved point, on a label change, or at the end of the sequence.
/// A change between two different non-paved labels therefore produces
/// two adjacent sections rather than one mixed run.
///
/// The returned sections are in ascending, non-overlapping index order,
/// and their indices are exactly the indices whose surface is in the
/// non-paved set.
///
/// # Panics
///
/// Panics if `points` and `surfaces` have different lengths. Mismatched
/// inputs are a programming error in the caller, not a recoverable
/// condition.
pub fn segment(points: &[TrackPoint], surfaces: &[SurfaceType]) -> Vec<UnpavedSection> {
    assert_eq!(
        points.len(),
        surfaces.len(),
        "segment() requires one surface classification per point ({} points, {} surfaces)",
        points.len(),
        surfaces.len(),
    );

    let mut sections = Vec::new();
    let mut open: Option<UnpavedSection> = None;

    for (index, (point, surface)) in points.iter().zip(surfaces).enumerate() {
        if surface.is_unpaved() {
            match open.as_mut() {
                Some(section) if section.surface_type == *surface => {
                    section.extend(index, *point);
                }
                Some(_) => {
                    // Label changed within non-paved ground: close and reopen.
                    if let Some(section) = open.take() {
                        sections.push(section);
                    }
                    open = Some(UnpavedSection::open(index, *point, surface.clone()));
                }
                None => {
                    open = Some(UnpavedSection::open(index, *point, surface.clone()));
                }
            }
        } else if let Some(section) = open.take() {
            sections.push(section);
        }
    }

    if let Some(section) = open {
        sections.push(section);
    }

    sections
}
