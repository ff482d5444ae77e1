//! Core data model for eye-tracking datasets.
//!
//! A `Dataset` maps every stimulus image to its `ImageData`, which owns the
//! scanpaths recorded on that image. Points live inside their scanpath and
//! are addressed from the outside by a `PointRef` (path index + point index),
//! so AOIs can reference points without owning them.

use crate::id::{ColorTag, ImageId, PersonId};
use crate::scanpath::ScanPath;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Categorical palette for AOIs and graph nodes, assigned by insertion order.
pub const AOI_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Default attention-map color: opaque red.
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let channel = |i: usize| -> Option<f32> {
            let v = hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?;
            Some(v as f32 / 255.0)
        };

        match bytes.len() {
            6 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, 1.0)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Build from 0–255 channels and a 0.0–1.0 alpha, as the color sliders report them.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a.clamp(0.0, 1.0),
        )
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let to8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (to8(self.r), to8(self.g), to8(self.b), to8(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    /// Palette color for the AOI at `position` in insertion order.
    pub fn palette(position: usize) -> Self {
        let hex = AOI_PALETTE[position % AOI_PALETTE.len()];
        Self::from_hex(hex).unwrap_or(Self::RED)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::RED
    }
}

// ─── Points ──────────────────────────────────────────────────────────────

/// A single recorded fixation. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    /// Timestamp in milliseconds since the start of the recording.
    pub time: f64,
    /// Fixation duration in milliseconds.
    pub duration: f32,
    pub fixation_index: u32,
}

impl Point {
    pub fn new(x: f32, y: f32, time: f64) -> Self {
        Self {
            x,
            y,
            time,
            duration: 0.0,
            fixation_index: 0,
        }
    }
}

/// Index of a scanpath within its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(pub u32);

/// Non-owning handle to a point: which scanpath, and where in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointRef {
    pub path: PathId,
    pub index: u32,
}

impl PointRef {
    pub const fn new(path: PathId, index: u32) -> Self {
        Self { path, index }
    }
}

/// Natural pixel size of a stimulus image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: f32,
    pub height: f32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 1650.0,
            height: 1200.0,
        }
    }
}

impl ImageSize {
    /// Longest edge accepted for an image.
    pub const MAX_EDGE: f32 = 16_384.0;

    /// Replace non-finite or negative edges with the default size and cap
    /// the rest at `MAX_EDGE`. Sizes reported by a front end go through here.
    pub fn sanitized(self) -> Self {
        let fallback = Self::default();
        let edge = |v: f32, fallback: f32| {
            if v.is_finite() && v >= 0.0 {
                v.min(Self::MAX_EDGE)
            } else {
                fallback
            }
        };
        Self {
            width: edge(self.width, fallback.width),
            height: edge(self.height, fallback.height),
        }
    }
}

// ─── Users filter ────────────────────────────────────────────────────────

/// The set of persons currently included in the visualizations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    persons: HashSet<PersonId>,
}

impl UserFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter that includes every person appearing in the dataset.
    pub fn all(dataset: &Dataset) -> Self {
        dataset.persons().into_iter().collect()
    }

    pub fn contains(&self, person: PersonId) -> bool {
        self.persons.contains(&person)
    }

    pub fn insert(&mut self, person: PersonId) -> bool {
        self.persons.insert(person)
    }

    pub fn remove(&mut self, person: PersonId) -> bool {
        self.persons.remove(&person)
    }

    pub fn clear(&mut self) {
        self.persons.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    /// Persons in the filter, sorted by name.
    pub fn sorted(&self) -> Vec<PersonId> {
        let mut persons: Vec<PersonId> = self.persons.iter().copied().collect();
        persons.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        persons
    }
}

impl FromIterator<PersonId> for UserFilter {
    fn from_iter<T: IntoIterator<Item = PersonId>>(iter: T) -> Self {
        Self {
            persons: iter.into_iter().collect(),
        }
    }
}

// ─── Image data ──────────────────────────────────────────────────────────

/// All scanpaths recorded on one stimulus image.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub image: ImageId,
    scanpaths: Vec<ScanPath>,
}

impl ImageData {
    pub fn new(image: ImageId, scanpaths: Vec<ScanPath>) -> Self {
        Self { image, scanpaths }
    }

    pub fn scan_paths(&self) -> &[ScanPath] {
        &self.scanpaths
    }

    pub fn scan_path(&self, id: PathId) -> Option<&ScanPath> {
        self.scanpaths.get(id.0 as usize)
    }

    /// Scanpaths of `person` recorded under the viewing condition `color`.
    pub fn scan_paths_for(
        &self,
        person: PersonId,
        color: ColorTag,
    ) -> impl Iterator<Item = (PathId, &ScanPath)> {
        self.scanpaths
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.person == person && p.color == color)
            .map(|(i, p)| (PathId(i as u32), p))
    }

    /// Resolve a point handle. `None` when the handle dangles.
    pub fn resolve(&self, point: PointRef) -> Option<(&ScanPath, &Point)> {
        let path = self.scan_path(point.path)?;
        let p = path.points().get(point.index as usize)?;
        Some((path, p))
    }

    /// Every point on this image, path by path.
    pub fn points(&self) -> impl Iterator<Item = (PointRef, &Point)> {
        self.scanpaths.iter().enumerate().flat_map(|(pi, path)| {
            path.points()
                .iter()
                .enumerate()
                .map(move |(i, p)| (PointRef::new(PathId(pi as u32), i as u32), p))
        })
    }

    /// The chronologically next point in the same scanpath.
    pub fn next_point(&self, point: PointRef) -> Option<PointRef> {
        let (path, p) = self.resolve(point)?;
        path.next_index(p.time)
            .map(|i| PointRef::new(point.path, i as u32))
    }

    pub fn point_count(&self) -> usize {
        self.scanpaths.iter().map(|p| p.len()).sum()
    }
}

// ─── Dataset ─────────────────────────────────────────────────────────────

/// A loaded eye-tracking dataset: image → scanpaths.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    images: HashMap<ImageId, ImageData>,
    /// Image ids sorted by name, for stable listings.
    order: Vec<ImageId>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the data of one image.
    pub fn insert(&mut self, data: ImageData) {
        let id = data.image;
        if self.images.insert(id, data).is_none() {
            let pos = self
                .order
                .partition_point(|other| other.as_str() < id.as_str());
            self.order.insert(pos, id);
        }
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageData> {
        self.images.get(&id)
    }

    pub fn images(&self) -> &[ImageId] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Every person with at least one scanpath, sorted by name.
    pub fn persons(&self) -> Vec<PersonId> {
        let mut persons: Vec<PersonId> = self
            .images
            .values()
            .flat_map(|d| d.scan_paths().iter().map(|p| p.person))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        persons.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        persons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageData {
        let p1 = ScanPath::new(
            PersonId::intern("p1"),
            ColorTag::intern("color"),
            vec![Point::new(10.0, 10.0, 0.0), Point::new(20.0, 20.0, 5.0)],
        )
        .unwrap();
        let p2 = ScanPath::new(
            PersonId::intern("p2"),
            ColorTag::intern("gray"),
            vec![Point::new(30.0, 30.0, 1.0)],
        )
        .unwrap();
        ImageData::new(ImageId::intern("01_Antwerpen_S1.jpg"), vec![p1, p2])
    }

    #[test]
    fn hex_roundtrip() {
        let c = Color::from_hex("#FF000080").unwrap();
        assert_eq!(c.to_hex(), "#FF000080");
        assert_eq!(Color::from_hex("1f77b4").unwrap().to_hex(), "#1F77B4");
        assert!(Color::from_hex("#abc").is_none());
    }

    #[test]
    fn palette_wraps_around() {
        assert_eq!(Color::palette(0), Color::palette(10));
        assert_ne!(Color::palette(0), Color::palette(1));
    }

    #[test]
    fn image_size_sanitized() {
        let default = ImageSize::default();
        let bad = ImageSize {
            width: f32::NAN,
            height: -3.0,
        };
        assert_eq!(bad.sanitized(), default);
        let huge = ImageSize {
            width: f32::INFINITY,
            height: 1e9,
        };
        assert_eq!(
            huge.sanitized(),
            ImageSize {
                width: default.width,
                height: ImageSize::MAX_EDGE,
            }
        );
        let fine = ImageSize {
            width: 640.0,
            height: 0.0,
        };
        assert_eq!(fine.sanitized(), fine);
    }

    #[test]
    fn resolve_and_next_point() {
        let data = sample();
        let first = PointRef::new(PathId(0), 0);
        let next = data.next_point(first).unwrap();
        assert_eq!(next, PointRef::new(PathId(0), 1));
        assert!(data.next_point(next).is_none());
        assert!(data.resolve(PointRef::new(PathId(5), 0)).is_none());
        assert_eq!(data.point_count(), 3);
    }

    #[test]
    fn scan_paths_for_matches_person_and_color() {
        let data = sample();
        let hits: Vec<PathId> = data
            .scan_paths_for(PersonId::intern("p2"), ColorTag::intern("gray"))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(hits, vec![PathId(1)]);
        assert_eq!(
            data.scan_paths_for(PersonId::intern("p2"), ColorTag::intern("color"))
                .count(),
            0
        );
    }

    #[test]
    fn dataset_lists_images_and_persons_sorted() {
        let mut ds = Dataset::new();
        ds.insert(ImageData::new(ImageId::intern("b.jpg"), vec![]));
        ds.insert(sample());
        ds.insert(ImageData::new(ImageId::intern("a.jpg"), vec![]));
        let names: Vec<&str> = ds.images().iter().map(|i| i.as_str()).collect();
        assert_eq!(names, vec!["01_Antwerpen_S1.jpg", "a.jpg", "b.jpg"]);
        let persons = ds.persons();
        let names: Vec<&str> = persons.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["p1", "p2"]);
        assert_eq!(UserFilter::all(&ds).len(), 2);
    }
}
