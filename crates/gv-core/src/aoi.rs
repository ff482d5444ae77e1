//! Areas of interest and the per-image AOI registry.
//!
//! An AOI is a rectangle drawn over a stimulus image together with the set of
//! points that fell inside it when it was created. Membership is computed
//! eagerly at creation and never updated afterwards; points are static for a
//! loaded dataset.

use crate::error::{CoreError, Result};
use crate::id::{AoiId, ImageId};
use crate::model::{Color, ImageData, Point, PointRef};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};

// ─── Region ──────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in image pixel coordinates. `right > left` and
/// `bottom > top` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Region {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Result<Self> {
        let finite = [left, top, right, bottom].iter().all(|v| v.is_finite());
        if !finite || right <= left || bottom <= top {
            return Err(CoreError::InvalidRegion {
                left,
                top,
                right,
                bottom,
            });
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Build from two opposite corners given in any order.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Result<Self> {
        Self::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.left <= x && x <= self.right && self.top <= y && y <= self.bottom
    }

    pub fn includes_point(&self, point: &Point) -> bool {
        self.contains(point.x, point.y)
    }
}

// ─── AOI ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aoi {
    pub id: AoiId,
    pub region: Region,
    /// Points inside `region` at creation time. Non-owning.
    points: BTreeSet<PointRef>,
}

impl Aoi {
    /// Create an AOI and collect its members from every scanpath of `image`.
    pub fn new(id: AoiId, region: Region, image: &ImageData) -> Self {
        let points: BTreeSet<PointRef> = image
            .points()
            .filter(|(_, p)| region.includes_point(p))
            .map(|(r, _)| r)
            .collect();
        Self { id, region, points }
    }

    pub fn includes_point(&self, point: &Point) -> bool {
        self.region.includes_point(point)
    }

    /// Membership test against the points captured at creation.
    pub fn has_member(&self, point: PointRef) -> bool {
        self.points.contains(&point)
    }

    /// Members in `(path, index)` order.
    pub fn members(&self) -> impl Iterator<Item = PointRef> + '_ {
        self.points.iter().copied()
    }

    pub fn member_count(&self) -> usize {
        self.points.len()
    }

    /// Display label, e.g. `AOI2`.
    pub fn label(&self) -> String {
        self.id.to_string()
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

/// Ordered AOIs of one image. Insertion order drives palette assignment and
/// the dimension order of the transition matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoiRegistry {
    pub image: ImageId,
    aois: Vec<Aoi>,
}

impl AoiRegistry {
    pub fn new(image: ImageId) -> Self {
        Self {
            image,
            aois: Vec::new(),
        }
    }

    /// `max(existing ids) + 1`, or 1 for an empty registry.
    pub fn next_id(&self) -> AoiId {
        self.aois
            .iter()
            .map(|a| a.id)
            .max()
            .map_or(AoiId::FIRST, AoiId::next)
    }

    /// Register a new AOI over `region`, computing its membership from `image`.
    pub fn create(&mut self, image: &ImageData, region: Region) -> Result<&Aoi> {
        if image.image != self.image {
            return Err(CoreError::UnknownImage(image.image));
        }
        let aoi = Aoi::new(self.next_id(), region, image);
        log::debug!(
            "created {} on {} with {} member points",
            aoi.id,
            self.image,
            aoi.member_count()
        );
        self.aois.push(aoi);
        Ok(&self.aois[self.aois.len() - 1])
    }

    /// Remove one AOI. Remaining ids are left untouched.
    /// Returns the removed AOI together with the position it occupied.
    pub fn delete(&mut self, id: AoiId) -> Result<(usize, Aoi)> {
        let pos = self.position(id).ok_or(CoreError::UnknownAoi {
            image: self.image,
            id,
        })?;
        let aoi = self.aois.remove(pos);
        log::debug!("deleted {} from {}", id, self.image);
        Ok((pos, aoi))
    }

    /// Remove every AOI, returning them in insertion order.
    pub fn clear(&mut self) -> Vec<Aoi> {
        log::debug!("cleared {} AOIs from {}", self.aois.len(), self.image);
        std::mem::take(&mut self.aois)
    }

    /// Re-insert a previously removed AOI at `position` (clamped to the end).
    pub fn restore(&mut self, position: usize, aoi: Aoi) -> Result<()> {
        if self.position(aoi.id).is_some() {
            return Err(CoreError::DuplicateAoi {
                image: self.image,
                id: aoi.id,
            });
        }
        let pos = position.min(self.aois.len());
        self.aois.insert(pos, aoi);
        Ok(())
    }

    pub fn list(&self) -> &[Aoi] {
        &self.aois
    }

    pub fn get(&self, id: AoiId) -> Option<&Aoi> {
        self.aois.iter().find(|a| a.id == id)
    }

    pub fn position(&self, id: AoiId) -> Option<usize> {
        self.aois.iter().position(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.aois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aois.is_empty()
    }

    /// Topmost (most recently inserted) AOI whose rectangle contains `(x, y)`.
    pub fn aoi_at(&self, x: f32, y: f32) -> Option<AoiId> {
        self.aois
            .iter()
            .rev()
            .find(|a| a.region.contains(x, y))
            .map(|a| a.id)
    }

    /// Every AOI that has `point` as a member. Overlapping AOIs can share points.
    pub fn aois_containing(&self, point: PointRef) -> SmallVec<[AoiId; 2]> {
        self.aois
            .iter()
            .filter(|a| a.has_member(point))
            .map(|a| a.id)
            .collect()
    }

    /// Palette color of an AOI, derived from its position.
    pub fn color_of(&self, id: AoiId) -> Option<Color> {
        self.position(id).map(Color::palette)
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

/// All AOI registries of a session, keyed by image.
#[derive(Debug, Clone, Default)]
pub struct AoiStore {
    registries: HashMap<ImageId, AoiRegistry>,
}

impl AoiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self, image: ImageId) -> Option<&AoiRegistry> {
        self.registries.get(&image)
    }

    pub fn registry_mut(&mut self, image: ImageId) -> &mut AoiRegistry {
        self.registries
            .entry(image)
            .or_insert_with(|| AoiRegistry::new(image))
    }

    /// AOIs of `image` in insertion order; empty when none were drawn.
    pub fn list(&self, image: ImageId) -> &[Aoi] {
        self.registries
            .get(&image)
            .map(AoiRegistry::list)
            .unwrap_or(&[])
    }

    pub fn create_aoi(
        &mut self,
        image: &ImageData,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    ) -> Result<AoiId> {
        let region = Region::new(left, top, right, bottom)?;
        let registry = self.registry_mut(image.image);
        registry.create(image, region).map(|a| a.id)
    }

    pub fn delete_aoi(&mut self, image: ImageId, id: AoiId) -> Result<Aoi> {
        match self.registries.get_mut(&image) {
            Some(registry) => registry.delete(id).map(|(_, aoi)| aoi),
            None => Err(CoreError::UnknownAoi { image, id }),
        }
    }

    pub fn clear_all(&mut self, image: ImageId) -> Vec<Aoi> {
        self.registries
            .get_mut(&image)
            .map(AoiRegistry::clear)
            .unwrap_or_default()
    }

    /// Swap in a whole registry (snapshot restore).
    pub fn replace(&mut self, registry: AoiRegistry) {
        self.registries.insert(registry.image, registry);
    }
}
