//! Session context: the shared state every view reads.
//!
//! The context owns the loaded dataset, the current image, the users filter,
//! the attention-map color, and the AOI registries of every image. Views
//! subscribe with `set_listener(view, key, callback)`; each setter bumps the
//! revision and calls the listeners registered for the changed key, handing
//! them an immutable `Snapshot` of the whole context.
//!
//! Listeners must not mutate the context. They record what changed (usually
//! by marking their view dirty) and the view re-derives on its next refresh.

use crate::error::{EditorError, Result};
use gv_core::{
    Aoi, AoiId, AoiRegistry, AoiStore, Color, CoreError, Dataset, ImageData, ImageId, ImageSize,
    PersonId, Region, UserFilter,
};

/// Properties a view can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Dataset,
    Image,
    Users,
    Color,
    /// The AOI registry of the current image.
    Aoi,
}

/// The view instances that subscribe to the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    AttentionMap,
    Editor,
    TransitionGraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: PropertyKey,
    /// Context revision after the change.
    pub revision: u64,
}

/// Read-only view of the context for the duration of one redraw.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub dataset: &'a Dataset,
    pub image: Option<ImageId>,
    pub image_size: ImageSize,
    pub users: &'a UserFilter,
    pub color: Color,
    /// AOIs of the current image, in insertion order.
    pub aois: &'a [Aoi],
    pub revision: u64,
}

impl<'a> Snapshot<'a> {
    /// Data of the current image. `Ok(None)` when no image is selected.
    pub fn image_data(&self) -> Result<Option<&'a ImageData>> {
        let Some(image) = self.image else {
            return Ok(None);
        };
        self.dataset
            .image(image)
            .map(Some)
            .ok_or_else(|| CoreError::UnknownImage(image).into())
    }
}

pub type Listener = Box<dyn FnMut(&ChangeEvent, &Snapshot<'_>)>;

pub struct SessionContext {
    dataset: Dataset,
    image: Option<ImageId>,
    image_size: ImageSize,
    users: UserFilter,
    color: Color,
    aois: AoiStore,
    listeners: Vec<(ViewKind, PropertyKey, Listener)>,
    revision: u64,
}

impl SessionContext {
    /// A context over `dataset` with every person selected and no image.
    pub fn new(dataset: Dataset) -> Self {
        let users = UserFilter::all(&dataset);
        Self {
            dataset,
            image: None,
            image_size: ImageSize::default(),
            users,
            color: Color::default(),
            aois: AoiStore::new(),
            listeners: Vec::new(),
            revision: 0,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            dataset: &self.dataset,
            image: self.image,
            image_size: self.image_size,
            users: &self.users,
            color: self.color,
            aois: self.image.map(|i| self.aois.list(i)).unwrap_or(&[]),
            revision: self.revision,
        }
    }

    // ─── Listeners ───────────────────────────────────────────────────────

    /// Subscribe `view` to changes of `key`, replacing an earlier callback
    /// for the same pair.
    pub fn set_listener(
        &mut self,
        view: ViewKind,
        key: PropertyKey,
        callback: impl FnMut(&ChangeEvent, &Snapshot<'_>) + 'static,
    ) {
        self.listeners.retain(|(v, k, _)| !(*v == view && *k == key));
        self.listeners.push((view, key, Box::new(callback)));
    }

    /// Drop every listener of a removed view.
    pub fn remove_listeners(&mut self, view: ViewKind) {
        self.listeners.retain(|(v, _, _)| *v != view);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&mut self, key: PropertyKey) {
        self.revision += 1;
        let event = ChangeEvent {
            key,
            revision: self.revision,
        };
        log::trace!("notify {key:?} at revision {}", self.revision);

        let snapshot = Snapshot {
            dataset: &self.dataset,
            image: self.image,
            image_size: self.image_size,
            users: &self.users,
            color: self.color,
            aois: self.image.map(|i| self.aois.list(i)).unwrap_or(&[]),
            revision: self.revision,
        };
        for (_, _, callback) in self.listeners.iter_mut().filter(|(_, k, _)| *k == key) {
            callback(&event, &snapshot);
        }
    }

    // ─── Properties ──────────────────────────────────────────────────────

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Swap in a new dataset. Resets the image, selects every person, and
    /// drops all AOIs, since their memberships point into the old data.
    pub fn load_dataset(&mut self, dataset: Dataset) {
        self.users = UserFilter::all(&dataset);
        self.dataset = dataset;
        self.image = None;
        self.aois = AoiStore::new();
        self.notify(PropertyKey::Dataset);
        self.notify(PropertyKey::Image);
        self.notify(PropertyKey::Users);
        self.notify(PropertyKey::Aoi);
    }

    pub fn image(&self) -> Option<ImageId> {
        self.image
    }

    /// Select the image every view shows. `None` deselects.
    pub fn set_image(&mut self, image: Option<ImageId>) -> Result<()> {
        if let Some(id) = image {
            if self.dataset.image(id).is_none() {
                log::warn!("rejected unknown image {id}");
                return Err(CoreError::UnknownImage(id).into());
            }
        }
        if self.image == image {
            return Ok(());
        }
        self.image = image;
        self.notify(PropertyKey::Image);
        self.notify(PropertyKey::Aoi);
        Ok(())
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    /// Natural size of the current image, as reported once it has loaded.
    /// Non-finite or negative edges fall back to the default size.
    pub fn set_image_size(&mut self, size: ImageSize) {
        let size = size.sanitized();
        if self.image_size != size {
            self.image_size = size;
            self.notify(PropertyKey::Image);
        }
    }

    pub fn users(&self) -> &UserFilter {
        &self.users
    }

    pub fn set_users(&mut self, users: UserFilter) {
        if self.users != users {
            self.users = users;
            self.notify(PropertyKey::Users);
        }
    }

    /// Include or exclude one person.
    pub fn toggle_user(&mut self, person: PersonId, included: bool) {
        let changed = if included {
            self.users.insert(person)
        } else {
            self.users.remove(person)
        };
        if changed {
            self.notify(PropertyKey::Users);
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        if self.color != color {
            self.color = color;
            self.notify(PropertyKey::Color);
        }
    }

    // ─── AOIs of the current image ───────────────────────────────────────

    fn current_image(&self) -> Result<ImageId> {
        self.image.ok_or(EditorError::NoImage)
    }

    pub fn list_aois(&self) -> &[Aoi] {
        self.image.map(|i| self.aois.list(i)).unwrap_or(&[])
    }

    pub fn aoi(&self, id: AoiId) -> Option<&Aoi> {
        self.list_aois().iter().find(|a| a.id == id)
    }

    /// Topmost AOI of the current image under `(x, y)`.
    pub fn aoi_at(&self, x: f32, y: f32) -> Option<AoiId> {
        let image = self.image?;
        self.aois.registry(image)?.aoi_at(x, y)
    }

    /// Registry of the current image, if it has one.
    pub fn current_registry(&self) -> Option<&AoiRegistry> {
        self.aois.registry(self.image?)
    }

    /// Owned copy of the current image's registry, for snapshots.
    pub fn registry(&self) -> Result<AoiRegistry> {
        let image = self.current_image()?;
        Ok(self
            .aois
            .registry(image)
            .cloned()
            .unwrap_or_else(|| AoiRegistry::new(image)))
    }

    pub fn create_aoi(&mut self, region: Region) -> Result<AoiId> {
        let image = self.current_image()?;
        let data = self
            .dataset
            .image(image)
            .ok_or(CoreError::UnknownImage(image))?;
        let id = self.aois.registry_mut(image).create(data, region)?.id;
        self.notify(PropertyKey::Aoi);
        Ok(id)
    }

    /// Remove one AOI, returning it with the position it occupied.
    pub fn delete_aoi(&mut self, id: AoiId) -> Result<(usize, Aoi)> {
        let image = self.current_image()?;
        let removed = self.aois.registry_mut(image).delete(id)?;
        self.notify(PropertyKey::Aoi);
        Ok(removed)
    }

    pub fn restore_aoi(&mut self, position: usize, aoi: Aoi) -> Result<()> {
        let image = self.current_image()?;
        self.aois.registry_mut(image).restore(position, aoi)?;
        self.notify(PropertyKey::Aoi);
        Ok(())
    }

    pub fn clear_aois(&mut self) -> Result<Vec<Aoi>> {
        let image = self.current_image()?;
        let removed = self.aois.clear_all(image);
        self.notify(PropertyKey::Aoi);
        Ok(removed)
    }

    /// Swap in a whole registry. Its image must exist in the dataset.
    pub fn replace_registry(&mut self, registry: AoiRegistry) -> Result<()> {
        if self.dataset.image(registry.image).is_none() {
            return Err(CoreError::UnknownImage(registry.image).into());
        }
        let touches_current = self.image == Some(registry.image);
        self.aois.replace(registry);
        if touches_current {
            self.notify(PropertyKey::Aoi);
        }
        Ok(())
    }
}
