//! Orchestrates the shape lifecycle between the map surface and the store.
//!
//! Handlers take `&self` and run one at a time on a single-threaded event
//! loop. Mutable state sits in `RefCell`s; we never hold a borrow across an
//! `.await`, so a handler suspended on the network can't block another one
//! from touching the surface.

use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    rc::Rc,
};

use geo_utils::{
    DecodeError, ExportFile, ImportError, Layer, Record,
    codec::{ID_PROPERTY, from_feature, stamp_id, to_feature},
    export::parse_upload,
};

use crate::{
    cancel::CancelScope,
    notify::{LogNotifier, NotificationType, Notifier},
    registry::LayerRegistry,
    session::AppContext,
    store::{GeoStore, StoreError},
    surface::{ClickHandler, LayerKey, MapSurface},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading,
    Ready,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("could not decode shape")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("no layer {0:?} on the map")]
    UnknownLayer(LayerKey),

    #[error("not logged in")]
    LoggedOut,
}

pub struct SyncController<S, M, N = LogNotifier> {
    context: AppContext,
    store: S,
    surface: RefCell<M>,
    registry: RefCell<LayerRegistry>,
    state: Cell<SyncState>,
    notifier: N,
    cancel: CancelScope,
}

impl<S: GeoStore, M: MapSurface> SyncController<S, M, LogNotifier> {
    pub fn new(context: AppContext, store: S, surface: M) -> Self {
        Self::with_notifier(context, store, surface, LogNotifier)
    }
}

#[cfg(feature = "http")]
impl<M: MapSurface> SyncController<crate::http::HttpStore, M, LogNotifier> {
    /// A controller talking to the geodata service at `context.server_url`.
    pub fn connect(context: AppContext, surface: M) -> Self {
        let store = crate::http::HttpStore::new(context.server_url.as_str());
        Self::new(context, store, surface)
    }
}

impl<S: GeoStore, M: MapSurface, N: Notifier> SyncController<S, M, N> {
    pub fn with_notifier(context: AppContext, store: S, surface: M, notifier: N) -> Self {
        Self {
            context,
            store,
            surface: RefCell::new(surface),
            registry: RefCell::new(LayerRegistry::new()),
            state: Cell::new(SyncState::Idle),
            notifier,
            cancel: CancelScope::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state.get()
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn surface(&self) -> Ref<'_, M> {
        self.surface.borrow()
    }

    /// For the UI to add drafts and apply edits. Don't hold this across an `.await`.
    pub fn surface_mut(&self) -> RefMut<'_, M> {
        self.surface.borrow_mut()
    }

    pub fn registry(&self) -> Ref<'_, LayerRegistry> {
        self.registry.borrow()
    }

    pub fn in_flight(&self) -> usize {
        self.cancel.in_flight()
    }

    /// Initial load when the map appears.
    pub async fn mount(&self) -> Result<usize, SyncError> {
        self.refresh().await
    }

    /// Replace every registered layer with the store's current collection.
    ///
    /// Returns how many layers were registered. Records that fail to decode
    /// are skipped. On failure the controller is still `Ready`, with whatever
    /// was registered so far.
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        self.require_user()?;
        if self.state.get() == SyncState::Loading {
            log::warn!("Refresh requested while already loading; ignoring");
            return Ok(self.registry.borrow().len());
        }

        self.state.set(SyncState::Loading);
        self.registry
            .borrow_mut()
            .clear_all(&mut *self.surface.borrow_mut());

        let result = self.cancel.run(self.store.list_all()).await;
        let loaded = result.map(|records| self.hydrate(records));
        self.state.set(SyncState::Ready);

        match loaded {
            Ok(count) => {
                log::info!("Loaded {count} shape(s)");
                Ok(count)
            }
            Err(e) => {
                self.notifier.notify(NotificationType::LoadFailed.show(&e));
                Err(e.into())
            }
        }
    }

    fn hydrate(&self, records: Vec<Record>) -> usize {
        let mut surface = self.surface.borrow_mut();
        let mut registry = self.registry.borrow_mut();

        for record in records {
            let layer = record.feature().and_then(|feature| from_feature(&feature));
            let mut layer = match layer {
                Ok(layer) => layer,
                Err(e) => {
                    log::warn!("Skipping record {}: {e}", record.id);
                    continue;
                }
            };
            stamp_id(&mut layer, &record.id);
            let key = surface.add_layer(layer);
            registry.upsert(&mut *surface, record.id, key);
            surface.on_layer_click(key, download_action());
        }

        registry.fit_view_to(&mut *surface);
        registry.len()
    }

    /// The user finished drawing `key`. Persist it and register it under the
    /// id the store assigns.
    ///
    /// A layer already registered under its id is not created again. Any other
    /// id the layer carries is dropped before the create.
    ///
    /// If the store refuses, the layer stays on the map as an unregistered
    /// draft; it is up to the user to try again.
    pub async fn shape_drawn(&self, key: LayerKey) -> Result<String, SyncError> {
        self.require_user()?;
        let mut layer = self.layer(key)?;
        if let Some(id) = layer.id() {
            if self.registry.borrow().get(&id) == Some(key) {
                log::debug!("Layer {key:?} is already saved as {id}");
                return Ok(id);
            }
            // not ours: copied from another shape or an imported file
            log::debug!("Dropping stale id {id} from layer {key:?}");
            layer.properties.remove(ID_PROPERTY);
        }
        let feature = to_feature(&layer);

        let record = match self.cancel.run(self.store.create(&feature)).await {
            Ok(record) => record,
            Err(e) => {
                self.notifier.notify(NotificationType::SaveFailed.show(&e));
                return Err(e.into());
            }
        };

        {
            let mut surface = self.surface.borrow_mut();
            let Some(layer) = surface.layer_mut(key) else {
                // removed by the user while the create was in flight
                log::warn!("Layer for record {} vanished before registration", record.id);
                return Err(SyncError::UnknownLayer(key));
            };
            stamp_id(layer, &record.id);
            self.registry
                .borrow_mut()
                .upsert(&mut *surface, record.id.clone(), key);
            surface.on_layer_click(key, download_action());
        }

        self.notifier.notify(NotificationType::Saved.show(&record.id));
        Ok(record.id)
    }

    /// Push edited geometry for every persisted layer in `keys`. Drafts are
    /// local-only and skipped. Stops at the first failure.
    pub async fn shapes_edited(&self, keys: &[LayerKey]) -> Result<usize, SyncError> {
        self.require_user()?;
        let mut updated = 0;

        for &key in keys {
            let layer = self.layer(key)?;
            let Some(id) = layer.id() else {
                log::debug!("Edited draft {key:?} stays local");
                continue;
            };
            let feature = to_feature(&layer);

            if let Err(e) = self.cancel.run(self.store.update(&id, &feature)).await {
                self.notifier.notify(NotificationType::UpdateFailed.show(&e));
                return Err(e.into());
            }
            updated += 1;
        }

        Ok(updated)
    }

    /// Delete every layer in `keys`. Drafts go immediately; persisted layers go
    /// only once the store confirms. A failed delete leaves the layer where it
    /// is; the remaining keys are still processed and the first error returned.
    pub async fn shapes_deleted(&self, keys: &[LayerKey]) -> Result<usize, SyncError> {
        self.require_user()?;
        let mut deleted = 0;
        let mut first_error = None;

        for &key in keys {
            let id = match self.layer(key) {
                Ok(layer) => layer.id(),
                Err(e) => {
                    log::warn!("{e}");
                    continue;
                }
            };

            let Some(id) = id else {
                self.surface.borrow_mut().remove_layer(key);
                deleted += 1;
                continue;
            };

            match self.cancel.run(self.store.delete(&id)).await {
                Ok(()) => {
                    {
                        let mut surface = self.surface.borrow_mut();
                        let mut registry = self.registry.borrow_mut();
                        // the id may be routed to another layer carrying a copy of it
                        if registry.get(&id) == Some(key) {
                            registry.remove(&mut *surface, &id);
                        } else {
                            surface.remove_layer(key);
                        }
                    }
                    self.notifier.notify(NotificationType::Deleted.show(&id));
                    deleted += 1;
                }
                Err(e) => {
                    self.notifier.notify(NotificationType::DeleteFailed.show(&e));
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(deleted),
        }
    }

    /// Download a single layer, straight from the map without a round trip.
    pub fn export_layer(&self, key: LayerKey) -> Result<ExportFile, SyncError> {
        let surface = self.surface.borrow();
        let layer = surface.layer(key).ok_or(SyncError::UnknownLayer(key))?;
        Ok(feature_file(layer))
    }

    /// Every registered shape as one FeatureCollection.
    pub fn export_all(&self) -> ExportFile {
        let surface = self.surface.borrow();
        let features = self
            .registry
            .borrow()
            .iter()
            .filter_map(|(_, key)| surface.layer(key))
            .map(to_feature)
            .collect();
        ExportFile::collection(features)
    }

    /// Show an uploaded `.geojson`/`.kml` file on the map as-is. The upload is
    /// not validated, registered or persisted.
    pub fn import_file(&self, filename: &str, text: &str) -> Result<(), SyncError> {
        let data = parse_upload(filename, text)?;
        self.surface.borrow_mut().show_overlay(data);
        Ok(())
    }

    /// Abort every in-flight store call. The controller is unusable for
    /// store operations afterwards.
    pub fn teardown(&self) {
        self.cancel.cancel_all();
    }

    fn require_user(&self) -> Result<(), SyncError> {
        match self.context.session.user() {
            Some(_) => Ok(()),
            None => Err(SyncError::LoggedOut),
        }
    }

    // cloned so no borrow of the surface outlives the call
    fn layer(&self, key: LayerKey) -> Result<Layer, SyncError> {
        self.surface
            .borrow()
            .layer(key)
            .cloned()
            .ok_or(SyncError::UnknownLayer(key))
    }
}

impl<S, M, N> Drop for SyncController<S, M, N> {
    fn drop(&mut self) {
        self.cancel.cancel_all();
    }
}

fn feature_file(layer: &Layer) -> ExportFile {
    ExportFile::feature(&to_feature(layer), layer.id().as_deref())
}

fn download_action() -> ClickHandler {
    Rc::new(feature_file)
}
