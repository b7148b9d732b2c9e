//! Keeps shapes drawn on a map in step with a remote GeoJSON store.
//!
//! Lifecycle:
//! 1. On mount, every record in the store becomes a layer on the map, registered under its id.
//! 2. A freshly drawn shape is a draft until the store accepts it and hands back an id.
//!    Only then is it registered, so edits and deletes can be routed to the right record.
//! 3. Edits to registered layers replace the stored feature wholesale. Edits to drafts stay local.
//! 4. Deleting a registered layer removes the record first and the layer second. Drafts just vanish.
//!
//! Nothing is retried. Every failure goes back to the caller and to the user's notifications.

pub mod cancel;
pub mod controller;
#[cfg(feature = "http")]
pub mod http;
pub mod notify;
pub mod registry;
pub mod session;
pub mod store;
pub mod surface;

pub use controller::{SyncController, SyncError, SyncState};
#[cfg(feature = "http")]
pub use http::HttpStore;
pub use notify::{LogNotifier, Notification, NotificationType, Notifier};
pub use registry::LayerRegistry;
pub use session::{AppContext, Session};
pub use store::{GeoStore, StoreError};
pub use surface::{LayerKey, MapSurface, MapView, MemorySurface};
