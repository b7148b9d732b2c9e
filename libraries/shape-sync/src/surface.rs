//! The map widget, as far as syncing is concerned.
//!
//! Layers belong to the surface and are addressed by [`LayerKey`]. The
//! registry and controller never hold layers themselves, only keys.

use std::rc::Rc;

use geo_utils::{Bounds, ExportFile, Layer, Position};
use slotmap::{SecondaryMap, SlotMap};

slotmap::new_key_type! {
    pub struct LayerKey;
}

/// Evaluated when the user clicks a layer; produces the file offered for download.
pub type ClickHandler = Rc<dyn Fn(&Layer) -> ExportFile>;

pub const MAX_ZOOM: f64 = 18.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapView {
    pub center: Position,
    pub zoom: f64,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: Position::new(78.9629, 20.5937),
            zoom: 5.0,
        }
    }
}

impl MapView {
    /// The view that just contains `bounds`, at whole zoom levels.
    pub fn fitting(bounds: &Bounds) -> Self {
        let span = bounds.width().max(bounds.height());
        let zoom = (360.0 / span).log2().floor().clamp(0.0, MAX_ZOOM);
        Self {
            center: bounds.center(),
            zoom,
        }
    }
}

pub trait MapSurface {
    fn add_layer(&mut self, layer: Layer) -> LayerKey;

    /// Detach a layer. Returns it if it was present.
    fn remove_layer(&mut self, key: LayerKey) -> Option<Layer>;

    fn layer(&self, key: LayerKey) -> Option<&Layer>;

    fn layer_mut(&mut self, key: LayerKey) -> Option<&mut Layer>;

    fn layer_keys(&self) -> Vec<LayerKey>;

    fn view(&self) -> MapView;

    /// Recenter and rescale so `bounds` is visible.
    fn fit_bounds(&mut self, bounds: Bounds);

    /// Bind the click action for a layer. Bound once, when the layer is registered.
    fn on_layer_click(&mut self, key: LayerKey, handler: ClickHandler);

    /// Show an uploaded document as-is, outside the synced layers.
    fn show_overlay(&mut self, data: serde_json::Value);
}

/// A surface that keeps everything in memory. Used headless and in tests.
#[derive(Default)]
pub struct MemorySurface {
    layers: SlotMap<LayerKey, Layer>,
    click_handlers: SecondaryMap<LayerKey, ClickHandler>,
    view: MapView,
    overlay: Option<serde_json::Value>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> impl Iterator<Item = (LayerKey, &Layer)> {
        self.layers.iter()
    }

    pub fn overlay(&self) -> Option<&serde_json::Value> {
        self.overlay.as_ref()
    }

    pub fn has_click_action(&self, key: LayerKey) -> bool {
        self.click_handlers.contains_key(key)
    }

    /// Simulate a click on a layer.
    pub fn click(&self, key: LayerKey) -> Option<ExportFile> {
        let handler = self.click_handlers.get(key)?;
        let layer = self.layers.get(key)?;
        Some(handler(layer))
    }
}

impl MapSurface for MemorySurface {
    fn add_layer(&mut self, layer: Layer) -> LayerKey {
        self.layers.insert(layer)
    }

    fn remove_layer(&mut self, key: LayerKey) -> Option<Layer> {
        self.click_handlers.remove(key);
        self.layers.remove(key)
    }

    fn layer(&self, key: LayerKey) -> Option<&Layer> {
        self.layers.get(key)
    }

    fn layer_mut(&mut self, key: LayerKey) -> Option<&mut Layer> {
        self.layers.get_mut(key)
    }

    fn layer_keys(&self) -> Vec<LayerKey> {
        self.layers.keys().collect()
    }

    fn view(&self) -> MapView {
        self.view
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.view = MapView::fitting(&bounds);
    }

    fn on_layer_click(&mut self, key: LayerKey, handler: ClickHandler) {
        if self.layers.contains_key(key) {
            self.click_handlers.insert(key, handler);
        }
    }

    fn show_overlay(&mut self, data: serde_json::Value) {
        self.overlay = Some(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_utils::Shape;

    #[test]
    fn default_view_is_the_initial_map_position() {
        let view = MemorySurface::new().view();
        assert_eq!(view.center, Position::new(78.9629, 20.5937));
        assert_eq!(view.zoom, 5.0);
    }

    #[test]
    fn fitting_view_centers_on_bounds() {
        let view = MapView::fitting(&Bounds::new(0.0, 0.0, 10.0, 4.0));
        assert_eq!(view.center, Position::new(5.0, 2.0));
        // 360 / 10 = 36, log2 ~ 5.17
        assert_eq!(view.zoom, 5.0);

        let whole_world = MapView::fitting(&Bounds::new(-180.0, -90.0, 180.0, 90.0));
        assert_eq!(whole_world.zoom, 0.0);

        let tiny = MapView::fitting(&Bounds::new(0.0, 0.0, 1e-9, 1e-9));
        assert_eq!(tiny.zoom, MAX_ZOOM);
    }

    #[test]
    fn removing_a_layer_drops_its_click_action() {
        let mut surface = MemorySurface::new();
        let key = surface.add_layer(Layer::new(Shape::Point(Position::new(1.0, 2.0))));
        surface.on_layer_click(
            key,
            Rc::new(|_| ExportFile {
                filename: "x".into(),
                contents: String::new(),
            }),
        );
        assert!(surface.click(key).is_some());

        assert!(surface.remove_layer(key).is_some());
        assert!(!surface.has_click_action(key));
        assert!(surface.click(key).is_none());
        assert!(surface.remove_layer(key).is_none());
    }

    #[test]
    fn click_actions_need_a_live_layer() {
        let mut surface = MemorySurface::new();
        let key = surface.add_layer(Layer::new(Shape::Point(Position::new(1.0, 2.0))));
        surface.remove_layer(key);
        surface.on_layer_click(
            key,
            Rc::new(|_| ExportFile {
                filename: "x".into(),
                contents: String::new(),
            }),
        );
        assert!(!surface.has_click_action(key));
    }
}
