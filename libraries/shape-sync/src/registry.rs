use std::collections::BTreeMap;

use geo_utils::Bounds;

use crate::surface::{LayerKey, MapSurface};

/// Maps record ids to the live layer showing them.
///
/// There is never more than one layer per id; the registry removes the layer it
/// replaces from the surface so stale copies don't linger on the map.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: BTreeMap<String, LayerKey>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, surface: &mut impl MapSurface, id: impl Into<String>, key: LayerKey) {
        let id = id.into();
        if let Some(previous) = self.layers.insert(id.clone(), key) {
            if previous != key {
                log::debug!("Replacing layer for record {id}");
                surface.remove_layer(previous);
            }
        }
    }

    /// Detach the layer for `id`. Returns whether there was one.
    pub fn remove(&mut self, surface: &mut impl MapSurface, id: &str) -> bool {
        match self.layers.remove(id) {
            Some(key) => {
                surface.remove_layer(key);
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self, surface: &mut impl MapSurface) {
        for (_, key) in std::mem::take(&mut self.layers) {
            surface.remove_layer(key);
        }
    }

    /// Ask the surface to show every registered layer. Does nothing (and
    /// returns `false`) when there is nothing to fit or the bounds have no area.
    pub fn fit_view_to(&self, surface: &mut impl MapSurface) -> bool {
        let Some(bounds) = self.bounds(surface) else {
            return false;
        };
        if bounds.is_degenerate() {
            log::debug!("Not fitting view to degenerate bounds {bounds:?}");
            return false;
        }
        surface.fit_bounds(bounds);
        true
    }

    pub fn bounds(&self, surface: &impl MapSurface) -> Option<Bounds> {
        self.layers
            .values()
            .filter_map(|key| surface.layer(*key))
            .filter_map(|layer| layer.shape.bounds())
            .reduce(|acc, b| acc.union(&b))
    }

    pub fn get(&self, id: &str) -> Option<LayerKey> {
        self.layers.get(id).copied()
    }

    pub fn id_of(&self, key: LayerKey) -> Option<&str> {
        self.layers
            .iter()
            .find(|(_, k)| **k == key)
            .map(|(id, _)| id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LayerKey)> {
        self.layers.iter().map(|(id, key)| (id.as_str(), *key))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MapView, MemorySurface};
    use geo_utils::{Layer, Position, Shape};

    fn point(surface: &mut MemorySurface, lng: f64, lat: f64) -> LayerKey {
        surface.add_layer(Layer::new(Shape::Point(Position::new(lng, lat))))
    }

    #[test]
    fn upsert_replaces_and_detaches_previous_layer() {
        let mut surface = MemorySurface::new();
        let mut registry = LayerRegistry::new();

        let first = point(&mut surface, 1.0, 1.0);
        let second = point(&mut surface, 2.0, 2.0);
        registry.upsert(&mut surface, "a", first);
        registry.upsert(&mut surface, "a", second);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a"), Some(second));
        assert_eq!(surface.len(), 1);
        assert!(surface.layer(first).is_none());
        assert!(surface.layer(second).is_some());
    }

    #[test]
    fn upsert_same_key_twice_keeps_layer() {
        let mut surface = MemorySurface::new();
        let mut registry = LayerRegistry::new();
        let key = point(&mut surface, 1.0, 1.0);

        registry.upsert(&mut surface, "a", key);
        registry.upsert(&mut surface, "a", key);

        assert_eq!(surface.len(), 1);
        assert_eq!(registry.id_of(key), Some("a"));
    }

    #[test]
    fn remove_absent_id_is_a_no_op() {
        let mut surface = MemorySurface::new();
        let mut registry = LayerRegistry::new();
        let key = point(&mut surface, 1.0, 1.0);
        registry.upsert(&mut surface, "a", key);

        assert!(!registry.remove(&mut surface, "missing"));
        assert_eq!(surface.len(), 1);

        assert!(registry.remove(&mut surface, "a"));
        assert!(surface.is_empty());
        assert!(!registry.contains("a"));
    }

    #[test]
    fn clear_all_leaves_unmanaged_layers_alone() {
        let mut surface = MemorySurface::new();
        let mut registry = LayerRegistry::new();
        let a = point(&mut surface, 1.0, 1.0);
        let b = point(&mut surface, 2.0, 2.0);
        let draft = point(&mut surface, 3.0, 3.0);
        registry.upsert(&mut surface, "a", a);
        registry.upsert(&mut surface, "b", b);

        registry.clear_all(&mut surface);

        assert!(registry.is_empty());
        assert_eq!(surface.layer_keys(), vec![draft]);
    }

    #[test]
    fn fit_view_on_empty_registry_keeps_view() {
        let mut surface = MemorySurface::new();
        let mut registry = LayerRegistry::new();
        let key = point(&mut surface, 1.0, 1.0);
        registry.upsert(&mut surface, "a", key);
        registry.clear_all(&mut surface);

        assert!(!registry.fit_view_to(&mut surface));
        assert_eq!(surface.view(), MapView::default());
    }

    #[test]
    fn fit_view_on_single_point_is_degenerate() {
        let mut surface = MemorySurface::new();
        let mut registry = LayerRegistry::new();
        let key = point(&mut surface, 10.0, 20.0);
        registry.upsert(&mut surface, "a", key);

        assert!(!registry.fit_view_to(&mut surface));
        assert_eq!(surface.view(), MapView::default());
    }

    #[test]
    fn fit_view_covers_all_layers() {
        let mut surface = MemorySurface::new();
        let mut registry = LayerRegistry::new();
        let a = point(&mut surface, 0.0, 0.0);
        let b = surface.add_layer(Layer::new(Shape::Rectangle(Bounds::new(
            5.0, 5.0, 10.0, 8.0,
        ))));
        registry.upsert(&mut surface, "a", a);
        registry.upsert(&mut surface, "b", b);

        assert_eq!(
            registry.bounds(&surface),
            Some(Bounds::new(0.0, 0.0, 10.0, 8.0))
        );
        assert!(registry.fit_view_to(&mut surface));
        assert_eq!(surface.view().center, Position::new(5.0, 4.0));
    }
}
