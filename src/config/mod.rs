//! JSON configuration: collection settings and the layer stack.

/// `config/collection.json` and render settings.
pub mod collection;
/// `config/layers.json`.
pub mod layers;
