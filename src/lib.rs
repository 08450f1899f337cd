pub mod anchor;
pub mod bucket;
pub mod collision;
pub mod config;
pub mod opacity;
pub mod placement;
pub mod placement_dump;
pub mod projection;

/// Tile-local coordinate range. Geometry inside a tile spans `0..EXTENT`
/// regardless of the tile's zoom level.
pub const EXTENT: f64 = 8192.0;

pub use config::{PlacementConfig, StyleConfig, SymbolLayerConfig, load_style_config};
pub use opacity::{JointOpacityState, JointPlacement, OpacityState, pack_opacity};
pub use placement::Placement;
