// Bucket-side storage placement reads and writes back into: symbol
// instances with their serialized collision geometry, the per-part opacity
// and collision-debug vertex arrays, and the tile wrapper that owns the
// buckets for each style layer.

use std::collections::HashMap;

use crate::collision::{
    CollisionArrays, CollisionBox, CollisionBoxArray, CollisionCircle,
};
use crate::config::SymbolLayerConfig;
use crate::projection::{Mat4, identity};

/// Identity of a tile in the pyramid, including the overscale level it is
/// rendered at and its antimeridian wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverscaledTileId {
    pub overscaled_z: u8,
    pub wrap: i32,
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// One vertex of the line a path-following label is attached to.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineVertex {
    pub x: f32,
    pub y: f32,
}

/// Render-side projection of one shaped symbol. Placement owns the
/// `cross_tile_id`/`hidden` fields; everything else is written once by the
/// tile worker.
#[derive(Debug, Clone, Default)]
pub struct PlacedSymbol {
    pub cross_tile_id: u64,
    pub hidden: bool,
    pub line_start_index: usize,
    pub line_length: usize,
    pub glyph_start_index: usize,
    pub glyph_length: usize,
}

/// Packed per-vertex opacity values with dirty tracking so the render stage
/// only re-uploads buffers a writeback actually touched.
#[derive(Debug, Default)]
pub struct OpacityVertexArray {
    data: Vec<u32>,
    dirty: bool,
    upload_count: u64,
}

impl OpacityVertexArray {
    pub fn clear(&mut self) {
        self.data.clear();
        self.dirty = true;
    }

    pub fn emplace_back(&mut self, packed: u32) {
        self.data.push(packed);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Hand the buffer to the GPU if it changed. Returns whether an upload
    /// happened.
    pub fn upload(&mut self) -> bool {
        if self.dirty {
            self.dirty = false;
            self.upload_count += 1;
            true
        } else {
            false
        }
    }

    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }
}

/// One vertex of the collision-debug overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionVertex {
    pub placed: bool,
    pub not_used: bool,
    pub shift_x: f32,
    pub shift_y: f32,
}

#[derive(Debug, Default)]
pub struct CollisionVertexArray {
    data: Vec<CollisionVertex>,
    dirty: bool,
    upload_count: u64,
}

impl CollisionVertexArray {
    pub fn clear(&mut self) {
        self.data.clear();
        self.dirty = true;
    }

    pub fn emplace_back(&mut self, vertex: CollisionVertex) {
        self.data.push(vertex);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[CollisionVertex] {
        &self.data
    }

    pub fn upload(&mut self) -> bool {
        if self.dirty {
            self.dirty = false;
            self.upload_count += 1;
            true
        } else {
            false
        }
    }

    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }
}

/// Buffers for one part (text or icon) of a bucket.
#[derive(Debug, Default)]
pub struct SymbolBuffers {
    pub opacity_vertex_array: OpacityVertexArray,
    pub placed_symbols: Vec<PlacedSymbol>,
    /// Vertex count of the layout buffer the opacity array must stay in
    /// lockstep with.
    pub layout_vertex_count: usize,
}

#[derive(Debug, Default)]
pub struct CollisionDebugBuffers {
    pub collision_vertex_array: CollisionVertexArray,
}

/// One candidate label from a tile bucket. Immutable once the bucket is
/// built; placement only touches the bucket's placed-symbol projections.
#[derive(Debug, Clone)]
pub struct SymbolInstance {
    /// Stable identity shared by every tile-level copy of the feature.
    /// Zero means unassigned and must be resolved before placement.
    pub cross_tile_id: u64,
    pub right_justified_text_symbol_index: i32,
    pub center_justified_text_symbol_index: i32,
    pub left_justified_text_symbol_index: i32,
    pub vertical_placed_text_symbol_index: i32,
    pub placed_icon_symbol_index: i32,
    pub num_horizontal_glyph_vertices: usize,
    pub num_vertical_glyph_vertices: usize,
    pub num_icon_vertices: usize,
    pub layout_text_size: f64,
    pub text_box_scale: f64,
    pub radial_text_offset: f64,
    pub text_box_start_index: usize,
    pub text_box_end_index: usize,
    pub icon_box_start_index: usize,
    pub icon_box_end_index: usize,
}

impl Default for SymbolInstance {
    fn default() -> Self {
        Self {
            cross_tile_id: 0,
            right_justified_text_symbol_index: -1,
            center_justified_text_symbol_index: -1,
            left_justified_text_symbol_index: -1,
            vertical_placed_text_symbol_index: -1,
            placed_icon_symbol_index: -1,
            num_horizontal_glyph_vertices: 0,
            num_vertical_glyph_vertices: 0,
            num_icon_vertices: 0,
            layout_text_size: 16.0,
            text_box_scale: 1.0,
            radial_text_offset: 0.0,
            text_box_start_index: 0,
            text_box_end_index: 0,
            icon_box_start_index: 0,
            icon_box_end_index: 0,
        }
    }
}

/// All symbols of one style layer inside one tile.
#[derive(Debug)]
pub struct SymbolBucket {
    /// Nonzero handle the host assigns when the bucket enters the render
    /// tree; retained query data is keyed by it.
    pub bucket_instance_id: u32,
    pub layer_id: String,
    pub source_id: String,
    pub source_layer_index: usize,
    pub bucket_index: usize,
    pub config: SymbolLayerConfig,
    pub symbol_instances: Vec<SymbolInstance>,
    pub collision_arrays: Option<Vec<CollisionArrays>>,
    pub text: SymbolBuffers,
    pub icon: SymbolBuffers,
    pub collision_box: Option<CollisionDebugBuffers>,
    pub collision_circle: Option<CollisionDebugBuffers>,
    pub line_vertex_array: Vec<LineVertex>,
    pub glyph_offset_array: Vec<f32>,
    /// Set by the host when the tile was re-parsed in place; the next
    /// placement pass must not fade its labels back in. Cleared by that
    /// pass.
    pub just_reloaded: bool,
}

impl SymbolBucket {
    pub fn new(
        bucket_instance_id: u32,
        layer_id: impl Into<String>,
        source_id: impl Into<String>,
        config: SymbolLayerConfig,
    ) -> Self {
        Self {
            bucket_instance_id,
            layer_id: layer_id.into(),
            source_id: source_id.into(),
            source_layer_index: 0,
            bucket_index: 0,
            config,
            symbol_instances: Vec::new(),
            collision_arrays: None,
            text: SymbolBuffers::default(),
            icon: SymbolBuffers::default(),
            collision_box: None,
            collision_circle: None,
            line_vertex_array: Vec::new(),
            glyph_offset_array: Vec::new(),
            just_reloaded: false,
        }
    }

    pub fn has_text_data(&self) -> bool {
        self.text.layout_vertex_count > 0
    }

    pub fn has_icon_data(&self) -> bool {
        self.icon.layout_vertex_count > 0
    }

    pub fn has_collision_box_data(&self) -> bool {
        self.collision_box.is_some()
    }

    pub fn has_collision_circle_data(&self) -> bool {
        self.collision_circle.is_some()
    }

    /// Build the per-instance `CollisionArrays` from the serialized box
    /// array. Called lazily the first time a pass needs them.
    pub fn deserialize_collision_boxes(&mut self, collision_box_array: &CollisionBoxArray) {
        let mut arrays = Vec::with_capacity(self.symbol_instances.len());
        for instance in &self.symbol_instances {
            let mut collision_arrays = CollisionArrays::default();
            for entry in collision_box_array
                .iter()
                .take(instance.text_box_end_index)
                .skip(instance.text_box_start_index)
            {
                if entry.radius > 0.0 {
                    collision_arrays.text_circles.push(CollisionCircle {
                        x: entry.anchor_x,
                        y: entry.anchor_y,
                        radius: entry.radius,
                    });
                } else if collision_arrays.text_box.is_none() {
                    collision_arrays.text_box = Some(CollisionBox {
                        anchor_x: entry.anchor_x,
                        anchor_y: entry.anchor_y,
                        x1: entry.x1,
                        y1: entry.y1,
                        x2: entry.x2,
                        y2: entry.y2,
                        feature_index: entry.feature_index,
                    });
                    collision_arrays.text_feature_index = entry.feature_index;
                }
            }
            for entry in collision_box_array
                .iter()
                .take(instance.icon_box_end_index)
                .skip(instance.icon_box_start_index)
            {
                if entry.radius == 0.0 && collision_arrays.icon_box.is_none() {
                    collision_arrays.icon_box = Some(CollisionBox {
                        anchor_x: entry.anchor_x,
                        anchor_y: entry.anchor_y,
                        x1: entry.x1,
                        y1: entry.y1,
                        x2: entry.x2,
                        y2: entry.y2,
                        feature_index: entry.feature_index,
                    });
                    collision_arrays.icon_feature_index = entry.feature_index;
                }
            }
            arrays.push(collision_arrays);
        }
        self.collision_arrays = Some(arrays);
    }

    /// Push every dirty buffer to the GPU. Returns how many uploads ran.
    pub fn upload_changed(&mut self) -> usize {
        let mut uploads = 0;
        if self.text.opacity_vertex_array.upload() {
            uploads += 1;
        }
        if self.icon.opacity_vertex_array.upload() {
            uploads += 1;
        }
        if let Some(buffers) = &mut self.collision_box {
            if buffers.collision_vertex_array.upload() {
                uploads += 1;
            }
        }
        if let Some(buffers) = &mut self.collision_circle {
            if buffers.collision_vertex_array.upload() {
                uploads += 1;
            }
        }
        uploads
    }
}

/// A loaded map tile: the buckets of each symbol layer plus the host-side
/// state placement needs (projection matrix, fade hold, serialized
/// collision geometry).
#[derive(Debug)]
pub struct Tile {
    pub id: OverscaledTileId,
    pub tile_size: f64,
    /// Host-computed tile projection matrix for the current viewport.
    pub pos_matrix: Mat4,
    /// Freshly loaded tiles are held back so they do not fight labels of
    /// still-fading parent/child tiles.
    pub holding_for_fade: bool,
    pub collision_box_array: CollisionBoxArray,
    pub buckets: HashMap<String, SymbolBucket>,
}

impl Tile {
    pub fn new(id: OverscaledTileId, tile_size: f64) -> Self {
        Self {
            id,
            tile_size,
            pos_matrix: identity(),
            holding_for_fade: false,
            collision_box_array: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    pub fn add_bucket(&mut self, bucket: SymbolBucket) {
        self.buckets.insert(bucket.layer_id.clone(), bucket);
    }

    pub fn bucket(&self, layer_id: &str) -> Option<&SymbolBucket> {
        self.buckets.get(layer_id)
    }

    pub fn bucket_mut(&mut self, layer_id: &str) -> Option<&mut SymbolBucket> {
        self.buckets.get_mut(layer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::SerializedCollisionBox;

    fn boxed_instance(start: usize, end: usize) -> SymbolInstance {
        SymbolInstance {
            cross_tile_id: 1,
            text_box_start_index: start,
            text_box_end_index: end,
            ..Default::default()
        }
    }

    #[test]
    fn deserialize_splits_boxes_and_circles() {
        let config = SymbolLayerConfig::default();
        let mut bucket = SymbolBucket::new(1, "labels", "source", config);
        bucket.symbol_instances.push(boxed_instance(0, 3));
        let array = vec![
            SerializedCollisionBox {
                anchor_x: 10.0,
                anchor_y: 20.0,
                x1: -5.0,
                y1: -2.0,
                x2: 5.0,
                y2: 2.0,
                radius: 0.0,
                feature_index: 7,
            },
            SerializedCollisionBox {
                anchor_x: 12.0,
                anchor_y: 20.0,
                radius: 3.0,
                ..Default::default()
            },
            SerializedCollisionBox {
                anchor_x: 14.0,
                anchor_y: 20.0,
                radius: 3.0,
                ..Default::default()
            },
        ];
        bucket.deserialize_collision_boxes(&array);
        let arrays = bucket.collision_arrays.as_ref().expect("arrays built");
        let first = &arrays[0];
        let text_box = first.text_box.expect("text box present");
        assert_eq!(text_box.anchor_x, 10.0);
        assert_eq!(first.text_feature_index, 7);
        assert_eq!(first.text_circles.len(), 2);
        assert_eq!(first.text_circles[1].x, 14.0);
    }

    #[test]
    fn upload_runs_once_per_change() {
        let mut array = OpacityVertexArray::default();
        array.emplace_back(42);
        assert!(array.upload(), "first upload after a write must run");
        assert!(!array.upload(), "clean buffer must not re-upload");
        array.clear();
        assert!(array.upload(), "clear marks the buffer dirty again");
        assert_eq!(array.upload_count(), 2);
    }

    #[test]
    fn bucket_part_queries_follow_layout_vertex_counts() {
        let config = SymbolLayerConfig::default();
        let mut bucket = SymbolBucket::new(1, "labels", "source", config);
        assert!(!bucket.has_text_data());
        bucket.text.layout_vertex_count = 8;
        assert!(bucket.has_text_data());
        assert!(!bucket.has_icon_data());
    }
}
