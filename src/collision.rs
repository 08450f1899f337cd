// Collision geometry as placement sees it, the contract of the host's
// spatial index, and the per-source collision group bookkeeping. The index
// itself (grid mechanics, projection of boxes into screen space) is owned
// by the host renderer.

use std::collections::HashMap;

use crate::bucket::{LineVertex, PlacedSymbol};
use crate::projection::Mat4;

/// A candidate collision box in tile units: edge offsets relative to the
/// anchor point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionBox {
    pub anchor_x: f64,
    pub anchor_y: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub feature_index: usize,
}

impl CollisionBox {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// The same box displaced by a pixel shift, used for dynamic-anchor
    /// attempts.
    pub fn shifted(&self, shift_x: f64, shift_y: f64) -> CollisionBox {
        CollisionBox {
            anchor_x: self.anchor_x,
            anchor_y: self.anchor_y,
            x1: self.x1 + shift_x,
            y1: self.y1 + shift_y,
            x2: self.x2 + shift_x,
            y2: self.y2 + shift_y,
            feature_index: self.feature_index,
        }
    }
}

/// One collision circle of a label that follows a line path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionCircle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Serialized collision geometry as produced by the tile worker. Entries
/// with a positive radius describe circles, the rest boxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializedCollisionBox {
    pub anchor_x: f64,
    pub anchor_y: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub radius: f64,
    pub feature_index: usize,
}

pub type CollisionBoxArray = Vec<SerializedCollisionBox>;

/// Per-symbol candidate geometry, deserialized lazily from the bucket's
/// `CollisionBoxArray` on first use.
#[derive(Debug, Clone, Default)]
pub struct CollisionArrays {
    pub text_box: Option<CollisionBox>,
    pub icon_box: Option<CollisionBox>,
    pub text_circles: Vec<CollisionCircle>,
    pub text_feature_index: usize,
    pub icon_feature_index: usize,
}

/// Result of a box placement query: the projected screen-space box when the
/// label fits, and whether the candidate sat outside the padded viewport.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacedBox {
    pub screen_box: Option<[f64; 4]>,
    pub offscreen: bool,
}

impl PlacedBox {
    pub fn is_placed(&self) -> bool {
        self.screen_box.is_some()
    }
}

/// Result of a circle placement query.
#[derive(Debug, Clone, Default)]
pub struct PlacedCircles {
    pub screen_circles: Vec<[f64; 3]>,
    pub offscreen: bool,
}

/// Contract of the host's spatial collision index. Placement queries it for
/// candidate geometry and inserts whatever it decides to keep; insertion
/// order within a pass is significant, since later labels test against
/// earlier winners.
pub trait CollisionIndex {
    fn place_collision_box(
        &self,
        collision_box: &CollisionBox,
        allow_overlap: bool,
        text_pixel_ratio: f64,
        pos_matrix: &Mat4,
        group: &CollisionGroup,
    ) -> PlacedBox;

    #[allow(clippy::too_many_arguments)]
    fn place_collision_circles(
        &self,
        circles: &[CollisionCircle],
        allow_overlap: bool,
        scale: f64,
        text_pixel_ratio: f64,
        placed_symbol: &PlacedSymbol,
        line_vertices: &[LineVertex],
        glyph_offsets: &[f32],
        font_size: f64,
        pos_matrix: &Mat4,
        label_plane_matrix: &Mat4,
        show_collision_circles: bool,
        pitch_with_map: bool,
        group: &CollisionGroup,
    ) -> PlacedCircles;

    fn insert_collision_box(
        &mut self,
        screen_box: [f64; 4],
        ignore_placement: bool,
        bucket_instance_id: u32,
        feature_index: usize,
        group_id: u16,
    );

    fn insert_collision_circles(
        &mut self,
        screen_circles: &[[f64; 3]],
        ignore_placement: bool,
        bucket_instance_id: u32,
        feature_index: usize,
        group_id: u16,
    );
}

/// Scoping handle for collision queries. Group 0 is the shared group used
/// when cross-source collisions are enabled; exclusive groups only collide
/// with themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionGroup {
    pub id: u16,
    pub exclusive: bool,
}

impl CollisionGroup {
    /// Membership test applied to already-inserted geometry: does geometry
    /// from `other` block placements in this group?
    pub fn allows(&self, other: u16) -> bool {
        !self.exclusive || self.id == other
    }
}

/// Assigns each data source its collision group. With cross-source
/// collisions every source shares group 0; otherwise each source name gets
/// an exclusive id on first request, stable for the lifetime of this value.
#[derive(Debug)]
pub struct CollisionGroups {
    cross_source_collisions: bool,
    groups: HashMap<String, CollisionGroup>,
    next_group_id: u16,
}

impl CollisionGroups {
    pub fn new(cross_source_collisions: bool) -> Self {
        Self {
            cross_source_collisions,
            groups: HashMap::new(),
            next_group_id: 0,
        }
    }

    pub fn get(&mut self, source_id: &str) -> CollisionGroup {
        if self.cross_source_collisions {
            return CollisionGroup {
                id: 0,
                exclusive: false,
            };
        }
        let next_group_id = &mut self.next_group_id;
        *self
            .groups
            .entry(source_id.to_string())
            .or_insert_with(|| {
                *next_group_id += 1;
                CollisionGroup {
                    id: *next_group_id,
                    exclusive: true,
                }
            })
    }
}
