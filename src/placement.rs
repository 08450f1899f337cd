// One placement pass over the visible tiles of a symbol layer: collision
// resolution per bucket, cross-tile dedup, dynamic-anchor search, and the
// fade state machine that carries opacities from pass to pass. The pass
// runs synchronously; the host interleaves passes with other frame work but
// never runs two over the same Placement.

use std::collections::{HashMap, HashSet};

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::EXTENT;
use crate::anchor::{self, AUTO_ANCHORS, Anchor, DynamicAnchor, Justification};
use crate::bucket::{CollisionVertex, CollisionVertexArray, OverscaledTileId, SymbolBucket, SymbolInstance, Tile};
use crate::collision::{
    CollisionBox, CollisionBoxArray, CollisionGroup, CollisionGroups, CollisionIndex, PlacedBox,
    PlacedCircles,
};
use crate::config::{Alignment, PlacementConfig};
use crate::opacity::{JointOpacityState, JointPlacement, pack_opacity};
use crate::projection::{Mat4, Transform, label_plane_matrix, pixels_to_tile_units};

/// Which anchor the dynamic search settled on for a label, plus the box
/// metrics needed to recompute its shift at render time. The previous
/// anchor enables a cross-anchor blend while the label migrates.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DynamicOffset {
    pub anchor: Anchor,
    pub prev_anchor: Option<Anchor>,
    pub radial_offset: f64,
    pub width: f64,
    pub height: f64,
    pub text_box_scale: f64,
}

/// Lookup coordinates kept alive for feature queries against a bucket
/// instance as long as this placement is current. The host's feature index
/// itself stays host-owned.
#[derive(Debug, Clone, Copy)]
pub struct RetainedQueryData {
    pub bucket_instance_id: u32,
    pub source_layer_index: usize,
    pub bucket_index: usize,
    pub tile_id: OverscaledTileId,
}

static MISPLACED_AUTO_WARNING: OnceCell<()> = OnceCell::new();

fn warn_misplaced_auto() {
    MISPLACED_AUTO_WARNING.get_or_init(|| {
        log::warn!("dynamic-text-anchor: \"auto\" is only valid as the first entry, skipping");
    });
}

/// A full placement snapshot. Created once per recomputation cycle, fed
/// every visible tile via [`Placement::place_layer_tile`], sealed with
/// [`Placement::commit`], and consulted per frame through the opacity
/// writeback until the next snapshot supersedes it.
#[derive(Debug)]
pub struct Placement {
    pub transform: Transform,
    pub fade_duration: f64,
    pub collision_groups: CollisionGroups,
    pub placements: HashMap<u64, JointPlacement>,
    pub opacities: HashMap<u64, JointOpacityState>,
    pub dynamic_offsets: HashMap<u64, DynamicOffset>,
    pub retained_query_data: HashMap<u32, RetainedQueryData>,
    pub commit_time: f64,
    pub last_placement_change_time: f64,
    pub stale: bool,
    prev_placement: Option<Box<Placement>>,
}

impl Placement {
    pub fn new(
        transform: Transform,
        config: &PlacementConfig,
        mut prev_placement: Option<Box<Placement>>,
    ) -> Self {
        if let Some(prev) = prev_placement.as_deref_mut() {
            // Keep at most one generation alive: the captured predecessor
            // must not drag its own chain along.
            prev.prev_placement = None;
        }
        Self {
            transform,
            fade_duration: config.fade_duration,
            collision_groups: CollisionGroups::new(config.cross_source_collisions),
            placements: HashMap::new(),
            opacities: HashMap::new(),
            dynamic_offsets: HashMap::new(),
            retained_query_data: HashMap::new(),
            commit_time: 0.0,
            last_placement_change_time: 0.0,
            stale: false,
            prev_placement,
        }
    }

    /// Resolve the tile's bucket for `layer_id` and run collision placement
    /// over it. No-op when the tile has no bucket for the layer or the
    /// bucket was never registered with the render tree.
    pub fn place_layer_tile<I: CollisionIndex>(
        &mut self,
        layer_id: &str,
        tile: &mut Tile,
        collision_index: &mut I,
        show_collision_boxes: bool,
        seen_cross_tile_ids: &mut HashSet<u64>,
    ) {
        let tile_id = tile.id;
        let tile_size = tile.tile_size;
        let pos_matrix = tile.pos_matrix;
        let holding_for_fade = tile.holding_for_fade;
        let Tile {
            buckets,
            collision_box_array,
            ..
        } = tile;
        let Some(bucket) = buckets.get_mut(layer_id) else {
            return;
        };
        if bucket.bucket_instance_id == 0 {
            return;
        }

        let scale = (self.transform.zoom - tile_id.overscaled_z as f64).exp2();
        let text_pixel_ratio = tile_size * scale / EXTENT;
        let tile_units_per_pixel = pixels_to_tile_units(tile_size, scale);

        let text_label_plane_matrix = label_plane_matrix(
            &pos_matrix,
            bucket.config.text_pitch_alignment == Alignment::Map,
            bucket.config.text_rotation_alignment == Alignment::Map,
            &self.transform,
            tile_units_per_pixel,
        );
        let icon_label_plane_matrix = label_plane_matrix(
            &pos_matrix,
            bucket.config.icon_pitch_alignment == Alignment::Map,
            bucket.config.icon_rotation_alignment == Alignment::Map,
            &self.transform,
            tile_units_per_pixel,
        );

        self.retained_query_data.insert(
            bucket.bucket_instance_id,
            RetainedQueryData {
                bucket_instance_id: bucket.bucket_instance_id,
                source_layer_index: bucket.source_layer_index,
                bucket_index: bucket.bucket_index,
                tile_id,
            },
        );

        self.place_layer_bucket(
            bucket,
            &pos_matrix,
            &text_label_plane_matrix,
            &icon_label_plane_matrix,
            scale,
            text_pixel_ratio,
            collision_index,
            show_collision_boxes,
            holding_for_fade,
            seen_cross_tile_ids,
            collision_box_array,
        );
    }

    /// Run overlap resolution over every not-yet-seen symbol instance of a
    /// bucket, recording a [`JointPlacement`] per cross-tile id. Iteration
    /// order is the bucket's symbol order; earlier symbols win overlapping
    /// space because later ones test against their inserted geometry.
    #[allow(clippy::too_many_arguments)]
    pub fn place_layer_bucket<I: CollisionIndex>(
        &mut self,
        bucket: &mut SymbolBucket,
        pos_matrix: &Mat4,
        text_label_plane_matrix: &Mat4,
        _icon_label_plane_matrix: &Mat4,
        scale: f64,
        text_pixel_ratio: f64,
        collision_index: &mut I,
        show_collision_boxes: bool,
        holding_for_fade: bool,
        seen_cross_tile_ids: &mut HashSet<u64>,
        collision_box_array: &CollisionBoxArray,
    ) {
        let config = bucket.config.clone();
        let always_show_text = config.text_allow_overlap
            && (config.icon_allow_overlap || !bucket.has_icon_data() || config.icon_optional);
        let always_show_icon = config.icon_allow_overlap
            && (config.text_allow_overlap || !bucket.has_text_data() || config.text_optional);
        let group = self.collision_groups.get(&bucket.source_id);
        let pitch_with_map = config.text_pitch_alignment == Alignment::Map;
        let rotate_with_map = config.text_rotation_alignment == Alignment::Map;

        if bucket.collision_arrays.is_none() {
            bucket.deserialize_collision_boxes(collision_box_array);
        }

        for index in 0..bucket.symbol_instances.len() {
            let instance = bucket.symbol_instances[index].clone();
            if seen_cross_tile_ids.contains(&instance.cross_tile_id) {
                continue;
            }
            if holding_for_fade {
                // The tile is deliberately delayed; mark the label unplaced
                // for this pass but leave it unseen so a duplicate in
                // another tile can still place it.
                self.placements
                    .insert(instance.cross_tile_id, JointPlacement::new(false, false, false));
                continue;
            }

            let mut place_text = false;
            let mut place_icon = false;
            let mut offscreen = true;
            let collision_arrays = bucket
                .collision_arrays
                .as_ref()
                .map(|arrays| arrays[index].clone())
                .unwrap_or_default();

            let mut placed_glyph_box = PlacedBox::default();
            let mut placed_glyph_circles: Option<PlacedCircles> = None;
            let mut placed_icon_box = PlacedBox::default();

            if let Some(text_box) = collision_arrays.text_box {
                if config.dynamic_text_anchor.is_empty() {
                    placed_glyph_box = collision_index.place_collision_box(
                        &text_box,
                        config.text_allow_overlap,
                        text_pixel_ratio,
                        pos_matrix,
                        &group,
                    );
                    place_text = placed_glyph_box.is_placed();
                    offscreen &= placed_glyph_box.offscreen;
                } else {
                    let width = text_box.width();
                    let height = text_box.height();
                    for candidate in self.candidate_anchors(&config.dynamic_text_anchor, &instance)
                    {
                        let attempt = self.attempt_anchor_placement(
                            candidate,
                            &text_box,
                            width,
                            height,
                            rotate_with_map,
                            pitch_with_map,
                            text_pixel_ratio,
                            pos_matrix,
                            &group,
                            config.text_allow_overlap,
                            &instance,
                            bucket,
                            collision_index,
                        );
                        if let Some(placed) = attempt {
                            placed_glyph_box = placed;
                            place_text = true;
                            offscreen &= placed_glyph_box.offscreen;
                            break;
                        }
                    }
                    if !place_text {
                        // Every anchor failed: inherit the previous offset
                        // so the label fades out in place instead of
                        // snapping somewhere new.
                        let stale_offset = self
                            .prev_placement
                            .as_ref()
                            .and_then(|prev| prev.dynamic_offsets.get(&instance.cross_tile_id))
                            .copied();
                        if let Some(stale_offset) = stale_offset {
                            self.dynamic_offsets
                                .insert(instance.cross_tile_id, stale_offset);
                            mark_used_justification(bucket, stale_offset.anchor, &instance);
                        }
                    }
                }
            }

            if !collision_arrays.text_circles.is_empty()
                && instance.center_justified_text_symbol_index >= 0
            {
                let placed_symbol = &bucket.text.placed_symbols
                    [instance.center_justified_text_symbol_index as usize];
                let placed = collision_index.place_collision_circles(
                    &collision_arrays.text_circles,
                    config.text_allow_overlap,
                    scale,
                    text_pixel_ratio,
                    placed_symbol,
                    &bucket.line_vertex_array,
                    &bucket.glyph_offset_array,
                    instance.layout_text_size,
                    pos_matrix,
                    text_label_plane_matrix,
                    show_collision_boxes,
                    pitch_with_map,
                    &group,
                );
                // Circle generation can under-produce near label-offset edge
                // cases; allow-overlap labels stay placed regardless.
                place_text = config.text_allow_overlap || !placed.screen_circles.is_empty();
                offscreen &= placed.offscreen;
                placed_glyph_circles = Some(placed);
            }

            if let Some(icon_box) = collision_arrays.icon_box {
                placed_icon_box = collision_index.place_collision_box(
                    &icon_box,
                    config.icon_allow_overlap,
                    text_pixel_ratio,
                    pos_matrix,
                    &group,
                );
                place_icon = placed_icon_box.is_placed();
                offscreen &= placed_icon_box.offscreen;
            }

            // Text and icon appear together unless one part is optional or
            // the feature genuinely lacks it.
            let icon_without_text = config.text_optional
                || (instance.num_horizontal_glyph_vertices == 0
                    && instance.num_vertical_glyph_vertices == 0);
            let text_without_icon = config.icon_optional || instance.num_icon_vertices == 0;
            if !icon_without_text && !text_without_icon {
                let both = place_text && place_icon;
                place_text = both;
                place_icon = both;
            } else if !text_without_icon {
                place_text = place_text && place_icon;
            } else if !icon_without_text {
                place_icon = place_text && place_icon;
            }

            if place_text {
                if let Some(screen_box) = placed_glyph_box.screen_box {
                    collision_index.insert_collision_box(
                        screen_box,
                        config.text_ignore_placement,
                        bucket.bucket_instance_id,
                        collision_arrays.text_feature_index,
                        group.id,
                    );
                }
            }
            if place_icon {
                if let Some(screen_box) = placed_icon_box.screen_box {
                    collision_index.insert_collision_box(
                        screen_box,
                        config.icon_ignore_placement,
                        bucket.bucket_instance_id,
                        collision_arrays.icon_feature_index,
                        group.id,
                    );
                }
            }
            if place_text {
                if let Some(placed) = &placed_glyph_circles {
                    if !placed.screen_circles.is_empty() {
                        collision_index.insert_collision_circles(
                            &placed.screen_circles,
                            config.text_ignore_placement,
                            bucket.bucket_instance_id,
                            collision_arrays.text_feature_index,
                            group.id,
                        );
                    }
                }
            }

            debug_assert!(
                instance.cross_tile_id != 0,
                "placement requires resolved cross-tile ids"
            );
            debug_assert!(
                bucket.bucket_instance_id != 0,
                "bucket must be registered before placement"
            );

            self.placements.insert(
                instance.cross_tile_id,
                JointPlacement::new(
                    place_text || always_show_text,
                    place_icon || always_show_icon,
                    offscreen || bucket.just_reloaded,
                ),
            );
            seen_cross_tile_ids.insert(instance.cross_tile_id);
        }

        bucket.just_reloaded = false;
    }

    /// Ranked anchor candidates for one label: the explicit list, or the
    /// full compass-and-center set when the list starts with `auto`. The
    /// anchor the previous pass chose moves to the front so a label keeps
    /// its position while the viewport moves.
    fn candidate_anchors(
        &self,
        configured: &[DynamicAnchor],
        instance: &SymbolInstance,
    ) -> Vec<Anchor> {
        let mut anchors: Vec<Anchor> = Vec::new();
        if configured.first() == Some(&DynamicAnchor::Auto) {
            let has_icon = instance.num_icon_vertices > 0;
            // Auto mode never centers text directly under an icon.
            anchors.extend(
                AUTO_ANCHORS
                    .iter()
                    .copied()
                    .filter(|anchor| !(has_icon && *anchor == Anchor::Center)),
            );
            for entry in &configured[1..] {
                if *entry == DynamicAnchor::Auto {
                    warn_misplaced_auto();
                }
            }
        } else {
            for entry in configured {
                match entry.fixed() {
                    Some(anchor) => anchors.push(anchor),
                    None => warn_misplaced_auto(),
                }
            }
        }

        if let Some(prev_offset) = self
            .prev_placement
            .as_ref()
            .and_then(|prev| prev.dynamic_offsets.get(&instance.cross_tile_id))
        {
            if let Some(position) = anchors.iter().position(|a| *a == prev_offset.anchor) {
                if position > 0 {
                    let preferred = anchors.remove(position);
                    anchors.insert(0, preferred);
                }
            }
        }
        anchors
    }

    /// Try to place the text box at one anchor: shift the box by the
    /// anchor's alignment transform plus the scaled radial offset (rotated
    /// into map space when the text rotates with the map), then ask the
    /// collision index. On success the offset is recorded and every
    /// justification variant except the chosen one is hidden.
    #[allow(clippy::too_many_arguments)]
    fn attempt_anchor_placement<I: CollisionIndex>(
        &mut self,
        candidate: Anchor,
        text_box: &CollisionBox,
        width: f64,
        height: f64,
        rotate_with_map: bool,
        pitch_with_map: bool,
        text_pixel_ratio: f64,
        pos_matrix: &Mat4,
        group: &CollisionGroup,
        allow_overlap: bool,
        instance: &SymbolInstance,
        bucket: &mut SymbolBucket,
        collision_index: &I,
    ) -> Option<PlacedBox> {
        // Shaping may not have generated this justification at all.
        if justification_index(instance, candidate.justification()) < 0 {
            return None;
        }

        let shift = anchor::variable_layout_shift(
            candidate,
            width,
            height,
            instance.radial_text_offset,
            instance.text_box_scale,
        );
        let shift = if rotate_with_map {
            anchor::rotate_shift(
                shift,
                if pitch_with_map {
                    self.transform.angle
                } else {
                    -self.transform.angle
                },
            )
        } else {
            shift
        };

        let shifted = text_box.shifted(shift.0, shift.1);
        let placed =
            collision_index.place_collision_box(&shifted, allow_overlap, text_pixel_ratio, pos_matrix, group);
        if !placed.is_placed() {
            return None;
        }

        let prev_anchor = self.prev_placement.as_ref().and_then(|prev| {
            let text_placed_before = prev
                .placements
                .get(&instance.cross_tile_id)
                .is_some_and(|joint| joint.text);
            if text_placed_before {
                prev.dynamic_offsets
                    .get(&instance.cross_tile_id)
                    .map(|offset| offset.anchor)
            } else {
                None
            }
        });
        self.dynamic_offsets.insert(
            instance.cross_tile_id,
            DynamicOffset {
                anchor: candidate,
                prev_anchor,
                radial_offset: instance.radial_text_offset,
                width,
                height,
                text_box_scale: instance.text_box_scale,
            },
        );
        mark_used_justification(bucket, candidate, instance);
        Some(placed)
    }

    /// Seal the pass: derive the fade state of every label placed this pass
    /// from the previous placement, keep vanished labels fading out until
    /// hidden, and carry dynamic offsets forward for anything still
    /// visible.
    pub fn commit(&mut self, now: f64) {
        self.commit_time = now;
        let prev_placement = self.prev_placement.take();
        let mut placement_changed = false;

        let increment = match &prev_placement {
            Some(prev) if self.fade_duration != 0.0 => {
                ((now - prev.commit_time) / self.fade_duration) as f32
            }
            _ => 1.0,
        };

        for (&cross_tile_id, joint_placement) in &self.placements {
            let prev_opacity = prev_placement
                .as_ref()
                .and_then(|prev| prev.opacities.get(&cross_tile_id));
            let next = JointOpacityState::transition(
                prev_opacity,
                increment,
                joint_placement.text,
                joint_placement.icon,
                joint_placement.skip_fade,
            );
            placement_changed = placement_changed
                || match prev_opacity {
                    Some(prev) => {
                        joint_placement.text != prev.text.placed
                            || joint_placement.icon != prev.icon.placed
                    }
                    None => joint_placement.text || joint_placement.icon,
                };
            self.opacities.insert(cross_tile_id, next);
        }

        if let Some(prev) = &prev_placement {
            // Labels absent this pass fade toward hidden and are dropped as
            // soon as they get there.
            for (&cross_tile_id, prev_opacity) in &prev.opacities {
                if self.opacities.contains_key(&cross_tile_id) {
                    continue;
                }
                let faded =
                    JointOpacityState::transition(Some(prev_opacity), increment, false, false, false);
                if !faded.is_hidden() {
                    self.opacities.insert(cross_tile_id, faded);
                    placement_changed = placement_changed
                        || prev_opacity.text.placed
                        || prev_opacity.icon.placed;
                }
            }
            for (&cross_tile_id, offset) in &prev.dynamic_offsets {
                if !self.dynamic_offsets.contains_key(&cross_tile_id)
                    && self
                        .opacities
                        .get(&cross_tile_id)
                        .is_some_and(|opacity| !opacity.is_hidden())
                {
                    self.dynamic_offsets.insert(cross_tile_id, *offset);
                }
            }
        }

        self.last_placement_change_time = if placement_changed {
            now
        } else {
            prev_placement
                .as_ref()
                .map_or(now, |prev| prev.last_placement_change_time)
        };
    }

    /// Push the current (possibly still animating) opacity state of a layer
    /// into the render buffers of every tile passed in.
    pub fn update_layer_opacities(&mut self, layer_id: &str, tiles: &mut [Tile]) {
        let mut seen_cross_tile_ids = HashSet::new();
        for tile in tiles {
            let Tile {
                buckets,
                collision_box_array,
                ..
            } = tile;
            if let Some(bucket) = buckets.get_mut(layer_id) {
                self.update_bucket_opacities(bucket, &mut seen_cross_tile_ids, collision_box_array);
            }
        }
    }

    /// Rewrite one bucket's opacity and collision-debug vertex buffers from
    /// the committed fade state, then trigger the bucket's uploads.
    pub fn update_bucket_opacities(
        &mut self,
        bucket: &mut SymbolBucket,
        seen_cross_tile_ids: &mut HashSet<u64>,
        collision_box_array: &CollisionBoxArray,
    ) {
        if bucket.has_text_data() {
            bucket.text.opacity_vertex_array.clear();
        }
        if bucket.has_icon_data() {
            bucket.icon.opacity_vertex_array.clear();
        }
        if let Some(buffers) = &mut bucket.collision_box {
            buffers.collision_vertex_array.clear();
        }
        if let Some(buffers) = &mut bucket.collision_circle {
            buffers.collision_vertex_array.clear();
        }

        let config = bucket.config.clone();
        // A second copy of the same feature within one sweep renders
        // nothing but still counts as consumed.
        let duplicate_opacity_state = JointOpacityState::transition(None, 0.0, false, false, true);
        // Labels that never went through a pass start from whatever their
        // config guarantees instead of waiting a frame.
        let default_text = config.text_allow_overlap
            && (config.icon_allow_overlap || !bucket.has_icon_data() || config.icon_optional);
        let default_icon = config.icon_allow_overlap
            && (config.text_allow_overlap || !bucket.has_text_data() || config.text_optional);
        let default_opacity_state =
            JointOpacityState::transition(None, 0.0, default_text, default_icon, true);

        if bucket.collision_arrays.is_none()
            && (bucket.has_collision_box_data() || bucket.has_collision_circle_data())
        {
            bucket.deserialize_collision_boxes(collision_box_array);
        }

        for index in 0..bucket.symbol_instances.len() {
            let instance = bucket.symbol_instances[index].clone();
            let is_duplicate = seen_cross_tile_ids.contains(&instance.cross_tile_id);
            let opacity_state = if is_duplicate {
                duplicate_opacity_state
            } else if let Some(state) = self.opacities.get(&instance.cross_tile_id) {
                *state
            } else {
                self.opacities
                    .insert(instance.cross_tile_id, default_opacity_state);
                default_opacity_state
            };
            seen_cross_tile_ids.insert(instance.cross_tile_id);

            let has_text = instance.num_horizontal_glyph_vertices > 0
                || instance.num_vertical_glyph_vertices > 0;
            let has_icon = instance.num_icon_vertices > 0;

            if has_text {
                let packed = pack_opacity(opacity_state.text);
                let vertex_count =
                    instance.num_horizontal_glyph_vertices + instance.num_vertical_glyph_vertices;
                for _ in 0..vertex_count {
                    bucket.text.opacity_vertex_array.emplace_back(packed);
                }
                let hidden = opacity_state.text.is_hidden();
                for candidate in [
                    instance.right_justified_text_symbol_index,
                    instance.center_justified_text_symbol_index,
                    instance.left_justified_text_symbol_index,
                    instance.vertical_placed_text_symbol_index,
                ] {
                    if candidate >= 0 {
                        let placed = &mut bucket.text.placed_symbols[candidate as usize];
                        // Hidden when fully faded, or when the anchor search
                        // settled on a different justification variant.
                        placed.hidden = hidden || placed.cross_tile_id == 0;
                    }
                }
            }

            if has_icon {
                let packed = pack_opacity(opacity_state.icon);
                for _ in 0..instance.num_icon_vertices {
                    bucket.icon.opacity_vertex_array.emplace_back(packed);
                }
                if instance.placed_icon_symbol_index >= 0 {
                    bucket.icon.placed_symbols[instance.placed_icon_symbol_index as usize].hidden =
                        opacity_state.icon.is_hidden();
                }
            }

            if bucket.has_collision_box_data() || bucket.has_collision_circle_data() {
                let collision_arrays = bucket
                    .collision_arrays
                    .as_ref()
                    .map(|arrays| arrays[index].clone())
                    .unwrap_or_default();
                let shift = self
                    .dynamic_offsets
                    .get(&instance.cross_tile_id)
                    .map(|offset| {
                        anchor::variable_layout_shift(
                            offset.anchor,
                            offset.width,
                            offset.height,
                            offset.radial_offset,
                            offset.text_box_scale,
                        )
                    })
                    .unwrap_or((0.0, 0.0));

                if collision_arrays.text_box.is_some() {
                    if let Some(buffers) = &mut bucket.collision_box {
                        push_collision_quad(
                            &mut buffers.collision_vertex_array,
                            opacity_state.text.placed,
                            is_duplicate,
                            shift,
                        );
                    }
                }
                if collision_arrays.icon_box.is_some() {
                    if let Some(buffers) = &mut bucket.collision_box {
                        push_collision_quad(
                            &mut buffers.collision_vertex_array,
                            opacity_state.icon.placed,
                            is_duplicate,
                            (0.0, 0.0),
                        );
                    }
                }
                if !collision_arrays.text_circles.is_empty() {
                    if let Some(buffers) = &mut bucket.collision_circle {
                        for _ in &collision_arrays.text_circles {
                            push_collision_quad(
                                &mut buffers.collision_vertex_array,
                                opacity_state.text.placed,
                                is_duplicate,
                                (0.0, 0.0),
                            );
                        }
                    }
                }
            }
        }

        debug_assert!(
            bucket.text.opacity_vertex_array.len() == bucket.text.layout_vertex_count,
            "text opacity buffer out of sync with layout buffer"
        );
        debug_assert!(
            bucket.icon.opacity_vertex_array.len() == bucket.icon.layout_vertex_count,
            "icon opacity buffer out of sync with layout buffer"
        );

        bucket.upload_changed();
    }

    /// Normalized fade progress since the last commit.
    pub fn symbol_fade_change(&self, now: f64) -> f64 {
        if self.fade_duration == 0.0 {
            1.0
        } else {
            (now - self.commit_time) / self.fade_duration
        }
    }

    /// Whether any label is still mid-fade. A stale placement keeps
    /// animating so an abandoned pass does not freeze transitions.
    pub fn has_transitions(&self, now: f64) -> bool {
        self.stale || now - self.last_placement_change_time < self.fade_duration
    }

    pub fn still_recent(&self, now: f64) -> bool {
        self.commit_time + self.fade_duration > now
    }

    /// Mark this placement as superseded mid-computation (viewport moved);
    /// its results stay usable while the successor computes.
    pub fn set_stale(&mut self) {
        self.stale = true;
    }
}

fn justification_index(instance: &SymbolInstance, justification: Justification) -> i32 {
    match justification {
        Justification::Left => instance.left_justified_text_symbol_index,
        Justification::Center => instance.center_justified_text_symbol_index,
        Justification::Right => instance.right_justified_text_symbol_index,
    }
}

/// Keep the chosen justification variant live and zero out the rest so the
/// opacity writeback hides them.
fn mark_used_justification(bucket: &mut SymbolBucket, anchor: Anchor, instance: &SymbolInstance) {
    let used_index = justification_index(instance, anchor.justification());
    let candidates = [
        instance.left_justified_text_symbol_index,
        instance.center_justified_text_symbol_index,
        instance.right_justified_text_symbol_index,
        instance.vertical_placed_text_symbol_index,
    ];
    for candidate in candidates {
        if candidate < 0 {
            continue;
        }
        let placed = &mut bucket.text.placed_symbols[candidate as usize];
        placed.cross_tile_id = if used_index >= 0 && candidate != used_index {
            0
        } else {
            instance.cross_tile_id
        };
    }
}

fn push_collision_quad(
    array: &mut CollisionVertexArray,
    placed: bool,
    not_used: bool,
    shift: (f64, f64),
) {
    let vertex = CollisionVertex {
        placed,
        not_used,
        shift_x: shift.0 as f32,
        shift_y: shift.1 as f32,
    };
    for _ in 0..4 {
        array.emplace_back(vertex);
    }
}
