use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::HashSet;
use std::hint::black_box;

use symbol_placement::EXTENT;
use symbol_placement::bucket::{
    LineVertex, OverscaledTileId, PlacedSymbol, SymbolBucket, SymbolInstance, Tile,
};
use symbol_placement::collision::{
    CollisionBox, CollisionCircle, CollisionGroup, CollisionIndex, PlacedBox, PlacedCircles,
    SerializedCollisionBox,
};
use symbol_placement::config::{PlacementConfig, SymbolLayerConfig};
use symbol_placement::placement::Placement;
use symbol_placement::projection::{Mat4, Transform};

const VIEW: f64 = 1000.0;
const PADDING: f64 = 100.0;

#[derive(Default)]
struct BruteForceIndex {
    boxes: Vec<([f64; 4], u16, bool)>,
}

impl BruteForceIndex {
    fn project(collision_box: &CollisionBox, ratio: f64) -> [f64; 4] {
        let anchor_x = collision_box.anchor_x * ratio;
        let anchor_y = collision_box.anchor_y * ratio;
        [
            anchor_x + collision_box.x1,
            anchor_y + collision_box.y1,
            anchor_x + collision_box.x2,
            anchor_y + collision_box.y2,
        ]
    }
}

impl CollisionIndex for BruteForceIndex {
    fn place_collision_box(
        &self,
        collision_box: &CollisionBox,
        allow_overlap: bool,
        text_pixel_ratio: f64,
        _pos_matrix: &Mat4,
        group: &CollisionGroup,
    ) -> PlacedBox {
        let b = Self::project(collision_box, text_pixel_ratio);
        if b[2] < -PADDING || b[0] > VIEW + PADDING || b[3] < -PADDING || b[1] > VIEW + PADDING {
            return PlacedBox {
                screen_box: None,
                offscreen: true,
            };
        }
        if !allow_overlap {
            for (existing, existing_group, ignore) in &self.boxes {
                if !ignore
                    && group.allows(*existing_group)
                    && b[0] < existing[2]
                    && existing[0] < b[2]
                    && b[1] < existing[3]
                    && existing[1] < b[3]
                {
                    return PlacedBox {
                        screen_box: None,
                        offscreen: false,
                    };
                }
            }
        }
        PlacedBox {
            offscreen: b[2] < 0.0 || b[0] > VIEW || b[3] < 0.0 || b[1] > VIEW,
            screen_box: Some(b),
        }
    }

    fn place_collision_circles(
        &self,
        circles: &[CollisionCircle],
        _allow_overlap: bool,
        _scale: f64,
        text_pixel_ratio: f64,
        _placed_symbol: &PlacedSymbol,
        _line_vertices: &[LineVertex],
        _glyph_offsets: &[f32],
        _font_size: f64,
        _pos_matrix: &Mat4,
        _label_plane_matrix: &Mat4,
        _show_collision_circles: bool,
        _pitch_with_map: bool,
        _group: &CollisionGroup,
    ) -> PlacedCircles {
        PlacedCircles {
            screen_circles: circles
                .iter()
                .map(|c| [c.x * text_pixel_ratio, c.y * text_pixel_ratio, c.radius])
                .collect(),
            offscreen: false,
        }
    }

    fn insert_collision_box(
        &mut self,
        screen_box: [f64; 4],
        ignore_placement: bool,
        _bucket_instance_id: u32,
        _feature_index: usize,
        group_id: u16,
    ) {
        self.boxes.push((screen_box, group_id, ignore_placement));
    }

    fn insert_collision_circles(
        &mut self,
        _screen_circles: &[[f64; 3]],
        _ignore_placement: bool,
        _bucket_instance_id: u32,
        _feature_index: usize,
        _group_id: u16,
    ) {
    }
}

/// A tile with `count` labels spread over a grid, dense enough that a share
/// of them collide.
fn dense_tile(count: usize, bucket_instance_id: u32) -> Tile {
    let per_row = (count as f64).sqrt().ceil() as usize;
    let step = VIEW / per_row as f64;
    let mut instances = Vec::with_capacity(count);
    let mut boxes = Vec::with_capacity(count);
    for i in 0..count {
        let row = i / per_row;
        let col = i % per_row;
        boxes.push(SerializedCollisionBox {
            anchor_x: col as f64 * step + step * 0.5,
            anchor_y: row as f64 * step + step * 0.5,
            x1: -step * 0.65,
            y1: -step * 0.2,
            x2: step * 0.65,
            y2: step * 0.2,
            radius: 0.0,
            feature_index: i,
        });
        instances.push(SymbolInstance {
            cross_tile_id: (bucket_instance_id as u64) << 32 | (i as u64 + 1),
            num_horizontal_glyph_vertices: 16,
            center_justified_text_symbol_index: i as i32,
            text_box_start_index: i,
            text_box_end_index: i + 1,
            icon_box_start_index: i + 1,
            icon_box_end_index: i + 1,
            ..Default::default()
        });
    }

    let mut bucket = SymbolBucket::new(
        bucket_instance_id,
        "labels",
        "source",
        SymbolLayerConfig::default(),
    );
    bucket.text.placed_symbols = vec![PlacedSymbol::default(); count];
    bucket.text.layout_vertex_count = count * 16;
    bucket.symbol_instances = instances;

    let id = OverscaledTileId {
        overscaled_z: 0,
        wrap: 0,
        z: 0,
        x: 0,
        y: 0,
    };
    let mut tile = Tile::new(id, EXTENT);
    tile.collision_box_array = boxes;
    tile.add_bucket(bucket);
    tile
}

fn bench_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_layer_tile");
    let config = PlacementConfig::default();
    for count in [256usize, 1024, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut tile = dense_tile(count, 1);
                let transform = Transform::new(0.0, 0.0, 0.0, VIEW, VIEW);
                let mut placement = Placement::new(transform, &config, None);
                let mut index = BruteForceIndex::default();
                let mut seen = HashSet::new();
                placement.place_layer_tile(
                    "labels",
                    black_box(&mut tile),
                    &mut index,
                    false,
                    &mut seen,
                );
                placement.commit(0.0);
                black_box(placement.placements.len());
            });
        });
    }
    group.finish();
}

fn bench_opacity_writeback(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_layer_opacities");
    let config = PlacementConfig::default();
    for count in [256usize, 1024, 4096] {
        let mut tiles = vec![dense_tile(count, 1)];
        let transform = Transform::new(0.0, 0.0, 0.0, VIEW, VIEW);
        let mut placement = Placement::new(transform, &config, None);
        let mut index = BruteForceIndex::default();
        let mut seen = HashSet::new();
        placement.place_layer_tile("labels", &mut tiles[0], &mut index, false, &mut seen);
        placement.commit(0.0);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                placement.update_layer_opacities("labels", black_box(&mut tiles));
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_place, bench_opacity_writeback
);
criterion_main!(benches);
