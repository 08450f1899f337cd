use crate::placement::Placement;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct PlacementDump {
    pub commit_time: f64,
    pub last_placement_change_time: f64,
    pub fade_duration: f64,
    pub stale: bool,
    pub labels: Vec<LabelDump>,
    pub retained_buckets: Vec<RetainedBucketDump>,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub cross_tile_id: u64,
    pub text_opacity: Option<f32>,
    pub text_placed: Option<bool>,
    pub icon_opacity: Option<f32>,
    pub icon_placed: Option<bool>,
    pub skip_fade: Option<bool>,
    pub anchor: Option<String>,
    pub prev_anchor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RetainedBucketDump {
    pub bucket_instance_id: u32,
    pub source_layer_index: usize,
    pub bucket_index: usize,
    pub overscaled_z: u8,
    pub wrap: i32,
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl PlacementDump {
    pub fn from_placement(placement: &Placement) -> Self {
        let mut ids: Vec<u64> = placement
            .opacities
            .keys()
            .chain(placement.placements.keys())
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let labels = ids
            .into_iter()
            .map(|cross_tile_id| {
                let opacity = placement.opacities.get(&cross_tile_id);
                let joint = placement.placements.get(&cross_tile_id);
                let offset = placement.dynamic_offsets.get(&cross_tile_id);
                LabelDump {
                    cross_tile_id,
                    text_opacity: opacity.map(|state| state.text.opacity),
                    text_placed: opacity.map(|state| state.text.placed),
                    icon_opacity: opacity.map(|state| state.icon.opacity),
                    icon_placed: opacity.map(|state| state.icon.placed),
                    skip_fade: joint.map(|joint| joint.skip_fade),
                    anchor: offset.map(|offset| format!("{:?}", offset.anchor)),
                    prev_anchor: offset
                        .and_then(|offset| offset.prev_anchor)
                        .map(|anchor| format!("{anchor:?}")),
                }
            })
            .collect();

        let mut retained_buckets: Vec<RetainedBucketDump> = placement
            .retained_query_data
            .values()
            .map(|data| RetainedBucketDump {
                bucket_instance_id: data.bucket_instance_id,
                source_layer_index: data.source_layer_index,
                bucket_index: data.bucket_index,
                overscaled_z: data.tile_id.overscaled_z,
                wrap: data.tile_id.wrap,
                z: data.tile_id.z,
                x: data.tile_id.x,
                y: data.tile_id.y,
            })
            .collect();
        retained_buckets.sort_by_key(|bucket| bucket.bucket_instance_id);

        PlacementDump {
            commit_time: placement.commit_time,
            last_placement_change_time: placement.last_placement_change_time,
            fade_duration: placement.fade_duration,
            stale: placement.stale,
            labels,
            retained_buckets,
        }
    }
}

pub fn write_placement_dump(path: &Path, placement: &Placement) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = PlacementDump::from_placement(placement);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
