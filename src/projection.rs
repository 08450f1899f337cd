// Minimal column-major matrix plumbing for the label plane. The full
// camera/projection stack lives in the host renderer; placement only needs
// to combine host-provided matrices and express the two label-plane
// variants (map-pitched vs. viewport-aligned).

use crate::EXTENT;

/// Column-major 4x4 matrix, matching the host renderer's GL conventions.
pub type Mat4 = [f64; 16];

pub fn identity() -> Mat4 {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    m
}

pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            let mut sum = 0.0;
            for k in 0..4 {
                sum += a[k * 4 + row] * b[col * 4 + k];
            }
            out[col * 4 + row] = sum;
        }
    }
    out
}

pub fn scale(m: &Mat4, sx: f64, sy: f64, sz: f64) -> Mat4 {
    let mut out = *m;
    for row in 0..4 {
        out[row] *= sx;
        out[4 + row] *= sy;
        out[8 + row] *= sz;
    }
    out
}

pub fn rotate_z(m: &Mat4, rad: f64) -> Mat4 {
    let (sin, cos) = rad.sin_cos();
    let mut rotation = identity();
    rotation[0] = cos;
    rotation[1] = sin;
    rotation[4] = -sin;
    rotation[5] = cos;
    multiply(m, &rotation)
}

/// Transform a point, dropping the perspective divide (the label plane is
/// affine for the cases placement cares about).
pub fn transform_point(m: &Mat4, x: f64, y: f64) -> (f64, f64) {
    (
        m[0] * x + m[4] * y + m[12],
        m[1] * x + m[5] * y + m[13],
    )
}

/// Immutable snapshot of the viewport taken when a placement pass starts.
/// The host computes `label_plane_matrix` (the viewport-aligned plane) from
/// its projection stack; placement never recomputes camera math.
#[derive(Debug, Clone)]
pub struct Transform {
    pub zoom: f64,
    /// Bearing in radians.
    pub angle: f64,
    /// Pitch in radians.
    pub pitch: f64,
    pub width: f64,
    pub height: f64,
    pub label_plane_matrix: Mat4,
}

impl Transform {
    pub fn new(zoom: f64, angle: f64, pitch: f64, width: f64, height: f64) -> Self {
        Self {
            zoom,
            angle,
            pitch,
            width,
            height,
            label_plane_matrix: identity(),
        }
    }
}

/// Tile units covered by one screen pixel for a tile rendered at
/// `tile_size * zoom_scale` screen pixels.
pub fn pixels_to_tile_units(tile_size: f64, zoom_scale: f64) -> f64 {
    EXTENT / (tile_size * zoom_scale)
}

/// Matrix that maps tile coordinates into the plane glyphs are laid out in.
///
/// Pitch-aligned labels live in tile space scaled to pixels (optionally
/// counter-rotated so they stay screen-upright); viewport-aligned labels go
/// through the transform's own label plane.
pub fn label_plane_matrix(
    pos_matrix: &Mat4,
    pitch_with_map: bool,
    rotate_with_map: bool,
    transform: &Transform,
    pixels_to_tile_units: f64,
) -> Mat4 {
    if pitch_with_map {
        let mut m = scale(
            &identity(),
            1.0 / pixels_to_tile_units,
            1.0 / pixels_to_tile_units,
            1.0,
        );
        if !rotate_with_map {
            m = rotate_z(&m, transform.angle);
        }
        m
    } else {
        multiply(&transform.label_plane_matrix, pos_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_multiplication_is_neutral() {
        let m = scale(&identity(), 2.0, 3.0, 1.0);
        let out = multiply(&identity(), &m);
        assert_eq!(out, m);
    }

    #[test]
    fn scale_applies_per_axis() {
        let m = scale(&identity(), 2.0, 3.0, 1.0);
        let (x, y) = transform_point(&m, 5.0, 7.0);
        assert_eq!((x, y), (10.0, 21.0));
    }

    #[test]
    fn rotate_z_quarter_turn_moves_x_to_y() {
        let m = rotate_z(&identity(), std::f64::consts::FRAC_PI_2);
        let (x, y) = transform_point(&m, 1.0, 0.0);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pixels_to_tile_units_halves_with_doubled_scale() {
        let base = pixels_to_tile_units(512.0, 1.0);
        let zoomed = pixels_to_tile_units(512.0, 2.0);
        assert!((base - 2.0 * zoomed).abs() < 1e-12);
    }

    #[test]
    fn pitched_label_plane_scales_tile_units_to_pixels() {
        let transform = Transform::new(14.0, 0.0, 0.6, 1024.0, 768.0);
        let ptu = 4.0;
        let m = label_plane_matrix(&identity(), true, true, &transform, ptu);
        let (x, _) = transform_point(&m, 8.0, 0.0);
        assert!((x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn pitched_plane_counter_rotates_when_viewport_aligned() {
        let transform = Transform::new(14.0, std::f64::consts::FRAC_PI_2, 0.0, 1024.0, 768.0);
        let rotated = label_plane_matrix(&identity(), true, false, &transform, 1.0);
        let (x, y) = transform_point(&rotated, 1.0, 0.0);
        assert!(x.abs() < 1e-9);
        assert!((y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn viewport_plane_composes_with_pos_matrix() {
        let mut transform = Transform::new(10.0, 0.0, 0.0, 800.0, 600.0);
        transform.label_plane_matrix = scale(&identity(), 0.5, 0.5, 1.0);
        let pos = scale(&identity(), 4.0, 4.0, 1.0);
        let m = label_plane_matrix(&pos, false, false, &transform, 1.0);
        let (x, y) = transform_point(&m, 1.0, 1.0);
        assert_eq!((x, y), (2.0, 2.0));
    }
}
