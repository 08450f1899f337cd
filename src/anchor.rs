// Anchor geometry for dynamic label placement: alignment of a text box
// around its anchor point, decomposition of the user's radial offset, and
// the justification each anchor implies.

use serde::{Deserialize, Serialize};

/// A concrete anchor position for a label relative to its feature point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    Center,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// One entry of the `dynamic-text-anchor` layout property. `Auto` expands to
/// the full candidate set and is only valid as the first entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicAnchor {
    Auto,
    Center,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl DynamicAnchor {
    pub fn fixed(self) -> Option<Anchor> {
        match self {
            DynamicAnchor::Auto => None,
            DynamicAnchor::Center => Some(Anchor::Center),
            DynamicAnchor::Left => Some(Anchor::Left),
            DynamicAnchor::Right => Some(Anchor::Right),
            DynamicAnchor::Top => Some(Anchor::Top),
            DynamicAnchor::Bottom => Some(Anchor::Bottom),
            DynamicAnchor::TopLeft => Some(Anchor::TopLeft),
            DynamicAnchor::TopRight => Some(Anchor::TopRight),
            DynamicAnchor::BottomLeft => Some(Anchor::BottomLeft),
            DynamicAnchor::BottomRight => Some(Anchor::BottomRight),
        }
    }
}

/// Candidate order used when the anchor list starts with `auto`. Edge
/// anchors are preferred over corners; `center` is dropped from this set
/// when the label also carries an icon.
pub const AUTO_ANCHORS: [Anchor; 9] = [
    Anchor::Center,
    Anchor::Top,
    Anchor::Bottom,
    Anchor::Left,
    Anchor::Right,
    Anchor::TopLeft,
    Anchor::TopRight,
    Anchor::BottomLeft,
    Anchor::BottomRight,
];

/// Fractional alignment of a text box against its anchor point:
/// 0 = the box's left/top edge sits at the anchor, 1 = right/bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorAlignment {
    pub horizontal: f64,
    pub vertical: f64,
}

/// Text justification implied by a placed anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Justification {
    Left,
    Center,
    Right,
}

impl Anchor {
    pub fn alignment(self) -> AnchorAlignment {
        let horizontal = match self {
            Anchor::Left | Anchor::TopLeft | Anchor::BottomLeft => 0.0,
            Anchor::Right | Anchor::TopRight | Anchor::BottomRight => 1.0,
            _ => 0.5,
        };
        let vertical = match self {
            Anchor::Top | Anchor::TopLeft | Anchor::TopRight => 0.0,
            Anchor::Bottom | Anchor::BottomLeft | Anchor::BottomRight => 1.0,
            _ => 0.5,
        };
        AnchorAlignment {
            horizontal,
            vertical,
        }
    }

    /// A label anchored on its right side reads best right-justified, and
    /// symmetrically for the left; everything else centers.
    pub fn justification(self) -> Justification {
        match self {
            Anchor::Right | Anchor::TopRight | Anchor::BottomRight => Justification::Right,
            Anchor::Left | Anchor::TopLeft | Anchor::BottomLeft => Justification::Left,
            _ => Justification::Center,
        }
    }
}

/// Decompose the user's scalar radial offset into an x/y displacement away
/// from the anchor point. Corner anchors sit on the 45-degree diagonal, so
/// each axis receives `offset / sqrt(2)`; edge anchors receive the full
/// offset on their single axis. Screen y grows downward.
pub fn evaluate_radial_offset(anchor: Anchor, radial_offset: f64) -> (f64, f64) {
    let diagonal = radial_offset / std::f64::consts::SQRT_2;
    match anchor {
        Anchor::Center => (0.0, 0.0),
        Anchor::Left => (radial_offset, 0.0),
        Anchor::Right => (-radial_offset, 0.0),
        Anchor::Top => (0.0, radial_offset),
        Anchor::Bottom => (0.0, -radial_offset),
        Anchor::TopLeft => (diagonal, diagonal),
        Anchor::TopRight => (-diagonal, diagonal),
        Anchor::BottomLeft => (diagonal, -diagonal),
        Anchor::BottomRight => (-diagonal, -diagonal),
    }
}

/// Pixel shift that moves a centered collision box to the position the given
/// anchor implies: alignment transform of the box center plus the scaled
/// radial offset.
pub fn variable_layout_shift(
    anchor: Anchor,
    width: f64,
    height: f64,
    radial_offset: f64,
    text_box_scale: f64,
) -> (f64, f64) {
    let alignment = anchor.alignment();
    let shift_x = -(alignment.horizontal - 0.5) * width;
    let shift_y = -(alignment.vertical - 0.5) * height;
    let (offset_x, offset_y) = evaluate_radial_offset(anchor, radial_offset);
    (
        shift_x + offset_x * text_box_scale,
        shift_y + offset_y * text_box_scale,
    )
}

/// Rotate a shift vector by `angle` radians (counter-clockwise in screen
/// space), used to carry a viewport-space shift into map space.
pub fn rotate_shift(shift: (f64, f64), angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (
        shift.0 * cos - shift.1 * sin,
        shift.0 * sin + shift.1 * cos,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_anchor_has_no_shift() {
        let shift = variable_layout_shift(Anchor::Center, 40.0, 10.0, 3.0, 2.0);
        assert_eq!(shift, (0.0, 0.0));
    }

    #[test]
    fn left_anchor_shifts_box_right_of_point() {
        let (x, y) = variable_layout_shift(Anchor::Left, 40.0, 10.0, 0.0, 1.0);
        assert!(x > 0.0, "left-anchored box must sit right of the anchor");
        assert_eq!(y, 0.0);
        assert!((x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn radial_offset_uses_diagonal_rule_for_corners() {
        let (x, y) = evaluate_radial_offset(Anchor::TopLeft, 2.0);
        let expected = 2.0 / std::f64::consts::SQRT_2;
        assert!((x - expected).abs() < 1e-9);
        assert!((y - expected).abs() < 1e-9);

        let (x, y) = evaluate_radial_offset(Anchor::Right, 2.0);
        assert_eq!((x, y), (-2.0, 0.0));
    }

    #[test]
    fn justification_follows_anchor_side() {
        assert_eq!(Anchor::TopRight.justification(), Justification::Right);
        assert_eq!(Anchor::BottomLeft.justification(), Justification::Left);
        assert_eq!(Anchor::Top.justification(), Justification::Center);
    }

    #[test]
    fn rotate_shift_quarter_turn() {
        let (x, y) = rotate_shift((1.0, 0.0), std::f64::consts::FRAC_PI_2);
        assert!(x.abs() < 1e-9);
        assert!((y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dynamic_anchor_auto_has_no_fixed_form() {
        assert_eq!(DynamicAnchor::Auto.fixed(), None);
        assert_eq!(DynamicAnchor::TopLeft.fixed(), Some(Anchor::TopLeft));
    }

    #[test]
    fn dynamic_anchor_parses_kebab_case() {
        let parsed: DynamicAnchor = serde_json::from_str("\"top-left\"").expect("parse failed");
        assert_eq!(parsed, DynamicAnchor::TopLeft);
        let parsed: DynamicAnchor = serde_json::from_str("\"auto\"").expect("parse failed");
        assert_eq!(parsed, DynamicAnchor::Auto);
    }
}
