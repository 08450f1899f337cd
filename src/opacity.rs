// Per-label fade state and the packed vertex encoding consumed by the
// symbol shaders. Pure value types; the transition rule is the only logic.

use serde::Serialize;

/// Fade state for one part (text or icon) of a label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpacityState {
    pub opacity: f32,
    pub placed: bool,
}

impl OpacityState {
    /// Initial state for a label with no fade history. Labels that were
    /// offscreen when placed (`skip_fade`) become visible immediately so they
    /// do not fade in while the user pans them into view.
    pub fn initial(placed: bool, skip_fade: bool) -> Self {
        Self {
            opacity: if skip_fade && placed { 1.0 } else { 0.0 },
            placed,
        }
    }

    /// Advance the fade by `increment` (elapsed time over fade duration).
    /// The opacity ramps toward 1 while the previous state was placed and
    /// toward 0 while it was not; `skip_fade` only applies when there is no
    /// previous state.
    pub fn transition(
        prev: Option<&OpacityState>,
        increment: f32,
        placed: bool,
        skip_fade: bool,
    ) -> Self {
        match prev {
            None => Self::initial(placed, skip_fade),
            Some(prev) => Self {
                opacity: (prev.opacity + if prev.placed { increment } else { -increment })
                    .clamp(0.0, 1.0),
                placed,
            },
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.opacity == 0.0 && !self.placed
    }
}

/// Paired text/icon fade state for one label, advanced with a shared
/// increment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointOpacityState {
    pub text: OpacityState,
    pub icon: OpacityState,
}

impl JointOpacityState {
    pub fn transition(
        prev: Option<&JointOpacityState>,
        increment: f32,
        place_text: bool,
        place_icon: bool,
        skip_fade: bool,
    ) -> Self {
        Self {
            text: OpacityState::transition(prev.map(|p| &p.text), increment, place_text, skip_fade),
            icon: OpacityState::transition(prev.map(|p| &p.icon), increment, place_icon, skip_fade),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.text.is_hidden() && self.icon.is_hidden()
    }
}

/// The outcome of one placement pass for one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JointPlacement {
    pub text: bool,
    pub icon: bool,
    /// Set for labels that were offscreen at placement time or whose bucket
    /// was just reloaded; such labels must not re-trigger a fade-in.
    pub skip_fade: bool,
}

impl JointPlacement {
    pub fn new(text: bool, icon: bool, skip_fade: bool) -> Self {
        Self {
            text,
            icon,
            skip_fade,
        }
    }
}

/// Pack an opacity state into the 32-bit vertex attribute.
///
/// The opacity is quantized to 7 bits and paired with the placed bit; the
/// 8-bit pair is replicated four times (bit positions 25/24, 17/16, 9/8,
/// 1/0), one copy per vertex of a glyph quad, since all four vertices of a
/// quad share the same opacity.
pub fn pack_opacity(state: OpacityState) -> u32 {
    if state.opacity == 0.0 && !state.placed {
        return 0;
    }
    if state.opacity == 1.0 && state.placed {
        return u32::MAX;
    }
    let placed_bit = state.placed as u32;
    let opacity_bits = (state.opacity * 127.0).floor() as u32;
    opacity_bits << 25
        | placed_bit << 24
        | opacity_bits << 17
        | placed_bit << 16
        | opacity_bits << 9
        | placed_bit << 8
        | opacity_bits << 1
        | placed_bit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_invisible_unless_fade_is_skipped() {
        let faded_in = OpacityState::initial(true, false);
        assert_eq!(faded_in.opacity, 0.0);
        assert!(faded_in.placed);

        let immediate = OpacityState::initial(true, true);
        assert_eq!(immediate.opacity, 1.0);

        let skip_without_placement = OpacityState::initial(false, true);
        assert_eq!(
            skip_without_placement.opacity, 0.0,
            "skip_fade must not make an unplaced label visible"
        );
    }

    #[test]
    fn transition_ramps_toward_previous_placed_flag() {
        let prev = OpacityState {
            opacity: 0.5,
            placed: true,
        };
        let up = OpacityState::transition(Some(&prev), 0.2, true, false);
        assert!((up.opacity - 0.7).abs() < 1e-6);

        let prev = OpacityState {
            opacity: 0.5,
            placed: false,
        };
        let down = OpacityState::transition(Some(&prev), 0.2, true, false);
        assert!((down.opacity - 0.3).abs() < 1e-6);
    }

    #[test]
    fn transition_clamps_to_unit_interval() {
        let prev = OpacityState {
            opacity: 0.9,
            placed: true,
        };
        let state = OpacityState::transition(Some(&prev), 5.0, true, false);
        assert_eq!(state.opacity, 1.0);

        let prev = OpacityState {
            opacity: 0.1,
            placed: false,
        };
        let state = OpacityState::transition(Some(&prev), 5.0, false, false);
        assert_eq!(state.opacity, 0.0);
    }

    #[test]
    fn hidden_means_transparent_and_unplaced() {
        assert!(
            OpacityState {
                opacity: 0.0,
                placed: false
            }
            .is_hidden()
        );
        assert!(
            !OpacityState {
                opacity: 0.0,
                placed: true
            }
            .is_hidden()
        );
        assert!(
            !OpacityState {
                opacity: 0.3,
                placed: false
            }
            .is_hidden()
        );
    }

    #[test]
    fn joint_state_is_hidden_only_when_both_parts_are() {
        let hidden = JointOpacityState::transition(None, 1.0, false, false, false);
        assert!(hidden.is_hidden());

        let icon_only = JointOpacityState::transition(None, 1.0, false, true, true);
        assert!(!icon_only.is_hidden());
    }

    #[test]
    fn pack_opacity_shortcut_values() {
        assert_eq!(
            pack_opacity(OpacityState {
                opacity: 0.0,
                placed: false
            }),
            0
        );
        assert_eq!(
            pack_opacity(OpacityState {
                opacity: 1.0,
                placed: true
            }),
            4294967295
        );
    }

    #[test]
    fn pack_opacity_replicates_lanes() {
        let packed = pack_opacity(OpacityState {
            opacity: 0.5,
            placed: true,
        });
        let expected_opacity = (0.5f32 * 127.0).floor() as u32;
        for lane_shift in [24, 16, 8, 0] {
            let lane = (packed >> lane_shift) & 0xff;
            assert_eq!(lane & 1, 1, "placed bit missing in lane {lane_shift}");
            assert_eq!(
                lane >> 1,
                expected_opacity,
                "opacity bits wrong in lane {lane_shift}"
            );
        }
    }

    #[test]
    fn pack_opacity_unplaced_fadeout_keeps_lanes_consistent() {
        let packed = pack_opacity(OpacityState {
            opacity: 0.25,
            placed: false,
        });
        let first = packed & 0xff;
        for lane_shift in [8, 16, 24] {
            assert_eq!((packed >> lane_shift) & 0xff, first);
        }
        assert_eq!(first & 1, 0);
    }
}
