// vbtracker_core/src/state/layout.rs

/// The dimension of the body error-state vector.
pub const BODY_STATE_DIM: usize = 12;

/// The dimension of one beacon's position state.
pub const BEACON_STATE_DIM: usize = 3;

/// Body state followed by a single beacon state, as used for one SCAAT correction.
pub const AUGMENTED_STATE_DIM: usize = BODY_STATE_DIM + BEACON_STATE_DIM;

// The body error-state is composed of:
// - Position (3) in the camera frame             indices 0-2
// - Incremental rotation (3, rotation vector)    indices 3-5
// - Linear velocity (3) in the camera frame      indices 6-8
// - Angular velocity (3) in the camera frame     indices 9-11
//
// The incremental rotation is applied on the left of the externalized
// orientation quaternion and folded back into it after every predict/correct,
// so outside of those steps it is always zero.
pub const POSITION: usize = 0;
pub const INCREMENTAL_ROTATION: usize = 3;
pub const LINEAR_VELOCITY: usize = 6;
pub const ANGULAR_VELOCITY: usize = 9;

/// Offset of the beacon block inside the augmented state.
pub const AUGMENTED_BEACON: usize = BODY_STATE_DIM;
