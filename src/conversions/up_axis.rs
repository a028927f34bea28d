use crate::common::types::UpAxis;
use nalgebra as na;
use ndarray as nd;
use ndarray::prelude::*;
use std::f32::consts::FRAC_PI_2;

/// Width of an AMASS pose vector: 3 root + 63 body joint angles.
pub const POSE_WIDTH: usize = 66;

/// Historical padding columns appended to the pose before truncation. They
/// never survive past [`POSE_WIDTH`]; some upstream exporters reserve them
/// for hand joints.
const POSE_PADDING: usize = 6;

/// Change-of-basis rotation from a Y-up world to the target convention.
/// Z-up is reached with +90 degrees about X.
pub fn up_axis_rotation(target: UpAxis) -> na::Rotation3<f32> {
    match target {
        UpAxis::Y => na::Rotation3::identity(),
        UpAxis::Z => na::Rotation3::from_axis_angle(&na::Vector3::x_axis(), FRAC_PI_2),
    }
}

/// Builds the per-frame pose array `[global_orient | body_pose]`, padded and
/// truncated to [`POSE_WIDTH`] columns.
pub fn assemble_poses(global_orient: &Array2<f32>, body_pose: &Array2<f32>) -> Array2<f32> {
    let num_frames = body_pose.nrows();
    let padding = Array2::<f32>::zeros((num_frames, POSE_PADDING));
    let wide = nd::concatenate(
        Axis(1),
        &[global_orient.view(), body_pose.view(), padding.view()],
    )
    .expect("per-frame arrays share the same frame count");
    wide.slice(s![.., ..POSE_WIDTH]).to_owned()
}

/// Replaces the root orientation (first 3 pose components, axis-angle) of
/// every frame with `rotation ∘ root`, leaving the joint angles untouched.
pub fn rotate_root_orientation(poses: &mut Array2<f32>, rotation: &na::Rotation3<f32>) {
    for mut frame in poses.axis_iter_mut(Axis(0)) {
        let root = na::Vector3::new(frame[0], frame[1], frame[2]);
        let recomposed = rotation * na::Rotation3::new(root);
        let axis_angle = recomposed.scaled_axis();
        frame[0] = axis_angle.x;
        frame[1] = axis_angle.y;
        frame[2] = axis_angle.z;
    }
}

/// Rotates every translation row into the new frame: `trans · Rᵀ`.
pub fn rotate_translations(trans: &Array2<f32>, rotation: &na::Rotation3<f32>) -> Array2<f32> {
    let matrix = rotation.matrix();
    let transposed = Array2::from_shape_fn((3, 3), |(i, j)| matrix[(j, i)]);
    trans.dot(&transposed)
}

/// Shifts the Z column by a constant so frame 0 sits exactly at
/// `initial_height`. X and Y are untouched.
pub fn normalize_height(trans: &mut Array2<f32>, initial_height: f32) {
    let offset = trans[(0, 2)] - initial_height;
    trans.column_mut(2).mapv_inplace(|z| z - offset);
}
