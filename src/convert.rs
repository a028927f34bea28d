use crate::{
    codec::{
        npz::{AmassCodec, MOCAP_FRAMERATE},
        pt::{load_bundle, MocapBundle},
    },
    common::types::{Gender, UpAxis},
    conversions::up_axis::{
        assemble_poses, normalize_height, rotate_root_orientation, rotate_translations,
        up_axis_rotation,
    },
    error::ConvertError,
};
use log::info;
use std::{
    io,
    path::{Path, PathBuf},
};

/// What a successful conversion produced, for callers and for logging.
#[derive(Debug)]
pub struct ConvertSummary {
    pub num_frames: usize,
    pub num_betas: usize,
    pub output: PathBuf,
}

/// Converts one `.pt` bundle into one `.npz` archive. The motion is rotated
/// from Y-up into Z-up and the first frame's root is pinned at
/// `initial_height` meters.
pub fn convert(
    input: &Path,
    output: &Path,
    initial_height: f32,
) -> Result<ConvertSummary, ConvertError> {
    if !input.exists() {
        return Err(ConvertError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input file not found: {}", input.display()),
        )));
    }
    let bundle = load_bundle(input)?;
    let codec = transform_bundle(bundle, initial_height);
    info!(
        "poses constructed: {:?}, betas: {:?}, gender: {}",
        codec.poses.dim(),
        codec.betas.dim(),
        codec.gender
    );
    let output = codec.to_file(output)?;
    Ok(ConvertSummary {
        num_frames: codec.poses.nrows(),
        num_betas: codec.betas.len(),
        output,
    })
}

/// The in-memory half of the pipeline: pose assembly, the change-of-basis
/// rotation, height normalization, output field migration.
pub fn transform_bundle(bundle: MocapBundle, initial_height: f32) -> AmassCodec {
    let rotation = up_axis_rotation(UpAxis::Z);

    let mut poses = assemble_poses(&bundle.global_orient, &bundle.body_pose);
    rotate_root_orientation(&mut poses, &rotation);

    let mut trans = rotate_translations(&bundle.trans, &rotation);
    normalize_height(&mut trans, initial_height);

    AmassCodec {
        poses,
        trans,
        betas: bundle.first_frame_betas(),
        mocap_framerate: MOCAP_FRAMERATE,
        gender: Gender::Neutral,
        extras: bundle.extras,
    }
}
