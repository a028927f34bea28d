use crate::error::ConvertError;
use candle_core::{pickle, DType, Tensor};
use log::info;
use ndarray as nd;
use ndarray::prelude::*;
use std::{collections::BTreeMap, path::Path};

/// Top-level entry of the torch container holding the SMPL fields.
pub const PARAMS_KEY: &str = "smpl_params_global";

/// Typed view of the input bundle. Required fields are pulled out into
/// per-frame arrays; everything else rides along in `extras` untouched.
#[derive(Debug, Clone)]
pub struct MocapBundle {
    pub global_orient: Array2<f32>, // num_frames x 3
    pub body_pose: Array2<f32>,     // num_frames x 63
    pub trans: Array2<f32>,         // num_frames x 3
    pub betas: Array2<f32>,         // rows x num_betas
    pub extras: BTreeMap<String, ArrayD<f32>>,
}

impl MocapBundle {
    /// Builds the bundle from a named-array mapping, normalizing the
    /// translation field name (`transl` is accepted as an alias of `trans`)
    /// and checking presence and per-frame shapes.
    pub fn from_fields(mut fields: BTreeMap<String, ArrayD<f32>>) -> Result<Self, ConvertError> {
        let body_pose = fields
            .remove("body_pose")
            .ok_or(ConvertError::MissingField("body_pose"))?;
        let global_orient = fields
            .remove("global_orient")
            .ok_or(ConvertError::MissingField("global_orient"))?;

        // frame count comes from the body pose, like the archives this tool
        // was built for
        let num_frames = *body_pose.shape().first().unwrap_or(&0);
        if num_frames == 0 {
            return Err(ConvertError::Shape {
                field: "body_pose",
                expected: "(N, 63) with N > 0".to_string(),
                got: body_pose.shape().to_vec(),
            });
        }
        let body_pose = into_frames(body_pose, "body_pose", num_frames, 63)?;
        let global_orient = into_frames(global_orient, "global_orient", num_frames, 3)?;

        let transl = fields.remove("transl");
        let trans = fields
            .remove("trans")
            .or(transl)
            .ok_or(ConvertError::MissingField("trans"))?;
        let trans = into_frames(trans, "trans", num_frames, 3)?;

        let betas = fields
            .remove("betas")
            .ok_or(ConvertError::MissingField("betas"))?;
        let betas = match betas.ndim() {
            1 => betas.insert_axis(Axis(0)),
            2 => betas,
            _ => {
                return Err(ConvertError::Shape {
                    field: "betas",
                    expected: "(K,) or (rows, K)".to_string(),
                    got: betas.shape().to_vec(),
                })
            }
        }
        .into_dimensionality::<Ix2>()
        .expect("betas normalized to two axes above");

        Ok(Self {
            global_orient,
            body_pose,
            trans,
            betas,
            extras: fields,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.body_pose.nrows()
    }

    /// Shape parameters of frame 0; they are assumed frame-invariant.
    pub fn first_frame_betas(&self) -> Array1<f32> {
        self.betas.row(0).to_owned()
    }
}

/// Reads all tensors under [`PARAMS_KEY`] and coerces them to plain `f32`
/// arrays.
pub fn load_bundle(path: &Path) -> Result<MocapBundle, ConvertError> {
    let tensors = pickle::read_all_with_key(path, Some(PARAMS_KEY))?;
    let mut fields = BTreeMap::new();
    for (name, tensor) in tensors {
        fields.insert(name, tensor_to_array(&tensor)?);
    }
    info!(
        "loaded {} fields from {}: {:?}",
        fields.len(),
        path.display(),
        fields.keys().collect::<Vec<_>>()
    );
    MocapBundle::from_fields(fields)
}

fn tensor_to_array(tensor: &Tensor) -> Result<ArrayD<f32>, ConvertError> {
    let dims = tensor.dims().to_vec();
    let data = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    Ok(ArrayD::from_shape_vec(nd::IxDyn(&dims), data).expect("flattened tensor matches its dims"))
}

fn into_frames(
    array: ArrayD<f32>,
    field: &'static str,
    num_frames: usize,
    cols: usize,
) -> Result<Array2<f32>, ConvertError> {
    let got = array.shape().to_vec();
    if array.len() != num_frames * cols {
        return Err(ConvertError::Shape {
            field,
            expected: format!("({num_frames}, {cols})"),
            got,
        });
    }
    array
        .into_shape_with_order((num_frames, cols))
        .map_err(|_| ConvertError::Shape {
            field,
            expected: format!("({num_frames}, {cols})"),
            got,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(shape: &[usize]) -> ArrayD<f32> {
        ArrayD::zeros(nd::IxDyn(shape))
    }

    fn valid_fields() -> BTreeMap<String, ArrayD<f32>> {
        let mut fields = BTreeMap::new();
        fields.insert("global_orient".to_string(), field(&[2, 3]));
        fields.insert("body_pose".to_string(), field(&[2, 63]));
        fields.insert("transl".to_string(), field(&[2, 3]));
        fields.insert("betas".to_string(), field(&[2, 10]));
        fields
    }

    #[test]
    fn accepts_a_complete_bundle() {
        let bundle = MocapBundle::from_fields(valid_fields()).unwrap();
        assert_eq!(bundle.num_frames(), 2);
        assert_eq!(bundle.trans.dim(), (2, 3));
        assert_eq!(bundle.first_frame_betas().len(), 10);
        assert!(bundle.extras.is_empty());
    }

    #[test]
    fn missing_body_pose_is_reported_by_name() {
        let mut fields = valid_fields();
        fields.remove("body_pose");
        let err = MocapBundle::from_fields(fields).unwrap_err();
        assert!(matches!(err, ConvertError::MissingField("body_pose")));
    }

    #[test]
    fn missing_global_orient_is_reported_by_name() {
        let mut fields = valid_fields();
        fields.remove("global_orient");
        let err = MocapBundle::from_fields(fields).unwrap_err();
        assert!(matches!(err, ConvertError::MissingField("global_orient")));
    }

    #[test]
    fn either_translation_name_works() {
        let fields = valid_fields();
        assert!(MocapBundle::from_fields(fields).is_ok());

        let mut fields = valid_fields();
        let transl = fields.remove("transl").unwrap();
        fields.insert("trans".to_string(), transl);
        assert!(MocapBundle::from_fields(fields).is_ok());

        let mut fields = valid_fields();
        fields.remove("transl");
        let err = MocapBundle::from_fields(fields).unwrap_err();
        assert!(matches!(err, ConvertError::MissingField("trans")));
    }

    #[test]
    fn jointwise_body_pose_is_flattened_per_frame() {
        let mut fields = valid_fields();
        fields.insert("body_pose".to_string(), field(&[2, 21, 3]));
        let bundle = MocapBundle::from_fields(fields).unwrap();
        assert_eq!(bundle.body_pose.dim(), (2, 63));
    }

    #[test]
    fn frame_count_mismatch_is_a_shape_error() {
        let mut fields = valid_fields();
        fields.insert("transl".to_string(), field(&[3, 3]));
        let err = MocapBundle::from_fields(fields).unwrap_err();
        assert!(matches!(err, ConvertError::Shape { field: "trans", .. }));
    }

    #[test]
    fn empty_motion_is_rejected() {
        let mut fields = valid_fields();
        fields.insert("body_pose".to_string(), field(&[0, 63]));
        let err = MocapBundle::from_fields(fields).unwrap_err();
        assert!(matches!(err, ConvertError::Shape { field: "body_pose", .. }));
    }

    #[test]
    fn flat_betas_become_a_single_row() {
        let mut fields = valid_fields();
        fields.insert("betas".to_string(), field(&[10]));
        let bundle = MocapBundle::from_fields(fields).unwrap();
        assert_eq!(bundle.betas.dim(), (1, 10));
    }

    #[test]
    fn unknown_fields_pass_through_as_extras() {
        let mut fields = valid_fields();
        fields.insert("left_hand_pose".to_string(), field(&[2, 45]));
        let bundle = MocapBundle::from_fields(fields).unwrap();
        assert_eq!(bundle.extras.len(), 1);
        assert!(bundle.extras.contains_key("left_hand_pose"));
    }
}
