//! Parametric body model capability.
//!
//! The evaluator only needs "pose parameters in, vertices out". The
//! [`SkinnedBodyModel`] implementation covers that with rigid linear blend
//! skinning over the SMPL-X kinematic tree; pose and expression correctives
//! are not applied.

use std::fs::File;
use std::path::Path;

use nalgebra::{Matrix4, Rotation3, Vector3, Vector4};
use ndarray::{Array2, Array3, Axis};
use ndarray_npy::NpzReader;
use tracing::{info, warn};

use signpose_models::{FrameParams, HAND_DIM, NUM_BETAS, NUM_EXPRESSION_COEFFS};

use crate::error::{MediaError, MediaResult};

/// Joints in the SMPL-X kinematic tree.
pub const SMPLX_NUM_JOINTS: usize = 55;
/// Body joints excluding the root.
pub const SMPLX_BODY_JOINTS: usize = 21;
const BODY_POSE_DIM: usize = SMPLX_BODY_JOINTS * 3;

/// Inputs for one forward evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyModelInput {
    pub global_orient: [f32; 3],
    pub body_pose: Vec<f32>,
    pub left_hand_pose: Vec<f32>,
    pub right_hand_pose: Vec<f32>,
    pub betas: [f32; NUM_BETAS],
    pub expression: [f32; NUM_EXPRESSION_COEFFS],
}

impl BodyModelInput {
    /// Input for a processed frame with neutral shape and expression.
    pub fn from_params(params: &FrameParams) -> Self {
        Self {
            global_orient: params.global_orient,
            body_pose: params.body_pose.clone(),
            left_hand_pose: params.left_hand_pose.clone(),
            right_hand_pose: params.right_hand_pose.clone(),
            betas: [0.0; NUM_BETAS],
            expression: [0.0; NUM_EXPRESSION_COEFFS],
        }
    }

    /// Same input with both hands in the zero pose.
    pub fn with_neutral_hands(&self) -> Self {
        Self {
            left_hand_pose: vec![0.0; HAND_DIM],
            right_hand_pose: vec![0.0; HAND_DIM],
            ..self.clone()
        }
    }

    fn validate(&self) -> MediaResult<()> {
        if self.body_pose.len() != BODY_POSE_DIM {
            return Err(MediaError::model_evaluation(format!(
                "body pose has {} values, expected {}",
                self.body_pose.len(),
                BODY_POSE_DIM
            )));
        }
        if self.left_hand_pose.len() != HAND_DIM || self.right_hand_pose.len() != HAND_DIM {
            return Err(MediaError::model_evaluation("hand pose must have 45 values"));
        }
        let all_finite = self
            .global_orient
            .iter()
            .chain(&self.body_pose)
            .chain(&self.left_hand_pose)
            .chain(&self.right_hand_pose)
            .chain(&self.betas)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(MediaError::model_evaluation("non-finite pose parameter"));
        }
        Ok(())
    }

    /// Axis-angle per joint in SMPL-X order: root, body, jaw, eyes, hands.
    fn full_pose(&self) -> Vec<Vector3<f32>> {
        let triples = |values: &[f32]| -> Vec<Vector3<f32>> {
            values
                .chunks_exact(3)
                .map(|c| Vector3::new(c[0], c[1], c[2]))
                .collect()
        };

        let mut pose = Vec::with_capacity(SMPLX_NUM_JOINTS);
        pose.push(Vector3::from(self.global_orient));
        pose.extend(triples(&self.body_pose));
        // jaw, left eye, right eye
        pose.extend([Vector3::zeros(); 3]);
        pose.extend(triples(&self.left_hand_pose));
        pose.extend(triples(&self.right_hand_pose));
        pose
    }
}

/// Posed mesh for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyMesh {
    /// `[V, 3]` vertex positions.
    pub vertices: Array2<f32>,
    /// `[J, 3]` posed joint positions.
    pub joints: Array2<f32>,
}

impl BodyMesh {
    pub fn vertex_rows(&self) -> Vec<[f32; 3]> {
        rows_to_triples(&self.vertices)
    }

    pub fn joint_rows(&self) -> Vec<[f32; 3]> {
        rows_to_triples(&self.joints)
    }
}

fn rows_to_triples(array: &Array2<f32>) -> Vec<[f32; 3]> {
    array
        .axis_iter(Axis(0))
        .map(|row| [row[0], row[1], row[2]])
        .collect()
}

/// Forward evaluation of a parametric body model.
pub trait BodyModel: Send + Sync {
    /// Pose the mesh. Fails on invalid or numerically broken input.
    fn evaluate(&self, input: &BodyModelInput) -> MediaResult<BodyMesh>;

    /// `[F, 3]` triangle vertex indices.
    fn faces(&self) -> &Array2<u32>;
}

/// SMPL-X style model posed by linear blend skinning.
#[derive(Debug, Clone)]
pub struct SkinnedBodyModel {
    v_template: Array2<f32>,
    faces: Array2<u32>,
    parents: Vec<Option<usize>>,
    joint_regressor: Array2<f32>,
    weights: Array2<f32>,
    shape_dirs: Option<Array3<f32>>,
}

impl SkinnedBodyModel {
    /// Load from an SMPL-X `.npz` file.
    pub fn from_npz(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::model_not_found(path.display().to_string()));
        }

        let mut npz = NpzReader::new(File::open(path)?)?;
        let v_template: Array2<f32> = npz.by_name("v_template")?;
        let faces: Array2<u32> = npz.by_name("f")?;
        let kintree: Array2<i32> = npz.by_name("kintree_table")?;
        let joint_regressor: Array2<f32> = npz.by_name("J_regressor")?;
        let weights: Array2<f32> = npz.by_name("weights")?;
        let shape_dirs: Option<Array3<f32>> = npz.by_name("shapedirs").ok();
        if shape_dirs.is_none() {
            warn!("No shapedirs in body model; betas are ignored");
        }

        let num_joints = kintree.ncols();
        let parents = kintree
            .row(0)
            .iter()
            .map(|&p| usize::try_from(p).ok().filter(|&p| p < num_joints))
            .collect();

        let model = Self::from_parts(v_template, faces, parents, joint_regressor, weights, shape_dirs)?;
        info!(
            path = %path.display(),
            vertices = model.num_vertices(),
            faces = model.faces.nrows(),
            "Loaded body model"
        );
        Ok(model)
    }

    /// Build from arrays, checking that all shapes agree.
    pub fn from_parts(
        v_template: Array2<f32>,
        faces: Array2<u32>,
        parents: Vec<Option<usize>>,
        joint_regressor: Array2<f32>,
        weights: Array2<f32>,
        shape_dirs: Option<Array3<f32>>,
    ) -> MediaResult<Self> {
        let invalid = |msg: String| MediaError::Npz(format!("invalid body model: {}", msg));
        let num_vertices = v_template.nrows();

        if v_template.ncols() != 3 {
            return Err(invalid("v_template must be [V, 3]".into()));
        }
        if parents.len() != SMPLX_NUM_JOINTS {
            return Err(invalid(format!(
                "expected {} joints, found {}",
                SMPLX_NUM_JOINTS,
                parents.len()
            )));
        }
        if parents[0].is_some() {
            return Err(invalid("joint 0 must be the root".into()));
        }
        for (i, parent) in parents.iter().enumerate().skip(1) {
            match parent {
                Some(p) if *p < i => {}
                _ => return Err(invalid(format!("joint {} has no earlier parent", i))),
            }
        }
        if joint_regressor.dim() != (SMPLX_NUM_JOINTS, num_vertices) {
            return Err(invalid("J_regressor must be [J, V]".into()));
        }
        if weights.dim() != (num_vertices, SMPLX_NUM_JOINTS) {
            return Err(invalid("weights must be [V, J]".into()));
        }
        if faces.ncols() != 3 || faces.iter().any(|&i| i as usize >= num_vertices) {
            return Err(invalid("faces must be [F, 3] indexing existing vertices".into()));
        }
        if let Some(dirs) = &shape_dirs {
            let (v, c, _) = dirs.dim();
            if v != num_vertices || c != 3 {
                return Err(invalid("shapedirs must be [V, 3, B]".into()));
            }
        }

        Ok(Self {
            v_template,
            faces,
            parents,
            joint_regressor,
            weights,
            shape_dirs,
        })
    }

    pub fn num_vertices(&self) -> usize {
        self.v_template.nrows()
    }

    fn shaped_vertices(&self, betas: &[f32]) -> Array2<f32> {
        let mut shaped = self.v_template.clone();
        if let Some(dirs) = &self.shape_dirs {
            let used = dirs.dim().2.min(betas.len());
            for (b, beta) in betas.iter().take(used).enumerate() {
                if *beta != 0.0 {
                    shaped.scaled_add(*beta, &dirs.index_axis(Axis(2), b));
                }
            }
        }
        shaped
    }
}

impl BodyModel for SkinnedBodyModel {
    fn evaluate(&self, input: &BodyModelInput) -> MediaResult<BodyMesh> {
        input.validate()?;

        let shaped = self.shaped_vertices(&input.betas);
        let rest_joints = self.joint_regressor.dot(&shaped);
        let pose = input.full_pose();

        let joint_at = |i: usize| {
            Vector3::new(rest_joints[[i, 0]], rest_joints[[i, 1]], rest_joints[[i, 2]])
        };

        // World transform of every joint along the kinematic chain.
        let mut world: Vec<Matrix4<f32>> = Vec::with_capacity(SMPLX_NUM_JOINTS);
        for (i, axis_angle) in pose.iter().enumerate() {
            let rotation = Rotation3::new(*axis_angle).to_homogeneous();
            let local = match self.parents[i] {
                None => Matrix4::new_translation(&joint_at(i)) * rotation,
                Some(p) => {
                    let offset = joint_at(i) - joint_at(p);
                    world[p] * Matrix4::new_translation(&offset) * rotation
                }
            };
            world.push(local);
        }

        let mut posed_joints = Array2::zeros((SMPLX_NUM_JOINTS, 3));
        for (i, transform) in world.iter().enumerate() {
            for c in 0..3 {
                posed_joints[[i, c]] = transform[(c, 3)];
            }
        }

        // Skinning transforms relative to the rest pose.
        let skinning: Vec<Matrix4<f32>> = world
            .iter()
            .enumerate()
            .map(|(i, g)| g * Matrix4::new_translation(&(-joint_at(i))))
            .collect();

        let mut vertices = Array2::zeros(shaped.raw_dim());
        for (v, rest) in shaped.axis_iter(Axis(0)).enumerate() {
            let mut blended = Matrix4::zeros();
            for (j, &w) in self.weights.row(v).iter().enumerate() {
                if w != 0.0 {
                    blended += skinning[j] * w;
                }
            }
            let p = blended * Vector4::new(rest[0], rest[1], rest[2], 1.0);
            vertices[[v, 0]] = p.x;
            vertices[[v, 1]] = p.y;
            vertices[[v, 2]] = p.z;
        }

        if vertices.iter().any(|v: &f32| !v.is_finite()) {
            return Err(MediaError::model_evaluation("skinning produced non-finite vertices"));
        }

        Ok(BodyMesh {
            vertices,
            joints: posed_joints,
        })
    }

    fn faces(&self) -> &Array2<u32> {
        &self.faces
    }
}
