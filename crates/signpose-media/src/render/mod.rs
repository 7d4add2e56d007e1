//! Offscreen rendering of posed meshes.

pub mod software;

pub use software::SoftwareRasterizer;

use std::f32::consts::PI;
use std::sync::Arc;

use image::RgbImage;
use nalgebra::{Point3, Vector3};
use ndarray::Array2;

use crate::body_model::BodyMesh;
use crate::error::MediaResult;

/// Default viewport width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 640;
/// Default viewport height in pixels.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 480;

/// Perspective camera looking down -z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    /// Vertical field of view in radians.
    pub yfov: f32,
    pub znear: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, -0.2, 2.0),
            yfov: PI / 5.0,
            znear: 0.05,
        }
    }
}

impl Camera {
    /// Project a world point to pixel coordinates and view depth.
    ///
    /// Returns `None` for points at or behind the near plane.
    pub fn project(&self, point: Point3<f32>, width: u32, height: u32) -> Option<(f32, f32, f32)> {
        let view = point - self.position;
        let depth = -view.z;
        if depth <= self.znear {
            return None;
        }

        let focal = 1.0 / (self.yfov / 2.0).tan();
        let aspect = width as f32 / height as f32;
        let ndc_x = focal / aspect * view.x / depth;
        let ndc_y = focal * view.y / depth;

        let x = (ndc_x + 1.0) * 0.5 * width as f32;
        let y = (1.0 - ndc_y) * 0.5 * height as f32;
        Some((x, y, depth))
    }
}

/// Directional light co-located with the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels.
    pub direction: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vector3::new(0.0, 0.0, -1.0),
            color: [1.0, 1.0, 1.0],
            intensity: 2.0,
        }
    }
}

/// Turns a posed mesh into an RGB image.
pub trait Rasterizer: Send + Sync {
    fn rasterize(
        &self,
        mesh: &BodyMesh,
        faces: &Array2<u32>,
        camera: &Camera,
        light: &DirectionalLight,
    ) -> MediaResult<RgbImage>;
}

/// Camera, light and rasterizer, built once and reused for every frame.
#[derive(Clone)]
pub struct RenderContext {
    pub camera: Camera,
    pub light: DirectionalLight,
    rasterizer: Arc<dyn Rasterizer>,
}

impl RenderContext {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            camera: Camera::default(),
            light: DirectionalLight::default(),
            rasterizer,
        }
    }

    pub fn render(&self, mesh: &BodyMesh, faces: &Array2<u32>) -> MediaResult<RgbImage> {
        self.rasterizer.rasterize(mesh, faces, &self.camera, &self.light)
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("camera", &self.camera)
            .field("light", &self.light)
            .finish_non_exhaustive()
    }
}
