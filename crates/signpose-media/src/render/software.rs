//! CPU rasterizer: z-buffered triangles with two-sided Lambert shading.

use image::{Rgb, RgbImage};
use nalgebra::{Point3, Vector3};
use ndarray::{Array2, Axis};

use super::{Camera, DirectionalLight, Rasterizer, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};
use crate::body_model::BodyMesh;
use crate::error::{MediaError, MediaResult};

const AMBIENT: f32 = 0.25;

#[derive(Debug, Clone)]
pub struct SoftwareRasterizer {
    width: u32,
    height: u32,
    background: [u8; 3],
    base_color: [f32; 3],
}

impl Default for SoftwareRasterizer {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
            background: [255, 255, 255],
            base_color: [0.62, 0.62, 0.66],
        }
    }
}

impl SoftwareRasterizer {
    pub fn new(width: u32, height: u32) -> MediaResult<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::internal(format!(
                "invalid viewport {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            ..Self::default()
        })
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn shade(&self, normal: Option<Vector3<f32>>, light: &DirectionalLight) -> Rgb<u8> {
        let diffuse = normal
            .map(|n| n.dot(&-light.direction).abs() * light.intensity)
            .unwrap_or(light.intensity * 0.5);

        let mut px = [0u8; 3];
        for c in 0..3 {
            let lit = self.base_color[c] * (AMBIENT + diffuse * light.color[c] * 0.5);
            px[c] = (lit.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        Rgb(px)
    }
}

struct DepthBuffer {
    width: u32,
    depth: Vec<f32>,
}

impl DepthBuffer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            depth: vec![f32::INFINITY; (width * height) as usize],
        }
    }

    /// Record `z` at `(x, y)` if it is nearer than what is there.
    fn test_and_set(&mut self, x: u32, y: u32, z: f32) -> bool {
        let slot = &mut self.depth[(y * self.width + x) as usize];
        if z < *slot {
            *slot = z;
            true
        } else {
            false
        }
    }
}

fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(
        &self,
        mesh: &BodyMesh,
        faces: &Array2<u32>,
        camera: &Camera,
        light: &DirectionalLight,
    ) -> MediaResult<RgbImage> {
        let (width, height) = (self.width, self.height);
        let mut image = RgbImage::from_pixel(width, height, Rgb(self.background));
        let mut zbuf = DepthBuffer::new(width, height);

        let world: Vec<Point3<f32>> = mesh
            .vertices
            .axis_iter(Axis(0))
            .map(|v| Point3::new(v[0], v[1], v[2]))
            .collect();
        let projected: Vec<Option<(f32, f32, f32)>> = world
            .iter()
            .map(|p| camera.project(*p, width, height))
            .collect();

        if faces.nrows() == 0 {
            let color = self.shade(None, light);
            for (x, y, z) in projected.iter().flatten() {
                if *x >= 0.0 && *y >= 0.0 && *x < width as f32 && *y < height as f32 {
                    let (px, py) = (*x as u32, *y as u32);
                    if zbuf.test_and_set(px, py, *z) {
                        image.put_pixel(px, py, color);
                    }
                }
            }
            return Ok(image);
        }

        for face in faces.axis_iter(Axis(0)) {
            let idx = [face[0] as usize, face[1] as usize, face[2] as usize];
            if idx.iter().any(|&i| i >= world.len()) {
                return Err(MediaError::internal("face index out of range"));
            }
            let (Some(a), Some(b), Some(c)) = (projected[idx[0]], projected[idx[1]], projected[idx[2]]) else {
                continue;
            };

            let area = edge((a.0, a.1), (b.0, b.1), (c.0, c.1));
            if area.abs() < f32::EPSILON {
                continue;
            }

            let normal = (world[idx[1]] - world[idx[0]])
                .cross(&(world[idx[2]] - world[idx[0]]))
                .try_normalize(f32::EPSILON);
            let color = self.shade(normal, light);

            let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as u32;
            let max_x = a.0.max(b.0).max(c.0).ceil().min(width as f32 - 1.0);
            let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as u32;
            let max_y = a.1.max(b.1).max(c.1).ceil().min(height as f32 - 1.0);
            if max_x < 0.0 || max_y < 0.0 {
                continue;
            }

            for py in min_y..=max_y as u32 {
                for px in min_x..=max_x as u32 {
                    let p = (px as f32 + 0.5, py as f32 + 0.5);
                    let w0 = edge((b.0, b.1), (c.0, c.1), p) / area;
                    let w1 = edge((c.0, c.1), (a.0, a.1), p) / area;
                    let w2 = edge((a.0, a.1), (b.0, b.1), p) / area;
                    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                        continue;
                    }
                    let z = w0 * a.2 + w1 * b.2 + w2 * c.2;
                    if zbuf.test_and_set(px, py, z) {
                        image.put_pixel(px, py, color);
                    }
                }
            }
        }

        Ok(image)
    }
}
