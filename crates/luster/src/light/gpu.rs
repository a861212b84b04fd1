//! # GPU Layouts — Lights and Clusters as Shader-Visible Structs
//!
//! The shading stage reads lights and cluster lists out of storage buffers.
//! Each struct here mirrors one std430 struct on the shader side, field for
//! field. `#[repr(C)]` fixes the field order and padding, and the `bytemuck`
//! traits `Pod` and `Zeroable` let a `&[GpuAreaLight]` be viewed as `&[u8]`
//! for upload without any copies.
//!
//! Every `vec4` sits on a 16-byte boundary, so scalars are grouped and padded
//! to fill whole 16-byte rows.
//!
//! ```text
//! GpuPointLight (32 bytes)
//! ┌──────────────────────────┬──────────────────────────┐
//! │ position_range           │ color_intensity          │
//! │ xyz view pos, w range    │ rgb, a intensity         │
//! │ offset 0                 │ offset 16                │
//! └──────────────────────────┴──────────────────────────┘
//!
//! GpuAreaLight (240 bytes, 60 floats)
//! ┌─────────────────┬────┬──────┬─────┬──────────┬──────────┬─────────────┬─────────────────┐
//! │ color_intensity │ n  │ two- │ pad │ aabb_min │ aabb_max │ sphere      │ vertices[10]    │
//! │                 │    │ sided│     │          │          │ xyz c, w r  │ view space, w=1 │
//! │ f[0..4]         │f[4]│ f[5] │f[6,7]│ f[8..12] │ f[12..16]│ f[16..20]   │ f[20..60]       │
//! └─────────────────┴────┴──────┴─────┴──────────┴──────────┴─────────────┴─────────────────┘
//!
//! GpuClusterHeader (48 bytes)
//! ┌──────────┬──────────┬─────────────┬────────────┬─────┐
//! │ aabb_min │ aabb_max │ point_count │ area_count │ pad │
//! │ offset 0 │ offset 16│ offset 32   │ offset 36  │ 40  │
//! └──────────┴──────────┴─────────────┴────────────┴─────┘
//! ```
//!
//! `n` and the double-sided flag are `u32`; in a float view of the struct
//! they show up as bit patterns, not numeric values.
//!
//! ## Comparison
//!
//! - **Bevy**: `GpuPointLight` carries range and radius packed into spare
//!   vec4 lanes the same way; cluster lists live in a separate index buffer.
//! - **Filament**: froxel records are 64-bit words of offset and counts, and
//!   record buffers hold 8-bit light indices. Tighter, but caps the light count.

use bytemuck::{Pod, Zeroable};

use super::area::{AreaLight, AreaLightBounds};
use super::shapes::MAX_VERTICES;
use crate::math::{Aabb, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    pub position_range: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl GpuPointLight {
    pub fn new(position_view: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            position_range: position_view.extend(range).to_array(),
            color_intensity: color.extend(intensity).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuAreaLight {
    pub color_intensity: [f32; 4],
    pub vertex_count: u32,
    pub double_sided: u32,
    pub _pad: [u32; 2],
    pub aabb_min: [f32; 4],
    pub aabb_max: [f32; 4],
    pub sphere: [f32; 4],
    pub vertices: [[f32; 4]; MAX_VERTICES],
}

impl GpuAreaLight {
    pub fn new(light: &AreaLight, bounds: &AreaLightBounds) -> Self {
        Self {
            color_intensity: light.color().extend(light.intensity()).to_array(),
            vertex_count: bounds.vertex_count,
            double_sided: light.is_double_sided() as u32,
            _pad: [0; 2],
            aabb_min: bounds.aabb.min.extend(0.0).to_array(),
            aabb_max: bounds.aabb.max.extend(0.0).to_array(),
            sphere: bounds.sphere.center.extend(bounds.sphere.radius).to_array(),
            vertices: bounds.vertices_view.map(|v| v.to_array()),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuClusterHeader {
    pub aabb_min: [f32; 4],
    pub aabb_max: [f32; 4],
    pub point_count: u32,
    pub area_count: u32,
    pub _pad: [u32; 2],
}

impl GpuClusterHeader {
    pub fn new(aabb: &Aabb, point_count: u32, area_count: u32) -> Self {
        Self {
            aabb_min: aabb.min.extend(0.0).to_array(),
            aabb_max: aabb.max.extend(0.0).to_array(),
            point_count,
            area_count,
            _pad: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::area::{AreaLightDesc, Emission};
    use crate::light::shapes::AreaShape;
    use crate::math::Mat4;
    use crate::rng::Rng;

    #[test]
    fn struct_sizes() {
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 32);
        assert_eq!(std::mem::size_of::<GpuAreaLight>(), 240);
        assert_eq!(std::mem::size_of::<GpuClusterHeader>(), 48);
    }

    #[test]
    fn area_light_float_offsets() {
        let mut rng = Rng::from_seed(1);
        let light = AreaLightDesc::new(AreaShape::Pentagon, Vec3::new(0.0, 0.0, -4.0), Vec3::Z)
            .double_sided(true)
            .with_emission(Emission::Rgb {
                color: Vec3::new(0.25, 0.5, 0.75),
                intensity: 6.0,
            })
            .build(&mut rng);
        let bounds = light.view_bounds(&Mat4::IDENTITY, 0.015);
        let gpu = GpuAreaLight::new(&light, &bounds);

        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&gpu));
        let words: &[u32] = bytemuck::cast_slice(std::slice::from_ref(&gpu));
        assert_eq!(floats.len(), 60);
        assert_eq!(&floats[0..4], &[0.25, 0.5, 0.75, 6.0]);
        assert_eq!(words[4], 5);
        assert_eq!(words[5], 1);
        assert_eq!(floats[8], bounds.aabb.min.x);
        assert_eq!(floats[12], bounds.aabb.max.x);
        assert_eq!(floats[19], bounds.sphere.radius);
        // First vertex.
        assert_eq!(&floats[20..24], &bounds.vertices_view[0].to_array());
        assert_eq!(floats[23], 1.0);
    }

    #[test]
    fn point_light_packing() {
        let gpu = GpuPointLight::new(Vec3::new(1.0, 2.0, 3.0), 4.0, Vec3::ONE, 8.0);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&gpu));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 8.0]);
    }
}
