//! Surface textures: image loading, mip chains and the texture bind group

use std::path::{Path, PathBuf};

use image::RgbaImage;
use relief_core::{ReliefError, Result};
use wgpu::util::DeviceExt;

use crate::bindings::TextureSlot;
use crate::resource::GpuBindGroup;

/// Decode any image the `image` crate understands into RGBA8
pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|e| ReliefError::resource_load(path, e))?;
    let rgba = img.into_rgba8();
    log::debug!(
        "Loaded texture {} ({}x{})",
        path.display(),
        rgba.width(),
        rgba.height()
    );
    Ok(rgba)
}

pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Level 0 followed by successive half-size reductions down to 1x1
pub fn mip_chain(base: &RgbaImage) -> Vec<RgbaImage> {
    let levels = mip_level_count(base.width(), base.height());
    let mut chain = Vec::with_capacity(levels as usize);
    chain.push(base.clone());
    for _ in 1..levels {
        let prev = &chain[chain.len() - 1];
        let w = (prev.width() / 2).max(1);
        let h = (prev.height() / 2).max(1);
        let next = image::imageops::resize(prev, w, h, image::imageops::FilterType::Triangle);
        chain.push(next);
    }
    chain
}

/// A mipmapped texture with its view and sampler
pub struct SurfaceTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl SurfaceTexture {
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        slot: TextureSlot,
    ) -> Self {
        let chain = mip_chain(image);
        let data: Vec<u8> = chain.iter().flat_map(|level| level.as_raw().iter().copied()).collect();

        let format = if slot.is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(slot.label()),
                size: wgpu::Extent3d {
                    width: image.width().max(1),
                    height: image.height().max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: chain.len() as u32,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", slot.label())),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// Image files for each texture slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacePaths {
    pub color: PathBuf,
    pub normal: PathBuf,
    pub gloss: PathBuf,
}

impl SurfacePaths {
    pub fn get(&self, slot: TextureSlot) -> &Path {
        match slot {
            TextureSlot::Color => &self.color,
            TextureSlot::Normal => &self.normal,
            TextureSlot::Gloss => &self.gloss,
        }
    }
}

/// Decoded images for each texture slot
#[derive(Debug, Clone)]
pub struct SurfaceImages {
    pub color: RgbaImage,
    pub normal: RgbaImage,
    pub gloss: RgbaImage,
}

impl SurfaceImages {
    /// Decode all three images; nothing is returned unless every one loads
    pub fn load(paths: &SurfacePaths) -> Result<Self> {
        Ok(Self {
            color: load_rgba(&paths.color)?,
            normal: load_rgba(&paths.normal)?,
            gloss: load_rgba(&paths.gloss)?,
        })
    }

    /// 1x1 defaults: white albedo, straight-up normal, matte
    pub fn flat() -> Self {
        let pixel = |c: [u8; 4]| RgbaImage::from_pixel(1, 1, image::Rgba(c));
        Self {
            color: pixel([255, 255, 255, 255]),
            normal: pixel([128, 128, 255, 255]),
            gloss: pixel([0, 0, 0, 255]),
        }
    }

    pub fn get(&self, slot: TextureSlot) -> &RgbaImage {
        match slot {
            TextureSlot::Color => &self.color,
            TextureSlot::Normal => &self.normal,
            TextureSlot::Gloss => &self.gloss,
        }
    }
}

/// The three surface textures and the bind group exposing them
pub struct SurfaceTextures {
    textures: [SurfaceTexture; TextureSlot::COUNT],
    group: GpuBindGroup,
}

impl SurfaceTextures {
    pub fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = TextureSlot::ALL
            .into_iter()
            .flat_map(|slot| [texture_entry(slot.texture_binding()), sampler_entry(slot.sampler_binding())])
            .collect();
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Surface Texture Bind Group Layout"),
            entries: &entries,
        })
    }

    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        images: &SurfaceImages,
    ) -> Self {
        let textures =
            TextureSlot::ALL.map(|slot| SurfaceTexture::from_image(device, queue, images.get(slot), slot));
        let group = create_group(device, layout, &textures);
        Self { textures, group }
    }

    /// Swap one slot's image, rebuilding the bind group around it
    pub fn replace(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        slot: TextureSlot,
        image: &RgbaImage,
    ) {
        self.textures[slot.unit() as usize] = SurfaceTexture::from_image(device, queue, image, slot);
        self.group = create_group(device, layout, &self.textures);
    }

    pub fn group(&self) -> &GpuBindGroup {
        &self.group
    }

    pub fn texture(&self, slot: TextureSlot) -> &SurfaceTexture {
        &self.textures[slot.unit() as usize]
    }
}

fn create_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    textures: &[SurfaceTexture; TextureSlot::COUNT],
) -> GpuBindGroup {
    let entries: Vec<wgpu::BindGroupEntry> = TextureSlot::ALL
        .into_iter()
        .flat_map(|slot| {
            let tex = &textures[slot.unit() as usize];
            [
                wgpu::BindGroupEntry {
                    binding: slot.texture_binding(),
                    resource: wgpu::BindingResource::TextureView(&tex.view),
                },
                wgpu::BindGroupEntry {
                    binding: slot.sampler_binding(),
                    resource: wgpu::BindingResource::Sampler(&tex.sampler),
                },
            ]
        })
        .collect();

    GpuBindGroup::new(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Surface Texture Bind Group"),
        layout,
        entries: &entries,
    }))
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}
