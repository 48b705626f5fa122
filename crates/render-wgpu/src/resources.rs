use knotlab_common::Extent;
use knotlab_render::Filter;

/// Storage format of every offscreen colour target. Float so bloom sees values above 1.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn extent3d(extent: Extent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: 1,
    }
}

/// A colour texture that can be rendered into and sampled.
pub struct ColorTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub extent: Extent,
    pub filter: Filter,
    pub format: wgpu::TextureFormat,
}

impl ColorTarget {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        extent: Extent,
        filter: Filter,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent3d(extent),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            extent,
            filter,
            format,
        }
    }
}

pub fn create_depth_texture(device: &wgpu::Device, extent: Extent) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: extent3d(extent),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

/// Samplers for both target filters, clamped so refraction offsets never wrap.
pub struct Samplers {
    linear: wgpu::Sampler,
    nearest: wgpu::Sampler,
}

impl Samplers {
    pub fn new(device: &wgpu::Device) -> Self {
        let make = |label: &str, mode: wgpu::FilterMode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: mode,
                min_filter: mode,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            })
        };
        Self {
            linear: make("linear_sampler", wgpu::FilterMode::Linear),
            nearest: make("nearest_sampler", wgpu::FilterMode::Nearest),
        }
    }

    pub fn get(&self, filter: Filter) -> &wgpu::Sampler {
        match filter {
            Filter::Linear => &self.linear,
            Filter::Nearest => &self.nearest,
        }
    }
}

/// 1x1 black texture bound for materials that sample nothing.
pub fn create_fallback_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> ColorTarget {
    let target = ColorTarget::new(
        device,
        "fallback_texture",
        Extent::new(1, 1),
        Filter::Nearest,
        wgpu::TextureFormat::Rgba8Unorm,
    );
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[0, 0, 0, 255],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        extent3d(target.extent),
    );
    target
}
