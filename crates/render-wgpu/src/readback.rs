use crate::GpuError;
use knotlab_common::Extent;

const BYTES_PER_PIXEL: u32 = 4;

/// Bytes per row of a texture-to-buffer copy, rounded up to the copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Strip row padding, converting BGRA to RGBA when `bgra` is set.
pub fn unpad_rows(data: &[u8], extent: Extent, padded_row: u32, bgra: bool) -> Vec<u8> {
    let row = (extent.width * BYTES_PER_PIXEL) as usize;
    let mut pixels = Vec::with_capacity(row * extent.height as usize);
    for y in 0..extent.height as usize {
        let start = y * padded_row as usize;
        pixels.extend_from_slice(&data[start..start + row]);
    }
    if bgra {
        for px in pixels.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }
    pixels
}

fn is_bgra(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

/// Size of the staging buffer needed to read back `extent`.
pub fn readback_size(extent: Extent) -> u64 {
    padded_bytes_per_row(extent.width) as u64 * extent.height as u64
}

/// Copy an 8-bit RGBA or BGRA texture back to the CPU as tightly packed RGBA8.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    extent: Extent,
    format: wgpu::TextureFormat,
) -> Result<Vec<u8>, GpuError> {
    let padded_row = padded_bytes_per_row(extent.width);
    let size = readback_size(extent);
    let max = device.limits().max_buffer_size;
    if size > max {
        return Err(GpuError::CaptureTooLarge {
            extent,
            bytes: size,
            max,
        });
    }
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_buffer"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(extent.height),
            },
        },
        wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::Maintain::Wait);
    rx.recv().map_err(|_| GpuError::ReadbackLost)??;

    let pixels = {
        let data = slice.get_mapped_range();
        unpad_rows(&data, extent, padded_row, is_bgra(format))
    };
    staging.unmap();
    Ok(pixels)
}
