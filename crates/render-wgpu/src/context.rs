use crate::GpuError;

/// Adapter, device and queue shared by the backend and any overlay renderer.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    /// Device without a window, for offscreen rendering.
    pub fn headless() -> Result<Self, GpuError> {
        Self::new(Self::create_instance(), None)
    }

    /// Pick an adapter able to present to `surface` when one is given.
    ///
    /// Texture and buffer size limits are raised to what the adapter supports
    /// so exports and their readbacks can go well beyond the window size.
    pub fn new(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let supported = adapter.limits();
        let required_limits = wgpu::Limits {
            max_buffer_size: supported.max_buffer_size,
            ..wgpu::Limits::default().using_resolution(supported)
        };
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("knotlab_device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let info = adapter.get_info();
        tracing::info!(
            "GPU initialized with {} backend on {}",
            info.backend.to_str(),
            info.name
        );
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn max_buffer_size(&self) -> u64 {
        self.device.limits().max_buffer_size
    }
}
