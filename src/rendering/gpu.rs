//! wgpu instance, adapter and device setup.

use std::sync::Arc;

use winit::window::Window;

use crate::error::ResourceError;

/// Device and queue shared by the renderer and the presentation sink
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// Offscreen context for record mode; no window or surface.
    pub fn headless() -> Result<Self, ResourceError> {
        pollster::block_on(Self::request(new_instance(), None))
    }

    /// Context plus a presentation surface for `window`
    pub fn for_window(
        window: Arc<Window>,
    ) -> Result<(Self, wgpu::Surface<'static>), ResourceError> {
        let instance = new_instance();

        // Surface borrows the window for 'static via the Arc
        let surface = instance.create_surface(window)?;
        let gpu = pollster::block_on(Self::request(instance, Some(&surface)))?;
        if !gpu.adapter.is_surface_supported(&surface) {
            return Err(ResourceError::SurfaceUnsupported);
        }
        Ok((gpu, surface))
    }

    async fn request(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'static>>,
    ) -> Result<Self, ResourceError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ResourceError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("GPU: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Frame errors are captured with error scopes; anything else is logged
        device.on_uncaptured_error(Box::new(|err| {
            log::error!("Uncaptured GPU error: {}", err);
        }));

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }
}

fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}
