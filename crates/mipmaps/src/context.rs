//! Explicitly owned GPU handle for compute work.
//!
//! Callers construct a context, hand it to whatever needs the GPU and shut
//! it down when done. There is no process-wide device.

use crate::BackendError;

#[derive(Debug, Clone)]
pub struct ComputeContextConfig {
    pub label: String,
    pub power_preference: wgpu::PowerPreference,
    pub force_fallback_adapter: bool,
}

impl Default for ComputeContextConfig {
    fn default() -> Self {
        Self {
            label: "mipmaps.compute_context".to_owned(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}

#[derive(Debug)]
pub struct ComputeContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: Option<wgpu::AdapterInfo>,
    owns_device: bool,
    shut_down: bool,
}

impl ComputeContext {
    /// Requests a headless adapter and device, blocking until both exist.
    pub fn new_blocking(config: &ComputeContextConfig) -> Result<Self, BackendError> {
        pollster::block_on(Self::new(config))
    }

    pub async fn new(config: &ComputeContextConfig) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: None,
                force_fallback_adapter: config.force_fallback_adapter,
            })
            .await
            .map_err(|error| BackendError::AdapterUnavailable(error.to_string()))?;
        let adapter_info = adapter.get_info();
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(&config.label),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|error| BackendError::DeviceRequest(error.to_string()))?;
        log::info!(
            "compute context ready: adapter={} backend={:?}",
            adapter_info.name,
            adapter_info.backend
        );
        Ok(Self {
            device,
            queue,
            adapter_info: Some(adapter_info),
            owns_device: true,
            shut_down: false,
        })
    }

    /// Wraps a device the host already owns. Shutdown then only drains
    /// outstanding work; the device itself stays alive for the host.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            adapter_info: None,
            owns_device: false,
            shut_down: false,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> Option<&wgpu::AdapterInfo> {
        self.adapter_info.as_ref()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub(crate) fn ensure_live(&self) -> Result<(), BackendError> {
        if self.shut_down {
            return Err(BackendError::ContextShutDown);
        }
        Ok(())
    }

    /// Blocks until all submitted work has finished.
    pub(crate) fn wait_idle(&self) -> Result<(), BackendError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|error| BackendError::DevicePoll(error.to_string()))
    }

    /// Drains outstanding work and destroys an owned device. Every resource
    /// made from this context becomes invalid afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        if let Err(error) = self.wait_idle() {
            log::warn!("compute context shutdown: {error}");
        }
        if self.owns_device {
            self.device.destroy();
        }
        self.shut_down = true;
        log::info!("compute context shut down");
    }
}

impl Drop for ComputeContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
