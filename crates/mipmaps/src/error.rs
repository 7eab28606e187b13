use thiserror::Error;
use tile_protocol::ConfigError;

#[derive(Debug, Error)]
pub enum MipmapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("mipmap backend failure: {0}")]
    Backend(#[from] BackendError),
}

/// GPU-side failures. Fatal for the call that hit them; nothing retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("no compatible GPU adapter: {0}")]
    AdapterUnavailable(String),
    #[error("GPU device request failed: {0}")]
    DeviceRequest(String),
    #[error("GPU validation error: {0}")]
    Validation(String),
    #[error("GPU out of memory: {0}")]
    OutOfMemory(String),
    #[error("readback buffer map failed: {0}")]
    BufferMap(String),
    #[error("device poll failed: {0}")]
    DevicePoll(String),
    #[error("compute context has been shut down")]
    ContextShutDown,
}

impl From<wgpu::Error> for BackendError {
    fn from(error: wgpu::Error) -> Self {
        match &error {
            wgpu::Error::OutOfMemory { .. } => BackendError::OutOfMemory(error.to_string()),
            _ => BackendError::Validation(error.to_string()),
        }
    }
}
