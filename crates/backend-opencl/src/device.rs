//! OpenCL device and command queue

use crate::kernel::OpenCLKernel;
use harp_vex_core::backend::{DeviceContext, Queue};
use harp_vex_core::config::ExecutionConfig;
use ocl::enums::{DeviceInfo, DeviceInfoResult};
use ocl::{Context as OclContext, Device as OclDevice, Platform, Queue as OclQueue};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_QUEUE_ID: AtomicUsize = AtomicUsize::new(1);

/// Error type for OpenCL operations
#[derive(Debug, Clone)]
pub struct OpenCLError(String);

impl fmt::Display for OpenCLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenCL error: {}", self.0)
    }
}

impl std::error::Error for OpenCLError {}

impl From<ocl::Error> for OpenCLError {
    fn from(e: ocl::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<String> for OpenCLError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OpenCLError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// OpenCL device
///
/// Holds the OpenCL platform, device and context together with the
/// device context (kernel cache and execution config) shared by every
/// queue created from it.
#[derive(Clone)]
pub struct OpenCLDevice {
    platform: Platform,
    device: OclDevice,
    ocl_context: OclContext,
    context: Arc<DeviceContext<OpenCLKernel>>,
}

impl OpenCLDevice {
    /// Check whether any OpenCL platform is installed
    pub fn is_available() -> bool {
        !Platform::list().is_empty()
    }

    /// Create a device using the first device of the default platform
    pub fn new() -> Result<Self, OpenCLError> {
        Self::with_device(0)
    }

    /// Create a device for a specific device index of the default platform
    pub fn with_device(device_index: usize) -> Result<Self, OpenCLError> {
        Self::with_config(device_index, ExecutionConfig::from_env())
    }

    /// Create a device with an explicit execution config
    pub fn with_config(device_index: usize, config: ExecutionConfig) -> Result<Self, OpenCLError> {
        let platform = Platform::default();

        let devices = OclDevice::list_all(platform)?;
        if devices.is_empty() {
            return Err("No OpenCL devices found".into());
        }

        let device = devices.get(device_index).cloned().ok_or_else(|| {
            format!(
                "Device index {} out of range (available: {})",
                device_index,
                devices.len()
            )
        })?;

        let ocl_context = OclContext::builder()
            .platform(platform)
            .devices(device)
            .build()?;

        let name = device.name().unwrap_or_else(|e| {
            log::warn!("failed to query OpenCL device name: {}", e);
            "Unknown".to_string()
        });
        log::debug!("opened OpenCL device {}: {}", device_index, name);

        Ok(Self {
            platform,
            device,
            ocl_context,
            context: Arc::new(DeviceContext::new(name, config)),
        })
    }

    /// Create a new in-order command queue on this device
    pub fn queue(&self) -> Result<OpenCLQueue, OpenCLError> {
        let queue = OclQueue::new(&self.ocl_context, self.device, None)?;
        Ok(OpenCLQueue {
            id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
            queue,
            device: self.device,
            ocl_context: self.ocl_context.clone(),
            context: self.context.clone(),
        })
    }

    /// Get the device name
    pub fn device_name(&self) -> &str {
        self.context.name()
    }

    /// Check whether the device supports double precision (`cl_khr_fp64`)
    pub fn supports_f64(&self) -> bool {
        match self.device.info(DeviceInfo::Extensions) {
            Ok(DeviceInfoResult::Extensions(s)) => s.contains("cl_khr_fp64"),
            _ => false,
        }
    }

    /// Get the OpenCL platform
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Get the device context (kernel cache and config)
    pub fn context(&self) -> &Arc<DeviceContext<OpenCLKernel>> {
        &self.context
    }

    /// List the names of all devices of the default platform
    pub fn list_devices() -> Result<Vec<String>, OpenCLError> {
        let platform = Platform::default();
        let devices = OclDevice::list_all(platform)?;

        devices
            .iter()
            .map(|d| d.name().map_err(OpenCLError::from))
            .collect()
    }
}

impl fmt::Debug for OpenCLDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenCLDevice")
            .field("context", &self.context)
            .finish()
    }
}

/// OpenCL command queue
///
/// Clones refer to the same underlying queue.
#[derive(Clone)]
pub struct OpenCLQueue {
    id: usize,
    queue: OclQueue,
    device: OclDevice,
    ocl_context: OclContext,
    context: Arc<DeviceContext<OpenCLKernel>>,
}

impl OpenCLQueue {
    /// Get the OpenCL command queue
    pub fn ocl_queue(&self) -> &OclQueue {
        &self.queue
    }

    /// Get the OpenCL device
    pub fn ocl_device(&self) -> OclDevice {
        self.device
    }

    /// Get the OpenCL context
    pub fn ocl_context(&self) -> &OclContext {
        &self.ocl_context
    }
}

impl Queue for OpenCLQueue {
    type Kernel = OpenCLKernel;
    type Error = OpenCLError;

    fn queue_id(&self) -> usize {
        self.id
    }

    fn context(&self) -> &Arc<DeviceContext<OpenCLKernel>> {
        &self.context
    }

    fn finish(&self) -> Result<(), OpenCLError> {
        self.queue.finish()?;
        Ok(())
    }
}

impl fmt::Debug for OpenCLQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenCLQueue")
            .field("id", &self.id)
            .field("device", &self.context.name())
            .finish()
    }
}

// Safety: OpenCL contexts and command queues are thread-safe
unsafe impl Send for OpenCLDevice {}
unsafe impl Sync for OpenCLDevice {}
unsafe impl Send for OpenCLQueue {}
unsafe impl Sync for OpenCLQueue {}
