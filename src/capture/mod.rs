mod adapter;
mod device;
pub mod mock;
mod session;
#[cfg(test)]
mod tests;

pub use adapter::CaptureAdapter;
pub use device::{DeviceHandle, DeviceProvider, DeviceRequest, VideoConstraints};
pub use mock::MockDeviceProvider;
pub use session::{CaptureMode, CaptureSession, CapturedClip, CapturedStill};
