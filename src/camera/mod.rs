mod builder;
mod handle;
mod interface;
mod simulated;

pub use builder::{connect, CameraDeviceBuilder};
pub use handle::DeviceHandle;
pub use interface::*;
pub use simulated::{DeviceCall, SimulatedCamera, SimulatedMonitor};
