//! Task runtime port and queue monitoring

pub mod monitor;
pub mod ports;

pub use monitor::QueueMonitor;
pub use ports::{TaskContext, TaskHandler, TaskRuntime};
