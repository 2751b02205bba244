//! Prometheus metrics for key generation.
//!
//! # Metrics Exposed
//!
//! - `gpu_keygen_generations_total` - Keys generated successfully
//! - `gpu_keygen_failures_total{category}` - Failed generations by error category
//! - `gpu_keygen_programs_built_total` - Kernel programs built
//! - `gpu_keygen_kernel_launches_total` - Kernel launches completed
//! - `gpu_keygen_bytes_to_device_total` - Bytes copied host to device
//! - `gpu_keygen_bytes_from_device_total` - Bytes copied device to host
//! - `gpu_keygen_buffers_wiped_total` - Device buffers overwritten and freed
//!
//! # Example
//!
//! ```no_run
//! use gpu_keygen::{FileConfig, KeyGenerator};
//! use gpu_keygen::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let generator = KeyGenerator::from_config(&FileConfig::default()).expect("device");
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! registry.update(&MetricsSnapshot::from_components(&generator));
//! println!("{}", registry.encode().expect("encode"));
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
