//! Metrics collection and registry.

use crate::keygen::KeyGenerator;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of generator state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Completed generations.
    pub generations: u64,
    /// Failed generations by error category.
    pub failures: BTreeMap<&'static str, u64>,
    /// Kernel programs built.
    pub programs_built: u64,
    /// Kernel launches completed.
    pub kernel_launches: u64,
    /// Bytes copied host to device.
    pub bytes_to_device: u64,
    /// Bytes copied device to host.
    pub bytes_from_device: u64,
    /// Device buffers overwritten and freed.
    pub buffers_wiped: u64,
}

impl MetricsSnapshot {
    /// Creates a snapshot from a generator and its device.
    pub fn from_components(generator: &KeyGenerator) -> Self {
        let stats = generator.device().stats();
        Self {
            generations: generator.generations(),
            failures: generator.failures().clone(),
            programs_built: stats.programs_built,
            kernel_launches: stats.kernel_launches,
            bytes_to_device: stats.bytes_to_device,
            bytes_from_device: stats.bytes_from_device,
            buffers_wiped: stats.buffers_wiped,
        }
    }
}

/// Prometheus metrics registry for key generation.
pub struct MetricsRegistry {
    registry: Registry,

    generations_total: IntCounter,
    failures_total: IntCounterVec,

    // Device traffic
    programs_built_total: IntCounter,
    kernel_launches_total: IntCounter,
    bytes_to_device_total: IntCounter,
    bytes_from_device_total: IntCounter,
    buffers_wiped_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new registry with all generator metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let generations_total = IntCounter::new(
            "gpu_keygen_generations_total",
            "Private keys generated successfully",
        )?;
        let failures_total = IntCounterVec::new(
            Opts::new("gpu_keygen_failures_total", "Failed generations by error category"),
            &["category"],
        )?;
        let programs_built_total = IntCounter::new(
            "gpu_keygen_programs_built_total",
            "Kernel programs built on the device",
        )?;
        let kernel_launches_total = IntCounter::new(
            "gpu_keygen_kernel_launches_total",
            "Kernel launches completed",
        )?;
        let bytes_to_device_total = IntCounter::new(
            "gpu_keygen_bytes_to_device_total",
            "Bytes copied from host to device",
        )?;
        let bytes_from_device_total = IntCounter::new(
            "gpu_keygen_bytes_from_device_total",
            "Bytes copied from device to host",
        )?;
        let buffers_wiped_total = IntCounter::new(
            "gpu_keygen_buffers_wiped_total",
            "Device buffers overwritten and freed",
        )?;

        registry.register(Box::new(generations_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(programs_built_total.clone()))?;
        registry.register(Box::new(kernel_launches_total.clone()))?;
        registry.register(Box::new(bytes_to_device_total.clone()))?;
        registry.register(Box::new(bytes_from_device_total.clone()))?;
        registry.register(Box::new(buffers_wiped_total.clone()))?;

        Ok(Self {
            registry,
            generations_total,
            failures_total,
            programs_built_total,
            kernel_launches_total,
            bytes_to_device_total,
            bytes_from_device_total,
            buffers_wiped_total,
        })
    }

    /// Updates all metrics from a snapshot.
    ///
    /// Counters only move forward; a snapshot behind the registry leaves
    /// them unchanged.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        advance(&self.generations_total, snapshot.generations);
        for (category, count) in &snapshot.failures {
            advance(&self.failures_total.with_label_values(&[*category]), *count);
        }

        advance(&self.programs_built_total, snapshot.programs_built);
        advance(&self.kernel_launches_total, snapshot.kernel_launches);
        advance(&self.bytes_to_device_total, snapshot.bytes_to_device);
        advance(&self.bytes_from_device_total, snapshot.bytes_from_device);
        advance(&self.buffers_wiped_total, snapshot.buffers_wiped);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}
