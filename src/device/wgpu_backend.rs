//! GPU device via `wgpu`.
//!
//! Every wgpu call that can fail validation runs inside an error scope so
//! failures surface as [`DeviceError`]s instead of the default panic hook.
//! Blocking on the device uses `pollster` and `Maintain::Wait`.

use super::{
    program, AccessMode, Buffer, BufferInit, ComputeBackend, DeviceError, DeviceInfo, DeviceKind,
    KernelArg, KernelSignature, Platform, Program,
};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::mpsc;
use wgpu::util::DeviceExt;
use wgpu::BufferUsages;

/// Platform enumerating every wgpu adapter.
pub struct WgpuPlatform {
    adapters: Vec<wgpu::Adapter>,
}

impl WgpuPlatform {
    pub fn new() -> Self {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapters = instance.enumerate_adapters(wgpu::Backends::all());
        tracing::debug!(adapters = adapters.len(), "Enumerated wgpu adapters");
        Self { adapters }
    }
}

impl Default for WgpuPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for WgpuPlatform {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.adapters
            .iter()
            .enumerate()
            .map(|(index, adapter)| {
                let info = adapter.get_info();
                let kind = match info.device_type {
                    wgpu::DeviceType::DiscreteGpu
                    | wgpu::DeviceType::IntegratedGpu
                    | wgpu::DeviceType::VirtualGpu => DeviceKind::Gpu,
                    wgpu::DeviceType::Cpu => DeviceKind::Cpu,
                    wgpu::DeviceType::Other => DeviceKind::Other,
                };
                DeviceInfo {
                    name: format!("{} ({:?})", info.name, info.backend),
                    kind,
                    platform: self.name().to_string(),
                    index,
                }
            })
            .collect()
    }

    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn ComputeBackend>, DeviceError> {
        let adapter = self
            .adapters
            .get(device.index)
            .ok_or(DeviceError::NoDeviceAvailable)?;

        let (gpu, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("gpu-keygen"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|e| DeviceError::Execution(format!("failed to open {}: {}", device.name, e)))?;

        Ok(Box::new(WgpuBackend {
            info: device.clone(),
            device: gpu,
            queue,
            pipelines: HashMap::new(),
            buffers: HashMap::new(),
            next_buffer: 0,
            next_program: 0,
        }))
    }
}

/// Compute device backed by a wgpu adapter.
pub struct WgpuBackend {
    info: DeviceInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipelines: HashMap<(u64, String), wgpu::ComputePipeline>,
    buffers: HashMap<u64, wgpu::Buffer>,
    next_buffer: u64,
    next_program: u64,
}

impl WgpuBackend {
    fn scoped<T>(&self, op: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = op();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }

    fn wait(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    fn clear(&self, buffer: &wgpu::Buffer) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("wipe") });
        encoder.clear_buffer(buffer, 0, None);
        self.queue.submit(Some(encoder.finish()));
        self.wait();
    }
}

impl ComputeBackend for WgpuBackend {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn load_program(&mut self, source: &str, kernels: &[&str]) -> Result<Program, DeviceError> {
        let signatures = program::reflect(source, kernels)?;

        let pipelines = self
            .scoped(|| {
                let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("entropy_sha256"),
                    source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_string())),
                });
                signatures
                    .iter()
                    .map(|kernel| {
                        let pipeline =
                            self.device
                                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                                    label: Some(kernel.name()),
                                    layout: None,
                                    module: &module,
                                    entry_point: kernel.name(),
                                    compilation_options: Default::default(),
                                });
                        (kernel.name().to_string(), pipeline)
                    })
                    .collect::<Vec<_>>()
            })
            .map_err(|e| DeviceError::Compile(e.to_string()))?;

        self.next_program += 1;
        for (name, pipeline) in pipelines {
            self.pipelines.insert((self.next_program, name), pipeline);
        }
        Ok(Program::new(self.next_program, signatures))
    }

    fn allocate(&mut self, init: BufferInit<'_>, access: AccessMode) -> Result<Buffer, DeviceError> {
        let usage = BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST;
        let buffer = self
            .scoped(|| match init {
                BufferInit::Data(data) if !data.is_empty() => {
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: None,
                            contents: data,
                            usage,
                        })
                }
                // Bindings cannot be empty, so zero-length buffers still get one word.
                _ => self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: None,
                    size: (init.len().div_ceil(4) * 4).max(4) as u64,
                    usage,
                    mapped_at_creation: false,
                }),
            })
            .map_err(|e| DeviceError::Execution(e.to_string()))?;

        self.next_buffer += 1;
        self.buffers.insert(self.next_buffer, buffer);
        Ok(Buffer::new(self.next_buffer, init.len(), access))
    }

    fn launch(
        &mut self,
        program: &Program,
        kernel: &KernelSignature,
        work_size: u32,
        args: &[KernelArg<'_>],
    ) -> Result<(), DeviceError> {
        let pipeline = self
            .pipelines
            .get(&(program.id(), kernel.name().to_string()))
            .ok_or_else(|| {
                DeviceError::Execution(format!("kernel `{}` was not built", kernel.name()))
            })?;

        let uniforms: Vec<Option<wgpu::Buffer>> = args
            .iter()
            .map(|arg| match arg {
                KernelArg::Scalar(value) => Some(self.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("scalar"),
                        contents: bytemuck::cast_slice(&[*value, 0, 0, 0]),
                        usage: BufferUsages::UNIFORM,
                    },
                )),
                KernelArg::Buffer(_) => None,
            })
            .collect();

        let mut entries = Vec::with_capacity(args.len());
        for ((param, arg), uniform) in kernel.params().iter().zip(args).zip(&uniforms) {
            let buffer = match (arg, uniform) {
                (KernelArg::Buffer(buffer), _) => self.buffers.get(&buffer.id()).ok_or_else(|| {
                    DeviceError::Execution(format!("buffer {} does not belong to this device", buffer.id()))
                })?,
                (KernelArg::Scalar(_), uniform) => uniform.as_ref().ok_or_else(|| {
                    DeviceError::Execution(format!("no uniform for `{}`", param.name))
                })?,
            };
            entries.push(wgpu::BindGroupEntry {
                binding: param.binding,
                resource: buffer.as_entire_binding(),
            });
        }

        self.scoped(|| {
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(kernel.name()),
                layout: &pipeline.get_bind_group_layout(0),
                entries: &entries,
            });

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(kernel.name()) });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(kernel.name()),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(work_size.div_ceil(kernel.workgroup_size()), 1, 1);
            }
            self.queue.submit(Some(encoder.finish()));
        })
        .map_err(|e| DeviceError::Execution(e.to_string()))?;

        self.wait();
        Ok(())
    }

    fn read_back(&mut self, buffer: &Buffer, host: &mut [u8]) -> Result<(), DeviceError> {
        let source = self
            .buffers
            .get(&buffer.id())
            .ok_or_else(|| DeviceError::Execution(format!("buffer {} does not belong to this device", buffer.id())))?;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: source.size(),
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("readback") });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, source.size());
        self.queue.submit(Some(encoder.finish()));

        let (tx, rx) = mpsc::channel();
        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.wait();

        let mapped = rx
            .recv()
            .map_err(|e| DeviceError::Execution(e.to_string()))?
            .map_err(|e| DeviceError::Execution(e.to_string()));

        if mapped.is_ok() {
            let data = slice.get_mapped_range();
            host.copy_from_slice(&data[..host.len()]);
            drop(data);
            staging.unmap();
        }
        staging.destroy();
        mapped
    }

    fn free(&mut self, buffer: Buffer) {
        if let Some(gpu_buffer) = self.buffers.remove(&buffer.id()) {
            self.clear(&gpu_buffer);
            gpu_buffer.destroy();
        }
    }

    fn release(&mut self) {
        let buffers: Vec<wgpu::Buffer> = self.buffers.drain().map(|(_, b)| b).collect();
        for buffer in &buffers {
            self.clear(buffer);
            buffer.destroy();
        }
        self.pipelines.clear();
    }
}
