//! Kernel program compilation and reflection.
//!
//! Programs are WGSL. Every device parses and validates the source with
//! `naga` so build diagnostics look the same everywhere, then reflects the
//! requested compute entry points into [`KernelSignature`]s. A kernel's
//! parameter order is the ascending binding order of the resources it uses.

use super::{AccessMode, DeviceError, KernelArg};
use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Whether a kernel parameter takes a buffer or a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Storage buffer.
    Buffer,
    /// `u32` passed through a uniform binding.
    Scalar,
}

/// One reflected kernel parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelParam {
    /// Name of the WGSL global.
    pub name: String,
    /// Binding index in group 0.
    pub binding: u32,
    /// Buffer or scalar.
    pub kind: ParamKind,
    /// True when the kernel may store to this parameter.
    pub writable: bool,
}

/// Reflected compute entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSignature {
    name: String,
    workgroup_size: u32,
    params: Vec<KernelParam>,
}

impl KernelSignature {
    /// Entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Work-items per workgroup along x.
    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    /// Parameters in launch order.
    pub fn params(&self) -> &[KernelParam] {
        &self.params
    }
}

/// A built kernel program.
#[derive(Debug)]
pub struct Program {
    id: u64,
    kernels: Vec<KernelSignature>,
}

impl Program {
    pub(crate) fn new(id: u64, kernels: Vec<KernelSignature>) -> Self {
        Self { id, kernels }
    }

    /// Device-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Looks up a kernel by entry point name.
    pub fn kernel(&self, name: &str) -> Option<&KernelSignature> {
        self.kernels.iter().find(|k| k.name == name)
    }

    /// All kernels requested at build time.
    pub fn kernels(&self) -> &[KernelSignature] {
        &self.kernels
    }
}

/// Parses, validates and reflects `source`.
///
/// Fails with [`DeviceError::Compile`] when the source does not parse, does
/// not validate, or lacks one of `kernels` as a compute entry point.
pub(crate) fn reflect(source: &str, kernels: &[&str]) -> Result<Vec<KernelSignature>, DeviceError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| DeviceError::Compile(e.emit_to_string(source)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| DeviceError::Compile(e.into_inner().to_string()))?;

    kernels
        .iter()
        .map(|&name| {
            let (index, entry) = module
                .entry_points
                .iter()
                .enumerate()
                .find(|(_, ep)| ep.name == name && ep.stage == naga::ShaderStage::Compute)
                .ok_or_else(|| {
                    DeviceError::Compile(format!("compute kernel `{}` is not declared", name))
                })?;

            let uses = info.get_entry_point(index);
            let mut params: Vec<KernelParam> = module
                .global_variables
                .iter()
                .filter(|(handle, _)| !uses[*handle].is_empty())
                .filter_map(|(_, var)| {
                    let binding = var.binding.as_ref()?;
                    let kind = match var.space {
                        naga::AddressSpace::Uniform => ParamKind::Scalar,
                        _ => ParamKind::Buffer,
                    };
                    let writable = matches!(
                        var.space,
                        naga::AddressSpace::Storage { access }
                            if access.contains(naga::StorageAccess::STORE)
                    );
                    Some(KernelParam {
                        name: var.name.clone().unwrap_or_default(),
                        binding: binding.binding,
                        kind,
                        writable,
                    })
                })
                .collect();
            params.sort_by_key(|p| p.binding);

            Ok(KernelSignature {
                name: name.to_string(),
                workgroup_size: entry.workgroup_size[0].max(1),
                params,
            })
        })
        .collect()
}

/// Checks launch arguments against a kernel signature.
///
/// Beyond count and kind, a buffer's access mode must agree with the
/// parameter: a `ReadOnly` buffer cannot back a parameter the kernel stores
/// to, and a `WriteOnly` buffer cannot back one it only reads.
pub(crate) fn check_args(kernel: &KernelSignature, args: &[KernelArg<'_>]) -> Result<(), DeviceError> {
    if args.len() != kernel.params.len() {
        return Err(DeviceError::Execution(format!(
            "kernel `{}` takes {} arguments, got {}",
            kernel.name,
            kernel.params.len(),
            args.len()
        )));
    }

    for (position, (param, arg)) in kernel.params.iter().zip(args).enumerate() {
        let matches = matches!(
            (param.kind, arg),
            (ParamKind::Buffer, KernelArg::Buffer(_)) | (ParamKind::Scalar, KernelArg::Scalar(_))
        );
        if !matches {
            return Err(DeviceError::Execution(format!(
                "kernel `{}` argument {} (`{}`) expects a {:?}",
                kernel.name, position, param.name, param.kind
            )));
        }

        if let KernelArg::Buffer(buffer) = arg {
            let conflict = match buffer.access() {
                AccessMode::ReadOnly => param.writable,
                AccessMode::WriteOnly => !param.writable,
                AccessMode::ReadWrite => false,
            };
            if conflict {
                return Err(DeviceError::Execution(format!(
                    "kernel `{}` argument {} (`{}`) cannot take a {:?} buffer",
                    kernel.name,
                    position,
                    param.name,
                    buffer.access()
                )));
            }
        }
    }

    Ok(())
}
