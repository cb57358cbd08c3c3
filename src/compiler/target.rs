//! Target descriptor resolution.
//!
//! Maps an optional LLVM-style triple (`arch-vendor-os[-abi]`) to the handful
//! of type choices the generator cares about. Pure; no global state.

use super::ir::IrType;

/// Byte order of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// Resolved target properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    /// Normalized triple
    pub triple: String,
    /// Pointer width in bits (32 or 64)
    pub pointer_width: u32,
    /// Byte order
    pub endian: Endian,
    /// Whether the triple selects WebAssembly
    pub is_wasm: bool,
}

impl TargetInfo {
    /// Resolve an optional triple; `None` or `"host"` selects the host
    pub fn resolve(triple: Option<&str>) -> Self {
        let triple = match triple {
            Some(t) if !t.trim().is_empty() && t != "host" => t.trim().to_string(),
            _ => host_triple(),
        };
        let lower = triple.to_ascii_lowercase();
        Self {
            pointer_width: pointer_width(&lower),
            endian: endian(&lower),
            is_wasm: lower.contains("wasm"),
            triple,
        }
    }

    /// Integer type matching the platform `size_t`
    pub fn size_type(&self) -> IrType {
        IrType::Int(self.pointer_width)
    }

    /// Fixed-width integer slot used for every parameter and return value
    pub fn slot_type(&self) -> IrType {
        IrType::Int(64)
    }

    /// Pointer size in bytes
    pub fn pointer_bytes(&self) -> u64 {
        u64::from(self.pointer_width / 8)
    }
}

impl Default for TargetInfo {
    fn default() -> Self {
        Self::resolve(None)
    }
}

fn pointer_width(triple: &str) -> u32 {
    const WIDE: [&str; 5] = ["x86_64", "aarch64", "arm64", "wasm64", "riscv64"];
    if WIDE.iter().any(|arch| triple.contains(arch)) {
        return 64;
    }
    if triple.contains("wasm32")
        || triple.contains("i386")
        || triple.contains("i686")
        || triple.starts_with("arm-")
        || triple.contains("armv7")
        || triple.starts_with("riscv32")
    {
        return 32;
    }
    64
}

fn endian(triple: &str) -> Endian {
    let arch = triple.split('-').next().unwrap_or_default();
    let big = arch.ends_with("eb")
        || arch.ends_with("_be")
        || matches!(
            arch,
            "powerpc" | "powerpc64" | "ppc" | "ppc64" | "s390x" | "mips" | "mips64" | "sparc"
                | "sparc64"
        );
    if big {
        Endian::Big
    } else {
        Endian::Little
    }
}

/// Triple describing the machine running the compiler
pub fn host_triple() -> String {
    let arch = std::env::consts::ARCH;
    match std::env::consts::OS {
        "linux" => format!("{}-unknown-linux-gnu", arch),
        "macos" => format!("{}-apple-darwin", arch),
        "windows" => format!("{}-pc-windows-msvc", arch),
        os => format!("{}-unknown-{}", arch, os),
    }
}
