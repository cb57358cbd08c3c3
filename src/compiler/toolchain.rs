//! External backend and linker invocation.
//!
//! The generated IR is handed to `llc` for object emission and to the system
//! C driver for linking. Executables are resolved from `PATH`; `EIGEN_LLC`
//! and `EIGEN_CC` override them.

use super::{EmitKind, TargetInfo};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Default backend
const LLC: &str = "llc";
/// Default native link driver
const CC: &str = "cc";
/// Default wasm link driver
const CLANG: &str = "clang";

/// Backend and linker executables
#[derive(Debug, Clone)]
pub struct Toolchain {
    llc: String,
    /// Link driver override; `None` picks `cc` or `clang` per target
    cc: Option<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            llc: LLC.to_string(),
            cc: None,
        }
    }
}

impl Toolchain {
    /// Toolchain with executables overridden from the environment
    pub fn from_env() -> Self {
        Self {
            llc: std::env::var("EIGEN_LLC").unwrap_or_else(|_| LLC.to_string()),
            cc: std::env::var("EIGEN_CC").ok(),
        }
    }

    /// Use `llc` as the backend executable
    pub fn with_llc(mut self, llc: impl Into<String>) -> Self {
        self.llc = llc.into();
        self
    }

    /// Use `cc` as the link driver for every target
    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    fn linker_for(&self, target: &TargetInfo) -> &str {
        match &self.cc {
            Some(cc) => cc,
            None if target.is_wasm => CLANG,
            None => CC,
        }
    }

    /// `llc` invocation turning `ir` into the object file `obj`
    pub fn object_command(
        &self,
        ir: &Path,
        obj: &Path,
        opt_level: u8,
        target: &TargetInfo,
        explicit_target: bool,
    ) -> Command {
        let mut cmd = Command::new(&self.llc);
        cmd.arg(format!("-O{}", opt_level.min(3)))
            .arg("-filetype=obj");
        if explicit_target {
            cmd.arg(format!("-mtriple={}", target.triple));
        }
        cmd.arg(ir).arg("-o").arg(obj);
        cmd
    }

    /// Link-driver invocation producing `output` from `objects`
    pub fn link_command(
        &self,
        objects: &[PathBuf],
        runtime: Option<&Path>,
        output: &Path,
        target: &TargetInfo,
    ) -> Command {
        let mut cmd = Command::new(self.linker_for(target));
        if target.is_wasm {
            cmd.arg(format!("--target={}", target.triple))
                .arg("-nostdlib")
                .arg("-Wl,--no-entry")
                .arg("-Wl,--export-all")
                .arg("-Wl,--allow-undefined");
        }
        cmd.args(objects);
        if let Some(runtime) = runtime {
            cmd.arg(runtime);
        }
        cmd.arg("-o").arg(output);
        if !target.is_wasm {
            cmd.arg("-lm");
        }
        cmd
    }

    /// Emit an object file for the IR in `ir`
    pub fn emit_object(
        &self,
        ir: &Path,
        obj: &Path,
        opt_level: u8,
        target: &TargetInfo,
        explicit_target: bool,
    ) -> Result<()> {
        let cmd = self.object_command(ir, obj, opt_level, target, explicit_target);
        run(cmd, &self.llc)
    }

    /// Link `objects` (and the runtime, if any) into `output`
    pub fn link(
        &self,
        objects: &[PathBuf],
        runtime: Option<&Path>,
        output: &Path,
        target: &TargetInfo,
    ) -> Result<()> {
        if runtime.is_none() {
            tracing::warn!("linking without a runtime library; runtime symbols must come from the objects");
        }
        let cmd = self.link_command(objects, runtime, output, target);
        let tool = self.linker_for(target).to_string();
        run(cmd, &tool)
    }
}

fn run(mut cmd: Command, tool: &str) -> Result<()> {
    tracing::info!(command = ?cmd, "invoking {}", tool);
    match cmd.output() {
        Ok(output) => {
            if output.status.success() {
                Ok(())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::toolchain(
                    tool,
                    format!("{}: {}", output.status, stderr.trim()),
                ))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ToolNotFound {
            tool: tool.to_string(),
        }),
        Err(e) => Err(Error::io(tool, e)),
    }
}

/// Default output path for `input` when `-o` is not given
pub fn default_output(input: &Path, emit: EmitKind, target: &TargetInfo) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let base = input.with_file_name(stem);
    match emit {
        EmitKind::Ir => base.with_extension("ll"),
        EmitKind::Obj => base.with_extension("o"),
        EmitKind::Exe if target.is_wasm => base.with_extension("wasm"),
        EmitKind::Exe => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_object_command() {
        let target = TargetInfo::resolve(Some("x86_64-unknown-linux-gnu"));
        let cmd = Toolchain::default().object_command(
            Path::new("prog.ll"),
            Path::new("prog.o"),
            2,
            &target,
            true,
        );
        assert_eq!(cmd.get_program(), "llc");
        assert_eq!(
            args(&cmd),
            vec![
                "-O2",
                "-filetype=obj",
                "-mtriple=x86_64-unknown-linux-gnu",
                "prog.ll",
                "-o",
                "prog.o"
            ]
        );
    }

    #[test]
    fn test_host_object_command_omits_triple() {
        let target = TargetInfo::resolve(None);
        let cmd = Toolchain::default().object_command(
            Path::new("a.ll"),
            Path::new("a.o"),
            7,
            &target,
            false,
        );
        let args = args(&cmd);
        assert_eq!(args[0], "-O3");
        assert!(!args.iter().any(|a| a.starts_with("-mtriple")));
    }

    #[test]
    fn test_native_link_command() {
        let target = TargetInfo::resolve(Some("x86_64-unknown-linux-gnu"));
        let cmd = Toolchain::default().link_command(
            &[PathBuf::from("a.o"), PathBuf::from("b.o")],
            Some(Path::new("libeigen.a")),
            Path::new("prog"),
            &target,
        );
        assert_eq!(cmd.get_program(), "cc");
        assert_eq!(args(&cmd), vec!["a.o", "b.o", "libeigen.a", "-o", "prog", "-lm"]);
    }

    #[test]
    fn test_wasm_link_command() {
        let target = TargetInfo::resolve(Some("wasm32-unknown-unknown"));
        let cmd = Toolchain::default().link_command(
            &[PathBuf::from("a.o")],
            None,
            Path::new("a.wasm"),
            &target,
        );
        assert_eq!(cmd.get_program(), "clang");
        let args = args(&cmd);
        assert_eq!(args[0], "--target=wasm32-unknown-unknown");
        assert!(args.contains(&"-Wl,--allow-undefined".to_string()));
        assert!(!args.contains(&"-lm".to_string()));
    }

    #[test]
    fn test_cc_override_applies_to_wasm() {
        let target = TargetInfo::resolve(Some("wasm32-unknown-unknown"));
        let cmd = Toolchain::default().with_cc("clang-18").link_command(
            &[],
            None,
            Path::new("out.wasm"),
            &target,
        );
        assert_eq!(cmd.get_program(), "clang-18");
    }

    #[test]
    fn test_missing_tool() {
        let target = TargetInfo::resolve(None);
        let err = Toolchain::default()
            .with_llc("eigenc-no-such-llc")
            .emit_object(Path::new("a.ll"), Path::new("a.o"), 0, &target, false)
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { ref tool } if tool == "eigenc-no-such-llc"));
    }

    #[test]
    fn test_default_output() {
        let native = TargetInfo::resolve(Some("x86_64-unknown-linux-gnu"));
        let wasm = TargetInfo::resolve(Some("wasm32-unknown-unknown"));
        let input = Path::new("dir/prog.json");
        assert_eq!(default_output(input, EmitKind::Ir, &native), PathBuf::from("dir/prog.ll"));
        assert_eq!(default_output(input, EmitKind::Obj, &native), PathBuf::from("dir/prog.o"));
        assert_eq!(default_output(input, EmitKind::Exe, &native), PathBuf::from("dir/prog"));
        assert_eq!(default_output(input, EmitKind::Exe, &wasm), PathBuf::from("dir/prog.wasm"));
    }
}
