//! Command descriptor resolver.
//!
//! Turns a [`Descriptor`] into an invocable hook for one of the four sensor
//! roles. Script-backed descriptors are materialized once per descriptor
//! text and cached; the temporary files live as long as the resolver (or
//! the last hook holding them).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempPath;

use crate::core::descriptor::Descriptor;
use crate::core::hysteresis::Threshold;
use crate::core::natives;
use crate::core::sensor::{AlertCheckFn, AttemptResetFn, PanicFn, ProbeFn, ProbeResult, Reading};
use crate::core::shell::{process_comm, RunOptions};
use crate::error::{PrudenceError, Result};

/// Resolver shared by every sensor of a registry
pub type SharedResolver = Arc<Mutex<Resolver>>;

const PYTHON_EXTS: &[&str] = &["py", "pyx"];
const SHELL_EXTS: &[&str] = &["sh"];

/// Ordered list of directories searched for relative descriptor files
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// `extra` first, then the user config and data directories
    pub fn with_defaults(extra: &[PathBuf]) -> Self {
        let mut dirs = extra.to_vec();
        if let Some(config_dir) = dirs::config_dir() {
            dirs.push(config_dir.join("prudence"));
        }
        if let Some(data_dir) = dirs::data_dir() {
            dirs.push(data_dir.join("prudence"));
        }
        Self { dirs }
    }

    /// Find `base` trying each extension before the bare name.
    ///
    /// Absolute paths bypass the search path.
    pub fn locate(&self, base: &str, exts: &[&str], label: &str) -> Result<PathBuf> {
        let base_path = Path::new(base);
        let prefixes = if base_path.is_absolute() {
            vec![PathBuf::new()]
        } else {
            self.dirs.clone()
        };

        for prefix in &prefixes {
            let srcbase = prefix.join(base_path);
            for ext in exts {
                let candidate = srcbase.with_extension(ext);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
            if srcbase.is_file() {
                return Ok(srcbase);
            }
        }

        let searched = if base_path.is_absolute() {
            vec![base_path.to_path_buf()]
        } else {
            prefixes
        };
        log::error!("No such source file ({}) for {}", base, label);
        log::error!("Searched locations: {:?}", searched);
        log::info!("Possible solution: supply absolute path.");
        Err(PrudenceError::Resolution {
            label: label.to_string(),
            target: base.to_string(),
            searched,
        })
    }
}

/// A materialized external command
#[derive(Debug, Clone)]
pub struct ScriptCall {
    argv: Vec<String>,
    script: Option<Arc<TempPath>>,
}

impl ScriptCall {
    /// Temporary file backing this call, if any
    pub fn script_path(&self) -> Option<&Path> {
        self.script.as_deref().map(|path| &**path)
    }

    pub fn run(&self, extra: &[String], opts: RunOptions) -> Result<Option<String>> {
        let mut cmd = self.argv.clone();
        cmd.extend_from_slice(extra);
        process_comm(&cmd, opts)
    }
}

pub struct Resolver {
    search_path: SearchPath,
    python: String,
    scripts: HashMap<Descriptor, ScriptCall>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(SearchPath::default())
    }
}

impl Resolver {
    pub fn new(search_path: SearchPath) -> Self {
        Self {
            search_path,
            python: "python3".to_string(),
            scripts: HashMap::new(),
        }
    }

    /// Interpreter used for `py:` descriptors
    pub fn with_python<S: Into<String>>(mut self, python: S) -> Self {
        self.python = python.into();
        self
    }

    pub fn shared(self) -> SharedResolver {
        Arc::new(Mutex::new(self))
    }

    /// Number of materialized script descriptors
    pub fn cached(&self) -> usize {
        self.scripts.len()
    }

    /// Materialize a script-backed descriptor, reusing a cached one
    pub fn script(&mut self, desc: &Descriptor, label: &str) -> Result<ScriptCall> {
        if let Some(call) = self.scripts.get(desc) {
            log::trace!("{}: reusing {}", label, desc.kind());
            return Ok(call.clone());
        }
        let call = self.build_script(desc, label).inspect_err(|_| {
            log::error!("Error creating {}-callable handle for {}", desc.kind(), label);
        })?;
        self.scripts.insert(desc.clone(), call.clone());
        Ok(call)
    }

    fn build_script(&self, desc: &Descriptor, label: &str) -> Result<ScriptCall> {
        match desc {
            Descriptor::PythonRef {
                file,
                entrypoint,
                args,
            } => {
                let pyfile = self.search_path.locate(file, PYTHON_EXTS, label)?;
                let source = fs::read_to_string(&pyfile)?;
                if !defines_python(&source, entrypoint) {
                    return Err(missing_entrypoint(label, &pyfile, entrypoint));
                }
                let interpreter = which::which(&self.python).map_err(|_| {
                    PrudenceError::Resolution {
                        label: label.to_string(),
                        target: self.python.clone(),
                        searched: std::env::var_os("PATH")
                            .map(|p| std::env::split_paths(&p).collect())
                            .unwrap_or_default(),
                    }
                })?;
                let script = temp_code(&python_wrapper(&pyfile, entrypoint), entrypoint, ".py")?;
                Ok(script_call(interpreter.display().to_string(), script, args))
            }
            Descriptor::ShellRef {
                file,
                entrypoint,
                args,
            } => {
                ensure_posix_shell(label)?;
                let shfile = self.search_path.locate(file, SHELL_EXTS, label)?;
                let source = fs::read_to_string(&shfile)?;
                if !defines_shell(&source, entrypoint) {
                    return Err(missing_entrypoint(label, &shfile, entrypoint));
                }
                let wrapper = format!(
                    "#!/usr/bin/env sh\n. \"{}\"\n{} \"$@\"\n",
                    shfile.display(),
                    entrypoint
                );
                let script = temp_code(&wrapper, entrypoint, ".sh")?;
                Ok(script_call("sh".to_string(), script, args))
            }
            Descriptor::ShellInline { code } => {
                ensure_posix_shell(label)?;
                let wrapper = format!("#!/usr/bin/env sh\n{}\n", code);
                let script = temp_code(&wrapper, &format!("otf {} call", label), ".sh")?;
                Ok(script_call("sh".to_string(), script, &[]))
            }
            Descriptor::OsExec { file, args } => {
                let osfile = self.search_path.locate(file, &[], label)?;
                let mut argv = vec![osfile.display().to_string()];
                argv.extend(args.iter().cloned());
                Ok(ScriptCall { argv, script: None })
            }
            Descriptor::BatchRef(_) => Err(PrudenceError::not_implemented(
                "Batch script function declarations are planned for future. \
                 You may try supplying pre-defined scripts in the format `os: ...`",
            )),
            Descriptor::Native { name, .. } => Err(PrudenceError::config(format!(
                "{}: built-in '{}' is not a script",
                label, name
            ))),
        }
    }

    pub fn probe(&mut self, desc: &Descriptor, label: &str, opts: RunOptions) -> Result<ProbeFn> {
        if let Descriptor::Native { name, args } = desc {
            let native = natives::probe(name).ok_or_else(|| unknown_builtin(label, name))?;
            let args = args.clone();
            return Ok(Arc::new(move || native(&args)));
        }
        let call = self.script(desc, label)?;
        Ok(Arc::new(move || {
            call.run(&[], opts).map(ProbeResult::from_output)
        }))
    }

    pub fn panic(&mut self, desc: &Descriptor, label: &str, opts: RunOptions) -> Result<PanicFn> {
        if let Descriptor::Native { name, args } = desc {
            let native = natives::panic(name).ok_or_else(|| unknown_builtin(label, name))?;
            let args = args.clone();
            return Ok(Arc::new(move || native(&args)));
        }
        let call = self.script(desc, label)?;
        Ok(Arc::new(move || call.run(&[], opts).map(|_| ())))
    }

    /// Script checks get `value next_warn min_warn warn_res reverse` and
    /// print `<truthy> [new next_warn]`.
    pub fn alert_check(
        &mut self,
        desc: &Descriptor,
        label: &str,
        opts: RunOptions,
    ) -> Result<AlertCheckFn> {
        if let Descriptor::Native { name, .. } = desc {
            let native = natives::alert_check(name).ok_or_else(|| unknown_builtin(label, name))?;
            return Ok(Arc::new(native));
        }
        let call = self.script(desc, label)?;
        Ok(Arc::new(
            move |state: Threshold, reading: &Reading| -> Result<(bool, Threshold)> {
                let out = call.run(&hook_args(state, reading), opts)?;
                Ok(parse_check_output(out.as_deref(), state))
            },
        ))
    }

    /// Script resets get the same arguments as checks and may print a new
    /// `next_warn`.
    pub fn attempt_reset(
        &mut self,
        desc: &Descriptor,
        label: &str,
        opts: RunOptions,
    ) -> Result<AttemptResetFn> {
        if let Descriptor::Native { name, .. } = desc {
            let native =
                natives::attempt_reset(name).ok_or_else(|| unknown_builtin(label, name))?;
            return Ok(Arc::new(native));
        }
        let call = self.script(desc, label)?;
        Ok(Arc::new(
            move |state: Threshold, reading: &Reading| -> Result<Threshold> {
                let out = call.run(&hook_args(state, reading), opts)?;
                Ok(parse_reset_output(out.as_deref(), state))
            },
        ))
    }
}

fn script_call(program: String, script: TempPath, args: &[String]) -> ScriptCall {
    let mut argv = vec![program, script.display().to_string()];
    argv.extend(args.iter().cloned());
    ScriptCall {
        argv,
        script: Some(Arc::new(script)),
    }
}

fn unknown_builtin(label: &str, name: &str) -> PrudenceError {
    PrudenceError::MissingEntrypoint {
        label: label.to_string(),
        file: PathBuf::from("<built-in>"),
        entrypoint: name.to_string(),
    }
}

fn missing_entrypoint(label: &str, file: &Path, entrypoint: &str) -> PrudenceError {
    PrudenceError::MissingEntrypoint {
        label: label.to_string(),
        file: file.to_path_buf(),
        entrypoint: entrypoint.to_string(),
    }
}

fn ensure_posix_shell(label: &str) -> Result<()> {
    if cfg!(windows) {
        return Err(PrudenceError::not_implemented(format!(
            "{}: shell scripts on Windows are in future plan",
            label
        )));
    }
    Ok(())
}

/// Write `code` to an executable temporary file
fn temp_code(code: &str, name_base: &str, suffix: &str) -> Result<TempPath> {
    let prefix = format!(
        "prudence_{}_",
        name_base.split_whitespace().collect::<Vec<_>>().join("_")
    );
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(suffix)
        .tempfile()?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    let path = file.into_temp_path();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

fn python_wrapper(file: &Path, entrypoint: &str) -> String {
    let dir = file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .display()
        .to_string();
    let module = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "import sys\n\
         sys.path.insert(0, {dir:?})\n\
         from {module} import {entrypoint} as call\n\
         \n\
         _ret = call(*sys.argv[1:])\n\
         if _ret is not None:\n    print(_ret)\n"
    )
}

fn defines_python(source: &str, entrypoint: &str) -> bool {
    source.lines().any(|line| {
        let line = line.trim_start();
        let line = line.strip_prefix("async ").unwrap_or(line);
        if let Some(rest) = line.strip_prefix("def ") {
            return rest
                .trim_start()
                .strip_prefix(entrypoint)
                .is_some_and(|after| after.trim_start().starts_with('('));
        }
        // module-level alias: `entrypoint = other`
        line.strip_prefix(entrypoint)
            .is_some_and(|after| after.trim_start().starts_with('=') && !after.contains("=="))
    })
}

fn defines_shell(source: &str, entrypoint: &str) -> bool {
    source.lines().any(|line| {
        let line = line.trim_start();
        let (keyword, rest) = match line.strip_prefix("function ") {
            Some(rest) => (true, rest.trim_start()),
            None => (false, line),
        };
        rest.strip_prefix(entrypoint).is_some_and(|after| {
            let after = after.trim_start();
            after.starts_with("()")
                || after.starts_with("( )")
                || (keyword && (after.is_empty() || after.starts_with('{')))
        })
    })
}

fn hook_args(state: Threshold, reading: &Reading) -> Vec<String> {
    vec![
        reading.to_string(),
        state.next_warn.to_string(),
        state.min_warn.to_string(),
        state.warn_res.to_string(),
        state.reverse.to_string(),
    ]
}

fn is_truthy(token: &str) -> bool {
    matches!(
        token.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

fn parse_check_output(out: Option<&str>, state: Threshold) -> (bool, Threshold) {
    let Some(out) = out else {
        return (false, state);
    };
    let mut tokens = out.split_whitespace();
    let fired = tokens.next().is_some_and(is_truthy);
    let next_warn = tokens
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .unwrap_or(state.next_warn);
    (fired, Threshold { next_warn, ..state })
}

fn parse_reset_output(out: Option<&str>, state: Threshold) -> Threshold {
    match out.and_then(|out| out.split_whitespace().next()?.parse::<f64>().ok()) {
        Some(next_warn) => Threshold { next_warn, ..state },
        None => state,
    }
}
