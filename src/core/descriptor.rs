//! Textual command descriptors.
//!
//! ```text
//! rs: name:arg1:arg2            built-in behavior
//! py: file:entrypoint:arg1:...  python routine, run out of process
//! sh: file:entrypoint:arg1:...  function of a sourced shell file
//! os: file:arg1:...             executable called directly
//! ch: ...                       batch scripts (not implemented)
//! anything else                 inline shell script
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{PrudenceError, Result};

/// How to obtain a behavior
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Native {
        name: String,
        args: Vec<String>,
    },
    PythonRef {
        file: String,
        entrypoint: String,
        args: Vec<String>,
    },
    ShellRef {
        file: String,
        entrypoint: String,
        args: Vec<String>,
    },
    ShellInline {
        code: String,
    },
    OsExec {
        file: String,
        args: Vec<String>,
    },
    BatchRef(String),
}

impl Descriptor {
    pub fn inline<S: Into<String>>(code: S) -> Self {
        Descriptor::ShellInline { code: code.into() }
    }

    /// Short kind name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Descriptor::Native { .. } => "rs",
            Descriptor::PythonRef { .. } => "py",
            Descriptor::ShellRef { .. } => "sh",
            Descriptor::ShellInline { .. } => "inline",
            Descriptor::OsExec { .. } => "os",
            Descriptor::BatchRef(_) => "ch",
        }
    }
}

fn split_fields(body: &str) -> Vec<String> {
    body.trim().split(':').map(str::to_string).collect()
}

fn file_and_entrypoint(prefix: &str, body: &str) -> Result<(String, String, Vec<String>)> {
    let mut fields = split_fields(body).into_iter();
    let file = fields.next().unwrap_or_default();
    let entrypoint = fields.next().unwrap_or_default();
    if file.is_empty() || entrypoint.is_empty() {
        return Err(PrudenceError::config(format!(
            "'{}{}' must look like '{}file:entrypoint[:arg...]'",
            prefix, body, prefix
        )));
    }
    Ok((file, entrypoint, fields.collect()))
}

impl FromStr for Descriptor {
    type Err = PrudenceError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(body) = s.strip_prefix("rs: ") {
            let mut fields = split_fields(body).into_iter();
            let name = fields.next().unwrap_or_default();
            if name.is_empty() {
                return Err(PrudenceError::config("'rs: ' needs a built-in name"));
            }
            return Ok(Descriptor::Native {
                name,
                args: fields.collect(),
            });
        }

        if let Some(body) = s.strip_prefix("py: ") {
            let (file, entrypoint, args) = file_and_entrypoint("py: ", body)?;
            return Ok(Descriptor::PythonRef {
                file,
                entrypoint,
                args,
            });
        }

        if let Some(body) = s.strip_prefix("sh: ") {
            let (file, entrypoint, args) = file_and_entrypoint("sh: ", body)?;
            return Ok(Descriptor::ShellRef {
                file,
                entrypoint,
                args,
            });
        }

        if let Some(body) = s.strip_prefix("os: ") {
            let mut fields = split_fields(body).into_iter();
            let file = fields.next().unwrap_or_default();
            if file.is_empty() {
                return Err(PrudenceError::config("'os: ' needs an executable"));
            }
            return Ok(Descriptor::OsExec {
                file,
                args: fields.collect(),
            });
        }

        if let Some(body) = s.strip_prefix("ch: ") {
            return Ok(Descriptor::BatchRef(body.to_string()));
        }

        Ok(Descriptor::ShellInline {
            code: s.to_string(),
        })
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |head: &[&String], args: &[String]| {
            head.iter()
                .map(|s| s.as_str())
                .chain(args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(":")
        };
        match self {
            Descriptor::Native { name, args } => write!(f, "rs: {}", join(&[name], args)),
            Descriptor::PythonRef {
                file,
                entrypoint,
                args,
            } => write!(f, "py: {}", join(&[file, entrypoint], args)),
            Descriptor::ShellRef {
                file,
                entrypoint,
                args,
            } => write!(f, "sh: {}", join(&[file, entrypoint], args)),
            Descriptor::OsExec { file, args } => write!(f, "os: {}", join(&[file], args)),
            Descriptor::BatchRef(body) => write!(f, "ch: {}", body),
            Descriptor::ShellInline { code } => f.write_str(code),
        }
    }
}
