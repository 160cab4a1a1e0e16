//! Engine backed by a real R installation.
//!
//! Every operation runs one `Rscript --vanilla` process. Foreign state
//! (the global environment) persists between operations in a workspace
//! image inside a private scratch directory:
//!
//! ```text
//! load(image) -> evaluate -> write result JSON -> save.image(image)
//! ```
//!
//! Values go in as generated R source and come back as JSON
//! written by an embedded encoder. An R error stops the script
//! before the image is saved, so a failed operation leaves state unchanged.

mod source;
mod wire;

use std::path::{Path, PathBuf};
use std::process::Command;

use fmm_core::{Engine, Error, RCall, RObject, Result};
use tempfile::TempDir;

pub use source::{call_source, double_literal, value as value_source};
pub use wire::{decode_str, parse_hex_float};

const ENCODER: &str = include_str!("encoder.R");

/// Exit status the script uses for an R-level error.
const R_ERROR_STATUS: i32 = 3;

/// How to launch R.
#[derive(Debug, Clone, PartialEq)]
pub struct RscriptConfig {
    /// `Rscript` executable (default: `Rscript` on `PATH`).
    pub rscript: PathBuf,
    /// `R_HOME` for the child process; inherited when `None`.
    pub r_home: Option<PathBuf>,
    /// Extra command-line flags (default: `--vanilla`).
    pub flags: Vec<String>,
}

impl Default for RscriptConfig {
    fn default() -> Self {
        Self { rscript: PathBuf::from("Rscript"), r_home: None, flags: vec!["--vanilla".to_string()] }
    }
}

impl RscriptConfig {
    /// Defaults overridden by `RSCRIPT` and `R_HOME`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os("RSCRIPT").filter(|p| !p.is_empty()) {
            config.rscript = PathBuf::from(path);
        }
        if let Some(home) = std::env::var_os("R_HOME").filter(|p| !p.is_empty()) {
            config.r_home = Some(PathBuf::from(home));
        }
        config
    }

    /// Set the `Rscript` executable.
    pub fn rscript(mut self, path: impl Into<PathBuf>) -> Self {
        self.rscript = path.into();
        self
    }

    /// `true` if `Rscript --version` runs.
    pub fn is_available(&self) -> bool {
        Command::new(&self.rscript).arg("--version").output().map(|o| o.status.success()).unwrap_or(false)
    }
}

/// `Rscript`-driven engine.
#[derive(Debug)]
pub struct RscriptEngine {
    config: RscriptConfig,
    scratch: TempDir,
}

impl RscriptEngine {
    /// Engine with a fresh, empty global environment.
    pub fn new(config: RscriptConfig) -> Result<Self> {
        let scratch = tempfile::Builder::new().prefix("fmm-rscript-").tempdir()?;
        tracing::debug!(dir = %scratch.path().display(), rscript = %config.rscript.display(), "R scratch directory created");
        Ok(Self { config, scratch })
    }

    /// [`RscriptEngine::new`] with [`RscriptConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(RscriptConfig::from_env())
    }

    /// Launch configuration.
    pub fn config(&self) -> &RscriptConfig {
        &self.config
    }

    fn path(&self, file: &str) -> PathBuf {
        self.scratch.path().join(file)
    }

    /// Run `body` against the persisted environment. When `fetch` is set,
    /// `body` must leave its result in `.fmm$out`, which is returned.
    fn run(&self, label: &str, body: &str, fetch: bool) -> Result<Option<RObject>> {
        let image = self.path("state.RData");
        let out = self.path("out.json");
        let err = self.path("error.txt");
        for stale in [&out, &err] {
            if stale.exists() {
                std::fs::remove_file(stale)?;
            }
        }

        let mut script = String::new();
        script.push_str(ENCODER);
        script.push_str(&format!(
            "\n.fmm$image <- {}\nif (file.exists(.fmm$image)) load(.fmm$image, envir = globalenv())\n",
            r_path(&image)
        ));
        script.push_str(&format!(
            "tryCatch({{\n{body}\n}}, error = function(e) {{\n  writeLines(conditionMessage(e), {}, useBytes = TRUE)\n  quit(save = \"no\", status = {R_ERROR_STATUS})\n}})\n",
            r_path(&err)
        ));
        if fetch {
            script.push_str(&format!("writeLines(.fmm$enc(.fmm$out), {}, useBytes = TRUE)\n", r_path(&out)));
        }
        script.push_str("local({\n  image <- .fmm$image\n  rm(\".fmm\", envir = globalenv())\n  save.image(image)\n})\n");

        let script_path = self.path("op.R");
        std::fs::write(&script_path, script)?;

        let mut cmd = Command::new(&self.config.rscript);
        cmd.args(&self.config.flags).arg(&script_path).current_dir(self.scratch.path());
        if let Some(home) = &self.config.r_home {
            cmd.env("R_HOME", home);
        }
        tracing::debug!(op = label, "running Rscript");
        let output = cmd
            .output()
            .map_err(|e| Error::Engine(format!("failed to launch {}: {e}", self.config.rscript.display())))?;

        if !output.status.success() {
            if output.status.code() == Some(R_ERROR_STATUS) && err.exists() {
                let message = std::fs::read_to_string(&err)?.trim_end().to_string();
                tracing::warn!(op = label, %message, "R error");
                return Err(Error::Foreign { call: label.to_string(), message });
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Engine(format!("Rscript exited with {}: {}", output.status, stderr.trim())));
        }
        if !fetch {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&out)
            .map_err(|e| Error::Engine(format!("Rscript produced no result for {label}: {e}")))?;
        decode_str(&text).map(Some)
    }

    fn fetch(&self, label: &str, body: &str) -> Result<RObject> {
        self.run(label, body, true)?.ok_or_else(|| Error::Engine(format!("no result for {label}")))
    }
}

/// R string literal for a filesystem path.
fn r_path(path: &Path) -> String {
    source::string_literal(&path.to_string_lossy())
}

impl Engine for RscriptEngine {
    fn name(&self) -> &str {
        "Rscript"
    }

    fn assign(&mut self, name: &str, value: RObject) -> Result<()> {
        let body = format!(
            "assign({}, {}, envir = globalenv())",
            source::string_literal(name),
            source::value(&value).map_err(|e| e.within(name))?
        );
        self.run("base::assign", &body, false).map(|_| ())
    }

    fn get(&mut self, name: &str) -> Result<RObject> {
        self.fetch("base::get", &format!(".fmm$out <- get({}, envir = globalenv())", source::string_literal(name)))
    }

    fn exists(&mut self, name: &str) -> Result<bool> {
        let body = format!(".fmm$out <- exists({}, envir = globalenv(), inherits = FALSE)", source::string_literal(name));
        match self.fetch("base::exists", &body)? {
            RObject::Logical(v) => Ok(v.data.first().copied().flatten().unwrap_or(false)),
            other => Err(Error::Engine(format!("exists() returned {}", other.type_name()))),
        }
    }

    fn call(&mut self, call: &RCall) -> Result<RObject> {
        self.fetch(&call.function, &format!(".fmm$out <- {}", call_source(call)?))
    }

    fn call_into(&mut self, binding: &str, call: &RCall) -> Result<()> {
        let body = format!("assign({}, {}, envir = globalenv())", source::string_literal(binding), call_source(call)?);
        self.run(&call.function, &body, false).map(|_| ())
    }
}
