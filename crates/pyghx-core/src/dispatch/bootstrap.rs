//! Throwaway Python launcher for `module:callable` entry points.
//!
//! The generated script extends `sys.path`, imports the module, walks the
//! dotted callable, and exits with whatever the callable returns. The script
//! file lives in the system temp directory and is deleted when the returned
//! handle is dropped.

use crate::error::{PyghxError, Result};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Source of a bootstrap script for one callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapScript {
    pub module: String,
    pub callable: String,
    /// Prepended to `sys.path`, highest priority first.
    pub search_paths: Vec<PathBuf>,
    /// Shown as `sys.argv[0]` so the package's own help text names the command.
    pub program_name: String,
}

impl BootstrapScript {
    /// Render the script text.
    ///
    /// All interpolated values go through JSON encoding, which yields valid
    /// Python string and list literals.
    pub fn render(&self) -> Result<String> {
        let paths: Vec<String> = self
            .search_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let attrs: Vec<&str> = self.callable.split('.').collect();

        Ok(format!(
            r#"import importlib
import sys

sys.argv[0] = {program}
for _path in reversed({paths}):
    sys.path.insert(0, _path)

try:
    _target = importlib.import_module({module})
except ImportError as exc:
    print(f"Import error: {{exc}}", file=sys.stderr)
    sys.exit(1)

for _attr in {attrs}:
    _target = getattr(_target, _attr)

sys.exit(_target())
"#,
            program = serde_json::to_string(&self.program_name)?,
            paths = serde_json::to_string(&paths)?,
            module = serde_json::to_string(&self.module)?,
            attrs = serde_json::to_string(&attrs)?,
        ))
    }

    /// Write the script to a temp file that is removed on drop.
    pub fn write_temp(&self) -> Result<NamedTempFile> {
        let source = self.render()?;
        let mut file = tempfile::Builder::new()
            .prefix("pyghx-run-")
            .suffix(".py")
            .tempfile()?;
        file.write_all(source.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| PyghxError::io_with_path(e, file.path()))?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> BootstrapScript {
        BootstrapScript {
            module: "pkg.mod".into(),
            callable: "App.run".into(),
            search_paths: vec![
                PathBuf::from("/cache/acme/tool/main/src"),
                PathBuf::from("/cache/acme/tool/main"),
            ],
            program_name: "foo".into(),
        }
    }

    #[test]
    fn test_render_embeds_literals() {
        let source = script().render().unwrap();
        assert!(source.contains(r#"sys.argv[0] = "foo""#));
        assert!(source.contains(
            r#"reversed(["/cache/acme/tool/main/src","/cache/acme/tool/main"])"#
        ));
        assert!(source.contains(r#"importlib.import_module("pkg.mod")"#));
        assert!(source.contains(r#"for _attr in ["App","run"]:"#));
        assert!(source.contains(r#"print(f"Import error: {exc}", file=sys.stderr)"#));
        assert!(source.trim_end().ends_with("sys.exit(_target())"));
    }

    #[test]
    fn test_render_escapes_quotes_in_paths() {
        let mut s = script();
        s.search_paths = vec![PathBuf::from(r#"/tmp/we"ird\dir"#)];
        let source = s.render().unwrap();
        assert!(source.contains(r#"["/tmp/we\"ird\\dir"]"#));
    }

    fn python3_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_script_runs_callable_with_argv() {
        use crate::dispatch::{CommandSpec, ProcessRunner, SystemProcessRunner};
        use tempfile::TempDir;

        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }

        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("src").join("pkg");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("__init__.py"), "").unwrap();
        std::fs::write(
            pkg.join("mod.py"),
            "import sys\n\nclass App:\n    @staticmethod\n    def run():\n        \
             return 43 if sys.argv == ['foo', 'a', '--b'] else 1\n",
        )
        .unwrap();

        let script = BootstrapScript {
            module: "pkg.mod".into(),
            callable: "App.run".into(),
            search_paths: vec![temp.path().join("src"), temp.path().to_path_buf()],
            program_name: "foo".into(),
        }
        .write_temp()
        .unwrap();

        let spec = CommandSpec::new("python3")
            .arg(script.path())
            .args(["a", "--b"])
            .current_dir(temp.path());
        assert_eq!(SystemProcessRunner.run(&spec).unwrap(), 43);
    }

    #[test]
    fn test_script_reports_import_error() {
        use crate::dispatch::{CommandSpec, ProcessRunner, SystemProcessRunner};

        if !python3_available() {
            eprintln!("python3 not found, skipping");
            return;
        }

        let mut s = script();
        s.module = "pyghx_no_such_module".into();
        s.search_paths.clear();
        let file = s.write_temp().unwrap();

        let spec = CommandSpec::new("python3").arg(file.path());
        assert_eq!(SystemProcessRunner.run(&spec).unwrap(), 1);
    }

    #[test]
    fn test_write_temp_is_removed_on_drop() {
        let file = script().write_temp().unwrap();
        let path = file.path().to_path_buf();
        assert!(path.extension().is_some_and(|e| e == "py"));
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("import importlib"));

        drop(file);
        assert!(!path.exists());
    }
}
