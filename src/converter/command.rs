//! Converters backed by external programs.
//!
//! `to_ir` runs the configured command and reads IR JSON from its stdout.
//! `from_ir` pipes IR JSON to the command's stdin; the command writes the
//! output file itself.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{ConversionError, Converter};
use crate::config::CommandConfig;
use crate::ir::IrDocument;
use crate::utils::exec::Cmd;

const INPUT: &str = "{input}";
const OUTPUT: &str = "{output}";

#[derive(Debug, Clone)]
pub struct CommandConverter {
    id: String,
    to_ir: Vec<String>,
    from_ir: Vec<String>,
    cwd: PathBuf,
}

impl CommandConverter {
    pub fn new(
        id: impl Into<String>,
        to_ir: Vec<String>,
        from_ir: Vec<String>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            to_ir,
            from_ir,
            cwd: cwd.into(),
        }
    }

    pub fn from_config(config: &CommandConfig, root: &Path) -> Self {
        Self::new(
            config.identity(),
            config.to_ir.clone(),
            config.from_ir.clone(),
            root,
        )
    }

    fn failed(&self, path: &Path, message: impl Into<String>) -> ConversionError {
        ConversionError::Failed {
            converter: self.id.clone(),
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Substitute `{input}` / `{output}` in each argument.
fn expand(template: &[String], input: Option<&Path>, output: Option<&Path>) -> Vec<OsString> {
    template
        .iter()
        .map(|arg| {
            let mut arg = arg.clone();
            if let Some(input) = input {
                arg = arg.replace(INPUT, &input.to_string_lossy());
            }
            if let Some(output) = output {
                arg = arg.replace(OUTPUT, &output.to_string_lossy());
            }
            OsString::from(arg)
        })
        .collect()
}

impl Converter for CommandConverter {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_ir(&self, path: &Path) -> Result<Value, ConversionError> {
        if self.to_ir.is_empty() {
            return Err(self.failed(path, "no `to_ir` command configured"));
        }
        if !path.is_file() {
            return Err(ConversionError::Read(
                path.to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            ));
        }

        let args = expand(&self.to_ir, Some(path), None);
        let output = Cmd::from_slice(&args)
            .cwd(&self.cwd)
            .run()
            .map_err(|e| self.failed(path, format!("{e:#}")))?;

        serde_json::from_slice(&output.stdout).map_err(|source| ConversionError::InvalidOutput {
            converter: self.id.clone(),
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_ir(&self, ir: &IrDocument, output: &Path) -> Result<(), ConversionError> {
        if self.from_ir.is_empty() {
            return Err(self.failed(output, "no `from_ir` command configured"));
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConversionError::Write(parent.to_path_buf(), e))?;
        }

        let json = serde_json::to_vec(ir).map_err(|e| self.failed(output, e.to_string()))?;
        let args = expand(&self.from_ir, Some(&ir.metadata.source_file), Some(output));
        Cmd::from_slice(&args)
            .cwd(&self.cwd)
            .stdin(json)
            .run()
            .map_err(|e| self.failed(output, format!("{e:#}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_placeholders() {
        let template = vec!["conv".to_string(), "--in={input}".to_string(), "{output}".to_string()];
        let args = expand(&template, Some(Path::new("a/x.dart")), Some(Path::new("b/x.tsx")));
        assert_eq!(
            args,
            vec![
                OsString::from("conv"),
                OsString::from("--in=a/x.dart"),
                OsString::from("b/x.tsx")
            ]
        );
    }

    #[test]
    fn test_unconfigured_command_fails() {
        let conv = CommandConverter::new("none", vec![], vec![], ".");
        let err = conv.to_ir(Path::new("x")).unwrap_err();
        assert!(err.to_string().contains("no `to_ir` command"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::core::Representation;
        use crate::ir::Node;
        use tempfile::TempDir;

        fn cat_converter(dir: &Path) -> CommandConverter {
            CommandConverter::new(
                "cat",
                vec!["sh".into(), "-c".into(), "cat \"$0\"".into(), INPUT.into()],
                vec!["sh".into(), "-c".into(), "cat > \"$0\"".into(), OUTPUT.into()],
                dir,
            )
        }

        #[test]
        fn test_to_ir_reads_stdout_json() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("home.dart");
            std::fs::write(&file, r#"{"schemaVersion":"1.2.0","nodes":[]}"#).unwrap();

            let value = cat_converter(dir.path()).to_ir(&file).unwrap();
            assert_eq!(value["schemaVersion"], "1.2.0");
        }

        #[test]
        fn test_to_ir_rejects_non_json() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("home.dart");
            std::fs::write(&file, "class Home {}").unwrap();

            let err = cat_converter(dir.path()).to_ir(&file).unwrap_err();
            assert!(matches!(err, ConversionError::InvalidOutput { .. }));
        }

        #[test]
        fn test_to_ir_missing_file() {
            let dir = TempDir::new().unwrap();
            let err = cat_converter(dir.path())
                .to_ir(&dir.path().join("gone.dart"))
                .unwrap_err();
            assert!(matches!(err, ConversionError::Read(..)));
        }

        #[test]
        fn test_from_ir_creates_parent_dirs() {
            let dir = TempDir::new().unwrap();
            let out = dir.path().join("b/nested/home.tsx");
            let doc = IrDocument::new(Representation::A, "a/home.dart", vec![Node::new("n1", "Text")]);

            cat_converter(dir.path()).from_ir(&doc, &out).unwrap();
            let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
            assert_eq!(written["nodes"][0]["id"], "n1");
        }

        #[test]
        fn test_failing_command_reports_converter() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("home.dart");
            std::fs::write(&file, "{}").unwrap();
            let conv = CommandConverter::new("broken", vec!["false".into()], vec!["false".into()], dir.path());
            let err = conv.to_ir(&file).unwrap_err();
            assert!(err.to_string().contains("converter `broken` failed"));
        }
    }
}
