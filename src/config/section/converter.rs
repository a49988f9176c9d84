//! `[converter.*]` section configuration.
//!
//! Each representation is converted by an external program. `{input}` and
//! `{output}` in the argument lists are replaced with file paths.
//!
//! # Example
//!
//! ```toml
//! [converter.a]
//! to_ir = ["dart", "run", "tool/to_ir.dart", "{input}"]       # IR JSON on stdout
//! from_ir = ["dart", "run", "tool/from_ir.dart", "{output}"]  # IR JSON on stdin
//!
//! [converter.b]
//! to_ir = ["node", "tools/to-ir.mjs", "{input}"]
//! from_ir = ["node", "tools/from-ir.mjs", "{output}"]
//!
//! # Optional: test and mock files go here instead of the main converters
//! [converter.tests]
//! to_ir = ["node", "tools/test-to-ir.mjs", "{input}"]
//! from_ir = ["node", "tools/test-from-ir.mjs", "{output}"]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSectionConfig {
    pub a: CommandConfig,
    pub b: CommandConfig,
    pub tests: Option<CommandConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Converter identity used in cache keys, defaults to the command line.
    pub id: Option<String>,
    pub to_ir: Vec<String>,
    pub from_ir: Vec<String>,
}

impl CommandConfig {
    pub fn is_configured(&self) -> bool {
        !self.to_ir.is_empty() && !self.from_ir.is_empty()
    }

    /// Stable identity: explicit `id`, or both command lines joined.
    pub fn identity(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{} | {}", self.to_ir.join(" "), self.from_ir.join(" ")))
    }
}

impl ConverterSectionConfig {
    pub const A: FieldPath = FieldPath::new("converter.a");
    pub const B: FieldPath = FieldPath::new("converter.b");
    pub const TESTS: FieldPath = FieldPath::new("converter.tests");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let hint = "set both `to_ir` and `from_ir` command lines";
        if !self.a.is_configured() {
            diag.error_with_hint(Self::A, "converter is not configured", hint);
        }
        if !self.b.is_configured() {
            diag.error_with_hint(Self::B, "converter is not configured", hint);
        }
        if let Some(tests) = &self.tests
            && !tests.is_configured()
        {
            diag.error_with_hint(Self::TESTS, "converter is incomplete", hint);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_converter_config() {
        let config = test_parse_config("");
        assert_eq!(config.converter.a.to_ir, vec!["a2ir", "{input}"]);
        assert!(config.converter.tests.is_none());
        assert_eq!(config.converter.a.identity(), "a2ir {input} | ir2a {output}");
    }

    #[test]
    fn test_converter_explicit_id() {
        let config = test_parse_config(
            "[converter.tests]\nid = \"tests-v2\"\nto_ir = [\"t\"]\nfrom_ir = [\"t\"]",
        );
        assert_eq!(config.converter.tests.unwrap().identity(), "tests-v2");
    }

    #[test]
    fn test_incomplete_converter_rejected() {
        let config = test_parse_config("[converter.tests]\nto_ir = [\"t\"]");
        let mut diag = crate::config::types::ConfigDiagnostics::new();
        config.converter.validate(&mut diag);
        assert_eq!(diag.len(), 1);
    }
}
