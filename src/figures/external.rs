//! Blocking invocations of the external PDF converter and cropper.

use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};

pub const DEFAULT_PDF_CONVERTER: &str = "rsvg-convert -f pdf -o {output} {input}";
pub const DEFAULT_CROP_COMMAND: &str = "pdfcrop {input} {output}";

/// A command line template with `{input}` and `{output}` placeholders.
///
/// The template is split on whitespace before substitution, so paths
/// containing spaces stay single arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    template: String,
}

impl ToolCommand {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Program and arguments with placeholders filled in.
    pub fn argv(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.template
            .split_whitespace()
            .map(|token| {
                token
                    .replace("{input}", &input)
                    .replace("{output}", &output)
            })
            .collect()
    }

    /// Runs the command to completion. A spawn failure or non-zero exit is an error.
    pub fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let argv = self.argv(input, output);
        let Some((program, args)) = argv.split_first() else {
            return Err(AnalysisError::ExternalTool {
                command: self.template.clone(),
                reason: "empty command".to_string(),
            });
        };

        debug!(program = %program, ?args, "Running external tool");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| AnalysisError::ExternalTool {
                command: argv.join(" "),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(AnalysisError::ExternalTool {
                command: argv.join(" "),
                reason: format!("exited with {status}"),
            });
        }

        info!(program = %program, output = %output.display(), "External tool finished");
        Ok(())
    }
}

/// External programs used to produce and tidy PDF figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTools {
    pub pdf_converter: ToolCommand,
    /// `None` skips cropping.
    pub crop: Option<ToolCommand>,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            pdf_converter: ToolCommand::new(DEFAULT_PDF_CONVERTER),
            crop: Some(ToolCommand::new(DEFAULT_CROP_COMMAND)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_argv_substitutes_placeholders() {
        let cmd = ToolCommand::new(DEFAULT_CROP_COMMAND);
        let path = PathBuf::from("/tmp/my figure.pdf");

        let argv = cmd.argv(&path, &path);

        assert_eq!(argv, vec!["pdfcrop", "/tmp/my figure.pdf", "/tmp/my figure.pdf"]);
    }

    #[test]
    fn test_empty_command_is_an_error() {
        let cmd = ToolCommand::new("   ");

        let result = cmd.run(Path::new("in"), Path::new("out"));

        assert!(matches!(result, Err(AnalysisError::ExternalTool { .. })));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let cmd = ToolCommand::new("wikilag-no-such-program {input}");

        let result = cmd.run(Path::new("in"), Path::new("out"));

        assert!(matches!(result, Err(AnalysisError::ExternalTool { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_an_error() {
        assert!(ToolCommand::new("true").run(Path::new("a"), Path::new("b")).is_ok());

        let result = ToolCommand::new("false").run(Path::new("a"), Path::new("b"));

        match result {
            Err(AnalysisError::ExternalTool { reason, .. }) => assert!(reason.contains("exited")),
            other => panic!("expected tool failure, got {other:?}"),
        }
    }
}
