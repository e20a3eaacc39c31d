//! Safety utilities to prevent accidental overwriting of history exports.
//!
//! Streaming history exports cannot be re-downloaded quickly, so output
//! paths are checked against the inputs before anything is written.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output must have the required extension (e.g., "json")
/// - Output cannot be the same as any of the provided source paths
/// - Output cannot look like a streaming history export
///
/// # Arguments
/// * `output` - The output path that will be created/overwritten
/// * `required_extension` - Extension the output must carry, without the dot
/// * `source_paths` - Slice of source paths that must not match the output
pub fn validate_output_path(output: &Path, required_extension: &str, source_paths: &[&Path]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extension.eq_ignore_ascii_case(required_extension) {
        bail!(
            "Safety check failed: output file '{}' must have a .{} extension",
            output.display(),
            required_extension
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    // Export file names: endsong_0.json, Streaming_History_Audio_2023.json
    let lower = output_name.to_lowercase();
    let dangerous_patterns = ["endsong", "streaming_history", "streaminghistory"];
    for pattern in dangerous_patterns {
        if lower.contains(pattern) {
            bail!(
                "Safety check failed: output '{}' matches streaming export pattern '{}'",
                output.display(),
                pattern
            );
        }
    }

    Ok(())
}
