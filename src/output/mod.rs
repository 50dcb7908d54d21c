//! Output of scrape results
//!
//! Results are rendered as JSON and written to stdout or a file.

use serde_json::Value;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Renders a result as JSON
///
/// # Arguments
///
/// * `value` - The value to render
/// * `pretty` - Indent the output
pub fn render_json(value: &Value, pretty: bool) -> OutputResult<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

/// Writes a result as pretty JSON to `path`, or to stdout when no path is given
///
/// # Arguments
///
/// * `value` - The value to write
/// * `path` - Destination file; replaced if it exists
pub fn write_result(value: &Value, path: Option<&Path>) -> OutputResult<()> {
    let mut text = render_json(value, true)?;
    text.push('\n');

    match path {
        Some(path) => {
            std::fs::write(path, text)?;
            tracing::info!("Result written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(text.as_bytes())?;
            handle.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_render_json_compact() {
        let value = json!({"title": "Hello", "links": ["/a", "/b"]});
        assert_eq!(
            render_json(&value, false).unwrap(),
            r#"{"links":["/a","/b"],"title":"Hello"}"#
        );
    }

    #[test]
    fn test_render_json_pretty() {
        let value = json!({"title": "Hello"});
        assert_eq!(render_json(&value, true).unwrap(), "{\n  \"title\": \"Hello\"\n}");
    }

    #[test]
    fn test_write_result_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");

        write_result(&json!({"a": 1}), Some(&path)).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, json!({"a": 1}));
        assert!(written.ends_with('\n'));
    }

    #[test]
    fn test_write_result_to_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("result.json");

        let result = write_result(&json!({}), Some(&path));
        assert!(matches!(result, Err(OutputError::Io(_))));
    }
}
