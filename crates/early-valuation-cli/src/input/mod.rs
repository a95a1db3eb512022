pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Resolve command input: `--input FILE` first, then piped stdin.
/// Returns None when neither is present so the caller can fall back to flags.
pub fn resolve<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        tracing::debug!(path, "reading input file");
        return Ok(Some(file::read_input(path)?));
    }
    match stdin::read_piped()? {
        // YAML is a superset of JSON, so one parser covers both.
        Some(text) => {
            tracing::debug!(bytes = text.len(), "reading input from stdin");
            let value = serde_yaml::from_str(&text)
                .map_err(|e| format!("Failed to parse stdin: {e}"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
