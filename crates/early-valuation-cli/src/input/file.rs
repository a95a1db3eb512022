use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON or YAML file (by extension) and deserialise into a typed struct.
pub fn read_input<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let value: T = if is_yaml(&canonical) {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Resolve the path relative to the working directory and check it is a file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use early_valuation_core::monte_carlo::exit_value::ExitSimulationInput;
    use early_valuation_core::valuation::profile::DcfProfileInput;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("earlyval-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_yaml_input() {
        let path = write_temp(
            "exit.yaml",
            "n_sims: 250\nfailure_prob: 0.3\nhistogram_bins: 20\n",
        );
        let input: ExitSimulationInput = read_input(path.to_str().unwrap()).unwrap();
        assert_eq!(input.config.n_sims, 250);
        assert_eq!(input.config.failure_prob, 0.3);
        assert_eq!(input.histogram_bins, 20);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_json_input() {
        let path = write_temp(
            "profile.json",
            r#"{"discount_rate": "0.1", "cash_flows": [{"year": 0, "cash_flow": "-10"}, {"year": 1, "cash_flow": "12"}]}"#,
        );
        let input: DcfProfileInput = read_input(path.to_str().unwrap()).unwrap();
        assert_eq!(input.cash_flows.len(), 2);
        assert_eq!(input.discount_rate.to_string(), "0.1");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = read_input::<DcfProfileInput>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
