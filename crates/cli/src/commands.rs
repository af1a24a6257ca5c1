use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::json;
use tally_core::ExternalTransaction;
use tally_match::{
    DeduplicationResult, DuplicateDetector, MatchConfig, ReconcileRequest, ReconciliationResult,
    Reconciler,
};

/// Load and validate the matching configuration, or use defaults.
pub fn load_config(path: Option<&Path>) -> Result<MatchConfig> {
    let Some(path) = path else {
        return Ok(MatchConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config = MatchConfig::from_toml(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn run_reconcile(config: &MatchConfig, input: &Path) -> Result<ReconciliationResult> {
    let request: ReconcileRequest = read_json(input)?;
    let reconciler = Reconciler::new(config.reconcile.clone());
    Ok(reconciler.reconcile(&request))
}

pub fn run_dedup(
    config: &MatchConfig,
    new: &Path,
    existing: Option<&Path>,
) -> Result<DeduplicationResult> {
    let new: Vec<ExternalTransaction> = read_json(new)?;
    let existing: Vec<ExternalTransaction> = match existing {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let mut detector = DuplicateDetector::new(config.dedup.clone());
    Ok(detector.check_batch(&new, &existing))
}

/// Reconcile and print either JSON (`summary` + `result`) or the text report.
pub fn cmd_reconcile(config: &MatchConfig, input: &Path, report: bool) -> Result<()> {
    let result = run_reconcile(config, input)?;
    if report {
        print!("{result}");
    } else {
        let output = json!({
            "summary": result.summary(),
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

pub fn cmd_dedup(config: &MatchConfig, new: &Path, existing: Option<&Path>) -> Result<()> {
    let result = run_dedup(config, new, existing)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tally_match::MatchType;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const REQUEST: &str = r#"{
        "entity": "acme",
        "account": "BDO-001",
        "period": { "start": "2025-01-01", "end": "2025-01-31" },
        "external": [
            { "id": "b1", "date": "2025-01-15", "description": "DEPOSIT", "amount": "5000.00" },
            { "id": "b2", "date": "2025-01-20", "description": "CHECK 101", "amount": "-1200.00" }
        ],
        "internal": [
            {
                "id": "k1",
                "date": "2025-01-14",
                "description": "Customer receipt",
                "amount": "5000.00"
            }
        ],
        "bank": { "opening": "0", "closing": "3800.00" },
        "book": { "opening": "0", "closing": "5000.00" }
    }"#;

    #[test]
    fn defaults_without_config_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config, MatchConfig::default());
    }

    #[test]
    fn loads_config_file() {
        let file = write_temp("[reconcile]\ndate_tolerance_days = 0\n");
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.reconcile.date_tolerance_days, 0);
        assert_eq!(config.dedup, MatchConfig::default().dedup);
    }

    #[test]
    fn rejects_invalid_config() {
        let file = write_temp("[reconcile]\namount_tolerance = \"-0.5\"\n");
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/tally.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn reconciles_request_file() {
        let file = write_temp(REQUEST);
        let result = run_reconcile(&MatchConfig::default(), file.path()).unwrap();
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].match_type, MatchType::Fuzzy);
        assert_eq!(result.unmatched_external[0].transaction.id, "b2");
        assert!(!result.is_reconciled());
    }

    #[test]
    fn config_changes_reconcile_outcome() {
        let request = write_temp(REQUEST);
        let config = write_temp("[reconcile]\ndate_tolerance_days = 0\n");
        let config = load_config(Some(config.path())).unwrap();
        let result = run_reconcile(&config, request.path()).unwrap();
        assert!(result.matched.is_empty());
    }

    #[test]
    fn malformed_request_reports_path() {
        let file = write_temp("{ not json");
        let err = run_reconcile(&MatchConfig::default(), file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn dedups_against_history_file() {
        let new = write_temp(
            r#"[
                { "id": "n1", "date": "2025-01-15", "description": "JOLLIBEE", "amount": "350.00" },
                { "id": "n2", "date": "2025-01-16", "description": "GRAB", "amount": "180.00" }
            ]"#,
        );
        let existing = write_temp(
            r#"[
                { "id": "h1", "date": "2025-01-15", "description": "JOLLIBEE", "amount": "350.00" }
            ]"#,
        );
        let result = run_dedup(&MatchConfig::default(), new.path(), Some(existing.path())).unwrap();
        assert_eq!(result.definite_duplicates.len(), 1);
        assert_eq!(result.unique.len(), 1);
        assert_eq!(result.unique[0].id, "n2");
    }

    #[test]
    fn dedup_without_history_screens_batch_only() {
        let new = write_temp(
            r#"[
                { "id": "n1", "date": "2025-01-15", "description": "JOLLIBEE", "amount": "350.00" },
                { "id": "n2", "date": "2025-01-15", "description": "JOLLIBEE", "amount": "350.00" }
            ]"#,
        );
        let result = run_dedup(&MatchConfig::default(), new.path(), None).unwrap();
        assert_eq!(result.unique.len(), 1);
        assert_eq!(result.definite_duplicates.len(), 1);
    }
}
