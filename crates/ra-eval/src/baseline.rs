//! Baseline persistence: one JSON document per version, under
//! `StorageConfig.baselines_dir`, written the same atomic way the
//! Conversation Store writes conversations.

use chrono::Utc;
use ra_domain::eval::Baseline;
use ra_domain::eval::SuiteResults;
use ra_domain::{Error, Result};
use std::path::{Path, PathBuf};

fn path_for(dir: &Path, version: &str) -> PathBuf {
    dir.join(format!("{version}.json"))
}

pub fn save_baseline(dir: &Path, version: &str, summary: SuiteResults) -> Result<Baseline> {
    std::fs::create_dir_all(dir)?;
    let baseline = Baseline {
        version: version.to_string(),
        timestamp: Utc::now(),
        summary,
    };
    let bytes = serde_json::to_vec_pretty(&baseline)?;
    atomic_write(&path_for(dir, version), &bytes)?;
    Ok(baseline)
}

pub fn load_baseline(dir: &Path, version: &str) -> Result<Baseline> {
    let path = path_for(dir, version);
    let bytes = std::fs::read(&path).map_err(|_| Error::NotFound(format!("no baseline named {version:?}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| Error::Other("baseline path has no parent".into()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_domain::eval::EvaluationResult;
    use std::time::Duration;

    fn suite() -> SuiteResults {
        let result = EvaluationResult {
            scenario_id: "s1".to_string(),
            scores: Default::default(),
            passed: true,
            details: Default::default(),
            duration: Duration::from_millis(5),
            error: None,
        };
        SuiteResults::from_results(vec![result], Duration::from_secs(1))
    }

    #[test]
    fn round_trips_a_baseline() {
        let dir = tempfile::tempdir().unwrap();
        save_baseline(dir.path(), "v1", suite()).unwrap();
        let loaded = load_baseline(dir.path(), "v1").unwrap();
        assert_eq!(loaded.version, "v1");
        assert_eq!(loaded.summary.total, 1);
    }

    #[test]
    fn missing_baseline_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_baseline(dir.path(), "missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
