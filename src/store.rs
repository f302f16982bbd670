use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{ReportRecord, RiskAssessment};

/// Directory of saved reports: `<id>.md` plus a `<id>.json` record each.
#[derive(Debug, Clone)]
pub struct ReportStore {
    root: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn sanitize_username(username: &str) -> String {
    let cleaned: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

pub fn report_id(username: &str, created_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        sanitize_username(username),
        created_at.format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

impl ReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn checked_id<'a>(&self, id: &'a str) -> Result<&'a str, StoreError> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        if valid {
            Ok(id)
        } else {
            Err(StoreError::InvalidId(id.to_string()))
        }
    }

    pub fn report_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.md"))
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    pub fn save(
        &self,
        username: &str,
        assessment: &RiskAssessment,
        markdown: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ReportRecord, StoreError> {
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;

        let record = ReportRecord {
            id: report_id(username, created_at),
            username: username.to_string(),
            created_at,
            assessment: assessment.clone(),
        };

        let report_path = self.report_path(&record.id);
        fs::write(&report_path, markdown).map_err(io_error(&report_path))?;

        let record_path = self.record_path(&record.id);
        let json = serde_json::to_string_pretty(&record).map_err(|source| StoreError::Record {
            path: record_path.clone(),
            source,
        })?;
        fs::write(&record_path, json).map_err(io_error(&record_path))?;

        info!(id = %record.id, path = %report_path.display(), "saved report");
        Ok(record)
    }

    /// Records newest first. Unreadable records are skipped.
    pub fn list(&self) -> Result<Vec<ReportRecord>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_error(&self.root))? {
            let path = entry.map_err(io_error(&self.root))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(err) => warn!(%err, "skipping unreadable report record"),
            }
        }

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    pub fn get(&self, id: &str) -> Result<(ReportRecord, String), StoreError> {
        let id = self.checked_id(id)?;
        let record_path = self.record_path(id);
        if !record_path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let record = read_record(&record_path)?;
        let report_path = self.report_path(id);
        let markdown = fs::read_to_string(&report_path).map_err(io_error(&report_path))?;
        Ok((record, markdown))
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = self.checked_id(id)?;
        let mut removed = false;
        for path in [self.report_path(id), self.record_path(id)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(io_error(&path)(err)),
            }
        }
        if removed {
            info!(id, "deleted report");
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}

fn read_record(path: &Path) -> Result<ReportRecord, StoreError> {
    let raw = fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Record {
        path: path.to_path_buf(),
        source,
    })
}
