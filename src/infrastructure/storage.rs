use crate::domain::error::{AppError, Result};
use crate::domain::test_case::{
    PersistedTestCase, TestCaseMeta, TestCaseRecord, RECORD_FORMAT_VERSION,
};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::IoError(msg.into())
}

/// Flat-file store for generated records, one pretty-printed JSON file each.
#[derive(Debug, Clone)]
pub struct TestCaseStore {
    root: PathBuf,
}

impl TestCaseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save(&self, record: &TestCaseRecord) -> Result<PathBuf> {
        self.save_at(record, Local::now())
    }

    pub fn save_at(&self, record: &TestCaseRecord, now: DateTime<Local>) -> Result<PathBuf> {
        ensure_dir(&self.root)?;

        let path = self.unused_path(&file_stem(&record.title, &now));
        let persisted = PersistedTestCase {
            record: record.clone(),
            meta: TestCaseMeta {
                generated_at: now.to_rfc3339(),
                version: RECORD_FORMAT_VERSION.to_string(),
            },
        };

        atomic_write_bytes(&path, &to_pretty_json(&persisted)?)?;
        info!(path = %path.display(), test_type = %record.test_type, "Saved test case");
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<TestCaseRecord> {
        let bytes = fs::read(path)
            .map_err(|e| io_err(format!("Failed to read {}: {e}", path.display())))?;
        let persisted: PersistedTestCase = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::ParseError(format!("Invalid test case file {}: {e}", path.display()))
        })?;
        Ok(persisted.record)
    }

    /// Stored records are immutable, so a name collision gets a `_2`, `_3`, ... suffix.
    fn unused_path(&self, stem: &str) -> PathBuf {
        let mut candidate = self.root.join(format!("{}.json", stem));
        let mut counter = 2u32;
        while candidate.exists() {
            candidate = self.root.join(format!("{}_{}.json", stem, counter));
            counter += 1;
        }
        candidate
    }
}

pub fn file_stem(title: &str, now: &DateTime<Local>) -> String {
    format!(
        "testcase_{}_{}",
        sanitize_title(title),
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Keeps alphanumerics, spaces, `_` and `-`.
pub fn sanitize_title(title: &str) -> String {
    let safe: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    if safe.trim().is_empty() {
        "untitled".to_string()
    } else {
        safe
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| io_err(format!("Failed to create dir {}: {e}", path.display())))
}

pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            io_err(format!(
                "Failed to create temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.write_all(bytes).map_err(|e| {
            io_err(format!(
                "Failed to write temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.sync_all().ok();
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(format!(
            "Failed to rename temp file {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_case::{ResultRecord, StepKind, StepRecord, TestType};
    use chrono::TimeZone;
    use serde_json::{json, Map, Value};
    use std::collections::BTreeMap;

    fn sample_record() -> TestCaseRecord {
        let mut data = BTreeMap::new();
        data.insert("username".to_string(), "alice".to_string());
        let mut test_data = Map::new();
        test_data.insert("user".to_string(), json!({"name": "alice", "age": 30}));
        let mut extra = Map::new();
        extra.insert("status_code".to_string(), json!(200));

        TestCaseRecord {
            title: "Login: works / fast?".to_string(),
            description: "登录成功".to_string(),
            test_type: TestType::Functional,
            prerequisites: vec!["user exists".to_string(), "app installed".to_string()],
            steps: vec![
                StepRecord {
                    index: 1,
                    kind: StepKind::ActionOnly {
                        action: "Open app".to_string(),
                    },
                },
                StepRecord {
                    index: 2,
                    kind: StepKind::StructuredAction {
                        action: "Log in".to_string(),
                        data,
                    },
                },
            ],
            expected_results: vec![
                ResultRecord::from_description("Dashboard shown"),
                ResultRecord {
                    description: "Token issued".to_string(),
                    conditions: Some(vec!["expires in 1h".to_string()]),
                    extra,
                },
            ],
            test_data,
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Login: works / fast?"), "Login works  fast");
        assert_eq!(sanitize_title("user_profile-edit"), "user_profile-edit");
        assert_eq!(sanitize_title("登录 测试"), "登录 测试");
        assert_eq!(sanitize_title("???"), "untitled");
    }

    #[test]
    fn test_file_name_convention() {
        let stem = file_stem("Login works", &fixed_time());
        assert_eq!(stem, "testcase_Login works_20240309_140507");
    }

    #[test]
    fn test_round_trip_except_meta() {
        let dir = tempfile::tempdir().unwrap();
        let store = TestCaseStore::new(dir.path().join("testcases"));
        let record = sample_record();

        let path = store.save_at(&record, fixed_time()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "testcase_Login works  fast_20240309_140507.json"
        );

        let raw: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["_meta"]["version"], "1.0");
        assert_eq!(raw["_meta"]["generated_at"], fixed_time().to_rfc3339());
        assert_eq!(raw["description"], "登录成功");

        let loaded = TestCaseStore::load(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_pretty_printed_with_four_spaces_and_raw_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let store = TestCaseStore::new(dir.path());
        let path = store.save_at(&sample_record(), fixed_time()).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("{\n    \"title\""));
        assert!(text.contains("登录成功"));
    }

    #[test]
    fn test_collision_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = TestCaseStore::new(dir.path());
        let record = sample_record();

        let first = store.save_at(&record, fixed_time()).unwrap();
        let second = store.save_at(&record, fixed_time()).unwrap();
        assert_ne!(first, second);
        assert!(second
            .to_str()
            .unwrap()
            .ends_with("testcase_Login works  fast_20240309_140507_2.json"));
        assert!(first.exists());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            TestCaseStore::load(&path),
            Err(AppError::ParseError(_))
        ));
    }
}
