//! Append-only lookup history, doubling as the lookup cache.
//!
//! One record per line: `subject-sourcekey-{json field map}`. Lines are split at
//! the first two delimiters only, so the JSON may contain the delimiter. When
//! a (subject, source key) pair appears more than once the last line wins.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

use crate::Error;

use super::{FieldMap, SourceKey};

const DELIMITER: char = '-';

/// Subject to source key to the last recorded field map.
pub type History = HashMap<String, HashMap<SourceKey, FieldMap>>;

#[derive(Debug, thiserror::Error)]
enum LineError {
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),
    #[error("{0}")]
    SourceKey(String),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

pub struct HistoryStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subjects are written verbatim, so they must not contain the delimiter
    /// or a line break.
    pub fn check_subject(subject: &str) -> Result<(), Error> {
        if !Self::is_storable(subject) {
            return Err(Error::InvalidSubject(subject.to_string()));
        }
        Ok(())
    }

    pub fn is_storable(subject: &str) -> bool {
        !subject.is_empty() && !subject.contains([DELIMITER, '\n', '\r'])
    }

    /// Scans the whole log. A missing file is an empty history; malformed
    /// lines are skipped.
    pub async fn read(&self) -> Result<History, Error> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("history file {} not found", self.path.display());
                return Ok(History::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut history = History::new();
        for (number, line) in String::from_utf8_lossy(&bytes).lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok((subject, key, fields)) => {
                    history
                        .entry(subject.to_string())
                        .or_default()
                        .insert(key, fields);
                }
                Err(err) => warn!("skipping history line {}: {}: {}", number + 1, err, line),
            }
        }
        Ok(history)
    }

    pub async fn get(&self, subject: &str, key: SourceKey) -> Result<Option<FieldMap>, Error> {
        let mut history = self.read().await?;
        Ok(history
            .get_mut(subject)
            .and_then(|sources| sources.remove(&key)))
    }

    /// Appends one record. Concurrent appends are serialized so each line is
    /// written whole.
    pub async fn append(
        &self,
        subject: &str,
        key: SourceKey,
        fields: &FieldMap,
    ) -> Result<(), Error> {
        Self::check_subject(subject)?;
        let line = format!(
            "{subject}{DELIMITER}{key}{DELIMITER}{}\n",
            serde_json::to_string(fields)?
        );

        let _guard = self.writer.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn parse_line(line: &str) -> Result<(&str, SourceKey, FieldMap), LineError> {
    let parts: Vec<&str> = line.splitn(3, DELIMITER).collect();
    let &[subject, key, data] = parts.as_slice() else {
        return Err(LineError::FieldCount(parts.len()));
    };
    let key = key.parse().map_err(LineError::SourceKey)?;
    let fields = serde_json::from_str(data)?;
    Ok((subject, key, fields))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::lookup::{Source, mock::fields};

    fn store(tmp: &TempDir) -> HistoryStore {
        HistoryStore::new(tmp.path().join("data/ip_history.txt"))
    }

    #[tokio::test]
    async fn missing_file_is_empty_history() {
        let tmp = TempDir::new().unwrap();
        let history = store(&tmp).read().await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn appended_records_read_back() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let records = [
            ("8.8.8.8", SourceKey::Source(Source::Ipshudi), fields(&[("归属地", "美国")])),
            ("8.8.8.8", SourceKey::Source(Source::Ip138), fields(&[("ASN归属地", "Google LLC")])),
            ("8.8.8.8", SourceKey::Fastest, fields(&[("ASN归属地", "Google LLC")])),
            ("1.1.1.1", SourceKey::Fastest, fields(&[])),
            ("2001:db8::1", SourceKey::Source(Source::Ip138), fields(&[("iP段", "a - b")])),
        ];
        for (subject, key, fields) in &records {
            store.append(subject, *key, fields).await.unwrap();
        }

        let history = store.read().await.unwrap();
        let total: usize = history.values().map(HashMap::len).sum();
        assert_eq!(total, records.len());
        for (subject, key, fields) in &records {
            assert_eq!(&history[*subject][key], fields);
        }
    }

    #[tokio::test]
    async fn last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let key = SourceKey::Source(Source::Ipshudi);
        store
            .append("8.8.8.8", key, &fields(&[("归属地", "美国")]))
            .await
            .unwrap();
        store
            .append("8.8.8.8", key, &fields(&[("归属地", "美国 加利福尼亚")]))
            .await
            .unwrap();

        let history = store.read().await.unwrap();
        assert_eq!(history["8.8.8.8"].len(), 1);
        assert_eq!(
            store.get("8.8.8.8", key).await.unwrap(),
            Some(fields(&[("归属地", "美国 加利福尼亚")]))
        );
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            concat!(
                "no delimiters here\n",
                "8.8.8.8-fastest-{\"ASN归属地\": \"Google LLC\"}\n",
                "8.8.8.8-ipip-{}\n",
                "8.8.8.8-ip138-{not json\n",
                "\n",
            ),
        )
        .unwrap();

        let history = store.read().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history["8.8.8.8"].len(), 1);
        assert_eq!(
            history["8.8.8.8"][&SourceKey::Fastest],
            fields(&[("ASN归属地", "Google LLC")])
        );
    }

    #[tokio::test]
    async fn reads_ascii_escaped_json() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            "8.8.8.8-ipshudi-{\"\\u5f52\\u5c5e\\u5730\": \"\\u7f8e\\u56fd\"}\n",
        )
        .unwrap();

        let cached = store
            .get("8.8.8.8", SourceKey::Source(Source::Ipshudi))
            .await
            .unwrap();
        assert_eq!(cached, Some(fields(&[("归属地", "美国")])));
    }

    #[tokio::test]
    async fn concurrent_appends_stay_whole() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(store(&tmp));
        let value = "x".repeat(4096);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                let n = i.to_string();
                let fields = fields(&[("n", n.as_str()), ("pad", value.as_str())]);
                tokio::spawn(async move {
                    store
                        .append(&format!("10.0.0.{i}"), SourceKey::Fastest, &fields)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = store.read().await.unwrap();
        assert_eq!(history.len(), 32);
        for i in 0..32 {
            let cached = &history[&format!("10.0.0.{i}")][&SourceKey::Fastest];
            assert_eq!(cached["n"], i.to_string());
        }
    }

    #[tokio::test]
    async fn subjects_with_delimiter_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let result = store
            .append("bad-subject", SourceKey::Fastest, &FieldMap::new())
            .await;
        assert!(matches!(result, Err(Error::InvalidSubject(_))));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_part_of_the_subject() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let key = SourceKey::Source(Source::Ipshudi);
        store
            .append(" 8.8.8.8", key, &fields(&[("归属地", "空格")]))
            .await
            .unwrap();
        store
            .append("8.8.8.8 ", key, &fields(&[("归属地", "尾随")]))
            .await
            .unwrap();

        assert_eq!(
            store.get(" 8.8.8.8", key).await.unwrap(),
            Some(fields(&[("归属地", "空格")]))
        );
        assert_eq!(
            store.get("8.8.8.8 ", key).await.unwrap(),
            Some(fields(&[("归属地", "尾随")]))
        );
        assert_eq!(store.get("8.8.8.8", key).await.unwrap(), None);
    }
}
