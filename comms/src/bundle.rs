use std::collections::BTreeMap;

use crate::{CodecErr, Result, WorkerRecord, decode};

/// The aggregate output of a round, one record per worker keyed by its id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundBundle {
    records: BTreeMap<String, WorkerRecord>,
}

impl RoundBundle {
    /// Creates a new empty `RoundBundle`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` under its own worker id.
    ///
    /// # Returns
    /// The record previously stored for that worker, if any.
    pub fn insert(&mut self, record: WorkerRecord) -> Option<WorkerRecord> {
        self.records.insert(record.worker_id.clone(), record)
    }

    /// Looks up the record of a worker.
    pub fn get(&self, worker_id: &str) -> Option<&WorkerRecord> {
        self.records.get(worker_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates the records ordered by worker id.
    pub fn iter(&self) -> impl Iterator<Item = &WorkerRecord> {
        self.records.values()
    }

    /// Consumes the bundle returning the records ordered by worker id.
    pub fn into_records(self) -> Vec<WorkerRecord> {
        self.records.into_values().collect()
    }

    /// Writes the bundle as a JSON object mapping worker ids to encoded records.
    ///
    /// # Returns
    /// The text form or the first `CodecErr` raised by a record.
    pub fn encode(&self) -> Result<String> {
        for record in self.records.values() {
            record.check_finite()?;
        }

        Ok(serde_json::to_string(&self.records)?)
    }

    /// Parses a bundle previously written by `encode`.
    ///
    /// # Returns
    /// The bundle, or a `CodecErr` if the text is malformed or an entry is stored under
    /// a key different from its record's worker id.
    pub fn decode(raw: &str) -> Result<Self> {
        let entries: BTreeMap<String, WorkerRecord> = serde_json::from_str(raw)?;

        if let Some((key, record)) = entries.iter().find(|(key, r)| **key != r.worker_id) {
            return Err(CodecErr::KeyMismatch {
                key: key.clone(),
                worker_id: record.worker_id.clone(),
            });
        }

        Ok(Self { records: entries })
    }
}

impl FromIterator<WorkerRecord> for RoundBundle {
    fn from_iter<T: IntoIterator<Item = WorkerRecord>>(iter: T) -> Self {
        let mut bundle = Self::new();
        iter.into_iter().for_each(|record| {
            bundle.insert(record);
        });
        bundle
    }
}

/// Parses newline delimited records, skipping blank lines.
///
/// # Arguments
/// * `raw` - One encoded record per line.
///
/// # Returns
/// The records in input order, or the first failure tagged with its 1-based line number.
pub fn decode_batch(raw: &str) -> Result<Vec<WorkerRecord>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| decode(line.trim()).map_err(|e| e.at_line(i + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::encode;

    use super::*;

    fn record(id: &str, x: f64) -> WorkerRecord {
        let mut record = WorkerRecord::initial(id, 1, 1.0, 1.0, 0.0);
        record.x = vec![x];
        record
    }

    #[test]
    fn test_bundle_is_keyed_by_worker_id() {
        let bundle: RoundBundle = [record("b", 4.0), record("a", 2.0)].into_iter().collect();

        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.get("a").unwrap().x, [2.0]);
        assert_eq!(bundle.get("b").unwrap().x, [4.0]);

        let ids: Vec<_> = bundle.iter().map(|r| r.worker_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_bundle_text_survives_decode_encode() {
        let bundle: RoundBundle = [record("a", 2.0), record("b", 4.0)].into_iter().collect();
        let raw = bundle.encode().unwrap();

        let decoded = RoundBundle::decode(&raw).unwrap();
        assert_eq!(decoded, bundle);
        assert_eq!(decoded.encode().unwrap(), raw);
    }

    #[test]
    fn test_bundle_text_matches_record_codec() {
        let (a, b) = (record("a", 2.0), record("b", 4.0));
        let raw = RoundBundle::from_iter([b.clone(), a.clone()]).encode().unwrap();

        let expected = format!(r#"{{"a":{},"b":{}}}"#, encode(&a).unwrap(), encode(&b).unwrap());
        assert_eq!(raw, expected);
    }

    #[test]
    fn test_bundle_rejects_non_finite_record() {
        let mut bad = record("b", 4.0);
        bad.u = vec![f64::NAN];
        let bundle: RoundBundle = [record("a", 2.0), bad].into_iter().collect();

        match bundle.encode().unwrap_err() {
            CodecErr::NonFinite {
                worker_id, field, ..
            } => {
                assert_eq!(worker_id, "b");
                assert_eq!(field, "u");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bundle_rejects_foreign_key() {
        let raw = RoundBundle::from_iter([record("a", 2.0)])
            .encode()
            .unwrap()
            .replacen("\"a\":", "\"z\":", 1);

        let err = RoundBundle::decode(&raw).unwrap_err();
        assert!(matches!(err, CodecErr::KeyMismatch { .. }));
    }

    #[test]
    fn test_batch_skips_blank_lines() {
        let raw = format!(
            "{}\n\n{}\n",
            encode(&record("a", 1.0)).unwrap(),
            encode(&record("b", 2.0)).unwrap()
        );

        let records = decode_batch(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].worker_id, "b");
    }

    #[test]
    fn test_batch_reports_failing_line() {
        let raw = format!("{}\n{{broken\n", encode(&record("a", 1.0)).unwrap());

        match decode_batch(&raw).unwrap_err() {
            CodecErr::Malformed { line, .. } => assert_eq!(line, Some(2)),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
