//! File-backed results log in the fleet's historical format
//!
//! The log is one pretty-printed JSON array with one object per particle.
//! Each object holds parallel arrays: one per dimension, plus `fitness` and
//! `pb`, indexed by generation. Analysis notebooks downstream plot straight
//! from this file, so the shape is load-bearing.
//!
//! Appends are read-modify-write of the whole file. Sessions are tens of
//! generations of small vectors; the file stays tiny and the rewrite keeps
//! it valid JSON after every generation.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::debug;

use swarm_pso_core::record::{GenerationRecord, GenerationSink, SinkError};

/// Sink writing the legacy per-particle parallel-array log.
pub struct JsonResultsLog {
    path: PathBuf,
    dimension_names: Vec<String>,
}

impl JsonResultsLog {
    /// Point the log at `path`. The file is created (or truncated) when the
    /// session initializes the sink.
    pub fn create(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            dimension_names: Vec::new(),
        }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn empty_particle_entry(&self) -> Value {
        let mut entry = Map::new();
        for name in &self.dimension_names {
            entry.insert(name.clone(), json!([]));
        }
        entry.insert("fitness".to_owned(), json!([]));
        entry.insert("pb".to_owned(), json!([]));
        Value::Object(entry)
    }

    fn load(&self) -> Result<Vec<Value>, SinkError> {
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw)
            .map_err(|e| SinkError(format!("corrupt results log {}: {e}", self.path.display())))
    }

    fn store(&self, entries: &[Value]) -> Result<(), SinkError> {
        let rendered = serde_json::to_string_pretty(entries)
            .map_err(|e| SinkError(format!("unencodable results log: {e}")))?;
        fs::write(&self.path, rendered)?;
        Ok(())
    }
}

impl GenerationSink for JsonResultsLog {
    fn initialize(
        &mut self,
        num_particles: usize,
        dimension_names: &[String],
    ) -> Result<(), SinkError> {
        self.dimension_names = dimension_names.to_vec();
        let entries: Vec<Value> = (0..num_particles)
            .map(|_| self.empty_particle_entry())
            .collect();
        self.store(&entries)?;
        debug!(path = %self.path.display(), num_particles, "results log initialized");
        Ok(())
    }

    fn append(&mut self, record: &GenerationRecord) -> Result<(), SinkError> {
        let mut entries = self.load()?;
        let entry = entries
            .get_mut(record.particle_id)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                SinkError(format!(
                    "results log has no entry for particle {}",
                    record.particle_id
                ))
            })?;

        for (name, value) in &record.position {
            match entry.get_mut(name.as_str()).and_then(Value::as_array_mut) {
                Some(column) => column.push(json!(value)),
                None => {
                    return Err(SinkError(format!(
                        "results log has no column {name} for particle {}",
                        record.particle_id
                    )))
                }
            }
        }
        push_scalar(entry, "fitness", record.fitness, record.particle_id)?;
        push_scalar(entry, "pb", record.personal_best_fitness, record.particle_id)?;

        self.store(&entries)
    }
}

fn push_scalar(
    entry: &mut Map<String, Value>,
    column: &str,
    value: f64,
    particle_id: usize,
) -> Result<(), SinkError> {
    entry
        .get_mut(column)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| {
            SinkError(format!(
                "results log has no column {column} for particle {particle_id}"
            ))
        })?
        .push(json!(value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!("swarmpso_{prefix}_{pid}_{nanos}"));
        dir
    }

    fn record(particle_id: usize, generation: u32, fitness: f64) -> GenerationRecord {
        GenerationRecord {
            particle_id,
            generation,
            position: vec![
                ("rw_mean".to_owned(), 3000.0 + fitness),
                ("tao".to_owned(), 1500.0),
            ],
            fitness,
            personal_best_fitness: fitness,
        }
    }

    #[test]
    fn initialize_writes_empty_parallel_arrays() {
        let base = temp_dir("init_empty");
        fs::create_dir_all(&base).unwrap();
        let path = base.join("results.json");

        let mut log = JsonResultsLog::create(&path);
        log.initialize(2, &["rw_mean".to_owned(), "tao".to_owned()])
            .unwrap();

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"rw_mean": [], "tao": [], "fitness": [], "pb": []},
                {"rw_mean": [], "tao": [], "fitness": [], "pb": []}
            ])
        );
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn appends_accumulate_per_particle_columns() {
        let base = temp_dir("append_columns");
        fs::create_dir_all(&base).unwrap();
        let path = base.join("results.json");

        let mut log = JsonResultsLog::create(&path);
        log.initialize(2, &["rw_mean".to_owned(), "tao".to_owned()])
            .unwrap();
        log.append(&record(0, 0, 0.5)).unwrap();
        log.append(&record(1, 0, 0.2)).unwrap();
        log.append(&record(0, 1, 0.4)).unwrap();

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["fitness"], json!([0.5, 0.4]));
        assert_eq!(parsed[0]["pb"], json!([0.5, 0.4]));
        assert_eq!(parsed[0]["rw_mean"], json!([3000.5, 3000.4]));
        assert_eq!(parsed[1]["fitness"], json!([0.2]));
        assert_eq!(parsed[1]["tao"], json!([1500.0]));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn append_to_unknown_particle_is_an_error() {
        let base = temp_dir("unknown_particle");
        fs::create_dir_all(&base).unwrap();
        let path = base.join("results.json");

        let mut log = JsonResultsLog::create(&path);
        log.initialize(1, &["rw_mean".to_owned(), "tao".to_owned()])
            .unwrap();
        assert!(log.append(&record(3, 0, 0.1)).is_err());
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn file_stays_parseable_after_every_append() {
        let base = temp_dir("always_valid");
        fs::create_dir_all(&base).unwrap();
        let path = base.join("results.json");

        let mut log = JsonResultsLog::create(&path);
        log.initialize(1, &["rw_mean".to_owned(), "tao".to_owned()])
            .unwrap();
        for generation in 0..5 {
            log.append(&record(0, generation, 0.1 * f64::from(generation)))
                .unwrap();
            let raw = fs::read_to_string(&path).unwrap();
            let parsed: Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(
                parsed[0]["fitness"].as_array().unwrap().len(),
                generation as usize + 1
            );
        }
        let _ = fs::remove_dir_all(&base);
    }
}
