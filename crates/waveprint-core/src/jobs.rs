//! Background analysis jobs
//!
//! Long files are analyzed off the caller's thread: `submit` returns an
//! opaque handle, `poll` reads the job's status from a single locked slot so
//! no two polls ever see inconsistent state. The worker owns its temporary
//! input file exclusively and deletes it on every exit path, including panic
//! unwinds, via a drop guard.

use crate::audio;
use crate::config::AnalyzerConfig;
use crate::descriptor::{assemble_descriptor, DescriptorRecord};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Opaque job handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{:08x}", self.0)
    }
}

/// Caller-visible job state.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Processing,
    Completed(DescriptorRecord),
    Failed(String),
}

/// Deletes the job's input file when the worker exits, however it exits.
struct TempFileGuard(PathBuf);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.0) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!("failed to remove job input {}: {err}", self.0.display());
            }
        }
    }
}

/// Store of background analysis jobs.
#[derive(Default)]
pub struct JobStore {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, Arc<Mutex<JobStatus>>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit an audio file for background descriptor assembly.
    ///
    /// The store takes ownership of the file at `path`: it is removed when
    /// the job finishes, whether analysis succeeded or not.
    pub fn submit(&self, path: PathBuf, config: AnalyzerConfig) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(Mutex::new(JobStatus::Processing));

        {
            let mut jobs = match self.jobs.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            jobs.insert(id, Arc::clone(&slot));
        }

        thread::spawn(move || {
            let _guard = TempFileGuard(path.clone());
            let result = run_analysis(&path, &config);
            let status = match result {
                Ok(record) => JobStatus::Completed(record),
                Err(err) => {
                    log::warn!("{id}: analysis failed: {err:#}");
                    JobStatus::Failed(format!("{err:#}"))
                }
            };
            match slot.lock() {
                Ok(mut guard) => *guard = status,
                Err(poisoned) => *poisoned.into_inner() = status,
            }
        });

        id
    }

    /// Poll a job. `None` for an unknown handle.
    pub fn poll(&self, id: JobId) -> Option<JobStatus> {
        let slot = {
            let jobs = match self.jobs.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            jobs.get(&id).cloned()
        }?;
        let status = match slot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Some(status)
    }

    /// Drop a finished job's bookkeeping. Returns false while processing.
    pub fn remove(&self, id: JobId) -> bool {
        let mut jobs = match self.jobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let done = jobs
            .get(&id)
            .map(|slot| {
                let status = match slot.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                !matches!(status, JobStatus::Processing)
            })
            .unwrap_or(false);
        if done {
            jobs.remove(&id);
        }
        done
    }
}

fn run_analysis(path: &std::path::Path, config: &AnalyzerConfig) -> anyhow::Result<DescriptorRecord> {
    let audio_data = audio::decode_audio(path, config.sample_rate)?;
    let record = assemble_descriptor(&audio_data.samples, audio_data.sample_rate, config)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use std::io::Write;
    use std::time::Duration;

    fn wait_until_done(store: &JobStore, id: JobId) -> JobStatus {
        for _ in 0..200 {
            match store.poll(id) {
                Some(JobStatus::Processing) => thread::sleep(Duration::from_millis(25)),
                Some(done) => return done,
                None => panic!("job disappeared"),
            }
        }
        panic!("job did not finish in time");
    }

    fn write_test_wav(dir: &std::path::Path, secs: f32) -> PathBuf {
        let path = dir.join("job_input.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        let n = (22050.0 * secs) as usize;
        for i in 0..n {
            let sample = (2.0 * PI * 440.0 * i as f32 / 22050.0).sin();
            writer.write_sample((sample * i16::MAX as f32 * 0.8) as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn completed_job_yields_descriptor_and_deletes_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(dir.path(), 2.0);

        let store = JobStore::new();
        let id = store.submit(path.clone(), AnalyzerConfig::default());

        match wait_until_done(&store, id) {
            JobStatus::Completed(record) => assert!(record.energy_rms.is_some()),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(!path.exists(), "input file must be deleted on success");
        assert!(store.remove(id));
        assert!(store.poll(id).is_none());
    }

    #[test]
    fn failed_job_reports_reason_and_deletes_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_audio.wav");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"definitely not a wav").unwrap();
        drop(file);

        let store = JobStore::new();
        let id = store.submit(path.clone(), AnalyzerConfig::default());

        match wait_until_done(&store, id) {
            JobStatus::Failed(reason) => assert!(!reason.is_empty()),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(!path.exists(), "input file must be deleted on failure");
    }

    #[test]
    fn unknown_handle_polls_none() {
        let store = JobStore::new();
        assert!(store.poll(JobId(999)).is_none());
    }
}
