//! Scalar metric sinks.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use cadenza_core::Result;
use serde::Serialize;
use tracing::info;

use crate::trainer::EpochSummary;

/// Receives named groups of scalars at a given step.
pub trait ScalarLogger {
    fn add_scalars(&mut self, group: &str, values: &BTreeMap<String, f64>, step: usize)
        -> Result<()>;
}

/// Writes scalars as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingScalarLogger;

impl ScalarLogger for TracingScalarLogger {
    fn add_scalars(
        &mut self,
        group: &str,
        values: &BTreeMap<String, f64>,
        step: usize,
    ) -> Result<()> {
        info!(group, step, values = ?values, "scalars");
        Ok(())
    }
}

#[derive(Serialize)]
struct ScalarRecord<'a> {
    group: &'a str,
    step: usize,
    values: &'a BTreeMap<String, f64>,
}

/// Appends one JSON object per call to a file.
pub struct JsonlScalarLogger {
    writer: BufWriter<File>,
}

impl JsonlScalarLogger {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ScalarLogger for JsonlScalarLogger {
    fn add_scalars(
        &mut self,
        group: &str,
        values: &BTreeMap<String, f64>,
        step: usize,
    ) -> Result<()> {
        let record = ScalarRecord {
            group,
            step,
            values,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Fans scalars out to several sinks.
#[derive(Default)]
pub struct MultiLogger {
    sinks: Vec<Box<dyn ScalarLogger + Send>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ScalarLogger + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl ScalarLogger for MultiLogger {
    fn add_scalars(
        &mut self,
        group: &str,
        values: &BTreeMap<String, f64>,
        step: usize,
    ) -> Result<()> {
        for sink in &mut self.sinks {
            sink.add_scalars(group, values, step)?;
        }
        Ok(())
    }
}

/// Log the epoch's train and dev losses under the `losses` group.
pub fn record_info<L: ScalarLogger + ?Sized>(
    train: &EpochSummary,
    dev: &EpochSummary,
    epoch: usize,
    logger: &mut L,
) -> Result<()> {
    let values = BTreeMap::from([
        ("train_loss".to_string(), train.loss),
        ("dev_loss".to_string(), dev.loss),
    ]);
    logger.add_scalars("losses", &values, epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Capture(Vec<(String, BTreeMap<String, f64>, usize)>);

    impl ScalarLogger for Capture {
        fn add_scalars(
            &mut self,
            group: &str,
            values: &BTreeMap<String, f64>,
            step: usize,
        ) -> Result<()> {
            self.0.push((group.to_string(), values.clone(), step));
            Ok(())
        }
    }

    fn summary(loss: f64) -> EpochSummary {
        EpochSummary {
            loss,
            steps: 1,
            examples: 1,
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_record_info() {
        let mut capture = Capture::default();
        record_info(&summary(0.5), &summary(0.75), 3, &mut capture).unwrap();

        let (group, values, step) = &capture.0[0];
        assert_eq!(group, "losses");
        assert_eq!(*step, 3);
        assert_eq!(values["train_loss"], 0.5);
        assert_eq!(values["dev_loss"], 0.75);
    }

    #[test]
    fn test_jsonl_logger_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");

        let mut logger = JsonlScalarLogger::create(&path).unwrap();
        record_info(&summary(1.0), &summary(2.0), 1, &mut logger).unwrap();
        record_info(&summary(0.5), &summary(1.5), 2, &mut logger).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["group"], "losses");
        assert_eq!(second["step"], 2);
        assert_eq!(second["values"]["dev_loss"], 1.5);
    }

    #[test]
    fn test_multi_logger_fans_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");
        let mut logger = MultiLogger::new()
            .with(TracingScalarLogger)
            .with(JsonlScalarLogger::create(&path).unwrap());

        record_info(&summary(1.0), &summary(2.0), 1, &mut logger).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
