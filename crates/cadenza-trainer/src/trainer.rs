//! Epoch loops for training and validation.

use std::time::{Duration, Instant};

use candle_core::{DType, Device, Tensor};
use cadenza_core::{padding_mask, CadenzaError, PaddedBatch, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::loss::Criterion;
use crate::meter::AverageMeter;
use crate::model::DurationModel;
use crate::optim::ParameterUpdate;

/// Default progress interval for training epochs.
pub const TRAIN_LOG_EVERY: usize = 10_000;
/// Default progress interval for validation epochs.
pub const EVAL_LOG_EVERY: usize = 1_000;

/// Outcome of one pass over a loader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// Batch-size weighted mean loss.
    pub loss: f64,
    /// Batches processed.
    pub steps: usize,
    /// Examples processed.
    pub examples: usize,
    pub elapsed: Duration,
}

impl EpochSummary {
    fn from_meter(meter: &AverageMeter, steps: usize, elapsed: Duration) -> Self {
        Self {
            loss: meter.average,
            steps,
            examples: meter.count,
            elapsed,
        }
    }
}

struct BatchLoss {
    loss: Tensor,
    examples: usize,
}

fn forward_batch<M, C>(
    device: &Device,
    max_len: usize,
    batch: PaddedBatch,
    model: &M,
    criterion: &C,
    train: bool,
) -> Result<BatchLoss>
where
    M: DurationModel + ?Sized,
    C: Criterion + ?Sized,
{
    if batch.max_len != max_len {
        return Err(CadenzaError::InvalidConfig(format!(
            "batch padded to {} but the loop masks to {max_len}",
            batch.max_len
        )));
    }
    let batch = batch.to_device(device)?;
    let mask = padding_mask(&batch.lengths, max_len)?;

    let mut prediction = model.predict(&batch.phones, &batch.mean, &mask, train)?;
    if !train {
        prediction = prediction.detach();
    }
    let loss = criterion.score(&prediction, &batch.durations, &mask)?;

    Ok(BatchLoss {
        loss,
        examples: batch.batch_size(),
    })
}

fn scalar(loss: &Tensor) -> Result<f64> {
    Ok(loss.to_dtype(DType::F64)?.to_scalar::<f64>()?)
}

/// Runs one training epoch: forward, masked loss, update, running average.
#[derive(Debug, Clone)]
pub struct TrainLoop {
    device: Device,
    max_len: usize,
    gradclip: f64,
    log_every: usize,
}

impl TrainLoop {
    pub fn new(device: Device, max_len: usize, gradclip: f64) -> Self {
        Self {
            device,
            max_len,
            gradclip,
            log_every: TRAIN_LOG_EVERY,
        }
    }

    pub fn with_log_every(mut self, steps: usize) -> Self {
        self.log_every = steps.max(1);
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Train over `batches` once.
    ///
    /// Any error from the loader, model, criterion or updater aborts the
    /// epoch and is returned unchanged.
    pub fn run<I, M, C, U>(
        &self,
        batches: I,
        model: &M,
        criterion: &C,
        updater: &mut U,
    ) -> Result<EpochSummary>
    where
        I: IntoIterator<Item = Result<PaddedBatch>>,
        M: DurationModel + ?Sized,
        C: Criterion + ?Sized,
        U: ParameterUpdate + ?Sized,
    {
        let mut meter = AverageMeter::new();
        let start = Instant::now();
        let mut steps = 0;

        for (step, batch) in batches.into_iter().enumerate().map(|(i, b)| (i + 1, b)) {
            let out = forward_batch(&self.device, self.max_len, batch?, model, criterion, true)?;
            let stats = updater.apply_update(&out.loss, self.gradclip)?;
            meter.update(scalar(&out.loss)?, out.examples);
            steps = step;

            debug!(
                step,
                loss = meter.value,
                grad_norm = stats.grad_norm,
                lr = stats.learning_rate,
                "train step"
            );
            if step % self.log_every == 0 {
                info!(
                    step,
                    train_loss = meter.average,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "train progress"
                );
            }
        }

        Ok(EpochSummary::from_meter(&meter, steps, start.elapsed()))
    }
}

/// Runs one validation epoch without parameter updates.
#[derive(Debug, Clone)]
pub struct EvalLoop {
    device: Device,
    max_len: usize,
    log_every: usize,
}

impl EvalLoop {
    pub fn new(device: Device, max_len: usize) -> Self {
        Self {
            device,
            max_len,
            log_every: EVAL_LOG_EVERY,
        }
    }

    pub fn with_log_every(mut self, steps: usize) -> Self {
        self.log_every = steps.max(1);
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn run<I, M, C>(&self, batches: I, model: &M, criterion: &C) -> Result<EpochSummary>
    where
        I: IntoIterator<Item = Result<PaddedBatch>>,
        M: DurationModel + ?Sized,
        C: Criterion + ?Sized,
    {
        let mut meter = AverageMeter::new();
        let start = Instant::now();
        let mut steps = 0;

        for (step, batch) in batches.into_iter().enumerate().map(|(i, b)| (i + 1, b)) {
            let out = forward_batch(&self.device, self.max_len, batch?, model, criterion, false)?;
            meter.update(scalar(&out.loss)?, out.examples);
            steps = step;

            if step % self.log_every == 0 {
                info!(
                    step,
                    dev_loss = meter.average,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "validation progress"
                );
            }
        }

        Ok(EpochSummary::from_meter(&meter, steps, start.elapsed()))
    }
}
