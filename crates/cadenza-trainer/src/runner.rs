//! Epoch driver: datasets, model, optimizer, loops, logging and checkpoints.

use anyhow::Context;
use candle_core::DType;
use candle_nn::{VarBuilder, VarMap};
use cadenza_core::{DurationCollator, DurationDataset};
use serde::Serialize;
use tracing::{info, warn};

use crate::checkpoint::{load_weights, CheckpointState, CheckpointWriter, SafetensorsCheckpoint};
use crate::config::{ScheduleKind, TrainerConfig};
use crate::loader::BatchLoader;
use crate::logger::{record_info, JsonlScalarLogger, MultiLogger, TracingScalarLogger};
use crate::loss::MaskedLoss;
use crate::model::DurationPredictor;
use crate::optim::{ConstantSchedule, LrSchedule, NoamSchedule, ScheduledOptim};
use crate::trainer::{EpochSummary, EvalLoop, TrainLoop};

/// Losses of one completed epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train: EpochSummary,
    pub dev: EpochSummary,
}

/// Outcome of [`run_training`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub history: Vec<EpochRecord>,
    pub best_dev_loss: f64,
    pub best_epoch: Option<usize>,
    /// Checkpoints that could not be written.
    pub checkpoint_failures: usize,
}

fn schedule_for(config: &TrainerConfig) -> Box<dyn LrSchedule + Send> {
    match config.lr_schedule {
        ScheduleKind::Noam => Box::new(NoamSchedule::new(
            config.learning_rate,
            config.d_model,
            config.warmup_steps,
        )),
        ScheduleKind::Constant => Box::new(ConstantSchedule {
            lr: config.learning_rate,
        }),
    }
}

fn save_or_warn<W: CheckpointWriter>(
    writer: &W,
    varmap: &VarMap,
    state: &CheckpointState,
    name: &str,
    config: &TrainerConfig,
) -> bool {
    let dest = config.checkpoint_dir.join(name);
    match writer.save(varmap, state, &dest) {
        Ok(()) => true,
        Err(err) => {
            warn!(path = %dest.display(), error = %err, "failed to write checkpoint");
            false
        }
    }
}

/// Train and validate for `config.epochs` epochs.
pub fn run_training(config: &TrainerConfig) -> anyhow::Result<RunSummary> {
    config.validate()?;
    let device = config.device()?;
    info!(device = ?device, max_len = config.max_len, "starting duration training");

    let train_set = DurationDataset::from_file(&config.train_file)
        .with_context(|| format!("loading training corpus {}", config.train_file.display()))?;
    let dev_set = DurationDataset::from_file(&config.dev_file)
        .with_context(|| format!("loading dev corpus {}", config.dev_file.display()))?;

    if train_set.is_empty() {
        anyhow::bail!("training corpus {} has no usable utterances", config.train_file.display());
    }
    if let Some(max_phone) = train_set.max_phone().max(dev_set.max_phone()) {
        if max_phone as usize >= config.phone_vocab {
            anyhow::bail!(
                "phone label {max_phone} does not fit phone_vocab {}",
                config.phone_vocab
            );
        }
    }

    let collator = DurationCollator::new(config.max_len)?;
    let mut train_loader = BatchLoader::new(&train_set, collator, config.batch_size);
    if config.shuffle {
        train_loader = train_loader.with_shuffle(config.seed);
    }
    let dev_loader = BatchLoader::new(&dev_set, collator, config.batch_size);

    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = DurationPredictor::new(config.phone_vocab, config.hidden_size, vb)?
        .with_dropout(config.dropout);
    let mut resume_step = 0;
    if let Some(init) = &config.init_model {
        load_weights(&mut varmap, init)
            .with_context(|| format!("loading initial weights {}", init.display()))?;

        if SafetensorsCheckpoint::state_path(init).exists() {
            let state = SafetensorsCheckpoint::load_state(init)
                .with_context(|| format!("loading checkpoint state for {}", init.display()))?;
            info!(epoch = state.epoch, step = state.step, "resuming learning-rate schedule");
            resume_step = state.step;
        }
    }

    let mut optim =
        ScheduledOptim::new(varmap.all_vars(), schedule_for(config))?.with_step(resume_step);
    let criterion = MaskedLoss::new(config.loss);
    let train_loop = TrainLoop::new(device.clone(), config.max_len, config.gradclip)
        .with_log_every(config.train_log_every);
    let eval_loop = EvalLoop::new(device, config.max_len).with_log_every(config.eval_log_every);

    let mut logger = MultiLogger::new().with(TracingScalarLogger);
    if let Some(path) = &config.metrics_file {
        logger = logger.with(JsonlScalarLogger::create(path)?);
    }
    let writer = SafetensorsCheckpoint;

    let mut summary = RunSummary {
        history: Vec::with_capacity(config.epochs),
        best_dev_loss: f64::INFINITY,
        best_epoch: None,
        checkpoint_failures: 0,
    };

    for epoch in 1..=config.epochs {
        let train = train_loop.run(train_loader.epoch(epoch), &model, &criterion, &mut optim)?;
        let dev = eval_loop.run(dev_loader.epoch(epoch), &model, &criterion)?;
        info!(
            epoch,
            train_loss = train.loss,
            dev_loss = dev.loss,
            lr = optim.learning_rate(),
            "epoch complete"
        );
        record_info(&train, &dev, epoch, &mut logger)?;

        let improved = dev.steps > 0 && dev.loss < summary.best_dev_loss;
        if improved {
            summary.best_dev_loss = dev.loss;
            summary.best_epoch = Some(epoch);
        }

        let state = CheckpointState {
            epoch,
            step: optim.step_count(),
            train_loss: train.loss,
            dev_loss: dev.loss,
            best_dev_loss: summary.best_dev_loss,
            learning_rate: optim.learning_rate(),
        };
        if config.save_every > 0
            && epoch % config.save_every == 0
            && !save_or_warn(&writer, &varmap, &state, &format!("epoch_{epoch}"), config)
        {
            summary.checkpoint_failures += 1;
        }
        if improved && !save_or_warn(&writer, &varmap, &state, "best", config) {
            summary.checkpoint_failures += 1;
        }

        summary.history.push(EpochRecord { epoch, train, dev });
    }

    info!(
        best_dev_loss = summary.best_dev_loss,
        best_epoch = ?summary.best_epoch,
        checkpoint_failures = summary.checkpoint_failures,
        "training finished"
    );
    Ok(summary)
}
