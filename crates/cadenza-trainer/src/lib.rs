//! # Cadenza Trainer
//!
//! Supervised training for phone duration models: masked regression loss,
//! AdamW with a Noam learning-rate schedule, global-norm gradient clipping,
//! epoch loops with running loss averages, scalar logging and checkpoints.

pub mod checkpoint;
pub mod config;
pub mod loader;
pub mod logger;
pub mod loss;
pub mod meter;
pub mod model;
pub mod optim;
pub mod runner;
pub mod trainer;

pub use checkpoint::{CheckpointState, CheckpointWriter, SafetensorsCheckpoint};
pub use config::{ScheduleKind, TrainerConfig};
pub use loader::BatchLoader;
pub use logger::{record_info, JsonlScalarLogger, ScalarLogger, TracingScalarLogger};
pub use loss::{Criterion, LossKind, MaskedLoss};
pub use meter::AverageMeter;
pub use model::{DurationModel, DurationPredictor};
pub use optim::{
    clip_grad_norm, ConstantSchedule, LrSchedule, NoamSchedule, ParameterUpdate, ScheduledOptim,
    UpdateStats,
};
pub use runner::{run_training, EpochRecord, RunSummary};
pub use trainer::{EpochSummary, EvalLoop, TrainLoop};
