//! Optimizer, learning-rate schedules and gradient clipping.

use candle_core::backprop::GradStore;
use candle_core::{DType, Result, Tensor, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};

/// Learning rate as a function of the 1-based optimizer step.
pub trait LrSchedule {
    fn lr_at(&self, step: usize) -> f64;
}

/// Inverse square-root decay with linear warmup.
///
/// `lr = init_lr * d_model^-0.5 * min(step^-0.5, step * warmup^-1.5)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoamSchedule {
    pub init_lr: f64,
    pub d_model: usize,
    pub warmup_steps: usize,
}

impl NoamSchedule {
    pub fn new(init_lr: f64, d_model: usize, warmup_steps: usize) -> Self {
        Self {
            init_lr,
            d_model,
            warmup_steps,
        }
    }
}

impl LrSchedule for NoamSchedule {
    fn lr_at(&self, step: usize) -> f64 {
        let step = step.max(1) as f64;
        let warmup = self.warmup_steps.max(1) as f64;
        let scale = (self.d_model.max(1) as f64).powf(-0.5);
        self.init_lr * scale * step.powf(-0.5).min(step * warmup.powf(-1.5))
    }
}

/// Fixed learning rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSchedule {
    pub lr: f64,
}

impl LrSchedule for ConstantSchedule {
    fn lr_at(&self, _step: usize) -> f64 {
        self.lr
    }
}

impl LrSchedule for Box<dyn LrSchedule + Send> {
    fn lr_at(&self, step: usize) -> f64 {
        (**self).lr_at(step)
    }
}

/// Scale `grads` in place so their global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm(vars: &[Var], grads: &mut GradStore, max_norm: f64) -> Result<f64> {
    let mut total = 0f64;
    for var in vars {
        if let Some(grad) = grads.get(var.as_tensor()) {
            total += grad
                .sqr()?
                .sum_all()?
                .to_dtype(DType::F64)?
                .to_scalar::<f64>()?;
        }
    }
    let norm = total.sqrt();

    if norm > max_norm {
        let scale = max_norm / (norm + 1e-6);
        for var in vars {
            if let Some(grad) = grads.remove(var.as_tensor()) {
                grads.insert(var.as_tensor(), grad.affine(scale, 0.0)?);
            }
        }
    }

    Ok(norm)
}

/// What one parameter update did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStats {
    /// Global gradient norm before clipping.
    pub grad_norm: f64,
    /// Learning rate used for the step.
    pub learning_rate: f64,
}

/// Turns a loss into a parameter update.
pub trait ParameterUpdate {
    /// Backpropagate `loss`, clip when `gradclip > 0`, and step.
    fn apply_update(&mut self, loss: &Tensor, gradclip: f64) -> Result<UpdateStats>;
}

/// AdamW driven by a learning-rate schedule.
pub struct ScheduledOptim<S> {
    optimizer: AdamW,
    schedule: S,
    vars: Vec<Var>,
    step: usize,
}

impl<S: LrSchedule> ScheduledOptim<S> {
    pub fn new(vars: Vec<Var>, schedule: S) -> Result<Self> {
        let params = ParamsAdamW {
            lr: schedule.lr_at(1),
            ..Default::default()
        };
        let optimizer = AdamW::new(vars.clone(), params)?;

        Ok(Self {
            optimizer,
            schedule,
            vars,
            step: 0,
        })
    }

    /// Resume the schedule from a previously completed step count.
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self.optimizer.set_learning_rate(self.schedule.lr_at(step.max(1)));
        self
    }

    /// Steps applied so far.
    pub fn step_count(&self) -> usize {
        self.step
    }

    pub fn learning_rate(&self) -> f64 {
        self.optimizer.learning_rate()
    }

    /// Candle builds a fresh gradient store on every backward pass, so there
    /// is nothing to clear.
    pub fn zero_grad(&mut self) {}

    /// Advance the schedule, then apply `grads`.
    pub fn step_and_update_lr(&mut self, grads: &GradStore) -> Result<f64> {
        self.step += 1;
        let lr = self.schedule.lr_at(self.step);
        self.optimizer.set_learning_rate(lr);
        self.optimizer.step(grads)?;
        Ok(lr)
    }
}

impl<S: LrSchedule> ParameterUpdate for ScheduledOptim<S> {
    fn apply_update(&mut self, loss: &Tensor, gradclip: f64) -> Result<UpdateStats> {
        self.zero_grad();
        let mut grads = loss.backward()?;

        let grad_norm = if gradclip > 0.0 {
            clip_grad_norm(&self.vars, &mut grads, gradclip)?
        } else {
            0.0
        };

        let learning_rate = self.step_and_update_lr(&grads)?;
        Ok(UpdateStats {
            grad_norm,
            learning_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_noam_warmup_then_decay() {
        let schedule = NoamSchedule::new(1.0, 256, 4000);
        let scale = 256f64.powf(-0.5);

        let early = schedule.lr_at(100);
        assert!((early - scale * 100.0 * 4000f64.powf(-1.5)).abs() < 1e-12);

        let peak = schedule.lr_at(4000);
        assert!((peak - scale * 4000f64.powf(-0.5)).abs() < 1e-12);

        assert!(schedule.lr_at(1000) < peak);
        assert!(schedule.lr_at(16000) < peak);
        assert!((schedule.lr_at(16000) - peak / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_schedule() {
        let schedule = ConstantSchedule { lr: 0.01 };
        assert_eq!(schedule.lr_at(1), 0.01);
        assert_eq!(schedule.lr_at(10_000), 0.01);
    }

    #[test]
    fn test_clip_grad_norm_scales_down() {
        let dev = Device::Cpu;
        let w = Var::new(&[3f32, 4.0], &dev).unwrap();
        // d/dw sum(w^2 / 2) = w, so the gradient norm is 5
        let loss = w.as_tensor().sqr().unwrap().affine(0.5, 0.0).unwrap().sum_all().unwrap();
        let mut grads = loss.backward().unwrap();

        let vars = vec![w.clone()];
        let norm = clip_grad_norm(&vars, &mut grads, 1.0).unwrap();
        assert!((norm - 5.0).abs() < 1e-5);

        let clipped = grads.get(w.as_tensor()).unwrap().to_vec1::<f32>().unwrap();
        let clipped_norm = (clipped[0] * clipped[0] + clipped[1] * clipped[1]).sqrt();
        assert!((clipped_norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_clip_grad_norm_leaves_small_gradients() {
        let dev = Device::Cpu;
        let w = Var::new(&[0.3f32, 0.4], &dev).unwrap();
        let loss = w.as_tensor().sqr().unwrap().affine(0.5, 0.0).unwrap().sum_all().unwrap();
        let mut grads = loss.backward().unwrap();

        let vars = vec![w.clone()];
        clip_grad_norm(&vars, &mut grads, 1.0).unwrap();
        let grad = grads.get(w.as_tensor()).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(grad, vec![0.3, 0.4]);
    }

    #[test]
    fn test_step_and_update_lr_advances_schedule() {
        let dev = Device::Cpu;
        let w = Var::new(&[1f32, -1.0], &dev).unwrap();
        let schedule = NoamSchedule::new(1.0, 4, 10);
        let mut optim = ScheduledOptim::new(vec![w.clone()], schedule).unwrap();

        let loss = w.as_tensor().sqr().unwrap().sum_all().unwrap();
        let stats = optim.apply_update(&loss, 0.0).unwrap();

        assert_eq!(optim.step_count(), 1);
        assert_eq!(stats.grad_norm, 0.0);
        assert!((stats.learning_rate - schedule.lr_at(1)).abs() < 1e-12);
        assert!((optim.learning_rate() - schedule.lr_at(1)).abs() < 1e-12);

        let moved = w.as_tensor().to_vec1::<f32>().unwrap();
        assert!(moved[0] < 1.0);
        assert!(moved[1] > -1.0);
    }

    #[test]
    fn test_with_step_continues_schedule() {
        let dev = Device::Cpu;
        let w = Var::new(&[1f32, -1.0], &dev).unwrap();
        let schedule = NoamSchedule::new(1.0, 4, 10);
        let mut optim = ScheduledOptim::new(vec![w.clone()], schedule)
            .unwrap()
            .with_step(6);
        assert_eq!(optim.step_count(), 6);

        let loss = w.as_tensor().sqr().unwrap().sum_all().unwrap();
        let stats = optim.apply_update(&loss, 0.0).unwrap();
        assert_eq!(optim.step_count(), 7);
        assert!((stats.learning_rate - schedule.lr_at(7)).abs() < 1e-12);
    }
}
