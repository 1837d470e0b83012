use crate::config::AdamConfig;
use crate::constants::GRADIENT_CLIP_NORM;
use crate::tensor::WeightTensor;

/// What a single optimizer step did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    /// Iteration count the bias correction was computed from.
    pub iteration: u64,
    /// Global L2 norm of the raw gradients.
    pub grad_norm: f64,
    /// Factor applied to every gradient before the moment update.
    pub scale: f64,
    pub bias_correction1: f64,
    pub bias_correction2: f64,
}

impl StepReport {
    pub fn clipped_norm(&self) -> f64 {
        self.grad_norm * self.scale
    }
}

/// Adam update with global gradient-norm clipping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Adam {
    config: AdamConfig,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// `beta^(iteration + 1)`, or zero once the power under/overflows to a non-finite value.
    pub fn bias_correction(beta: f32, iteration: u64) -> f64 {
        let y = f64::from(beta).powf((iteration + 1) as f64);
        if y.is_finite() {
            y
        } else {
            0.0
        }
    }

    /// Applies one update to every tensor from its current gradient buffer.
    pub fn step(&self, tensors: &mut [&mut WeightTensor], iteration: u64) -> StepReport {
        let grad_norm = tensors
            .iter()
            .map(|tensor| tensor.grad_sq_sum())
            .sum::<f64>()
            .sqrt();
        let scale = if grad_norm > GRADIENT_CLIP_NORM {
            GRADIENT_CLIP_NORM / grad_norm
        } else {
            1.0
        };

        let AdamConfig {
            beta1,
            beta2,
            learning_rate,
            epsilon,
        } = self.config;
        let bias_correction1 = Self::bias_correction(beta1, iteration);
        let bias_correction2 = Self::bias_correction(beta2, iteration);
        let denom1 = 1.0 - bias_correction1 as f32;
        let denom2 = 1.0 - bias_correction2 as f32;
        let scale_f32 = scale as f32;

        for tensor in tensors.iter_mut() {
            let WeightTensor {
                values,
                grad,
                first_moment,
                second_moment,
                ..
            } = &mut **tensor;
            let params = values
                .iter_mut()
                .zip(grad.iter())
                .zip(first_moment.iter_mut().zip(second_moment.iter_mut()));
            for ((value, &d), (m, v)) in params {
                let g = d * scale_f32;
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / denom1;
                let v_hat = (*v / denom2).max(0.0);
                *value -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            }
        }

        StepReport {
            iteration,
            grad_norm,
            scale,
            bias_correction1,
            bias_correction2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor_with_grad(values: &[f32], grad: &[f32]) -> WeightTensor {
        let mut tensor = WeightTensor::zeros("t", 1, values.len());
        tensor.values.copy_from_slice(values);
        tensor.grad.copy_from_slice(grad);
        tensor
    }

    #[test]
    fn large_gradients_are_clipped_to_unit_norm() {
        let adam = Adam::new(AdamConfig::default());
        let mut a = tensor_with_grad(&[0.0, 0.0], &[3.0, 0.0]);
        let mut b = tensor_with_grad(&[0.0], &[4.0]);
        let report = adam.step(&mut [&mut a, &mut b], 0);
        assert!((report.grad_norm - 5.0).abs() < 1e-9);
        assert!((report.clipped_norm() - 1.0).abs() < 1e-9);
        assert!((a.first_moment[0] - 0.2 * 0.6).abs() < 1e-6);
        assert!((b.first_moment[0] - 0.2 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn small_gradients_pass_through() {
        let adam = Adam::new(AdamConfig::default());
        let mut a = tensor_with_grad(&[1.0], &[0.5]);
        let report = adam.step(&mut [&mut a], 0);
        assert_eq!(report.scale, 1.0);
        // First step: m_hat == g and v_hat == g^2, so the step is ~lr * sign(g).
        assert!((a.values[0] - (1.0 - 1.0e-3)).abs() < 1e-6);
    }

    #[test]
    fn bias_correction_advances_with_iteration() {
        assert!((Adam::bias_correction(0.8, 0) - 0.8).abs() < 1e-9);
        assert!((Adam::bias_correction(0.8, 1) - 0.64).abs() < 1e-9);
        assert_eq!(Adam::bias_correction(0.8, u64::MAX - 1), 0.0);
    }

    #[test]
    fn moments_persist_between_steps() {
        let adam = Adam::new(AdamConfig::default());
        let mut a = tensor_with_grad(&[0.0], &[0.5]);
        adam.step(&mut [&mut a], 0);
        let first = a.first_moment[0];
        adam.step(&mut [&mut a], 1);
        assert!((a.first_moment[0] - (0.8 * first + 0.2 * 0.5)).abs() < 1e-7);
    }
}
