//! Logistic adapter: Implementation of ClassifierStrategy.
//!
//! Multinomial (softmax) logistic regression with an L2 penalty and
//! per-sample weights, fit by damped Newton iterations: each step solves
//! against the full 32×32 Hessian and is then shortened by an Armijo
//! backtracking line search.
//!
//! # Objective
//!
//! ```text
//! L(W, b) = (1 / Σw) Σ_i w_i · CE(softmax(W x_i + b), y_i)
//!         + (1 / (2 · C · Σw)) · ||W||²
//! ```
//!
//! This is the weighted cross-entropy with inverse regularization strength
//! `C`, divided through by the total sample weight. The bias is not
//! penalized, so the Hessian is singular along the direction that shifts all
//! biases together; a small ridge is added before the Cholesky solve. The
//! problem is convex, so the line search always makes progress until the
//! gradient vanishes.

use crate::domain::{softmax, ClassifierModel, FeatureArray, RiskLabel, NUM_CLASSES, NUM_FEATURES};
use crate::ports::{ClassifierStrategy, FitOutcome};

/// Parameters per class: one weight per feature plus the bias.
const STRIDE: usize = NUM_FEATURES + 1;
const NUM_PARAMS: usize = NUM_CLASSES * STRIDE;

/// Sufficient-decrease constant for the Armijo condition.
const ARMIJO_C: f64 = 1e-4;
const MIN_STEP: f64 = 1e-12;
/// Ridge schedule tried before giving up on the Newton direction.
const RIDGES: [f64; 5] = [1e-8, 1e-6, 1e-4, 1e-2, 1.0];

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Iteration bound; reaching it without converging is a soft failure
    pub max_iterations: usize,
    /// Stop when the largest parameter change (or gradient entry) falls
    /// below this
    pub tolerance: f64,
    /// Inverse L2 strength (larger means weaker regularization)
    pub inverse_regularization: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-6,
            inverse_regularization: 1.0,
        }
    }
}

/// Multinomial logistic regression solver.
#[derive(Debug, Clone, Default)]
pub struct MultinomialLogisticRegression {
    config: SolverConfig,
}

struct Problem<'a> {
    features: &'a [FeatureArray],
    labels: &'a [RiskLabel],
    weights: &'a [f64],
    total_weight: f64,
    lambda: f64,
}

impl Problem<'_> {
    fn logits(theta: &[f64], x: &FeatureArray) -> [f64; NUM_CLASSES] {
        let mut z = [0.0; NUM_CLASSES];
        for (k, zk) in z.iter_mut().enumerate() {
            let row = &theta[k * STRIDE..(k + 1) * STRIDE];
            *zk = row[NUM_FEATURES] + row[..NUM_FEATURES].iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
        }
        z
    }

    fn penalty(&self, theta: &[f64]) -> f64 {
        let sq: f64 = (0..NUM_CLASSES)
            .flat_map(move |k| &theta[k * STRIDE..k * STRIDE + NUM_FEATURES])
            .map(|w| w * w)
            .sum();
        0.5 * self.lambda * sq
    }

    fn loss(&self, theta: &[f64]) -> f64 {
        let mut total = 0.0;
        for ((x, y), w) in self.features.iter().zip(self.labels).zip(self.weights) {
            let z = Self::logits(theta, x);
            let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lse = max + z.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
            total += w * (lse - z[y.index()]);
        }
        total / self.total_weight + self.penalty(theta)
    }

    fn loss_and_gradient(&self, theta: &[f64]) -> (f64, Vec<f64>) {
        let mut grad = vec![0.0; NUM_PARAMS];
        let mut total = 0.0;

        for ((x, y), w) in self.features.iter().zip(self.labels).zip(self.weights) {
            let z = Self::logits(theta, x);
            let p = softmax(&z);
            total -= w * p[y.index()].max(f64::MIN_POSITIVE).ln();

            for (k, pk) in p.iter().enumerate() {
                let indicator = if k == y.index() { 1.0 } else { 0.0 };
                let g = w * (pk - indicator);
                let row = &mut grad[k * STRIDE..(k + 1) * STRIDE];
                for (gj, xj) in row[..NUM_FEATURES].iter_mut().zip(x) {
                    *gj += g * xj;
                }
                row[NUM_FEATURES] += g;
            }
        }

        grad.iter_mut().for_each(|g| *g /= self.total_weight);
        for k in 0..NUM_CLASSES {
            for j in 0..NUM_FEATURES {
                let idx = k * STRIDE + j;
                grad[idx] += self.lambda * theta[idx];
            }
        }

        (total / self.total_weight + self.penalty(theta), grad)
    }

    /// Row-major `NUM_PARAMS × NUM_PARAMS` Hessian of the objective.
    fn hessian(&self, theta: &[f64]) -> Vec<f64> {
        let mut h = vec![0.0; NUM_PARAMS * NUM_PARAMS];

        for (x, w) in self.features.iter().zip(self.weights) {
            let p = softmax(&Self::logits(theta, x));
            let mut xt = [1.0; STRIDE];
            xt[..NUM_FEATURES].copy_from_slice(x);

            for k in 0..NUM_CLASSES {
                for l in 0..NUM_CLASSES {
                    let diag = if k == l { p[k] } else { 0.0 };
                    let coef = w * (diag - p[k] * p[l]);
                    if coef == 0.0 {
                        continue;
                    }
                    for (a, xa) in xt.iter().enumerate() {
                        let row = (k * STRIDE + a) * NUM_PARAMS + l * STRIDE;
                        for (hb, xb) in h[row..row + STRIDE].iter_mut().zip(&xt) {
                            *hb += coef * xa * xb;
                        }
                    }
                }
            }
        }

        h.iter_mut().for_each(|v| *v /= self.total_weight);
        for k in 0..NUM_CLASSES {
            for j in 0..NUM_FEATURES {
                let idx = k * STRIDE + j;
                h[idx * NUM_PARAMS + idx] += self.lambda;
            }
        }
        h
    }
}

/// Solve `a · x = b` for symmetric positive definite `a` by Cholesky.
/// Returns `None` when `a` is not numerically positive definite.
fn cholesky_solve(a: &[f64], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[i * n + k] * l[j * n + k]).sum();
            let v = a[i * n + j] - dot;
            if i == j {
                if !(v > 0.0 && v.is_finite()) {
                    return None;
                }
                l[i * n + i] = v.sqrt();
            } else {
                l[i * n + j] = v / l[j * n + j];
            }
        }
    }

    let mut y = vec![0.0; n];
    for i in 0..n {
        let dot: f64 = (0..i).map(|k| l[i * n + k] * y[k]).sum();
        y[i] = (b[i] - dot) / l[i * n + i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let dot: f64 = (i + 1..n).map(|k| l[k * n + i] * x[k]).sum();
        x[i] = (y[i] - dot) / l[i * n + i];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Newton direction `-(H + ρI)⁻¹ g` with the smallest ridge that factors.
fn newton_direction(hessian: &[f64], grad: &[f64]) -> Option<Vec<f64>> {
    let rhs: Vec<f64> = grad.iter().map(|g| -g).collect();
    RIDGES.iter().find_map(|ridge| {
        let mut damped = hessian.to_vec();
        for i in 0..NUM_PARAMS {
            damped[i * NUM_PARAMS + i] += ridge;
        }
        cholesky_solve(&damped, &rhs)
    })
}

fn to_model(theta: &[f64]) -> ClassifierModel {
    let mut model = ClassifierModel::zeros();
    for k in 0..NUM_CLASSES {
        let row = &theta[k * STRIDE..(k + 1) * STRIDE];
        model.weights[k].copy_from_slice(&row[..NUM_FEATURES]);
        model.bias[k] = row[NUM_FEATURES];
    }
    model
}

impl MultinomialLogisticRegression {
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

}

impl ClassifierStrategy for MultinomialLogisticRegression {
    fn name(&self) -> &'static str {
        "multinomial-logistic-regression"
    }

    fn fit(&self, features: &[FeatureArray], labels: &[RiskLabel], sample_weights: &[f64]) -> FitOutcome {
        let n = features.len().min(labels.len()).min(sample_weights.len());
        let total_weight: f64 = sample_weights[..n].iter().sum();

        if n == 0 || total_weight <= 0.0 || !total_weight.is_finite() {
            tracing::warn!("Logistic fit called with no usable samples; returning uniform model");
            return FitOutcome {
                model: ClassifierModel::zeros(),
                iterations: 0,
                converged: false,
                final_loss: f64::NAN,
            };
        }

        let c = self.config.inverse_regularization.max(f64::MIN_POSITIVE);
        let problem = Problem {
            features: &features[..n],
            labels: &labels[..n],
            weights: &sample_weights[..n],
            total_weight,
            lambda: 1.0 / (c * total_weight),
        };

        let mut theta = vec![0.0; NUM_PARAMS];
        let (mut loss, mut grad) = problem.loss_and_gradient(&theta);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            let grad_max = grad.iter().fold(0.0f64, |m, g| m.max(g.abs()));
            if grad_max < self.config.tolerance {
                converged = true;
                break;
            }

            let steepest = || grad.iter().map(|g| -g).collect::<Vec<f64>>();
            let mut direction =
                newton_direction(&problem.hessian(&theta), &grad).unwrap_or_else(steepest);
            let mut slope: f64 = grad.iter().zip(&direction).map(|(g, d)| g * d).sum();
            if !(slope < 0.0) {
                tracing::debug!("Newton direction not a descent direction; using the gradient");
                direction = steepest();
                slope = -grad.iter().map(|g| g * g).sum::<f64>();
            }

            let mut t: f64 = 1.0;
            let mut candidate = vec![0.0; NUM_PARAMS];
            let accepted = loop {
                for ((slot, th), d) in candidate.iter_mut().zip(&theta).zip(&direction) {
                    *slot = th + t * d;
                }
                let candidate_loss = problem.loss(&candidate);
                if candidate_loss.is_finite() && candidate_loss <= loss + ARMIJO_C * t * slope {
                    break true;
                }
                t *= 0.5;
                if t < MIN_STEP {
                    break false;
                }
            };

            iterations += 1;
            if !accepted {
                // No descent possible at machine precision: stationary point.
                converged = true;
                break;
            }

            let change = t * direction.iter().fold(0.0f64, |m, d| m.max(d.abs()));
            theta = candidate;
            (loss, grad) = problem.loss_and_gradient(&theta);

            if change < self.config.tolerance {
                converged = true;
                break;
            }
        }

        tracing::debug!(
            "Logistic fit finished: iterations={}, converged={}, loss={:.6}",
            iterations,
            converged,
            loss
        );

        FitOutcome {
            model: to_model(&theta),
            iterations,
            converged,
            final_loss: loss,
        }
    }
}
