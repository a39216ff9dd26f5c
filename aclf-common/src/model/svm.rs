//! Linear-kernel support-vector classifier
//!
//! Multi-class problems are split one-vs-one: one binary C-SVC per pair of
//! classes, each solved in the dual with SMO (second-order working-set
//! selection). Because the kernel is linear every binary machine collapses to
//! a weight vector and a bias, which is all that is kept after fitting.
//!
//! Prediction is a vote across machines. Ties go to the class that sorts
//! first.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Classifier;
use crate::features::{FeatureVector, N_MFCC};
use crate::{Error, Result};

const TAU: f64 = 1e-12;

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    /// Soft-margin penalty
    pub c: f64,
    /// Stopping tolerance on the KKT violation
    pub tolerance: f64,
    /// Hard cap on SMO iterations per binary problem
    pub max_iterations: usize,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            tolerance: 1e-3,
            max_iterations: 10_000_000,
        }
    }
}

impl SvmParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(Error::InvalidInput(format!("C must be positive, got {}", self.c)));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidInput("max_iterations must be > 0".to_string()));
        }
        Ok(())
    }
}

/// One pairwise decision function `w·x + b`
///
/// Positive values vote for `positive`, everything else for `negative`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryMachine {
    /// Index into [`LinearSvc::classes`]
    pub positive: usize,
    /// Index into [`LinearSvc::classes`]
    pub negative: usize,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl BinaryMachine {
    pub fn decision(&self, x: &[f64]) -> f64 {
        dot(&self.weights, x) + self.bias
    }
}

/// Fitted one-vs-one linear SVC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvc {
    c: f64,
    classes: Vec<String>,
    machines: Vec<BinaryMachine>,
}

impl LinearSvc {
    /// Fit on the complete training set in one batch
    ///
    /// # Errors
    /// * mismatched `features`/`labels` lengths
    /// * empty training set or fewer than two distinct labels
    pub fn fit(features: &[FeatureVector], labels: &[String], params: &SvmParams) -> Result<Self> {
        params.validate()?;

        if features.len() != labels.len() {
            return Err(Error::InvalidInput(format!(
                "{} feature vectors but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if features.is_empty() {
            return Err(Error::InvalidInput("training set is empty".to_string()));
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "the number of classes has to be greater than one; got {}",
                classes.len()
            )));
        }

        let class_of: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();
        let rows: Vec<Vec<f64>> = features.iter().map(FeatureVector::to_f64).collect();

        let mut machines = Vec::with_capacity(classes.len() * (classes.len() - 1) / 2);
        for positive in 0..classes.len() {
            for negative in (positive + 1)..classes.len() {
                let mut xs: Vec<&[f64]> = Vec::new();
                let mut ys: Vec<f64> = Vec::new();
                for (row, &class) in rows.iter().zip(&class_of) {
                    if class == positive {
                        xs.push(row);
                        ys.push(1.0);
                    } else if class == negative {
                        xs.push(row);
                        ys.push(-1.0);
                    }
                }

                let (weights, bias, iterations) = solve_binary(&xs, &ys, params);
                debug!(
                    "Fitted machine {} vs {}: {} samples, {} SMO iterations",
                    classes[positive],
                    classes[negative],
                    xs.len(),
                    iterations
                );

                machines.push(BinaryMachine {
                    positive,
                    negative,
                    weights,
                    bias,
                });
            }
        }

        Ok(Self {
            c: params.c,
            classes,
            machines,
        })
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn machines(&self) -> &[BinaryMachine] {
        &self.machines
    }

    /// Index of the winning class
    pub fn predict_index(&self, features: &FeatureVector) -> usize {
        let x = features.to_f64();
        let mut votes = vec![0usize; self.classes.len()];
        for machine in &self.machines {
            if machine.decision(&x) > 0.0 {
                votes[machine.positive] += 1;
            } else {
                votes[machine.negative] += 1;
            }
        }

        let mut best = 0;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = class;
            }
        }
        best
    }

    /// Raw decision values, one per machine, in machine order
    pub fn decision_values(&self, features: &FeatureVector) -> Vec<f64> {
        let x = features.to_f64();
        self.machines.iter().map(|m| m.decision(&x)).collect()
    }

    /// Structural checks for a model that came from disk
    pub fn validate(&self) -> Result<()> {
        let k = self.classes.len();
        if k < 2 {
            return Err(Error::Model(format!("model has {} classes, need at least 2", k)));
        }
        let expected = k * (k - 1) / 2;
        if self.machines.len() != expected {
            return Err(Error::Model(format!(
                "model has {} binary machines, expected {} for {} classes",
                self.machines.len(),
                expected,
                k
            )));
        }
        for (i, machine) in self.machines.iter().enumerate() {
            if machine.positive >= k || machine.negative >= k || machine.positive == machine.negative {
                return Err(Error::Model(format!(
                    "machine {} references invalid classes ({}, {})",
                    i, machine.positive, machine.negative
                )));
            }
            if machine.weights.len() != N_MFCC {
                return Err(Error::Model(format!(
                    "machine {} has {} weights, expected {}",
                    i,
                    machine.weights.len(),
                    N_MFCC
                )));
            }
            if !machine.bias.is_finite() || machine.weights.iter().any(|w| !w.is_finite()) {
                return Err(Error::Model(format!("machine {} has non-finite coefficients", i)));
            }
        }
        Ok(())
    }
}

impl Classifier for LinearSvc {
    fn predict(&self, features: &FeatureVector) -> &str {
        &self.classes[self.predict_index(features)]
    }

    fn labels(&self) -> &[String] {
        &self.classes
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Linear kernel evaluated on demand
///
/// Only the diagonal is cached, so memory stays linear in the sample count.
struct LinearKernel<'a> {
    xs: &'a [&'a [f64]],
    diag: Vec<f64>,
}

impl<'a> LinearKernel<'a> {
    fn new(xs: &'a [&'a [f64]]) -> Self {
        let diag = xs.iter().map(|x| dot(x, x)).collect();
        Self { xs, diag }
    }

    fn eval(&self, i: usize, j: usize) -> f64 {
        if i == j {
            self.diag[i]
        } else {
            dot(self.xs[i], self.xs[j])
        }
    }

    fn diag(&self, i: usize) -> f64 {
        self.diag[i]
    }
}

/// Solve one binary C-SVC in the dual and fold it into `(w, b)`
///
/// `ys` holds +1/-1. Returns weights, bias and the iteration count.
fn solve_binary(xs: &[&[f64]], ys: &[f64], params: &SvmParams) -> (Vec<f64>, f64, usize) {
    let n = xs.len();
    let c = params.c;

    let kernel = LinearKernel::new(xs);
    let q = |i: usize, j: usize| ys[i] * ys[j] * kernel.eval(i, j);

    let mut alpha = vec![0.0f64; n];
    let mut grad = vec![-1.0f64; n];

    let mut iterations = 0;
    while iterations < params.max_iterations {
        let Some((i, j)) = select_working_set(&alpha, &grad, ys, &kernel, c, params.tolerance) else {
            break;
        };
        iterations += 1;

        let old_i = alpha[i];
        let old_j = alpha[j];

        if ys[i] != ys[j] {
            let mut quad = kernel.diag(i) + kernel.diag(j) + 2.0 * q(i, j);
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;

            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let mut quad = kernel.diag(i) + kernel.diag(j) - 2.0 * q(i, j);
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;

            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let delta_i = alpha[i] - old_i;
        let delta_j = alpha[j] - old_j;
        for t in 0..n {
            grad[t] += q(t, i) * delta_i + q(t, j) * delta_j;
        }
    }

    if iterations >= params.max_iterations {
        warn!(
            "SMO reached the iteration limit ({}) before converging",
            params.max_iterations
        );
    }

    let rho = compute_rho(&alpha, &grad, ys, c);

    let dims = xs.first().map_or(0, |x| x.len());
    let mut weights = vec![0.0f64; dims];
    for ((x, &y), &a) in xs.iter().zip(ys).zip(&alpha) {
        if a > 0.0 {
            for (w, &v) in weights.iter_mut().zip(x.iter()) {
                *w += a * y * v;
            }
        }
    }

    (weights, -rho, iterations)
}

/// Second-order working-set selection; `None` once the KKT gap is below `eps`
fn select_working_set(
    alpha: &[f64],
    grad: &[f64],
    ys: &[f64],
    kernel: &LinearKernel<'_>,
    c: f64,
    eps: f64,
) -> Option<(usize, usize)> {
    let mut g_max = f64::NEG_INFINITY;
    let mut i_sel = None;
    for t in 0..alpha.len() {
        if ys[t] > 0.0 {
            if alpha[t] < c && -grad[t] >= g_max {
                g_max = -grad[t];
                i_sel = Some(t);
            }
        } else if alpha[t] > 0.0 && grad[t] >= g_max {
            g_max = grad[t];
            i_sel = Some(t);
        }
    }

    let i = i_sel?;

    let mut g_max2 = f64::NEG_INFINITY;
    let mut j_sel = None;
    let mut obj_diff_min = f64::INFINITY;
    for t in 0..alpha.len() {
        let grad_diff = if ys[t] > 0.0 {
            if alpha[t] <= 0.0 {
                continue;
            }
            g_max2 = g_max2.max(grad[t]);
            g_max + grad[t]
        } else {
            if alpha[t] >= c {
                continue;
            }
            g_max2 = g_max2.max(-grad[t]);
            g_max - grad[t]
        };

        if grad_diff > 0.0 {
            let mut quad = kernel.diag(i) + kernel.diag(t) - 2.0 * kernel.eval(i, t);
            if quad <= 0.0 {
                quad = TAU;
            }
            let obj_diff = -(grad_diff * grad_diff) / quad;
            if obj_diff <= obj_diff_min {
                obj_diff_min = obj_diff;
                j_sel = Some(t);
            }
        }
    }

    if g_max + g_max2 < eps {
        return None;
    }
    j_sel.map(|j| (i, j))
}

/// Offset of the separating hyperplane, averaged over free support vectors
fn compute_rho(alpha: &[f64], grad: &[f64], ys: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut sum_free = 0.0;
    let mut n_free = 0usize;

    for t in 0..alpha.len() {
        let y_grad = ys[t] * grad[t];
        if alpha[t] >= c {
            if ys[t] < 0.0 {
                upper = upper.min(y_grad);
            } else {
                lower = lower.max(y_grad);
            }
        } else if alpha[t] <= 0.0 {
            if ys[t] > 0.0 {
                upper = upper.min(y_grad);
            } else {
                lower = lower.max(y_grad);
            }
        } else {
            n_free += 1;
            sum_free += y_grad;
        }
    }

    if n_free > 0 {
        sum_free / n_free as f64
    } else {
        (upper + lower) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(first: f32, second: f32) -> FeatureVector {
        let mut values = vec![0.0f32; N_MFCC];
        values[0] = first;
        values[1] = second;
        FeatureVector::new(values).unwrap()
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_separable_clusters() {
        let features = vec![
            vector(-2.0, -2.0),
            vector(-2.5, -1.5),
            vector(-1.5, -2.5),
            vector(2.0, 2.0),
            vector(2.5, 1.5),
            vector(1.5, 2.5),
        ];
        let y = labels(&["dog", "dog", "dog", "cat", "cat", "cat"]);

        let model = LinearSvc::fit(&features, &y, &SvmParams::default()).unwrap();

        assert_eq!(model.classes(), &["cat".to_string(), "dog".to_string()]);
        assert_eq!(model.machines().len(), 1);
        for (x, label) in features.iter().zip(&y) {
            assert_eq!(model.predict(x), label);
        }
        assert_eq!(model.predict(&vector(-3.0, -3.0)), "dog");
        assert_eq!(model.predict(&vector(3.0, 3.0)), "cat");
    }

    #[test]
    fn test_hard_margin_solution_on_symmetric_points() {
        // Support vectors at x0 = -1 and x0 = +1: w = (1, 0, ...), b = 0
        let features = vec![vector(-1.0, 0.0), vector(1.0, 0.0)];
        let y = labels(&["a", "b"]);
        let params = SvmParams {
            c: 10.0,
            ..Default::default()
        };

        let model = LinearSvc::fit(&features, &y, &params).unwrap();
        let machine = &model.machines()[0];

        // positive class is "a" (index 0), which sits at x0 = -1
        assert!((machine.weights[0] + 1.0).abs() < 1e-6, "w0 = {}", machine.weights[0]);
        assert!(machine.weights[1].abs() < 1e-9);
        assert!(machine.bias.abs() < 1e-6, "b = {}", machine.bias);
    }

    #[test]
    fn test_three_classes_one_vs_one() {
        let mut features = Vec::new();
        let mut y = Vec::new();
        for (cx, cy, name) in [(0.0, 10.0, "high"), (-10.0, -5.0, "left"), (10.0, -5.0, "right")] {
            for (dx, dy) in [(0.0, 0.0), (0.5, 0.0), (0.0, 0.5), (-0.5, -0.5)] {
                features.push(vector(cx + dx, cy + dy));
                y.push(name.to_string());
            }
        }

        let model = LinearSvc::fit(&features, &y, &SvmParams::default()).unwrap();

        assert_eq!(model.classes().len(), 3);
        assert_eq!(model.machines().len(), 3);
        assert_eq!(model.predict(&vector(0.0, 12.0)), "high");
        assert_eq!(model.predict(&vector(-12.0, -6.0)), "left");
        assert_eq!(model.predict(&vector(12.0, -6.0)), "right");
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let features = vec![
            vector(-1.0, 0.3),
            vector(-0.7, -0.2),
            vector(0.2, 0.1),
            vector(0.9, -0.4),
            vector(1.2, 0.8),
            vector(-0.1, -0.9),
        ];
        let y = labels(&["a", "a", "b", "b", "b", "a"]);

        let first = LinearSvc::fit(&features, &y, &SvmParams::default()).unwrap();
        let second = LinearSvc::fit(&features, &y, &SvmParams::default()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let features = vec![vector(0.0, 0.0), vector(1.0, 1.0)];
        let y = labels(&["only", "only"]);
        let err = LinearSvc::fit(&features, &y, &SvmParams::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_empty_and_mismatched_inputs_are_rejected() {
        assert!(LinearSvc::fit(&[], &[], &SvmParams::default()).is_err());
        let features = vec![vector(0.0, 0.0)];
        assert!(LinearSvc::fit(&features, &labels(&["a", "b"]), &SvmParams::default()).is_err());
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let features = vec![vector(0.0, 0.0), vector(1.0, 1.0)];
        let y = labels(&["a", "b"]);
        let params = SvmParams {
            c: 0.0,
            ..Default::default()
        };
        assert!(LinearSvc::fit(&features, &y, &params).is_err());
    }

    #[test]
    fn test_vote_tie_goes_to_first_class() {
        // Three machines that each vote for a different class
        let model = LinearSvc {
            c: 1.0,
            classes: labels(&["a", "b", "c"]),
            machines: vec![
                BinaryMachine { positive: 0, negative: 1, weights: vec![0.0; N_MFCC], bias: 1.0 },
                BinaryMachine { positive: 0, negative: 2, weights: vec![0.0; N_MFCC], bias: -1.0 },
                BinaryMachine { positive: 1, negative: 2, weights: vec![0.0; N_MFCC], bias: 1.0 },
            ],
        };
        // votes: a=1, b=1, c=1
        assert_eq!(model.predict(&vector(0.0, 0.0)), "a");
    }

    #[test]
    fn test_zero_decision_votes_negative() {
        let model = LinearSvc {
            c: 1.0,
            classes: labels(&["a", "b"]),
            machines: vec![BinaryMachine {
                positive: 0,
                negative: 1,
                weights: vec![0.0; N_MFCC],
                bias: 0.0,
            }],
        };
        assert_eq!(model.predict(&vector(5.0, 5.0)), "b");
    }

    #[test]
    fn test_validate_catches_structural_problems() {
        let good = LinearSvc {
            c: 1.0,
            classes: labels(&["a", "b"]),
            machines: vec![BinaryMachine {
                positive: 0,
                negative: 1,
                weights: vec![0.0; N_MFCC],
                bias: 0.0,
            }],
        };
        assert!(good.validate().is_ok());

        let mut short_weights = good.clone();
        short_weights.machines[0].weights.pop();
        assert!(short_weights.validate().is_err());

        let mut bad_index = good.clone();
        bad_index.machines[0].negative = 7;
        assert!(bad_index.validate().is_err());

        let mut missing_machine = good.clone();
        missing_machine.machines.clear();
        assert!(missing_machine.validate().is_err());

        let mut one_class = good;
        one_class.classes.pop();
        assert!(one_class.validate().is_err());
    }

    #[test]
    fn test_linear_kernel_matches_dot_products() {
        let a = [1.0, 2.0, -1.0];
        let b = [0.5, -1.0, 3.0];
        let c = [0.0, 0.0, 0.0];
        let rows: Vec<&[f64]> = vec![&a, &b, &c];
        let kernel = LinearKernel::new(&rows);

        assert_eq!(kernel.diag.len(), 3);
        assert_eq!(kernel.diag(0), 6.0);
        assert_eq!(kernel.diag(1), 10.25);
        assert_eq!(kernel.diag(2), 0.0);
        assert_eq!(kernel.eval(0, 1), -4.5);
        assert_eq!(kernel.eval(1, 0), kernel.eval(0, 1));
        assert_eq!(kernel.eval(1, 1), kernel.diag(1));
        assert_eq!(kernel.eval(2, 0), 0.0);
    }

    #[test]
    fn test_large_training_set_fits() {
        // Far more rows than a dense Gram matrix would comfortably hold in a unit test
        let per_class = 2500;
        let mut features = Vec::with_capacity(per_class * 2);
        let mut y = Vec::with_capacity(per_class * 2);
        for i in 0..per_class {
            let jitter = ((i * 37) % 101) as f32 / 101.0 - 0.5;
            let spread = ((i * 53) % 89) as f32 / 89.0 - 0.5;
            features.push(vector(-3.0 + jitter, spread));
            y.push("left".to_string());
            features.push(vector(3.0 - jitter, -spread));
            y.push("right".to_string());
        }

        let model = LinearSvc::fit(&features, &y, &SvmParams::default()).unwrap();

        assert_eq!(model.machines().len(), 1);
        assert_eq!(model.predict(&vector(-3.0, 0.0)), "left");
        assert_eq!(model.predict(&vector(3.0, 0.0)), "right");
        let correct = features
            .iter()
            .zip(&y)
            .filter(|(x, label)| model.predict(x) == label.as_str())
            .count();
        assert_eq!(correct, features.len());
    }

    #[test]
    fn test_decision_values_per_machine() {
        let features = vec![vector(-1.0, 0.0), vector(1.0, 0.0)];
        let y = labels(&["a", "b"]);
        let model = LinearSvc::fit(&features, &y, &SvmParams::default()).unwrap();
        let values = model.decision_values(&vector(-2.0, 0.0));
        assert_eq!(values.len(), 1);
        assert!(values[0] > 0.0);
    }
}
