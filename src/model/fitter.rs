//! Newton-Raphson solver for the conditional logistic likelihood.
//!
//! Each stratum contributes `eta_case - ln sum_j exp(eta_j)` to the
//! log-likelihood; gradients and the observed information follow from the
//! within-stratum softmax. The solver runs full Newton steps with step
//! halving, bounded by the caller's iteration budget, and reads standard
//! errors off the inverse information at the optimum.

use super::{
    Coefficient, ConvergenceError, DesignError, Model, ModelFitError, Term,
};
use crate::types::{Step, StratumId};
use log::{debug, warn};
use nalgebra::{Cholesky, DMatrix, DVector};
use std::collections::HashSet;

/// Solver configuration for [`fit`].
#[derive(Clone, Copy, Debug)]
pub struct FitOptions {
    /// Newton iteration budget; exhausting it is a [`ConvergenceError`].
    pub max_iter: usize,
    /// Convergence threshold on the gradient max-norm.
    pub tolerance: f64,
    /// When set, every stratum must carry exactly this many control steps;
    /// a mismatch is a [`DesignError`]. `None` accepts any positive count.
    pub expected_controls: Option<usize>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tolerance: 1e-6,
            expected_controls: None,
        }
    }
}

/// Rows of one stratum after design-matrix evaluation.
struct Stratum {
    rows: Vec<DVector<f64>>,
    /// Index of the case row within `rows`.
    case: usize,
}

/// Fit a stratified conditional regression of case membership on `terms`.
///
/// Steps are grouped by their stratum id. Strata must be well formed in
/// their raw composition (exactly one case, at least one control, and the
/// expected control count when configured). Rows with missing term values
/// are excluded as missing observations; a stratum that loses its case or
/// every control this way is dropped from the likelihood and counted on the
/// returned [`Model`].
pub fn fit(steps: &[Step], terms: &[Term], options: &FitOptions) -> Result<Model, ModelFitError> {
    if terms.is_empty() {
        return Err(DesignError::NoTerms.into());
    }
    let available: HashSet<&str> = steps
        .iter()
        .flat_map(|s| s.covariates.keys().map(String::as_str))
        .collect();
    for term in terms {
        term.validate(&available)?;
    }

    let (strata, dropped) = build_strata(steps, terms, options)?;
    let p = terms.len();
    let n_strata = strata.len();

    // Null likelihood: with beta = 0 every row in a stratum is equally
    // likely, so each stratum contributes -ln(m).
    let null_log_likelihood = -strata
        .iter()
        .map(|s| (s.rows.len() as f64).ln())
        .sum::<f64>();

    let mut beta = DVector::<f64>::zeros(p);
    let mut ll = conditional_loglik(&strata, &beta);
    let mut iterations = 0usize;
    let mut converged = false;
    let mut grad_norm = f64::INFINITY;

    for iter in 0..options.max_iter {
        iterations = iter + 1;
        let (grad, info) = score_and_information(&strata, &beta, p);
        grad_norm = grad.amax();
        if grad_norm < options.tolerance {
            converged = true;
            break;
        }

        let delta = match solve_newton(&info, &grad) {
            Some(d) => d,
            None => {
                warn!("conditional fit: information matrix is singular at iteration {iter}");
                return Err(ConvergenceError {
                    iterations,
                    last_gradient_norm: grad_norm,
                }
                .into());
            }
        };

        // Step halving keeps the likelihood monotone when a full Newton
        // step overshoots.
        let mut scale = 1.0;
        let mut accepted = false;
        for _ in 0..20 {
            let candidate = &beta + &delta * scale;
            let cand_ll = conditional_loglik(&strata, &candidate);
            if cand_ll.is_finite() && cand_ll >= ll - 1e-12 {
                beta = candidate;
                ll = cand_ll;
                accepted = true;
                break;
            }
            scale *= 0.5;
        }
        if !accepted {
            break;
        }
    }

    if !converged {
        return Err(ConvergenceError {
            iterations,
            last_gradient_norm: grad_norm,
        }
        .into());
    }

    // Standard errors from the inverse observed information at the optimum.
    let (_, info) = score_and_information(&strata, &beta, p);
    let std_errors = information_inverse_diag(&info).ok_or(ConvergenceError {
        iterations,
        last_gradient_norm: grad_norm,
    })?;

    debug!(
        "conditional fit: {} strata ({} dropped), ll = {:.4} after {} iterations",
        n_strata, dropped, ll, iterations
    );

    let coefficients = terms
        .iter()
        .zip(beta.iter().zip(std_errors.iter()))
        .map(|(term, (&estimate, &std_error))| Coefficient {
            term: term.to_string(),
            estimate,
            std_error,
        })
        .collect();

    Ok(Model {
        terms: terms.to_vec(),
        coefficients,
        log_likelihood: ll,
        null_log_likelihood,
        n_parameters: p,
        n_strata,
        n_strata_dropped: dropped,
        iterations,
    })
}

/// Group steps by stratum, validate composition, and evaluate term values.
/// Returns usable strata plus the count dropped for missing observations.
fn build_strata(
    steps: &[Step],
    terms: &[Term],
    options: &FitOptions,
) -> Result<(Vec<Stratum>, usize), DesignError> {
    // Strata are contiguous in pipeline output, but grouping is by id so
    // callers may pass reordered rows.
    let mut order: Vec<StratumId> = Vec::new();
    let mut groups: std::collections::HashMap<StratumId, Vec<&Step>> =
        std::collections::HashMap::new();
    for step in steps {
        let entry = groups.entry(step.stratum).or_default();
        if entry.is_empty() {
            order.push(step.stratum);
        }
        entry.push(step);
    }

    let mut strata = Vec::with_capacity(order.len());
    let mut dropped = 0usize;

    for id in order {
        let members = &groups[&id];
        let cases = members.iter().filter(|s| s.case).count();
        let controls = members.len() - cases;
        if cases == 0 {
            return Err(DesignError::StratumWithoutCase { stratum: id });
        }
        if cases > 1 {
            return Err(DesignError::StratumWithMultipleCases {
                stratum: id,
                found: cases,
            });
        }
        if controls == 0 {
            return Err(DesignError::StratumWithoutControls { stratum: id });
        }
        if let Some(expected) = options.expected_controls {
            if controls != expected {
                return Err(DesignError::ControlCountMismatch {
                    stratum: id,
                    found: controls,
                    expected,
                });
            }
        }

        // Missing observations drop individual rows, never the whole fit.
        let mut rows = Vec::with_capacity(members.len());
        let mut case_idx = None;
        for step in members {
            let values: Option<Vec<f64>> = terms.iter().map(|t| t.value(step)).collect();
            let Some(values) = values else { continue };
            if step.case {
                case_idx = Some(rows.len());
            }
            rows.push(DVector::from_vec(values));
        }
        match case_idx {
            Some(case) if rows.len() >= 2 => strata.push(Stratum { rows, case }),
            _ => {
                dropped += 1;
                debug!(
                    "stratum {} dropped: missing observations leave no contrast",
                    id.0
                );
            }
        }
    }

    if strata.is_empty() {
        return Err(DesignError::NoUsableStrata);
    }
    Ok((strata, dropped))
}

fn conditional_loglik(strata: &[Stratum], beta: &DVector<f64>) -> f64 {
    let mut ll = 0.0;
    for s in strata {
        let etas: Vec<f64> = s.rows.iter().map(|x| x.dot(beta)).collect();
        let max = etas.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let denom: f64 = etas.iter().map(|e| (e - max).exp()).sum();
        ll += etas[s.case] - max - denom.ln();
    }
    ll
}

fn score_and_information(
    strata: &[Stratum],
    beta: &DVector<f64>,
    p: usize,
) -> (DVector<f64>, DMatrix<f64>) {
    let mut grad = DVector::<f64>::zeros(p);
    let mut info = DMatrix::<f64>::zeros(p, p);

    for s in strata {
        let etas: Vec<f64> = s.rows.iter().map(|x| x.dot(beta)).collect();
        let max = etas.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = etas.iter().map(|e| (e - max).exp()).collect();
        let denom: f64 = weights.iter().sum();

        let mut xbar = DVector::<f64>::zeros(p);
        for (x, &w) in s.rows.iter().zip(&weights) {
            xbar.axpy(w / denom, x, 1.0);
        }
        grad += &s.rows[s.case] - &xbar;
        for (x, &w) in s.rows.iter().zip(&weights) {
            let centred = x - &xbar;
            info.syger(w / denom, &centred, &centred, 1.0);
        }
    }
    info.fill_upper_triangle_with_lower_triangle();
    (grad, info)
}

fn solve_newton(info: &DMatrix<f64>, grad: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(chol) = Cholesky::new(info.clone()) {
        return Some(chol.solve(grad));
    }
    // Tiny ridge recovers near-singular information from collinear terms.
    let p = info.nrows();
    let ridged = info + DMatrix::<f64>::identity(p, p) * 1e-8;
    Cholesky::new(ridged).map(|chol| chol.solve(grad))
}

fn information_inverse_diag(info: &DMatrix<f64>) -> Option<Vec<f64>> {
    let inverse = Cholesky::new(info.clone())?.inverse();
    Some(inverse.diagonal().iter().map(|v| v.sqrt()).collect())
}
