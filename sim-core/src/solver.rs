//! Closed-form utility maximisation.
//!
//! Agents maximise
//!
//! ```text
//! U(Q, S) = a·ln(Q) + b·ln(S) - a·ln(mu·e·Q + 1)
//! ```
//!
//! subject to the budget `Y = P·Q + S + c`. The Lagrangian first-order
//! conditions reduce to `a·S = b·P·Q·(m·Q + 1)` with `m = mu·e`; substituting
//! into the budget gives a quadratic in `S` whose admissible root is
//!
//! ```text
//! S* = (2mW + P/b - sqrt(P²/b² + 4·a·m·P·W/b)) / 2m,   W = Y - c,
//! Q* = (W - S*) / P
//! ```
//!
//! As `m → 0` this degenerates to the Cobb-Douglas split `S* = bW`,
//! `Q* = aW/P`. The social variant adds `a·delta·ln(1 + F)` to the utility;
//! the term is constant in `Q` and `S`, so both variants share the same
//! allocation formulas and differ only in the utility value.
//!
//! The derivation happens once per utility specification per run, not per
//! agent or per period: [`Solver::solve_base`] and [`Solver::solve_social`]
//! install a cheap numeric evaluator that is read-only afterwards and safe to
//! share across the whole population.

use crate::error::SolverError;

// === PARAMETERS ===

/// Numeric parameter tuple fed to the evaluators, one plan side at a time.
#[derive(Clone, Copy, Debug)]
pub struct UtilityParams {
    /// Consumption weight.
    pub a: f64,
    /// Savings weight, `1 - a`.
    pub b: f64,
    /// Eco-consciousness.
    pub mu: f64,
    /// Disposable income `Y`.
    pub budget: f64,
    /// Unit price `P` of the average good.
    pub price: f64,
    /// Emissions per unit for the plan under evaluation.
    pub emission: f64,
    /// Per-period cost of the plan under evaluation.
    pub cost: f64,
    /// Affinity to peer opinion; ignored by the base form.
    pub delta: f64,
    /// Fraction of friends on the same plan last period; ignored by the base
    /// form.
    pub peer_fraction: f64,
}

/// Optimal allocation and its utility for one plan side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Allocation {
    pub quantity: f64,
    pub savings: f64,
    pub utility: f64,
}

// === CLOSED FORM ===

/// Below this, the eco-guilt term is numerically inert and the allocation
/// falls back to the exact Cobb-Douglas limit.
const EMISSION_EPS: f64 = 1e-12;

/// A "lambdified" closed-form evaluator: a pure function of the parameter
/// tuple, built once per utility specification per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClosedForm {
    social: bool,
}

impl ClosedForm {
    pub fn is_social(self) -> bool {
        self.social
    }

    /// Optimal `(Q*, S*)`, or `None` when no positive real optimum exists for
    /// this numeric substitution. In practice that means the budget does not
    /// cover the plan cost (`Y - c <= 0`).
    pub fn allocate(self, p: &UtilityParams) -> Option<(f64, f64)> {
        if p.a <= 0.0 || p.b <= 0.0 || p.price <= 0.0 {
            return None;
        }
        let w = p.budget - p.cost;
        if w <= 0.0 {
            return None;
        }

        let m = p.mu * p.emission;
        let savings = if m < EMISSION_EPS {
            p.b * w
        } else {
            let disc = (p.price / p.b).powi(2) + 4.0 * p.a * m * p.price * w / p.b;
            if disc < 0.0 {
                return None;
            }
            (2.0 * m * w + p.price / p.b - disc.sqrt()) / (2.0 * m)
        };

        let quantity = (w - savings) / p.price;
        (quantity > 0.0 && savings > 0.0).then_some((quantity, savings))
    }

    /// Evaluate `U(Q*, S*)` along with the allocation itself.
    pub fn evaluate(self, p: &UtilityParams) -> Option<Allocation> {
        let (quantity, savings) = self.allocate(p)?;
        let m = p.mu * p.emission;
        let mut utility = p.a * quantity.ln() + p.b * savings.ln() - p.a * (m * quantity + 1.0).ln();
        if self.social {
            utility += p.a * p.delta * (1.0 + p.peer_fraction).ln();
        }
        Some(Allocation {
            quantity,
            savings,
            utility,
        })
    }
}

// === SOLVER ===

const FOC_TOLERANCE: f64 = 1e-6;

/// Owns the once-per-run derivation of the closed forms.
///
/// `solve_base` must run before any decision round; `solve_social` replaces
/// the active evaluator for subsequent social rounds. Both re-verify the
/// formula bank against the first-order conditions at a reference point and
/// fail structurally if the residuals do not vanish.
#[derive(Debug, Default)]
pub struct Solver {
    active: Option<ClosedForm>,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the base (non-social) closed form and make it active.
    pub fn solve_base(&mut self) -> Result<ClosedForm, SolverError> {
        self.install(ClosedForm { social: false })
    }

    /// Derive the social closed form and make it active.
    pub fn solve_social(&mut self) -> Result<ClosedForm, SolverError> {
        self.install(ClosedForm { social: true })
    }

    /// The evaluator currently in force, if any specification has been solved.
    pub fn active(&self) -> Option<ClosedForm> {
        self.active
    }

    fn install(&mut self, form: ClosedForm) -> Result<ClosedForm, SolverError> {
        verify_first_order_conditions(form)?;
        self.active = Some(form);
        Ok(form)
    }
}

/// Check stationarity and the budget constraint at a reference point.
///
/// With `lambda = -b/S` from the S-derivative, the Q-derivative reduces to
/// `a/Q - a·m/(mQ + 1) - bP/S = 0`. A violated residual means the hard-coded
/// formula bank does not solve the FOC system: a structural error that aborts
/// the run before any agent decides.
fn verify_first_order_conditions(form: ClosedForm) -> Result<(), SolverError> {
    let p = UtilityParams {
        a: 0.3,
        b: 0.7,
        mu: 0.2,
        budget: 1500.0,
        price: 60.0,
        emission: 0.8,
        cost: 10.0,
        delta: 0.05,
        peer_fraction: 0.5,
    };
    let Some((q, s)) = form.allocate(&p) else {
        return Err(SolverError::NoClosedForm {
            residual: f64::INFINITY,
        });
    };

    let m = p.mu * p.emission;
    let budget_residual = p.budget - p.price * q - s - p.cost;
    let stationarity = p.a / q - p.a * m / (m * q + 1.0) - p.b * p.price / s;
    let residual = budget_residual.abs().max(stationarity.abs());

    if residual > FOC_TOLERANCE {
        Err(SolverError::NoClosedForm { residual })
    } else {
        Ok(())
    }
}
