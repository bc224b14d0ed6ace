use crate::model::{Model, Relation, VarId};
use crate::oracle::{Oracle, OracleResult, OracleStatus, SolveBudget};
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, SolverModel,
    Variable, constraint, default_solver,
};
use log::{info, trace, warn};
use std::time::Instant;

/// Oracle backed by the HiGHS MILP solver.
#[derive(Debug, Clone, Default)]
pub struct HighsOracle {
    pub budget: SolveBudget,
    pub log_to_console: bool,
}

impl HighsOracle {
    pub fn new(budget: SolveBudget) -> Self {
        HighsOracle {
            budget,
            log_to_console: false,
        }
    }
}

impl Oracle for HighsOracle {
    /// solves the model using the HiGHS ILP solver.
    fn solve(&self, model: &Model) -> OracleResult {
        let start_time = Instant::now();
        if model.num_vars() == 0 {
            return OracleResult {
                status: OracleStatus::Optimal,
                objective: 0.0,
                values: Vec::new(),
            };
        }

        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = problem.add_vector(variable().binary(), model.num_vars());
        let linear = |terms: &[(VarId, f64)]| -> Expression {
            let mut expr = Expression::from(0.0);
            for (id, coefficient) in terms {
                expr += *coefficient * vars[id.0];
            }
            expr
        };

        let objective = linear(&model.objective().terms);
        let mut highs = problem
            .maximise(objective)
            .using(default_solver)
            .set_option("threads", 1) // limit to 1 thread for reproducibility
            .set_option("random_seed", 1234) //set seed for reproducibility
            .set_option("log_to_console", if self.log_to_console { "true" } else { "false" });
        if let Some(limit) = self.budget.time_limit {
            highs = highs.set_option("time_limit", limit.as_secs_f64());
        }

        for c in model.constraints() {
            let lhs = linear(&c.lhs.terms);
            let rhs = c.rhs;
            match c.relation {
                Relation::LessEq => highs.add_constraint(constraint!(lhs <= rhs)),
                Relation::Equal => highs.add_constraint(constraint!(lhs == rhs)),
            };
        }
        trace!(
            "Handed {} variables and {} constraints to HiGHS.",
            model.num_vars(),
            model.constraints().len()
        );

        info!("Starting ILP solver...");
        let solution = match highs.solve() {
            Ok(s) => s,
            // every variable is binary, so an unbounded report means no feasible point
            Err(ResolutionError::Infeasible | ResolutionError::Unbounded) => {
                warn!("HiGHS proved the model infeasible after {:.2?}", start_time.elapsed());
                return OracleResult::infeasible();
            }
            Err(e) => return OracleResult::error(format!("Solver error: {}", e)),
        };
        let status = match solution.status() {
            SolutionStatus::Optimal => OracleStatus::Optimal,
            _ => OracleStatus::Feasible,
        };
        let values: Vec<bool> = vars.iter().map(|v| solution.value(*v) > 0.9).collect();
        let objective = model.objective().evaluate(&values);
        info!(
            "Solution found in {:.2?} ({:?}, objective {})",
            start_time.elapsed(),
            status,
            objective
        );

        OracleResult {
            status,
            objective,
            values,
        }
    }
}
