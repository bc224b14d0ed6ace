use crate::compiler::{compile, decode, validate_frozen};
use crate::data::{Assignment, SectionPlacement, SolveStatus};
use crate::domain::Timetable;
use crate::error::{Result, TimetableError};
use crate::oracle::{Oracle, OracleStatus};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Instant;

/// Shuffles `prior` and keeps its last `freeze_size` entries; the prefix is reopened.
pub fn select_frozen<R: Rng + ?Sized>(
    prior: &[SectionPlacement],
    freeze_size: usize,
    rng: &mut R,
) -> Vec<SectionPlacement> {
    let mut shuffled = prior.to_vec();
    shuffled.sort();
    shuffled.shuffle(rng);
    let split = shuffled.len().saturating_sub(freeze_size);
    shuffled.split_off(split)
}

pub struct NeighborhoodSearch<'a, O: Oracle> {
    timetable: &'a Timetable,
    oracle: O,
    rng: StdRng,
}

impl<'a, O: Oracle> NeighborhoodSearch<'a, O> {
    pub fn new(timetable: &'a Timetable, oracle: O, seed: u64) -> Self {
        NeighborhoodSearch {
            timetable,
            oracle,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Full optimisation with nothing frozen.
    pub fn solve_initial(&mut self) -> Result<Assignment> {
        self.improve(&[], 0)
    }

    /// One re-solve with `freeze_size` of the prior placements held fixed.
    pub fn improve(&mut self, prior: &[SectionPlacement], freeze_size: usize) -> Result<Assignment> {
        validate_frozen(self.timetable, prior)?;
        let frozen = select_frozen(prior, freeze_size, &mut self.rng);
        debug!(
            "Reopening {} of {} placements.",
            prior.len() - frozen.len(),
            prior.len()
        );
        let model = compile(self.timetable, &frozen)?;

        let start_time = Instant::now();
        let result = self.oracle.solve(&model);
        let status = match result.status {
            OracleStatus::Optimal => SolveStatus::Optimal,
            OracleStatus::Feasible => SolveStatus::Feasible,
            OracleStatus::Infeasible => {
                let rules = self
                    .timetable
                    .placement_rules
                    .iter()
                    .map(|r| self.timetable.describe_rule(r))
                    .collect();
                return Err(TimetableError::ModelInfeasible { rules });
            }
            OracleStatus::Error(message) => return Err(TimetableError::Oracle(message)),
        };

        if result.values.len() != model.num_vars() {
            return Err(TimetableError::Oracle(format!(
                "oracle returned {} values for {} variables",
                result.values.len(),
                model.num_vars()
            )));
        }
        let violated = model.violations(&result.values);
        if let Some(first) = violated.first() {
            return Err(TimetableError::Oracle(format!(
                "oracle assignment violates {} constraints (first: {})",
                violated.len(),
                first.family
            )));
        }

        let (placements, enrollments) = decode(&model, &result.values);
        let objective = model.objective().evaluate(&result.values).round() as i64;
        info!(
            "Neighbourhood solve finished in {:.2?}: {:?}, objective {}, {} enrollments.",
            start_time.elapsed(),
            status,
            objective,
            enrollments.len()
        );
        Ok(Assignment {
            placements,
            enrollments,
            objective,
            status,
        })
    }

    /// Runs `iterations` improvement steps from `initial`, keeping the best assignment.
    pub fn run(
        &mut self,
        initial: Assignment,
        iterations: usize,
        freeze_size: usize,
    ) -> Result<Assignment> {
        let mut best = initial;
        for iteration in 0..iterations {
            let candidate = self.improve(&best.placements, freeze_size)?;
            if candidate.objective >= best.objective {
                info!(
                    "Iteration {} complete with {} points ({:+}).",
                    iteration,
                    candidate.objective,
                    candidate.objective - best.objective
                );
                best = candidate;
            } else {
                warn!(
                    "Iteration {} returned {} points, below the current {}; keeping the current timetable.",
                    iteration, candidate.objective, best.objective
                );
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimetableConfig;
    use crate::data::{CourseRecord, Records, RequestRecord};
    use crate::domain::build;
    use crate::model::Model;
    use crate::oracle::OracleResult;

    struct Fixed(OracleResult);

    impl Oracle for Fixed {
        fn solve(&self, _model: &Model) -> OracleResult {
            self.0.clone()
        }
    }

    /// Answers with whatever placements it is told, enrolling nobody.
    struct Scripted(Vec<SectionPlacement>);

    impl Oracle for Scripted {
        fn solve(&self, model: &Model) -> OracleResult {
            let values = crate::compiler::encode(model, &self.0, &[]);
            OracleResult {
                status: OracleStatus::Optimal,
                objective: 0.0,
                values,
            }
        }
    }

    fn timetable() -> Timetable {
        let mut config = TimetableConfig::default();
        config.blocks.truncate(2);
        let records = Records {
            courses: vec![CourseRecord {
                department: "Arts".into(),
                course: "Art".into(),
                code: None,
                sections: 1,
                teachers: None,
                rooms: Some("General".into()),
                placement: None,
            }],
            rooms: Vec::new(),
            teachers: Vec::new(),
            requests: vec![RequestRecord {
                student_id: 1,
                grade: 9,
                course: "Art".into(),
                course_code: None,
                preference_rank: None,
                iep: false,
                gender: None,
                weight: Some(0),
            }],
        };
        build(&records, &config).unwrap()
    }

    fn placements(n: u32) -> Vec<SectionPlacement> {
        (1..=n)
            .map(|s| SectionPlacement {
                section: s,
                course: s as usize,
                block: 0,
            })
            .collect()
    }

    #[test]
    fn frozen_subset_has_requested_size() {
        let mut rng = StdRng::seed_from_u64(7);
        let prior = placements(10);
        assert_eq!(select_frozen(&prior, 4, &mut rng).len(), 4);
        assert!(select_frozen(&prior, 0, &mut rng).is_empty());
        let mut all = select_frozen(&prior, 25, &mut rng);
        all.sort();
        assert_eq!(all, prior);
    }

    #[test]
    fn frozen_subset_is_reproducible_for_a_seed() {
        let prior = placements(12);
        let mut reversed = prior.clone();
        reversed.reverse();
        let a = select_frozen(&prior, 5, &mut StdRng::seed_from_u64(42));
        let b = select_frozen(&reversed, 5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn infeasible_oracle_surfaces_rules() {
        let t = timetable();
        let mut search = NeighborhoodSearch::new(&t, Fixed(OracleResult::infeasible()), 1);
        let err = search.solve_initial().unwrap_err();
        assert!(matches!(err, TimetableError::ModelInfeasible { .. }));
    }

    #[test]
    fn oracle_failure_is_passed_through() {
        let t = timetable();
        let mut search = NeighborhoodSearch::new(&t, Fixed(OracleResult::error("out of memory")), 1);
        assert_eq!(
            search.solve_initial().unwrap_err(),
            TimetableError::Oracle("out of memory".into())
        );
    }

    #[test]
    fn invalid_oracle_assignment_is_rejected() {
        let t = timetable();
        // the single Art section must be placed somewhere
        let mut search = NeighborhoodSearch::new(&t, Scripted(Vec::new()), 1);
        assert!(matches!(
            search.solve_initial(),
            Err(TimetableError::Oracle(ref m)) if m.contains("SectionCardinality")
        ));
    }

    #[test]
    fn valid_assignment_is_decoded() {
        let t = timetable();
        let placed = vec![SectionPlacement {
            section: 1,
            course: 0,
            block: 1,
        }];
        let mut search = NeighborhoodSearch::new(&t, Scripted(placed.clone()), 1);
        let solved = search.solve_initial().unwrap();
        assert_eq!(solved.placements, placed);
        assert!(solved.enrollments.is_empty());
        assert_eq!(solved.status, SolveStatus::Optimal);

        let again = search.run(solved.clone(), 2, 1).unwrap();
        assert_eq!(again, solved);
    }
}
