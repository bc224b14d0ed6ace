use crate::data::{BlockIdx, CourseIdx, SectionNo, StudentIdx};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarKey {
    /// `x[s, course, block]`
    Placement {
        section: SectionNo,
        course: CourseIdx,
        block: BlockIdx,
    },
    /// `y[student, course, block]`
    Enrollment {
        student: StudentIdx,
        course: CourseIdx,
        block: BlockIdx,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn evaluate(&self, values: &[bool]) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| values[v.0])
            .map(|(_, c)| c)
            .sum()
    }
}

impl FromIterator<VarId> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = VarId>>(iter: I) -> Self {
        LinearExpr {
            terms: iter.into_iter().map(|v| (v, 1.0)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    Equal,
}

/// Constraint families, used for logging and for telling constraints apart in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    SectionCardinality,
    CourseBlockCollision,
    TeacherExclusivity,
    ForbiddenPlacement,
    RequiredPlacement,
    RoomExclusivity,
    DepartmentCeiling,
    Colocation,
    StudentBlockOccupancy,
    DuplicateEnrollment,
    EnrollmentNeedsPlacement,
    PreferenceGate,
    RoomCapacity,
    SameDayExclusion,
    AggregateCapacity,
    Freeze,
    AccommodationBalance,
    SectionBalance,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub family: Family,
    pub lhs: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        const EPS: f64 = 1e-6;
        let lhs = self.lhs.evaluate(values);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs + EPS,
            Relation::Equal => (lhs - self.rhs).abs() <= EPS,
        }
    }
}

/// A maximisation problem over binary variables.
#[derive(Debug, Clone, Default)]
pub struct Model {
    keys: Vec<VarKey>,
    index: HashMap<VarKey, VarId>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing variable for `key` or creates it.
    pub fn var(&mut self, key: VarKey) -> VarId {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = VarId(self.keys.len());
        self.keys.push(key);
        self.index.insert(key, id);
        id
    }

    pub fn lookup(&self, key: &VarKey) -> Option<VarId> {
        self.index.get(key).copied()
    }

    pub fn key(&self, id: VarId) -> VarKey {
        self.keys[id.0]
    }

    pub fn keys(&self) -> &[VarKey] {
        &self.keys
    }

    pub fn num_vars(&self) -> usize {
        self.keys.len()
    }

    pub fn constrain(&mut self, family: Family, lhs: LinearExpr, relation: Relation, rhs: f64) {
        self.constraints.push(Constraint {
            family,
            lhs,
            relation,
            rhs,
        });
    }

    pub fn fix(&mut self, family: Family, var: VarId, value: bool) {
        let rhs = if value { 1.0 } else { 0.0 };
        self.constrain(family, [var].into_iter().collect(), Relation::Equal, rhs);
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn count(&self, family: Family) -> usize {
        self.constraints.iter().filter(|c| c.family == family).count()
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Constraints violated by a full variable assignment.
    pub fn violations(&self, values: &[bool]) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values))
            .collect()
    }
}
