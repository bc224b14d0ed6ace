use crate::data::{BlockIdx, CourseIdx, Enrollment, PlacementRule, SectionPlacement};
use crate::domain::Timetable;
use crate::error::{Result, TimetableError};
use crate::model::{Family, LinearExpr, Model, Relation, VarId, VarKey};
use itertools::Itertools;
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Builds the model with every placement in `frozen` forced on.
///
/// Pure: the same timetable and frozen set always yield the same model.
pub fn compile(timetable: &Timetable, frozen: &[SectionPlacement]) -> Result<Model> {
    validate_rules(timetable)?;
    validate_frozen(timetable, frozen)?;

    let mut model = Model::new();
    let slots = timetable.section_slots();
    let blocks = timetable.blocks.len();

    // x[s, course, block]
    for course in 0..timetable.courses.len() {
        for section in 1..=slots {
            for block in 0..blocks {
                model.var(VarKey::Placement {
                    section,
                    course,
                    block,
                });
            }
        }
    }
    // y[student, course, block]
    for (student, s) in timetable.students.iter().enumerate() {
        for request in &s.requests {
            for block in 0..blocks {
                model.var(VarKey::Enrollment {
                    student,
                    course: request.course,
                    block,
                });
            }
        }
    }

    let x = |model: &Model, section, course, block| -> VarId {
        model
            .lookup(&VarKey::Placement {
                section,
                course,
                block,
            })
            .unwrap_or_else(|| unreachable!("placement variable created above"))
    };
    let placed_in = |model: &Model, course: CourseIdx, block: BlockIdx| -> Vec<VarId> {
        (1..=slots).map(|s| x(model, s, course, block)).collect()
    };

    // section cardinality
    for (course, c) in timetable.courses.iter().enumerate() {
        for section in 1..=slots {
            let expr: LinearExpr = (0..blocks).map(|k| x(&model, section, course, k)).collect();
            let rhs = if section <= c.sections { 1.0 } else { 0.0 };
            model.constrain(Family::SectionCardinality, expr, Relation::Equal, rhs);
        }
    }

    // no two sections of a course share a block
    for course in 0..timetable.courses.len() {
        for k in 0..blocks {
            let expr: LinearExpr = placed_in(&model, course, k).into_iter().collect();
            model.constrain(Family::CourseBlockCollision, expr, Relation::LessEq, 1.0);
        }
    }

    for teacher in &timetable.teachers {
        if teacher.exclusive_courses.len() < 2 {
            continue;
        }
        for k in 0..blocks {
            let expr: LinearExpr = teacher
                .exclusive_courses
                .iter()
                .flat_map(|&j| placed_in(&model, j, k))
                .collect();
            model.constrain(Family::TeacherExclusivity, expr, Relation::LessEq, 1.0);
        }
    }

    for rule in &timetable.placement_rules {
        match *rule {
            PlacementRule::Forbidden { course, block } => {
                for var in placed_in(&model, course, block) {
                    model.fix(Family::ForbiddenPlacement, var, false);
                }
            }
            PlacementRule::Required {
                section,
                course,
                block,
            } => {
                let var = x(&model, section, course, block);
                model.fix(Family::RequiredPlacement, var, true);
            }
        }
    }

    for class in &timetable.room_classes {
        for k in 0..blocks {
            let expr: LinearExpr = class
                .courses
                .iter()
                .flat_map(|&j| placed_in(&model, j, k))
                .collect();
            model.constrain(Family::RoomExclusivity, expr, Relation::LessEq, 1.0);
        }
    }

    for department in &timetable.departments {
        let Some(ceiling) = department.max_per_block else {
            continue;
        };
        for k in 0..blocks {
            let expr: LinearExpr = department
                .courses
                .iter()
                .flat_map(|&j| placed_in(&model, j, k))
                .collect();
            model.constrain(Family::DepartmentCeiling, expr, Relation::LessEq, ceiling as f64);
        }
    }

    for group in &timetable.colocations {
        let Some((&anchor, rest)) = group.courses.split_first() else {
            continue;
        };
        for k in 0..blocks {
            let anchor_var = x(&model, 1, anchor, k);
            for &other in rest {
                let mut expr = LinearExpr::new();
                expr.add(x(&model, 1, other, k), 1.0);
                expr.add(anchor_var, -1.0);
                model.constrain(Family::Colocation, expr, Relation::Equal, 0.0);
            }
            if group.excluded.is_empty() {
                continue;
            }
            for &member in &group.courses {
                let mut expr: LinearExpr = group
                    .excluded
                    .iter()
                    .flat_map(|&e| placed_in(&model, e, k))
                    .collect();
                expr.add(x(&model, 1, member, k), 1.0);
                model.constrain(Family::Colocation, expr, Relation::LessEq, 1.0);
            }
        }
    }

    let y = |model: &Model, student, course, block| {
        model.lookup(&VarKey::Enrollment {
            student,
            course,
            block,
        })
    };

    for (i, student) in timetable.students.iter().enumerate() {
        // one course per block
        for k in 0..blocks {
            let expr: LinearExpr = student
                .requests
                .iter()
                .filter_map(|r| y(&model, i, r.course, k))
                .collect();
            model.constrain(Family::StudentBlockOccupancy, expr, Relation::LessEq, 1.0);
        }
        for request in &student.requests {
            let enrolled: Vec<VarId> = (0..blocks)
                .filter_map(|k| y(&model, i, request.course, k))
                .collect();
            model.constrain(
                Family::DuplicateEnrollment,
                enrolled.iter().copied().collect(),
                Relation::LessEq,
                1.0,
            );
            for (k, &var) in enrolled.iter().enumerate() {
                let mut expr: LinearExpr = [var].into_iter().collect();
                for placed in placed_in(&model, request.course, k) {
                    expr.add(placed, -1.0);
                }
                model.constrain(Family::EnrollmentNeedsPlacement, expr, Relation::LessEq, 0.0);
                if request.weight == 0 {
                    model.fix(Family::PreferenceGate, var, false);
                }
            }
        }
    }

    let enrolled_in = |model: &Model, students: &[usize], course: CourseIdx, block: BlockIdx| {
        students
            .iter()
            .filter_map(|&i| y(model, i, course, block))
            .collect::<LinearExpr>()
    };

    for (course, c) in timetable.courses.iter().enumerate() {
        if c.requested_by.is_empty() {
            continue;
        }
        for k in 0..blocks {
            let expr = enrolled_in(&model, &c.requested_by, course, k);
            model.constrain(Family::RoomCapacity, expr, Relation::LessEq, c.capacity as f64);
        }
    }

    for rule in &timetable.same_day_exclusions {
        let exempt: HashSet<usize> = rule.exempt.iter().copied().collect();
        for (i, student) in timetable.students.iter().enumerate() {
            if exempt.contains(&i) {
                continue;
            }
            let taken: Vec<CourseIdx> = rule
                .courses
                .iter()
                .copied()
                .filter(|&j| student.request(j).is_some())
                .collect();
            if taken.len() < 2 {
                continue;
            }
            for day in timetable.days() {
                let expr: LinearExpr = timetable
                    .blocks_on_day(day)
                    .into_iter()
                    .cartesian_product(taken.iter().copied())
                    .filter_map(|(k, j)| y(&model, i, j, k))
                    .collect();
                model.constrain(Family::SameDayExclusion, expr, Relation::LessEq, 1.0);
            }
        }
    }

    for rule in &timetable.aggregate_capacities {
        for k in 0..blocks {
            let mut expr = LinearExpr::new();
            for &j in &rule.courses {
                expr.terms
                    .extend(enrolled_in(&model, &timetable.courses[j].requested_by, j, k).terms);
            }
            model.constrain(
                Family::AggregateCapacity,
                expr,
                Relation::LessEq,
                rule.max_per_block as f64,
            );
        }
    }

    for placement in frozen {
        let var = x(&model, placement.section, placement.course, placement.block);
        model.fix(Family::Freeze, var, true);
    }

    for &course in &timetable.accommodation_courses {
        let c = &timetable.courses[course];
        let Some(fraction) = c.accommodation_balance else {
            continue;
        };
        let flagged = timetable.accommodation_students(course);
        let limit = fraction * flagged.len() as f64;
        for k in 0..blocks {
            let expr = enrolled_in(&model, &flagged, course, k);
            model.constrain(Family::AccommodationBalance, expr, Relation::LessEq, limit);
        }
    }

    for (course, c) in timetable.courses.iter().enumerate() {
        let Some(fraction) = c.section_balance else {
            continue;
        };
        if c.requested_by.is_empty() {
            continue;
        }
        let limit = fraction * c.request_total() as f64;
        for k in 0..blocks {
            let expr = enrolled_in(&model, &c.requested_by, course, k);
            model.constrain(Family::SectionBalance, expr, Relation::LessEq, limit);
        }
    }

    let mut objective = LinearExpr::new();
    for (i, student) in timetable.students.iter().enumerate() {
        for request in student.requests.iter().filter(|r| r.weight > 0) {
            for k in 0..blocks {
                if let Some(var) = y(&model, i, request.course, k) {
                    objective.add(var, request.weight as f64);
                }
            }
        }
    }
    model.set_objective(objective);

    let counts = model
        .constraints()
        .iter()
        .map(|c| c.family)
        .counts()
        .into_iter()
        .sorted()
        .map(|(family, n)| format!("{}={}", family, n))
        .join(", ");
    debug!("Constraint families: {}", counts);
    info!(
        "Compiled model with {} variables and {} constraints ({} frozen placements).",
        model.num_vars(),
        model.constraints().len(),
        frozen.len()
    );
    Ok(model)
}

/// Rejects placement rule sets that contradict themselves before any solve.
pub fn validate_rules(timetable: &Timetable) -> Result<()> {
    let forbidden: HashSet<(CourseIdx, BlockIdx)> = timetable
        .placement_rules
        .iter()
        .filter_map(|r| match *r {
            PlacementRule::Forbidden { course, block } => Some((course, block)),
            _ => None,
        })
        .collect();

    let mut section_blocks: HashMap<(u32, CourseIdx), BlockIdx> = HashMap::new();
    let mut block_sections: HashMap<(CourseIdx, BlockIdx), u32> = HashMap::new();
    for rule in &timetable.placement_rules {
        let PlacementRule::Required {
            section,
            course,
            block,
        } = *rule
        else {
            continue;
        };
        let described = timetable.describe_rule(rule);
        if forbidden.contains(&(course, block)) {
            return Err(TimetableError::Configuration(format!(
                "{} conflicts with forbidden {} in {}",
                described, timetable.courses[course].name, timetable.blocks[block].label
            )));
        }
        if section == 0 || section > timetable.courses[course].sections {
            return Err(TimetableError::Configuration(format!(
                "{} but the course offers {} sections",
                described, timetable.courses[course].sections
            )));
        }
        if let Some(&other) = section_blocks.get(&(section, course)) {
            if other != block {
                return Err(TimetableError::Configuration(format!(
                    "{} but it is also required in {}",
                    described, timetable.blocks[other].label
                )));
            }
        }
        if let Some(&other) = block_sections.get(&(course, block)) {
            if other != section {
                return Err(TimetableError::Configuration(format!(
                    "{} but section {} is also required there",
                    described, other
                )));
            }
        }
        section_blocks.insert((section, course), block);
        block_sections.insert((course, block), section);
    }
    Ok(())
}

/// Rejects frozen placements that could never be part of a valid timetable.
pub fn validate_frozen(timetable: &Timetable, frozen: &[SectionPlacement]) -> Result<()> {
    let mut sections = HashSet::new();
    let mut blocks = HashSet::new();
    for placement in frozen {
        let record = format!("frozen placement {:?}", placement);
        let Some(c) = timetable.courses.get(placement.course) else {
            return Err(TimetableError::data_integrity(record, "course out of range"));
        };
        if placement.block >= timetable.blocks.len() {
            return Err(TimetableError::data_integrity(record, "block out of range"));
        }
        if placement.section == 0 || placement.section > c.sections {
            return Err(TimetableError::data_integrity(
                record,
                format!("{} offers {} sections", c.name, c.sections),
            ));
        }
        if !sections.insert((placement.course, placement.section)) {
            return Err(TimetableError::data_integrity(
                record,
                format!("{} section {} is placed twice", c.name, placement.section),
            ));
        }
        if !blocks.insert((placement.course, placement.block)) {
            return Err(TimetableError::data_integrity(
                record,
                format!(
                    "two sections of {} share {}",
                    c.name, timetable.blocks[placement.block].label
                ),
            ));
        }
        for rule in &timetable.placement_rules {
            let clash = match *rule {
                PlacementRule::Forbidden { course, block } => {
                    course == placement.course && block == placement.block
                }
                PlacementRule::Required {
                    section,
                    course,
                    block,
                } => {
                    course == placement.course
                        && (section == placement.section) != (block == placement.block)
                }
            };
            if clash {
                return Err(TimetableError::Configuration(format!(
                    "{} section {} in {} contradicts {}",
                    c.name,
                    placement.section,
                    timetable.blocks[placement.block].label,
                    timetable.describe_rule(rule)
                )));
            }
        }
    }
    Ok(())
}

/// Reads placements and enrollments out of a full variable assignment.
pub fn decode(model: &Model, values: &[bool]) -> (Vec<SectionPlacement>, Vec<Enrollment>) {
    let mut placements = Vec::new();
    let mut enrollments = Vec::new();
    for (key, _) in model.keys().iter().zip(values).filter(|(_, on)| **on) {
        match *key {
            VarKey::Placement {
                section,
                course,
                block,
            } => placements.push(SectionPlacement {
                section,
                course,
                block,
            }),
            VarKey::Enrollment {
                student,
                course,
                block,
            } => enrollments.push(Enrollment {
                student,
                course,
                block,
            }),
        }
    }
    placements.sort();
    enrollments.sort();
    (placements, enrollments)
}

/// Builds the variable assignment that corresponds to a known solution.
pub fn encode(model: &Model, placements: &[SectionPlacement], enrollments: &[Enrollment]) -> Vec<bool> {
    let mut values = vec![false; model.num_vars()];
    let keys = placements
        .iter()
        .map(|p| VarKey::Placement {
            section: p.section,
            course: p.course,
            block: p.block,
        })
        .chain(enrollments.iter().map(|e| VarKey::Enrollment {
            student: e.student,
            course: e.course,
            block: e.block,
        }));
    for key in keys {
        if let Some(id) = model.lookup(&key) {
            values[id.0] = true;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DepartmentCeiling, ExclusionTarget, Rule, TimetableConfig};
    use crate::data::{CourseRecord, Records, RequestRecord, RoomRecord};
    use crate::domain::build;

    fn course(name: &str, sections: u32, teachers: &str) -> CourseRecord {
        CourseRecord {
            department: "Maths".to_string(),
            course: name.to_string(),
            code: None,
            sections,
            teachers: Some(teachers.to_string()),
            rooms: Some("Room 1".to_string()),
            placement: None,
        }
    }

    fn request(student: u32, course: &str, weight: u32) -> RequestRecord {
        RequestRecord {
            student_id: student,
            grade: 10,
            course: course.to_string(),
            course_code: None,
            preference_rank: None,
            iep: false,
            gender: None,
            weight: Some(weight),
        }
    }

    fn small_config() -> TimetableConfig {
        let mut config = TimetableConfig::default();
        config.blocks.truncate(3);
        config
    }

    fn records() -> Records {
        Records {
            courses: vec![course("Math", 2, "Ng"), course("Gym", 1, "Ng")],
            rooms: vec![RoomRecord {
                room: "Room 1".into(),
                capacity: 5,
            }],
            teachers: vec!["Ng".into()],
            requests: vec![request(1, "Math", 10), request(1, "Gym", 0), request(2, "Math", 10)],
        }
    }

    #[test]
    fn variable_counts_follow_requests() {
        let t = build(&records(), &small_config()).unwrap();
        let model = compile(&t, &[]).unwrap();
        // 2 courses * 3 slots * 3 blocks placements, 3 requests * 3 blocks enrollments
        assert_eq!(model.num_vars(), 18 + 9);
        assert_eq!(model.count(Family::SectionCardinality), 6);
        assert_eq!(model.count(Family::TeacherExclusivity), 3);
        assert_eq!(model.count(Family::RoomExclusivity), 3);
        assert_eq!(model.count(Family::PreferenceGate), 3);
        assert_eq!(model.count(Family::SectionBalance), 3);
    }

    #[test]
    fn objective_only_weights_positive_preferences() {
        let t = build(&records(), &small_config()).unwrap();
        let model = compile(&t, &[]).unwrap();
        assert_eq!(model.objective().terms.len(), 6);
        assert!(model.objective().terms.iter().all(|(_, w)| *w == 10.0));
    }

    #[test]
    fn hand_built_solution_is_feasible() {
        let t = build(&records(), &small_config()).unwrap();
        let math = t.course_index("Math").unwrap();
        let gym = t.course_index("Gym").unwrap();
        let model = compile(&t, &[]).unwrap();
        let placements = [
            SectionPlacement { section: 1, course: gym, block: 0 },
            SectionPlacement { section: 1, course: math, block: 1 },
            SectionPlacement { section: 2, course: math, block: 2 },
        ];
        let enrollments = [
            Enrollment { student: 0, course: math, block: 1 },
            Enrollment { student: 1, course: math, block: 2 },
        ];
        let values = encode(&model, &placements, &enrollments);
        assert!(model.violations(&values).is_empty());
        assert_eq!(model.objective().evaluate(&values), 20.0);

        let (p, e) = decode(&model, &values);
        assert_eq!(p.len(), 3);
        assert_eq!(e, enrollments.to_vec());
    }

    #[test]
    fn shared_block_violates_teacher_and_room() {
        let t = build(&records(), &small_config()).unwrap();
        let math = t.course_index("Math").unwrap();
        let gym = t.course_index("Gym").unwrap();
        let model = compile(&t, &[]).unwrap();
        let placements = [
            SectionPlacement { section: 1, course: gym, block: 0 },
            SectionPlacement { section: 1, course: math, block: 0 },
            SectionPlacement { section: 2, course: math, block: 2 },
        ];
        let values = encode(&model, &placements, &[]);
        let families: Vec<Family> = model.violations(&values).iter().map(|c| c.family).collect();
        assert!(families.contains(&Family::TeacherExclusivity));
        assert!(families.contains(&Family::RoomExclusivity));
    }

    #[test]
    fn required_and_forbidden_same_block_is_a_configuration_error() {
        let mut config = small_config();
        config.rules.push(Rule::RequiredPlacement {
            course: "Gym".into(),
            section: 1,
            block: "1C".into(),
        });
        config.rules.push(Rule::BlockExclusion {
            target: crate::config::ExclusionTarget::Course("Gym".into()),
            blocks: vec!["1C".into()],
        });
        let t = build(&records(), &config).unwrap();
        let err = compile(&t, &[]).unwrap_err();
        assert!(matches!(err, TimetableError::Configuration(ref m) if m.contains("Gym")));
    }

    #[test]
    fn required_section_beyond_count_is_rejected() {
        let mut config = small_config();
        config.rules.push(Rule::RequiredPlacement {
            course: "Gym".into(),
            section: 2,
            block: "1A".into(),
        });
        let t = build(&records(), &config).unwrap();
        assert!(matches!(validate_rules(&t), Err(TimetableError::Configuration(_))));
    }

    #[test]
    fn frozen_placements_are_fixed() {
        let t = build(&records(), &small_config()).unwrap();
        let math = t.course_index("Math").unwrap();
        let frozen = [SectionPlacement { section: 1, course: math, block: 2 }];
        let model = compile(&t, &frozen).unwrap();
        assert_eq!(model.count(Family::Freeze), 1);

        let bad = [SectionPlacement { section: 9, course: math, block: 2 }];
        assert!(matches!(compile(&t, &bad), Err(TimetableError::DataIntegrity { .. })));
    }

    #[test]
    fn frozen_section_beyond_course_count_is_rejected() {
        let t = build(&records(), &small_config()).unwrap();
        let gym = t.course_index("Gym").unwrap();
        // within the section slots, but Gym only offers one section
        let stale = [SectionPlacement { section: 2, course: gym, block: 1 }];
        assert!(matches!(
            compile(&t, &stale),
            Err(TimetableError::DataIntegrity { ref reason, .. }) if reason.contains("1 sections")
        ));
    }

    #[test]
    fn frozen_duplicates_are_rejected() {
        let t = build(&records(), &small_config()).unwrap();
        let math = t.course_index("Math").unwrap();
        let same_section = [
            SectionPlacement { section: 1, course: math, block: 0 },
            SectionPlacement { section: 1, course: math, block: 1 },
        ];
        assert!(matches!(
            compile(&t, &same_section),
            Err(TimetableError::DataIntegrity { .. })
        ));
        let same_block = [
            SectionPlacement { section: 1, course: math, block: 0 },
            SectionPlacement { section: 2, course: math, block: 0 },
        ];
        assert!(matches!(
            compile(&t, &same_block),
            Err(TimetableError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn frozen_placement_against_rules_is_a_configuration_error() {
        let mut config = small_config();
        config.rules.push(Rule::BlockExclusion {
            target: ExclusionTarget::Course("Gym".into()),
            blocks: vec!["1B".into()],
        });
        config.rules.push(Rule::RequiredPlacement {
            course: "Math".into(),
            section: 1,
            block: "1A".into(),
        });
        let t = build(&records(), &config).unwrap();
        let math = t.course_index("Math").unwrap();
        let gym = t.course_index("Gym").unwrap();

        let forbidden = [SectionPlacement { section: 1, course: gym, block: 1 }];
        assert!(matches!(
            compile(&t, &forbidden),
            Err(TimetableError::Configuration(ref m)) if m.contains("forbidden Gym in 1B")
        ));
        let moved = [SectionPlacement { section: 1, course: math, block: 2 }];
        assert!(matches!(compile(&t, &moved), Err(TimetableError::Configuration(_))));
        let displaced = [SectionPlacement { section: 2, course: math, block: 0 }];
        assert!(matches!(compile(&t, &displaced), Err(TimetableError::Configuration(_))));

        let agrees = [SectionPlacement { section: 1, course: math, block: 0 }];
        assert!(compile(&t, &agrees).is_ok());
    }

    fn general(name: &str) -> CourseRecord {
        CourseRecord {
            rooms: Some("General".into()),
            ..course(name, 1, "ANY")
        }
    }

    #[test]
    fn department_ceiling_limits_sections_per_block() {
        let mut config = small_config();
        config.department_ceiling = Some(DepartmentCeiling {
            departments: vec!["Maths".into()],
            max_per_block: 1,
        });
        let records = Records {
            courses: vec![general("Algebra"), general("Geometry"), general("Statistics")],
            ..Records::default()
        };
        let t = build(&records, &config).unwrap();
        let model = compile(&t, &[]).unwrap();
        assert_eq!(model.count(Family::DepartmentCeiling), 3);

        let idx = |name: &str| t.course_index(name).unwrap();
        let crowded = [
            SectionPlacement { section: 1, course: idx("Algebra"), block: 0 },
            SectionPlacement { section: 1, course: idx("Geometry"), block: 0 },
            SectionPlacement { section: 1, course: idx("Statistics"), block: 2 },
        ];
        let families: Vec<Family> = model
            .violations(&encode(&model, &crowded, &[]))
            .iter()
            .map(|c| c.family)
            .collect();
        assert_eq!(families, vec![Family::DepartmentCeiling]);

        let spread = [
            SectionPlacement { section: 1, course: idx("Algebra"), block: 0 },
            SectionPlacement { section: 1, course: idx("Geometry"), block: 1 },
            SectionPlacement { section: 1, course: idx("Statistics"), block: 2 },
        ];
        assert!(model.violations(&encode(&model, &spread, &[])).is_empty());
    }

    #[test]
    fn colocation_keeps_excluded_courses_out_of_the_shared_block() {
        let mut config = small_config();
        config.rules.push(Rule::Colocation {
            courses: vec!["Calculus".into(), "AP Calculus".into()],
            excluded: vec!["Statistics".into()],
        });
        let records = Records {
            courses: vec![general("Calculus"), general("AP Calculus"), general("Statistics")],
            ..Records::default()
        };
        let t = build(&records, &config).unwrap();
        let model = compile(&t, &[]).unwrap();
        let idx = |name: &str| t.course_index(name).unwrap();
        let place = |course: &str, block| SectionPlacement { section: 1, course: idx(course), block };

        let together = [place("Calculus", 1), place("AP Calculus", 1), place("Statistics", 1)];
        let families: Vec<Family> = model
            .violations(&encode(&model, &together, &[]))
            .iter()
            .map(|c| c.family)
            .collect();
        assert!(!families.is_empty());
        assert!(families.iter().all(|f| *f == Family::Colocation));

        let apart = [place("Calculus", 1), place("AP Calculus", 2), place("Statistics", 0)];
        assert!(
            model
                .violations(&encode(&model, &apart, &[]))
                .iter()
                .any(|c| c.family == Family::Colocation)
        );

        let valid = [place("Calculus", 1), place("AP Calculus", 1), place("Statistics", 0)];
        assert!(model.violations(&encode(&model, &valid, &[])).is_empty());
    }

    #[test]
    fn compile_is_repeatable() {
        let t = build(&records(), &small_config()).unwrap();
        let a = compile(&t, &[]).unwrap();
        let b = compile(&t, &[]).unwrap();
        assert_eq!(a.keys(), b.keys());
        assert_eq!(a.constraints(), b.constraints());
    }
}
