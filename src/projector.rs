use crate::data::{
    AssignedBlock, Assignment, BlockIdx, CourseIdx, Gender, SectionRow, StudentIdx, StudentId,
    StudentRow,
};
use crate::domain::Timetable;
use itertools::Itertools;
use log::warn;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Views {
    pub sections: Vec<SectionRow>,
    pub students: Vec<StudentRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCount {
    pub block: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBalance {
    pub course: String,
    pub sections: u32,
    pub requested: usize,
    pub enrolled: Vec<BlockCount>,
    pub unenrolled: usize,
    /// Largest minus smallest section enrollment.
    pub spread: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationSplit {
    pub course: String,
    pub sections: u32,
    pub flagged_requests: usize,
    pub enrolled: Vec<BlockCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentLoad {
    pub department: String,
    pub block: String,
    pub sections: usize,
    pub ceiling: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSatisfaction {
    pub grade: u8,
    pub requests: usize,
    pub assigned: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedRequest {
    pub student_id: StudentId,
    pub grade: u8,
    pub course: String,
    pub offered_in: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLoad {
    pub block: String,
    pub sections: usize,
    pub students_by_grade: BTreeMap<u8, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderSplit {
    pub course: String,
    pub block: String,
    pub female: usize,
    pub male: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub section_balance: Vec<SectionBalance>,
    pub accommodation: Vec<AccommodationSplit>,
    pub department_load: Vec<DepartmentLoad>,
    pub satisfaction: Vec<GradeSatisfaction>,
    pub missed: Vec<MissedRequest>,
    pub block_load: Vec<BlockLoad>,
    pub gender_split: Vec<GenderSplit>,
}

/// Enrolled students per (course, block).
struct Rosters(HashMap<(CourseIdx, BlockIdx), Vec<StudentIdx>>);

impl Rosters {
    fn new(assignment: &Assignment) -> Self {
        Rosters(
            assignment
                .enrollments
                .iter()
                .map(|e| ((e.course, e.block), e.student))
                .into_group_map(),
        )
    }

    fn get(&self, course: CourseIdx, block: BlockIdx) -> &[StudentIdx] {
        self.0.get(&(course, block)).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn offered_blocks(assignment: &Assignment, course: CourseIdx) -> Vec<BlockIdx> {
    assignment
        .placements
        .iter()
        .filter(|p| p.course == course)
        .sorted_by_key(|p| p.section)
        .map(|p| p.block)
        .collect()
}

pub fn project(timetable: &Timetable, assignment: &Assignment) -> Views {
    let rosters = Rosters::new(assignment);

    let sections = assignment
        .placements
        .iter()
        .sorted_by_key(|p| (p.course, p.section))
        .map(|p| {
            let course = &timetable.courses[p.course];
            SectionRow {
                course: course.name.clone(),
                section: p.section,
                block: timetable.blocks[p.block].label.clone(),
                enrollment: rosters.get(p.course, p.block).len(),
                capacity: course.capacity,
                room_options: course.rooms.options(),
                teachers: course.teacher_text.clone(),
            }
        })
        .collect();

    let placed: HashMap<(StudentIdx, CourseIdx), BlockIdx> = assignment
        .enrollments
        .iter()
        .map(|e| ((e.student, e.course), e.block))
        .collect();
    let mut students = Vec::new();
    for (i, student) in timetable.students.iter().enumerate() {
        for request in &student.requests {
            let course = &timetable.courses[request.course];
            let block = if !course.is_scheduled() {
                AssignedBlock::NotScheduled
            } else {
                match placed.get(&(i, request.course)) {
                    Some(&k) => AssignedBlock::Block(timetable.blocks[k].label.clone()),
                    None => AssignedBlock::Unassigned,
                }
            };
            students.push(StudentRow {
                student_id: student.id,
                grade: student.grade,
                course_title: course.name.clone(),
                course_code: request.code.clone(),
                preference_rank: request.rank,
                block,
            });
        }
    }

    Views { sections, students }
}

pub fn audit(timetable: &Timetable, assignment: &Assignment) -> Audit {
    let rosters = Rosters::new(assignment);
    let label = |k: BlockIdx| timetable.blocks[k].label.clone();

    let section_balance = timetable
        .courses
        .iter()
        .enumerate()
        .filter(|(_, c)| c.sections > 1)
        .map(|(j, c)| {
            let counts: Vec<usize> = offered_blocks(assignment, j)
                .into_iter()
                .map(|k| rosters.get(j, k).len())
                .collect();
            let enrolled_total: usize = counts.iter().sum();
            let spread = match counts.iter().minmax().into_option() {
                Some((lo, hi)) => hi - lo,
                None => 0,
            };
            SectionBalance {
                course: c.name.clone(),
                sections: c.sections,
                requested: c.request_total(),
                enrolled: offered_blocks(assignment, j)
                    .into_iter()
                    .zip(counts)
                    .map(|(k, count)| BlockCount {
                        block: label(k),
                        count,
                    })
                    .collect(),
                unenrolled: c.request_total().saturating_sub(enrolled_total),
                spread,
            }
        })
        .collect();

    let accommodation = timetable
        .accommodation_courses
        .iter()
        .map(|&j| {
            let c = &timetable.courses[j];
            let flagged: HashSet<StudentIdx> =
                timetable.accommodation_students(j).into_iter().collect();
            AccommodationSplit {
                course: c.name.clone(),
                sections: c.sections,
                flagged_requests: flagged.len(),
                enrolled: offered_blocks(assignment, j)
                    .into_iter()
                    .map(|k| BlockCount {
                        block: label(k),
                        count: rosters
                            .get(j, k)
                            .iter()
                            .filter(|&&i| flagged.contains(&i))
                            .count(),
                    })
                    .collect(),
            }
        })
        .collect();

    let mut department_load = Vec::new();
    for department in &timetable.departments {
        let members: HashSet<CourseIdx> = department.courses.iter().copied().collect();
        for k in 0..timetable.blocks.len() {
            let sections = assignment
                .placements
                .iter()
                .filter(|p| p.block == k && members.contains(&p.course))
                .count();
            if let Some(ceiling) = department.max_per_block {
                if sections > ceiling as usize {
                    warn!(
                        "Department {} has {} sections in block {}, above its ceiling of {}.",
                        department.name,
                        sections,
                        label(k),
                        ceiling
                    );
                }
            }
            department_load.push(DepartmentLoad {
                department: department.name.clone(),
                block: label(k),
                sections,
                ceiling: department.max_per_block,
            });
        }
    }

    let enrolled: HashSet<(StudentIdx, CourseIdx)> = assignment
        .enrollments
        .iter()
        .map(|e| (e.student, e.course))
        .collect();
    let mut satisfaction = Vec::new();
    let mut missed = Vec::new();
    for (&grade, members) in &timetable.grades {
        let mut requests = 0;
        let mut assigned = 0;
        for &i in members {
            let student = &timetable.students[i];
            for request in student.requests.iter().filter(|r| r.weight > 0) {
                requests += 1;
                if enrolled.contains(&(i, request.course)) {
                    assigned += 1;
                } else {
                    missed.push(MissedRequest {
                        student_id: student.id,
                        grade,
                        course: timetable.courses[request.course].name.clone(),
                        offered_in: offered_blocks(assignment, request.course)
                            .into_iter()
                            .map(label)
                            .collect(),
                    });
                }
            }
        }
        let percent = if requests == 0 {
            100.0
        } else {
            (10000.0 * assigned as f64 / requests as f64).round() / 100.0
        };
        satisfaction.push(GradeSatisfaction {
            grade,
            requests,
            assigned,
            percent,
        });
    }
    if !missed.is_empty() {
        warn!("{} weighted requests were not assigned.", missed.len());
    }

    let block_load = (0..timetable.blocks.len())
        .map(|k| {
            let mut students_by_grade = BTreeMap::new();
            for e in assignment.enrollments.iter().filter(|e| e.block == k) {
                *students_by_grade
                    .entry(timetable.students[e.student].grade)
                    .or_insert(0) += 1;
            }
            BlockLoad {
                block: label(k),
                sections: assignment.placements.iter().filter(|p| p.block == k).count(),
                students_by_grade,
            }
        })
        .collect();

    let mut gender_split = Vec::new();
    for (j, c) in timetable.courses.iter().enumerate().filter(|(_, c)| c.sections > 1) {
        for k in offered_blocks(assignment, j) {
            let roster = rosters.get(j, k);
            let count = |g: Gender| {
                roster
                    .iter()
                    .filter(|&&i| timetable.students[i].gender == g)
                    .count()
            };
            gender_split.push(GenderSplit {
                course: c.name.clone(),
                block: label(k),
                female: count(Gender::Female),
                male: count(Gender::Male),
            });
        }
    }

    Audit {
        section_balance,
        accommodation,
        department_load,
        satisfaction,
        missed,
        block_load,
        gender_split,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimetableConfig;
    use crate::data::{CourseRecord, Enrollment, Records, RequestRecord, SectionPlacement, SolveStatus};
    use crate::domain::build;

    fn course(name: &str, sections: u32) -> CourseRecord {
        CourseRecord {
            department: "Science".into(),
            course: name.into(),
            code: None,
            sections,
            teachers: None,
            rooms: Some("General".into()),
            placement: None,
        }
    }

    fn request(student: u32, grade: u8, course: &str, gender: &str) -> RequestRecord {
        RequestRecord {
            student_id: student,
            grade,
            course: course.into(),
            course_code: Some(format!("{}-code", course)),
            preference_rank: Some(1),
            iep: student == 2,
            gender: Some(gender.into()),
            weight: None,
        }
    }

    fn fixture() -> (Timetable, Assignment) {
        let records = Records {
            courses: vec![course("Biology", 2), course("Chemistry", 1), course("Choir", 0)],
            rooms: Vec::new(),
            teachers: Vec::new(),
            requests: vec![
                request(1, 11, "Biology", "Female"),
                request(1, 11, "Chemistry", "Female"),
                request(2, 11, "Biology", "Male"),
                request(2, 11, "Choir", "Male"),
                request(3, 12, "Biology", "Male"),
            ],
        };
        let t = build(&records, &TimetableConfig::default()).unwrap();
        let bio = t.course_index("Biology").unwrap();
        let chem = t.course_index("Chemistry").unwrap();
        let assignment = Assignment {
            placements: vec![
                SectionPlacement { section: 1, course: bio, block: 0 },
                SectionPlacement { section: 2, course: bio, block: 4 },
                SectionPlacement { section: 1, course: chem, block: 1 },
            ],
            enrollments: vec![
                Enrollment { student: 0, course: bio, block: 0 },
                Enrollment { student: 1, course: bio, block: 4 },
                Enrollment { student: 2, course: bio, block: 4 },
            ],
            objective: 150,
            status: SolveStatus::Optimal,
        };
        (t, assignment)
    }

    #[test]
    fn section_rows_count_enrollment() {
        let (t, a) = fixture();
        let views = project(&t, &a);
        assert_eq!(views.sections.len(), 3);
        let bio2 = &views.sections[1];
        assert_eq!((bio2.course.as_str(), bio2.section, bio2.block.as_str()), ("Biology", 2, "2A"));
        assert_eq!(bio2.enrollment, 2);
        assert_eq!(bio2.capacity, 22);
        assert_eq!(bio2.room_options, vec!["General".to_string()]);
    }

    #[test]
    fn student_rows_distinguish_sentinels() {
        let (t, a) = fixture();
        let views = project(&t, &a);
        let block_of = |id: StudentId, course: &str| {
            views
                .students
                .iter()
                .find(|r| r.student_id == id && r.course_title == course)
                .map(|r| r.block.to_string())
                .unwrap()
        };
        assert_eq!(block_of(1, "Biology"), "1A");
        assert_eq!(block_of(1, "Chemistry"), "Unassigned");
        assert_eq!(block_of(2, "Choir"), "Not Scheduled");
        assert_eq!(views.students.len(), 5);
        assert_eq!(views.students[0].course_code.as_deref(), Some("Biology-code"));
    }

    #[test]
    fn projection_is_idempotent() {
        let (t, a) = fixture();
        assert_eq!(project(&t, &a), project(&t, &a));
        assert_eq!(audit(&t, &a), audit(&t, &a));
    }

    #[test]
    fn audit_reports_balance_and_satisfaction() {
        let (t, a) = fixture();
        let report = audit(&t, &a);

        let bio = &report.section_balance[0];
        assert_eq!(bio.course, "Biology");
        assert_eq!(bio.spread, 1);
        assert_eq!(bio.unenrolled, 0);

        // grade 11: Biology x2 and Chemistry weighted, Choir is not scheduled
        let g11 = report.satisfaction.iter().find(|s| s.grade == 11).unwrap();
        assert_eq!((g11.requests, g11.assigned), (3, 2));
        assert_eq!(g11.percent, 66.67);
        assert_eq!(report.missed.len(), 1);
        assert_eq!(report.missed[0].offered_in, vec!["1B".to_string()]);

        let acc = &report.accommodation[0];
        assert_eq!(acc.course, "Biology");
        assert_eq!(acc.enrolled.iter().map(|b| b.count).collect::<Vec<_>>(), vec![0, 1]);

        let split: Vec<(usize, usize)> =
            report.gender_split.iter().map(|g| (g.female, g.male)).collect();
        assert_eq!(split, vec![(1, 0), (0, 2)]);

        let science_2a = report
            .department_load
            .iter()
            .find(|d| d.department == "Science" && d.block == "2A")
            .unwrap();
        assert_eq!(science_2a.sections, 1);
        assert_eq!(report.block_load[4].students_by_grade[&11], 1);
        assert_eq!(report.block_load[4].students_by_grade[&12], 1);
    }
}
