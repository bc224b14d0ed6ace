use crate::config::{ExclusionTarget, Rule, TimetableConfig, resolve_balance};
use crate::data::{
    AggregateCapacity, Block, BlockIdx, Colocation, Course, CourseIdx, CourseRecord,
    CourseRequest, Department, Gender, PlacementRecord, PlacementRule, Records, RequestRecord,
    RoomClass, RoomSpec, SameDayExclusion, SectionNo, SectionPlacement, Student, StudentId,
    StudentIdx, Teacher, TeacherIdx, TeacherSpec,
};
use crate::error::{Result, TimetableError};
use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Canonical entities plus derived lookup tables for one run.
#[derive(Debug, Clone)]
pub struct Timetable {
    pub blocks: Vec<Block>,
    pub courses: Vec<Course>,
    pub students: Vec<Student>,
    pub teachers: Vec<Teacher>,
    pub room_classes: Vec<RoomClass>,
    pub departments: Vec<Department>,
    pub placement_rules: Vec<PlacementRule>,
    pub colocations: Vec<Colocation>,
    pub same_day_exclusions: Vec<SameDayExclusion>,
    pub aggregate_capacities: Vec<AggregateCapacity>,
    /// Courses whose accommodation-flagged share of requests meets the threshold.
    pub accommodation_courses: Vec<CourseIdx>,
    pub grades: BTreeMap<u8, Vec<StudentIdx>>,
    course_index: HashMap<String, CourseIdx>,
    student_index: HashMap<StudentId, StudentIdx>,
}

impl Timetable {
    pub fn course_index(&self, name: &str) -> Option<CourseIdx> {
        self.course_index.get(name).copied()
    }

    pub fn student_index(&self, id: StudentId) -> Option<StudentIdx> {
        self.student_index.get(&id).copied()
    }

    pub fn block_index(&self, label: &str) -> Option<BlockIdx> {
        self.blocks.iter().position(|b| b.label == label)
    }

    /// Section numbers available to any course. A course can never run more sections than blocks.
    pub fn section_slots(&self) -> SectionNo {
        self.blocks.len() as SectionNo
    }

    pub fn blocks_on_day(&self, day: u8) -> Vec<BlockIdx> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.day == day)
            .map(|(k, _)| k)
            .collect()
    }

    pub fn days(&self) -> Vec<u8> {
        self.blocks.iter().map(|b| b.day).sorted().dedup().collect()
    }

    /// Students whose request for `course` carries the accommodation flag.
    pub fn accommodation_students(&self, course: CourseIdx) -> Vec<StudentIdx> {
        self.courses[course]
            .requested_by
            .iter()
            .copied()
            .filter(|&i| self.students[i].request(course).is_some_and(|r| r.iep))
            .collect()
    }

    pub fn resolve_placement(&self, record: &PlacementRecord) -> Result<SectionPlacement> {
        let course = self.course_index(&record.course).ok_or_else(|| {
            TimetableError::data_integrity(
                format!("placement {}/{}", record.course, record.section),
                format!("unknown course '{}'", record.course),
            )
        })?;
        let block = self.block_index(&record.block).ok_or_else(|| {
            TimetableError::data_integrity(
                format!("placement {}/{}", record.course, record.section),
                format!("unknown block '{}'", record.block),
            )
        })?;
        let offered = self.courses[course].sections;
        if record.section == 0 || record.section > offered {
            return Err(TimetableError::data_integrity(
                format!("placement {}/{}", record.course, record.section),
                format!("the course offers {} sections", offered),
            ));
        }
        Ok(SectionPlacement {
            section: record.section,
            course,
            block,
        })
    }

    pub fn describe_rule(&self, rule: &PlacementRule) -> String {
        match *rule {
            PlacementRule::Forbidden { course, block } => format!(
                "forbidden {} in {}",
                self.courses[course].name, self.blocks[block].label
            ),
            PlacementRule::Required {
                section,
                course,
                block,
            } => format!(
                "required {} section {} in {}",
                self.courses[course].name, section, self.blocks[block].label
            ),
        }
    }
}

/// Builds the canonical timetable, failing on the first unresolved reference.
pub fn build(records: &Records, config: &TimetableConfig) -> Result<Timetable> {
    validate_blocks(&config.blocks)?;

    let rooms = room_table(records, config)?;
    let teacher_names: Vec<String> = records
        .teachers
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .sorted()
        .dedup()
        .collect();
    let teacher_lookup: HashMap<&str, TeacherIdx> = teacher_names
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    // courses
    let course_records: Vec<&CourseRecord> = records
        .courses
        .iter()
        .sorted_by(|a, b| a.course.cmp(&b.course))
        .collect();
    if let Some((a, _)) = course_records
        .iter()
        .tuple_windows()
        .find(|(a, b)| a.course == b.course)
    {
        return Err(TimetableError::data_integrity(
            format!("course {}", a.course),
            "duplicate course row",
        ));
    }
    let mut courses = Vec::with_capacity(course_records.len());
    for record in &course_records {
        courses.push(parse_course(record, &rooms, &teacher_lookup, config)?);
    }
    let course_index: HashMap<String, CourseIdx> = courses
        .iter()
        .enumerate()
        .map(|(j, c)| (c.name.clone(), j))
        .collect();
    let lookup_course = |name: &str, record: &str| -> Result<CourseIdx> {
        course_index.get(name).copied().ok_or_else(|| {
            TimetableError::data_integrity(record, format!("unknown course '{}'", name))
        })
    };

    let mut extra_exclusive: Vec<(TeacherIdx, CourseIdx)> = Vec::new();
    for o in &config.course_overrides {
        let record = format!("course override {}", o.course);
        let j = lookup_course(&o.course, &record)?;
        if let Some(sections) = o.sections {
            courses[j].sections = sections;
        }
        if let Some(capacity) = o.capacity {
            courses[j].capacity = capacity;
        }
        for name in &o.exclusive_teachers {
            extra_exclusive.push((resolve_teacher(name, &teacher_lookup, &record)?, j));
        }
    }
    for course in &courses {
        if course.sections as usize > config.blocks.len() {
            return Err(TimetableError::data_integrity(
                format!("course {}", course.name),
                format!(
                    "{} sections cannot fit in {} blocks",
                    course.sections,
                    config.blocks.len()
                ),
            ));
        }
        if course.is_scheduled() && course.capacity == 0 {
            warn!(
                "Course '{}' has {} sections but no room capacity; nobody can enroll until it is overridden.",
                course.name, course.sections
            );
        }
    }

    // students
    let by_student = records
        .requests
        .iter()
        .map(|r| (r.student_id, r))
        .into_group_map();
    let mut students = Vec::with_capacity(by_student.len());
    for id in by_student.keys().copied().sorted() {
        students.push(parse_student(
            id,
            &by_student[&id],
            &course_index,
            &courses,
            config,
        )?);
    }
    let student_index: HashMap<StudentId, StudentIdx> = students
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id, i))
        .collect();

    for (i, student) in students.iter().enumerate() {
        for request in &student.requests {
            let course = &mut courses[request.course];
            course.requested_by.push(i);
            if request.iep {
                course.accommodation_requests += 1;
            }
        }
    }

    let mut accommodation_courses = Vec::new();
    for (j, course) in courses.iter_mut().enumerate() {
        course.section_balance = resolve_balance(&config.section_balance, &course.name, course.sections);
        let total = course.request_total();
        if total > 0
            && course.accommodation_requests as f64 / total as f64 >= config.accommodation_threshold
        {
            accommodation_courses.push(j);
            course.accommodation_balance =
                resolve_balance(&config.accommodation_balance, &course.name, course.sections);
        }
    }

    let teachers = exclusive_teachers(&teacher_names, &courses, &extra_exclusive);
    let room_classes = room_classes(&courses, config);
    let departments = departments(&courses, config, &lookup_course)?;

    let mut placement_rules = Vec::new();
    for (j, record) in course_records.iter().enumerate() {
        if let Some(code) = record.placement.as_deref() {
            placement_rules.extend(parse_placement_code(code, j, &record.course, config)?);
        }
    }

    let mut colocations = Vec::new();
    let mut same_day_exclusions = Vec::new();
    let mut aggregate_capacities = Vec::new();
    for rule in &config.rules {
        let record = format!("rule {:?}", rule);
        let resolve_all = |names: &[String]| -> Result<Vec<CourseIdx>> {
            names.iter().map(|n| lookup_course(n, &record)).collect()
        };
        match rule {
            Rule::BlockExclusion { target, blocks } => {
                let targets = match target {
                    ExclusionTarget::Course(name) => vec![lookup_course(name, &record)?],
                    ExclusionTarget::Teacher(name) => {
                        let t = resolve_teacher(name, &teacher_lookup, &record)?;
                        teachers[t].exclusive_courses.clone()
                    }
                };
                for label in blocks {
                    let block = resolve_block(label, config, &record)?;
                    placement_rules
                        .extend(targets.iter().map(|&course| PlacementRule::Forbidden { course, block }));
                }
            }
            Rule::RequiredPlacement {
                course,
                section,
                block,
            } => placement_rules.push(PlacementRule::Required {
                section: *section,
                course: lookup_course(course, &record)?,
                block: resolve_block(block, config, &record)?,
            }),
            Rule::Colocation { courses, excluded } => colocations.push(Colocation {
                courses: resolve_all(courses)?,
                excluded: resolve_all(excluded)?,
            }),
            Rule::SameDayExclusion {
                courses,
                exempt_students,
            } => {
                let exempt = exempt_students
                    .iter()
                    .map(|id| {
                        student_index.get(id).copied().ok_or_else(|| {
                            TimetableError::data_integrity(&record, format!("unknown student {}", id))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                same_day_exclusions.push(SameDayExclusion {
                    courses: resolve_all(courses)?,
                    exempt,
                });
            }
            Rule::AggregateCapacity {
                courses,
                max_per_block,
            } => aggregate_capacities.push(AggregateCapacity {
                courses: resolve_all(courses)?,
                max_per_block: *max_per_block,
            }),
        }
    }
    placement_rules.sort();
    placement_rules.dedup();

    let grades: BTreeMap<u8, Vec<StudentIdx>> = students
        .iter()
        .enumerate()
        .map(|(i, s)| (s.grade, i))
        .into_group_map()
        .into_iter()
        .collect();

    info!(
        "Built timetable with {} courses, {} students, {} teachers, {} blocks and {} placement rules.",
        courses.len(),
        students.len(),
        teachers.len(),
        config.blocks.len(),
        placement_rules.len()
    );
    debug!(
        "{} accommodation-balanced courses, {} shared room classes.",
        accommodation_courses.len(),
        room_classes.len()
    );

    Ok(Timetable {
        blocks: config.blocks.clone(),
        courses,
        students,
        teachers,
        room_classes,
        departments,
        placement_rules,
        colocations,
        same_day_exclusions,
        aggregate_capacities,
        accommodation_courses,
        grades,
        course_index,
        student_index,
    })
}

fn validate_blocks(blocks: &[Block]) -> Result<()> {
    if blocks.is_empty() {
        return Err(TimetableError::Configuration("no blocks configured".to_string()));
    }
    let mut seen = HashSet::new();
    for block in blocks {
        if !seen.insert(block.label.as_str()) {
            return Err(TimetableError::Configuration(format!(
                "block '{}' is configured twice",
                block.label
            )));
        }
    }
    Ok(())
}

fn room_table(records: &Records, config: &TimetableConfig) -> Result<HashMap<String, u32>> {
    let mut rooms = HashMap::new();
    for row in &records.rooms {
        let name = row.room.trim().to_string();
        if rooms.insert(name.clone(), row.capacity).is_some() {
            return Err(TimetableError::data_integrity(
                format!("room {}", name),
                "duplicate room row",
            ));
        }
    }
    rooms
        .entry(config.general_room.name.clone())
        .or_insert(config.general_room.capacity);
    Ok(rooms)
}

fn resolve_teacher(name: &str, lookup: &HashMap<&str, TeacherIdx>, record: &str) -> Result<TeacherIdx> {
    lookup.get(name.trim()).copied().ok_or_else(|| {
        TimetableError::data_integrity(record, format!("unknown teacher '{}'", name.trim()))
    })
}

fn resolve_block(label: &str, config: &TimetableConfig, record: &str) -> Result<BlockIdx> {
    config.block_index(label.trim()).ok_or_else(|| {
        TimetableError::data_integrity(record, format!("unknown block '{}'", label.trim()))
    })
}

fn parse_course(
    record: &CourseRecord,
    rooms: &HashMap<String, u32>,
    teachers: &HashMap<&str, TeacherIdx>,
    config: &TimetableConfig,
) -> Result<Course> {
    let context = format!("course {}", record.course);
    let teacher_text = record.teachers.as_deref().unwrap_or("").trim().to_string();
    let teacher_spec = parse_teachers(&teacher_text, teachers, config, &context)?;
    let room_options = record.rooms.as_deref().unwrap_or("").trim().to_string();
    let room_spec = parse_rooms(&room_options);
    let capacity = room_capacity(&room_options, &room_spec, rooms, config, &context)?;

    Ok(Course {
        name: record.course.clone(),
        code: record.code.clone(),
        department: record.department.trim().to_string(),
        sections: record.sections,
        capacity,
        rooms: room_spec,
        room_options,
        teachers: teacher_spec,
        teacher_text,
        requested_by: Vec::new(),
        accommodation_requests: 0,
        section_balance: None,
        accommodation_balance: None,
    })
}

fn parse_teachers(
    text: &str,
    teachers: &HashMap<&str, TeacherIdx>,
    config: &TimetableConfig,
    context: &str,
) -> Result<TeacherSpec> {
    let is_sentinel = |t: &str| config.unassigned_teacher_tokens.iter().any(|s| s == t);
    if text.is_empty() || is_sentinel(text) {
        return Ok(TeacherSpec::Unassigned);
    }
    if text.contains('/') {
        let options = text
            .split('/')
            .map(str::trim)
            .filter(|t| !t.is_empty() && !is_sentinel(t))
            .map(|t| resolve_teacher(t, teachers, context))
            .collect::<Result<Vec<_>>>()?;
        return Ok(TeacherSpec::Alternatives(options));
    }
    let required = text
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty() && !is_sentinel(t))
        .map(|t| resolve_teacher(t, teachers, context))
        .collect::<Result<Vec<_>>>()?;
    if required.is_empty() {
        return Ok(TeacherSpec::Unassigned);
    }
    Ok(TeacherSpec::Exclusive(required))
}

fn parse_rooms(text: &str) -> RoomSpec {
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        RoomSpec::Absent
    } else if text.contains('/') {
        RoomSpec::Alternatives(text.split('/').map(|r| r.trim().to_string()).collect())
    } else if text.contains(',') {
        RoomSpec::Shared(text.split(',').map(|r| r.trim().to_string()).collect())
    } else {
        RoomSpec::Single(text.to_string())
    }
}

/// Exact room match, then shared rooms, then the largest alternative.
fn room_capacity(
    text: &str,
    spec: &RoomSpec,
    rooms: &HashMap<String, u32>,
    config: &TimetableConfig,
    context: &str,
) -> Result<u32> {
    let lookup = |room: &str| {
        rooms.get(room).copied().ok_or_else(|| {
            TimetableError::data_integrity(context, format!("unknown room '{}'", room))
        })
    };
    match spec {
        RoomSpec::Absent => Ok(0),
        RoomSpec::Single(room) => lookup(room),
        RoomSpec::Shared(parts) => {
            for part in parts {
                lookup(part)?;
            }
            Ok(rooms.get(text).copied().unwrap_or(config.shared_room_capacity))
        }
        RoomSpec::Alternatives(options) => {
            if let Some(&exact) = rooms.get(text) {
                return Ok(exact);
            }
            let mut best = 0;
            for option in options {
                best = best.max(lookup(option)?);
            }
            Ok(best)
        }
    }
}

fn parse_student(
    id: StudentId,
    rows: &[&RequestRecord],
    course_index: &HashMap<String, CourseIdx>,
    courses: &[Course],
    config: &TimetableConfig,
) -> Result<Student> {
    let grade = rows[0].grade;
    let gender = match rows[0].gender.as_deref().map(str::trim) {
        Some("Male") => Gender::Male,
        Some("Female") => Gender::Female,
        other => {
            debug!("Student {} has unrecognised gender {:?}.", id, other);
            Gender::Unspecified
        }
    };
    let prefs = &config.preferences;
    let ranked = prefs.ranked_students.contains(&id);

    let mut requests: Vec<CourseRequest> = Vec::with_capacity(rows.len());
    for row in rows {
        let context = format!("request student {} course {}", id, row.course);
        if row.grade != grade {
            return Err(TimetableError::data_integrity(
                context,
                format!("grade {} conflicts with earlier grade {}", row.grade, grade),
            ));
        }
        let course = course_index.get(&row.course).copied().ok_or_else(|| {
            TimetableError::data_integrity(&context, format!("unknown course '{}'", row.course))
        })?;
        if requests.iter().any(|r| r.course == course) {
            warn!("Ignoring duplicate {}.", context);
            continue;
        }

        let rank = requests.len() as u32;
        let mut weight = if ranked {
            prefs.ranked_base.saturating_sub(rank).max(1)
        } else {
            prefs
                .grade_weights
                .get(&grade)
                .copied()
                .unwrap_or(prefs.default_weight)
        };
        if let Some(&w) = prefs.course_weights.get(&row.course) {
            if weight > 0 {
                weight = w;
            }
        }
        if let Some(explicit) = row.weight {
            weight = explicit;
        }
        if !courses[course].is_scheduled() {
            weight = 0;
        }

        requests.push(CourseRequest {
            course,
            weight,
            iep: row.iep,
            code: row.course_code.clone(),
            rank: row.preference_rank,
        });
    }

    Ok(Student {
        id,
        grade,
        gender,
        requests,
    })
}

fn exclusive_teachers(
    names: &[String],
    courses: &[Course],
    extra: &[(TeacherIdx, CourseIdx)],
) -> Vec<Teacher> {
    let mut sets: Vec<BTreeSet<CourseIdx>> = vec![BTreeSet::new(); names.len()];
    for (j, course) in courses.iter().enumerate() {
        if let TeacherSpec::Exclusive(required) = &course.teachers {
            for &t in required {
                sets[t].insert(j);
            }
        }
    }
    for &(t, j) in extra {
        sets[t].insert(j);
    }
    names
        .iter()
        .zip(sets)
        .map(|(name, set)| Teacher {
            name: name.clone(),
            exclusive_courses: set.into_iter().collect(),
        })
        .collect()
}

fn room_classes(courses: &[Course], config: &TimetableConfig) -> Vec<RoomClass> {
    courses
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            matches!(c.rooms, RoomSpec::Single(_) | RoomSpec::Shared(_))
                && c.room_options != config.general_room.name
        })
        .map(|(j, c)| (c.room_options.clone(), j))
        .into_group_map()
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(options, members)| RoomClass {
            options,
            courses: members,
        })
        .sorted_by(|a, b| a.options.cmp(&b.options))
        .collect()
}

fn departments(
    courses: &[Course],
    config: &TimetableConfig,
    lookup_course: &dyn Fn(&str, &str) -> Result<CourseIdx>,
) -> Result<Vec<Department>> {
    let mut membership: Vec<String> = courses.iter().map(|c| c.department.clone()).collect();
    for (course, department) in &config.department_overrides {
        let j = lookup_course(course, &format!("department override {}", course))?;
        membership[j] = department.clone();
    }
    let ceiling = config.department_ceiling.as_ref();
    Ok(membership
        .into_iter()
        .enumerate()
        .map(|(j, d)| (d, j))
        .into_group_map()
        .into_iter()
        .map(|(name, courses)| Department {
            max_per_block: ceiling
                .filter(|c| c.departments.contains(&name))
                .map(|c| c.max_per_block),
            name,
            courses,
        })
        .sorted_by(|a, b| a.name.cmp(&b.name))
        .collect())
}

/// A single label pins section 1 there; a slash-joined set forbids every other block.
fn parse_placement_code(
    code: &str,
    course: CourseIdx,
    course_name: &str,
    config: &TimetableConfig,
) -> Result<Vec<PlacementRule>> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(Vec::new());
    }
    let context = format!("course {}", course_name);
    let allowed = code
        .split('/')
        .map(|token| {
            config.block_index(token.trim()).ok_or_else(|| {
                TimetableError::data_integrity(
                    &context,
                    format!("unknown placement code token '{}'", token.trim()),
                )
            })
        })
        .collect::<Result<Vec<BlockIdx>>>()?;
    if let [block] = allowed.as_slice() {
        return Ok(vec![PlacementRule::Required {
            section: 1,
            course,
            block: *block,
        }]);
    }
    Ok((0..config.blocks.len())
        .filter(|k| !allowed.contains(k))
        .map(|block| PlacementRule::Forbidden { course, block })
        .collect())
}
