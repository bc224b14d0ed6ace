use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// Type aliases for clarity
pub type CourseIdx = usize;
pub type StudentIdx = usize;
pub type TeacherIdx = usize;
pub type BlockIdx = usize;
pub type SectionNo = u32;
pub type StudentId = u32;

/// One row of the course catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub department: String,
    pub course: String,
    #[serde(default)]
    pub code: Option<String>,
    pub sections: u32,
    /// Single name, comma-joined co-teachers, slash-joined alternatives or a sentinel.
    #[serde(default)]
    pub teachers: Option<String>,
    /// Single room, comma-joined shared rooms or slash-joined alternatives.
    #[serde(default)]
    pub rooms: Option<String>,
    /// Placement code such as `1A`, `1A/2A` or `2C/2D/2E`.
    #[serde(default)]
    pub placement: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub room: String,
    pub capacity: u32,
}

/// One student-course request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub student_id: StudentId,
    pub grade: u8,
    pub course: String,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub preference_rank: Option<u32>,
    #[serde(default)]
    pub iep: bool,
    #[serde(default)]
    pub gender: Option<String>,
    /// Explicit preference weight, overriding every configured weight rule.
    #[serde(default)]
    pub weight: Option<u32>,
}

/// The complete raw input for one run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Records {
    pub courses: Vec<CourseRecord>,
    #[serde(default)]
    pub rooms: Vec<RoomRecord>,
    #[serde(default)]
    pub teachers: Vec<String>,
    pub requests: Vec<RequestRecord>,
}

/// A prior placement expressed with names, as supplied by a caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRecord {
    pub course: String,
    pub section: SectionNo,
    pub block: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub label: String,
    /// Which half of the cycle the block belongs to.
    pub day: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomSpec {
    Absent,
    Single(String),
    Shared(Vec<String>),
    Alternatives(Vec<String>),
}

impl RoomSpec {
    pub fn options(&self) -> Vec<String> {
        match self {
            RoomSpec::Absent => Vec::new(),
            RoomSpec::Single(room) => vec![room.clone()],
            RoomSpec::Shared(rooms) => vec![rooms.join(", ")],
            RoomSpec::Alternatives(rooms) => rooms.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeacherSpec {
    Unassigned,
    /// Every listed teacher is required for every section.
    Exclusive(Vec<TeacherIdx>),
    /// Any one of the listed teachers may take the course.
    Alternatives(Vec<TeacherIdx>),
}

#[derive(Debug, Clone)]
pub struct Course {
    pub name: String,
    pub code: Option<String>,
    pub department: String,
    pub sections: u32,
    /// Per-block enrollment ceiling. Zero means nobody can be enrolled.
    pub capacity: u32,
    pub rooms: RoomSpec,
    /// Room specification exactly as written; identical strings share a room class.
    pub room_options: String,
    pub teachers: TeacherSpec,
    pub teacher_text: String,
    /// Students who requested the course, in student index order.
    pub requested_by: Vec<StudentIdx>,
    pub accommodation_requests: usize,
    /// Largest share of total requests any one block may hold.
    pub section_balance: Option<f64>,
    /// Largest share of accommodation-flagged requests any one block may hold.
    pub accommodation_balance: Option<f64>,
}

impl Course {
    pub fn request_total(&self) -> usize {
        self.requested_by.len()
    }

    pub fn is_scheduled(&self) -> bool {
        self.sections > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Gender {
    Female,
    Male,
    Unspecified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseRequest {
    pub course: CourseIdx,
    pub weight: u32,
    pub iep: bool,
    pub code: Option<String>,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: StudentId,
    pub grade: u8,
    pub gender: Gender,
    /// Requests in the order they were submitted.
    pub requests: Vec<CourseRequest>,
}

impl Student {
    pub fn request(&self, course: CourseIdx) -> Option<&CourseRequest> {
        self.requests.iter().find(|r| r.course == course)
    }

    pub fn weight(&self, course: CourseIdx) -> u32 {
        self.request(course).map_or(0, |r| r.weight)
    }
}

#[derive(Debug, Clone)]
pub struct Teacher {
    pub name: String,
    /// Courses this teacher is the required instructor for.
    pub exclusive_courses: Vec<CourseIdx>,
}

/// Courses written against the same single or shared room; at most one runs per block.
#[derive(Debug, Clone)]
pub struct RoomClass {
    pub options: String,
    pub courses: Vec<CourseIdx>,
}

#[derive(Debug, Clone)]
pub struct Department {
    pub name: String,
    pub courses: Vec<CourseIdx>,
    /// Ceiling on sections per block, when the department is room-limited.
    pub max_per_block: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlacementRule {
    Forbidden {
        course: CourseIdx,
        block: BlockIdx,
    },
    Required {
        section: SectionNo,
        course: CourseIdx,
        block: BlockIdx,
    },
}

#[derive(Debug, Clone)]
pub struct Colocation {
    pub courses: Vec<CourseIdx>,
    pub excluded: Vec<CourseIdx>,
}

#[derive(Debug, Clone)]
pub struct SameDayExclusion {
    pub courses: Vec<CourseIdx>,
    pub exempt: Vec<StudentIdx>,
}

#[derive(Debug, Clone)]
pub struct AggregateCapacity {
    pub courses: Vec<CourseIdx>,
    /// Ceiling on combined enrollment per block.
    pub max_per_block: u32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct SectionPlacement {
    pub section: SectionNo,
    pub course: CourseIdx,
    pub block: BlockIdx,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub student: StudentIdx,
    pub course: CourseIdx,
    pub block: BlockIdx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveStatus {
    Optimal,
    Feasible,
}

/// One accepted solved state. Replaced wholesale between search iterations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub placements: Vec<SectionPlacement>,
    pub enrollments: Vec<Enrollment>,
    pub objective: i64,
    pub status: SolveStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRow {
    pub course: String,
    pub section: SectionNo,
    pub block: String,
    pub enrollment: usize,
    pub capacity: u32,
    pub room_options: Vec<String>,
    pub teachers: String,
}

/// Where a requested course landed for a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignedBlock {
    Block(String),
    /// The course has no sections this cycle.
    NotScheduled,
    /// Requested and offered but not enrolled. Diagnostic only.
    Unassigned,
}

impl fmt::Display for AssignedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignedBlock::Block(label) => write!(f, "{}", label),
            AssignedBlock::NotScheduled => write!(f, "Not Scheduled"),
            AssignedBlock::Unassigned => write!(f, "Unassigned"),
        }
    }
}

impl Serialize for AssignedBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub student_id: StudentId,
    pub grade: u8,
    pub course_title: String,
    pub course_code: Option<String>,
    pub preference_rank: Option<u32>,
    pub block: AssignedBlock,
}
