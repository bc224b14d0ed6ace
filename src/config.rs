use crate::data::{Block, SectionNo, StudentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimetableConfig {
    pub blocks: Vec<Block>,
    pub general_room: RoomDefault,
    /// Capacity for comma-joined shared rooms.
    pub shared_room_capacity: u32,
    /// Teacher strings meaning "no specific teacher".
    pub unassigned_teacher_tokens: Vec<String>,
    pub preferences: PreferenceConfig,
    /// Share of accommodation-flagged requests at which a course is balanced for them.
    pub accommodation_threshold: f64,
    pub accommodation_balance: Vec<BalanceRule>,
    pub section_balance: Vec<BalanceRule>,
    pub department_ceiling: Option<DepartmentCeiling>,
    /// Reassigns a course to another department for the block ceiling.
    pub department_overrides: BTreeMap<String, String>,
    pub course_overrides: Vec<CourseOverride>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDefault {
    pub name: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferenceConfig {
    pub grade_weights: BTreeMap<u8, u32>,
    pub default_weight: u32,
    /// Students whose requests are weighted by rank instead of grade.
    pub ranked_students: Vec<StudentId>,
    pub ranked_base: u32,
    /// Replaces any non-zero weight for the named course.
    pub course_weights: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum CourseSelector {
    All,
    NameContains(String),
    Course(String),
}

impl CourseSelector {
    pub fn matches(&self, course: &str) -> bool {
        match self {
            CourseSelector::All => true,
            CourseSelector::NameContains(text) => course.contains(text.as_str()),
            CourseSelector::Course(name) => course == name,
        }
    }

    fn specificity(&self) -> u8 {
        match self {
            CourseSelector::All => 0,
            CourseSelector::NameContains(_) => 1,
            CourseSelector::Course(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRule {
    pub selector: CourseSelector,
    pub section_count: u32,
    pub max_fraction: f64,
}

impl BalanceRule {
    pub fn new(selector: CourseSelector, section_count: u32, max_fraction: f64) -> Self {
        BalanceRule {
            selector,
            section_count,
            max_fraction,
        }
    }
}

/// Picks the most specific rule matching the course name and section count.
pub fn resolve_balance(rules: &[BalanceRule], course: &str, sections: u32) -> Option<f64> {
    rules
        .iter()
        .filter(|r| r.section_count == sections && r.selector.matches(course))
        .max_by_key(|r| r.selector.specificity())
        .map(|r| r.max_fraction)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCeiling {
    pub departments: Vec<String>,
    pub max_per_block: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseOverride {
    pub course: String,
    pub sections: Option<u32>,
    pub capacity: Option<u32>,
    pub exclusive_teachers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "name")]
pub enum ExclusionTarget {
    Course(String),
    /// Every course the teacher is required for.
    Teacher(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Rule {
    #[serde(rename_all = "camelCase")]
    BlockExclusion {
        target: ExclusionTarget,
        blocks: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    RequiredPlacement {
        course: String,
        section: SectionNo,
        block: String,
    },
    /// The first section of every listed course shares a block; excluded courses avoid it.
    #[serde(rename_all = "camelCase")]
    Colocation {
        courses: Vec<String>,
        #[serde(default)]
        excluded: Vec<String>,
    },
    /// A student takes at most one of the courses per day.
    #[serde(rename_all = "camelCase")]
    SameDayExclusion {
        courses: Vec<String>,
        #[serde(default)]
        exempt_students: Vec<StudentId>,
    },
    #[serde(rename_all = "camelCase")]
    AggregateCapacity {
        courses: Vec<String>,
        max_per_block: u32,
    },
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        PreferenceConfig {
            grade_weights: BTreeMap::from([(8, 20), (9, 30), (10, 40), (11, 50), (12, 60)]),
            default_weight: 10,
            ranked_students: Vec::new(),
            ranked_base: 10,
            course_weights: BTreeMap::new(),
        }
    }
}

impl Default for TimetableConfig {
    fn default() -> Self {
        let blocks = ["1A", "1B", "1C", "1D", "2A", "2B", "2C", "2D", "2E"]
            .iter()
            .map(|label| Block {
                label: label.to_string(),
                day: if label.starts_with('1') { 1 } else { 2 },
            })
            .collect();
        let all = |n, f| BalanceRule::new(CourseSelector::All, n, f);
        TimetableConfig {
            blocks,
            general_room: RoomDefault {
                name: "General".to_string(),
                capacity: 22,
            },
            shared_room_capacity: 24,
            unassigned_teacher_tokens: vec![
                "ANY".to_string(),
                "PESTAFF".to_string(),
                "Do not schedule".to_string(),
            ],
            preferences: PreferenceConfig::default(),
            accommodation_threshold: 0.15,
            accommodation_balance: vec![all(2, 0.60), all(3, 0.40), all(4, 0.31), all(5, 0.25)],
            section_balance: vec![all(2, 0.54), all(3, 0.36), all(4, 0.265), all(5, 0.22)],
            department_ceiling: None,
            department_overrides: BTreeMap::new(),
            course_overrides: Vec::new(),
            rules: Vec::new(),
        }
    }
}

impl TimetableConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn block_index(&self, label: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.label == label)
    }

    pub fn days(&self) -> Vec<u8> {
        let mut days: Vec<u8> = self.blocks.iter().map(|b| b.day).collect();
        days.sort_unstable();
        days.dedup();
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cycle_has_nine_blocks_over_two_days() {
        let config = TimetableConfig::default();
        assert_eq!(config.blocks.len(), 9);
        assert_eq!(config.days(), vec![1, 2]);
        assert_eq!(config.block_index("2A"), Some(4));
    }

    #[test]
    fn most_specific_balance_rule_wins() {
        let mut rules = TimetableConfig::default().section_balance;
        rules.push(BalanceRule::new(CourseSelector::NameContains("8.".into()), 3, 0.4));
        rules.push(BalanceRule::new(CourseSelector::Course("Guided Study".into()), 5, 0.4));

        assert_eq!(resolve_balance(&rules, "English 10", 3), Some(0.36));
        assert_eq!(resolve_balance(&rules, "Science 8.", 3), Some(0.4));
        assert_eq!(resolve_balance(&rules, "Guided Study", 5), Some(0.4));
        assert_eq!(resolve_balance(&rules, "English 10", 1), None);
    }

    #[test]
    fn rules_parse_from_json() {
        let config = TimetableConfig::from_json(
            r#"{
                "rules": [
                    {"kind": "blockExclusion", "target": {"kind": "teacher", "name": "Pope"}, "blocks": ["2A"]},
                    {"kind": "sameDayExclusion", "courses": ["Study", "Study2"], "exemptStudents": [155]},
                    {"kind": "aggregateCapacity", "courses": ["Study"], "maxPerBlock": 30}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.rules.len(), 3);
        assert_eq!(config.blocks.len(), 9);
        assert_eq!(
            config.rules[0],
            Rule::BlockExclusion {
                target: ExclusionTarget::Teacher("Pope".into()),
                blocks: vec!["2A".into()],
            }
        );
    }
}
