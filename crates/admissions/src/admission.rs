use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(#[serde(deserialize_with = "identifier_from_raw")] pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<char> for $name {
            fn from(value: char) -> Self {
                Self(value.to_string())
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value.to_string())
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value.to_string())
            }
        }
    };
}

/// Identifiers arrive either as JSON strings or integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

fn identifier_from_raw<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

identifier!(
    /// Identifier wrapper for an applicant.
    StudentId
);

identifier!(
    /// Identifier wrapper for a school (or a study programme at a school).
    SchoolId
);

/// Immutable admission round input: preference lists, exam rankings, and capacities.
///
/// Construction validates the referential invariants between the three maps, so every
/// mechanism can index into them without further checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAdmissionData")]
pub struct AdmissionData {
    applications: BTreeMap<StudentId, Vec<SchoolId>>,
    exams: BTreeMap<SchoolId, Vec<StudentId>>,
    seats: BTreeMap<SchoolId, usize>,
    #[serde(skip)]
    exam_ranks: BTreeMap<SchoolId, HashMap<StudentId, usize>>,
    #[serde(skip)]
    preference_ranks: BTreeMap<StudentId, HashMap<SchoolId, usize>>,
}

/// Unvalidated wire shape of [`AdmissionData`].
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAdmissionData {
    pub(crate) applications: BTreeMap<StudentId, Vec<SchoolId>>,
    pub(crate) exams: BTreeMap<SchoolId, Vec<StudentId>>,
    pub(crate) seats: BTreeMap<SchoolId, usize>,
}

impl TryFrom<RawAdmissionData> for AdmissionData {
    type Error = DataError;

    fn try_from(raw: RawAdmissionData) -> Result<Self, Self::Error> {
        Self::new(raw.applications, raw.exams, raw.seats)
    }
}

impl AdmissionData {
    pub fn new(
        applications: BTreeMap<StudentId, Vec<SchoolId>>,
        exams: BTreeMap<SchoolId, Vec<StudentId>>,
        seats: BTreeMap<SchoolId, usize>,
    ) -> Result<Self, DataError> {
        for school in exams.keys() {
            if !seats.contains_key(school) {
                return Err(DataError::MissingSeats {
                    school: school.clone(),
                });
            }
        }
        for school in seats.keys() {
            if !exams.contains_key(school) {
                return Err(DataError::MissingExams {
                    school: school.clone(),
                });
            }
        }

        let mut preference_ranks = BTreeMap::new();
        for (student, preferences) in &applications {
            let mut ranks = HashMap::with_capacity(preferences.len());
            for (rank, school) in preferences.iter().enumerate() {
                if !seats.contains_key(school) {
                    return Err(DataError::UnknownSchool {
                        student: student.clone(),
                        school: school.clone(),
                    });
                }
                if ranks.insert(school.clone(), rank).is_some() {
                    return Err(DataError::DuplicatePreference {
                        student: student.clone(),
                        school: school.clone(),
                    });
                }
            }
            if preferences.is_empty() {
                debug!(student = %student, "student submitted an empty preference list");
            }
            preference_ranks.insert(student.clone(), ranks);
        }

        let mut exam_ranks = BTreeMap::new();
        for (school, ranking) in &exams {
            let mut ranks = HashMap::with_capacity(ranking.len());
            for (rank, student) in ranking.iter().enumerate() {
                let Some(preferences) = preference_ranks.get(student) else {
                    return Err(DataError::UnknownStudent {
                        school: school.clone(),
                        student: student.clone(),
                    });
                };
                if !preferences.contains_key(school) {
                    return Err(DataError::UnrequestedRanking {
                        school: school.clone(),
                        student: student.clone(),
                    });
                }
                if ranks.insert(student.clone(), rank).is_some() {
                    return Err(DataError::DuplicateRanking {
                        school: school.clone(),
                        student: student.clone(),
                    });
                }
            }
            exam_ranks.insert(school.clone(), ranks);
        }

        for (student, preferences) in &applications {
            for school in preferences {
                let ranked = exam_ranks
                    .get(school)
                    .map(|ranks| ranks.contains_key(student))
                    .unwrap_or(false);
                if !ranked {
                    return Err(DataError::UnrankedApplicant {
                        school: school.clone(),
                        student: student.clone(),
                    });
                }
            }
        }

        for (school, capacity) in &seats {
            if *capacity == 0 {
                debug!(school = %school, "school offers no seats");
            }
        }

        Ok(Self {
            applications,
            exams,
            seats,
            exam_ranks,
            preference_ranks,
        })
    }

    pub fn builder() -> AdmissionDataBuilder {
        AdmissionDataBuilder::default()
    }

    /// Student preference lists, best-first.
    pub fn applications(&self) -> &BTreeMap<StudentId, Vec<SchoolId>> {
        &self.applications
    }

    /// School applicant rankings (exam results), best-first.
    pub fn exams(&self) -> &BTreeMap<SchoolId, Vec<StudentId>> {
        &self.exams
    }

    pub fn seats(&self) -> &BTreeMap<SchoolId, usize> {
        &self.seats
    }

    pub fn students(&self) -> impl Iterator<Item = &StudentId> + '_ {
        self.applications.keys()
    }

    pub fn schools(&self) -> impl Iterator<Item = &SchoolId> + '_ {
        self.seats.keys()
    }

    pub fn num_students(&self) -> usize {
        self.applications.len()
    }

    pub fn num_schools(&self) -> usize {
        self.seats.len()
    }

    pub fn preferences(&self, student: &StudentId) -> &[SchoolId] {
        self.applications
            .get(student)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn ranking(&self, school: &SchoolId) -> &[StudentId] {
        self.exams.get(school).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn capacity(&self, school: &SchoolId) -> usize {
        self.seats.get(school).copied().unwrap_or(0)
    }

    /// Position of `student` in the exam ranking of `school`; lower is better.
    pub fn exam_rank(&self, school: &SchoolId, student: &StudentId) -> Option<usize> {
        self.exam_ranks
            .get(school)
            .and_then(|ranks| ranks.get(student))
            .copied()
    }

    /// Position of `school` on the application of `student`; lower is better.
    pub fn preference_rank(&self, student: &StudentId, school: &SchoolId) -> Option<usize> {
        self.preference_ranks
            .get(student)
            .and_then(|ranks| ranks.get(school))
            .copied()
    }

    /// Length of the longest preference list.
    pub fn max_preferences(&self) -> usize {
        self.applications.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn total_seats(&self) -> usize {
        self.seats.values().sum()
    }
}

/// Incremental constructor used by importers, fixtures, and the demo datasets.
#[derive(Debug, Default, Clone)]
pub struct AdmissionDataBuilder {
    applications: BTreeMap<StudentId, Vec<SchoolId>>,
    exams: BTreeMap<SchoolId, Vec<StudentId>>,
    seats: BTreeMap<SchoolId, usize>,
}

impl AdmissionDataBuilder {
    pub fn student<I, S>(mut self, id: impl Into<StudentId>, preferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SchoolId>,
    {
        self.applications
            .insert(id.into(), preferences.into_iter().map(Into::into).collect());
        self
    }

    pub fn school<I, S>(mut self, id: impl Into<SchoolId>, seats: usize, ranking: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StudentId>,
    {
        let id = id.into();
        self.seats.insert(id.clone(), seats);
        self.exams
            .insert(id, ranking.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<AdmissionData, DataError> {
        AdmissionData::new(self.applications, self.exams, self.seats)
    }
}

/// Referential inconsistencies between applications, exams, and seats.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("student {student} applied to unknown school {school}")]
    UnknownSchool { student: StudentId, school: SchoolId },
    #[error("school {school} has exam results but no seat capacity")]
    MissingSeats { school: SchoolId },
    #[error("school {school} has a seat capacity but no exam results")]
    MissingExams { school: SchoolId },
    #[error("school {school} ranks unknown student {student}")]
    UnknownStudent { school: SchoolId, student: StudentId },
    #[error("student {student} lists school {school} more than once")]
    DuplicatePreference { student: StudentId, school: SchoolId },
    #[error("school {school} ranks student {student} more than once")]
    DuplicateRanking { school: SchoolId, student: StudentId },
    #[error("student {student} applied to school {school} but is missing from its ranking")]
    UnrankedApplicant { school: SchoolId, student: StudentId },
    #[error("school {school} ranks student {student} who did not apply there")]
    UnrequestedRanking { school: SchoolId, student: StudentId },
}
