//! Loading admission rounds from JSON documents or a pair of CSV exports.

mod parser;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::admission::{AdmissionData, DataError, RawAdmissionData, SchoolId, StudentId};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Data(DataError),
    InvalidSeats {
        school: SchoolId,
        value: String,
        line: u64,
    },
    MissingIdentifier {
        line: u64,
    },
    DuplicateStudent(StudentId),
    DuplicateSchool(SchoolId),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read admission data: {}", err),
            ImportError::Csv(err) => write!(f, "invalid admission CSV data: {}", err),
            ImportError::Json(err) => write!(f, "invalid admission JSON data: {}", err),
            ImportError::Data(err) => write!(f, "inconsistent admission data: {}", err),
            ImportError::InvalidSeats {
                school,
                value,
                line,
            } => write!(
                f,
                "line {}: school {} has invalid seat count '{}'",
                line, school, value
            ),
            ImportError::MissingIdentifier { line } => {
                write!(f, "line {}: row has no identifier", line)
            }
            ImportError::DuplicateStudent(student) => {
                write!(f, "student {} appears on more than one row", student)
            }
            ImportError::DuplicateSchool(school) => {
                write!(f, "school {} appears on more than one row", school)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::Json(err) => Some(err),
            ImportError::Data(err) => Some(err),
            ImportError::InvalidSeats { .. }
            | ImportError::MissingIdentifier { .. }
            | ImportError::DuplicateStudent(_)
            | ImportError::DuplicateSchool(_) => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<DataError> for ImportError {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

pub struct AdmissionImporter;

impl AdmissionImporter {
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<AdmissionData, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(file)
    }

    /// Reads `{"applications": ..., "exams": ..., "seats": ...}`. Syntax errors surface as
    /// [`ImportError::Json`], referential inconsistencies as [`ImportError::Data`].
    pub fn from_json_reader<R: Read>(reader: R) -> Result<AdmissionData, ImportError> {
        let raw: RawAdmissionData = serde_json::from_reader(reader)?;
        let data = AdmissionData::try_from(raw)?;
        info!(
            students = data.num_students(),
            schools = data.num_schools(),
            "loaded admission data from JSON"
        );
        Ok(data)
    }

    pub fn from_csv_paths<A: AsRef<Path>, E: AsRef<Path>>(
        applications: A,
        exams: E,
    ) -> Result<AdmissionData, ImportError> {
        let applications = std::fs::File::open(applications)?;
        let exams = std::fs::File::open(exams)?;
        Self::from_csv_readers(applications, exams)
    }

    pub fn from_csv_readers<A: Read, E: Read>(
        applications: A,
        exams: E,
    ) -> Result<AdmissionData, ImportError> {
        let mut preferences = BTreeMap::new();
        for record in parser::parse_applications(applications)? {
            if preferences.contains_key(&record.student) {
                return Err(ImportError::DuplicateStudent(record.student));
            }
            preferences.insert(record.student, record.preferences);
        }

        let mut rankings = BTreeMap::new();
        let mut seats = BTreeMap::new();
        for record in parser::parse_exams(exams)? {
            if seats.contains_key(&record.school) {
                return Err(ImportError::DuplicateSchool(record.school));
            }
            seats.insert(record.school.clone(), record.seats);
            rankings.insert(record.school, record.ranking);
        }

        let data = AdmissionData::new(preferences, rankings, seats)?;
        info!(
            students = data.num_students(),
            schools = data.num_schools(),
            "loaded admission data from CSV"
        );
        Ok(data)
    }
}
