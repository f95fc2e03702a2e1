use std::io::Read;

use super::ImportError;
use crate::admission::{SchoolId, StudentId};

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ApplicationRecord {
    pub(crate) student: StudentId,
    pub(crate) preferences: Vec<SchoolId>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ExamRecord {
    pub(crate) school: SchoolId,
    pub(crate) seats: usize,
    pub(crate) ranking: Vec<StudentId>,
}

fn reader_for<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|position| position.line()).unwrap_or(0)
}

/// Rows of `student,choice_1,choice_2,...`; blank trailing cells are ignored.
pub(crate) fn parse_applications<R: Read>(
    reader: R,
) -> Result<Vec<ApplicationRecord>, ImportError> {
    let mut records = Vec::new();
    for row in reader_for(reader).records() {
        let row = row?;
        let mut fields = row.iter();
        let student = match fields.next() {
            Some(id) if !id.is_empty() => StudentId::from(id),
            _ => return Err(ImportError::MissingIdentifier { line: line_of(&row) }),
        };
        let preferences = fields
            .filter(|field| !field.is_empty())
            .map(SchoolId::from)
            .collect();
        records.push(ApplicationRecord {
            student,
            preferences,
        });
    }
    Ok(records)
}

/// Rows of `school,seats,student_1,student_2,...` with students best-first.
pub(crate) fn parse_exams<R: Read>(reader: R) -> Result<Vec<ExamRecord>, ImportError> {
    let mut records = Vec::new();
    for row in reader_for(reader).records() {
        let row = row?;
        let line = line_of(&row);
        let mut fields = row.iter();
        let school = match fields.next() {
            Some(id) if !id.is_empty() => SchoolId::from(id),
            _ => return Err(ImportError::MissingIdentifier { line }),
        };
        let raw_seats = fields.next().unwrap_or_default();
        let seats = raw_seats
            .parse::<usize>()
            .map_err(|_| ImportError::InvalidSeats {
                school: school.clone(),
                value: raw_seats.to_string(),
                line,
            })?;
        let ranking = fields
            .filter(|field| !field.is_empty())
            .map(StudentId::from)
            .collect();
        records.push(ExamRecord {
            school,
            seats,
            ranking,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_ragged_application_rows() {
        let csv = "student,choice_1,choice_2,choice_3\n\
                   Adam, 2 ,3,1\n\
                   Eva,1\n\
                   Karel,,\n";
        let records = parse_applications(Cursor::new(csv)).expect("parse applications");

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].student, StudentId::from("Adam"));
        assert_eq!(
            records[0].preferences,
            vec![SchoolId::from(2), SchoolId::from(3), SchoolId::from(1)]
        );
        assert_eq!(records[1].preferences, vec![SchoolId::from(1)]);
        assert!(records[2].preferences.is_empty());
    }

    #[test]
    fn reads_exam_rows_with_capacity() {
        let csv = "school,seats,rank_1,rank_2\nA,2,3,1\nB,0\n";
        let records = parse_exams(Cursor::new(csv)).expect("parse exams");

        assert_eq!(
            records,
            vec![
                ExamRecord {
                    school: SchoolId::from('A'),
                    seats: 2,
                    ranking: vec![StudentId::from(3), StudentId::from(1)],
                },
                ExamRecord {
                    school: SchoolId::from('B'),
                    seats: 0,
                    ranking: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_seats() {
        let csv = "school,seats\nA,many\n";
        let err = parse_exams(Cursor::new(csv)).expect_err("seats must be numeric");
        match err {
            ImportError::InvalidSeats {
                school,
                value,
                line,
            } => {
                assert_eq!(school, SchoolId::from('A'));
                assert_eq!(value, "many");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_rows_without_identifier() {
        let csv = "student,choice_1\n,A\n";
        let err = parse_applications(Cursor::new(csv)).expect_err("identifier required");
        assert!(matches!(err, ImportError::MissingIdentifier { line: 2 }));
    }
}
