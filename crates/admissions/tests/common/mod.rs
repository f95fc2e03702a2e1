#![allow(dead_code)]

use std::collections::BTreeSet;

use admissions::{AdmissionData, Allocation, SchoolId, StudentId};

/// Four students in a preference cycle; the naive mechanism leaves justified envy.
pub fn cyclic_conflict() -> AdmissionData {
    AdmissionData::builder()
        .student(1, "ABC".chars())
        .student(2, "ABD".chars())
        .student(3, "ACD".chars())
        .student(4, "BCD".chars())
        .school('A', 1, [1, 2, 3])
        .school('B', 1, [1, 2, 4])
        .school('C', 1, [1, 3, 4])
        .school('D', 1, [2, 3, 4])
        .build()
        .expect("consistent data")
}

/// Student- and school-optimal stable matchings differ.
pub fn crossed_preferences() -> AdmissionData {
    AdmissionData::builder()
        .student(1, "ABC".chars())
        .student(2, "BAC".chars())
        .student(3, "ABC".chars())
        .school('A', 1, [2, 1, 3])
        .school('B', 1, [1, 2, 3])
        .school('C', 1, [1, 2, 3])
        .build()
        .expect("consistent data")
}

/// Rotating first choices against rotating exam results.
pub fn rotating_preferences() -> AdmissionData {
    AdmissionData::builder()
        .student(1, "ABC".chars())
        .student(2, "BCA".chars())
        .student(3, "CAB".chars())
        .school('A', 1, [2, 3, 1])
        .school('B', 1, [3, 1, 2])
        .school('C', 1, [1, 2, 3])
        .build()
        .expect("consistent data")
}

/// Every mechanism agrees.
pub fn unanimous() -> AdmissionData {
    AdmissionData::builder()
        .student(1, "BAC".chars())
        .student(2, "ABC".chars())
        .student(3, "ABC".chars())
        .school('A', 1, [1, 3, 2])
        .school('B', 1, [2, 1, 3])
        .school('C', 1, [2, 1, 3])
        .build()
        .expect("consistent data")
}

pub const SCHOOL_NAMES: [(&str, &str); 3] = [
    ("1", "Gymnázium Nymburk"),
    ("2", "Lyceum Mělník"),
    ("3", "SOŠ Smíchov"),
];

/// Thirteen applicants, three schools with twelve seats between them.
pub fn national_round() -> AdmissionData {
    AdmissionData::builder()
        .student("A", "231".chars())
        .student("B", "213".chars())
        .student("C", "321".chars())
        .student("D", "213".chars())
        .student("E", "213".chars())
        .student("F", "132".chars())
        .student("G", "132".chars())
        .student("H", "123".chars())
        .student("I", "321".chars())
        .student("J", "231".chars())
        .student("K", "231".chars())
        .student("L", "132".chars())
        .student("M", "321".chars())
        .school('1', 4, "AIDMECJBLFHKG".chars())
        .school('2', 3, "CGIAHMLKJEFDB".chars())
        .school('3', 5, "IGBKCADMEHLJF".chars())
        .build()
        .expect("consistent data")
}

pub fn students(ids: &str) -> BTreeSet<StudentId> {
    ids.chars().map(StudentId::from).collect()
}

pub fn assigned(allocation: &Allocation, school: char) -> BTreeSet<StudentId> {
    allocation
        .accepted_at(&SchoolId::from(school))
        .cloned()
        .unwrap_or_default()
}
