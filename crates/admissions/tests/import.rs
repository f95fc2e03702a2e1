mod common;

use admissions::import::{AdmissionImporter, ImportError};
use admissions::{DataError, MechanismKind, NoopObserver};

#[test]
fn json_and_csv_exports_describe_the_same_round() {
    let json = include_bytes!("../../../data/national_round.json");
    let applications = include_bytes!("../../../data/national_round_applications.csv");
    let exams = include_bytes!("../../../data/national_round_exams.csv");

    let from_json = AdmissionImporter::from_json_reader(&json[..]).expect("json imports");
    let from_csv = AdmissionImporter::from_csv_readers(&applications[..], &exams[..])
        .expect("csv imports");

    assert_eq!(from_json, from_csv);
    assert_eq!(from_json, common::national_round());
}

#[test]
fn imported_round_runs_every_mechanism() {
    let json = include_bytes!("../../../data/national_round.json");
    let data = AdmissionImporter::from_json_reader(&json[..]).expect("json imports");

    for kind in MechanismKind::ordered() {
        let allocation = kind.run(&data, &mut NoopObserver).expect("mechanism runs");
        assert_eq!(allocation.rejected, common::students("F"), "{kind}");
    }
}

#[test]
fn csv_ranking_of_a_non_applicant_is_reported() {
    let applications = "student,choice_1\n1,A\n2,B\n";
    let exams = "school,seats,rank_1,rank_2\nA,1,1,2\nB,1,2\n";

    let err = AdmissionImporter::from_csv_readers(applications.as_bytes(), exams.as_bytes())
        .expect_err("student 2 did not apply to A");
    assert!(matches!(
        err,
        ImportError::Data(DataError::UnrequestedRanking { .. })
    ));
}
