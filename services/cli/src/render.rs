use std::collections::{BTreeMap, BTreeSet};

use admissions::analysis::ComparisonReport;
use admissions::error::AppError;
use admissions::{
    AdmissionData, Allocation, MechanismKind, RecordingObserver, SchoolId, StepSnapshot,
    StudentId,
};
use serde::Serialize;

/// Display names for schools; identifiers are shown when a school has no name.
pub(crate) type SchoolNames = BTreeMap<SchoolId, String>;

fn school_label(names: &SchoolNames, school: &SchoolId) -> String {
    match names.get(school) {
        Some(name) => format!("{} ({})", name, school),
        None => school.to_string(),
    }
}

fn join_students<'a>(students: impl IntoIterator<Item = &'a StudentId>) -> String {
    let joined: Vec<&str> = students.into_iter().map(StudentId::as_str).collect();
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined.join(", ")
    }
}

fn join_schools<'a>(schools: impl IntoIterator<Item = &'a SchoolId>) -> String {
    let joined: Vec<&str> = schools.into_iter().map(SchoolId::as_str).collect();
    joined.join(", ")
}

fn ordinal(rank: usize) -> String {
    let position = rank + 1;
    let suffix = match (position % 10, position % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{position}{suffix}")
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn render_input(data: &AdmissionData, names: &SchoolNames) {
    println!(
        "{} students, {} schools, {} seats",
        data.num_students(),
        data.num_schools(),
        data.total_seats()
    );

    println!("\nApplications");
    for (student, preferences) in data.applications() {
        println!("- {}: {}", student, join_schools(preferences));
    }

    println!("\nExam rankings");
    for (school, ranking) in data.exams() {
        println!(
            "- {}, {} seats: {}",
            school_label(names, school),
            data.capacity(school),
            join_students(ranking)
        );
    }
}

pub(crate) fn render_allocation(
    mechanism: MechanismKind,
    data: &AdmissionData,
    allocation: &Allocation,
    names: &SchoolNames,
) {
    println!("\n{}", mechanism.label());
    for (school, students) in &allocation.accepted {
        println!(
            "- {}: {}/{} seats, {}",
            school_label(names, school),
            students.len(),
            data.capacity(school),
            join_students(students)
        );
    }
    if allocation.rejected.is_empty() {
        println!("Rejected: none");
    } else {
        println!("Rejected: {}", join_students(&allocation.rejected));
    }
}

fn render_sets(label: &str, sets: &BTreeMap<SchoolId, BTreeSet<StudentId>>, names: &SchoolNames) {
    println!("  {}:", label);
    for (school, students) in sets {
        println!("    {}: {}", school_label(names, school), join_students(students));
    }
}

fn render_offers(offers: &BTreeMap<StudentId, BTreeSet<SchoolId>>) {
    if offers.is_empty() {
        println!("  offers: none");
        return;
    }
    println!("  offers:");
    for (student, schools) in offers {
        println!("    {} <- {}", student, join_schools(schools));
    }
}

fn render_step(step: &StepSnapshot, names: &SchoolNames) {
    println!("Round {}", step.round());
    match step {
        StepSnapshot::DeferredAcceptance(step) => {
            render_sets("compared", &step.to_compare, names);
        }
        StepSnapshot::SchoolOptimal(step) => {
            render_offers(&step.offers);
            println!("  not yet approached:");
            for (school, applicants) in &step.remaining_applicants {
                println!(
                    "    {}: {}",
                    school_label(names, school),
                    join_students(applicants)
                );
            }
        }
        StepSnapshot::Cermat(step) => {
            let matched: Vec<String> = step
                .best_match
                .iter()
                .map(|(student, school)| format!("{} -> {}", student, school))
                .collect();
            println!(
                "  {} choice matches: {}",
                ordinal(step.best_rank),
                matched.join(", ")
            );
        }
        StepSnapshot::Naive(step) => {
            render_offers(&step.offers);
            let seats: Vec<String> = step
                .remaining_seats
                .iter()
                .map(|(school, seats)| format!("{}={}", school, seats))
                .collect();
            println!("  seats left: {}", seats.join(", "));
        }
    }
    render_sets("held", step.accepted(), names);
}

pub(crate) fn render_trace(recording: &RecordingObserver, names: &SchoolNames) {
    let Some(mechanism) = recording.mechanism else {
        return;
    };
    println!("\n{} trace ({} rounds)", mechanism.label(), recording.rounds());
    for step in &recording.steps {
        render_step(step, names);
    }
}

pub(crate) fn render_comparison(
    report: &ComparisonReport,
    data: &AdmissionData,
    names: &SchoolNames,
) {
    println!(
        "\nMechanism comparison ({} students, {} schools, {} seats)",
        report.students, report.schools, report.seats
    );
    for summary in &report.summaries {
        let by_rank: Vec<String> = summary
            .assigned_by_rank
            .iter()
            .enumerate()
            .map(|(rank, count)| format!("{} choice {}", ordinal(rank), count))
            .collect();
        println!(
            "- {}: {} accepted, {} rejected, {} | {}",
            summary.mechanism_label,
            summary.accepted(),
            summary.rejected,
            if summary.stable { "stable" } else { "unstable" },
            by_rank.join(", ")
        );
    }

    for summary in &report.summaries {
        render_allocation(summary.mechanism, data, &summary.allocation, names);
        for envy in &summary.envy {
            match &envy.displaced {
                Some(displaced) => println!(
                    "  ! {} prefers {} and outranks {} there",
                    envy.student,
                    school_label(names, &envy.school),
                    displaced
                ),
                None => println!(
                    "  ! {} prefers {} which has a free seat",
                    envy.student,
                    school_label(names, &envy.school)
                ),
            }
        }
    }

    if !report.identical.is_empty() {
        println!("\nIdentical outcomes");
        for (left, right) in &report.identical {
            println!("- {} = {}", left.label(), right.label());
        }
    }

    if report.dominance.is_empty() {
        println!("\nPareto dominance: none");
    } else {
        println!("\nPareto dominance (every student weakly better off)");
        for entry in &report.dominance {
            println!("- {} improves on {}", entry.by.label(), entry.dominated.label());
        }
    }
}
