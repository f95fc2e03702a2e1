use admissions::analysis::ComparisonReport;
use admissions::config::RunConfig;
use admissions::error::AppError;
use admissions::{AdmissionData, DataError, MechanismKind, RecordingObserver, SchoolId};
use clap::{Args, ValueEnum};

use crate::render::{self, SchoolNames};

/// Built-in admission rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum DemoExample {
    /// Four students in a preference cycle; the naive mechanism leaves justified envy
    Cyclic,
    /// Student-optimal and school-optimal outcomes differ
    Crossed,
    /// Rotating first choices against rotating exam results
    Rotating,
    /// All mechanisms agree
    Unanimous,
    /// Thirteen applicants competing for twelve seats at three schools
    #[default]
    National,
}

impl DemoExample {
    const fn title(self) -> &'static str {
        match self {
            Self::Cyclic => "Cyclic conflict",
            Self::Crossed => "Crossed preferences",
            Self::Rotating => "Rotating preferences",
            Self::Unanimous => "Unanimous outcome",
            Self::National => "National admission round",
        }
    }

    fn dataset(self) -> Result<(AdmissionData, SchoolNames), DataError> {
        let builder = match self {
            Self::Cyclic => AdmissionData::builder()
                .student(1, "ABC".chars())
                .student(2, "ABD".chars())
                .student(3, "ACD".chars())
                .student(4, "BCD".chars())
                .school('A', 1, [1, 2, 3])
                .school('B', 1, [1, 2, 4])
                .school('C', 1, [1, 3, 4])
                .school('D', 1, [2, 3, 4]),
            Self::Crossed => AdmissionData::builder()
                .student(1, "ABC".chars())
                .student(2, "BAC".chars())
                .student(3, "ABC".chars())
                .school('A', 1, [2, 1, 3])
                .school('B', 1, [1, 2, 3])
                .school('C', 1, [1, 2, 3]),
            Self::Rotating => AdmissionData::builder()
                .student(1, "ABC".chars())
                .student(2, "BCA".chars())
                .student(3, "CAB".chars())
                .school('A', 1, [2, 3, 1])
                .school('B', 1, [3, 1, 2])
                .school('C', 1, [1, 2, 3]),
            Self::Unanimous => AdmissionData::builder()
                .student(1, "BAC".chars())
                .student(2, "ABC".chars())
                .student(3, "ABC".chars())
                .school('A', 1, [1, 3, 2])
                .school('B', 1, [2, 1, 3])
                .school('C', 1, [2, 1, 3]),
            Self::National => AdmissionData::builder()
                .student("Adam", "231".chars())
                .student("Bára", "213".chars())
                .student("Cyril", "321".chars())
                .student("Dana", "213".chars())
                .student("Emil", "213".chars())
                .student("Filip", "132".chars())
                .student("Gustav", "132".chars())
                .student("Hana", "123".chars())
                .student("Ivana", "321".chars())
                .student("Jakub", "231".chars())
                .student("Klára", "231".chars())
                .student("Lucie", "132".chars())
                .student("Marek", "321".chars())
                .school('1', 4, national_ranking("AIDMECJBLFHKG"))
                .school('2', 3, national_ranking("CGIAHMLKJEFDB"))
                .school('3', 5, national_ranking("IGBKCADMEHLJF")),
        };

        let names = match self {
            Self::National => [
                ('1', "Gymnázium Nymburk"),
                ('2', "Lyceum Mělník"),
                ('3', "SOŠ Smíchov"),
            ]
            .into_iter()
            .map(|(id, name)| (SchoolId::from(id), name.to_string()))
            .collect(),
            _ => SchoolNames::new(),
        };

        Ok((builder.build()?, names))
    }
}

/// Expands initials into the applicant names of the national round.
fn national_ranking(initials: &str) -> Vec<&'static str> {
    const NAMES: [&str; 13] = [
        "Adam", "Bára", "Cyril", "Dana", "Emil", "Filip", "Gustav", "Hana", "Ivana", "Jakub",
        "Klára", "Lucie", "Marek",
    ];
    initials
        .chars()
        .filter_map(|initial| NAMES.iter().copied().find(|name| name.starts_with(initial)))
        .collect()
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Which built-in round to run
    #[arg(long, value_enum, default_value_t)]
    pub(crate) example: DemoExample,
    /// Print the round-by-round trace of this mechanism after the comparison
    #[arg(long)]
    pub(crate) mechanism: Option<MechanismKind>,
    /// Trace the configured default mechanism even without --mechanism
    #[arg(long)]
    pub(crate) trace: bool,
}

pub(crate) fn run_demo(args: DemoArgs, defaults: &RunConfig) -> Result<(), AppError> {
    let DemoArgs {
        example,
        mechanism,
        trace,
    } = args;

    let (data, names) = example.dataset()?;
    println!("Admissions demo: {}", example.title());
    render::render_input(&data, &names);

    let report = ComparisonReport::compare_all(&data)?;
    render::render_comparison(&report, &data, &names);

    let traced = match mechanism {
        Some(kind) => Some(kind),
        None if trace || defaults.trace_steps => Some(defaults.mechanism),
        None => None,
    };
    if let Some(kind) = traced {
        let mut recorder = RecordingObserver::new();
        kind.run(&data, &mut recorder)?;
        render::render_trace(&recorder, &names);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use admissions::NoopObserver;

    #[test]
    fn every_demo_dataset_is_consistent() {
        for example in DemoExample::value_variants() {
            let (data, _) = example.dataset().expect("demo data is consistent");
            assert!(data.num_students() > 0);
        }
    }

    #[test]
    fn national_round_rejects_filip_under_every_mechanism() {
        let (data, names) = DemoExample::National.dataset().expect("demo data");
        assert_eq!(names.len(), 3);
        for kind in MechanismKind::ordered() {
            let allocation = kind.run(&data, &mut NoopObserver).expect("mechanism runs");
            let rejected: Vec<&str> = allocation.rejected.iter().map(|s| s.as_str()).collect();
            assert_eq!(rejected, vec!["Filip"], "{kind}");
        }
    }

    #[test]
    fn initials_expand_to_full_names() {
        assert_eq!(national_ranking("BK"), vec!["Bára", "Klára"]);
    }
}
