use std::sync::Arc;
use tmsim::validation::{
    Ear, PatientRecord, PatientValidator, ValidationStatus, clinical_dataset, load_patients_csv,
    pearson_correlation, save_patients_csv,
};
use tmsim::{EarModel, TmSimError};

mod common;
use common::all_models;

#[test]
fn test_validation_without_model_is_skipped() {
    let validator = PatientValidator::with_builtin_dataset();
    let err = validator.run_validation().unwrap_err();
    assert!(matches!(err, TmSimError::ModelNotConfigured));
    assert!(err.to_string().contains("no ABG model configured"));
}

#[test]
fn test_validation_summary_is_consistent() {
    for model in all_models() {
        let validator = PatientValidator::with_builtin_dataset().with_model(model);
        let s = validator.run_validation().unwrap();
        assert_eq!(s.per_patient.len(), 8);
        let sim: Vec<f64> = s.per_patient.iter().flat_map(|p| p.simulated_db.clone()).collect();
        let real: Vec<f64> = s.per_patient.iter().flat_map(|p| p.measured_db.clone()).collect();
        let mae = sim.iter().zip(&real).map(|(a, b)| (a - b).abs()).sum::<f64>() / sim.len() as f64;
        assert!((s.mean_absolute_error - mae).abs() < 1e-9);
        assert!((s.correlation_coefficient - pearson_correlation(&sim, &real)).abs() < 1e-12);
        assert_eq!(
            s.validation_status,
            ValidationStatus::classify(s.mean_absolute_error, s.correlation_coefficient)
        );
    }
}

#[test]
fn test_status_boundaries_are_exclusive() {
    assert_eq!(ValidationStatus::classify(10.0, 0.8), ValidationStatus::Good);
    assert_eq!(ValidationStatus::classify(9.0, 0.7), ValidationStatus::Good);
    assert_eq!(ValidationStatus::classify(9.0, 0.7000001), ValidationStatus::Excellent);
}

#[test]
fn test_grade_comparison_is_independent_of_patient_split() {
    let model = Arc::new(EarModel);
    // split every ear into two half-audiograms with distinct ids
    let split: Vec<PatientRecord> = clinical_dataset()
        .into_iter()
        .flat_map(|p| {
            let grade = p.grade.value() as i64;
            let (low, high): (Vec<_>, Vec<_>) =
                p.abg_by_frequency.iter().partition(|(f, _)| **f < 2000);
            let half = |suffix: &str, part: Vec<(&u32, &f64)>| {
                let map = part.into_iter().map(|(f, v)| (*f, *v)).collect();
                PatientRecord::new(format!("{}{}", p.id, suffix), grade, p.ear, map)
            };
            [half("a", low), half("b", high)]
        })
        .collect();
    let by_split = PatientValidator::new(split).with_model(model.clone()).compare_by_grade().unwrap();
    let builtin = PatientValidator::with_builtin_dataset().with_model(model).compare_by_grade().unwrap();
    assert_eq!(by_split.len(), builtin.len());
    for (a, b) in by_split.iter().zip(&builtin) {
        assert_eq!(a.grade, b.grade);
        assert_eq!(a.patients, 2 * b.patients);
        assert!((a.clinical_mean_db - b.clinical_mean_db).abs() < 1e-9);
        assert!((a.simulated_mean_db - b.simulated_mean_db).abs() < 1e-9);
        assert_eq!(a.per_frequency, b.per_frequency);
    }
    assert!((builtin[3].per_frequency[0].clinical_db - 30.0).abs() < 1e-12);
}

#[test]
fn test_patients_from_csv_validate_like_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.csv");
    save_patients_csv(&clinical_dataset(), &path).unwrap();
    let loaded = load_patients_csv(&path).unwrap();
    assert_eq!(loaded[5].ear, Ear::Left);

    let from_csv = PatientValidator::new(loaded).with_model(Arc::new(EarModel)).run_validation().unwrap();
    let builtin = PatientValidator::with_builtin_dataset()
        .with_model(Arc::new(EarModel))
        .run_validation()
        .unwrap();
    assert_eq!(from_csv, builtin);
}

#[test]
fn test_nan_measurements_do_not_poison_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("with_gaps.csv");
    std::fs::write(
        &path,
        "Id,Grade,Ear,Frequency_Hz,ABG_dB\n\
         A,2,L,250,25\n\
         A,2,L,500,20\n\
         A,2,L,1000,nan\n\
         A,2,L,2000,10\n\
         A,2,L,4000,30\n",
    )
    .unwrap();
    let patients = load_patients_csv(&path).unwrap();
    assert_eq!(patients[0].len(), 4);

    let s = PatientValidator::new(patients).with_model(Arc::new(EarModel)).run_validation().unwrap();
    assert_eq!(s.samples, 4);
    assert!(s.mean_absolute_error.is_finite());
    assert!(s.correlation_coefficient.is_finite());
    assert_eq!(
        s.validation_status,
        ValidationStatus::classify(s.mean_absolute_error, s.correlation_coefficient)
    );
}
