use fs_project::*;

fn base() -> SweepConfig {
    parse_config_yaml(
        "version: 1\nsweep:\n  values: \"a=1\"\n  move_labels: [m]\n  end: [1, 0]\n  step: 0.5\n",
    )
    .unwrap()
}

#[test]
fn minimal_config_validates() {
    validate_config(&base()).unwrap();
}

#[test]
fn newer_version_rejected() {
    let mut cfg = base();
    cfg.version = LATEST_VERSION + 1;
    assert!(matches!(
        validate_config(&cfg),
        Err(ValidationError::UnsupportedVersion { .. })
    ));
}

#[test]
fn step_must_be_positive() {
    for step in [0.0, -1.0, f64::NAN] {
        let mut cfg = base();
        cfg.sweep.step = step;
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::InvalidValue { ref field, .. }) if field == "sweep.step"
        ));
    }
}

#[test]
fn moving_labels_required() {
    let mut cfg = base();
    cfg.sweep.move_labels.clear();
    assert!(matches!(
        validate_config(&cfg),
        Err(ValidationError::MissingValue { ref field }) if field == "sweep.move_labels"
    ));

    cfg.sweep.move_labels = vec!["  ".to_string()];
    assert!(validate_config(&cfg).is_err());
}

#[test]
fn empty_values_rejected() {
    let mut cfg = base();
    cfg.sweep.values = " ".to_string();
    assert!(matches!(
        validate_config(&cfg),
        Err(ValidationError::MissingValue { .. })
    ));
}

#[test]
fn unknown_integral_name_rejected() {
    let mut cfg = base();
    cfg.sweep.outputs = vec![OutputSpecDef {
        integral: IntegralRef::Name("Torquey".to_string()),
        name: None,
    }];
    assert!(matches!(
        validate_config(&cfg),
        Err(ValidationError::UnknownIntegral { .. })
    ));
}

#[test]
fn numeric_integral_names_are_accepted() {
    let out = OutputSpecDef {
        integral: IntegralRef::Name("42".to_string()),
        name: None,
    };
    assert_eq!(integral_id(&out).unwrap(), 42);
    assert_eq!(output_name(&out).unwrap(), "Integral42");
}

#[test]
fn duplicate_output_columns_rejected() {
    let mut cfg = base();
    cfg.sweep.outputs = vec![
        OutputSpecDef {
            integral: IntegralRef::Id(15),
            name: None,
        },
        OutputSpecDef {
            integral: IntegralRef::Name("maxwellforce".to_string()),
            name: None,
        },
    ];
    assert!(matches!(
        validate_config(&cfg),
        Err(ValidationError::DuplicateName { .. })
    ));
}

#[test]
fn degenerate_sim_block_rejected() {
    let mut cfg = base();
    cfg.engine.simulated.blocks.push(SimBlockDef {
        label: "m".to_string(),
        rect: [1.0, 0.0, 1.0, 1.0],
    });
    assert!(validate_config(&cfg).is_err());
}

#[test]
fn poll_settings_checked() {
    let mut cfg = base();
    cfg.sweep.solve.max_polls = 0;
    assert!(validate_config(&cfg).is_err());

    let mut cfg = base();
    cfg.sweep.settle_s = -0.1;
    assert!(validate_config(&cfg).is_err());
}
