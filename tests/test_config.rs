//! Test KTD hyperparameter configuration.

use ktd_estimate::config::{DowndateMethod, KtdConfig};
use ktd_estimate::KtdError;

#[test]
fn test_defaults() {
    let config = KtdConfig::default();
    assert_eq!(config.gamma, 0.95);
    assert_eq!(config.observation_noise, 1.);
    assert_eq!(config.prior_var, 10.);
    assert_eq!(config.downdate, DowndateMethod::Incremental);
    assert!(!config.use_linear_evaluation);
    assert!(config.validate(1).is_ok());
    assert!(config.validate(100).is_ok());

    let config = KtdConfig::new(0.5).with_unscented(1., 2., 0.);
    assert_eq!(config.gamma, 0.5);
    assert_eq!(config.ut_lambda(3), 0.);
}

#[test]
fn test_serde() {
    let config = KtdConfig::new(0.9)
        .with_eta_noise(1e-5)
        .with_random_amplitude(0.1)
        .with_downdate(DowndateMethod::Refactorize);
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"downdate\":\"refactorize\""));
    let read: KtdConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(read, config);

    // Missing fields take their defaults
    let read: KtdConfig = serde_json::from_str(r#"{"gamma": 0.5, "use_linear_evaluation": true}"#).unwrap();
    assert_eq!(read, KtdConfig::new(0.5).with_linear_evaluation(true));
}

#[test]
fn test_invalid() {
    let invalid = [
        KtdConfig::new(-0.1),
        KtdConfig::new(1.01),
        KtdConfig::new(f64::NAN),
        KtdConfig::default().with_eta_noise(-1.),
        KtdConfig::default().with_observation_noise(0.),
        KtdConfig::default().with_prior_var(0.),
        KtdConfig::default().with_random_amplitude(-1.),
        KtdConfig::default().with_unscented(0., 2., 0.),
        KtdConfig::default().with_unscented(1e-1, f64::INFINITY, 0.),
        // n + lambda = alpha²(n + kappa) <= 0
        KtdConfig::default().with_unscented(1., 2., -2.),
    ];
    for config in invalid.iter() {
        assert!(
            matches!(config.validate(2), Err(KtdError::InvalidConfiguration { .. })),
            "{:?}",
            config
        );
    }
    assert!(KtdConfig::new(0.).validate(2).is_ok());
    assert!(KtdConfig::new(1.).validate(2).is_ok());
}
