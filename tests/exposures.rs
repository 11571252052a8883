extern crate oraclerisk as oracle_risk_rust;
use oracle_risk_rust::portfolio::ExposureBook;
use oracle_risk_rust::risk::{estimate_cvar, final_size_frac, SizingInputs};
use oracle_risk_rust::{Config, TailConfig};

#[test]
fn book_concentration_feeds_the_sizer() {
    let cfg = Config::default().sizing;

    // Two equal names: HHI = 0.5
    let mut book = ExposureBook::new();
    book.set_exposure("SPY", 1000.0);
    book.set_exposure("TLT", -1000.0);
    let hhi = book.herfindahl_index().unwrap();
    assert!((hhi - 0.5).abs() < 1e-12);

    {
        let weights = book.weights();
        assert!((weights["SPY"] - 0.5).abs() < 1e-12);
        assert!((weights["TLT"] - 0.5).abs() < 1e-12);
    }

    let base = SizingInputs::new(0.01, 0.0004).with_cvar(0.02).with_meta(0.8, None);
    let diversified = final_size_frac(&base, &cfg);
    let concentrated = final_size_frac(&base.with_hhi(hhi), &cfg);

    // penalty = max(0.3, 1.2 - 0.8) = 0.4
    assert!((concentrated.size_frac - diversified.post_meta_regime_rl * 0.4).abs() < 1e-12);
    assert!(concentrated.size_frac < diversified.size_frac);

    // Adding a third name dilutes concentration and loosens the penalty
    book.set_exposure("GLD", 1000.0);
    let diluted = final_size_frac(&base.with_hhi(book.herfindahl_index().unwrap()), &cfg);
    assert!(diluted.size_frac > concentrated.size_frac);

    assert_eq!(book.remove("GLD"), Some(1000.0));
    assert!((book.gross_exposure() - 2000.0).abs() < 1e-9);
}

#[test]
fn tail_estimate_feeds_the_cvar_cap() {
    let cfg = Config::default();

    // Too few losses: fallback estimate 0.02 -> cap 0.0125 / 0.02 = 0.625 (not binding)
    let thin = estimate_cvar(&[0.01, 0.015, 0.02, 0.03], &cfg.tails);
    assert_eq!(thin, TailConfig::default().fallback_cvar);
    let res = final_size_frac(&SizingInputs::new(0.01, 0.0004).with_cvar(thin), &cfg.sizing);
    assert!((res.cvar_limited - 0.10).abs() < 1e-12);

    // A large, heavy-tailed loss sample can only tighten the cap
    let losses: Vec<f64> = (1..=2000)
        .map(|i| 0.05 / (i as f64 / 2001.0).powf(0.6))
        .collect();
    let fat = estimate_cvar(&losses, &cfg.tails);
    // GPD fit: thresh 0.300093, xi 0.329458, beta 0.243080
    assert!((fat - 0.8160820029174053).abs() < 1e-10, "got {fat}");
    let capped = final_size_frac(&SizingInputs::new(0.01, 0.0004).with_cvar(fat), &cfg.sizing);
    assert!((capped.cvar_limited - cfg.sizing.cvar_cap / fat).abs() < 1e-12);
    assert!(capped.cvar_limited * fat <= cfg.sizing.cvar_cap + 1e-12);
    assert!(capped.cvar_limited <= res.cvar_limited);
}

#[test]
fn approved_fraction_converts_to_units() {
    let cfg = Config::default().sizing;
    let inputs = SizingInputs::new(0.01, 0.0004)
        .with_cvar(0.02)
        .with_meta(0.65, Some(0.2))
        .with_regime(0.8)
        .with_rl(1.1)
        .with_hhi(0.15);
    let res = final_size_frac(&inputs, &cfg);

    // 3250 * 0.046464 = 151.008
    assert!((res.notional(3250.0) - 151.008).abs() < 1e-6);
    assert_eq!(res.units(3250.0, 25.0), 6);
    assert_eq!(res.units(3250.0, -1.0), 0);
}
