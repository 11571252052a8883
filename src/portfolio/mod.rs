//! Current-book exposures and the concentration measure fed to the sizer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Herfindahl-Hirschman index of a set of exposures: the sum of squared
/// shares of gross exposure. Signs are ignored.
///
/// Returns `None` for an empty set or zero gross exposure.
pub fn herfindahl_index(exposures: &[f64]) -> Option<f64> {
    let gross: f64 = exposures.iter().filter(|e| e.is_finite()).map(|e| e.abs()).sum();
    if !(gross > 0.0) {
        return None;
    }
    Some(
        exposures
            .iter()
            .filter(|e| e.is_finite())
            .map(|e| {
                let share = e.abs() / gross;
                share * share
            })
            .sum(),
    )
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExposureBook {
    pub exposures: HashMap<String, f64>, // key = symbol, value = signed notional
}

impl ExposureBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (replace) the notional exposure for `symbol`. A zero exposure
    /// removes the entry to keep the map clean.
    pub fn set_exposure(&mut self, symbol: &str, notional: f64) {
        if notional.abs() < f64::EPSILON {
            self.exposures.remove(symbol);
        } else {
            self.exposures.insert(symbol.to_string(), notional);
        }
    }

    pub fn remove(&mut self, symbol: &str) -> Option<f64> {
        self.exposures.remove(symbol)
    }

    pub fn gross_exposure(&self) -> f64 {
        self.exposures.values().map(|e| e.abs()).sum()
    }

    /// Absolute share of gross exposure per symbol.
    pub fn weights(&self) -> HashMap<String, f64> {
        let gross = self.gross_exposure();
        if !(gross > 0.0) {
            return HashMap::new();
        }
        self.exposures
            .iter()
            .map(|(sym, e)| (sym.clone(), e.abs() / gross))
            .collect()
    }

    pub fn herfindahl_index(&self) -> Option<f64> {
        let values: Vec<f64> = self.exposures.values().copied().collect();
        herfindahl_index(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_name_is_fully_concentrated() {
        assert_eq!(herfindahl_index(&[250.0]), Some(1.0));
        assert_eq!(herfindahl_index(&[-250.0]), Some(1.0));
    }

    #[test]
    fn equal_weights() {
        let hhi = herfindahl_index(&[100.0, 100.0, 100.0, 100.0]).unwrap();
        assert!((hhi - 0.25).abs() < 1e-12);
    }

    #[test]
    fn empty_book_has_no_index() {
        assert_eq!(herfindahl_index(&[]), None);
        assert_eq!(herfindahl_index(&[0.0, 0.0]), None);
        assert_eq!(ExposureBook::new().herfindahl_index(), None);
    }

    #[test]
    fn zero_exposure_removes_entry() {
        let mut book = ExposureBook::new();
        book.set_exposure("SPY", 1000.0);
        book.set_exposure("QQQ", 500.0);
        book.set_exposure("QQQ", 0.0);
        assert_eq!(book.exposures.len(), 1);
        assert_eq!(book.herfindahl_index(), Some(1.0));
    }
}
