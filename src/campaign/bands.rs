//! Banded cashback resolution.
//!
//! Bands are price intervals `[minPrice, maxPrice)` carrying either a flat
//! amount or a percent of price. Declared bands may be unsorted and may overlap;
//! selection is deterministic regardless.

use serde::{Deserialize, Serialize};

use super::lenient;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashbackBand {
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

impl CashbackBand {
    pub fn flat(min: f64, max: Option<f64>, amount: f64) -> Self {
        Self {
            min_price: Some(min),
            max_price: max,
            amount: Some(amount),
            percent: None,
        }
    }

    fn lower(&self) -> f64 {
        self.min_price.unwrap_or(0.0)
    }

    fn upper(&self) -> f64 {
        self.max_price.unwrap_or(f64::INFINITY)
    }

    /// Inclusive lower bound, exclusive upper bound.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower() && price < self.upper()
    }

    fn has_value(&self) -> bool {
        self.amount.is_some_and(|a| a > 0.0) || self.percent.is_some_and(|p| p > 0.0)
    }
}

/// Drop bands that carry neither a positive amount nor a positive percent.
pub fn normalize_bands(bands: &[CashbackBand]) -> Vec<CashbackBand> {
    bands.iter().filter(|b| b.has_value()).cloned().collect()
}

/// Pick the band that applies at `asp`.
///
/// Order: the first declared band containing `asp`; else the highest band lying
/// entirely below `asp`; else the lowest band lying entirely above; else the
/// first declared band.
pub fn select_band(bands: &[CashbackBand], asp: f64) -> Option<&CashbackBand> {
    if bands.is_empty() {
        return None;
    }
    if let Some(b) = bands.iter().find(|b| b.contains(asp)) {
        return Some(b);
    }

    let below = bands
        .iter()
        .filter(|b| b.upper() <= asp)
        .fold(None::<&CashbackBand>, |best, b| match best {
            Some(cur) if (cur.upper(), cur.lower()) >= (b.upper(), b.lower()) => Some(cur),
            _ => Some(b),
        });
    if below.is_some() {
        return below;
    }

    let above = bands
        .iter()
        .filter(|b| b.lower() > asp)
        .fold(None::<&CashbackBand>, |best, b| match best {
            Some(cur) if cur.lower() <= b.lower() => Some(cur),
            _ => Some(b),
        });
    above.or_else(|| bands.first())
}

/// Dollar value a buyer at `asp` actually receives from `band`.
pub fn representative_value(band: &CashbackBand, asp: f64) -> Option<f64> {
    if let Some(a) = band.amount.filter(|a| *a > 0.0) {
        return Some(a);
    }
    band.percent
        .filter(|p| *p > 0.0)
        .map(|p| p / 100.0 * asp)
        .filter(|v| v.is_finite())
}

/// Largest absolute value across all bands: what an "up to $X" headline would quote.
pub fn headline_max(bands: &[CashbackBand], asp: f64) -> Option<f64> {
    bands
        .iter()
        .filter_map(|b| {
            if let Some(a) = b.amount.filter(|a| *a > 0.0) {
                return Some(a);
            }
            let price = b
                .max_price
                .filter(|m| m.is_finite())
                .unwrap_or_else(|| asp.max(b.lower()));
            b.percent.filter(|p| *p > 0.0).map(|p| p / 100.0 * price)
        })
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
}
