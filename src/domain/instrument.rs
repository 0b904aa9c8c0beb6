use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

// ===== Instrument registry =====

/// Canonical reporting unit per instrument class. Quotes handed to the rest
/// of the system are always expressed in one of these, never in the raw
/// exchange unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteUnit {
    /// BRL per litre (ethanol at the pump).
    CurrencyPerLitre,
    /// USD per litre (fuels quoted per barrel or gallon upstream:
    /// Brent, RBOB gasoline).
    UsdPerLitre,
    /// USD per kilogram (agriculturals: raw sugar, quoted in US cents/lb).
    UsdPerKilogram,
    /// USD per cubic metre (natural gas, quoted per MMBtu).
    UsdPerCubicMetre,
    /// Plain exchange rate, no physical dimension.
    CurrencyRate,
}

/// One tracked market instrument: domain name, feed symbol, reporting unit.
#[derive(Debug, Clone)]
pub struct InstrumentSpec {
    pub name: &'static str,
    pub symbol: &'static str,
    pub unit: QuoteUnit,
}

/// Instruments the feed client refreshes on every interaction. Consumers
/// look quotes up by `name`; ordering is irrelevant.
pub const INSTRUMENTS: &[InstrumentSpec] = &[
    InstrumentSpec {
        name: "brent_oil",
        symbol: "BZ=F",
        unit: QuoteUnit::UsdPerLitre,
    },
    InstrumentSpec {
        name: "fx_rate",
        symbol: "BRL=X",
        unit: QuoteUnit::CurrencyRate,
    },
    InstrumentSpec {
        name: "sugar",
        symbol: "SB=F",
        unit: QuoteUnit::UsdPerKilogram,
    },
    InstrumentSpec {
        name: "gasoline",
        symbol: "RB=F",
        unit: QuoteUnit::UsdPerLitre,
    },
];

pub fn instrument(name: &str) -> Option<&'static InstrumentSpec> {
    INSTRUMENTS.iter().find(|spec| spec.name == name)
}

// ===== Unit conversion =====

/// Litres in a barrel of oil.
const LITRES_PER_BARREL: f64 = 158.987;
/// Pounds in a kilogram.
const POUNDS_PER_KILOGRAM: f64 = 2.20462;
/// Cubic metres of natural gas per MMBtu (approximate, at standard conditions).
const CUBIC_METRES_PER_MMBTU: f64 = 28.32;

/// Multiplicative raw-unit -> reporting-unit factors, keyed by instrument
/// name. The defaults are approximate published constants, not verified
/// physical ones, so they are configuration: `Config` may override any entry.
#[derive(Debug, Clone)]
pub struct ConversionTable {
    factors: HashMap<String, f64>,
}

impl ConversionTable {
    pub fn new(factors: HashMap<String, f64>) -> Self {
        Self { factors }
    }

    /// Overrides or adds the factor for one instrument.
    pub fn set(&mut self, instrument_name: String, factor: f64) {
        self.factors.insert(instrument_name, factor);
    }

    /// Converts a raw quote value to the instrument's reporting unit.
    ///
    /// Unknown instruments pass through unchanged (factor 1.0). That is a
    /// deliberate contract, not a silent truncation: a new instrument must
    /// keep flowing end to end before its factor is configured.
    pub fn convert(&self, instrument_name: &str, raw: f64) -> f64 {
        match self.factors.get(instrument_name) {
            Some(factor) => raw * factor,
            None => {
                debug!(
                    "ConversionTable: no factor for '{}', passing value through",
                    instrument_name
                );
                raw
            }
        }
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        let mut factors = HashMap::new();
        // Brent: USD/barrel -> USD/litre
        factors.insert("brent_oil".to_string(), 1.0 / LITRES_PER_BARREL);
        // Raw sugar: US cents/lb -> USD/kg
        factors.insert("sugar".to_string(), POUNDS_PER_KILOGRAM / 100.0);
        // RBOB gasoline: USD/gallon -> USD/litre
        factors.insert("gasoline".to_string(), 1.0 / 3.78541);
        // Natural gas: USD/MMBtu -> USD/m3
        factors.insert("natural_gas".to_string(), 1.0 / CUBIC_METRES_PER_MMBTU);
        // FX rate has no physical unit
        factors.insert("fx_rate".to_string(), 1.0);
        Self { factors }
    }
}
