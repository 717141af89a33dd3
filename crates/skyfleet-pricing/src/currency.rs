//! Fixed conversion table for cross-currency ranking

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use skyfleet_cloud::Currency;
use std::collections::HashMap;

/// Static rates into one reference currency. Not live FX.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTable {
    reference: Currency,
    /// Units of `reference` per unit of the key currency
    rates: HashMap<Currency, Decimal>,
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::new(Currency::Cny).with_rate(Currency::Usd, dec!(7.2))
    }
}

impl ConversionTable {
    pub fn new(reference: Currency) -> Self {
        Self {
            reference,
            rates: HashMap::from([(reference, Decimal::ONE)]),
        }
    }

    pub fn with_rate(mut self, currency: Currency, rate: Decimal) -> Self {
        self.rates.insert(currency, rate);
        self
    }

    pub fn reference(&self) -> Currency {
        self.reference
    }

    /// `amount` in the reference currency, if a rate is known
    pub fn normalize(&self, amount: Decimal, currency: Currency) -> Option<Decimal> {
        self.rates.get(&currency).map(|rate| amount * rate)
    }
}
