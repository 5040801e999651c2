use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "RWF")]
    Rwf,
}

impl Currency {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Rwf => "RWF",
        }
    }

    pub(crate) fn symbol(&self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Eur => "€",
            Self::Gbp => "£",
            Self::Rwf => "FRw ",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "GBP" => Some(Self::Gbp),
            "RWF" => Some(Self::Rwf),
            _ => None,
        }
    }

    pub(crate) fn all() -> &'static [Currency] {
        &[Self::Usd, Self::Eur, Self::Gbp, Self::Rwf]
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Base currency plus user-entered conversion rates. Each rate is the number
/// of units of that currency per unit of the base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Settings {
    pub(crate) base_currency: Currency,
    #[serde(default = "default_rates")]
    pub(crate) rates: BTreeMap<String, Decimal>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_currency: Currency::Usd,
            rates: default_rates(),
        }
    }
}

fn default_rates() -> BTreeMap<String, Decimal> {
    [
        (Currency::Usd, Decimal::ONE),
        (Currency::Eur, Decimal::new(92, 2)),
        (Currency::Gbp, Decimal::new(79, 2)),
        (Currency::Rwf, Decimal::new(1300, 0)),
    ]
    .into_iter()
    .map(|(c, r)| (c.as_str().to_string(), r))
    .collect()
}

impl Settings {
    /// Convert an amount held in the base currency into `to`.
    /// Returns None when either rate is missing or not positive, or when the
    /// result does not fit in a Decimal.
    pub(crate) fn convert(&self, amount: Decimal, to: Currency) -> Option<Decimal> {
        if to == self.base_currency {
            return Some(amount);
        }
        let base_rate = self.rate(self.base_currency)?;
        let target_rate = self.rate(to)?;
        let converted = amount.checked_mul(target_rate)?.checked_div(base_rate)?;
        Some(converted.round_dp(2))
    }

    fn rate(&self, currency: Currency) -> Option<Decimal> {
        self.rates
            .get(currency.as_str())
            .copied()
            .filter(|r| *r > Decimal::ZERO)
    }

    /// Rates must stay positive; anything else is refused.
    pub(crate) fn set_rate(&mut self, currency: Currency, rate: Decimal) -> bool {
        if rate <= Decimal::ZERO {
            return false;
        }
        self.rates.insert(currency.as_str().to_string(), rate);
        true
    }
}
