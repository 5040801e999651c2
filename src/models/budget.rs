use rust_decimal::Decimal;

use super::MAX_AMOUNT;

/// Monthly spending ceiling. Zero means no cap has been set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct BudgetCap(Decimal);

impl BudgetCap {
    pub(crate) const UNSET: BudgetCap = BudgetCap(Decimal::ZERO);

    /// Negative caps and caps above the largest transaction amount are refused.
    pub(crate) fn new(amount: Decimal) -> Option<Self> {
        if amount < Decimal::ZERO || amount > MAX_AMOUNT {
            None
        } else {
            Some(Self(amount))
        }
    }

    pub(crate) fn amount(&self) -> Decimal {
        self.0
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}
