//! Classification model.
//!
//! Separates the physical `Direction` of money (enters, leaves, or is
//! reserved against a credit line) from the economic `Classification`
//! (spending, earning, lending, settling, moving between own wallets).
//! Classification changes go through an explicit transition table so an
//! undefined transition is an error, not a silent write.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inflow,
    Outflow,
    Reserved,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inflow => "inflow",
            Self::Outflow => "outflow",
            Self::Reserved => "reserved",
        }
    }

    /// The opposite flow. `Reserved` has none and maps to itself.
    pub fn flipped(self) -> Self {
        match self {
            Self::Inflow => Self::Outflow,
            Self::Outflow => Self::Inflow,
            Self::Reserved => Self::Reserved,
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "inflow" => Ok(Self::Inflow),
            "outflow" => Ok(Self::Outflow),
            "reserved" => Ok(Self::Reserved),
            other => Err(EngineError::InvalidClassification(format!(
                "invalid direction: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Expense,
    Income,
    Lend,
    Borrow,
    DebtCollection,
    LoanRepayment,
    SplitPayment,
    Transfer,
    Installment,
    InstallmentCharge,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Lend => "lend",
            Self::Borrow => "borrow",
            Self::DebtCollection => "debt_collection",
            Self::LoanRepayment => "loan_repayment",
            Self::SplitPayment => "split_payment",
            Self::Transfer => "transfer",
            Self::Installment => "installment",
            Self::InstallmentCharge => "installment_charge",
        }
    }

    /// Plain classifications are the ones with no settlement semantics.
    pub fn is_plain(self) -> bool {
        matches!(self, Self::Expense | Self::Income)
    }
}

impl TryFrom<&str> for Classification {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "lend" => Ok(Self::Lend),
            "borrow" => Ok(Self::Borrow),
            "debt_collection" => Ok(Self::DebtCollection),
            "loan_repayment" => Ok(Self::LoanRepayment),
            "split_payment" => Ok(Self::SplitPayment),
            "transfer" => Ok(Self::Transfer),
            "installment" => Ok(Self::Installment),
            "installment_charge" => Ok(Self::InstallmentCharge),
            other => Err(EngineError::InvalidClassification(format!(
                "invalid classification: {other}"
            ))),
        }
    }
}

/// Whether a direction/classification pair is representable at all.
pub fn is_valid_pair(direction: Direction, classification: Classification) -> bool {
    match classification {
        Classification::Expense
        | Classification::Lend
        | Classification::LoanRepayment
        | Classification::SplitPayment
        | Classification::InstallmentCharge => direction == Direction::Outflow,
        Classification::Income | Classification::Borrow | Classification::DebtCollection => {
            direction == Direction::Inflow
        }
        Classification::Installment => direction == Direction::Reserved,
        Classification::Transfer => {
            matches!(direction, Direction::Inflow | Direction::Outflow)
        }
    }
}

/// The plain classification a settled or reverted row falls back to.
pub fn plain_classification(direction: Direction) -> ResultEngine<Classification> {
    match direction {
        Direction::Outflow => Ok(Classification::Expense),
        Direction::Inflow => Ok(Classification::Income),
        Direction::Reserved => Err(EngineError::InvalidClassification(
            "reserved rows have no plain classification".to_string(),
        )),
    }
}

/// Operations that move a transaction between classifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOp {
    MarkSplit,
    MarkLoan,
    MarkDebt,
    MarkInstallment,
    SettleReceivable,
    SettlePayable,
    SettleInstallment,
    Unlink,
    Unclassify,
}

/// The finite transition table.
///
/// Returns the new classification and, when the physical flow changes too
/// (installment plans move between `Outflow` and `Reserved`), the new
/// direction. Any pair not listed here is rejected.
pub fn transition(
    current: Classification,
    op: TransitionOp,
) -> ResultEngine<(Classification, Option<Direction>)> {
    use Classification::*;
    use TransitionOp::*;

    match (current, op) {
        (Expense, MarkSplit) => Ok((SplitPayment, None)),
        (Expense, MarkLoan) => Ok((Lend, None)),
        (Income, MarkDebt) => Ok((Borrow, None)),
        (Expense, MarkInstallment) => Ok((Installment, Some(Direction::Reserved))),

        (Income, SettleReceivable) => Ok((DebtCollection, None)),
        (Expense, SettlePayable) => Ok((LoanRepayment, None)),
        (Expense, SettleInstallment) => Ok((InstallmentCharge, None)),

        (DebtCollection, Unlink) => Ok((Income, None)),
        (LoanRepayment, Unlink) => Ok((Expense, None)),
        (InstallmentCharge, Unlink) => Ok((Expense, None)),

        (SplitPayment, Unclassify) => Ok((Expense, None)),
        (Lend, Unclassify) => Ok((Expense, None)),
        (Borrow, Unclassify) => Ok((Income, None)),
        (Installment, Unclassify) => Ok((Expense, Some(Direction::Outflow))),

        (current, op) => Err(EngineError::InvalidClassification(format!(
            "no transition from {} for {op:?}",
            current.as_str()
        ))),
    }
}

/// Per-transaction report contribution, in minor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Contribution {
    pub expense_minor: i64,
    pub income_minor: i64,
}

/// The pure, total contribution function every report is built on.
///
/// Only true economic effect counts: a plain expense or income counts in
/// full, a split payment counts for the user's own share
/// (`user_amount_minor`), and everything that is mere cash movement
/// (lending, borrowing, settling, transfers, installment plans and their
/// charges) counts zero. Ignored rows count zero as well.
pub fn contribution(
    direction: Direction,
    classification: Classification,
    is_ignored: bool,
    amount_minor: i64,
    user_amount_minor: Option<i64>,
) -> Contribution {
    if is_ignored {
        return Contribution::default();
    }
    match (classification, direction) {
        (Classification::Expense, Direction::Outflow) => Contribution {
            expense_minor: amount_minor,
            income_minor: 0,
        },
        (Classification::Income, Direction::Inflow) => Contribution {
            expense_minor: 0,
            income_minor: amount_minor,
        },
        (Classification::SplitPayment, Direction::Outflow) => Contribution {
            expense_minor: user_amount_minor.unwrap_or(0),
            income_minor: 0,
        },
        _ => Contribution::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_pairs() {
        assert!(is_valid_pair(Direction::Outflow, Classification::Expense));
        assert!(is_valid_pair(Direction::Inflow, Classification::Income));
        assert!(is_valid_pair(Direction::Outflow, Classification::Lend));
        assert!(is_valid_pair(Direction::Inflow, Classification::Borrow));
        assert!(is_valid_pair(
            Direction::Reserved,
            Classification::Installment
        ));
        assert!(is_valid_pair(Direction::Inflow, Classification::Transfer));
        assert!(is_valid_pair(Direction::Outflow, Classification::Transfer));

        assert!(!is_valid_pair(Direction::Inflow, Classification::Expense));
        assert!(!is_valid_pair(Direction::Outflow, Classification::Income));
        assert!(!is_valid_pair(
            Direction::Outflow,
            Classification::Installment
        ));
        assert!(!is_valid_pair(Direction::Reserved, Classification::Transfer));
    }

    #[test]
    fn mark_transitions() {
        assert_eq!(
            transition(Classification::Expense, TransitionOp::MarkSplit).unwrap(),
            (Classification::SplitPayment, None)
        );
        assert_eq!(
            transition(Classification::Expense, TransitionOp::MarkInstallment).unwrap(),
            (Classification::Installment, Some(Direction::Reserved))
        );
        assert_eq!(
            transition(Classification::Income, TransitionOp::MarkDebt).unwrap(),
            (Classification::Borrow, None)
        );
    }

    #[test]
    fn unclassify_reverses_marks() {
        for (marked, plain, direction) in [
            (Classification::SplitPayment, Classification::Expense, None),
            (Classification::Lend, Classification::Expense, None),
            (Classification::Borrow, Classification::Income, None),
            (
                Classification::Installment,
                Classification::Expense,
                Some(Direction::Outflow),
            ),
        ] {
            assert_eq!(
                transition(marked, TransitionOp::Unclassify).unwrap(),
                (plain, direction)
            );
        }
    }

    #[test]
    fn undefined_transition_is_rejected() {
        let err = transition(Classification::Transfer, TransitionOp::MarkSplit).unwrap_err();
        assert!(matches!(err, EngineError::InvalidClassification(_)));

        let err = transition(Classification::Expense, TransitionOp::Unlink).unwrap_err();
        assert!(matches!(err, EngineError::InvalidClassification(_)));
    }

    #[test]
    fn contribution_counts_economic_effect_only() {
        let c = contribution(
            Direction::Outflow,
            Classification::Expense,
            false,
            3000,
            None,
        );
        assert_eq!(c.expense_minor, 3000);
        assert_eq!(c.income_minor, 0);

        let c = contribution(Direction::Inflow, Classification::Income, false, 10000, None);
        assert_eq!(c.income_minor, 10000);

        let c = contribution(
            Direction::Outflow,
            Classification::SplitPayment,
            false,
            3000,
            Some(1500),
        );
        assert_eq!(c.expense_minor, 1500);

        for classification in [
            Classification::Lend,
            Classification::Borrow,
            Classification::DebtCollection,
            Classification::LoanRepayment,
            Classification::Transfer,
            Classification::Installment,
            Classification::InstallmentCharge,
        ] {
            let direction = match classification {
                Classification::Installment => Direction::Reserved,
                Classification::Borrow | Classification::DebtCollection => Direction::Inflow,
                _ => Direction::Outflow,
            };
            let c = contribution(direction, classification, false, 1000, None);
            assert_eq!(c, Contribution::default());
        }
    }

    #[test]
    fn ignored_rows_contribute_nothing() {
        let c = contribution(Direction::Outflow, Classification::Expense, true, 500, None);
        assert_eq!(c, Contribution::default());
    }
}
