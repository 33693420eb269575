//! Split calculation
//!
//! Maps an expense total, a split mode and mode-specific allocation data onto
//! one [`Split`] per group member. Every function here is pure: no I/O, no
//! ledger access, and the same input always yields the same output.
//!
//! Each mode is a [`SplitStrategy`] implementation selected at runtime by
//! [`strategy_for`]. The calculator does not check that the splits add up to
//! the total for `Exact` and `Percentage`; the caller must validate that
//! before committing an expense.

use crate::types::{Allocation, LedgerError, Split, SplitMode, UserId};
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places of the ledger currency
pub const CURRENCY_SCALE: u32 = 2;

/// A rule for dividing an expense total between members
pub trait SplitStrategy: Send + Sync {
    /// Produce one split per member, in the order `members` are given
    ///
    /// `members` is never empty when called through [`calculate_splits`].
    fn calculate(
        &self,
        members: &[UserId],
        total: Decimal,
        allocation: &Allocation,
    ) -> Result<Vec<Split>, LedgerError>;
}

/// Equal shares, the last member absorbing the sub-cent remainder
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualSplit;

/// Caller-provided amount per member
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSplit;

/// Caller-provided percentage of the total per member
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentageSplit;

impl SplitStrategy for EqualSplit {
    fn calculate(
        &self,
        members: &[UserId],
        total: Decimal,
        _allocation: &Allocation,
    ) -> Result<Vec<Split>, LedgerError> {
        let count = Decimal::from(members.len());
        let share = total
            .checked_div(count)
            .ok_or(LedgerError::EmptyMemberSet)?
            .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::ToZero);

        // The last member takes whatever the truncated shares left over so
        // the splits always add up to the total exactly.
        let others = share * (count - Decimal::ONE);
        let last_share = total - others;

        let last = members.len() - 1;
        Ok(members
            .iter()
            .enumerate()
            .map(|(i, member)| {
                let amount = if i == last { last_share } else { share };
                Split::new(member.clone(), amount)
            })
            .collect())
    }
}

impl SplitStrategy for ExactSplit {
    fn calculate(
        &self,
        members: &[UserId],
        _total: Decimal,
        allocation: &Allocation,
    ) -> Result<Vec<Split>, LedgerError> {
        Ok(members
            .iter()
            .map(|member| {
                let amount = allocation.get(member).copied().unwrap_or(Decimal::ZERO);
                Split::new(member.clone(), amount)
            })
            .collect())
    }
}

impl SplitStrategy for PercentageSplit {
    fn calculate(
        &self,
        members: &[UserId],
        total: Decimal,
        allocation: &Allocation,
    ) -> Result<Vec<Split>, LedgerError> {
        let hundred = Decimal::ONE_HUNDRED;

        members
            .iter()
            .map(|member| {
                let percentage = allocation.get(member).copied().unwrap_or(Decimal::ZERO);
                if percentage > hundred {
                    return Err(LedgerError::invalid_allocation(
                        member,
                        "percentage above 100",
                    ));
                }
                let amount = total
                    .checked_mul(percentage)
                    .and_then(|scaled| scaled.checked_div(hundred))
                    .ok_or_else(|| LedgerError::invalid_allocation(member, "amount out of range"))?;
                Ok(Split::new(member.clone(), amount))
            })
            .collect()
    }
}

/// Select the strategy implementing `mode`
pub fn strategy_for(mode: SplitMode) -> Box<dyn SplitStrategy> {
    match mode {
        SplitMode::Equal => Box::new(EqualSplit),
        SplitMode::Exact => Box::new(ExactSplit),
        SplitMode::Percentage => Box::new(PercentageSplit),
    }
}

/// Compute the splits of an expense
///
/// # Errors
///
/// - `EmptyMemberSet` if `members` is empty
/// - `InvalidAllocation` if the allocation names a non-member, holds a
///   negative value, or (percentage mode) a value above 100
///
/// Allocation data is ignored in `Equal` mode.
pub fn calculate_splits(
    members: &[UserId],
    total: Decimal,
    mode: SplitMode,
    allocation: &Allocation,
) -> Result<Vec<Split>, LedgerError> {
    if members.is_empty() {
        return Err(LedgerError::EmptyMemberSet);
    }

    if mode != SplitMode::Equal {
        validate_allocation(members, allocation)?;
    }

    strategy_for(mode).calculate(members, total, allocation)
}

fn validate_allocation(members: &[UserId], allocation: &Allocation) -> Result<(), LedgerError> {
    // Sorted so the reported user is stable when several entries are bad
    let mut entries: Vec<_> = allocation.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (user, value) in entries {
        if !members.contains(user) {
            return Err(LedgerError::invalid_allocation(user, "not a group member"));
        }
        if *value < Decimal::ZERO {
            return Err(LedgerError::invalid_allocation(user, "negative value"));
        }
    }
    Ok(())
}
