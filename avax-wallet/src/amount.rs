//! Token amounts.
//!
//! Amounts are denominated in nanoAVAX and never rounded: sums are computed
//! on a 256-bit integer and overflow is reported instead of wrapping.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{WalletError, WalletResult};

/// A non-negative token amount in nanoAVAX.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(U256);

impl Amount {
    /// The zero amount
    pub const ZERO: Amount = Amount(U256([0; 4]));

    /// Whether this amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Add two amounts, failing on overflow
    pub fn checked_add(self, other: Amount) -> WalletResult<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(WalletError::AmountOverflow)
    }

    /// Sum a sequence of amounts, failing on overflow
    pub fn sum<'a>(amounts: impl IntoIterator<Item = &'a Amount>) -> WalletResult<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |total, amount| total.checked_add(*amount))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(U256::from(value))
    }
}

impl FromStr for Amount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = |reason: &str| WalletError::InvalidAmount {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty input"));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("not a non-negative integer"));
        }

        U256::from_dec_str(trimmed)
            .map(Amount)
            .map_err(|_| invalid("value out of range"))
    }
}

impl TryFrom<String> for Amount {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a transfer amount given on the command line.
///
/// Zero is rejected since a transfer of nothing is always an operator mistake.
pub fn parse_amount(input: &str) -> WalletResult<Amount> {
    let amount: Amount = input.parse()?;
    if amount.is_zero() {
        return Err(WalletError::InvalidAmount {
            input: input.to_string(),
            reason: "amount must be greater than 0".to_string(),
        });
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000").unwrap(), Amount::from(1000));
        assert_eq!(parse_amount(" 42 ").unwrap(), Amount::from(42));
    }

    #[test]
    fn test_parse_amount_rejects_bad_input() {
        for input in ["", "abc", "-5", "1.5", "0"] {
            let err = parse_amount(input).unwrap_err();
            assert!(matches!(err, WalletError::InvalidAmount { .. }), "{input}");
            assert!(err.to_string().contains("nanoAVAX"));
        }
    }

    #[test]
    fn test_large_values_are_not_truncated() {
        let big = "340282366920938463463374607431768211456"; // 2^128
        let amount: Amount = big.parse().unwrap();
        assert_eq!(amount.to_string(), big);

        let doubled = amount.checked_add(amount).unwrap();
        assert_eq!(doubled.to_string(), "680564733841876926926749214863536422912");
    }

    #[test]
    fn test_sum_and_overflow() {
        let amounts = [Amount::from(500), Amount::from(1000)];
        assert_eq!(Amount::sum(&amounts).unwrap(), Amount::from(1500));

        let max = Amount(U256::MAX);
        assert!(matches!(
            max.checked_add(Amount::from(1)),
            Err(WalletError::AmountOverflow)
        ));
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let amount = Amount::from(1500);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"1500\"");
        let parsed: Amount = serde_json::from_str("\"1500\"").unwrap();
        assert_eq!(parsed, amount);
    }
}
