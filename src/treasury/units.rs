//! Wei ↔ whole-token conversions.
//!
//! Values are carried as `U256` wei everywhere. The classifier compares at
//! 6-decimal (micro-token) precision; reporting converts without rounding.

use alloy::primitives::U256;

/// Wei per micro-token (10^18 / 10^6).
pub const WEI_PER_MICRO: u64 = 1_000_000_000_000;

/// Micro-tokens per whole token.
pub const MICRO_PER_TOKEN: f64 = 1_000_000.0;

/// Convert wei to micro-tokens, rounding half up.
pub fn to_micro_tokens(wei: U256) -> U256 {
    let unit = U256::from(WEI_PER_MICRO);
    wei.saturating_add(unit / U256::from(2u8)) / unit
}

/// Wei per whole token.
pub const WEI_PER_TOKEN: u64 = 1_000_000_000_000_000_000;

/// Convert wei to whole tokens without rounding. Saturates far above any real supply.
pub fn to_whole_tokens(wei: U256) -> f64 {
    let unit = U256::from(WEI_PER_TOKEN);
    let whole = u128::try_from(wei / unit).unwrap_or(u128::MAX);
    let frac = u128::try_from(wei % unit).unwrap_or_default();
    whole as f64 + frac as f64 / WEI_PER_TOKEN as f64
}

/// Convert a whole-token amount to micro-tokens. Negative or NaN inputs map to zero.
pub fn tokens_to_micro(tokens: f64) -> u128 {
    let micro = (tokens * MICRO_PER_TOKEN).round();
    if micro.is_nan() || micro <= 0.0 {
        0
    } else {
        micro as u128
    }
}

/// Whole tokens expressed in wei (test and fixture helper).
pub fn tokens_to_wei(tokens: f64) -> U256 {
    U256::from(tokens_to_micro(tokens)) * U256::from(WEI_PER_MICRO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_token() {
        let one = U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(to_micro_tokens(one), U256::from(1_000_000u64));
        assert_eq!(to_whole_tokens(one), 1.0);
    }

    #[test]
    fn test_rounds_to_six_decimals() {
        // 0.0000015 tokens rounds up to 0.000002
        let wei = U256::from(1_500_000_000_000u64);
        assert_eq!(to_micro_tokens(wei), U256::from(2u64));
        // 0.00000049 tokens rounds down to zero
        assert_eq!(to_micro_tokens(U256::from(490_000_000_000u64)), U256::ZERO);
    }

    #[test]
    fn test_token_round_trip_helpers() {
        assert_eq!(tokens_to_micro(0.01), 10_000);
        assert_eq!(tokens_to_micro(-3.0), 0);
        assert_eq!(to_whole_tokens(tokens_to_wei(0.6)), 0.6);
    }

    #[test]
    fn test_whole_tokens_keeps_dust() {
        assert_eq!(to_whole_tokens(U256::from(400_000_000_000u64)), 4e-7);
        assert_eq!(to_whole_tokens(U256::from(1u64)), 1e-18);
        assert_eq!(to_whole_tokens(U256::ZERO), 0.0);
    }

    #[test]
    fn test_saturates_on_max() {
        assert!(to_whole_tokens(U256::MAX) > 0.0);
    }
}
