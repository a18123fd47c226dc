use rust_decimal::Decimal;

/// Fixed-scale arithmetic for vote values.
///
/// Addition and subtraction are exact. Multiplication and division keep the
/// configured number of decimal places and truncate toward zero; whatever the
/// truncation drops is surfaced by the engine as residual surplus instead of
/// disappearing silently.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) struct VoteArith {
    scale: u32,
}

impl VoteArith {
    pub(crate) fn new(decimal_places: u8) -> VoteArith {
        VoteArith {
            scale: decimal_places as u32,
        }
    }

    /// Full-precision product, truncated to the configured scale.
    pub(crate) fn mul(&self, a: Decimal, b: Decimal) -> Decimal {
        (a * b).trunc_with_scale(self.scale)
    }

    /// Quotient truncated to the configured scale.
    pub(crate) fn div(&self, a: Decimal, b: Decimal) -> Decimal {
        (a / b).trunc_with_scale(self.scale)
    }

    /// Integer part of the quotient.
    pub(crate) fn div_integral(&self, a: Decimal, b: Decimal) -> Decimal {
        (a / b).trunc()
    }

    /// `10^(-scale)`, the augend for non-integer winning thresholds.
    pub(crate) fn smallest_unit(&self) -> Decimal {
        Decimal::new(1, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn division_truncates_toward_zero() {
        let arith = VoteArith::new(4);
        assert_eq!(arith.div(d("26"), d("60")), d("0.4333"));
        assert_eq!(arith.div(d("1"), d("3")), d("0.3333"));
    }

    #[test]
    fn multiplication_truncates_toward_zero() {
        let arith = VoteArith::new(4);
        assert_eq!(arith.mul(d("0.4333"), d("0.4333")), d("0.1877"));
        assert_eq!(arith.mul(d("1"), d("0.4333")), d("0.4333"));
    }

    #[test]
    fn integral_division_floors() {
        let arith = VoteArith::new(4);
        assert_eq!(arith.div_integral(d("10"), d("2")), d("5"));
        assert_eq!(arith.div_integral(d("100"), d("3")), d("33"));
    }

    #[test]
    fn smallest_unit_matches_scale() {
        assert_eq!(VoteArith::new(4).smallest_unit(), d("0.0001"));
        assert_eq!(VoteArith::new(1).smallest_unit(), d("0.1"));
    }
}
