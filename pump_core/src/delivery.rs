//! Delivery-volume arithmetic with an explicit 32-bit register.
//!
//! The firmware computes `rate * elapsed_ms * 1000` in an unsigned 32-bit
//! register before scaling down. Small (UI-capped) inputs fit; admin inputs
//! can exceed `u32::MAX` and the register silently keeps only the low 32
//! bits. Everything here is computed exactly in `u128` first and then
//! reduced modulo 2^32, so the wrap is bit-exact and reproducible instead of
//! depending on float widening.
//!
//! Units: the product is divided by [`MS_PER_HOUR`] to get microliters and by
//! [`UL_PER_ML`] to get milliliters. Fractions are preserved.

/// Size of the 32-bit register's value space (2^32).
pub const U32_MODULUS: u128 = 1 << 32;
/// Largest value the register holds without wrapping (2^32 - 1).
pub const U32_MAX: u128 = U32_MODULUS - 1;
/// Milliseconds in one hour.
pub const MS_PER_HOUR: u64 = 3_600_000;
/// Microliters in one milliliter.
pub const UL_PER_ML: u64 = 1_000;

/// Every stage of one delivery calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryCalc {
    pub rate_ml_per_hour: u32,
    pub elapsed_ms: u64,
    /// `rate * elapsed_ms * 1000`, computed without loss.
    pub intermediate: u128,
    /// What the 32-bit register holds after the multiplication.
    pub register: u32,
    /// True when `intermediate` did not fit and was reduced modulo 2^32.
    pub wrapped: bool,
    /// Milliliters derived from `register` (what the pump delivers).
    pub delivered_ml: f64,
    /// Milliliters derived from `intermediate` (what it should deliver).
    pub unbounded_ml: f64,
}

impl DeliveryCalc {
    /// Volume lost to the wrap, in milliliters (0 when nothing wrapped).
    pub fn shortfall_ml(&self) -> f64 {
        self.unbounded_ml - self.delivered_ml
    }
}

/// `rate * elapsed_ms * 1000` without overflow.
#[inline]
pub fn intermediate(rate_ml_per_hour: u32, elapsed_ms: u64) -> u128 {
    u128::from(rate_ml_per_hour) * u128::from(elapsed_ms) * u128::from(UL_PER_ML)
}

/// Reduce a value into the 32-bit register (mod 2^32).
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn wrap_u32(value: u128) -> u32 {
    // remainder < 2^32, the cast is lossless
    (value % U32_MODULUS) as u32
}

/// Convert a register/intermediate value to milliliters.
#[inline]
#[allow(clippy::cast_precision_loss)]
fn to_ml(value: u128) -> f64 {
    let microliters = value as f64 / MS_PER_HOUR as f64;
    microliters / UL_PER_ML as f64
}

/// Full breakdown of one delivery calculation.
pub fn breakdown(rate_ml_per_hour: u32, elapsed_ms: u64) -> DeliveryCalc {
    let intermediate = intermediate(rate_ml_per_hour, elapsed_ms);
    let wrapped = intermediate > U32_MAX;
    let register = wrap_u32(intermediate);
    DeliveryCalc {
        rate_ml_per_hour,
        elapsed_ms,
        intermediate,
        register,
        wrapped,
        delivered_ml: to_ml(u128::from(register)),
        unbounded_ml: to_ml(intermediate),
    }
}

/// Volume (ml) the firmware delivers for `elapsed_ms` at `rate_ml_per_hour`,
/// including the 32-bit wrap.
#[inline]
pub fn delivery_volume_ml(rate_ml_per_hour: u32, elapsed_ms: u64) -> f64 {
    to_ml(u128::from(wrap_u32(intermediate(rate_ml_per_hour, elapsed_ms))))
}

/// Whole milliliters the pump should deliver over `duration_ms`, using
/// unbounded integer math (floor).
#[inline]
#[allow(clippy::cast_precision_loss)]
pub fn expected_whole_ml(rate_ml_per_hour: u32, duration_ms: u64) -> f64 {
    let whole = intermediate(rate_ml_per_hour, duration_ms)
        / u128::from(MS_PER_HOUR)
        / u128::from(UL_PER_ML);
    whole as f64
}

/// `floor(volume / rate * 3_600_000)`; negative or NaN inputs map to 0.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn duration_ms_for_volume(volume_ml: f64, rate_ml_per_hour: u32) -> u64 {
    let ms = (volume_ml / f64::from(rate_ml_per_hour)) * MS_PER_HOUR as f64;
    // float -> int casts saturate
    ms.floor() as u64
}

/// `floor(rate * duration_ms / 3_600_000)` in milliliters.
#[inline]
#[allow(clippy::cast_precision_loss)]
pub fn volume_ml_for_duration(rate_ml_per_hour: u32, duration_ms: u64) -> f64 {
    let whole = u128::from(rate_ml_per_hour) * u128::from(duration_ms) / u128::from(MS_PER_HOUR);
    whole as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_delivers_without_wrap() {
        // 100 ml/hr for 500 ms
        let calc = breakdown(100, 500);
        assert_eq!(calc.intermediate, 50_000_000);
        assert!(!calc.wrapped);
        assert_eq!(u128::from(calc.register), calc.intermediate);
        assert!((calc.delivered_ml - 100.0 * 500.0 / 3_600_000.0).abs() < 1e-12);
        assert!(calc.shortfall_ml().abs() < 1e-12);
    }

    #[test]
    fn boundary_value_does_not_wrap() {
        // 1 ml/hr for 4_294_967 ms is the largest whole-ms slice that fits
        let calc = breakdown(1, 4_294_967);
        assert_eq!(calc.intermediate, 4_294_967_000);
        assert!(!calc.wrapped);
    }

    #[test]
    fn exact_modulus_wraps_to_zero() {
        // 2^22 ml/hr * 2^10 ms * 1000 = 1000 * 2^32
        let rate = 1 << 22;
        let calc = breakdown(rate, 1_024);
        assert_eq!(calc.intermediate, U32_MODULUS * 1000);
        assert!(calc.wrapped);
        assert_eq!(calc.register, 0);
        assert_eq!(calc.delivered_ml, 0.0);
    }

    #[test]
    fn five_hours_at_5000_wraps_to_under_a_milliliter() {
        let calc = breakdown(5000, 18_000_000);
        assert_eq!(calc.intermediate, 90_000_000_000_000);
        assert!(calc.wrapped);
        assert_eq!(calc.register, 3_255_279_616);
        assert!((calc.unbounded_ml - 25_000.0).abs() < 1e-9);
        assert!((calc.delivered_ml - 0.904_244_337_777_777_8).abs() < 1e-12);
        assert_eq!(calc.delivered_ml, delivery_volume_ml(5000, 18_000_000));
    }

    #[test]
    fn reference_overflow_duration_from_demo() {
        // 1000 ml/hr for 4_294_968 ms: just past the register limit
        let calc = breakdown(1000, 4_294_968);
        assert!(calc.wrapped);
        assert_eq!(calc.register, 704_000);
        assert_eq!(expected_whole_ml(1000, 4_294_968), 1193.0);
    }

    #[test]
    fn derivations_floor() {
        assert_eq!(duration_ms_for_volume(500.0, 100), 18_000_000);
        assert_eq!(duration_ms_for_volume(500.0, 7), 257_142_857);
        assert_eq!(duration_ms_for_volume(-5.0, 100), 0);
        assert_eq!(volume_ml_for_duration(100, 3_600_000), 100.0);
        assert_eq!(volume_ml_for_duration(7, 1_000_000), 1.0);
    }
}
