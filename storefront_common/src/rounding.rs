use crate::Cents;

/// Integer division rounded half-up. Used for prorated monetary amounts (per-line tax and similar),
/// where compatibility requires `round(n/d)` with ties going away from zero-point-five upwards.
///
/// Panics in debug builds if `denominator` is zero, like ordinary integer division.
pub fn round_half_up(numerator: i64, denominator: i64) -> i64 {
    debug_assert!(denominator > 0, "denominator must be positive");
    if numerator >= 0 {
        (numerator + denominator / 2) / denominator
    } else {
        -((-numerator + denominator / 2) / denominator)
    }
}

impl Cents {
    /// Prorates this amount by `rate / period`, rounding half-up.
    pub fn prorate(&self, rate: i64, period: i64) -> Cents {
        Cents::from(round_half_up(self.value() * rate, period))
    }
}
