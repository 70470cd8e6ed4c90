//! Closed-form reference solutions

/// `ln erfc(z)` for `z ≥ 0`
///
/// Chebyshev fit with fractional error below 1.2e-7 everywhere.
fn ln_erfc_positive(z: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398 + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    t.ln() - z * z + poly
}

/// Complementary error function
pub fn erfc(z: f64) -> f64 {
    if z >= 0.0 {
        ln_erfc_positive(z).exp()
    } else {
        2.0 - ln_erfc_positive(-z).exp()
    }
}

/// Ogata-Banks solution of `c_t = D c_xx - v c_x` on `x ≥ 0` with `c(0, t) = c0`
/// and an empty bed at `t = 0`
///
/// ```text
/// c / c0 = ½ [erfc((x - vt) / 2√(Dt)) + exp(vx/D) erfc((x + vt) / 2√(Dt))]
/// ```
///
/// The second term is evaluated in the log domain so that `exp(vx/D)` never
/// overflows.
pub fn ogata_banks(x: f64, t: f64, dispersion: f64, velocity: f64, c0: f64) -> f64 {
    if t <= 0.0 {
        return if x <= 0.0 { c0 } else { 0.0 };
    }

    let spread = 2.0 * (dispersion * t).sqrt();
    let front = erfc((x - velocity * t) / spread);
    let reflected = (velocity * x / dispersion + ln_erfc_positive((x + velocity * t) / spread)).exp();

    0.5 * c0 * (front + reflected)
}
