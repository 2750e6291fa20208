use cinepack_schema::SchemaError;

/// Widest sample depth a lookup table is built for.
pub const MAX_LUT_BIT_DEPTH: u32 = 24;

/// A transfer function mapping stored sample values to linear light.
///
/// Two functions are only ever approximately equal when they are the same
/// variant; there is no coercion between variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferFunction {
    ModifiedGamma(ModifiedGammaTransferFunction),
    Gamma(GammaTransferFunction),
}

impl TransferFunction {
    /// Lookup table with `2^bit_depth` entries indexed by sample value.
    pub fn make_lut(&self, bit_depth: u32) -> Result<Vec<f64>, SchemaError> {
        if bit_depth > MAX_LUT_BIT_DEPTH {
            return Err(SchemaError::InvalidValue {
                field: "bit depth".to_owned(),
                value: bit_depth.to_string(),
            });
        }
        let len = 1usize << bit_depth;
        let max = (len - 1).max(1) as f64;
        Ok((0..len)
            .map(|i| {
                let p = i as f64 / max;
                match self {
                    TransferFunction::ModifiedGamma(f) => f.apply(p),
                    TransferFunction::Gamma(f) => f.apply(p),
                }
            })
            .collect())
    }

    /// Parameter-wise comparison; every parameter must be within `epsilon`.
    pub fn about_equal(&self, other: &TransferFunction, epsilon: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= epsilon;
        match (self, other) {
            (TransferFunction::ModifiedGamma(a), TransferFunction::ModifiedGamma(b)) => {
                close(a.power, b.power)
                    && close(a.threshold, b.threshold)
                    && close(a.a, b.a)
                    && close(a.b, b.b)
            }
            (TransferFunction::Gamma(a), TransferFunction::Gamma(b)) => close(a.power, b.power),
            _ => false,
        }
    }
}

/// Piecewise gamma: `((p + A) / (1 + A))^power` above `threshold`, `p / B`
/// at or below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModifiedGammaTransferFunction {
    power: f64,
    threshold: f64,
    a: f64,
    b: f64,
}

impl ModifiedGammaTransferFunction {
    pub const fn new(power: f64, threshold: f64, a: f64, b: f64) -> Self {
        Self {
            power,
            threshold,
            a,
            b,
        }
    }

    /// The sRGB decoding curve.
    pub const fn srgb() -> Self {
        Self::new(2.4, 0.040_45, 0.055, 12.92)
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    fn apply(&self, p: f64) -> f64 {
        if p > self.threshold {
            ((p + self.a) / (1.0 + self.a)).powf(self.power)
        } else {
            p / self.b
        }
    }
}

/// Plain power law, `p^power`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaTransferFunction {
    power: f64,
}

impl GammaTransferFunction {
    pub const fn new(power: f64) -> Self {
        Self { power }
    }

    /// The DCI projection gamma of 2.6.
    pub const fn dci() -> Self {
        Self::new(2.6)
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    fn apply(&self, p: f64) -> f64 {
        p.powf(self.power)
    }
}

impl From<ModifiedGammaTransferFunction> for TransferFunction {
    fn from(f: ModifiedGammaTransferFunction) -> Self {
        TransferFunction::ModifiedGamma(f)
    }
}

impl From<GammaTransferFunction> for TransferFunction {
    fn from(f: GammaTransferFunction) -> Self {
        TransferFunction::Gamma(f)
    }
}
