//! DSP Filter Wrappers
//!
//! IIR filters built from `biquad` second-order sections.
//!
//! # Supported Filters
//!
//! - **Butterworth low/high-pass** - orders 1..=8 as a cascade of sections
//!   with the Butterworth pole Q values, plus one first-order section for
//!   odd orders
//! - **Butterworth band-pass** - high-pass and low-pass at the band edges
//! - **Chebyshev I low-pass** - orders 1..=8, pole pairs mapped through the
//!   bilinear transform
//! - **RBJ low/high/band-pass** - a single cookbook section with explicit Q
//!
//! Every filter processes `f64` samples one at a time or in place over a
//! block, and can be reset to silence without losing its design.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

use super::{WrapperError, WrapperResult};

/// Common interface of every filter session
pub trait AudioFilter {
    fn process_sample(&mut self, sample: f64) -> f64;

    /// Filter `samples` in place
    fn process_block(&mut self, samples: &mut [f64]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Clear the delay lines
    fn reset(&mut self);

    /// Redesign for a new cutoff / centre frequency, keeping the rest
    fn set_frequency(&mut self, frequency: f64) -> WrapperResult<()>;
}

fn check_frequency(sample_rate: f64, frequency: f64) -> WrapperResult<()> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(WrapperError::InvalidArg(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }
    if !(frequency.is_finite() && frequency > 0.0 && frequency < sample_rate / 2.0) {
        return Err(WrapperError::InvalidArg(format!(
            "frequency {} must lie in (0, {})",
            frequency,
            sample_rate / 2.0
        )));
    }
    Ok(())
}

fn check_q(q: f64) -> WrapperResult<()> {
    if !(q.is_finite() && q > 0.0) {
        return Err(WrapperError::InvalidArg(format!("Q must be positive, got {}", q)));
    }
    Ok(())
}

fn design(kind: Type<f64>, sample_rate: f64, frequency: f64, q: f64) -> WrapperResult<Coefficients<f64>> {
    check_frequency(sample_rate, frequency)?;
    check_q(q)?;
    Coefficients::<f64>::from_params(kind, sample_rate.hz(), frequency.hz(), q)
        .map_err(|e| WrapperError::invalid("dsp", format!("{:?}", e)))
}

// =============================================================================
// Section cascade
// =============================================================================

/// Second-order sections run in series
#[derive(Debug, Clone)]
struct Cascade {
    designs: Vec<Coefficients<f64>>,
    sections: Vec<DirectForm2Transposed<f64>>,
}

impl Cascade {
    fn new(designs: Vec<Coefficients<f64>>) -> Self {
        let sections = designs
            .iter()
            .map(|c| DirectForm2Transposed::<f64>::new(*c))
            .collect();
        Self { designs, sections }
    }

    fn run(&mut self, sample: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(sample, |acc, section| section.run(acc))
    }

    fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.designs));
    }

    /// Swap in new coefficients without clearing the delay lines
    fn redesign(&mut self, designs: Vec<Coefficients<f64>>) {
        for (section, c) in self.sections.iter_mut().zip(&designs) {
            section.update_coefficients(*c);
        }
        self.designs = designs;
    }
}

// =============================================================================
// Bilinear transform
// =============================================================================

/// Prewarped analog frequency of `cutoff` for a prototype normalized to 1
fn prewarp(sample_rate: f64, cutoff: f64) -> f64 {
    (std::f64::consts::PI * cutoff / sample_rate).tan()
}

/// Digital first-order section for the analog pole at `-w`
fn first_order(high_pass: bool, k: f64, w: f64) -> Coefficients<f64> {
    let a0 = 1.0 + w * k;
    let (b0, b1) = if high_pass {
        (1.0 / a0, -1.0 / a0)
    } else {
        (w * k / a0, w * k / a0)
    };
    Coefficients {
        a1: (w * k - 1.0) / a0,
        a2: 0.0,
        b0,
        b1,
        b2: 0.0,
    }
}

/// Digital low-pass section for the analog pole pair with natural frequency
/// `w` and quality `q`; unity gain at DC
fn second_order_low_pass(k: f64, w: f64, q: f64) -> Coefficients<f64> {
    let wk = w * k;
    let a0 = 1.0 + wk / q + wk * wk;
    let b0 = wk * wk / a0;
    Coefficients {
        a1: (2.0 * wk * wk - 2.0) / a0,
        a2: (1.0 - wk / q + wk * wk) / a0,
        b0,
        b1: 2.0 * b0,
        b2: b0,
    }
}

fn check_order(order: usize) -> WrapperResult<()> {
    if !(1..=8).contains(&order) {
        return Err(WrapperError::NotSupported(format!("filter order {} (supported: 1..=8)", order)));
    }
    Ok(())
}

// =============================================================================
// Butterworth
// =============================================================================

/// Q of each second-order section of an order-`order` Butterworth filter;
/// odd orders add one first-order section
fn butterworth_qs(order: usize) -> Vec<f64> {
    (0..order / 2)
        .map(|k| {
            let angle = (2 * k + 1) as f64 * std::f64::consts::PI / (2 * order) as f64;
            1.0 / (2.0 * angle.sin())
        })
        .collect()
}

fn butterworth_designs(high_pass: bool, order: usize, sample_rate: f64, cutoff: f64) -> WrapperResult<Vec<Coefficients<f64>>> {
    check_order(order)?;
    let kind = if high_pass { Type::HighPass } else { Type::LowPass };
    let mut designs = butterworth_qs(order)
        .into_iter()
        .map(|q| design(kind, sample_rate, cutoff, q))
        .collect::<WrapperResult<Vec<_>>>()?;
    if order % 2 == 1 {
        check_frequency(sample_rate, cutoff)?;
        designs.push(first_order(high_pass, prewarp(sample_rate, cutoff), 1.0));
    }
    Ok(designs)
}

butterworth_filter!(ButterworthLowPass, false, "Butterworth low-pass of order 1..=8");
butterworth_filter!(ButterworthHighPass, true, "Butterworth high-pass of order 1..=8");

/// Lower and upper band edges around `centre`
fn band_edges(centre: f64, width: f64) -> WrapperResult<(f64, f64)> {
    if !(width.is_finite() && width > 0.0) {
        return Err(WrapperError::InvalidArg(format!("band width must be positive, got {}", width)));
    }
    Ok((centre - width / 2.0, centre + width / 2.0))
}

fn band_pass_designs(order: usize, sample_rate: f64, centre: f64, width: f64) -> WrapperResult<Vec<Coefficients<f64>>> {
    let (low, high) = band_edges(centre, width)?;
    let mut designs = butterworth_designs(true, order, sample_rate, low)?;
    designs.extend(butterworth_designs(false, order, sample_rate, high)?);
    Ok(designs)
}

/// Butterworth band-pass: an order-`order` high-pass at the lower band edge
/// in series with an order-`order` low-pass at the upper one
#[derive(Debug, Clone)]
pub struct ButterworthBandPass {
    order: usize,
    sample_rate: f64,
    centre: f64,
    width: f64,
    cascade: Cascade,
}

impl ButterworthBandPass {
    pub fn new(order: usize, sample_rate: f64, centre: f64, width: f64) -> WrapperResult<Self> {
        let designs = band_pass_designs(order, sample_rate, centre, width)?;
        Ok(Self {
            order,
            sample_rate,
            centre,
            width,
            cascade: Cascade::new(designs),
        })
    }

    pub fn centre(&self) -> f64 {
        self.centre
    }

    pub fn width(&self) -> f64 {
        self.width
    }
}

impl AudioFilter for ButterworthBandPass {
    fn process_sample(&mut self, sample: f64) -> f64 {
        self.cascade.run(sample)
    }

    fn reset(&mut self) {
        self.cascade.reset();
    }

    /// Move the band, keeping its width
    fn set_frequency(&mut self, frequency: f64) -> WrapperResult<()> {
        let designs = band_pass_designs(self.order, self.sample_rate, frequency, self.width)?;
        self.cascade.redesign(designs);
        self.centre = frequency;
        Ok(())
    }
}

// =============================================================================
// Chebyshev type I
// =============================================================================

fn chebyshev_designs(order: usize, sample_rate: f64, cutoff: f64, ripple_db: f64) -> WrapperResult<Vec<Coefficients<f64>>> {
    check_order(order)?;
    check_frequency(sample_rate, cutoff)?;
    if !(ripple_db.is_finite() && ripple_db > 0.0) {
        return Err(WrapperError::InvalidArg(format!("ripple must be positive dB, got {}", ripple_db)));
    }

    let epsilon = (10f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let v0 = (1.0 / epsilon).asinh() / order as f64;
    let k = prewarp(sample_rate, cutoff);

    let mut designs: Vec<Coefficients<f64>> = (0..order / 2)
        .map(|i| {
            let theta = (2 * i + 1) as f64 * std::f64::consts::PI / (2 * order) as f64;
            let re = v0.sinh() * theta.sin();
            let w = re.hypot(v0.cosh() * theta.cos());
            second_order_low_pass(k, w, w / (2.0 * re))
        })
        .collect();

    if order % 2 == 1 {
        designs.push(first_order(false, k, v0.sinh()));
    } else if let Some(first) = designs.first_mut() {
        // Even orders start the passband at the bottom of the ripple
        let gain = 1.0 / (1.0 + epsilon * epsilon).sqrt();
        first.b0 *= gain;
        first.b1 *= gain;
        first.b2 *= gain;
    }
    Ok(designs)
}

/// Chebyshev type I low-pass of order 1..=8 with `ripple_db` of passband
/// ripple; `cutoff` is the passband edge
#[derive(Debug, Clone)]
pub struct ChebyshevLowPass {
    order: usize,
    sample_rate: f64,
    cutoff: f64,
    ripple_db: f64,
    cascade: Cascade,
}

impl ChebyshevLowPass {
    pub fn new(order: usize, sample_rate: f64, cutoff: f64, ripple_db: f64) -> WrapperResult<Self> {
        let designs = chebyshev_designs(order, sample_rate, cutoff, ripple_db)?;
        Ok(Self {
            order,
            sample_rate,
            cutoff,
            ripple_db,
            cascade: Cascade::new(designs),
        })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn ripple_db(&self) -> f64 {
        self.ripple_db
    }
}

impl AudioFilter for ChebyshevLowPass {
    fn process_sample(&mut self, sample: f64) -> f64 {
        self.cascade.run(sample)
    }

    fn reset(&mut self) {
        self.cascade.reset();
    }

    fn set_frequency(&mut self, frequency: f64) -> WrapperResult<()> {
        let designs = chebyshev_designs(self.order, self.sample_rate, frequency, self.ripple_db)?;
        self.cascade.redesign(designs);
        self.cutoff = frequency;
        Ok(())
    }
}

// =============================================================================
// RBJ cookbook sections
// =============================================================================

macro_rules! rbj_filter {
    ($name:ident, $kind:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name {
            sample_rate: f64,
            frequency: f64,
            q: f64,
            cascade: Cascade,
        }

        impl $name {
            pub fn new(sample_rate: f64, frequency: f64, q: f64) -> WrapperResult<Self> {
                let coefficients = design($kind, sample_rate, frequency, q)?;
                Ok(Self {
                    sample_rate,
                    frequency,
                    q,
                    cascade: Cascade::new(vec![coefficients]),
                })
            }

            pub fn frequency(&self) -> f64 {
                self.frequency
            }

            pub fn q(&self) -> f64 {
                self.q
            }
        }

        impl AudioFilter for $name {
            fn process_sample(&mut self, sample: f64) -> f64 {
                self.cascade.run(sample)
            }

            fn reset(&mut self) {
                self.cascade.reset();
            }

            fn set_frequency(&mut self, frequency: f64) -> WrapperResult<()> {
                let coefficients = design($kind, self.sample_rate, frequency, self.q)?;
                self.cascade.redesign(vec![coefficients]);
                self.frequency = frequency;
                Ok(())
            }
        }
    };
}

rbj_filter!(RbjLowPass, Type::LowPass, "RBJ cookbook low-pass section");
rbj_filter!(RbjHighPass, Type::HighPass, "RBJ cookbook high-pass section");
rbj_filter!(RbjBandPass, Type::BandPass, "RBJ cookbook band-pass section (constant skirt gain, peak gain = Q)");

// =============================================================================
// Construction by kind
// =============================================================================

/// Filter designs selectable by number at the C ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FilterKind {
    ButterworthLowPass = 0,
    ButterworthHighPass = 1,
    RbjLowPass = 2,
    RbjHighPass = 3,
    RbjBandPass = 4,
    ButterworthBandPass = 5,
    ChebyshevLowPass = 6,
}

impl FilterKind {
    pub fn from_u32(kind: u32) -> WrapperResult<Self> {
        match kind {
            0 => Ok(FilterKind::ButterworthLowPass),
            1 => Ok(FilterKind::ButterworthHighPass),
            2 => Ok(FilterKind::RbjLowPass),
            3 => Ok(FilterKind::RbjHighPass),
            4 => Ok(FilterKind::RbjBandPass),
            5 => Ok(FilterKind::ButterworthBandPass),
            6 => Ok(FilterKind::ChebyshevLowPass),
            other => Err(WrapperError::InvalidArg(format!("unknown filter kind {}", other))),
        }
    }
}

/// Build any filter. `order` applies to Butterworth and Chebyshev kinds.
/// `shape` is the Q of RBJ kinds, the band width in Hz of the Butterworth
/// band-pass and the passband ripple in dB of the Chebyshev low-pass.
pub fn create_filter(
    kind: FilterKind,
    order: usize,
    sample_rate: f64,
    frequency: f64,
    shape: f64,
) -> WrapperResult<Box<dyn AudioFilter + Send>> {
    let filter: Box<dyn AudioFilter + Send> = match kind {
        FilterKind::ButterworthLowPass => {
            Box::new(ButterworthLowPass::new(order, sample_rate, frequency)?)
        }
        FilterKind::ButterworthHighPass => {
            Box::new(ButterworthHighPass::new(order, sample_rate, frequency)?)
        }
        FilterKind::RbjLowPass => Box::new(RbjLowPass::new(sample_rate, frequency, shape)?),
        FilterKind::RbjHighPass => Box::new(RbjHighPass::new(sample_rate, frequency, shape)?),
        FilterKind::RbjBandPass => Box::new(RbjBandPass::new(sample_rate, frequency, shape)?),
        FilterKind::ButterworthBandPass => {
            Box::new(ButterworthBandPass::new(order, sample_rate, frequency, shape)?)
        }
        FilterKind::ChebyshevLowPass => {
            Box::new(ChebyshevLowPass::new(order, sample_rate, frequency, shape)?)
        }
    };
    Ok(filter)
}
