//! DSP Exports
//!
//! IIR filter sessions behind handles. `kind` selects the design:
//!
//! | kind | design                  | uses                          |
//! |------|-------------------------|-------------------------------|
//! | 0    | Butterworth low-pass    | `order`                       |
//! | 1    | Butterworth high-pass   | `order`                       |
//! | 2    | RBJ low-pass            | `q`                           |
//! | 3    | RBJ high-pass           | `q`                           |
//! | 4    | RBJ band-pass           | `q`                           |
//! | 5    | Butterworth band-pass   | `order`, `q` as width in Hz   |
//! | 6    | Chebyshev I low-pass    | `order`, `q` as ripple in dB  |

use parking_lot::Mutex;

use super::{guard, host_out};
use crate::runtime::{Handle, HandleTable};
use crate::wrappers::dsp::{create_filter, AudioFilter, FilterKind};
use crate::wrappers::WrapperError;

type FilterBox = Box<dyn AudioFilter + Send>;

lazy_static::lazy_static! {
    static ref FILTERS: Mutex<HandleTable<FilterBox>> = Mutex::new(HandleTable::new("dsp_filter"));
}

fn not_found(handle: Handle) -> WrapperError {
    WrapperError::HandleNotFound(handle.into())
}

/// Design a filter; returns its handle, 0 for invalid parameters
#[no_mangle]
pub extern "C" fn dsp_filter_create(kind: u32, order: u32, sample_rate: f64, frequency: f64, q: f64) -> Handle {
    guard("dsp_filter_create", 0, || {
        let filter = create_filter(FilterKind::from_u32(kind)?, order as usize, sample_rate, frequency, q)?;
        Ok(FILTERS.lock().insert(filter))
    })
}

/// Filter one sample; NaN for an unknown handle
#[no_mangle]
pub extern "C" fn dsp_process_sample(handle: Handle, sample: f64) -> f64 {
    guard("dsp_process_sample", f64::NAN, || {
        FILTERS
            .lock()
            .with_mut(handle, |filter| filter.process_sample(sample))
            .ok_or_else(|| not_found(handle))
    })
}

/// Filter `n` samples in place; 1 on success, 0 on error
///
/// # Safety
///
/// `samples` must be valid for `n` reads and writes.
#[no_mangle]
pub unsafe extern "C" fn dsp_process_block(handle: Handle, samples: *mut f64, n: usize) -> i32 {
    guard("dsp_process_block", 0, || {
        let mut block = host_out(samples, n)?;
        FILTERS
            .lock()
            .with_mut(handle, |filter| filter.process_block(block.as_mut_slice()))
            .ok_or_else(|| not_found(handle))?;
        Ok(1)
    })
}

/// Clear the filter's delay lines; 1 on success, 0 on error
#[no_mangle]
pub extern "C" fn dsp_reset(handle: Handle) -> i32 {
    guard("dsp_reset", 0, || {
        FILTERS
            .lock()
            .with_mut(handle, |filter| filter.reset())
            .ok_or_else(|| not_found(handle))?;
        Ok(1)
    })
}

/// Redesign for a new cutoff / centre frequency; 1 on success, 0 on error
/// (the previous design stays in effect)
#[no_mangle]
pub extern "C" fn dsp_set_cutoff(handle: Handle, frequency: f64) -> i32 {
    guard("dsp_set_cutoff", 0, || {
        FILTERS
            .lock()
            .with_mut(handle, |filter| filter.set_frequency(frequency))
            .ok_or_else(|| not_found(handle))??;
        Ok(1)
    })
}

/// Destroy a filter. 1 when it existed, 0 otherwise.
#[no_mangle]
pub extern "C" fn dsp_filter_destroy(handle: Handle) -> i32 {
    guard("dsp_filter_destroy", 0, || Ok(FILTERS.lock().remove(handle).is_some() as i32))
}
