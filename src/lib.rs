//! Calibrated NTC thermistor temperature readings from a 12-bit ADC.
//!
//! The thermistor sits in a voltage divider under a fixed upper resistor.
//! A second ADC channel measures half of a symmetric reference divider, so
//! the temperature is computed ratiometrically and supply drift cancels out.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod adc;
pub mod consts;
pub mod sensor;

pub use adc::{
    AdcDriver, Attenuation, Calibration, CalibratedChannel, ChannelConfig,
    OneShotAdc, OneShotError, Resolution,
};
pub use sensor::{Measurement, TemperatureSensor, ThermistorConfig};

/// Result type used by the conversion pipeline, generic over the error of
/// the underlying ADC driver.
pub type Result<T, E> = ::core::result::Result<T, Error<E>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The driver could not set up the channel; no sensor without it
    Configuration(E),
    /// Averaging over zero samples was requested
    InvalidArgument,
    /// The driver failed a conversion
    Read(E),
    /// Divider fraction outside (0, 1): open or shorted thermistor
    SensorFault,
}
