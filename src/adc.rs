//! Calibrated reads from a single ADC channel.
//!
//! Raw counts are mapped linearly between two calibration endpoints: the
//! voltage of a raw 0 reading (`offset`) and the voltage of a full scale
//! reading (`vref`). Input attenuation is never used since it adds
//! non-linearity this model does not account for.

use core::fmt::Debug;
use core::marker::PhantomData;

use embedded_hal::adc::{Channel, OneShot};

use crate::consts::{ADC_RESOLUTION, DEFAULT_OFFSET, DEFAULT_VREF};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Attenuation {
    Db0,
    Db2_5,
    Db6,
    Db11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    pub resolution: Resolution,
    pub attenuation: Attenuation,
}

impl ChannelConfig {
    /// The only setup the calibration model is valid for
    pub const CALIBRATED: Self = Self {
        resolution: Resolution::Bits12,
        attenuation: Attenuation::Db0,
    };
}

/// Platform ADC driver as seen by a calibrated channel.
///
/// `Pin` is the opaque hardware channel selector.
pub trait AdcDriver<Pin> {
    type Error: Debug;

    /// One-time hardware setup of `pin`
    fn configure(
        &mut self,
        pin: &mut Pin,
        config: ChannelConfig,
    ) -> core::result::Result<(), Self::Error>;

    /// One blocking conversion, in `0..=4095`
    fn read_raw(&mut self, pin: &mut Pin) -> core::result::Result<u16, Self::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OneShotError<E> {
    /// The converter can't be set up like this
    Unsupported(ChannelConfig),
    Conversion(E),
}

/// Adapter for any embedded-hal `OneShot` converter with a fixed 12-bit
/// resolution and no input attenuation, e.g. the STM32F1 ADCs.
pub struct OneShotAdc<A, T> {
    adc: T,
    _adc: PhantomData<A>,
}

impl<A, T> OneShotAdc<A, T> {
    pub fn new(adc: T) -> Self {
        Self {
            adc,
            _adc: PhantomData,
        }
    }

    pub fn release(self) -> T {
        self.adc
    }
}

impl<A, T, Pin> AdcDriver<Pin> for OneShotAdc<A, T>
where
    T: OneShot<A, u16, Pin>,
    T::Error: Debug,
    Pin: Channel<A>,
{
    type Error = OneShotError<T::Error>;

    fn configure(
        &mut self,
        _pin: &mut Pin,
        config: ChannelConfig,
    ) -> core::result::Result<(), Self::Error> {
        if config != ChannelConfig::CALIBRATED {
            warn!("one-shot adc has a fixed 12-bit, 0dB input");
            return Err(OneShotError::Unsupported(config));
        }
        Ok(())
    }

    fn read_raw(&mut self, pin: &mut Pin) -> core::result::Result<u16, Self::Error> {
        nb::block!(self.adc.read(pin)).map_err(OneShotError::Conversion)
    }
}

/// Linear raw-to-voltage calibration
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Voltage of a raw 0 reading
    pub offset: f32,
    /// Voltage of the internal reference (raw reading of 4095)
    pub vref: f32,
}

impl Calibration {
    pub const DEFAULT: Self = Self {
        offset: DEFAULT_OFFSET,
        vref: DEFAULT_VREF,
    };

    pub const fn new(offset: f32, vref: f32) -> Self {
        Self { offset, vref }
    }

    /// Calibration through two measured (raw, volts) points.
    ///
    /// Used for field calibration: apply two known voltages to a channel
    /// and record the raw readings.
    pub fn from_two_points(raw_lo: u16, volts_lo: f32, raw_hi: u16, volts_hi: f32) -> Self {
        let step = (volts_hi - volts_lo) / (raw_hi as f32 - raw_lo as f32);
        let offset = volts_lo - step * raw_lo as f32;
        Self {
            offset,
            vref: offset + step * ADC_RESOLUTION,
        }
    }

    #[inline]
    pub fn to_voltage(&self, raw: u16) -> f32 {
        raw as f32 / ADC_RESOLUTION * (self.vref - self.offset) + self.offset
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One hardware channel read through a [`Calibration`].
pub struct CalibratedChannel<Pin> {
    pin: Pin,
    calibration: Calibration,
}

impl<Pin> CalibratedChannel<Pin> {
    /// Bind to `pin` and set it up for 12-bit, unattenuated conversions.
    pub fn new<D>(adc: &mut D, mut pin: Pin, calibration: Calibration) -> Result<Self, D::Error>
    where
        D: AdcDriver<Pin>,
    {
        adc.configure(&mut pin, ChannelConfig::CALIBRATED)
            .map_err(Error::Configuration)?;
        debug!("channel configured, offset {} vref {}", calibration.offset, calibration.vref);

        Ok(Self { pin, calibration })
    }

    pub fn read_raw<D>(&mut self, adc: &mut D) -> Result<u16, D::Error>
    where
        D: AdcDriver<Pin>,
    {
        adc.read_raw(&mut self.pin).map_err(Error::Read)
    }

    pub fn read_voltage<D>(&mut self, adc: &mut D) -> Result<f32, D::Error>
    where
        D: AdcDriver<Pin>,
    {
        let raw = self.read_raw(adc)?;
        Ok(self.calibration.to_voltage(raw))
    }

    /// Average `samples` raw readings, then convert the mean once.
    ///
    /// The mean is truncated to a whole count.
    pub fn read_voltage_averaged<D>(&mut self, adc: &mut D, samples: u16) -> Result<f32, D::Error>
    where
        D: AdcDriver<Pin>,
    {
        if samples == 0 {
            return Err(Error::InvalidArgument);
        }

        let mut sum: u32 = 0;
        for _ in 0..samples {
            sum += self.read_raw(adc)? as u32;
        }
        let raw = (sum / samples as u32) as u16;
        trace!("avg raw {} over {}", raw, samples);

        Ok(self.calibration.to_voltage(raw))
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Takes effect on the next conversion
    pub fn recalibrate(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn release(self) -> Pin {
        self.pin
    }
}
