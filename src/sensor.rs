//! Ratiometric NTC thermistor temperature sensor.
//!
//! ```text
//!   Vs ──┬──────────┐
//!        │          │
//!     R_upper       R
//!        ├── ntc    ├── ref
//!       NTC         R
//!        │          │
//!  GND ──┴──────────┘
//! ```
//!
//! The reference leg is a symmetric divider, so twice its voltage is the
//! supply seen by the thermistor leg.

#[allow(unused_imports)]
use micromath::F32Ext;

use crate::adc::{AdcDriver, CalibratedChannel, Calibration};
use crate::consts::{B_NTC, R_NTC_25, R_UPPER, SAMPLES, T_25_C_IN_K, ZERO_K_IN_C};
use crate::{Error, Result};

/// Fixed physical parameters of the divider and thermistor
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThermistorConfig {
    /// Samples averaged per leg for one reading
    pub samples: u16,
    /// Upper resistor in the voltage divider in Ohms
    pub r_upper: f32,
    /// Thermistor resistance at 25*C in Ohms
    pub r_ntc25: f32,
    /// Thermistor B-coefficient in kelvin
    pub b_ntc: f32,
}

impl ThermistorConfig {
    /// AVX ND03M00472JCC under a 6k8 upper resistor
    pub const ND03M00472: Self = Self {
        samples: SAMPLES,
        r_upper: R_UPPER,
        r_ntc25: R_NTC_25,
        b_ntc: B_NTC,
    };
}

impl Default for ThermistorConfig {
    fn default() -> Self {
        Self::ND03M00472
    }
}

/// Every intermediate value of one reading
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Doubled reference leg voltage
    pub reference_voltage: f32,
    pub thermistor_voltage: f32,
    /// Thermistor share of the divider
    pub fraction: f32,
    /// Thermistor resistance in Ohms
    pub resistance: f32,
    pub celsius: f32,
}

pub struct TemperatureSensor<T, R> {
    thermistor: CalibratedChannel<T>,
    reference: CalibratedChannel<R>,
    config: ThermistorConfig,
}

impl<T, R> TemperatureSensor<T, R> {
    pub fn new(thermistor: CalibratedChannel<T>, reference: CalibratedChannel<R>) -> Self {
        Self::with_config(thermistor, reference, ThermistorConfig::default())
    }

    pub fn with_config(
        thermistor: CalibratedChannel<T>,
        reference: CalibratedChannel<R>,
        config: ThermistorConfig,
    ) -> Self {
        Self {
            thermistor,
            reference,
            config,
        }
    }

    /// Temperature in degrees Celsius
    pub fn read<D, E>(&mut self, adc: &mut D) -> Result<f32, E>
    where
        D: AdcDriver<T, Error = E> + AdcDriver<R, Error = E>,
    {
        self.measure(adc).map(|m| m.celsius)
    }

    /// Take one fresh reading and keep the whole conversion chain.
    ///
    /// Fails with [`Error::SensorFault`] when the thermistor is open or
    /// shorted, i.e. its share of the divider is not strictly between 0
    /// and 1.
    pub fn measure<D, E>(&mut self, adc: &mut D) -> Result<Measurement, E>
    where
        D: AdcDriver<T, Error = E> + AdcDriver<R, Error = E>,
    {
        let samples = self.config.samples;
        let reference_voltage = 2.0 * self.reference.read_voltage_averaged(adc, samples)?;
        let thermistor_voltage = self.thermistor.read_voltage_averaged(adc, samples)?;
        trace!("v_ref {} v_ntc {}", reference_voltage, thermistor_voltage);

        let fraction = thermistor_voltage / reference_voltage;
        // also catches NaN from a dead reference
        if !(fraction > 0.0 && fraction < 1.0) {
            warn!("thermistor open or shorted, fraction {}", fraction);
            return Err(Error::SensorFault);
        }

        let resistance = divider_resistance(fraction, self.config.r_upper);
        trace!("r_ntc {}", resistance);

        let celsius = celsius_from_resistance(resistance, self.config.r_ntc25, self.config.b_ntc);
        trace!("C {}", celsius);

        Ok(Measurement {
            reference_voltage,
            thermistor_voltage,
            fraction,
            resistance,
            celsius,
        })
    }

    /// Apply one calibration to both legs
    pub fn recalibrate(&mut self, calibration: Calibration) {
        self.thermistor.recalibrate(calibration);
        self.reference.recalibrate(calibration);
    }

    pub fn config(&self) -> &ThermistorConfig {
        &self.config
    }

    pub fn release(self) -> (CalibratedChannel<T>, CalibratedChannel<R>) {
        (self.thermistor, self.reference)
    }
}

/// Lower resistor of a divider carrying `fraction` of the supply
#[inline]
pub fn divider_resistance(fraction: f32, r_upper: f32) -> f32 {
    fraction * r_upper / (1.0 - fraction)
}

/// B-parameter equation
pub fn celsius_from_resistance(resistance: f32, r_ntc25: f32, b_ntc: f32) -> f32 {
    let temp_k = (T_25_C_IN_K * b_ntc) / (T_25_C_IN_K * (resistance / r_ntc25).ln() + b_ntc);
    temp_k - ZERO_K_IN_C
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc::fake::FakeAdc;
    use crate::adc::OneShotAdc;
    use embedded_hal_mock::adc::{Mock, MockChan0, MockChan1, Transaction};

    const FOUR_SAMPLES: ThermistorConfig = ThermistorConfig {
        samples: 4,
        ..ThermistorConfig::ND03M00472
    };

    /// One millivolt per count
    const MILLIVOLTS: Calibration = Calibration::new(0.0, 4.096);

    fn fake_sensor(adc: &mut FakeAdc, calibration: Calibration) -> TemperatureSensor<u8, u8> {
        let thermistor = CalibratedChannel::new(adc, 0u8, calibration).unwrap();
        let reference = CalibratedChannel::new(adc, 1u8, calibration).unwrap();
        TemperatureSensor::with_config(thermistor, reference, FOUR_SAMPLES)
    }

    #[test]
    fn nominal_resistance_is_25_celsius() {
        let c = celsius_from_resistance(R_NTC_25, R_NTC_25, B_NTC);
        assert!((c - 25.0).abs() < 1e-3, "{}", c);
    }

    #[test]
    fn half_divider_equals_upper_resistor() {
        assert_eq!(divider_resistance(0.5, 6800.0), 6800.0);
    }

    #[test]
    fn hotter_means_lower_resistance() {
        let cold = celsius_from_resistance(10_000.0, R_NTC_25, B_NTC);
        let warm = celsius_from_resistance(2_000.0, R_NTC_25, B_NTC);
        assert!(cold < 25.0);
        assert!(warm > 25.0);
    }

    #[test]
    fn end_to_end_matches_b_parameter_chain() {
        // reference leg first, then the thermistor leg
        let expectations: [Transaction<u16>; 8] = [
            Transaction::read(1, 1866),
            Transaction::read(1, 1866),
            Transaction::read(1, 1866),
            Transaction::read(1, 1866),
            Transaction::read(0, 1866),
            Transaction::read(0, 1866),
            Transaction::read(0, 1866),
            Transaction::read(0, 1866),
        ];
        let mut adc = OneShotAdc::new(Mock::new(&expectations));
        let thermistor =
            CalibratedChannel::new(&mut adc, MockChan0 {}, Calibration::DEFAULT).unwrap();
        let reference =
            CalibratedChannel::new(&mut adc, MockChan1 {}, Calibration::DEFAULT).unwrap();
        let mut sensor = TemperatureSensor::with_config(thermistor, reference, FOUR_SAMPLES);

        let m = sensor.measure(&mut adc).unwrap();

        assert!((m.thermistor_voltage - 0.55).abs() < 1e-3);
        assert!((m.reference_voltage - 1.1).abs() < 2e-3);
        assert_eq!(m.fraction, 0.5);
        assert_eq!(m.resistance, 6800.0);

        let expected = 1.0 / (1.0 / 298.15 + (6800.0f64 / 4700.0).ln() / 3950.0) - 273.15;
        assert!((m.celsius as f64 - expected).abs() < 0.01, "{} vs {}", m.celsius, expected);
        assert!((m.celsius - 16.91).abs() < 0.01);
        adc.release().done();
    }

    #[test]
    fn nominal_divider_reads_25_celsius() {
        // 4k7 under 6k8 from a 2.3V supply puts 0.94V across the thermistor
        let mut adc = FakeAdc::new([940, 1150]);
        let mut sensor = fake_sensor(&mut adc, MILLIVOLTS);

        let c = sensor.read(&mut adc).unwrap();
        assert!((c - 25.0).abs() < 0.05, "{}", c);
        assert_eq!(adc.reads, 8);
    }

    #[test]
    fn open_thermistor_is_a_fault() {
        let mut adc = FakeAdc::new([2000, 1000]);
        let mut sensor = fake_sensor(&mut adc, MILLIVOLTS);

        assert_eq!(sensor.read(&mut adc), Err(Error::SensorFault));
    }

    #[test]
    fn shorted_thermistor_is_a_fault() {
        let mut adc = FakeAdc::new([0, 1000]);
        let mut sensor = fake_sensor(&mut adc, MILLIVOLTS);

        assert_eq!(sensor.read(&mut adc), Err(Error::SensorFault));
    }

    #[test]
    fn dead_reference_is_a_fault() {
        let mut adc = FakeAdc::new([0, 0]);
        let mut sensor = fake_sensor(&mut adc, MILLIVOLTS);

        assert_eq!(sensor.read(&mut adc), Err(Error::SensorFault));
    }

    #[test]
    fn read_failure_propagates() {
        let mut adc = FakeAdc::new([940, 1150]);
        let mut sensor = fake_sensor(&mut adc, MILLIVOLTS);
        adc.fail_read = true;

        assert_eq!(sensor.read(&mut adc), Err(Error::Read(())));
    }

    #[test]
    fn zero_samples_is_rejected() {
        let mut adc = FakeAdc::new([940, 1150]);
        let thermistor = CalibratedChannel::new(&mut adc, 0u8, MILLIVOLTS).unwrap();
        let reference = CalibratedChannel::new(&mut adc, 1u8, MILLIVOLTS).unwrap();
        let config = ThermistorConfig {
            samples: 0,
            ..ThermistorConfig::default()
        };
        let mut sensor = TemperatureSensor::with_config(thermistor, reference, config);

        assert_eq!(sensor.read(&mut adc), Err(Error::InvalidArgument));
        assert_eq!(adc.reads, 0);
    }

    #[test]
    fn readings_are_independent() {
        let mut adc = FakeAdc::new([940, 1150]);
        let mut sensor = fake_sensor(&mut adc, MILLIVOLTS);

        let first = sensor.read(&mut adc).unwrap();
        adc.raw = [2000, 1000];
        assert_eq!(sensor.read(&mut adc), Err(Error::SensorFault));
        adc.raw = [940, 1150];
        assert_eq!(sensor.read(&mut adc), Ok(first));
    }

    #[test]
    fn recalibration_reaches_both_legs() {
        let mut adc = FakeAdc::new([940, 1150]);
        let mut sensor = fake_sensor(&mut adc, Calibration::DEFAULT);

        sensor.recalibrate(MILLIVOLTS);
        let (thermistor, reference) = sensor.release();
        assert_eq!(thermistor.calibration(), MILLIVOLTS);
        assert_eq!(reference.calibration(), MILLIVOLTS);
        assert_eq!(adc.configured, 2);
    }
}
