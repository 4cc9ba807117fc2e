/// Samples averaged per leg for one temperature reading
pub const SAMPLES: u16 = 100;
/// Upper resistor in the thermistor divider in Ohms
pub const R_UPPER: f32 = 6800.0;
/// Thermistor resistance at 25*C in Ohms (AVX ND03M00472JCC)
pub const R_NTC_25: f32 = 4700.0;
/// B-coefficient of the thermistor
pub const B_NTC: f32 = 3950.0;
/// 0*C in kelvin
pub const ZERO_K_IN_C: f32 = 273.15;
/// 25*C in kelvin
pub const T_25_C_IN_K: f32 = ZERO_K_IN_C + 25.0;

// Analog to digital resolution
pub const ADC_RESOLUTION: f32 = 4096.0;
pub const ADC_MAX: u16 = 4095;

/// Voltage of a raw 0 reading (adjust as part of calibration)
pub const DEFAULT_OFFSET: f32 = 0.09;
/// Voltage of the internal reference, i.e. of a raw 4095 reading
/// (adjust as part of calibration)
pub const DEFAULT_VREF: f32 = 1.1;

/// Period between two logged readings in the firmware
pub const READ_INTERVAL_SECS: u64 = 1;
