//! Logs the thermistor temperature once a second.
//!
//! PA4 measures the thermistor leg, PA5 the midpoint of the reference
//! divider.

#![no_main]
#![no_std]

use core::sync::atomic::{AtomicUsize, Ordering};

// global logger
use defmt_rtt as _;
use panic_probe as _;

// same panicking *behavior* as `panic-probe` but doesn't print a panic message
// this prevents the panic message being printed *twice* when `defmt::panic` is
// invoked
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

static COUNT: AtomicUsize = AtomicUsize::new(0);
defmt::timestamp!("{=usize}", {
    // NOTE(no-CAS) `timestamps` runs with interrupts disabled
    let n = COUNT.load(Ordering::Relaxed);
    COUNT.store(n + 1, Ordering::Relaxed);
    n
});

#[rtic::app(device = stm32f1xx_hal::pac, peripherals = true, dispatchers = [USART1])]
mod app {
    use ntc_firmware::{
        consts::READ_INTERVAL_SECS, CalibratedChannel, Calibration, Error,
        OneShotAdc, TemperatureSensor,
    };
    use stm32f1xx_hal::{
        adc::Adc,
        gpio::{
            gpioa::{PA4, PA5},
            Analog,
        },
        pac::ADC1,
        prelude::*,
    };
    use systick_monotonic::{fugit::ExtU64, Systick};

    type Adc1 = OneShotAdc<ADC1, Adc<ADC1>>;

    #[monotonic(binds = SysTick, default = true)]
    type MonoTimer = Systick<1000>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        adc: Adc1,
        sensor: TemperatureSensor<PA4<Analog>, PA5<Analog>>,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let mut flash = cx.device.FLASH.constrain();
        let rcc = cx.device.RCC.constrain();

        let clocks = rcc
            .cfgr
            .use_hse(8.MHz())
            .sysclk(48.MHz())
            .pclk1(24.MHz())
            .adcclk(2.MHz())
            .freeze(&mut flash.acr);
        defmt::println!("adc freq: {}", clocks.adcclk().raw());

        let mono = Systick::new(cx.core.SYST, 48_000_000);

        let mut gpioa = cx.device.GPIOA.split();
        let thermistor_pin = gpioa.pa4.into_analog(&mut gpioa.crl);
        let reference_pin = gpioa.pa5.into_analog(&mut gpioa.crl);

        let mut adc = OneShotAdc::new(Adc::adc1(cx.device.ADC1, clocks));

        let thermistor =
            CalibratedChannel::new(&mut adc, thermistor_pin, Calibration::DEFAULT)
                .unwrap_or_else(|e| defmt::panic!("thermistor channel: {}", e));
        let reference =
            CalibratedChannel::new(&mut adc, reference_pin, Calibration::DEFAULT)
                .unwrap_or_else(|e| defmt::panic!("reference channel: {}", e));
        let sensor = TemperatureSensor::new(thermistor, reference);
        defmt::debug!("{}", sensor.config());

        read_temperature::spawn().ok();

        (Shared {}, Local { adc, sensor }, init::Monotonics(mono))
    }

    #[task(local = [adc, sensor])]
    fn read_temperature(cx: read_temperature::Context) {
        match cx.local.sensor.measure(cx.local.adc) {
            Ok(m) => {
                defmt::info!("Temp: {} C", m.celsius);
                defmt::debug!("{}", m);
            }
            Err(Error::SensorFault) => defmt::warn!("thermistor disconnected"),
            Err(e) => defmt::error!("read failed: {}", e),
        }

        read_temperature::spawn_after(READ_INTERVAL_SECS.secs()).ok();
    }
}
