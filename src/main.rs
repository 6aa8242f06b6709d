#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use atmega_bootloader::bootloader;
    use atmega_bootloader::config::Config;
    use atmega_bootloader::diagnostics::Indicator;
    use atmega_bootloader::hal::eeprom::Eeprom;
    use atmega_bootloader::hal::flash::Flash;
    use atmega_bootloader::hal::gpio::StatusLed;
    use atmega_bootloader::hal::reset::{McuStatus, ResetVector};
    use atmega_bootloader::hal::startup::Ports;
    use atmega_bootloader::hal::timer::Timer1;
    use atmega_bootloader::hal::watchdog::Watchdog;
    use atmega_bootloader::hal::Watchdog as _;
    use atmega_bootloader::{Engine, Store};

    #[cfg(not(feature = "soft-uart"))]
    use atmega_bootloader::hal::uart::Uart as Link;
    #[cfg(feature = "soft-uart")]
    use atmega_bootloader::hal::soft_uart::SoftUart as Link;

    static CONFIG: Config = Config::DEFAULT;

    #[avr_device::entry]
    fn main() -> ! {
        let config = &CONFIG;
        let mut eeprom = Eeprom::new();
        bootloader::settle(&mut Ports::new(), &mut eeprom);

        let mut watchdog = Watchdog::new();
        watchdog.arm(config.watchdog_timeout);

        let flash = Flash::new();
        bootloader::boot(&mut McuStatus::new(), &flash, &mut watchdog, &ResetVector);

        let mut timer = Timer1::new(config);
        let mut link = Link::new(config);

        let mut indicator = Indicator::new(StatusLed::new());
        indicator.startup_flashes(config.led_start_flashes, &mut timer, &mut watchdog);
        let mut link = indicator.on_activity(&mut link);

        let mut store = Store::new(flash, eeprom, config);
        Engine::new(&mut link, &mut store, &mut watchdog, config).run()
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    eprintln!("atmega_bootloader only runs on AVR; build with --target avr-unknown-gnu-atmega328");
}
