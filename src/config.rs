//! Configuration constants for the ATmega328P bootloader
//!
//! Everything here is fixed when the image is built. `build.rs` forwards
//! `BOOT_F_CPU`, `BOOT_BAUD_RATE` and `BOOT_LED_START_FLASHES` from the build
//! environment; the rest is tied to the part.

use crate::hal::Timeout;

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = parse_decimal(env!("BOOT_F_CPU"));

/// Serial bit rate shared with the host programmer
pub const BAUD_RATE: u32 = parse_decimal(env!("BOOT_BAUD_RATE"));

/// Status LED toggles before the protocol engine starts
pub const LED_START_FLASHES: u8 = parse_decimal(env!("BOOT_LED_START_FLASHES")) as u8;

/// Self-programming page size in bytes
pub const SPM_PAGESIZE: usize = 128;

/// Code memory size in bytes
pub const FLASH_SIZE: usize = 32 * 1024;

/// EEPROM size in bytes
pub const EEPROM_SIZE: usize = 1024;

/// Cycles the bit-banged transport spends per bit outside its delay loops.
pub const SOFT_UART_BIT_OVERHEAD: u32 = 20;

const _: () = assert!(FLASH_SIZE % SPM_PAGESIZE == 0);

/// Software version reported through Get Parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

/// Build-time description of the device and session policy.
///
/// The protocol engine, the store and the boot decision only ever read this;
/// the hardware layer derives its register values from the same constants.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub cpu_freq_hz: u32,
    pub baud_rate: u32,
    /// Liveness window armed when the engine starts.
    pub watchdog_timeout: Timeout,
    /// Window armed on leave-program-mode and on a desynchronised frame.
    pub short_timeout: Timeout,
    pub page_size: usize,
    /// Subtracted from code-memory addresses on reads, for builds that
    /// relocate the vector table.
    pub vector_offset: u16,
    /// Zero when the part has no EEPROM.
    pub eeprom_size: usize,
    pub signature: [u8; 3],
    pub version: Version,
    pub led_start_flashes: u8,
}

impl Config {
    pub const DEFAULT: Config = Config {
        cpu_freq_hz: CPU_FREQ_HZ,
        baud_rate: BAUD_RATE,
        watchdog_timeout: Timeout::S1,
        short_timeout: Timeout::Ms16,
        page_size: SPM_PAGESIZE,
        vector_offset: 0,
        eeprom_size: EEPROM_SIZE,
        // ATmega328P
        signature: [0x1E, 0x95, 0x0F],
        // A major above 100 marks a vendor build of Optiboot 8
        version: Version { major: 8 + 100, minor: 1 },
        led_start_flashes: LED_START_FLASHES,
    };

    pub fn has_eeprom(&self) -> bool {
        self.eeprom_size > 0
    }

    /// UBRR0 value for the USART in double-speed mode, rounded to nearest.
    /// Rates above F_CPU/4 clamp to the fastest divisor; `build.rs` refuses
    /// them for the configured image.
    pub const fn ubrr_double_speed(&self) -> u16 {
        ((self.cpu_freq_hz + self.baud_rate * 4) / (self.baud_rate * 8)).saturating_sub(1) as u16
    }

    /// CPU cycles per bit for the bit-banged transport.
    pub const fn cycles_per_bit(&self) -> u32 {
        self.cpu_freq_hz / self.baud_rate
    }

    /// Iterations of the 3-cycle delay loop run twice per bit by the
    /// bit-banged transport (AVR305 budget, rounded to nearest).
    pub const fn soft_uart_spins(&self) -> u32 {
        self.cycles_per_bit().saturating_sub(SOFT_UART_BIT_OVERHEAD) / 6
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const fn parse_decimal(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        value = value * 10 + (bytes[i] - b'0') as u32;
        i += 1;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_knobs() {
        assert_eq!(parse_decimal("16000000"), 16_000_000);
        assert_eq!(parse_decimal("0"), 0);
    }

    #[test]
    fn ubrr_matches_optiboot_table() {
        let config = Config {
            cpu_freq_hz: 16_000_000,
            baud_rate: 115_200,
            ..Config::DEFAULT
        };
        assert_eq!(config.ubrr_double_speed(), 16);

        let slow = Config { baud_rate: 57_600, ..config };
        assert_eq!(slow.ubrr_double_speed(), 34);
    }

    #[test]
    fn ubrr_keeps_high_divisor_bits() {
        let config = Config {
            cpu_freq_hz: 16_000_000,
            baud_rate: 4_800,
            ..Config::DEFAULT
        };
        assert_eq!(config.ubrr_double_speed(), 416);
    }

    #[test]
    fn ubrr_clamps_unreachable_rates() {
        let config = Config {
            cpu_freq_hz: 1_000_000,
            baud_rate: 1_000_000,
            ..Config::DEFAULT
        };
        assert_eq!(config.ubrr_double_speed(), 0);
    }

    #[test]
    fn soft_uart_spins_follow_avr305_budget() {
        let config = Config {
            cpu_freq_hz: 16_000_000,
            baud_rate: 115_200,
            ..Config::DEFAULT
        };
        // 138 cycles per bit: 2 * 3 * 19 + 20 = 134
        assert_eq!(config.soft_uart_spins(), 19);
        assert_eq!(Config { baud_rate: 57_600, ..config }.soft_uart_spins(), 42);
        // too slow for an 8-bit loop counter
        assert!(Config { baud_rate: 9_600, ..config }.soft_uart_spins() > 255);
    }

    #[test]
    fn eeprom_presence_follows_size() {
        assert!(Config::DEFAULT.has_eeprom());
        let bare = Config { eeprom_size: 0, ..Config::DEFAULT };
        assert!(!bare.has_eeprom());
    }
}
