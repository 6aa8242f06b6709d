use std::env;

/// Build-time knobs and their defaults. Each one is forwarded to the crate
/// as a `rustc-env` variable and parsed by `config`.
const KNOBS: [(&str, &str); 3] = [
    ("BOOT_F_CPU", "16000000"),
    ("BOOT_BAUD_RATE", "115200"),
    ("BOOT_LED_START_FLASHES", "3"),
];

/// Must match `config::SOFT_UART_BIT_OVERHEAD`.
const SOFT_UART_BIT_OVERHEAD: u64 = 20;

fn knob(name: &str, default: &str) -> u64 {
    println!("cargo:rerun-if-env-changed={}", name);
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        panic!("{} must be a decimal number, got {:?}", name, value);
    }
    println!("cargo:rustc-env={}={}", name, value);
    value
        .parse()
        .unwrap_or_else(|_| panic!("{} is out of range: {}", name, value))
}

fn main() {
    let [cpu, baud, flashes] = KNOBS.map(|(name, default)| knob(name, default));

    if baud == 0 || cpu > u32::MAX as u64 || flashes > u8::MAX as u64 {
        panic!("unusable build knobs: F_CPU {}, baud {}, flashes {}", cpu, baud, flashes);
    }
    if env::var_os("CARGO_FEATURE_SOFT_UART").is_some() {
        let spins = (cpu / baud).saturating_sub(SOFT_UART_BIT_OVERHEAD) / 6;
        if !(1..=255).contains(&spins) {
            panic!("baud rate {} is out of reach of the soft UART at {} Hz", baud, cpu);
        }
    } else {
        // UBRR0 is 12 bits wide
        let ubrr = (cpu + baud * 4) / (baud * 8);
        if ubrr == 0 || ubrr - 1 > 0x0FFF {
            panic!("baud rate {} is out of reach of USART0 at {} Hz", baud, cpu);
        }
    }

    // Host builds (unit and integration tests) skip the AVR link setup.
    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("avr") {
        println!("cargo:rustc-link-arg=-mmcu=atmega328p");
        // Bootloader section: the last 512 bytes of the 32 KiB flash.
        println!("cargo:rustc-link-arg=-Wl,--section-start=.text=0x7e00");
    }
}
