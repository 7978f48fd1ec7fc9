/// Names of the 32 bits of the live data error field, bit 0 first
pub const FAULT_NAMES: [&str; 32] = [
    "Tz Protection Fault",
    "Mains Lost Fault",
    "Grid Voltage Fault",
    "Grid Frequency Fault",
    "PLL Lost Fault",
    "Bus Voltage Fault",
    "Error Bit 06",
    "Oscillator Fault",
    "DCI OCP Fault",
    "Residual Current Fault",
    "PV Voltage Fault",
    "Ac10Mins Voltage Fault",
    "Isolation Fault",
    "Over Temperature Fault",
    "Ventilator Fault",
    "Error Bit 15",
    "SPI Communication Fault",
    "SCI Communication Fault",
    "Error Bit 18",
    "Input Configuration Fault",
    "EEPROM Fault",
    "Relay Fault",
    "Sample Consistence Fault",
    "Residual-Current Device Fault",
    "Error Bit 24",
    "Error Bit 25",
    "Error Bit 26",
    "Error Bit 27",
    "Error Bit 28",
    "DCI Device Fault",
    "Other Device Fault",
    "Error Bit 31",
];

/// Names of all faults set in `error_bits`, lowest bit first
pub fn active_faults(error_bits: u32) -> Vec<&'static str> {
    FAULT_NAMES
        .iter()
        .enumerate()
        .filter(|(bit, _)| error_bits & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect()
}
