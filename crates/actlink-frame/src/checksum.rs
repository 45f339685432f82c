//! CRC-16/MODBUS: reflected polynomial 0xA001, initial value 0xFFFF, no final xor.

const POLY: u16 = 0xA001;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC over `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0xFFFF, |crc, &b| {
        (crc >> 8) ^ TABLE[usize::from((crc ^ u16::from(b)) as u8)]
    })
}

/// The two checksum bytes as they appear on the wire (low byte first).
pub fn checksum(bytes: &[u8]) -> [u8; 2] {
    crc16(bytes).to_le_bytes()
}
