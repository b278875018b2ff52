//! Leaf value helpers shared by the bridge and the object model.

use std::fmt;

use crate::error::XEditError;

/// An RGB color as stored in `Red`/`Green`/`Blue` struct members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Member names in the order the engine lays them out.
    pub const CHANNELS: [&'static str; 3] = ["Red", "Green", "Blue"];

    pub fn channels(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// Render bytes the way the engine prints byte arrays: `"0A FF 00"`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02X}"));
    }
    out
}

/// Parse a space-separated hex byte string.
pub fn hex_to_bytes(text: &str) -> Result<Vec<u8>, XEditError> {
    text.split_whitespace()
        .map(|pair| {
            u8::from_str_radix(pair, 16)
                .map_err(|_| XEditError::Decode(format!("invalid hex byte '{pair}'")))
        })
        .collect()
}

/// Render a form id the way the engine accepts it in string paths.
pub fn form_id_to_string(form_id: u32) -> String {
    format!("{form_id:08X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_bytes() {
        assert_eq!(bytes_to_hex(&[0x0a, 0xff, 0]), "0A FF 00");
        assert_eq!(hex_to_bytes("0A ff 00").unwrap(), vec![0x0a, 0xff, 0]);
        assert!(hex_to_bytes("").unwrap().is_empty());
        assert!(matches!(hex_to_bytes("ZZ"), Err(XEditError::Decode(_))));
    }

    #[test]
    fn color_display() {
        assert_eq!(Color::new(255, 16, 0).to_string(), "#FF1000");
    }

    #[test]
    fn form_id_format() {
        assert_eq!(form_id_to_string(0x0001_2E46), "00012E46");
    }
}
