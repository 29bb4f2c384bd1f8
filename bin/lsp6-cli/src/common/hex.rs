//! Hex input helpers.

use std::{fs, io::Read, path::Path};

use alloy_primitives::{hex, Bytes};

use super::Result;

/// Loads hex-encoded bytes from an argument or a file. A file named `-` is read from stdin.
///
/// The argument wins over the file. Returns `None` if neither is given.
pub fn load_hex(arg: Option<&str>, file: Option<&Path>) -> Result<Option<Bytes>> {
    let hex_string = if let Some(arg) = arg {
        arg.to_owned()
    } else if let Some(file) = file {
        if file.as_os_str() == "-" {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        } else {
            fs::read_to_string(file)?
        }
    } else {
        return Ok(None);
    };

    decode_hex(&hex_string).map(|bytes| Some(Bytes::from(bytes)))
}

/// Decodes a hex string with an optional `0x` prefix. Surrounding whitespace is ignored.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    if digits.is_empty() {
        return Ok(Vec::new());
    }
    Ok(hex::decode(digits)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CliError;

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0xcafe").unwrap(), vec![0xca, 0xfe]);
        assert_eq!(decode_hex(" CAFE\n").unwrap(), vec![0xca, 0xfe]);
        assert!(decode_hex("0x").unwrap().is_empty());
        assert!(matches!(decode_hex("0xabc"), Err(CliError::InvalidHex(_))));
    }

    #[test]
    fn test_argument_wins_over_file() {
        let payload = load_hex(Some("0x01"), Some(Path::new("/nonexistent"))).unwrap();
        assert_eq!(payload, Some(Bytes::from_static(&[0x01])));
        assert_eq!(load_hex(None, None).unwrap(), None);
        assert!(matches!(
            load_hex(None, Some(Path::new("/nonexistent/payload.hex"))),
            Err(CliError::FileRead(_))
        ));
    }
}
