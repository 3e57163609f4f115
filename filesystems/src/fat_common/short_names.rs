// 8.3 short name codec
//
// Names are treated as Latin-1: every char must fit in one byte, and only ASCII
// letters change case. Longer base/extension parts are truncated, not mangled.

use super::constants::*;
use sfat_core::{FatError, FatResult};

/// Characters that can never appear in a short name
pub const INVALID_CHARS: &[u8] = b"*?<>|\"+=,; :\\";

/// Encode a single path component into the 11-byte on-disk form
pub fn to_shortname(name: &str) -> FatResult<[u8; FAT_NAME_LEN]> {
    match name {
        "." => return Ok(DOT_NAME),
        ".." => return Ok(DOTDOT_NAME),
        "" => return Err(FatError::InvalidArgument("Empty file name".into())),
        _ => {}
    }

    let mut bytes = Vec::with_capacity(name.len());
    for c in name.chars() {
        let code = c as u32;
        if code > 0xFF || code == 0 {
            return Err(FatError::InvalidArgument(format!(
                "Character {:?} cannot be stored in a short name: {}",
                c, name
            )));
        }
        let byte = code as u8;
        if INVALID_CHARS.contains(&byte) || c == '/' {
            return Err(FatError::InvalidArgument(format!(
                "Invalid character {:?} in file name: {}",
                c, name
            )));
        }
        bytes.push(byte);
    }

    // The extension follows the last dot, unless that dot leads the name
    let (base, ext): (&[u8], &[u8]) = match bytes.iter().rposition(|&b| b == b'.') {
        Some(pos) if pos > 0 => (&bytes[..pos], &bytes[pos + 1..]),
        _ => (&bytes[..], &[]),
    };

    let mut result = [b' '; FAT_NAME_LEN];
    for (slot, &b) in result[..FAT_NAME_BASE_LEN].iter_mut().zip(base) {
        *slot = b.to_ascii_uppercase();
    }
    for (slot, &b) in result[FAT_NAME_BASE_LEN..].iter_mut().zip(ext) {
        *slot = b.to_ascii_uppercase();
    }
    if result[0] == NAME_DELETED {
        result[0] = NAME_ESCAPED_E5;
    }

    Ok(result)
}

/// Decode an on-disk name, producing at most `capacity` characters
pub fn to_longname(raw: &[u8; FAT_NAME_LEN], capacity: usize) -> String {
    let mut result = String::with_capacity(MAX_SHORT_NAME_LEN);
    let mut len = 0;

    for (i, &b) in raw[..FAT_NAME_BASE_LEN].iter().enumerate() {
        if b == b' ' || len >= capacity {
            break;
        }
        let b = if i == 0 && b == NAME_ESCAPED_E5 { NAME_DELETED } else { b };
        result.push(b.to_ascii_lowercase() as char);
        len += 1;
    }

    if raw[FAT_NAME_BASE_LEN] != b' ' && len < capacity {
        result.push('.');
        len += 1;
        for &b in &raw[FAT_NAME_BASE_LEN..] {
            if b == b' ' || len >= capacity {
                break;
            }
            result.push(b.to_ascii_lowercase() as char);
            len += 1;
        }
    }

    result
}

/// Human-readable form of a stored name
pub fn display_name(raw: &[u8; FAT_NAME_LEN]) -> String {
    to_longname(raw, MAX_SHORT_NAME_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_encoding() {
        assert_eq!(&to_shortname("readme.txt").unwrap(), b"README  TXT");
        assert_eq!(&to_shortname("FOLDER").unwrap(), b"FOLDER     ");
        assert_eq!(&to_shortname("test.c").unwrap(), b"TEST    C  ");
    }

    #[test]
    fn test_split_at_last_dot() {
        // Base bytes are kept as given, so the inner dot survives truncation
        let raw = to_shortname("archive.tar.gz").unwrap();
        assert_eq!(&raw, b"ARCHIVE.GZ ");
        assert_eq!(display_name(&raw), "archive..gz");
        assert_eq!(to_shortname(&display_name(&raw)).unwrap(), raw);
        assert_eq!(&to_shortname(".profile").unwrap(), b".PROFILE   ");
    }

    #[test]
    fn test_truncation() {
        assert_eq!(&to_shortname("toolongname12345.ext").unwrap(), b"TOOLONGNEXT");
        assert_eq!(&to_shortname("photo.jpeg").unwrap(), b"PHOTO   JPE");
    }

    #[test]
    fn test_invalid_characters() {
        for name in ["a*b", "what?", "a b", "x:y", "semi;colon", "back\\slash", "q\"uote"] {
            assert!(
                matches!(to_shortname(name), Err(FatError::InvalidArgument(_))),
                "{} should be rejected",
                name
            );
        }
        assert!(matches!(to_shortname(""), Err(FatError::InvalidArgument(_))));
        assert!(matches!(to_shortname("snow\u{2603}"), Err(FatError::InvalidArgument(_))));
    }

    #[test]
    fn test_deleted_marker_escape() {
        let encoded = to_shortname("\u{e5}bc").unwrap();
        assert_eq!(encoded[0], NAME_ESCAPED_E5);
        assert_eq!(to_longname(&encoded, MAX_SHORT_NAME_LEN), "\u{e5}bc");
    }

    #[test]
    fn test_dot_entries() {
        assert_eq!(to_shortname(".").unwrap(), DOT_NAME);
        assert_eq!(to_shortname("..").unwrap(), DOTDOT_NAME);
        assert_eq!(display_name(&DOT_NAME), ".");
        assert_eq!(display_name(&DOTDOT_NAME), "..");
    }

    #[test]
    fn test_longname_capacity() {
        assert_eq!(to_longname(b"README  TXT", 12), "readme.txt");
        assert_eq!(to_longname(b"README  TXT", 6), "readme");
        assert_eq!(to_longname(b"README  TXT", 8), "readme.t");
        assert_eq!(to_longname(b"NOEXT      ", 12), "noext");
    }

    #[test]
    fn test_round_trip_for_8_3_names() {
        let names = [
            "a", "a.b", "readme.txt", "makefile", "data_01.bin", "x-y.z", "12345678.123",
            "Mixed.Cas", "UPPER.TXT", "~tmp.$$$", "#notes", "{a}.(b)",
        ];
        for name in names {
            let encoded = to_shortname(name).unwrap();
            assert_eq!(display_name(&encoded), name.to_ascii_lowercase(), "round trip of {}", name);
        }
    }
}
