use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// 去除字段两端的空白和NUL填充
pub fn trim_padding(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0')
}

/// 宽松的整数解析：读取前导符号和数字，其余忽略，无法解析时返回0
pub fn atoi_lenient(s: &str) -> i64 {
    let s = trim_padding(s);
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().unwrap_or(0);

    if negative { -value } else { value }
}

/// 宽松的浮点数解析，无法解析时返回0.0
pub fn atof_lenient(s: &str) -> f64 {
    let s = trim_padding(s);
    if s.is_empty() {
        return 0.0;
    }

    s.parse::<f64>().unwrap_or_else(|_| atoi_lenient(s) as f64)
}

/// Parses the `dd.mm.yy` / `hh.mm.ss` pair stored in the main header.
///
/// Two-digit years above 84 belong to the 1900s, everything else to the 2000s.
pub fn parse_datetime(date_str: &str, time_str: &str) -> Option<NaiveDateTime> {
    let date_parts: Vec<&str> = trim_padding(date_str).split('.').collect();
    let time_parts: Vec<&str> = trim_padding(time_str).split('.').collect();
    if date_parts.len() != 3 || time_parts.len() != 3 {
        return None;
    }

    let day = atoi_lenient(date_parts[0]);
    let month = atoi_lenient(date_parts[1]);
    let year = {
        let yy = atoi_lenient(date_parts[2]);
        if yy > 84 { 1900 + yy } else { 2000 + yy }
    };

    let date = NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )?;
    let time = NaiveTime::from_hms_opt(
        u32::try_from(atoi_lenient(time_parts[0])).ok()?,
        u32::try_from(atoi_lenient(time_parts[1])).ok()?,
        u32::try_from(atoi_lenient(time_parts[2])).ok()?,
    )?;

    Some(NaiveDateTime::new(date, time))
}

/// Rewrites the non-finite literals `NaN`, `Infinity` and `-Infinity` to `null`
/// so the payload can be handed to `serde_json`.
///
/// Only bare tokens outside string literals are touched. Input without any of them is
/// returned borrowed.
pub fn replace_non_finite_literals(input: &[u8]) -> Cow<'_, [u8]> {
    const LITERALS: [&[u8]; 3] = [b"-Infinity", b"Infinity", b"NaN"];

    let mut output: Option<Vec<u8>> = None;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];

        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
        } else if byte == b'"' {
            in_string = true;
        } else if let Some(literal) = LITERALS.iter().find(|lit| {
            input[i..].starts_with(lit) && !is_identifier_byte(input.get(i + lit.len()))
        }) {
            let out = output.get_or_insert_with(|| input[..i].to_vec());
            out.extend_from_slice(b"null");
            i += literal.len();
            continue;
        }

        if let Some(out) = output.as_mut() {
            out.push(byte);
        }
        i += 1;
    }

    match output {
        Some(out) => Cow::Owned(out),
        None => Cow::Borrowed(input),
    }
}

fn is_identifier_byte(byte: Option<&u8>) -> bool {
    byte.map_or(false, |b| b.is_ascii_alphanumeric() || *b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_padding() {
        assert_eq!(trim_padding("  EEG C3   "), "EEG C3");
        assert_eq!(trim_padding("1.0\0\0\0\0\0"), "1.0");
        assert_eq!(trim_padding("        "), "");
    }

    #[test]
    fn test_atoi_lenient() {
        assert_eq!(atoi_lenient("128     "), 128);
        assert_eq!(atoi_lenient("  -42"), -42);
        assert_eq!(atoi_lenient("+7"), 7);
        assert_eq!(atoi_lenient("12abc"), 12);
        assert_eq!(atoi_lenient("abc"), 0);
        assert_eq!(atoi_lenient(""), 0);
        assert_eq!(atoi_lenient("-"), 0);
    }

    #[test]
    fn test_atof_lenient() {
        assert_eq!(atof_lenient("-200    "), -200.0);
        assert_eq!(atof_lenient("3.5"), 3.5);
        assert_eq!(atof_lenient("12x"), 12.0);
        assert_eq!(atof_lenient(""), 0.0);
    }

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("17.10.26", "08.30.15").unwrap();
        assert_eq!(dt.to_string(), "2026-10-17 08:30:15");

        let old = parse_datetime("01.01.99", "00.00.00").unwrap();
        assert_eq!(old.to_string(), "1999-01-01 00:00:00");

        assert!(parse_datetime("31.02.20", "00.00.00").is_none());
        assert!(parse_datetime("        ", "        ").is_none());
    }

    #[test]
    fn test_replace_non_finite_literals() {
        let input = br#"{"a":NaN,"b":[Infinity,-Infinity],"c":"NaN Infinity"}"#;
        let output = replace_non_finite_literals(input);
        assert_eq!(
            &*output,
            br#"{"a":null,"b":[null,null],"c":"NaN Infinity"}"#.as_slice()
        );

        let plain = br#"{"escaped":"quote \" NaN"}"#;
        assert!(matches!(replace_non_finite_literals(plain), Cow::Borrowed(_)));
    }
}
