//! Conversión de lexemas literales a constantes de la máquina destino.

/// Interpreta un literal entero, decimal o hexadecimal (`0x...`).
///
/// Retorna `None` si el literal está malformado o no cabe en 64 bits.
pub fn parse_int(text: &str) -> Option<i64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => i64::from_str_radix(digits, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Interpreta un literal de punto flotante. Solo se aceptan valores finitos.
pub fn parse_float(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|float| float.is_finite())
}

/// Representación hexadecimal exacta de un flotante, como `%a` en C.
pub fn hex_float(float: f64) -> String {
    if float.is_nan() {
        return String::from("nan");
    } else if float.is_infinite() {
        return String::from(if float < 0.0 { "-inf" } else { "inf" });
    }

    let bits = float.to_bits();
    let sign = if bits >> 63 != 0 { "-" } else { "" };
    let exponent = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & ((1 << 52) - 1);

    if exponent == 0 && mantissa == 0 {
        return format!("{}0x0p+0", sign);
    }

    // Los subnormales no tienen el 1 implícito
    let (lead, exponent) = match exponent {
        0 => (0, -1022),
        _ => (1, exponent - 1023),
    };

    let digits = format!("{:013x}", mantissa);
    let digits = digits.trim_end_matches('0');

    if digits.is_empty() {
        format!("{}0x{}p{:+}", sign, lead, exponent)
    } else {
        format!("{}0x{}.{}p{:+}", sign, lead, digits, exponent)
    }
}

/// Codifica una cadena de bytes para un operando `string@`.
///
/// Solo los caracteres ASCII visibles se escriben tal cual, excepto `#` y
/// `\`. Todo otro byte, incluyendo el espacio y los bytes de secuencias
/// UTF-8, se escribe como `\ddd` con su valor decimal.
pub fn escape(bytes: &[u8]) -> String {
    let mut escaped = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            33..=126 if byte != b'#' && byte != b'\\' => escaped.push(char::from(byte)),
            _ => escaped.push_str(&format!("\\{:03}", byte)),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("0Xff"), Some(255));
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int("99999999999999999999"), None);
    }

    #[test]
    fn floats() {
        assert_eq!(parse_float("123.5e+2"), Some(12350.0));
        assert_eq!(parse_float("1.5E-2"), Some(0.015));
        assert_eq!(parse_float("1e999"), None);
        assert_eq!(parse_float("1e"), None);
    }

    #[test]
    fn hex_floats() {
        assert_eq!(hex_float(0.0), "0x0p+0");
        assert_eq!(hex_float(1.0), "0x1p+0");
        assert_eq!(hex_float(3.0), "0x1.8p+1");
        assert_eq!(hex_float(-0.5), "-0x1p-1");
        assert_eq!(hex_float(0.1), "0x1.999999999999ap-4");
        assert_eq!(hex_float(f64::from_bits(1)), "0x0.0000000000001p-1022");
    }

    #[test]
    fn escapes() {
        assert_eq!(escape(b"a b"), "a\\032b");
        assert_eq!(escape(b"#\\\n"), "\\035\\092\\010");
        assert_eq!(escape(b"ok"), "ok");
        assert_eq!(escape(&[0xFF, b'x', 0x7F]), "\\255x\\127");
        assert_eq!(escape("é".as_bytes()), "\\195\\169");
    }
}
