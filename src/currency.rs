//! Currency conversion over a static EUR-based rate table. Pure
//! arithmetic, no network dependency.

/// Exchange rates expressed as units per EUR.
pub const EXCHANGE_RATES: &[(&str, f64)] = &[
    ("EUR", 1.0),
    ("USD", 1.09),
    ("GBP", 0.86),
    ("JPY", 161.50),
    ("CNY", 7.85),
    ("CAD", 1.48),
    ("AUD", 1.66),
    ("CHF", 0.94),
    ("INR", 90.50),
    ("RUB", 100.00),
    ("XOF", 655.96),
    ("XAF", 655.96),
    ("MAD", 10.80),
    ("DZD", 146.50),
    ("TND", 3.38),
    ("BRL", 5.42),
    ("MXN", 18.60),
    ("ZAR", 20.30),
    ("KRW", 1450.00),
    ("SGD", 1.45),
    ("HKD", 8.50),
    ("NOK", 11.70),
    ("SEK", 11.40),
    ("DKK", 7.46),
    ("PLN", 4.35),
    ("THB", 38.50),
    ("IDR", 17000.00),
    ("MYR", 5.10),
    ("PHP", 61.50),
    ("BTC", 0.000016),
    ("ETH", 0.00045),
];

const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CNY", "¥"),
    ("INR", "₹"),
    ("RUB", "₽"),
    ("BTC", "₿"),
    ("XOF", "CFA"),
    ("XAF", "CFA"),
    ("MAD", "DH"),
    ("DZD", "DA"),
    ("TND", "DT"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub converted: f64,
    /// 1 unit of the source currency in target units.
    pub rate: f64,
}

pub fn rate_for(code: &str) -> Option<f64> {
    let code = code.to_uppercase();
    EXCHANGE_RATES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, r)| *r)
}

pub fn symbol_for(code: &str) -> &str {
    let upper = code.to_uppercase();
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| *c == upper)
        .map(|(_, s)| *s)
        .unwrap_or(code)
}

/// Converts through the EUR pivot. None when either code is unknown.
pub fn convert(amount: f64, from: &str, to: &str) -> Option<Conversion> {
    let from_rate = rate_for(from)?;
    let to_rate = rate_for(to)?;
    let amount_in_eur = amount / from_rate;
    Some(Conversion {
        amount,
        converted: amount_in_eur * to_rate,
        rate: to_rate / from_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_conversion() {
        let c = convert(100.0, "EUR", "EUR").unwrap();
        assert!((c.converted - 100.0).abs() < 1e-9);
        assert!((c.rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pivot_conversion() {
        // 109 USD -> 100 EUR -> 86 GBP
        let c = convert(109.0, "usd", "gbp").unwrap();
        assert!((c.converted - 86.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_currency_rejected() {
        assert!(convert(10.0, "EUR", "XYZ").is_none());
        assert!(convert(10.0, "XYZ", "EUR").is_none());
    }

    #[test]
    fn test_symbols() {
        assert_eq!(symbol_for("usd"), "$");
        assert_eq!(symbol_for("XOF"), "CFA");
        assert_eq!(symbol_for("SEK"), "SEK");
    }
}
