//! Canonical form of resource quantities
//!
//! The API server parses every `resource.Quantity` it stores and writes it
//! back in canonical form, so a manifest asking for `cpu: 0.5` reads back as
//! `500m` and `memory: 1024Mi` as `1Gi`. Rewriting desired quantities the same
//! way keeps equal amounts from showing up as drift.
//!
//! Canonical form keeps the suffix family of the input:
//!
//! ```text
//!   binary  (Ki Mi Gi Ti Pi Ei)   largest power of 1024 that divides exactly
//!                                 1024Mi -> 1Gi, 1.5Gi -> 1536Mi
//!   decimal (n u m "" k M G T P E) largest power of 1000 with an integer amount
//!                                 0.5 -> 500m, 1000 -> 1k, 1500 -> 1500
//!   exponent (e3, E-6, ...)       same as decimal, written as e<n>
//! ```
//!
//! Binary amounts below 1024 or with a fractional byte count fall back to the
//! decimal form. Precision finer than `1n` is rounded up, away from zero.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

const MIN_EXPONENT: i32 = -9;
const MAX_EXPONENT: i32 = 18;
const BINARY_SUFFIXES: [&str; 7] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    BinarySi,
    DecimalSi,
    DecimalExponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    /// Multiply by 1024^n
    Binary(u32),
    /// Multiply by 10^n
    Decimal(i32),
}

/// Exact amount `mantissa * 10^exponent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Amount {
    mantissa: i128,
    exponent: i32,
}

/// Canonical spelling of a quantity string, `None` if it does not parse
pub fn canonical_quantity(raw: &str) -> Option<String> {
    let (amount, format) = parse(raw)?;
    let amount = normalize(round_to_nano(amount));

    match format {
        Format::BinarySi => format_binary(amount),
        Format::DecimalSi | Format::DecimalExponent => format_decimal(amount, format),
    }
}

/// Rewrite a quantity in place; unparseable values are left as written
pub fn canonicalize_quantity(quantity: &mut Quantity) {
    if let Some(canonical) = canonical_quantity(&quantity.0) {
        quantity.0 = canonical;
    }
}

/// Rewrite every quantity of a `requests`/`limits` style map
pub fn canonicalize_quantities(quantities: &mut BTreeMap<String, Quantity>) {
    quantities.values_mut().for_each(canonicalize_quantity);
}

/// Rewrite a container's requests and limits
pub fn canonicalize_resources(resources: &mut ResourceRequirements) {
    for quantities in [resources.requests.as_mut(), resources.limits.as_mut()]
        .into_iter()
        .flatten()
    {
        canonicalize_quantities(quantities);
    }
}

fn parse(raw: &str) -> Option<(Amount, Format)> {
    let number_end = raw
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.')))
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(number_end);

    let amount = parse_number(number)?;
    let (scale, format) = parse_suffix(suffix)?;

    let amount = match scale {
        Scale::Decimal(exponent) => Amount {
            mantissa: amount.mantissa,
            exponent: amount.exponent.checked_add(exponent)?,
        },
        Scale::Binary(power) => Amount {
            mantissa: amount.mantissa.checked_mul(1024i128.checked_pow(power)?)?,
            exponent: amount.exponent,
        },
    };
    Some((amount, format))
}

fn parse_number(number: &str) -> Option<Amount> {
    let (negative, digits) = match number.as_bytes().first() {
        Some(b'-') => (true, &number[1..]),
        Some(b'+') => (false, &number[1..]),
        _ => (false, number),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let mut mantissa: i128 = 0;
    for byte in whole.bytes().chain(fraction.bytes()) {
        if !byte.is_ascii_digit() {
            return None;
        }
        mantissa = mantissa
            .checked_mul(10)?
            .checked_add(i128::from(byte - b'0'))?;
    }

    Some(Amount {
        mantissa: if negative { -mantissa } else { mantissa },
        exponent: -i32::try_from(fraction.len()).ok()?,
    })
}

fn parse_suffix(suffix: &str) -> Option<(Scale, Format)> {
    let binary = |power| Some((Scale::Binary(power), Format::BinarySi));
    let decimal = |exponent| Some((Scale::Decimal(exponent), Format::DecimalSi));

    match suffix {
        "Ki" => binary(1),
        "Mi" => binary(2),
        "Gi" => binary(3),
        "Ti" => binary(4),
        "Pi" => binary(5),
        "Ei" => binary(6),
        "n" => decimal(-9),
        "u" => decimal(-6),
        "m" => decimal(-3),
        "" => decimal(0),
        "k" => decimal(3),
        "M" => decimal(6),
        "G" => decimal(9),
        "T" => decimal(12),
        "P" => decimal(15),
        "E" => decimal(18),
        _ => {
            let exponent = suffix.strip_prefix(['e', 'E'])?.parse().ok()?;
            Some((Scale::Decimal(exponent), Format::DecimalExponent))
        }
    }
}

fn round_to_nano(amount: Amount) -> Amount {
    if amount.exponent >= MIN_EXPONENT {
        return amount;
    }

    let shift = MIN_EXPONENT.abs_diff(amount.exponent);
    let mantissa = match 10i128.checked_pow(shift) {
        Some(divisor) if amount.mantissa % divisor == 0 => amount.mantissa / divisor,
        Some(divisor) => amount.mantissa / divisor + amount.mantissa.signum(),
        None => amount.mantissa.signum(),
    };
    Amount {
        mantissa,
        exponent: MIN_EXPONENT,
    }
}

/// Move trailing zeros of the mantissa into the exponent
fn normalize(mut amount: Amount) -> Amount {
    if amount.mantissa == 0 {
        return Amount {
            mantissa: 0,
            exponent: 0,
        };
    }
    while amount.mantissa % 10 == 0 {
        amount.mantissa /= 10;
        amount.exponent += 1;
    }
    amount
}

fn pow10(exponent: i32) -> Option<i128> {
    10i128.checked_pow(u32::try_from(exponent).ok()?)
}

fn format_decimal(amount: Amount, format: Format) -> Option<String> {
    if amount.mantissa == 0 {
        return Some("0".to_string());
    }

    let mut exponent = amount.exponent - amount.exponent.rem_euclid(3);
    let mut mantissa = amount.mantissa.checked_mul(pow10(amount.exponent - exponent)?)?;
    if format == Format::DecimalSi && exponent > MAX_EXPONENT {
        mantissa = mantissa.checked_mul(pow10(exponent - MAX_EXPONENT)?)?;
        exponent = MAX_EXPONENT;
    }

    let suffix = match format {
        Format::DecimalExponent if exponent == 0 => String::new(),
        Format::DecimalExponent => format!("e{exponent}"),
        _ => decimal_suffix(exponent)?.to_string(),
    };
    Some(format!("{mantissa}{suffix}"))
}

fn decimal_suffix(exponent: i32) -> Option<&'static str> {
    let suffix = match exponent {
        -9 => "n",
        -6 => "u",
        -3 => "m",
        0 => "",
        3 => "k",
        6 => "M",
        9 => "G",
        12 => "T",
        15 => "P",
        18 => "E",
        _ => return None,
    };
    Some(suffix)
}

fn format_binary(amount: Amount) -> Option<String> {
    // Fractional byte counts have no binary spelling
    if amount.exponent < 0 {
        return format_decimal(amount, Format::DecimalSi);
    }

    let mut bytes = amount.mantissa.checked_mul(pow10(amount.exponent)?)?;
    if bytes.abs() < 1024 {
        return format_decimal(amount, Format::DecimalSi);
    }

    let mut power = 0;
    while power < BINARY_SUFFIXES.len() - 1 && bytes % 1024 == 0 {
        bytes /= 1024;
        power += 1;
    }
    Some(format!("{bytes}{}", BINARY_SUFFIXES[power]))
}
