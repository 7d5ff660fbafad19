//! Exhibit label generation.
//!
//! A label is a pure function of `(style, position)`. Positions are
//! 0-indexed; the first exhibit is `A`, `1` or `I`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How exhibits are labelled in the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingStyle {
    /// A, B, …, Z, AA, AB, … (default)
    #[default]
    Letters,
    /// 1, 2, 3, …
    Numbers,
    /// I, II, III, IV, …
    Roman,
}

impl NumberingStyle {
    /// Label for the exhibit at `index` (0-indexed).
    pub fn label(self, index: usize) -> String {
        label(self, index)
    }
}

impl fmt::Display for NumberingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NumberingStyle::Letters => "letters",
            NumberingStyle::Numbers => "numbers",
            NumberingStyle::Roman => "roman",
        };
        f.write_str(s)
    }
}

impl FromStr for NumberingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "letters" | "letter" | "alpha" | "a" => Ok(NumberingStyle::Letters),
            "numbers" | "number" | "numeric" | "1" => Ok(NumberingStyle::Numbers),
            "roman" | "i" => Ok(NumberingStyle::Roman),
            other => Err(format!(
                "unknown numbering style '{other}' (expected letters, numbers or roman)"
            )),
        }
    }
}

/// Label for the exhibit at `index` (0-indexed) in the given style.
pub fn label(style: NumberingStyle, index: usize) -> String {
    match style {
        NumberingStyle::Letters => to_letters(index),
        NumberingStyle::Numbers => (index + 1).to_string(),
        NumberingStyle::Roman => to_roman(index + 1),
    }
}

/// Labels for the first `count` positions.
pub fn labels(style: NumberingStyle, count: usize) -> Vec<String> {
    (0..count).map(|i| label(style, i)).collect()
}

/// Bijective base-26: 0 → A, 25 → Z, 26 → AA, 701 → ZZ, 702 → AAA.
pub fn to_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    // Only ASCII uppercase bytes are pushed above.
    String::from_utf8(out).unwrap_or_default()
}

const ROMAN_TABLE: [(usize, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Subtractive Roman numeral for `num` (1-indexed). Values past 3999 keep
/// repeating `M`. Zero renders as an empty string.
pub fn to_roman(mut num: usize) -> String {
    let mut out = String::new();
    for &(value, symbol) in ROMAN_TABLE.iter() {
        while num >= value {
            out.push_str(symbol);
            num -= value;
        }
    }
    out
}

/// Inverse of [`to_roman`] for well-formed numerals.
fn from_roman(s: &str) -> usize {
    let value = |c: char| match c {
        'I' => 1,
        'V' => 5,
        'X' => 10,
        'L' => 50,
        'C' => 100,
        'D' => 500,
        'M' => 1000,
        _ => 0,
    };
    let chars: Vec<i64> = s.chars().map(value).collect();
    let mut total: i64 = 0;
    for (i, &v) in chars.iter().enumerate() {
        if chars.get(i + 1).is_some_and(|&next| next > v) {
            total -= v;
        } else {
            total += v;
        }
    }
    usize::try_from(total).unwrap_or(0)
}

/// Position (0-indexed) that produced `label` in `style`, if any.
///
/// Lets `--move` take labels such as `C:A` as well as positions.
pub fn position_of(style: NumberingStyle, label: &str) -> Option<usize> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    match style {
        NumberingStyle::Letters => {
            let upper = label.to_ascii_uppercase();
            if !upper.bytes().all(|b| b.is_ascii_uppercase()) {
                return None;
            }
            let n = upper.bytes().try_fold(0usize, |acc, b| {
                acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize)
            })?;
            Some(n - 1)
        }
        NumberingStyle::Numbers => label.parse::<usize>().ok().filter(|&n| n >= 1).map(|n| n - 1),
        NumberingStyle::Roman => {
            let upper = label.to_ascii_uppercase();
            let n = from_roman(&upper);
            // Reject non-canonical spellings such as "IIII".
            (n >= 1 && to_roman(n) == upper).then(|| n - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn letters_first_and_wraparound() {
        assert_eq!(to_letters(0), "A");
        assert_eq!(to_letters(25), "Z");
        assert_eq!(to_letters(26), "AA");
        assert_eq!(to_letters(27), "AB");
        assert_eq!(to_letters(51), "AZ");
        assert_eq!(to_letters(52), "BA");
        assert_eq!(to_letters(701), "ZZ");
        assert_eq!(to_letters(702), "AAA");
    }

    #[test]
    fn numbers_are_one_based() {
        assert_eq!(labels(NumberingStyle::Numbers, 3), vec!["1", "2", "3"]);
    }

    #[test]
    fn roman_known_values() {
        assert_eq!(to_roman(1), "I");
        assert_eq!(to_roman(4), "IV");
        assert_eq!(to_roman(9), "IX");
        assert_eq!(to_roman(14), "XIV");
        assert_eq!(to_roman(40), "XL");
        assert_eq!(to_roman(90), "XC");
        assert_eq!(to_roman(1994), "MCMXCIV");
        assert_eq!(to_roman(3999), "MMMCMXCIX");
        assert_eq!(to_roman(4000), "MMMM");
    }

    #[test]
    fn every_style_is_unique_and_strictly_increasing() {
        let n = 2000;
        for style in [
            NumberingStyle::Letters,
            NumberingStyle::Numbers,
            NumberingStyle::Roman,
        ] {
            let seq = labels(style, n);
            let unique: HashSet<&String> = seq.iter().collect();
            assert_eq!(unique.len(), n, "{style} labels are not unique");

            // Increasing in the label's own order: decode back to the position.
            for (i, l) in seq.iter().enumerate() {
                assert_eq!(position_of(style, l), Some(i), "{style} label {l} at {i}");
            }
        }
    }

    #[test]
    fn letters_order_is_length_then_lexicographic() {
        let seq = labels(NumberingStyle::Letters, 800);
        for pair in seq.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.len() < b.len() || (a.len() == b.len() && a < b),
                "{a} should sort before {b}"
            );
        }
    }

    #[test]
    fn parse_style_aliases() {
        assert_eq!("letters".parse(), Ok(NumberingStyle::Letters));
        assert_eq!("Numeric".parse(), Ok(NumberingStyle::Numbers));
        assert_eq!(" roman ".parse(), Ok(NumberingStyle::Roman));
        assert!("greek".parse::<NumberingStyle>().is_err());
    }

    #[test]
    fn position_of_rejects_garbage() {
        assert_eq!(position_of(NumberingStyle::Letters, "a1"), None);
        assert_eq!(position_of(NumberingStyle::Numbers, "0"), None);
        assert_eq!(position_of(NumberingStyle::Roman, "IIII"), None);
        assert_eq!(position_of(NumberingStyle::Roman, "iv"), Some(3));
        assert_eq!(position_of(NumberingStyle::Letters, "b"), Some(1));
    }
}
