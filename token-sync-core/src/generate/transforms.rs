//! Category-keyed value transforms.

use std::fmt;

/// Rewrites a raw token value. `None` means the value cannot be transformed.
#[derive(Clone)]
pub struct ValueTransform {
    pub name: &'static str,
    pub category: String,
    pub apply: fn(&str) -> Option<String>,
}

impl fmt::Debug for ValueTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTransform")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Ordered list of transforms; the first whose category matches wins.
#[derive(Debug, Clone)]
pub struct TransformSet {
    transforms: Vec<ValueTransform>,
}

impl TransformSet {
    pub fn empty() -> Self {
        TransformSet {
            transforms: Vec::new(),
        }
    }

    pub fn with(mut self, transform: ValueTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Matching is on the manifest category only. A token declared as
    /// `type: size` inside another category is left untouched.
    pub fn resolve(&self, category: &str) -> Option<&ValueTransform> {
        self.transforms.iter().find(|t| t.category == category)
    }
}

impl Default for TransformSet {
    fn default() -> Self {
        TransformSet::empty()
            .with(ValueTransform {
                name: "size/px",
                category: "size".into(),
                apply: size_px,
            })
            .with(ValueTransform {
                name: "color/css",
                category: "color".into(),
                apply: verbatim,
            })
    }
}

/// Leading number of the value with a `px` suffix: `"8"` → `8px`,
/// `"1.50"` → `1.5px`, `"16px"` → `16px`, `"1e3"` → `1000px`.
pub fn size_px(value: &str) -> Option<String> {
    let number = leading_number(value)?;
    Some(format!("{}px", number_text(number)))
}

pub fn verbatim(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Longest prefix of `value` (after leading whitespace) of the form
/// `[+-]digits[.digits][(e|E)[+-]digits]`.
fn leading_number(value: &str) -> Option<f64> {
    let text = value.trim_start();
    let bytes = text.as_bytes();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digit_run(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digit_run(&bytes[end + 1..]);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    // A dangling exponent marker ("12e", "3e+") is not part of the number.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digit_run(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    text[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Shortest round-trip text, switching to exponent notation outside
/// `[1e-6, 1e21)` the way ECMAScript number-to-string does.
fn number_text(number: f64) -> String {
    if number == 0.0 {
        // Also folds -0 into "0".
        return "0".to_string();
    }
    let magnitude = number.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{number}");
    }
    let exp = format!("{number:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}
