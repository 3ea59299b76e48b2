//! Format spec suffixes for placeholders such as `{step:03d}`.
//! Covers the subset of the `[[fill]align][sign][0][width][.precision][type]`
//! mini-language that is useful in file names: padding, signs, precision and
//! the `s d f x o b` presentation types. Every spec also knows how to match
//! and convert its own output back when a path is parsed.

use serde_json::Value;

use crate::template::SEGMENT_PATTERN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    AfterSign,
}

impl Align {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            '=' => Some(Align::AfterSign),
            _ => None,
        }
    }
}

/// A parsed format spec, the part of a placeholder after the colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    raw: String,
    fill: char,
    align: Option<Align>,
    plus: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    kind: Option<char>,
}

impl FormatSpec {
    /// Parses a spec, returning `None` if it isn't part of the supported grammar.
    pub fn parse(raw: &str) -> Option<Self> {
        let chars: Vec<char> = raw.chars().collect();
        let mut spec = FormatSpec {
            raw: raw.to_string(),
            fill: ' ',
            align: None,
            plus: false,
            zero: false,
            width: 0,
            precision: None,
            kind: None,
        };
        let mut i = 0;

        if chars.len() >= 2 && Align::from_char(chars[1]).is_some() {
            spec.fill = chars[0];
            spec.align = Align::from_char(chars[1]);
            i = 2;
        } else if let Some(align) = chars.first().and_then(|c| Align::from_char(*c)) {
            spec.align = Some(align);
            i = 1;
        }

        match chars.get(i) {
            Some('+') => {
                spec.plus = true;
                i += 1;
            }
            Some('-') | Some(' ') => i += 1,
            _ => {}
        }

        if chars.get(i) == Some(&'#') {
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            spec.zero = true;
            i += 1;
        }

        let start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        if i > start {
            spec.width = chars[start..i].iter().collect::<String>().parse().ok()?;
        }

        if chars.get(i) == Some(&'.') {
            i += 1;
            let start = i;
            while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
            if i == start {
                return None;
            }
            spec.precision = chars[start..i].iter().collect::<String>().parse().ok();
        }

        match chars.get(i) {
            Some(c) if "sdfFeEgGxXob%n".contains(*c) => {
                spec.kind = Some(*c);
                i += 1;
            }
            Some(_) => return None,
            None => {}
        }

        (i == chars.len()).then_some(spec)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn is_integer(&self) -> bool {
        matches!(self.kind, Some('d' | 'x' | 'X' | 'o' | 'b' | 'n'))
    }

    fn is_float(&self) -> bool {
        matches!(self.kind, Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%'))
    }

    /// Renders a bound value, or `None` when the value doesn't suit the type.
    pub fn apply(&self, value: &Value) -> Option<String> {
        let (sign, digits, numeric) = if self.is_integer() {
            let n = as_i64(value)?;
            let magnitude = n.unsigned_abs();
            let digits = match self.kind {
                Some('x') => format!("{magnitude:x}"),
                Some('X') => format!("{magnitude:X}"),
                Some('o') => format!("{magnitude:o}"),
                Some('b') => format!("{magnitude:b}"),
                _ => magnitude.to_string(),
            };
            (self.sign_for(n < 0), digits, true)
        } else if self.is_float() {
            let f = as_f64(value)?;
            let precision = self.precision.unwrap_or(6);
            let digits = match self.kind {
                Some('%') => format!("{:.*}%", precision, (f * 100.0).abs()),
                Some('e') => format!("{:.*e}", precision, f.abs()),
                Some('E') => format!("{:.*E}", precision, f.abs()),
                Some('f' | 'F') => format!("{:.*}", precision, f.abs()),
                _ => f.abs().to_string(),
            };
            (self.sign_for(f.is_sign_negative() && f != 0.0), digits, true)
        } else {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) if self.kind.is_none() => {
                    return Some(self.pad(self.sign_for(false), &n.to_string(), true));
                }
                other => display_value(other),
            };
            let text = match self.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            };
            (String::new(), text, false)
        };

        Some(self.pad(sign, &digits, numeric))
    }

    fn sign_for(&self, negative: bool) -> String {
        if negative {
            "-".to_string()
        } else if self.plus {
            "+".to_string()
        } else {
            String::new()
        }
    }

    fn pad(&self, sign: String, body: &str, numeric: bool) -> String {
        let len = sign.chars().count() + body.chars().count();
        if len >= self.width {
            return format!("{sign}{body}");
        }
        let gap = self.width - len;

        let (fill, align) = match (self.align, self.zero && numeric) {
            (None, true) => ('0', Align::AfterSign),
            (Some(align), _) => (self.fill, align),
            (None, false) if numeric => (self.fill, Align::Right),
            (None, false) => (self.fill, Align::Left),
        };
        let run = |n: usize| fill.to_string().repeat(n);

        match align {
            Align::Left => format!("{sign}{body}{}", run(gap)),
            Align::Right => format!("{}{sign}{body}", run(gap)),
            Align::Center => format!("{}{sign}{body}{}", run(gap / 2), run(gap - gap / 2)),
            Align::AfterSign => format!("{sign}{}{body}", run(gap)),
        }
    }

    /// Regular expression matching what `apply` can produce inside one segment.
    pub fn pattern(&self) -> String {
        let core = match self.kind {
            Some('d' | 'n') => r"[-+]?\d+",
            Some('x' | 'X') => r"[-+]?[0-9a-fA-F]+",
            Some('o') => r"[-+]?[0-7]+",
            Some('b') => r"[-+]?[01]+",
            Some('%') => r"[-+]?(?:\d+\.?\d*|\.\d+)%",
            Some(_) if self.is_float() => r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?",
            _ => return SEGMENT_PATTERN.to_string(),
        };
        if self.width > 0 && self.fill != '0' {
            let fill = regex::escape(&self.fill.to_string());
            format!("(?:{fill})*{core}(?:{fill})*")
        } else {
            core.to_string()
        }
    }

    /// Removes the fill that `pad` added, on the side the alignment put it.
    fn strip_padding(&self, text: &str) -> String {
        if self.width == 0 {
            return text.to_string();
        }
        let numeric = self.is_integer() || self.is_float();
        let fill = self.fill;
        match self.align {
            Some(Align::Left) => text.trim_end_matches(fill).to_string(),
            Some(Align::Right) => text.trim_start_matches(fill).to_string(),
            Some(Align::Center) => text.trim_matches(fill).to_string(),
            Some(Align::AfterSign) => {
                let body = text.trim_start_matches(['-', '+']);
                let sign = &text[..text.len() - body.len()];
                format!("{sign}{}", body.trim_start_matches(fill))
            }
            // the implicit `0` flag pads after the sign, number parsing skips it
            None if self.zero && numeric => text.to_string(),
            None if numeric => text.trim_start_matches(fill).to_string(),
            None if self.kind.is_none() => text.trim_matches(fill).to_string(),
            None => text.trim_end_matches(fill).to_string(),
        }
    }

    /// Converts a matched segment back into a value.
    pub fn convert(&self, text: &str) -> Option<Value> {
        let unpadded = self.strip_padding(text);
        let trimmed = unpadded.as_str();

        if self.is_integer() {
            let (negative, digits) = match trimmed.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, trimmed.trim_start_matches('+')),
            };
            // a value made only of zero fill
            let digits = if digits.is_empty() { "0" } else { digits };
            let radix = match self.kind {
                Some('x' | 'X') => 16,
                Some('o') => 8,
                Some('b') => 2,
                _ => 10,
            };
            let n = i64::from_str_radix(digits, radix).ok()?;
            Some(Value::from(if negative { -n } else { n }))
        } else if self.is_float() {
            let (number, scale) = match trimmed.strip_suffix('%') {
                Some(rest) => (rest, 100.0),
                None => (trimmed, 1.0),
            };
            let f: f64 = number.parse().ok()?;
            serde_json::Number::from_f64(f / scale).map(Value::Number)
        } else {
            Some(Value::String(trimmed.to_string()))
        }
    }
}

/// Plain rendering used when a placeholder has no spec.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
