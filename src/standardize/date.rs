use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use regex::Regex;

/// A partner date pattern (`MM/dd/yyyy` style), compiled to a chrono format string.
///
/// Supported letters: `y` (`yy` two-digit year, `yyyy` exactly four digits), `M`
/// (`M`/`MM` numeric, `MMM` short name, `MMMM` full name), `d`, `D` (day of year). Text in
/// single quotes is literal, `''` is a quote. A pattern containing `%` is used as a
/// strftime string as-is.
#[derive(Debug, Clone)]
pub struct DatePattern {
    source: String,
    chrono_fmt: String,
    /// Field widths chrono does not enforce on parse (e.g. `%Y` takes any digit count).
    shape: Option<Regex>,
}

impl PartialEq for DatePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for DatePattern {}

impl DatePattern {
    pub fn compile(pattern: &str) -> Result<Self, String> {
        let (chrono_fmt, shape) = if pattern.contains('%') {
            (pattern.to_string(), None)
        } else {
            let (fmt, shape) = translate(pattern)?;
            let shape = Regex::new(&format!("^{shape}$"))
                .map_err(|e| format!("invalid dob_format {pattern:?}: {e}"))?;
            (fmt, Some(shape))
        };

        if StrftimeItems::new(&chrono_fmt).any(|item| item == Item::Error) {
            return Err(format!("invalid dob_format {pattern:?}"));
        }

        Ok(Self {
            source: pattern.to_string(),
            chrono_fmt,
            shape,
        })
    }

    /// Pattern as written in the partner config.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `None` when `raw` does not match the pattern in full.
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Some(shape) = &self.shape {
            if !shape.is_match(raw) {
                return None;
            }
        }
        NaiveDate::parse_from_str(raw, &self.chrono_fmt).ok()
    }
}

/// Returns the chrono format and a regex body describing the accepted input.
fn translate(pattern: &str) -> Result<(String, String), String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut shape = String::with_capacity(pattern.len() * 4);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' outside a quoted run is a literal quote
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                shape.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => return Err(format!("unterminated quote in dob_format {pattern:?}")),
                    Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                        out.push('\'');
                        shape.push('\'');
                        j += 2;
                    }
                    Some('\'') => break,
                    Some(lit) => {
                        out.push(*lit);
                        shape.push_str(&regex::escape(&lit.to_string()));
                        j += 1;
                    }
                }
            }
            i = j + 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            out.push(c);
            shape.push_str(&regex::escape(&c.to_string()));
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let (spec, field) = match (c, run) {
            ('y', 2) => ("%y", r"\d{2}".to_string()),
            ('y', 4) => ("%Y", r"\d{4}".to_string()),
            ('y', n) => ("%Y", format!(r"\d{{{n},}}")),
            ('M', 1..=2) => ("%m", r"\d{1,2}".to_string()),
            ('M', 3) => ("%b", r"\p{L}{3}".to_string()),
            ('M', _) => ("%B", r"\p{L}+".to_string()),
            ('d', 1..=2) => ("%d", r"\d{1,2}".to_string()),
            ('D', 1..=3) => ("%j", r"\d{1,3}".to_string()),
            _ => {
                return Err(format!(
                    "unsupported pattern letters {:?} in dob_format {pattern:?}",
                    c.to_string().repeat(run)
                ))
            }
        };
        out.push_str(spec);
        shape.push_str(&field);
        i += run;
    }

    Ok((out, shape))
}
