//! Rename-template rendering.
//!
//! Templates mix literal text with two substitution forms: `%<spec><conv>`
//! applies a C-style format specifier to the caller's index, and `{...}`
//! evaluates a small expression language (`i`, `rand`, `add`/`sub`/`mul`/`div`,
//! `|` alternation, trailing `;i=` and `;fmt=` directives). `{{` and `%%`
//! escape the trigger characters.
//!
//! Rendering never fails: any fragment that does not evaluate is emitted
//! verbatim.

use rand::Rng;

/// Renders `template` for the given entry index.
pub fn render(template: &str, index: i64) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find(['{', '%']) {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];

        if let Some(stripped) = tail.strip_prefix("{{") {
            out.push('{');
            rest = stripped;
        } else if let Some(stripped) = tail.strip_prefix("%%") {
            out.push('%');
            rest = stripped;
        } else if tail.starts_with('{') {
            match matching_brace(tail) {
                Some(end) => {
                    out.push_str(&eval_expr(&tail[1..end], &tail[..=end], index));
                    rest = &tail[end + 1..];
                }
                // unterminated expression, emit verbatim
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            match FormatSpec::parse(&tail[1..]) {
                Some((spec, used)) => {
                    out.push_str(&spec.apply_int(index));
                    rest = &tail[1 + used..];
                }
                None => {
                    out.push('%');
                    rest = &tail[1..];
                }
            }
        }
    }

    out.push_str(rest);

    out
}

/// Evaluates the inside of a `{...}` fragment; `original` (braces included)
/// is returned whenever the expression does not parse.
fn eval_expr(inner: &str, original: &str, index: i64) -> String {
    let expr = inner.trim();

    let (expr, fmt) = split_directive(expr, ";fmt=");
    let (expr, choice) = split_directive(expr, ";i=");

    let Some(value) = eval_value(expr.trim(), choice, index) else {
        return original.to_owned();
    };

    match fmt {
        Some(spec) => apply_fmt(spec.trim(), &value),
        None => value,
    }
}

fn eval_value(expr: &str, choice: Option<&str>, index: i64) -> Option<String> {
    let parts = split_top(expr, '|');

    if parts.len() > 1 {
        let picked = match choice {
            Some(src) => eval_arg(src, index).unwrap_or(index),
            None => index,
        };

        let part = parts[picked.rem_euclid(parts.len() as i64) as usize];

        // only the chosen branch is evaluated; the others must not
        // consume any randomness
        return Some(render(part.trim(), index));
    }

    if expr == "i" || expr == "I" {
        return Some(index.to_string());
    }

    if let Ok(n) = expr.parse::<i64>() {
        return Some(n.to_string());
    }

    let words = split_args(expr);

    let value = match *words.first()? {
        "rand" => {
            let mut rng = rand::thread_rng();

            match words[1..] {
                [] => rng.gen_range(0..100),
                [n] => match eval_arg(n, index)? {
                    n if n <= 0 => 0,
                    n => rng.gen_range(0..n),
                },
                [min, max] => {
                    let min = eval_arg(min, index)?;
                    let max = eval_arg(max, index)?;

                    if max <= min {
                        min
                    } else {
                        rng.gen_range(min..max)
                    }
                }
                _ => return None,
            }
        }
        op @ ("add" | "sub" | "mul" | "div") => {
            let [a, b] = words[1..] else { return None };
            let a = eval_arg(a, index)?;
            let b = eval_arg(b, index)?;

            match op {
                "add" => a.checked_add(b)?,
                "sub" => a.checked_sub(b)?,
                "mul" => a.checked_mul(b)?,
                _ => a.checked_div(b)?,
            }
        }
        _ => return None,
    };

    Some(value.to_string())
}

/// Evaluates an operand: a nested `{...}` runs through the expression
/// evaluator, anything else is tried as an expression and then parsed as an
/// integer.
fn eval_arg(arg: &str, index: i64) -> Option<i64> {
    let arg = arg.trim();

    let rendered = if arg.starts_with('{') {
        match matching_brace(arg) {
            Some(end) if end == arg.len() - 1 => eval_expr(&arg[1..end], arg, index),
            _ => return None,
        }
    } else {
        match eval_value(arg, None, index) {
            Some(value) => value,
            None => arg.to_owned(),
        }
    };

    rendered.trim().parse().ok()
}

/// Applies a trailing `;fmt=%...` directive: the value is formatted as an
/// integer if it parses as one, as a string under `%s`, and is otherwise left
/// untouched.
fn apply_fmt(spec_src: &str, value: &str) -> String {
    let Some((spec, used)) = spec_src.strip_prefix('%').and_then(FormatSpec::parse) else {
        return value.to_owned();
    };

    if used < spec_src.len() - 1 {
        return value.to_owned();
    }

    if let Ok(n) = value.parse::<i64>() {
        spec.apply_int(n)
    } else if spec.conv == 's' {
        spec.apply_str(value)
    } else {
        value.to_owned()
    }
}

/// Splits `expr` at a top-level occurrence of `directive`, returning the
/// remainder and the directive's argument.
fn split_directive<'e>(expr: &'e str, directive: &str) -> (&'e str, Option<&'e str>) {
    match find_top(expr, directive) {
        Some(at) => (&expr[..at], Some(&expr[at + directive.len()..])),
        None => (expr, None),
    }
}

/// Byte offset of the `}` matching the `{` that `s` starts with.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;

    for (at, byte) in s.bytes().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;

                if depth == 0 {
                    return Some(at);
                }
            }
            _ => {}
        }
    }

    None
}

fn find_top(s: &str, needle: &str) -> Option<usize> {
    let mut depth = 0usize;
    let bytes = s.as_bytes();

    for at in 0..bytes.len() {
        match bytes[at] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            // byte-wise comparison, `at` may sit inside a multibyte char
            _ if depth == 0 && bytes[at..].starts_with(needle.as_bytes()) => return Some(at),
            _ => {}
        }
    }

    None
}

fn split_top(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (at, byte) in s.bytes().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            _ if depth == 0 && byte == sep as u8 => {
                parts.push(&s[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }

    parts.push(&s[start..]);

    parts
}

/// Splits on top-level whitespace, keeping nested `{...}` operands intact.
fn split_args(s: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = None;

    for (at, byte) in s.bytes().enumerate() {
        match byte {
            b'{' => {
                depth += 1;
                start.get_or_insert(at);
            }
            b'}' => depth = depth.saturating_sub(1),
            b' ' | b'\t' if depth == 0 => {
                if let Some(from) = start.take() {
                    args.push(&s[from..at]);
                }
            }
            _ => {
                start.get_or_insert(at);
            }
        }
    }

    if let Some(from) = start {
        args.push(&s[from..]);
    }

    args
}

/// A `%[flags][width]<conv>` specifier; the supported conversions are
/// `d i u x X o b s`.
struct FormatSpec {
    left_align: bool,
    zero_pad: bool,
    width: usize,
    conv: char,
}

impl FormatSpec {
    /// Parses the part after `%`, returning the spec and the bytes consumed.
    fn parse(s: &str) -> Option<(Self, usize)> {
        let mut left_align = false;
        let mut zero_pad = false;
        let mut chars = s.char_indices().peekable();

        while let Some(&(_, c)) = chars.peek() {
            match c {
                '-' => left_align = true,
                '0' => zero_pad = true,
                _ => break,
            }

            chars.next();
        }

        let mut width = 0usize;

        while let Some(&(_, c)) = chars.peek() {
            match c.to_digit(10) {
                Some(d) => width = width * 10 + d as usize,
                None => break,
            }

            chars.next();
        }

        let (at, conv) = chars.next()?;

        if !matches!(conv, 'd' | 'i' | 'u' | 'x' | 'X' | 'o' | 'b' | 's') {
            return None;
        }

        let spec = Self {
            left_align,
            zero_pad,
            width,
            conv,
        };

        Some((spec, at + conv.len_utf8()))
    }

    fn apply_int(&self, v: i64) -> String {
        let (negative, body) = match self.conv {
            'd' | 'i' => (v < 0, v.unsigned_abs().to_string()),
            'u' => (false, (v as u64).to_string()),
            'x' => (false, format!("{:x}", v as u64)),
            'X' => (false, format!("{:X}", v as u64)),
            'o' => (false, format!("{:o}", v as u64)),
            'b' => (false, format!("{:b}", v as u64)),
            _ => return self.apply_str(&v.to_string()),
        };

        self.pad(&body, negative)
    }

    fn apply_str(&self, s: &str) -> String {
        if self.left_align {
            format!("{s:<width$}", width = self.width)
        } else {
            format!("{s:>width$}", width = self.width)
        }
    }

    fn pad(&self, body: &str, negative: bool) -> String {
        let sign = if negative { "-" } else { "" };
        let len = body.len() + sign.len();

        if len >= self.width {
            format!("{sign}{body}")
        } else if self.left_align {
            format!("{sign}{body}{:pad$}", "", pad = self.width - len)
        } else if self.zero_pad {
            format!("{sign}{:0>pad$}{body}", "", pad = self.width - len)
        } else {
            format!("{:pad$}{sign}{body}", "", pad = self.width - len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::render;

    #[test]
    fn literal_passthrough() {
        assert_eq!(render("plain text", 3), "plain text");
        assert_eq!(render("open {{ and %% done", 0), "open { and % done");
    }

    #[test]
    fn index_substitution() {
        assert_eq!(render("{i}", 7), "7");
        assert_eq!(render("user {I}", 12), "user 12");
        assert_eq!(render("%d", 42), "42");
        assert_eq!(render("%04d", 7), "0007");
        assert_eq!(render("%-4d|", 7), "7   |");
        assert_eq!(render("%x", 255), "ff");
    }

    #[test]
    fn rand_bounds() {
        assert_eq!(render("{rand 1}", 0), "0");
        assert_eq!(render("{rand 0}", 0), "0");
        assert_eq!(render("{rand -5}", 0), "0");
        assert_eq!(render("{rand 3 3}", 0), "3");
        assert_eq!(render("{rand 9 2}", 0), "9");

        for _ in 0..50 {
            let v: i64 = render("{rand 5 8}", 0).parse().unwrap();
            assert!((5..8).contains(&v));
        }
    }

    #[test]
    fn rand_formatted() {
        assert_eq!(render("{rand 1;fmt=%04d}", 0), "0000");
    }

    #[test]
    fn arithmetic() {
        assert_eq!(render("{add 1 1}", 0), "2");
        assert_eq!(render("{sub 10 4}", 0), "6");
        assert_eq!(render("{mul 6 7}", 0), "42");
        assert_eq!(render("{div 9 2}", 0), "4");
        assert_eq!(render("{add 1 {rand 0}}", 0), "1");
        assert_eq!(render("{add i 1}", 4), "5");
    }

    #[test]
    fn arithmetic_failure_keeps_fragment() {
        assert_eq!(render("{add 1 x}", 0), "{add 1 x}");
        assert_eq!(render("{div 1 0}", 0), "{div 1 0}");
        assert_eq!(render("{frobnicate}", 0), "{frobnicate}");
    }

    #[test]
    fn alternation() {
        assert_eq!(render("{a|b}", 0), "a");
        assert_eq!(render("{a|b}", 1), "b");
        assert_eq!(render("{a|b}", 2), "a");
        assert_eq!(render("{a|b|c}", -1), "c");
    }

    #[test]
    fn alternation_with_explicit_index() {
        assert_eq!(render("{a|b;i=1}", 0), "b");
        assert_eq!(render("{a|b;i={add 1 1}}", 1), "a");
    }

    #[test]
    fn alternation_branches_are_templates() {
        assert_eq!(render("{x{add 2 3}|y}", 0), "x5");
        assert_eq!(render("{x|y %02d}", 1), "y 01");
    }

    #[test]
    fn unterminated_expression_is_verbatim() {
        assert_eq!(render("tail {add 1", 0), "tail {add 1");
    }

    #[test]
    fn numeric_literal_with_format() {
        assert_eq!(render("{255;fmt=%X}", 0), "FF");
        assert_eq!(render("{7;fmt=%-3d}.", 0), "7  .");
    }
}
