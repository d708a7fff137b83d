//! The printf-style directive engine behind `(format …)`.
//!
//! Recognized directives: `%d` (integer), `%s` (string), `%f` (float,
//! default precision 6), `%x` (lowercase hex), `%b` (binary), and `%%` for
//! a literal percent sign. A directive may carry a positional reference
//! (`%2$s`, 1-based), a zero-pad flag, a minimum width, and a precision
//! (`%01.2f`, `%10s`, `%.3s`). Positional references do not advance the
//! sequential argument cursor.

use std::iter::Peekable;
use std::str::Chars;

use crate::Error;
use crate::ast::Value;

struct Directive {
    /// 1-based argument reference from `%N$…`
    position: Option<usize>,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    conv: char,
}

/// Render a format string against resolved arguments.
pub fn render(fmt: &str, args: &[Value]) -> Result<String, Error> {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut next_arg = 0usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let directive = parse_directive(&mut chars)?;
        let arg = match directive.position {
            Some(p) => args.get(p - 1),
            None => {
                let a = args.get(next_arg);
                next_arg += 1;
                a
            }
        }
        .ok_or_else(|| {
            Error::EvalError(format!(
                "format: missing argument for directive %{}",
                directive.conv
            ))
        })?;
        out.push_str(&render_directive(&directive, arg));
    }
    Ok(out)
}

fn take_digits(chars: &mut Peekable<Chars>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek()
        && c.is_ascii_digit()
    {
        digits.push(*c);
        chars.next();
    }
    digits
}

fn parse_directive(chars: &mut Peekable<Chars>) -> Result<Directive, Error> {
    let mut digits = take_digits(chars);
    let mut position = None;

    if chars.peek() == Some(&'$') {
        chars.next();
        let n: usize = digits
            .parse()
            .map_err(|_| Error::EvalError("format: malformed positional reference".to_owned()))?;
        if n == 0 {
            return Err(Error::EvalError(
                "format: positional references are 1-based".to_owned(),
            ));
        }
        position = Some(n);
        digits = take_digits(chars);
    }

    let zero_pad = digits.starts_with('0');
    let width = if digits.is_empty() {
        0
    } else {
        digits
            .parse()
            .map_err(|_| Error::EvalError("format: width out of range".to_owned()))?
    };

    let precision = if chars.peek() == Some(&'.') {
        chars.next();
        let digits = take_digits(chars);
        Some(digits.parse().unwrap_or(0))
    } else {
        None
    };

    match chars.next() {
        Some(conv @ ('d' | 's' | 'f' | 'x' | 'b')) => Ok(Directive {
            position,
            zero_pad,
            width,
            precision,
            conv,
        }),
        Some(other) => Err(Error::EvalError(format!(
            "format: unknown directive %{other}"
        ))),
        None => Err(Error::EvalError(
            "format: dangling % at end of format string".to_owned(),
        )),
    }
}

fn render_directive(d: &Directive, arg: &Value) -> String {
    let text = match d.conv {
        'd' => {
            let n = arg.to_number();
            format!("{}", n.trunc() as i64)
        }
        'x' => format!("{:x}", arg.to_number().trunc() as i64),
        'b' => format!("{:b}", arg.to_number().trunc() as i64),
        'f' => {
            let precision = d.precision.unwrap_or(6);
            format!("{:.precision$}", arg.to_number())
        }
        // 's' - precision truncates, printf-style
        _ => {
            let s = arg.to_display();
            match d.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            }
        }
    };
    pad(text, d.width, d.zero_pad)
}

/// Right-align to `width`, with zeros kept behind a leading minus sign.
fn pad(text: String, width: usize, zero_pad: bool) -> String {
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let fill = width - len;
    if zero_pad {
        match text.strip_prefix('-') {
            Some(rest) => format!("-{}{}", "0".repeat(fill), rest),
            None => format!("{}{}", "0".repeat(fill), text),
        }
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;

    fn fmt(template: &str, args: &[Value]) -> String {
        render(template, args).unwrap()
    }

    #[test]
    fn test_directives_data_driven() {
        let cases: Vec<(&str, Vec<Value>, &str)> = vec![
            // plain passthrough
            ("no directives", vec![], "no directives"),
            ("", vec![], ""),
            ("100%%", vec![], "100%"),
            // %d truncates toward zero
            ("%d", vec![val(42)], "42"),
            ("%d", vec![val(99.7)], "99"),
            ("%d", vec![val(-3.9)], "-3"),
            ("%d", vec![val("17")], "17"),
            // %s uses the host string conversion
            ("%s", vec![val("tree")], "tree"),
            ("%s", vec![val(5)], "5"),
            ("%s", vec![crate::ast::Value::Null], "null"),
            ("%s", vec![val([1, 2])], "1,2"),
            // %f with default and explicit precision
            ("%f", vec![val(1.5)], "1.500000"),
            ("%.2f", vec![val(3.14159)], "3.14"),
            ("%.0f", vec![val(2.7)], "3"),
            // %x and %b
            ("%x", vec![val(255)], "ff"),
            ("%b", vec![val(5)], "101"),
            // width and zero padding
            ("%10s", vec![val("hi")], "        hi"),
            ("%5d", vec![val(42)], "   42"),
            ("%05d", vec![val(42)], "00042"),
            ("%05d", vec![val(-42)], "-0042"),
            ("%01.2f", vec![val(3.14159)], "3.14"),
            ("%08.2f", vec![val(-3.14159)], "-0003.14"),
            // %.Ns truncates
            ("%.3s", vec![val("monkeys")], "mon"),
            // sequential consumption
            ("%d + %d = %d", vec![val(1), val(2), val(3)], "1 + 2 = 3"),
            // positional references
            (
                "The %2$s contains %1$d monkeys",
                vec![val(5), val("tree")],
                "The tree contains 5 monkeys",
            ),
            ("%1$s%1$s", vec![val("ha")], "haha"),
        ];
        for (template, args, expected) in cases {
            assert_eq!(fmt(template, &args), expected, "template {template:?}");
        }
    }

    #[test]
    fn test_format_errors() {
        assert!(render("%d", &[]).is_err());
        assert!(render("%3$d", &[val(1)]).is_err());
        assert!(render("%q", &[val(1)]).is_err());
        assert!(render("trailing %", &[]).is_err());
        assert!(render("%0$d", &[val(1)]).is_err());
    }

    #[test]
    fn test_positional_does_not_advance_cursor() {
        // the sequential cursor ignores positional directives
        assert_eq!(
            fmt("%2$s %s %s", &[val("a"), val("b")]),
            "b a b"
        );
    }
}
