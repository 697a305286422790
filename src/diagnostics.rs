/// User-visible failure rendering.
///
/// One red bold `error:` header, a `file:line:column` pointer, then a
/// two-line source context with a caret underline on the offending token.
use colored::Colorize;

pub fn render(
    message: &str,
    path: &str,
    span: Option<(usize, usize)>,
    caret_width: usize,
    source: &str,
) -> String {
    let mut out = format!("{} {}", "error:".red().bold(), message.red().bold());
    match span {
        Some((line, column)) => {
            out.push_str(&format!("\n  --> {}:{}:{}", path, line, column));
            out.push_str(&context_listing(source, line, column, caret_width));
        }
        None => {
            out.push_str(&format!("\n  --> {}", path));
        }
    }
    out
}

fn context_listing(source: &str, line: usize, column: usize, caret_width: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if line == 0 || line > lines.len() {
        return String::new();
    }
    let mut out = String::new();
    let gutter = line.to_string().len();
    if line >= 2 {
        out.push_str(&format!(
            "\n {:>width$} | {}",
            line - 1,
            lines[line - 2],
            width = gutter
        ));
    }
    out.push_str(&format!(
        "\n {:>width$} | {}",
        line,
        lines[line - 1],
        width = gutter
    ));
    let pad = " ".repeat(gutter + 2 + column.saturating_sub(1));
    let caret = "^".repeat(caret_width.max(1));
    out.push_str(&format!("\n {}{}", pad, caret.red().bold()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_pointer_and_caret() {
        colored::control::set_override(false);
        let out = render(
            "unknown identifier 'foo'",
            "main.lu",
            Some((2, 5)),
            3,
            "let x = 1;\nlet foo = bar;",
        );
        assert!(out.contains("error: unknown identifier 'foo'"));
        assert!(out.contains("--> main.lu:2:5"));
        assert!(out.contains("1 | let x = 1;"));
        assert!(out.contains("2 | let foo = bar;"));
        assert!(out.contains("^^^"));
    }

    #[test]
    fn no_span_still_points_at_file() {
        colored::control::set_override(false);
        let out = render("boom", "m.lu", None, 1, "");
        assert!(out.contains("--> m.lu"));
    }
}
