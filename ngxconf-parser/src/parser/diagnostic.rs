//! Human-readable parse error reports

use crate::parser::parser::ParseError;
use ariadne::{Config as ReportConfig, IndexType, Label, Report, ReportKind, Source};

/// Render `error` as a report pointing into `source`.
///
/// `name` identifies the source in the report header (usually the file path).
pub fn render_report(error: &ParseError, name: &str, source: &str, color: bool) -> String {
    let location = error.location();
    let start = location.start.min(source.len());
    let end = location.end.clamp(start, source.len());
    let span = start..end;

    let mut report = Report::build(ReportKind::Error, (name, span.clone()))
        .with_config(
            ReportConfig::default()
                .with_color(color)
                .with_index_type(IndexType::Byte),
        )
        .with_message(error.to_string())
        .with_label(Label::new((name, span)).with_message(error.label()));
    if let Some(help) = error.help() {
        report = report.with_help(help);
    }

    let mut out = Vec::new();
    match report.finish().write((name, Source::from(source)), &mut out) {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to render diagnostic");
            let (line, column) = location.line_col(source);
            format!("{}:{}:{}: {}", name, line, column, error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_report_mentions_error_and_help() {
        let source = "events {\n  worker_connections 1024;\n";
        let err = parse(source).unwrap_err();
        let report = render_report(&err, "nginx.conf", source, false);

        assert!(report.contains("never closed"));
        assert!(report.contains("nginx.conf"));
        assert!(report.contains("block opened here"));
        assert!(report.contains("add a closing '}'"));
    }

    #[test]
    fn test_report_for_lex_error() {
        let source = "root \"/var/www;\n";
        let err = parse(source).unwrap_err();
        let report = render_report(&err, "site.conf", source, false);

        assert!(report.contains("unterminated quoted string"));
        assert!(report.contains("string starts here"));
    }
}
