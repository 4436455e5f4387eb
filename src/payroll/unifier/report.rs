//! Human-facing summary: locale number formatting and the HTML body handed
//! to the notification sink. Raw CSV values never pass through these
//! formatters; thousands separators exist only in this summary.

use crate::payroll::unifier::aggregate::CategorySums;

/// Per-period block of the summary email.
#[derive(Debug, Clone)]
pub struct PeriodSection {
    pub title: String,
    pub csv_name: Option<String>,
    pub records: usize,
    /// Entity label and its accumulated sums, entities with data only.
    pub entities: Vec<(String, CategorySums)>,
    pub consistent: Option<bool>,
    pub total_divergence: f64,
    pub errors: usize,
}

/// Formats an amount as currency: `$` prefix, `.` thousands separator,
/// `,` decimal separator (`1234567.5` → `$1.234.567,50`).
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{sign}${},{:02}",
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Formats a count with `.` as thousands separator (`27034` → `27.034`).
pub fn format_count(value: usize) -> String {
    group_thousands(value as u64)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

/// Renders the run summary as a plain HTML document.
pub fn render_summary(sections: &[PeriodSection], generated_at: &str) -> String {
    let mut html = String::new();
    html.push_str("<html><body>\n");
    html.push_str("<h2>Monthly payroll unification</h2>\n");
    html.push_str(&format!("<p>Generated: {generated_at}</p>\n"));

    for section in sections {
        html.push_str(&format!("<h3>Period {}</h3>\n", section.title));
        match &section.csv_name {
            Some(name) => html.push_str(&format!(
                "<p>{} records &mdash; attached as <b>{name}</b></p>\n",
                format_count(section.records)
            )),
            None => html.push_str("<p>No extract was produced for this period.</p>\n"),
        }

        if !section.entities.is_empty() {
            html.push_str("<table border=\"1\" cellpadding=\"4\">\n");
            html.push_str(
                "<tr><th>Entity type</th><th>Personal</th><th>Affiliate</th>\
                 <th>Voluntary fund</th><th>Assistance credit</th>\
                 <th>Employer</th><th>Total</th></tr>\n",
            );
            for (label, sums) in &section.entities {
                html.push_str(&format!(
                    "<tr><td>{label}</td><td>{}</td><td>{}</td><td>{}</td>\
                     <td>{}</td><td>{}</td><td><b>{}</b></td></tr>\n",
                    format_currency(sums.personal),
                    format_currency(sums.affiliate),
                    format_currency(sums.voluntary_fund),
                    format_currency(sums.assistance_credit),
                    format_currency(sums.employer),
                    format_currency(sums.total()),
                ));
            }
            html.push_str("</table>\n");
        }

        match section.consistent {
            Some(true) => html.push_str("<p>Consistency check: OK</p>\n"),
            Some(false) => html.push_str(&format!(
                "<p><b>Consistency check: divergence of {}</b></p>\n",
                format_currency(section.total_divergence)
            )),
            None => {}
        }

        if section.errors > 0 {
            html.push_str(&format!(
                "<p>{} file(s) reported problems; see the run log.</p>\n",
                section.errors
            ));
        }
    }

    html.push_str("</body></html>\n");
    html
}
