use colored::*;

use crate::models::{
    client::{Client, Union},
    period::Period,
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the glyph for a client's payroll status in the checklist
pub fn get_status_glyph(sent: bool) -> ColoredString {
    if sent { "✓".green() } else { "○".normal() }
}

/// Build the right-hand context for a client line, e.g. "CNPJ: 12.345.678/0001-90 | Pró-Labore"
pub fn get_client_context(client: &Client) -> String {
    if client.cnpj.trim().is_empty() {
        client.payroll_kind().to_string()
    } else {
        format!("CNPJ: {} | {}", client.cnpj, client.payroll_kind())
    }
}

/// Render a client line with its list position and right-aligned context.
/// `sent` adds the checklist glyph.
pub fn render_client_line(position: usize, client: &Client, sent: Option<bool>) {
    let terminal_width = get_terminal_width();

    let position_str = format!("{:>3}", position);
    let glyph = sent.map(get_status_glyph);
    let left_section = match &glyph {
        Some(glyph) => format!("  {}  {}  {}", position_str, glyph, client.name),
        None => format!("  {}  {}", position_str, client.name),
    };

    let styled_left = if sent == Some(true) {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    let context = get_client_context(client);

    // Glyph width is one column regardless of its escape codes
    let left_visible_len = match glyph {
        Some(_) => format!("  {}  {}  {}", position_str, " ", client.name).chars().count(),
        None => format!("  {}  {}", position_str, client.name).chars().count(),
    };
    let total_content = left_visible_len + context.chars().count();

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!("{}{}{}", styled_left, " ".repeat(padding), context.dimmed());
    } else {
        println!("{}", styled_left);
        println!("       {}", context.dimmed());
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let client_word = if count == 1 { "client" } else { "clients" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, client_word);
}

/// Render the checklist header for a month, e.g. "Março/2024  2/5 sent"
pub fn render_checklist_header(period: Period, sent: usize, total: usize) {
    println!(
        "\n  {}  {}\n",
        format!("‹ {} ›", period).cyan().bold(),
        format!("{}/{} sent", sent, total).dimmed()
    );
}

/// Render every field of a client
pub fn render_client_details(client: &Client) {
    println!("\n  {}", client.name.cyan().bold());

    let fields = [
        ("Id", client.id.as_str()),
        ("CNPJ", client.cnpj.as_str()),
        ("Address", client.address.as_str()),
        ("Phone", client.phone.as_str()),
        ("Email", client.email.as_str()),
        ("Payroll", client.payroll_kind()),
    ];
    for (label, value) in fields {
        if !value.trim().is_empty() {
            println!("    {} {}", format!("{label}:").dimmed(), value);
        }
    }

    if let Some(union) = &client.union {
        println!("    {} {}", "Union:".dimmed(), format_union(union));
    }
    println!();
}

/// Render one known union
pub fn render_union_line(union: &Union) {
    println!("  {} {}", "•".green(), format_union(union));
}

fn format_union(union: &Union) -> String {
    match union.base_month() {
        Some(month) => format!(
            "{} (base date: {})",
            union.name,
            crate::models::period::MONTH_NAMES[(month - 1) as usize]
        ),
        None => union.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_context() {
        let mut client = Client {
            name: "Padaria".to_string(),
            ..Client::default()
        };
        assert_eq!(get_client_context(&client), "Folha Completa");

        client.cnpj = "12.345.678/0001-90".to_string();
        client.pro_labore = true;
        assert_eq!(get_client_context(&client), "CNPJ: 12.345.678/0001-90 | Pró-Labore");
    }

    #[test]
    fn test_format_union() {
        let union = Union {
            name: "Sindpan".to_string(),
            base_date: "3".to_string(),
        };
        assert_eq!(format_union(&union), "Sindpan (base date: março)");

        let undated = Union {
            name: "Sindpan".to_string(),
            base_date: String::new(),
        };
        assert_eq!(format_union(&undated), "Sindpan");
    }
}
