//! Console output helpers shared by the peer CLI: colored status lines, tables, and progress
//! bars for downloads. Trimmed to the parts that don't depend on any particular data model.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for a chunk download, advanced once per completed chunk.
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    pub fn new(total_chunks: u64) -> Self {
        let bar = ProgressBar::new(total_chunks);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({msg})")
                .unwrap()
                .progress_chars("#>-"),
        );
        bar.set_message("downloading");
        Self { bar }
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Display a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("▶ {}", title).bold().bright_blue());
    println!("{}", "─".repeat(title.len() + 2).bright_blue());
}

/// Display key-value information in a formatted way.
pub fn print_key_value(key: &str, value: &str) {
    println!("  {}: {}", key.bold().bright_white(), value.bright_green());
}

/// Display a table with headers and rows, column widths sized to content.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if headers.is_empty() {
        return;
    }

    let mut col_widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < col_widths.len() {
                col_widths[i] = col_widths[i].max(cell.len());
            }
        }
    }

    print!("  ");
    for (i, header) in headers.iter().enumerate() {
        print!("{:<width$}", header.bold().bright_cyan(), width = col_widths[i] + 2);
    }
    println!();

    print!("  ");
    for width in &col_widths {
        print!("{}", "─".repeat(width + 2));
    }
    println!();

    for row in rows {
        print!("  ");
        for (i, cell) in row.iter().enumerate() {
            if i < col_widths.len() {
                print!("{:<width$}", cell, width = col_widths[i] + 2);
            }
        }
        println!();
    }
    println!();
}

/// Color a tier name the way the tracker's reputation bands are presented: bronze dim, prata
/// white, ouro yellow, diamante bright cyan.
pub fn colored_tier(tier: &str) -> ColoredString {
    match tier {
        "bronze" => tier.truecolor(205, 127, 50),
        "prata" => tier.white(),
        "ouro" => tier.yellow(),
        "diamante" => tier.bright_cyan().bold(),
        other => other.normal(),
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".cyan(), message);
}

/// Format a byte count in human-readable units.
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if size == 0 {
        return "0 B".to_string();
    }

    let mut size_f = size as f64;
    let mut unit_index = 0;
    while size_f >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size_f /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size_f, UNITS[unit_index])
    }
}
