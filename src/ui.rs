//! Terminal output.
//!
//! Buildpack output conventions: topic lines start with `----->`, detail
//! lines are indented to line up underneath, warnings use ` !     `. Also
//! provides a small auto-sizing table for `cache status`.

use colored::*;
use console::{measure_text_width, truncate_str};
use std::cmp;

const TOPIC: &str = "----->";
const PAD: &str = "       ";

pub fn topic(msg: &str) {
    println!("{} {}", TOPIC.bold(), msg);
}

pub fn indent(msg: &str) {
    for line in msg.lines() {
        println!("{}{}", PAD, line);
    }
}

pub fn warn(msg: &str) {
    for line in msg.lines() {
        eprintln!("{}{}", " !     ".yellow().bold(), line);
    }
}

pub fn tip(msg: &str) {
    let mut lines = msg.lines();
    if let Some(first) = lines.next() {
        println!("{}{} {}", PAD, "💡 Tip:".cyan(), first);
    }
    for line in lines {
        println!("{}{}", PAD, line);
    }
}

pub fn failure(msg: &str) {
    eprintln!("{} {}", TOPIC.bold().red(), msg.red());
}

/// Box-drawn table sized to its content, clipped to the terminal width.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| measure_text_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = cmp::max(widths[i], measure_text_width(&flatten(cell)));
            }
        }

        // Shrink the widest column until the table fits.
        let overhead = 3 + 3 * widths.len();
        while overhead + widths.iter().sum::<usize>() > max_width {
            let Some((idx, &w)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if w <= 8 {
                break;
            }
            widths[idx] -= 1;
        }

        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, segments.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut out = String::from("  │");
            for (cell, &width) in cells.iter().zip(&widths) {
                let text = truncate_str(&flatten(cell), width, "...").to_string();
                let padding = width.saturating_sub(measure_text_width(&text));
                let text = if bold { text.bold().to_string() } else { text };
                out.push_str(&format!(" {}{} │", text, " ".repeat(padding)));
            }
            out.push('\n');
            out
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers, true));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row, false));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }

    pub fn print(&self) {
        let (_, term_width) = console::Term::stdout().size();
        print!("{}", self.render(term_width as usize));
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}
