#![forbid(unsafe_code)]
//! Print the credential ledger and its audit report

use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use credchain::blockchain::{audit_chain, GENESIS_PREVIOUS_HASH};
use credchain::cli::{load_config_with_overrides, open_store};
use credchain::persistence::Persistence;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ledger file (overrides ledger.path)
    #[arg(short, long)]
    ledger: Option<PathBuf>,

    /// Show full hashes instead of shortened ones
    #[arg(long)]
    full: bool,
}

// Counts chars, not bytes: tampered ledgers can hold any text here.
fn shorten(hash: &str, full: bool) -> String {
    let len = hash.chars().count();
    if full || len <= 16 {
        return hash.to_string();
    }
    let head: String = hash.chars().take(8).collect();
    let tail: String = hash.chars().skip(len - 6).collect();
    format!("{}...{}", head, tail)
}

fn format_timestamp(ts: f64) -> String {
    let secs = ts.trunc() as i64;
    let nanos = (ts.fract() * 1e9) as u32;
    chrono::DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config_with_overrides(args.config.as_deref(), args.ledger)?;
    let chain = open_store(&config).load_chain()?;

    println!(
        "{}",
        format!("📜 Ledger {} ({} blocks)", config.ledger.path, chain.len())
            .bright_cyan()
            .bold()
    );
    println!();

    if chain.is_empty() {
        println!("{}", "No credentials registered yet.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
            Cell::new("Username").add_attribute(Attribute::Bold),
            Cell::new("Password digest").add_attribute(Attribute::Bold),
            Cell::new("Previous").add_attribute(Attribute::Bold),
            Cell::new("Hash").add_attribute(Attribute::Bold),
        ]);

    for (i, block) in chain.iter().enumerate() {
        let previous = if block.previous_hash == GENESIS_PREVIOUS_HASH {
            Cell::new("genesis").fg(TableColor::DarkGrey)
        } else {
            Cell::new(shorten(&block.previous_hash, args.full))
        };
        table.add_row(vec![
            Cell::new(i),
            Cell::new(format_timestamp(block.timestamp)),
            match block.username() {
                Some(name) => Cell::new(name).fg(TableColor::Cyan),
                None => Cell::new("(none)").fg(TableColor::DarkGrey),
            },
            Cell::new(shorten(&block.data.password, args.full)),
            previous,
            Cell::new(shorten(&block.hash, args.full)).fg(TableColor::Green),
        ]);
    }
    println!("{table}");
    println!();

    let report = audit_chain(&chain);
    if report.is_ok() {
        println!("{}", "✅ Chain verified: linkage and hashes intact".bright_green());
    } else {
        let headline = if report.linkage_ok() {
            "⚠️  Linkage intact, but the audit found issues:".yellow()
        } else {
            "❌ Chain linkage is broken:".red().bold()
        };
        println!("{}", headline);
        for issue in &report.issues {
            println!("   - {}", issue);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_hex_digest() {
        let digest = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";
        assert_eq!(shorten(digest, false), "2bb80d53...27a25b");
        assert_eq!(shorten(digest, true), digest);
        assert_eq!(shorten("0", false), "0");
    }

    #[test]
    fn test_shorten_multibyte_text() {
        assert_eq!(shorten("abcdefg\u{e9}0123456789", false), "abcdefg\u{e9}...456789");
        let accents = "\u{e9}".repeat(20);
        assert_eq!(
            shorten(&accents, false),
            format!("{}...{}", "\u{e9}".repeat(8), "\u{e9}".repeat(6))
        );
    }
}
