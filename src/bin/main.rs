#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "credchain CLI".bright_cyan().bold());
    println!("{}", "-------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but most functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!("  - {}", "credchain-server".bright_white());
    println!("  - {}", "credchain-user".bright_white());
    println!("  - {}", "credchain-history".bright_white());
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --bin credchain-user -- register alice".italic());
}
