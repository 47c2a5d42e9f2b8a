use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppress everything except errors (cron-driven sync).
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn success(msg: &str) {
    if !quiet() {
        println!("{} {}", "✓".green().bold(), msg);
    }
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

pub fn info(msg: &str) {
    if !quiet() {
        println!("{} {}", "ℹ".blue().bold(), msg);
    }
}

pub fn warning(msg: &str) {
    if !quiet() {
        println!("{} {}", "⚠".yellow().bold(), msg);
    }
}

pub fn step(msg: &str) {
    if !quiet() {
        println!("{} {}", "→".cyan().bold(), msg);
    }
}

pub fn header(msg: &str) {
    if !quiet() {
        println!("\n{}", msg.bold().underline());
    }
}
