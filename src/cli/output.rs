//! Terminal output for tree-table commands.
//!
//! `colored` honours NO_COLOR, CLICOLOR and CLICOLOR_FORCE.

use std::fmt::Display;
use std::path::Path;

use colored::Colorize;

use crate::domain::{MovePlan, Node, NodeId};

pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Plain stdout, used for rendered trees and TOML dumps.
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}

pub fn header(msg: &(impl Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// `<label>: <name> [<id>]` with the localized action label in green.
pub fn node_action(label: &str, name: &str, id: &NodeId) {
    println!("{}: {} [{}]", label.green(), name, id);
}

pub fn node_removed(label: &str, id: &NodeId, removed: usize) {
    println!("{}: [{}] ({})", label.green(), id, removed.to_string().dimmed());
}

pub fn node_moved(plan: &MovePlan) {
    println!(
        "{} [{}] {} -> {} #{}",
        "✓".green(),
        plan.source,
        plan.old_parent,
        plan.new_parent,
        plan.index
    );
}

/// One child row; unexpanded children are marked with an ellipsis.
pub fn child_row(icon: &str, node: &Node) {
    let more = if node.has_children && !node.children_loaded {
        " …".dimmed().to_string()
    } else {
        String::new()
    };
    println!("{icon} {} [{}]{more}", node.name, node.id.to_string().dimmed());
}

pub fn locale_status(code: &str, missing: &[&str]) {
    if missing.is_empty() {
        println!("  {} {}", "✓".green(), code);
    } else {
        println!("  {} {}: missing {}", "✗".red(), code, missing.join(", "));
    }
}

pub fn config_path(scope: &str, path: &Path) {
    let mark = if path.exists() { "✓".green() } else { "✗".red() };
    println!("  {scope:<7} {} {mark}", path.display());
}

/// Print a question without a newline (cyan).
pub fn prompt(msg: &(impl Display + ?Sized)) {
    use std::io::Write;
    print!("{} ", msg.to_string().cyan());
    std::io::stdout().flush().ok();
}
