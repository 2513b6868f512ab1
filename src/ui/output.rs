use crate::storage::RepositoryLink;
use crate::sync::SyncStats;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("{} {}", Icons::STATS, title.style(theme().header.clone()));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

pub fn link_line(link: &RepositoryLink) {
    println!(
        "  {} {} {}",
        Icons::LINK.style(theme().info.clone()),
        link.name,
        link.path.display().style(theme().dim.clone())
    );
}

pub fn sync_summary(stats: &SyncStats) {
    println!(
        "  {} {}  {} {}  {} {}",
        Icons::BRANCH.style(theme().info.clone()),
        stats.branches,
        Icons::COMMIT.style(theme().info.clone()),
        stats.commits_visited,
        Icons::LINK.style(theme().info.clone()),
        stats.edges_written
    );
}

/// One commit per line: id, then the first line of its message
pub fn commit_line(id: &str, message: &str) {
    let subject = message.lines().next().unwrap_or_default();
    println!("  {} {} {}", Icons::COMMIT, id.style(theme().dim.clone()), subject);
}
