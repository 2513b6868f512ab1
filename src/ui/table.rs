use tabled::{settings::Style, Table, Tabled};

use crate::storage::RepositoryLink;

#[derive(Tabled)]
pub struct StatRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct LinkRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Path")]
    pub path: String,
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let rows: Vec<StatRow> = stats
        .iter()
        .map(|(label, value)| StatRow {
            metric: label.to_string(),
            value: value.clone(),
        })
        .collect();
    render(&rows)
}

pub fn links_table(links: &[RepositoryLink]) -> String {
    let rows: Vec<LinkRow> = links
        .iter()
        .map(|link| LinkRow {
            name: link.name.clone(),
            path: link.path.display().to_string(),
        })
        .collect();
    render(&rows)
}
