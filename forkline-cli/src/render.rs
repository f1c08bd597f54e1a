//! Terminal and JSON output.

use forkline::display::render_event;
use forkline::{CatalogItem, DecodedEvent, LineageForest, SearchHit};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn forest(forest: &LineageForest, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(forest);
    }
    println!(
        "{} items, {} forks (source: {:?})",
        forest.total_supply(),
        forest.edge_count(),
        forest.origin()
    );
    for entry in forest.walk() {
        println!("{}#{}", "  ".repeat(entry.depth), entry.id);
    }
    if !forest.skipped().is_empty() {
        println!("unreadable: {:?}", forest.skipped());
    }
    Ok(())
}

pub fn search_hits(hits: &[SearchHit], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(hits);
    }
    if hits.is_empty() {
        println!("no matching items");
    }
    for hit in hits {
        let path: Vec<String> = hit.path.iter().map(|id| format!("#{}", id)).collect();
        println!("{}", path.join(" > "));
    }
    Ok(())
}

pub fn activity(events: &[DecodedEvent], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(events);
    }
    if events.is_empty() {
        println!("no recent activity");
    }
    for event in events {
        println!("{}", render_event(event));
    }
    Ok(())
}

pub fn catalog(items: &[CatalogItem], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(items);
    }
    for item in items {
        let mut line = format!("#{} {}", item.id, item.metadata.name);
        if let Some(parent) = item.metadata.parent_token_id {
            line.push_str(&format!(" (fork of #{})", parent));
        }
        if item.metadata.is_hidden() {
            line.push_str(" [hidden]");
        }
        if let Some(stats) = &item.stats {
            line.push_str(&format!(" votes={} value={}", stats.votes, stats.total_value));
        }
        println!("{}", line);
    }
    Ok(())
}
