//! Plain-text rendering for the command line.

use chrono::Local;
use famelist_core::cache::CacheInfo;
use famelist_core::utils::{format_timestamp, truncate_string};
use famelist_core::{Category, Person, Stats, SyncEvent};

/// Column width for names in list output
const NAME_WIDTH: usize = 28;

/// Column width for the bio excerpt in list output
const INFO_WIDTH: usize = 60;

/// One line per record: id, category label, name, bio excerpt.
pub fn person_row(person: &Person) -> String {
    let info = person.info.replace('\n', " ");
    format!(
        "{:>5}  {:<12} {:<width$} {}",
        person.id,
        person.category.label(),
        truncate_string(&person.name, NAME_WIDTH),
        truncate_string(&info, INFO_WIDTH),
        width = NAME_WIDTH
    )
}

pub fn print_people(people: &[Person]) {
    if people.is_empty() {
        println!("No matching records");
        return;
    }
    for person in people {
        println!("{}", person_row(person));
    }
    println!("{} record(s)", people.len());
}

/// Full record card.
pub fn print_person(person: &Person) {
    println!("{} (#{})", person.name, person.id);
    println!("  Category: {}", person.category.label());
    let badge = person.badge_display();
    if !badge.is_empty() {
        println!("  Badge:    {}", badge);
    }
    for (label, value) in [
        ("Channel", &person.channel),
        ("DM", &person.dm),
        ("Seller", &person.seller),
        ("Image", &person.img),
    ] {
        if let Some(value) = value {
            println!("  {:<9} {}", format!("{}:", label), value);
        }
    }
    let prices = person.price_lines();
    if !prices.is_empty() {
        println!("  Prices:");
        for line in prices {
            println!("    {}", line);
        }
    }
    if !person.info.is_empty() {
        println!();
        println!("{}", person.info);
    }
}

pub fn print_stats(stats: &Stats) {
    println!("Total: {}", stats.total);
    for category in Category::RECOGNIZED.iter() {
        let count = stats.count(category.as_str());
        if count > 0 {
            println!("  {:<12} {}", category.label(), count);
        }
    }
    // Tags outside the recognized set
    for (tag, count) in &stats.categories {
        if !Category::parse(tag).is_recognized() {
            println!("  {:<12} {}", tag, count);
        }
    }
    match stats.last_update {
        Some(ts) => println!("Last update: {}", format_timestamp(&ts)),
        None => println!("Last update: never"),
    }
}

pub fn print_cache_info(info: &CacheInfo) {
    match info.last_update {
        Some(ts) => println!(
            "Last update: {} ({})",
            format_timestamp(&ts),
            info.age_display()
        ),
        None => println!("Last update: never"),
    }
    println!("Size:        {} bytes", info.size);
    println!("Expired:     {}", if info.is_expired { "yes" } else { "no" });
}

/// Event summary, e.g. `dataLoaded: 5 records`.
pub fn describe_event(event: &SyncEvent) -> String {
    match (event.dataset(), event.error()) {
        (Some(data), _) => format!("{}: {} records", event.name(), data.len()),
        (None, Some(err)) => format!("{}: {}", event.name(), err),
        (None, None) => event.name().to_string(),
    }
}

/// Event summary prefixed with the local wall-clock time.
pub fn timestamped(event: &SyncEvent) -> String {
    format!("[{}] {}", Local::now().format("%H:%M:%S"), describe_event(event))
}
