//! Built-in catalog used when neither the network nor the cache has data.

use crate::models::{Category, Person};

struct DemoEntry {
    id: i64,
    category: Category,
    badge: &'static str,
    badge_text: &'static str,
    info: &'static str,
}

const DEMO_ENTRIES: [DemoEntry; 5] = [
    DemoEntry {
        id: 1,
        category: Category::Media,
        badge: "badge-top",
        badge_text: "Demo Media",
        info: "This is demo data for local development. In a served deployment \
               the catalog is loaded from the JSON resource.",
    },
    DemoEntry {
        id: 2,
        category: Category::Fame,
        badge: "badge-top",
        badge_text: "Demo Fame",
        info: "The sync engine is running in local mode. Everything works, but data \
               comes from the cache or is generated automatically.",
    },
    DemoEntry {
        id: 3,
        category: Category::Mid,
        badge: "badge-mid",
        badge_text: "Mid fame",
        info: "To work with real data, serve the site over HTTP and point the \
               base URL at it.",
    },
    DemoEntry {
        id: 4,
        category: Category::Small,
        badge: "badge-small",
        badge_text: "Small fame",
        info: "Caching, periodic resync and export all work against this demo catalog.",
    },
    DemoEntry {
        id: 5,
        category: Category::Product,
        badge: "badge-product",
        badge_text: "Products",
        info: "Try exporting this catalog as CSV or JSON.",
    },
];

/// The fixed 5-record demo catalog.
pub fn demo_people() -> Vec<Person> {
    DEMO_ENTRIES
        .iter()
        .map(|entry| {
            let handle = if entry.id == 1 {
                "demo".to_string()
            } else {
                format!("demo{}", entry.id)
            };
            let mut person = Person::new(
                entry.id,
                format!("Demo user {}", entry.id),
                entry.category.clone(),
            );
            person.info = entry.info.to_string();
            person.channel = Some(format!("https://t.me/{}", handle));
            person.dm = Some(format!("https://t.me/{}", handle));
            person.badge = Some(entry.badge.to_string());
            person.badge_text = Some(entry.badge_text.to_string());
            person.img = Some(format!(
                "https://via.placeholder.com/300x200/ff073a/ffffff?text=Demo+{}",
                entry.id
            ));
            person
        })
        .collect()
}
