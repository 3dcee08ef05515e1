// src/services/summary.rs
// DOCUMENTATION: Plain-text rendering of nearby results
// PURPOSE: The listing a chat front end sends back as-is

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::models::validation::weekday_short;
use crate::models::{Category, NearbyResult};
use crate::services::distance::format_distance;

const ADDRESS_MAX_WORDS: usize = 5;
const NO_DATA: &str = "Ma'lumot yo'q";

/// Services every autoservice listing is checked against, in display order
pub const AUTOSERVICE_SERVICES: [&str; 8] = [
    "Elektrik",
    "Kasaprab",
    "Motarius",
    "Vulkanizatsiya",
    "Razval",
    "Tonirovka",
    "Shumka",
    "Universal",
];

pub const CARWASH_SERVICES: [&str; 8] = [
    "Tashqi yuvish",
    "Ichki tozalash",
    "Polirovka",
    "Kimyoviy tozalash",
    "Dvigatel yuvish",
    "Quruq tozalash",
    "Salon tozalash",
    "Disk tozalash",
];

fn service_catalog(category: Category) -> &'static [&'static str] {
    match category {
        Category::Autoservice => &AUTOSERVICE_SERVICES,
        Category::Carwash => &CARWASH_SERVICES,
    }
}

/// Keep the first few words of an address, marking the cut with "..."
pub fn short_address(address: &str) -> String {
    let words: Vec<&str> = address.split_whitespace().collect();
    if words.len() > ADDRESS_MAX_WORDS {
        format!("{}...", words[..ADDRESS_MAX_WORDS].join(" "))
    } else {
        words.join(" ")
    }
}

/// "D✅ S✅ Ch✅ P✅ J✅ | Sh❌ Y❌"
pub fn working_days_compact(result: &NearbyResult) -> String {
    if result.working_days.is_empty() {
        return NO_DATA.to_string();
    }

    let marks: Vec<String> = (0..7u8)
        .map(|day| {
            let mark = if result.working_days.contains(&day) { "✅" } else { "❌" };
            format!("{}{}", weekday_short(day), mark)
        })
        .collect();

    format!("{} | {}", marks[..5].join(" "), marks[5..].join(" "))
}

/// One "✅ name" or "❌ name" line per catalog service, then any offered
/// service the catalog does not list
pub fn services_with_status(category: Category, offered: &BTreeSet<String>) -> String {
    let catalog = service_catalog(category);
    let mut text = String::new();

    for service in catalog {
        let mark = if offered.contains(*service) { "✅" } else { "❌" };
        let _ = writeln!(text, "{} {}", mark, service);
    }
    for service in offered.iter().filter(|s| !catalog.contains(&s.as_str())) {
        let _ = writeln!(text, "✅ {}", service);
    }
    text
}

fn hours_text(result: &NearbyResult) -> String {
    if result.is_24_7 {
        return "24/7".to_string();
    }
    match &result.working_hours {
        Some(hours) => format!("{}-{}", hours.start, hours.end),
        None => NO_DATA.to_string(),
    }
}

/// Render a whole lookup as one message
pub fn render(category: Category, results: &[NearbyResult]) -> String {
    if results.is_empty() {
        return format!("{}: hech qanday yaqin joy topilmadi", category.label());
    }

    let mut text = String::new();
    for (index, result) in results.iter().enumerate() {
        if index > 0 {
            text.push('\n');
        }
        let address = result
            .address
            .as_deref()
            .map(short_address)
            .unwrap_or_else(|| "Manzil yo'q".to_string());

        let _ = writeln!(text, "#{} {} ({})", index + 1, result.name, category.label());
        let _ = writeln!(text, "Manzil: {} | {}", address, format_distance(result.distance_km));
        let _ = writeln!(text, "Ish vaqti: {}", hours_text(result));
        let _ = writeln!(text, "Ish kunlari: {}", working_days_compact(result));
        let _ = writeln!(text, "Xizmatlar:");
        text.push_str(&services_with_status(category, &result.services));
        if let Some(phone) = &result.phone {
            let _ = writeln!(text, "Tel: {}", phone);
        }
        let _ = writeln!(text, "Xarita: {}", result.map_link);
    }
    text
}
