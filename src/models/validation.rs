// src/models/validation.rs
// DOCUMENTATION: Field normalization for admin/partner submissions
// PURPOSE: Phone, working hours, weekday and id rules applied before upsert

use crate::errors::PlacesError;
use crate::models::{Category, WeekdayInput, WorkingHours};

/// Uzbek weekday names, index 0 = Monday
const WEEKDAYS_UZ: [&str; 7] = [
    "dushanba",
    "seshanba",
    "chorshanba",
    "payshanba",
    "juma",
    "shanba",
    "yakshanba",
];

/// Normalize a phone number to +998XXXXXXXXX
///
/// Accepts a bare 9-digit mobile number starting with 9, or the full
/// 12-digit form starting with 998 (with or without "+", any separators).
/// Returns None for anything else.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    match digits.len() {
        9 if digits.starts_with('9') => Some(format!("+998{}", digits)),
        12 if digits.starts_with("998") => Some(format!("+{}", digits)),
        _ => None,
    }
}

/// Result of parsing a working-hours field
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHours {
    pub hours: WorkingHours,
    pub is_24_7: bool,
}

/// Hours stored for places open around the clock
pub fn round_the_clock() -> WorkingHours {
    WorkingHours {
        start: "00:00".to_string(),
        end: "23:59".to_string(),
    }
}

fn parse_clock(text: &str) -> Option<(u32, u32)> {
    let (h, m) = text.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

/// Parse "HH:MM-HH:MM" or "24/7"
/// Start must be strictly before end; single-digit hours are accepted
pub fn parse_working_hours(text: &str) -> Result<ParsedHours, PlacesError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.eq_ignore_ascii_case("24/7") {
        return Ok(ParsedHours {
            hours: round_the_clock(),
            is_24_7: true,
        });
    }

    let invalid = || {
        PlacesError::ValidationError(format!(
            "working hours '{}' must look like 09:00-18:00 or 24/7",
            text.trim()
        ))
    };

    let (start, end) = compact.split_once('-').ok_or_else(invalid)?;
    let (sh, sm) = parse_clock(start).ok_or_else(invalid)?;
    let (eh, em) = parse_clock(end).ok_or_else(invalid)?;

    if sh * 60 + sm >= eh * 60 + em {
        return Err(PlacesError::ValidationError(format!(
            "working hours '{}' must start before they end",
            text.trim()
        )));
    }

    Ok(ParsedHours {
        hours: WorkingHours {
            start: format!("{:02}:{:02}", sh, sm),
            end: format!("{:02}:{:02}", eh, em),
        },
        is_24_7: false,
    })
}

/// Resolve a weekday index or Uzbek weekday name to 0..=6
pub fn parse_weekday(input: &WeekdayInput) -> Result<u8, PlacesError> {
    match input {
        WeekdayInput::Index(i) if *i <= 6 => Ok(*i),
        WeekdayInput::Index(i) => Err(PlacesError::ValidationError(format!(
            "weekday index {} out of range 0-6",
            i
        ))),
        WeekdayInput::Name(name) => {
            let key = name.trim().to_lowercase();
            WEEKDAYS_UZ
                .iter()
                .position(|d| *d == key)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    PlacesError::ValidationError(format!("unknown weekday '{}'", name.trim()))
                })
        }
    }
}

/// Short weekday label used by the text summary, "?" outside 0..=6
pub fn weekday_short(index: u8) -> &'static str {
    match index {
        0 => "D",
        1 => "S",
        2 => "Ch",
        3 => "P",
        4 => "J",
        5 => "Sh",
        6 => "Y",
        _ => "?",
    }
}

/// Build an id from the category and name: "autoservice_usta_servis"
/// Falls back to a random UUID when the name has no usable characters
pub fn derive_place_id(category: Category, name: &str) -> String {
    let slug = name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-')
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if slug.is_empty() {
        format!("{}_{}", category, uuid::Uuid::new_v4().simple())
    } else {
        format!("{}_{}", category, slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("901234567").as_deref(), Some("+998901234567"));
        assert_eq!(normalize_phone("+998 90 123-45-67").as_deref(), Some("+998901234567"));
        assert_eq!(normalize_phone("998901234567").as_deref(), Some("+998901234567"));
        assert_eq!(normalize_phone("801234567"), None);
        assert_eq!(normalize_phone("+7 912 345 67 89"), None);
        assert_eq!(normalize_phone("phone"), None);
    }

    #[test]
    fn test_parse_working_hours() {
        let parsed = parse_working_hours(" 8:00 - 20:00 ").unwrap();
        assert_eq!(parsed.hours.start, "08:00");
        assert_eq!(parsed.hours.end, "20:00");
        assert!(!parsed.is_24_7);

        assert!(parse_working_hours("24 / 7").unwrap().is_24_7);

        assert!(parse_working_hours("18:00-09:00").is_err());
        assert!(parse_working_hours("09:00-09:00").is_err());
        assert!(parse_working_hours("25:00-26:00").is_err());
        assert!(parse_working_hours("9-18").is_err());
        assert!(parse_working_hours("").is_err());
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday(&WeekdayInput::Name("Dushanba".into())).unwrap(), 0);
        assert_eq!(parse_weekday(&WeekdayInput::Name("yakshanba".into())).unwrap(), 6);
        assert_eq!(parse_weekday(&WeekdayInput::Index(3)).unwrap(), 3);
        assert!(parse_weekday(&WeekdayInput::Name("funday".into())).is_err());
    }

    #[test]
    fn test_derive_place_id() {
        assert_eq!(
            derive_place_id(Category::Carwash, "Moyka  Premium"),
            "carwash_moyka_premium"
        );

        let generated = derive_place_id(Category::Autoservice, "!!!");
        assert!(generated.starts_with("autoservice_"));
        assert_eq!(generated.len(), "autoservice_".len() + 32);
    }

    #[test]
    fn test_weekday_short_labels() {
        let labels: Vec<&str> = (0..7u8).map(weekday_short).collect();
        assert_eq!(labels, vec!["D", "S", "Ch", "P", "J", "Sh", "Y"]);
        assert_eq!(weekday_short(7), "?");
        assert_eq!(weekday_short(u8::MAX), "?");
    }
}
