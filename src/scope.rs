//! Plain-language scope of work for a project's line items.

use crate::project::Item;

/// One bullet per distinct item name, quantities summed, in first-seen order.
/// Bullets are separated by a blank line.
pub fn describe_items(items: &[Item]) -> String {
    if items.is_empty() {
        return "No items selected.".to_string();
    }

    let mut counts: Vec<(&str, u64)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(name, _)| *name == item.name) {
            Some((_, count)) => *count += item.quantity as u64,
            None => counts.push((item.name.as_str(), item.quantity as u64)),
        }
    }

    counts
        .iter()
        .map(|&(name, count)| describe_line(name, count))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn describe_line(name: &str, count: u64) -> String {
    match name {
        "Curbs" => {
            let noun = if count == 1 { "Curb" } else { "Curbs" };
            format!(
                "- Tie-In / Flash ({}) {} with roofing material compatible to existing material.",
                count, noun
            )
        }
        "Pipes" => {
            let noun = if count == 1 {
                "pipe / penetration"
            } else {
                "pipes / penetrations"
            };
            format!(
                "- Tie-In / Flash ({}) {} with roofing material compatible to existing material.",
                count, noun
            )
        }
        "Item 1" => format!("- {} flashing {}.", count, name),
        "Item 2" => format!("- {} {} panels.", count, name),
        _ => format!("- {} {}.", count, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, quantity: u32) -> Item {
        Item {
            name: name.to_string(),
            quantity,
            price: 1.0,
        }
    }

    #[test]
    fn test_no_items() {
        assert_eq!(describe_items(&[]), "No items selected.");
    }

    #[test]
    fn test_singular_and_plural() {
        assert_eq!(
            describe_items(&[item("Curbs", 1)]),
            "- Tie-In / Flash (1) Curb with roofing material compatible to existing material."
        );
        assert_eq!(
            describe_items(&[item("Pipes", 2)]),
            "- Tie-In / Flash (2) pipes / penetrations with roofing material compatible to existing material."
        );
    }

    #[test]
    fn test_quantities_aggregate_in_first_seen_order() {
        let text = describe_items(&[
            item("Item 2", 1),
            item("Item 1", 3),
            item("Item 2", 4),
            item("Skylights", 2),
        ]);
        assert_eq!(
            text,
            "- 5 Item 2 panels.\n\n- 3 flashing Item 1.\n\n- 2 Skylights."
        );
    }
}
