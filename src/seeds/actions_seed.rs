use crate::database::MongoDB;
use crate::models::{Action, ActionCategory, Frequency};
use mongodb::bson::{doc, DateTime as BsonDateTime};

/// Catálogo padrão de ações ecológicas (created_by = null).
/// Só insere se ainda não houver nenhuma ação do sistema.
pub async fn seed_default_actions(db: &MongoDB) {
    let collection = db.collection::<Action>(Action::COLLECTION);

    let count = collection
        .count_documents(doc! { "created_by": null })
        .await
        .unwrap_or(0);

    if count > 0 {
        log::info!("🌱 Actions: {} catalog actions already in DB, skipping seed", count);
        return;
    }

    log::info!("🌱 Actions: seeding default eco-action catalog...");

    let actions = build_default_actions(BsonDateTime::now());

    match collection.insert_many(&actions).await {
        Ok(result) => {
            log::info!("   ✅ Inserted {} default actions", result.inserted_ids.len());
        }
        Err(e) => {
            log::error!("   ❌ Failed to seed default actions: {}", e);
        }
    }
}

fn catalog_action(
    now: BsonDateTime,
    title: &str,
    description: &str,
    category: ActionCategory,
    emission_saved: f64,
    points: i64,
    frequency: Frequency,
) -> Action {
    Action {
        id: None,
        title: title.into(),
        description: description.into(),
        category,
        emission_saved,
        points,
        frequency,
        created_by: None,
        created_at: now,
        updated_at: now,
    }
}

/// Valores de emissão em kg CO2e por ocorrência
fn build_default_actions(now: BsonDateTime) -> Vec<Action> {
    use ActionCategory::*;
    use Frequency::*;

    vec![
        catalog_action(now, "Bike to work", "Replace a car commute with a bicycle ride", Transport, 2.6, 20, Daily),
        catalog_action(now, "Use public transport", "Take the bus or train instead of driving", Transport, 1.8, 15, Daily),
        catalog_action(now, "Walk short distances", "Walk trips under 2 km instead of driving", Transport, 0.8, 10, Daily),
        catalog_action(now, "Carpool", "Share a car ride with at least one other person", Transport, 1.2, 10, Daily),
        catalog_action(now, "Turn off standby devices", "Unplug electronics that are not in use", Energy, 0.3, 5, Daily),
        catalog_action(now, "Air-dry laundry", "Skip the tumble dryer for a load of laundry", Energy, 1.5, 10, Weekly),
        catalog_action(now, "Switch to LED bulbs", "Replace incandescent bulbs at home", Energy, 15.0, 50, Once),
        catalog_action(now, "Meat-free day", "Eat only plant-based meals for a day", Food, 3.6, 20, Daily),
        catalog_action(now, "Buy local produce", "Shop for seasonal food from local producers", Food, 1.0, 10, Weekly),
        catalog_action(now, "Avoid food waste", "Plan meals and use leftovers", Food, 0.9, 10, Daily),
        catalog_action(now, "Compost organic waste", "Compost kitchen scraps instead of binning them", Waste, 0.5, 10, Daily),
        catalog_action(now, "Recycle correctly", "Sort paper, plastic, glass and metal", Waste, 0.4, 5, Daily),
        catalog_action(now, "Refuse single-use plastic", "Bring your own bottle, cup and bags", Waste, 0.2, 5, Daily),
        catalog_action(now, "Shorter shower", "Keep showers under five minutes", Water, 0.4, 5, Daily),
        catalog_action(now, "Fix a leaking tap", "Repair dripping taps or running toilets", Water, 2.0, 25, Once),
        catalog_action(now, "Buy second-hand", "Choose a used item over a new one", Shopping, 5.0, 30, Monthly),
        catalog_action(now, "Repair instead of replace", "Get an item repaired rather than buying new", Shopping, 4.0, 25, Monthly),
        catalog_action(now, "Plant a tree", "Plant a tree or sponsor a planting", Other, 20.0, 100, Once),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validate_impact;
    use ActionCategory::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_catalog_is_valid() {
        let actions = build_default_actions(BsonDateTime::now());
        assert!(!actions.is_empty());

        let titles: HashSet<&str> = actions.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles.len(), actions.len(), "catalog titles must be unique");

        for action in &actions {
            assert!(action.created_by.is_none());
            assert!(validate_impact(action.emission_saved, action.points).is_ok());
        }
    }

    #[test]
    fn test_catalog_covers_every_category() {
        let actions = build_default_actions(BsonDateTime::now());
        for category in [Transport, Energy, Food, Waste, Water, Shopping, Other] {
            assert!(actions.iter().any(|a| a.category == category), "missing {}", category.as_str());
        }
    }
}
