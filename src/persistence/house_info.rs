use crate::persistence::store::{HouseListRow, HouseRow, StoreError, WorldStore};
use crate::telemetry::logging;
use crate::world::access_list::NameResolver;
use crate::world::housing::{House, Houses};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HouseInfoReport {
    pub houses: usize,
    pub lists: usize,
    /// Stored rows naming a house the map does not define.
    pub unknown_houses: usize,
}

/// Applies stored owner, rent and access-list state to the houses of the
/// static map. Rows for unknown house ids are ignored.
pub fn load_house_info(
    store: &dyn WorldStore,
    houses: &mut Houses,
    resolver: &mut dyn NameResolver,
) -> Result<HouseInfoReport, StoreError> {
    let house_rows = store.house_rows()?;
    let list_rows = store.house_list_rows()?;
    let mut report = HouseInfoReport::default();

    for row in &house_rows {
        let Some(house) = houses.get_mut(row.id) else {
            report.unknown_houses += 1;
            continue;
        };
        house.set_owner(row.owner);
        house.paid_until = row.paid;
        house.rent_warnings = row.warnings;
        report.houses += 1;
    }

    for row in &list_rows {
        let Some(house) = houses.get_mut(row.house_id) else {
            report.unknown_houses += 1;
            continue;
        };
        house.set_access_list(row.list_id, &row.text, resolver);
        report.lists += 1;
    }

    if report.unknown_houses > 0 {
        logging::log_houses(&format!(
            "{} stored house row(s) reference houses missing from the map",
            report.unknown_houses
        ));
    }
    Ok(report)
}

/// Writes every house and its non-empty access lists in one transaction.
/// Stored lists are replaced wholesale; house rows are upserted.
pub fn save_house_info(
    store: &mut dyn WorldStore,
    houses: &Houses,
) -> Result<HouseInfoReport, StoreError> {
    let mut report = HouseInfoReport::default();
    let mut lists = Vec::new();
    let mut tx = store.begin()?;
    tx.clear_house_lists()?;
    for house in houses.iter() {
        tx.upsert_house(&house_row(house))?;
        report.houses += 1;
        for (list_id, text) in house.access_lists() {
            lists.push(HouseListRow {
                house_id: house.id,
                list_id,
                text,
            });
        }
    }
    report.lists = lists.len();
    tx.insert_house_lists(&lists)?;
    tx.commit()?;
    logging::log_houses(&format!(
        "house info saved: houses={}, lists={}",
        report.houses, report.lists
    ));
    Ok(report)
}

fn house_row(house: &House) -> HouseRow {
    HouseRow {
        id: house.id,
        owner: house.owner(),
        paid: house.paid_until,
        warnings: house.rent_warnings,
        name: house.name.clone(),
        town_id: house.town_id,
        rent: house.rent,
        size: house.tiles().len() as u32,
        beds: house.bed_count(),
    }
}
