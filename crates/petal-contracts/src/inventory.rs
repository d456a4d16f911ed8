use indexmap::IndexMap;
use tracing::debug;

use crate::catalog;
use crate::models::{FlowerStock, PlanFlowerItem};
use crate::now_utc_iso;
use crate::stores::kv::{KvStore, INVENTORY_SLOT};

/// Owns the stock collection. Mutations rewrite the whole collection and
/// persist it as one write; callers only ever receive clones.
#[derive(Debug)]
pub struct InventoryLedger {
    store: KvStore,
    flowers: IndexMap<String, FlowerStock>,
}

impl InventoryLedger {
    pub fn new(mut store: KvStore) -> Self {
        let rows: Vec<FlowerStock> = store
            .get(INVENTORY_SLOT)
            .unwrap_or_else(catalog::starter_inventory);
        let flowers = rows
            .into_iter()
            .map(|stock| (stock.id.clone(), stock))
            .collect();
        Self { store, flowers }
    }

    pub fn add(&mut self, stock: FlowerStock) -> anyhow::Result<()> {
        debug!(name = %stock.name, "inventory add");
        self.flowers.insert(stock.id.clone(), stock);
        self.persist()
    }

    /// Replace by id. Unknown ids are ignored, matching the host app's
    /// behavior.
    pub fn update(&mut self, stock: FlowerStock) -> anyhow::Result<()> {
        if !self.flowers.contains_key(&stock.id) {
            return Ok(());
        }
        self.flowers.insert(stock.id.clone(), stock);
        self.persist()
    }

    pub fn delete(&mut self, id: &str) -> anyhow::Result<()> {
        if self.flowers.shift_remove(id).is_none() {
            return Ok(());
        }
        debug!(id, "inventory delete");
        self.persist()
    }

    pub fn get(&self, id: &str) -> Option<FlowerStock> {
        self.flowers.get(id).cloned()
    }

    pub fn list(&self) -> Vec<FlowerStock> {
        self.flowers.values().cloned().collect()
    }

    pub fn low_stock(&self, threshold: u32) -> Vec<FlowerStock> {
        self.flowers
            .values()
            .filter(|stock| stock.quantity <= threshold)
            .cloned()
            .collect()
    }

    /// Inventory block embedded in the planner's system prompt, one line per
    /// material.
    pub fn listing_text(&self, low_stock_threshold: u32) -> String {
        self.flowers
            .values()
            .map(|stock| {
                let marker = if stock.quantity <= low_stock_threshold {
                    " (LOW STOCK!)"
                } else {
                    ""
                };
                format!(
                    "- {} (Color: {}, Qty: {}{}, Cost: ¥{}/stem, Category: {})",
                    stock.name,
                    stock.color,
                    stock.quantity,
                    marker,
                    stock.unit_cost,
                    stock.category.as_str(),
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    /// Deducts a plan's line items from stock. For each item, in input order,
    /// the first record matching by exact name, then by stock-name-contains,
    /// then by requested-name-contains wins; unmatched items are dropped
    /// without error. Quantities clamp at zero and the whole collection is
    /// committed as one write.
    pub fn deduct(&mut self, items: &[PlanFlowerItem]) -> anyhow::Result<Vec<FlowerStock>> {
        let mut working = self.flowers.clone();
        let mut changed: Vec<FlowerStock> = Vec::new();

        for item in items {
            let Some(id) = match_stock(&working, &item.flower_name) else {
                debug!(name = %item.flower_name, "deduction item matched no stock record");
                continue;
            };
            let stock = working.get_mut(&id).expect("matched id present");
            stock.quantity = stock.quantity.saturating_sub(item.count);
            stock.total_used = Some(stock.total_used.unwrap_or(0) + item.count);
            stock.updated_at = Some(now_utc_iso());
            changed.push(stock.clone());
        }

        if !changed.is_empty() {
            self.flowers = working;
            self.persist()?;
        }
        Ok(changed)
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        let rows: Vec<FlowerStock> = self.flowers.values().cloned().collect();
        self.store.set(INVENTORY_SLOT, &rows)
    }
}

fn match_stock(flowers: &IndexMap<String, FlowerStock>, requested: &str) -> Option<String> {
    let needle = requested.to_lowercase();
    flowers
        .values()
        .find(|stock| stock.name.to_lowercase() == needle)
        .or_else(|| {
            flowers
                .values()
                .find(|stock| stock.name.to_lowercase().contains(&needle))
        })
        .or_else(|| {
            flowers
                .values()
                .find(|stock| needle.contains(&stock.name.to_lowercase()))
        })
        .map(|stock| stock.id.clone())
}

#[cfg(test)]
mod tests {
    use crate::models::{FlowerCategory, FlowerStock, PlanFlowerItem};
    use crate::stores::KvStore;

    use super::InventoryLedger;

    fn stock(name: &str, quantity: u32) -> FlowerStock {
        FlowerStock::new(
            name,
            "Red",
            quantity,
            quantity,
            FlowerCategory::Main,
            5.0,
            15.0,
            None,
        )
    }

    fn item(name: &str, count: u32) -> PlanFlowerItem {
        PlanFlowerItem {
            flower_name: name.to_string(),
            count,
            reason: None,
            unit_cost: None,
        }
    }

    fn empty_ledger(temp: &tempfile::TempDir) -> anyhow::Result<InventoryLedger> {
        let mut store = KvStore::new(temp.path().join("store.json"));
        store.set(crate::stores::kv::INVENTORY_SLOT, &Vec::<FlowerStock>::new())?;
        Ok(InventoryLedger::new(store))
    }

    #[test]
    fn empty_slot_falls_back_to_starter_catalog() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ledger = InventoryLedger::new(KvStore::new(temp.path().join("store.json")));
        assert!(!ledger.list().is_empty());
    }

    #[test]
    fn add_update_delete_round_trip() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut ledger = empty_ledger(&temp)?;

        let rose = stock("Red Rose", 50);
        let id = rose.id.clone();
        ledger.add(rose)?;
        assert_eq!(ledger.list().len(), 1);

        let mut updated = ledger.get(&id).expect("present");
        updated.quantity = 40;
        ledger.update(updated)?;
        assert_eq!(ledger.get(&id).expect("present").quantity, 40);

        // Unknown id is a silent no-op.
        let stray = stock("Stray", 1);
        ledger.update(stray)?;
        assert_eq!(ledger.list().len(), 1);

        ledger.delete(&id)?;
        assert!(ledger.list().is_empty());
        Ok(())
    }

    #[test]
    fn mutations_persist_across_ledger_instances() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut ledger = empty_ledger(&temp)?;
        ledger.add(stock("Red Rose", 50))?;
        ledger.deduct(&[item("red rose", 5)])?;

        let reloaded = InventoryLedger::new(KvStore::new(temp.path().join("store.json")));
        let rose = &reloaded.list()[0];
        assert_eq!(rose.quantity, 45);
        assert_eq!(rose.total_used, Some(5));
        Ok(())
    }

    #[test]
    fn deduction_prefers_exact_match_over_earlier_contains_match() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut ledger = empty_ledger(&temp)?;
        ledger.add(stock("Red Rose Premium", 10))?;
        ledger.add(stock("Rose", 10))?;

        let changed = ledger.deduct(&[item("rose", 3)])?;
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name, "Rose");
        assert_eq!(changed[0].quantity, 7);
        Ok(())
    }

    #[test]
    fn deduction_falls_through_contains_then_reverse_contains() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut ledger = empty_ledger(&temp)?;
        ledger.add(stock("White Lily", 30))?;
        ledger.add(stock("Lily", 20))?;

        // "lily" matches "Lily" exactly; "white lily deluxe" has no exact or
        // stock-contains match and falls through to reverse containment.
        let changed = ledger.deduct(&[item("lily", 1), item("white lily deluxe", 2)])?;
        assert_eq!(changed.len(), 2);
        assert_eq!(changed[0].name, "Lily");
        assert_eq!(changed[1].name, "White Lily");
        assert_eq!(changed[1].quantity, 28);
        Ok(())
    }

    #[test]
    fn deduction_clamps_at_zero_and_accumulates_total_used() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut ledger = empty_ledger(&temp)?;
        ledger.add(stock("Tulip", 3))?;

        let changed = ledger.deduct(&[item("tulip", 2), item("tulip", 10)])?;
        assert_eq!(changed.len(), 2);
        assert_eq!(changed[1].quantity, 0);
        assert_eq!(changed[1].total_used, Some(12));
        assert!(changed[1].updated_at.is_some());
        Ok(())
    }

    #[test]
    fn deduction_silently_skips_unmatched_items() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut ledger = empty_ledger(&temp)?;
        ledger.add(stock("Red Rose", 50))?;

        let changed = ledger.deduct(&[item("Orchid", 5), item("red rose", 5)])?;
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name, "Red Rose");
        assert_eq!(changed[0].quantity, 45);
        Ok(())
    }

    #[test]
    fn low_stock_threshold_is_inclusive() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut ledger = empty_ledger(&temp)?;
        ledger.add(stock("A", 10))?;
        ledger.add(stock("B", 11))?;

        let low = ledger.low_stock(10);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "A");
        Ok(())
    }

    #[test]
    fn listing_text_marks_low_stock_lines() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut ledger = empty_ledger(&temp)?;
        ledger.add(stock("Red Rose", 5))?;
        ledger.add(stock("White Lily", 30))?;

        let listing = ledger.listing_text(10);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Red Rose"));
        assert!(lines[0].contains("(LOW STOCK!)"));
        assert!(!lines[1].contains("LOW STOCK"));
        assert!(lines[1].contains("Category: main"));
        Ok(())
    }
}
