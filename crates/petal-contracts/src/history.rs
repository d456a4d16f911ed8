use tracing::debug;

use crate::inventory::InventoryLedger;
use crate::models::{DesignPlan, PlanStatus};
use crate::now_utc_iso;
use crate::stores::kv::{KvStore, SAVED_DESIGNS_SLOT};

/// Saved design plans, newest first. `execute` is the only path that turns a
/// plan into inventory movement, and the status guard makes it one-shot.
#[derive(Debug)]
pub struct HistoryLedger {
    store: KvStore,
    designs: Vec<DesignPlan>,
}

impl HistoryLedger {
    pub fn new(mut store: KvStore) -> Self {
        let designs = store.get(SAVED_DESIGNS_SLOT).unwrap_or_default();
        Self { store, designs }
    }

    /// Upsert by id: an existing plan is replaced in place, a new one is
    /// prepended so retrieval stays newest-first.
    pub fn save(&mut self, plan: DesignPlan) -> anyhow::Result<()> {
        match self.designs.iter().position(|entry| entry.id == plan.id) {
            Some(index) => self.designs[index] = plan,
            None => self.designs.insert(0, plan),
        }
        self.persist()
    }

    pub fn delete(&mut self, id: &str) -> anyhow::Result<()> {
        let before = self.designs.len();
        self.designs.retain(|entry| entry.id != id);
        if self.designs.len() == before {
            return Ok(());
        }
        self.persist()
    }

    pub fn get(&self, id: &str) -> Option<DesignPlan> {
        self.designs.iter().find(|entry| entry.id == id).cloned()
    }

    pub fn list(&self) -> Vec<DesignPlan> {
        self.designs.clone()
    }

    /// Deducts the plan's line items from inventory, marks it completed, and
    /// upserts it. Already-completed plans pass through untouched so a second
    /// call never double-deducts.
    pub fn execute(
        &mut self,
        plan: DesignPlan,
        inventory: &mut InventoryLedger,
    ) -> anyhow::Result<DesignPlan> {
        if plan.status == PlanStatus::Completed {
            return Ok(plan);
        }

        let changed = inventory.deduct(&plan.flower_list)?;
        debug!(plan = %plan.id, changed = changed.len(), "plan executed");

        let mut updated = plan;
        updated.status = PlanStatus::Completed;
        updated.executed_at = Some(now_utc_iso());
        self.save(updated.clone())?;
        Ok(updated)
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        self.store.set(SAVED_DESIGNS_SLOT, &self.designs)
    }
}

#[cfg(test)]
mod tests {
    use crate::inventory::InventoryLedger;
    use crate::models::{
        DesignPlan, FlowerCategory, FlowerStock, PlanFlowerItem, PlanStatus,
    };
    use crate::now_utc_iso;
    use crate::stores::KvStore;

    use super::HistoryLedger;

    fn plan(id: &str, items: Vec<PlanFlowerItem>) -> DesignPlan {
        DesignPlan {
            id: id.to_string(),
            request_id: "req-1".to_string(),
            title: "Spring Bouquet".to_string(),
            description: "A light spring arrangement".to_string(),
            flower_list: items,
            reasoning: None,
            steps: vec!["Trim stems".to_string(), "Arrange".to_string()],
            image_url: None,
            image_error: None,
            image_prompt: None,
            meaning_text: "Renewal".to_string(),
            total_cost: 120.0,
            profit: 0.0,
            profit_margin: 0.0,
            created_at: now_utc_iso(),
            requirements: None,
            rating: None,
            feedback: None,
            status: PlanStatus::Draft,
            executed_at: None,
        }
    }

    fn item(name: &str, count: u32) -> PlanFlowerItem {
        PlanFlowerItem {
            flower_name: name.to_string(),
            count,
            reason: None,
            unit_cost: None,
        }
    }

    fn inventory_with_red_roses(temp: &tempfile::TempDir) -> anyhow::Result<InventoryLedger> {
        let mut store = KvStore::new(temp.path().join("store.json"));
        let rose = FlowerStock::new(
            "Red Rose",
            "Red",
            50,
            100,
            FlowerCategory::Main,
            5.0,
            15.0,
            Some("Love"),
        );
        store.set(crate::stores::kv::INVENTORY_SLOT, &vec![rose])?;
        Ok(InventoryLedger::new(store))
    }

    #[test]
    fn save_prepends_new_and_replaces_existing_in_place() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut history = HistoryLedger::new(KvStore::new(temp.path().join("store.json")));

        history.save(plan("a", Vec::new()))?;
        history.save(plan("b", Vec::new()))?;
        let ids: Vec<String> = history.list().into_iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let mut replacement = plan("a", Vec::new());
        replacement.title = "Updated".to_string();
        history.save(replacement)?;
        let listed = history.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].id, "a");
        assert_eq!(listed[1].title, "Updated");
        Ok(())
    }

    #[test]
    fn delete_and_reload_round_trip() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("store.json");
        let mut history = HistoryLedger::new(KvStore::new(&path));
        history.save(plan("a", Vec::new()))?;
        history.save(plan("b", Vec::new()))?;
        history.delete("a")?;

        let reloaded = HistoryLedger::new(KvStore::new(path));
        let ids: Vec<String> = reloaded.list().into_iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec!["b"]);
        Ok(())
    }

    #[test]
    fn execute_deducts_once_and_completes_plan() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut inventory = inventory_with_red_roses(&temp)?;
        let mut history = HistoryLedger::new(KvStore::new(temp.path().join("history.json")));

        let executed = history.execute(plan("p1", vec![item("red rose", 5)]), &mut inventory)?;
        assert_eq!(executed.status, PlanStatus::Completed);
        assert!(executed.executed_at.is_some());

        let rose = &inventory.list()[0];
        assert_eq!(rose.quantity, 45);
        assert_eq!(rose.total_used, Some(5));
        Ok(())
    }

    #[test]
    fn execute_twice_is_a_no_op_the_second_time() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut inventory = inventory_with_red_roses(&temp)?;
        let mut history = HistoryLedger::new(KvStore::new(temp.path().join("history.json")));

        let executed = history.execute(plan("p1", vec![item("red rose", 5)]), &mut inventory)?;
        let first_stamp = executed.executed_at.clone();
        let again = history.execute(executed, &mut inventory)?;

        assert_eq!(again.executed_at, first_stamp);
        assert_eq!(inventory.list()[0].quantity, 45);
        assert_eq!(inventory.list()[0].total_used, Some(5));
        Ok(())
    }
}
