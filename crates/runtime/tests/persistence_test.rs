//! Persistence lifecycle tests: debounce coalescing, flush semantics,
//! teardown, and corruption recovery through the full service.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use loadout_core::{
    DropHandle, DropHandler, DropRefused, InventoryConfig, InventorySnapshot, ItemCatalog,
    ItemCategory, ItemDefinition, ItemId, ItemStack, OwnerId, Position, SocketId, StatId,
    StatLine,
};
use loadout_runtime::repository::Result as RepoResult;
use loadout_runtime::{
    Event, FileSnapshotRepository, InventoryEvent, InventoryService, LoadOutcome,
    MemorySnapshotRepository, PersistenceEvent, SnapshotRepository, Topic,
};

const POTION: ItemId = ItemId(1);
const SWORD: ItemId = ItemId(2);

fn catalog() -> Arc<ItemCatalog> {
    Arc::new(ItemCatalog::new(
        [
            ItemDefinition::new(POTION, "potion", ItemCategory::Consumable).with_max_stack(99),
            ItemDefinition::new(SWORD, "sword", ItemCategory::Weapon)
                .with_base_stats(vec![StatLine::flat(StatId::Attack, 12)]),
        ],
        [],
    ))
}

#[derive(Default)]
struct NullDropper;

impl DropHandler for NullDropper {
    fn spawn_in_world(
        &mut self,
        _stack: ItemStack,
        _position: Position,
    ) -> Result<DropHandle, DropRefused> {
        Ok(DropHandle(1))
    }
}

/// Delegating wrapper so tests can keep a handle on the memory repository
/// after the service takes ownership of the boxed trait object.
struct SharedRepo(Arc<MemorySnapshotRepository>);

impl SnapshotRepository for SharedRepo {
    fn save(&self, snapshot: &InventorySnapshot) -> RepoResult<String> {
        self.0.save(snapshot)
    }

    fn load(&self, owner: OwnerId) -> RepoResult<LoadOutcome> {
        self.0.load(owner)
    }

    fn exists(&self, owner: OwnerId) -> bool {
        self.0.exists(owner)
    }

    fn delete(&self, owner: OwnerId) -> RepoResult<()> {
        self.0.delete(owner)
    }
}

fn config() -> InventoryConfig {
    InventoryConfig {
        capacity: 30,
        save_debounce_ms: 60,
    }
}

#[tokio::test]
async fn burst_of_mutations_coalesces_into_one_save() {
    let repo = Arc::new(MemorySnapshotRepository::new());
    let mut service = InventoryService::start(
        catalog(),
        NullDropper,
        OwnerId::PLAYER,
        config(),
        Box::new(SharedRepo(repo.clone())),
    )
    .await
    .unwrap();

    let mut persistence_rx = service.subscribe(Topic::Persistence);
    let mut inventory_rx = service.subscribe(Topic::Inventory);

    // Two save triggers inside one debounce window.
    service.add_item(POTION, 10).unwrap();
    service.add_item(SWORD, 1).unwrap();

    let event = timeout(Duration::from_secs(2), persistence_rx.recv())
        .await
        .expect("save should fire after the debounce window")
        .unwrap();
    match event {
        Event::Persistence(PersistenceEvent::SaveCompleted { deltas, .. }) => {
            assert_eq!(deltas, 2); // union of both changes
        }
        other => panic!("expected SaveCompleted, got {other:?}"),
    }

    // Exactly one disk write for the whole burst.
    assert_eq!(repo.save_count(), 1);

    // Per-mutation snapshots, then one coalesced delta batch at save time.
    let mut changed = 0;
    let mut delta_batches = 0;
    while let Ok(event) = inventory_rx.try_recv() {
        match event {
            Event::Inventory(InventoryEvent::Changed { .. }) => changed += 1,
            Event::Inventory(InventoryEvent::Delta { batch, .. }) => {
                delta_batches += 1;
                let items: Vec<ItemId> =
                    batch.entries().iter().map(|delta| delta.item).collect();
                assert!(items.contains(&POTION));
                assert!(items.contains(&SWORD));
            }
            other => panic!("unexpected inventory event {other:?}"),
        }
    }
    assert_eq!(changed, 2);
    assert_eq!(delta_batches, 1);

    // Quiet period: no further writes.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(repo.save_count(), 1);

    service.shutdown().await.unwrap();
    assert_eq!(repo.save_count(), 1);
}

#[tokio::test]
async fn flush_skips_the_debounce_window() {
    let repo = Arc::new(MemorySnapshotRepository::new());
    let mut service = InventoryService::start(
        catalog(),
        NullDropper,
        OwnerId::PLAYER,
        config(),
        Box::new(SharedRepo(repo.clone())),
    )
    .await
    .unwrap();

    service.add_item(POTION, 5).unwrap();
    assert!(service.flush().await.unwrap());
    assert_eq!(repo.save_count(), 1);

    // Nothing dirty: flush is a no-op.
    assert!(!service.flush().await.unwrap());
    assert_eq!(repo.save_count(), 1);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_flushes_the_final_burst() {
    let repo = Arc::new(MemorySnapshotRepository::new());
    let mut service = InventoryService::start(
        catalog(),
        NullDropper,
        OwnerId::PLAYER,
        config(),
        Box::new(SharedRepo(repo.clone())),
    )
    .await
    .unwrap();

    // Mutate and tear down before the debounce timer can fire.
    service.add_item(POTION, 5).unwrap();
    service.shutdown().await.unwrap();

    assert_eq!(repo.save_count(), 1);
    match repo.load(OwnerId::PLAYER).unwrap() {
        LoadOutcome::Snapshot(snapshot) => {
            assert_eq!(snapshot.slots.len(), 1);
            assert_eq!(snapshot.slots[0].stack.quantity, 5);
        }
        other => panic!("expected persisted snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn state_survives_a_session_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let repo = FileSnapshotRepository::new(dir.path()).unwrap();
        let mut service = InventoryService::start(
            catalog(),
            NullDropper,
            OwnerId::PLAYER,
            config(),
            Box::new(repo),
        )
        .await
        .unwrap();

        service.add_item(POTION, 120).unwrap();
        service.add_item(SWORD, 1).unwrap();
        service.equip_from_inventory(2, SocketId::WeaponR).unwrap();
        service.set_level(9);
        service.set_currency(777);
        service.shutdown().await.unwrap();
    }

    let repo = FileSnapshotRepository::new(dir.path()).unwrap();
    let service = InventoryService::start(
        catalog(),
        NullDropper,
        OwnerId::PLAYER,
        config(),
        Box::new(repo),
    )
    .await
    .unwrap();

    assert_eq!(service.total_quantity(POTION), 120);
    assert_eq!(service.total_quantity(SWORD), 1);
    assert_eq!(service.level(), 9);
    assert_eq!(service.currency(), 777);
    assert_eq!(
        service
            .equipment()
            .occupant(SocketId::WeaponR)
            .unwrap()
            .item,
        SWORD
    );
    // Stat modifiers reproject from the restored equipment.
    assert_eq!(service.projector().totals(StatId::Attack).flat, 12);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn corrupted_payload_backs_up_and_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory_0.json");
    std::fs::write(&path, "{ not even close to json").unwrap();

    let repo = FileSnapshotRepository::new(dir.path()).unwrap();
    let mut service = InventoryService::start(
        catalog(),
        NullDropper,
        OwnerId::PLAYER,
        config(),
        Box::new(repo),
    )
    .await
    .unwrap();

    let backup = service.recovered_from().expect("corruption was recovered");
    assert!(backup.exists());
    assert!(!path.exists()); // quarantined, not overwritten in place

    // The fresh state is fully usable and persists normally.
    service.add_item(POTION, 3).unwrap();
    assert!(service.flush().await.unwrap());
    assert!(path.exists());

    service.shutdown().await.unwrap();
}
