//! Handler groups registered and dispatched end to end.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use courier::{
    BoxError, Command, CommandDelegate, Dispatcher, Event, GroupBindings, HandlerGroup,
    HandlerShape, MessageKind, MethodSpec, Query, RegistrationError,
};

struct RestockCommand {
    amount: usize,
}
impl Command for RestockCommand {}

struct OnHandQuery;
impl Query for OnHandQuery {
    type Output = usize;
}

struct ItemCreatedEvent;
impl Event for ItemCreatedEvent {}

struct InventoryService {
    stock: Arc<AtomicUsize>,
    created: Arc<AtomicUsize>,
}

impl InventoryService {
    fn restock(&self, command: RestockCommand) -> Result<(), BoxError> {
        self.stock.fetch_add(command.amount, Ordering::SeqCst);
        Ok(())
    }

    fn on_hand(&self, _query: OnHandQuery) -> Result<usize, BoxError> {
        Ok(self.stock.load(Ordering::SeqCst))
    }

    fn item_created(&self, _event: &ItemCreatedEvent) -> Result<(), BoxError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn item_created_audit(&self, _event: &ItemCreatedEvent) -> Result<(), BoxError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl HandlerGroup for InventoryService {
    fn bindings(methods: &mut GroupBindings<Self>) {
        methods
            .command("restock", InventoryService::restock)
            .query("on_hand", InventoryService::on_hand)
            .event("item_created", InventoryService::item_created)
            .event("item_created_audit", InventoryService::item_created_audit);
    }
}

fn inventory_factory() -> (
    impl Fn() -> InventoryService + Send + Sync + 'static,
    Arc<AtomicUsize>,
    Arc<AtomicUsize>,
) {
    let stock = Arc::new(AtomicUsize::new(0));
    let created = Arc::new(AtomicUsize::new(0));
    let stock_for_factory = stock.clone();
    let created_for_factory = created.clone();
    let factory = move || InventoryService {
        stock: stock_for_factory.clone(),
        created: created_for_factory.clone(),
    };
    (factory, stock, created)
}

#[tokio::test]
async fn group_methods_become_independent_registry_entries() {
    let (factory, stock, created) = inventory_factory();
    let dispatcher = Dispatcher::builder().group(factory).unwrap().build();

    dispatcher
        .dispatch(RestockCommand { amount: 5 })
        .await
        .unwrap();
    assert_eq!(stock.load(Ordering::SeqCst), 5);

    let on_hand = dispatcher.query(OnHandQuery).await.unwrap();
    assert_eq!(on_hand, 5);

    // Both event methods subscribe to the same event type.
    dispatcher.publish(ItemCreatedEvent).await.unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn startup_registrations_take_precedence_over_groups() {
    let (factory, group_stock, _created) = inventory_factory();
    let store_stock = Arc::new(AtomicUsize::new(0));
    let registered = store_stock.clone();

    let dispatcher = Dispatcher::builder()
        .command::<RestockCommand, _, _>(move || {
            let stock = registered.clone();
            move |command: RestockCommand| {
                let stock = stock.clone();
                async move {
                    stock.fetch_add(command.amount, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                }
            }
        })
        .unwrap()
        .group(factory)
        .unwrap()
        .build();

    dispatcher
        .dispatch(RestockCommand { amount: 3 })
        .await
        .unwrap();

    // The directly registered handler won the resolution; the group's
    // command method was never consulted.
    assert_eq!(store_stock.load(Ordering::SeqCst), 3);
    assert_eq!(group_stock.load(Ordering::SeqCst), 0);
}

struct MismarkedGroup;

impl HandlerGroup for MismarkedGroup {
    fn bindings(methods: &mut GroupBindings<Self>) {
        let delegate = CommandDelegate::from_sync(|| (), |_: &(), _: RestockCommand| Ok(())).erase();
        methods.raw(MethodSpec::new(
            "find_totals",
            MessageKind::Query,
            HandlerShape::Sync,
            delegate,
        ));
    }
}

#[test]
fn invalid_group_fails_when_registered_not_when_dispatched() {
    let err = Dispatcher::builder().group(|| MismarkedGroup).unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidSignature { .. }));
}

struct AmbiguousGroup;

impl HandlerGroup for AmbiguousGroup {
    fn bindings(methods: &mut GroupBindings<Self>) {
        methods
            .command("restock", |_: &Self, _: RestockCommand| Ok(()))
            .command("restock_again", |_: &Self, _: RestockCommand| Ok(()));
    }
}

#[test]
fn ambiguous_group_is_rejected_at_registration() {
    let err = Dispatcher::builder().group(|| AmbiguousGroup).unwrap_err();
    assert!(matches!(err, RegistrationError::DuplicateHandler(_)));
}
