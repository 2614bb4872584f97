//! Command and query dispatch through the builder-frozen dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use courier::{
    BoxError, CancelToken, Cancelled, Command, CommandHandler, DispatchError, Dispatcher, Query,
    QueryHandler, RegistrationError,
};

struct ActivateCommand;
impl Command for ActivateCommand {}

struct FindByIdQuery(String);
impl Query for FindByIdQuery {
    type Output = String;
}

struct CountingCommandHandler {
    count: Arc<AtomicUsize>,
}

impl CommandHandler<ActivateCommand> for CountingCommandHandler {
    async fn handle(&self, _command: ActivateCommand, _cancel: CancelToken) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct EchoQueryHandler;

impl QueryHandler<FindByIdQuery> for EchoQueryHandler {
    async fn handle(&self, query: FindByIdQuery, _cancel: CancelToken) -> Result<String, BoxError> {
        Ok(query.0)
    }
}

struct FailingCommandHandler;

impl CommandHandler<ActivateCommand> for FailingCommandHandler {
    async fn handle(&self, _command: ActivateCommand, _cancel: CancelToken) -> Result<(), BoxError> {
        Err("aggregate rejected the command".into())
    }
}

struct HonoringHandler;

impl CommandHandler<ActivateCommand> for HonoringHandler {
    async fn handle(&self, _command: ActivateCommand, cancel: CancelToken) -> Result<(), BoxError> {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }
        Ok(())
    }
}

#[tokio::test]
async fn command_handler_is_invoked_exactly_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let registered = count.clone();
    let dispatcher = Dispatcher::builder()
        .command::<ActivateCommand, _, _>(move || CountingCommandHandler {
            count: registered.clone(),
        })
        .unwrap()
        .build();

    dispatcher.dispatch(ActivateCommand).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    dispatcher.dispatch(ActivateCommand).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn query_returns_its_result_unchanged() {
    let dispatcher = Dispatcher::builder()
        .query::<FindByIdQuery, _, _>(|| EchoQueryHandler)
        .unwrap()
        .build();

    let out = dispatcher.query(FindByIdQuery("abc".into())).await.unwrap();
    assert_eq!(out, "abc");
}

#[tokio::test]
async fn dispatching_without_a_handler_names_the_message_type() {
    let dispatcher = Dispatcher::builder().build();

    let err = dispatcher.dispatch(ActivateCommand).await.unwrap_err();
    match err {
        DispatchError::NoHandler(key) => {
            assert!(key.type_name().contains("ActivateCommand"));
        }
        other => panic!("expected NoHandler, got {other}"),
    }
}

#[test]
fn duplicate_registration_fails_at_registration_time() {
    let result = Dispatcher::builder()
        .command::<ActivateCommand, _, _>(|| CountingCommandHandler {
            count: Arc::new(AtomicUsize::new(0)),
        })
        .unwrap()
        .command::<ActivateCommand, _, _>(|| FailingCommandHandler);

    assert!(matches!(
        result.unwrap_err(),
        RegistrationError::DuplicateHandler(_)
    ));
}

#[tokio::test]
async fn handler_failures_propagate_unwrapped() {
    let dispatcher = Dispatcher::builder()
        .command::<ActivateCommand, _, _>(|| FailingCommandHandler)
        .unwrap()
        .build();

    let err = dispatcher.dispatch(ActivateCommand).await.unwrap_err();
    assert_eq!(err.to_string(), "aggregate rejected the command");
}

#[tokio::test]
async fn cancellation_is_advisory_and_deterministic_per_handler() {
    let cancelled = CancelToken::new();
    cancelled.cancel();

    // A handler that honors the token fails with the explicit cancellation
    // value.
    let honoring = Dispatcher::builder()
        .command::<ActivateCommand, _, _>(|| HonoringHandler)
        .unwrap()
        .build();
    let err = honoring
        .dispatch_with(ActivateCommand, cancelled.clone())
        .await
        .unwrap_err();
    match err {
        DispatchError::Handler(inner) => {
            assert!(inner.downcast_ref::<Cancelled>().is_some());
        }
        other => panic!("expected a handler error, got {other}"),
    }

    // A handler that ignores the token completes normally.
    let count = Arc::new(AtomicUsize::new(0));
    let registered = count.clone();
    let oblivious = Dispatcher::builder()
        .command::<ActivateCommand, _, _>(move || CountingCommandHandler {
            count: registered.clone(),
        })
        .unwrap()
        .build();
    oblivious
        .dispatch_with(ActivateCommand, cancelled)
        .await
        .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn blocking_wrappers_drive_the_call_to_completion() {
    let count = Arc::new(AtomicUsize::new(0));
    let registered = count.clone();
    let dispatcher = Dispatcher::builder()
        .command::<ActivateCommand, _, _>(move || CountingCommandHandler {
            count: registered.clone(),
        })
        .unwrap()
        .query::<FindByIdQuery, _, _>(|| EchoQueryHandler)
        .unwrap()
        .build();

    dispatcher.dispatch_blocking(ActivateCommand).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let out = dispatcher
        .query_blocking(FindByIdQuery("blocking".into()))
        .unwrap();
    assert_eq!(out, "blocking");
}
