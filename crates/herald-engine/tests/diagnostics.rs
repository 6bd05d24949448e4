//! Diagnostic output of the event center
//!
//! Failed registrations and broadcasts are reported through `tracing`; these
//! tests capture the formatted output.

use herald_engine::{
    EventCenter, MethodHandle, Object, ObjectRef, Observer, ParamDescriptor, ParamKind,
    ReflectedFunction,
};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with captured tracing output
fn with_tracing<R>(f: impl FnOnce() -> R) -> (String, R) {
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (logs.contents(), result)
}

struct Beacon;

impl Object for Beacon {
    fn class_name(&self) -> &str {
        "Beacon"
    }

    fn find_method(&self, name: &str) -> Option<MethodHandle> {
        let int = ParamDescriptor::new(ParamKind::Int32, "i32");
        match name {
            "Ping" => Some(ReflectedFunction::new(name).param("Id", int).into_handle()),
            "Query" => Some(
                ReflectedFunction::new(name)
                    .param("Id", int.clone())
                    .returns(int)
                    .into_handle(),
            ),
            "Blob" => Some(
                ReflectedFunction::new(name)
                    .param("Data", ParamDescriptor::new(ParamKind::Undefined, "Blob"))
                    .into_handle(),
            ),
            _ => None,
        }
    }
}

fn on_score(_args: &(i32,)) {}

#[test]
fn test_broadcast_mismatch_is_logged() {
    let center = EventCenter::default();
    center.register("Score", Observer::function(on_score));

    let (logs, delivered) = with_tracing(|| center.broadcast("Score", &(String::from("ten"),)));

    assert!(!delivered);
    assert!(logs.contains("ERROR"));
    assert!(logs.contains(
        "Invalid Operation, failed convert signature. EventName = (Score), Signal Signature = (i32), Broadcast Signature = (String)"
    ));
}

#[test]
fn test_register_mismatch_is_logged() {
    let center = EventCenter::default();
    center.register("Score", Observer::function(on_score));

    let (logs, handle) = with_tracing(|| {
        center.register("Score", Observer::closure(|_: &(f32, f32)| {}))
    });

    assert!(!handle.is_valid());
    assert!(logs.contains(
        "Failed register listener for event (Score). Signal Signature = (i32), Listener Signature = (f32, f32)"
    ));
}

#[test]
fn test_duplicate_register_is_silent() {
    let center = EventCenter::default();
    center.register("Score", Observer::function(on_score));

    let (logs, handle) = with_tracing(|| center.register("Score", Observer::function(on_score)));

    assert!(!handle.is_valid());
    assert!(!logs.contains("ERROR"));
    assert!(!logs.contains("WARN"));
}

#[test]
fn test_unknown_event_is_silent() {
    let center = EventCenter::default();

    let (logs, delivered) = with_tracing(|| center.broadcast("Nobody", &(1i32,)));

    assert!(!delivered);
    assert!(!logs.contains("ERROR"));
}

#[test]
fn test_invalid_reflected_functions_are_logged() {
    let center = EventCenter::default();
    let beacon = ObjectRef::new(Rc::new(Beacon));

    let (logs, handles) = with_tracing(|| {
        [
            center.register_reflected("Ping", &beacon, "Query"),
            center.register_reflected("Ping", &beacon, "Blob"),
            center.register_reflected("Ping", &beacon, "Missing"),
            center.register_reflected("Ping", &beacon, "Ping"),
        ]
    });

    assert!(!handles[0].is_valid());
    assert!(!handles[1].is_valid());
    assert!(!handles[2].is_valid());
    assert!(handles[3].is_valid());
    assert!(logs.contains("Function Query is not a valid event listener"));
    assert!(logs.contains("parameter Data has unsupported type Blob"));
    assert!(logs.contains("Method Missing not found on Beacon"));
}

#[test]
fn test_signal_creation_is_traced() {
    let center = EventCenter::default();

    let (logs, _) = with_tracing(|| center.register("Score", Observer::function(on_score)));

    assert!(logs.contains("DEBUG"));
    assert!(logs.contains("Created signal (i32) for event Score"));
}
