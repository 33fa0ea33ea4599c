//! End-to-end tests: client, HTTP transport, server handler and dispatcher.

use analysis_rpc::beans::{Dataset, DatasetData};
use analysis_rpc::dispatch::{Contract, DispatchTarget, Dispatchable};
use analysis_rpc::rpc::{
    handler_fn, start_server, AnalysisRpcClient, AnalysisRpcServer, DebugHook, HttpTransport,
    LoopbackTransport, RpcServerHandle,
};
use analysis_rpc::value::Prim;
use analysis_rpc::{native_object, Exception, FaultKind, RootFlattener, RpcError, Type, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
struct Opaque;
native_object!(Opaque, "test.Opaque");

struct Calculator;

impl Dispatchable for Calculator {
    fn contract(&self) -> Arc<Contract> {
        static CONTRACT: OnceLock<Arc<Contract>> = OnceLock::new();
        CONTRACT
            .get_or_init(|| {
                Contract::builder::<Calculator>("test.Calculator")
                    .method(
                        "add",
                        vec![Type::Primitive(Prim::Int), Type::Primitive(Prim::Int)],
                        |_: &Calculator, args| Ok(Value::Int(args.int(0)? + args.int(1)?)),
                    )
                    .method(
                        "add",
                        vec![Type::Primitive(Prim::Double), Type::Primitive(Prim::Double)],
                        |_: &Calculator, args| Ok(Value::Double(args.double(0)? + args.double(1)?)),
                    )
                    .method("describe", vec![Type::Boxed(Prim::Int)], |_: &Calculator, _| {
                        Ok(Value::from("Integer"))
                    })
                    .method("describe", vec![Type::String], |_: &Calculator, _| {
                        Ok(Value::from("String"))
                    })
                    .method("divide", vec![Type::Primitive(Prim::Int), Type::Primitive(Prim::Int)], |_: &Calculator, args| {
                        let (a, b) = (args.int(0)?, args.int(1)?);
                        a.checked_div(b)
                            .map(Value::Int)
                            .ok_or_else(|| Exception::new("ArithmeticException", "/ by zero"))
                    })
                    .build()
            })
            .clone()
    }
}

struct Fixture {
    server: Arc<AnalysisRpcServer>,
    handle: RpcServerHandle,
    client: AnalysisRpcClient<HttpTransport>,
    temp: TempDir,
}

async fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = Arc::new(RootFlattener::new());
    root.set_temp_location(Some(temp.path().to_path_buf()));

    let server = Arc::new(AnalysisRpcServer::with_flattener(root.clone()));
    server.add_handler(
        "cat",
        handler_fn(|args| {
            let mut out = String::new();
            for arg in &args {
                match arg {
                    Value::Str(s) => out.push_str(s),
                    other => {
                        return Err(Exception::illegal_argument(format!(
                            "cannot cat {}",
                            other.type_label()
                        )))
                    }
                }
            }
            Ok(Value::Str(out))
        }),
    );
    server.add_handler("len", handler_fn(|args| Ok(Value::Int(args.len() as i32))));
    server.add_handler("echo", handler_fn(|args| Ok(Value::List(args))));
    server.add_handler("opaque", handler_fn(|_| Ok(Value::object(Opaque))));
    server.add_handler(
        "ramp",
        handler_fn(|args| {
            let n = args
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| Exception::illegal_argument("ramp needs a length"))?;
            let data = (0..n).map(|i| i as f64).collect();
            Ok(Value::object(
                Dataset::from_vec(DatasetData::Double(data)).with_name("ramp"),
            ))
        }),
    );
    server.add_handler(
        "sleep",
        handler_fn(|args| {
            let millis = args.first().and_then(Value::as_i64).unwrap_or(0);
            std::thread::sleep(Duration::from_millis(millis as u64));
            Ok(Value::Bool(true))
        }),
    );
    server.add_handler("calc", Arc::new(DispatchTarget::new(Arc::new(Calculator))));

    let handle = start_server(server.clone(), "127.0.0.1", 0).await.unwrap();
    let client = AnalysisRpcClient::with_flattener(
        HttpTransport::new("127.0.0.1", handle.port()).unwrap(),
        root,
    );
    Fixture {
        server,
        handle,
        client,
        temp,
    }
}

#[tokio::test]
async fn test_plain_handlers_over_http() {
    let f = fixture().await;
    f.client.wait_until_alive(Duration::from_secs(5)).await.unwrap();

    let result = f
        .client
        .request("cat", vec![Value::from("foo"), Value::from("bar")])
        .await
        .unwrap();
    assert_eq!(result, Value::from("foobar"));

    let result = f
        .client
        .request("len", vec![Value::Null, Value::Int(1), Value::from(vec![1.0f64])])
        .await
        .unwrap();
    assert_eq!(result, Value::Int(3));
}

#[tokio::test]
async fn test_dispatcher_over_http() {
    let f = fixture().await;
    assert_eq!(
        f.client
            .call("calc", "add", vec![Value::Int(2), Value::Int(3)])
            .await
            .unwrap(),
        Value::Int(5)
    );
    assert_eq!(
        f.client
            .call("calc", "add", vec![Value::Double(0.5), Value::Double(0.25)])
            .await
            .unwrap(),
        Value::Double(0.75)
    );
    assert_eq!(
        f.client
            .call("calc", "describe", vec![Value::typed_none(Type::String)])
            .await
            .unwrap(),
        Value::from("String")
    );
    assert_eq!(
        f.client
            .call("calc", "describe", vec![Value::typed_none(Type::Boxed(Prim::Int))])
            .await
            .unwrap(),
        Value::from("Integer")
    );
}

#[tokio::test]
async fn test_faults_become_remote_errors() {
    let f = fixture().await;

    match f.client.call("calc", "subtract", vec![Value::Int(1)]).await {
        Err(RpcError::Remote { kind, message, .. }) => {
            assert_eq!(kind, FaultKind::MethodNotFound);
            assert!(message.contains("subtract"));
            assert!(message.contains("calc"));
        }
        other => panic!("Expected Remote, got: {:?}", other),
    }

    match f
        .client
        .call("calc", "divide", vec![Value::Int(1), Value::Int(0)])
        .await
    {
        Err(RpcError::Remote { kind, cause, .. }) => {
            assert_eq!(kind, FaultKind::InvocationFailed);
            let cause = cause.unwrap();
            assert_eq!(cause.kind, "ArithmeticException");
            assert_eq!(cause.message, "/ by zero");
        }
        other => panic!("Expected Remote, got: {:?}", other),
    }

    match f.client.request("cat", vec![Value::Int(1)]).await {
        Err(RpcError::Remote { kind, cause, .. }) => {
            assert_eq!(kind, FaultKind::InvocationFailed);
            assert_eq!(cause.unwrap().kind, Exception::ILLEGAL_ARGUMENT_KIND);
        }
        other => panic!("Expected Remote, got: {:?}", other),
    }

    match f.client.request("nowhere", vec![]).await {
        Err(RpcError::Remote { kind, .. }) => assert_eq!(kind, FaultKind::MethodNotFound),
        other => panic!("Expected Remote, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_unflattenable_values() {
    let f = fixture().await;

    // Result the server cannot flatten.
    match f.client.request("opaque", vec![]).await {
        Err(RpcError::Remote { kind, message, .. }) => {
            assert_eq!(kind, FaultKind::UnsupportedValue);
            assert!(message.contains("test.Opaque"));
        }
        other => panic!("Expected Remote, got: {:?}", other),
    }

    // Argument the client cannot flatten never leaves the process.
    match f.client.request("echo", vec![Value::object(Opaque)]).await {
        Err(RpcError::Unsupported { .. }) => {}
        other => panic!("Expected Unsupported, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_large_dataset_is_spooled_and_cleaned_up() {
    let f = fixture().await;
    let result = f.client.request("ramp", vec![Value::Int(20_000)]).await.unwrap();

    let dataset = result.downcast_ref::<Dataset>().unwrap();
    assert_eq!(dataset.name(), Some("ramp"));
    assert_eq!(dataset.shape(), &[20_000]);
    match dataset.data() {
        DatasetData::Double(v) => assert_eq!(v[19_999], 19_999.0),
        other => panic!("Expected Double data, got: {:?}", other),
    }
    // The spool file was deleted after loading.
    assert_eq!(std::fs::read_dir(f.temp.path()).unwrap().count(), 0);

    // Small datasets travel inline.
    let small = f.client.request("ramp", vec![Value::Int(4)]).await.unwrap();
    assert_eq!(small.downcast_ref::<Dataset>().unwrap().size(), 4);
}

#[tokio::test]
async fn test_echo_roundtrips_arguments() {
    let f = fixture().await;
    let args = vec![
        Value::from(vec![1i32, 2, 3]),
        Value::typed_none(Type::String),
        Value::Long(-9),
    ];
    match f.client.request("echo", args.clone()).await.unwrap() {
        Value::Array(array) => assert_eq!(array.items, args),
        other => panic!("Expected Array, got: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_call_does_not_block_others() {
    let f = fixture().await;
    let slow = f.client.request("sleep", vec![Value::Int(1500)]);
    let fast = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let started = Instant::now();
        let result = f.client.request("len", vec![]).await;
        (result, started.elapsed())
    };
    let (slow, (fast, elapsed)) = tokio::join!(slow, fast);
    assert_eq!(slow.unwrap(), Value::Bool(true));
    assert_eq!(fast.unwrap(), Value::Int(0));
    assert!(elapsed < Duration::from_millis(1000), "fast call took {:?}", elapsed);
}

struct RecordingHook(Mutex<Vec<(String, bool)>>);

impl DebugHook for RecordingHook {
    fn attach(&self, destination: &str, suspend: bool) -> Result<(), Exception> {
        self.0
            .lock()
            .unwrap()
            .push((destination.to_string(), suspend));
        Ok(())
    }
}

#[tokio::test]
async fn test_debug_requests_run_hook() {
    let f = fixture().await;
    let hook = Arc::new(RecordingHook(Mutex::new(Vec::new())));
    f.server.set_debug_hook(Some(hook.clone()));

    let result = f
        .client
        .request_debug("len", vec![Value::Int(1)], true)
        .await
        .unwrap();
    assert_eq!(result, Value::Int(1));
    assert_eq!(
        *hook.0.lock().unwrap(),
        vec![("len".to_string(), true)]
    );

    // Plain requests skip the hook.
    f.client.request("len", vec![]).await.unwrap();
    assert_eq!(hook.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_shutdown_stops_serving() {
    let f = fixture().await;
    assert!(f.client.is_alive().await.unwrap());
    let Fixture { handle, client, .. } = f;
    handle.stopped().await;
    assert!(matches!(
        client.is_alive().await,
        Err(RpcError::Transport { .. })
    ));
    assert!(client
        .wait_until_alive(Duration::from_millis(300))
        .await
        .is_err());
}

#[tokio::test]
async fn test_loopback_transport_matches_http() {
    let f = fixture().await;
    let loopback = AnalysisRpcClient::with_flattener(
        LoopbackTransport::new(f.server.clone()),
        f.server.flattener().clone(),
    );
    let args = vec![Value::from("a"), Value::from("b")];
    assert_eq!(
        loopback.request("cat", args.clone()).await.unwrap(),
        f.client.request("cat", args).await.unwrap()
    );
}

#[tokio::test]
async fn test_handlers_can_be_replaced_while_serving() {
    let f = fixture().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let previous = f.server.add_handler(
        "len",
        handler_fn(move |_| Ok(Value::Int(counter.fetch_add(1, Ordering::SeqCst) as i32 + 100))),
    );
    assert!(previous.is_some());
    assert_eq!(f.client.request("len", vec![]).await.unwrap(), Value::Int(100));
    assert_eq!(f.client.request("len", vec![]).await.unwrap(), Value::Int(101));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    f.server.remove_handler("len");
    assert!(matches!(
        f.client.request("len", vec![]).await,
        Err(RpcError::Remote { kind: FaultKind::MethodNotFound, .. })
    ));
}
