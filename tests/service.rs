use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use servisor::{
    Creation, DeclarationError, EventKind, OptionSpec, RunOutcome, RuntimeError, Service,
    ServiceConfig, ServiceHandle, Task, TaskContext, TaskDescriptor, TaskError, TaskState,
};

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct Recorder {
    name: &'static str,
    journal: Journal,
}

#[async_trait]
impl Task for Recorder {
    async fn init(&mut self, _ctx: &TaskContext) -> Result<(), TaskError> {
        self.journal.push(format!("init:{}", self.name));
        Ok(())
    }

    fn on_stop(&self) {
        self.journal.push(format!("stop:{}", self.name));
    }

    async fn teardown(&self) {
        self.journal.push(format!("teardown:{}", self.name));
    }
}

fn recorder(name: &'static str, journal: &Journal) -> TaskDescriptor {
    let journal = journal.clone();
    TaskDescriptor::new(name, move || Recorder {
        name,
        journal: journal.clone(),
    })
}

struct Skipper;

#[async_trait]
impl Task for Skipper {
    async fn init(&mut self, _ctx: &TaskContext) -> Result<(), TaskError> {
        Err(TaskError::skip("not configured"))
    }
}

struct Broken;

#[async_trait]
impl Task for Broken {
    async fn init(&mut self, _ctx: &TaskContext) -> Result<(), TaskError> {
        Err(TaskError::fail("cannot bind"))
    }
}

struct Panicky;

#[async_trait]
impl Task for Panicky {
    async fn init(&mut self, _ctx: &TaskContext) -> Result<(), TaskError> {
        panic!("init exploded")
    }
}

fn config() -> ServiceConfig {
    ServiceConfig::default().with_signals(false)
}

async fn ready(service: &Service, cfg: ServiceConfig) -> servisor::ServiceInstance {
    match service.create(Arc::new(cfg)).await.unwrap() {
        Creation::Ready(instance) => instance,
        Creation::Listed(_) => panic!("expected a ready instance"),
    }
}

#[tokio::test]
async fn test_init_in_dependency_order_and_stop_in_reverse() {
    let journal = Journal::default();
    let service = Service::builder("svc")
        .task(recorder("C", &journal).depends_on("B"))
        .task(recorder("B", &journal).depends_on("A"))
        .task(recorder("A", &journal))
        .build()
        .unwrap();

    let instance = ready(&service, config()).await;
    assert_eq!(instance.names(), vec!["A", "B", "C"]);

    instance.start().unwrap();
    instance.shutdown().await;

    assert_eq!(
        journal.entries(),
        vec![
            "init:A", "init:B", "init:C", "stop:C", "teardown:C", "stop:B", "teardown:B",
            "stop:A", "teardown:A",
        ]
    );
    assert_eq!(instance.state_of("A"), Some(TaskState::Stopped));
    assert!(instance.is_terminated());
}

/// Idles until cancelled, then lingers in `teardown` before recording it.
struct Lingering {
    name: &'static str,
    linger: Duration,
    journal: Journal,
}

#[async_trait]
impl Task for Lingering {
    fn on_stop(&self) {
        self.journal.push(format!("stop:{}", self.name));
    }

    async fn teardown(&self) {
        tokio::time::sleep(self.linger).await;
        self.journal.push(format!("teardown:{}", self.name));
    }
}

fn lingering(name: &'static str, linger_ms: u64, journal: &Journal) -> TaskDescriptor {
    let journal = journal.clone();
    TaskDescriptor::new(name, move || Lingering {
        name,
        linger: Duration::from_millis(linger_ms),
        journal: journal.clone(),
    })
}

#[tokio::test]
async fn test_reverse_stop_waits_for_slow_teardowns() {
    let journal = Journal::default();
    let service = Service::builder("svc")
        .task(lingering("A", 0, &journal))
        .task(lingering("B", 200, &journal).depends_on("A"))
        .task(lingering("C", 20, &journal).depends_on("B"))
        .build()
        .unwrap();

    let instance = ready(&service, config()).await;
    instance.start().unwrap();
    instance.shutdown().await;

    assert_eq!(
        journal.entries(),
        vec!["stop:C", "teardown:C", "stop:B", "teardown:B", "stop:A", "teardown:A"]
    );
}

/// Records its stop, then panics while tearing down.
struct Fragile {
    journal: Journal,
}

#[async_trait]
impl Task for Fragile {
    fn on_stop(&self) {
        self.journal.push("stop:B");
    }

    async fn teardown(&self) {
        panic!("teardown exploded")
    }
}

#[tokio::test]
async fn test_panicking_teardown_does_not_interrupt_shutdown() {
    let journal = Journal::default();
    let j = journal.clone();
    let service = Service::builder("svc")
        .task(recorder("A", &journal).loopless())
        .task(
            TaskDescriptor::new("B", move || Fragile { journal: j.clone() })
                .loopless()
                .depends_on("A"),
        )
        .task(recorder("C", &journal).loopless().depends_on("B"))
        .build()
        .unwrap();

    let mut events = service.subscribe();
    let instance = ready(&service, config()).await;
    instance.start().unwrap();

    let stopping = instance.clone();
    tokio::spawn(async move { stopping.shutdown().await })
        .await
        .unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "init:A", "init:C", "stop:C", "teardown:C", "stop:B", "stop:A", "teardown:A",
        ]
    );
    assert!(instance.is_terminated());
    assert_eq!(instance.state_of("B"), Some(TaskState::Stopped));

    let mut failed = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::TaskJoinFailed {
            failed.push(ev.task.as_deref().map(str::to_string));
        }
    }
    assert_eq!(failed, vec![Some("B".to_string())]);
}

#[tokio::test]
async fn test_skipped_task_leaves_others_running() {
    let journal = Journal::default();
    let service = Service::builder("svc")
        .task(recorder("A", &journal))
        .task(TaskDescriptor::new("Optional", || Skipper))
        .task(recorder("B", &journal))
        .build()
        .unwrap();

    let instance = ready(&service, config()).await;
    assert_eq!(instance.names(), vec!["A", "B"]);
    assert_eq!(instance.skipped(), vec!["Optional"]);
    assert_eq!(instance.state_of("Optional"), Some(TaskState::Skipped));
    assert!(matches!(
        instance.get("Optional"),
        Err(RuntimeError::TaskNotFound { .. })
    ));
    instance.shutdown().await;
}

#[tokio::test]
async fn test_init_failures_are_collected_and_nothing_runs() {
    let steps = Arc::new(AtomicUsize::new(0));
    let counter = steps.clone();
    let looping = TaskDescriptor::from_fn("Loop", move |token: CancellationToken| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            token.cancelled().await;
            Err(TaskError::Canceled)
        }
    });

    let service = Service::builder("svc")
        .task(TaskDescriptor::new("First", || Broken))
        .task(looping)
        .task(TaskDescriptor::new("Second", || Panicky))
        .build()
        .unwrap();

    let err = match service.create(Arc::new(config())).await {
        Err(e) => e,
        Ok(_) => panic!("creation should fail"),
    };
    match &err {
        RuntimeError::InitFailed { count, errors } => {
            assert_eq!(*count, 2);
            assert_eq!(errors[0].task, "First");
            assert_eq!(errors[1].task, "Second");
            assert!(errors[1].to_string().contains("init exploded"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        err.to_string(),
        "unable to start service (2 task start errors)"
    );
    assert_eq!(err.causes().len(), 2);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(steps.load(Ordering::SeqCst), 0);
}

/// Records what its handle reports about every task while it initializes.
struct Watcher {
    seen: Arc<Mutex<Vec<Option<TaskState>>>>,
}

#[async_trait]
impl Task for Watcher {
    async fn init(&mut self, ctx: &TaskContext) -> Result<(), TaskError> {
        let states: Vec<_> = ["Gone", "Optional", "Watcher", "Later", "Ghost"]
            .into_iter()
            .map(|name| ctx.service().state_of(name))
            .collect();
        self.seen.lock().extend(states);
        Ok(())
    }
}

#[tokio::test]
async fn test_states_visible_while_creating() {
    let journal = Journal::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let service = Service::builder("svc")
        .task(TaskDescriptor::new("Gone", || Broken))
        .task(TaskDescriptor::new("Optional", || Skipper))
        .task(TaskDescriptor::new("Watcher", move || Watcher { seen: s.clone() }))
        .task(recorder("Later", &journal))
        .build()
        .unwrap();

    let err = service.create(Arc::new(config())).await.err();
    assert!(matches!(err, Some(RuntimeError::InitFailed { count: 1, .. })));
    assert_eq!(
        seen.lock().clone(),
        vec![
            Some(TaskState::Failed),
            Some(TaskState::Skipped),
            Some(TaskState::Initializing),
            Some(TaskState::Created),
            None,
        ]
    );
}

#[tokio::test]
async fn test_shutdown_runs_once() {
    let journal = Journal::default();
    let service = Service::builder("svc")
        .task(recorder("A", &journal))
        .task(recorder("B", &journal).loopless())
        .build()
        .unwrap();

    let instance = ready(&service, config()).await;
    instance.start().unwrap();

    let other = instance.clone();
    tokio::join!(instance.shutdown(), other.shutdown());
    instance.shutdown().await;

    let entries = journal.entries();
    assert_eq!(entries.iter().filter(|e| e.starts_with("stop:")).count(), 2);
    assert_eq!(entries.iter().filter(|e| e.starts_with("teardown:")).count(), 2);
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let service = Service::builder("svc")
        .task(TaskDescriptor::new("Idle", || Skipper))
        .build()
        .unwrap();

    let instance = ready(&service, config()).await;
    instance.start().unwrap();
    assert!(matches!(instance.start(), Err(RuntimeError::AlreadyStarted)));
    instance.shutdown().await;
}

/// Requests a restart from its first instance and a shutdown from the second.
struct Restarter {
    generation: usize,
    configs: Arc<Mutex<Vec<usize>>>,
    service: Option<ServiceHandle>,
}

#[async_trait]
impl Task for Restarter {
    async fn init(&mut self, ctx: &TaskContext) -> Result<(), TaskError> {
        self.configs
            .lock()
            .push(Arc::as_ptr(ctx.config()) as usize);
        self.service = Some(ctx.service().clone());
        Ok(())
    }

    async fn step(&self, token: &CancellationToken) -> Result<(), TaskError> {
        if let Some(service) = &self.service {
            if self.generation == 1 {
                service.request_restart();
            } else {
                service.request_shutdown();
            }
        }
        token.cancelled().await;
        Err(TaskError::Canceled)
    }
}

#[tokio::test]
async fn test_restart_builds_new_instance_with_same_config() {
    let built = Arc::new(AtomicUsize::new(0));
    let configs = Arc::new(Mutex::new(Vec::new()));

    let (b, c) = (built.clone(), configs.clone());
    let service = Service::builder("svc")
        .task(TaskDescriptor::new("Restarter", move || Restarter {
            generation: b.fetch_add(1, Ordering::SeqCst) + 1,
            configs: c.clone(),
            service: None,
        }))
        .build()
        .unwrap();

    let mut events = service.subscribe();
    let outcome = service.run(config()).await.unwrap();

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(built.load(Ordering::SeqCst), 2);
    let configs = configs.lock().clone();
    assert_eq!(configs.len(), 2);
    assert_eq!(configs[0], configs[1]);

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::RestartRequested).count(),
        1
    );
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::ServiceStopped).count(),
        2
    );
}

#[tokio::test]
async fn test_empty_selection_lists_without_instantiating() {
    let built = Arc::new(AtomicUsize::new(0));
    let b = built.clone();
    let service = Service::builder("svc")
        .task(TaskDescriptor::new("Web", move || {
            b.fetch_add(1, Ordering::SeqCst);
            Skipper
        })
        .depends_on("Db"))
        .task(TaskDescriptor::new("Db", || Skipper))
        .build()
        .unwrap();

    let outcome = service
        .run(config().with_tasks(Vec::<String>::new()))
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Listed(vec!["Db".into(), "Web".into()]));
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_selection_ignores_unknown_names() {
    let journal = Journal::default();
    let service = Service::builder("svc")
        .task(recorder("A", &journal))
        .task(recorder("B", &journal))
        .build()
        .unwrap();

    let instance = ready(&service, config().with_tasks(["B", "Nope"])).await;
    assert_eq!(instance.names(), vec!["B"]);
    assert_eq!(journal.entries(), vec!["init:B"]);
    instance.shutdown().await;
}

#[tokio::test]
async fn test_lookup_by_name_and_kind() {
    let journal = Journal::default();
    let service = Service::builder("svc")
        .task(recorder("A", &journal).loopless())
        .build()
        .unwrap();

    let instance = ready(&service, config()).await;
    assert!(instance.get("A").is_ok());
    assert!(instance.require::<Recorder>().is_ok());
    assert!(matches!(
        instance.get("Z"),
        Err(RuntimeError::TaskNotFound { name }) if name == "Z"
    ));
    assert!(matches!(
        instance.require::<Broken>(),
        Err(RuntimeError::TaskNotFound { .. })
    ));

    let handle = instance.handle();
    assert!(handle.get("A").is_ok());
    drop(instance);
    assert!(!handle.is_alive());
    assert!(handle.get("A").is_err());
}

#[tokio::test]
async fn test_interval_option_overrides_declared_interval() {
    let steps = Arc::new(AtomicUsize::new(0));
    let counter = steps.clone();
    let ticker = TaskDescriptor::from_fn("Ticker", move |_token: CancellationToken| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
    .with_interval(Duration::from_secs(3600));

    let service = Service::builder("svc").task(ticker).build().unwrap();
    let cfg = service
        .default_config()
        .with_signals(false)
        .with_option("ticker_interval", 0.01);

    let bg = service.start_background(cfg).await.unwrap();
    assert_eq!(bg.instance().state_of("Ticker"), Some(TaskState::Running));
    tokio::time::sleep(Duration::from_millis(300)).await;
    bg.stop().await;

    assert!(steps.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_out_of_range_interval_option_keeps_declared_interval() {
    let ticker = TaskDescriptor::from_fn("Ticker", |_token: CancellationToken| async { Ok(()) })
        .with_interval(Duration::from_secs(3600));
    let service = Service::builder("svc").task(ticker).build().unwrap();
    let cfg = config().with_option("ticker_interval", 1e30);

    let instance = ready(&service, cfg).await;
    assert_eq!(instance.names(), vec!["Ticker"]);
    instance.shutdown().await;
}

#[tokio::test]
async fn test_background_service_stops_when_task_requests_it() {
    let service = Service::builder("svc")
        .task(TaskDescriptor::new("Restarter", || Restarter {
            generation: 2,
            configs: Arc::default(),
            service: None,
        }))
        .build()
        .unwrap();

    let bg = service.start_background(config()).await.unwrap();
    let instance = bg.instance().clone();
    tokio::time::timeout(Duration::from_secs(5), bg.wait())
        .await
        .unwrap();

    assert!(instance.stop_requested());
    assert!(instance.is_terminated());
}

#[tokio::test]
async fn test_background_rejects_empty_selection() {
    let service = Service::builder("svc")
        .task(TaskDescriptor::new("Idle", || Skipper))
        .build()
        .unwrap();

    let err = service
        .start_background(config().with_tasks(Vec::<String>::new()))
        .await
        .unwrap_err();
    assert_eq!(err.as_label(), "runtime_config");
}

#[test]
fn test_build_rejects_cycles_and_missing_dependencies() {
    let cycle = Service::builder("svc")
        .task(TaskDescriptor::new("A", || Skipper).depends_on("B"))
        .task(TaskDescriptor::new("B", || Skipper).depends_on("A"))
        .build()
        .unwrap_err();
    assert!(matches!(cycle, DeclarationError::DependencyCycle { .. }));

    let missing = Service::builder("svc")
        .task(TaskDescriptor::new("A", || Skipper).depends_on("Ghost"))
        .build()
        .unwrap_err();
    assert_eq!(
        missing,
        DeclarationError::MissingDependency {
            task: "A".into(),
            missing: "Ghost".into(),
        }
    );
}

#[test]
fn test_build_rejects_options_sharing_a_flag() {
    let err = Service::builder("svc")
        .task(TaskDescriptor::new("A", || Skipper).with_option(OptionSpec::new("b-c", 1)))
        .task(TaskDescriptor::new("A_b", || Skipper).with_option(OptionSpec::new("c", 2)))
        .build()
        .unwrap_err();
    assert!(matches!(err, DeclarationError::DuplicateOption { ref key, .. } if key == "a_b_c"));
}

#[tokio::test]
async fn test_install_without_installer_is_config_error() {
    let service = Service::builder("svc")
        .task(TaskDescriptor::new("Idle", || Skipper))
        .build()
        .unwrap();

    let mut cfg = config();
    cfg.install = true;
    let err = service.run(cfg).await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_config");
}
