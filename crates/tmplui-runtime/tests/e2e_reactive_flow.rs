//! E2E integration test: a small screen wired the way an embedding would wire
//! it. A registry with custom actions, bound text views, a form, global key
//! bindings, a clock worker using deferred writes, and a reconciler posting
//! passes to a UI loop running on its own thread.

#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tmplui_core::cx::Cx;
use tmplui_core::event::{KeyEvent, Modifiers};
use tmplui_runtime::{
    ActionHandler, Context, Executor, FunctionRegistry, Host, KeyBinding, KeyDispatch,
    QueueError, Reconciler, RuntimeConfig, StateValue, TemplateError, ValidationError,
    dispatch_key, update_queue,
};

#[derive(Default)]
struct TestHost {
    log: Mutex<Vec<String>>,
}

impl TestHost {
    fn entries(&self) -> Vec<String> {
        self.log.lock().expect("host log").clone()
    }
}

impl Host for TestHost {
    fn switch_to_page(&self, name: &str) {
        self.log.lock().expect("host log").push(format!("page:{name}"));
    }

    fn remove_page(&self, name: &str) {
        self.log.lock().expect("host log").push(format!("remove:{name}"));
    }

    fn stop(&self) {
        self.log.lock().expect("host log").push("stop".into());
    }

    fn show_modal(&self, text: &str, buttons: &[String]) {
        self.log
            .lock()
            .expect("host log")
            .push(format!("modal:{text}:{}", buttons.join(",")));
    }
}

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

fn app_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry
        .register_action(
            "increment",
            1,
            Some(1),
            Some(Arc::new(|_: &Context, args: &[String]| {
                if args[0].is_empty() {
                    Err(ValidationError::new("counter key must not be empty"))
                } else {
                    Ok(())
                }
            })),
            ActionHandler::unary(|ctx, key| {
                let next = ctx.get_state(key).and_then(|v| v.as_int()).unwrap_or(0) + 1;
                ctx.set_direct(key, next);
            }),
        )
        .expect("register increment");
    registry
        .register_action(
            "submitForm",
            1,
            Some(1),
            None,
            ActionHandler::unary(|ctx, form| {
                ctx.run_form_submit(form);
            }),
        )
        .expect("register submitForm");
    registry
        .register_evaluator("upper", 1, 1, |ctx, args| {
            ctx.get_state(&args[0])
                .map(|v| v.to_string().to_uppercase())
                .unwrap_or_default()
        })
        .expect("register upper");
    registry
}

#[test]
fn e2e_screen_lifecycle() {
    let config = RuntimeConfig::default().with_reconcile_interval(Duration::from_millis(5));
    let (tx, rx) = update_queue(config.update_queue_capacity);
    let host = Arc::new(TestHost::default());
    let ctx = Arc::new(
        Context::new()
            .with_update_queue(tx.clone())
            .with_host(Arc::clone(&host) as Arc<dyn Host>),
    );
    let registry = Arc::new(app_registry());
    ctx.attach_registry(Arc::clone(&registry));
    let exec = Executor::new(Arc::clone(&ctx), registry);

    // --- Build the screen ---
    let status = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&status);
    let initial = exec
        .bind_text(
            "{{ upper user }} clicks={{ bindState clicks }} {{ bindState notification }}",
            move |text| *sink.lock().expect("status") = text.to_string(),
        )
        .expect("bind status line");
    assert_eq!(initial, " clicks= ");

    let clock = Arc::new(Mutex::new(Vec::new()));
    let clock_sink = Arc::clone(&clock);
    ctx.on_change("clock", move |value| {
        clock_sink.lock().expect("clock").push(value.clone());
    });

    let click = exec
        .execute_callback(r#"{{ increment "clicks" }}"#)
        .expect("click handler");
    assert!(matches!(
        exec.execute_callback(r#"{{ increment "" }}"#).err(),
        Some(TemplateError::Validation { .. })
    ));

    let submitted = Arc::new(Mutex::new(0));
    let submitted_sink = Arc::clone(&submitted);
    ctx.register_form_submit(
        "login",
        Arc::new(move || {
            *submitted_sink.lock().expect("submitted") += 1;
        }),
    );

    let bindings = vec![
        KeyBinding::new("Ctrl+S", r#"{{ submitForm "login" }}"#),
        KeyBinding::new("F2", r#"{{ switchToPage "settings" }}"#),
        KeyBinding::new("Escape", "{{ stopApp }}"),
    ];

    // --- Start the UI loop and reconciler ---
    let (ui_cx, ui_ctrl) = Cx::background();
    let ui = thread::spawn(move || rx.run_until(&ui_cx));
    let mut reconciler =
        Reconciler::spawn(Arc::clone(&ctx), tx.clone(), &config).expect("spawn reconciler");

    // --- Clock worker writes through the UI queue ---
    let (clock_cx, clock_ctrl) = Cx::background();
    let worker_ctx = Arc::clone(&ctx);
    let worker = thread::spawn(move || {
        let mut ticks = 0;
        while ticks < 3 && clock_cx.sleep(Duration::from_millis(3)) {
            ticks += 1;
            worker_ctx
                .set_deferred("clock", format!("00:0{ticks}"))
                .expect("deferred clock write");
        }
        ticks
    });

    // --- Interact. Callbacks run here, standing in for UI event handlers. ---
    ctx.set_direct("user", "ada");
    click();
    click();
    assert!(ctx.run_callback(r#"{{ showNotification "saved" }}"#));

    wait_until("status line", || {
        status.lock().expect("status").as_str() == "ADA clicks=2 saved"
    });

    assert_eq!(worker.join().expect("clock worker"), 3);
    clock_ctrl.cancel();
    wait_until("clock subscriber", || {
        clock.lock().expect("clock").last() == Some(&StateValue::from("00:03"))
    });

    let ctrl_s = KeyEvent::char('\u{13}').with_modifiers(Modifiers::CTRL);
    assert_eq!(
        dispatch_key(&ctrl_s, &bindings, &exec),
        KeyDispatch::Handled { index: 0 }
    );
    assert_eq!(*submitted.lock().expect("submitted"), 1);
    assert_eq!(
        dispatch_key(&KeyEvent::new(tmplui_core::event::KeyCode::F(2)), &bindings, &exec),
        KeyDispatch::Handled { index: 1 }
    );
    assert_eq!(
        dispatch_key(&KeyEvent::char('x'), &bindings, &exec),
        KeyDispatch::Ignored
    );

    // --- Shutdown ---
    reconciler.stop();
    reconciler.stop();
    ui_ctrl.cancel();
    ui_ctrl.cancel();
    ui.join().expect("ui loop");

    assert_eq!(host.entries(), vec!["page:settings".to_string()]);
    assert_eq!(ctx.get_state("clicks"), Some(StateValue::Int(2)));
    let clock_values = clock.lock().expect("clock").clone();
    assert!(!clock_values.is_empty() && clock_values.len() <= 3);
}

#[test]
fn e2e_deferred_write_inside_ui_callback_is_refused() {
    let (tx, rx) = update_queue(4);
    let ctx = Arc::new(Context::new().with_update_queue(tx.clone()));
    let outcome = Arc::new(Mutex::new(None));

    let job_ctx = Arc::clone(&ctx);
    let job_outcome = Arc::clone(&outcome);
    tx.post(Box::new(move || {
        // Running on the UI thread: a synchronous write would never complete.
        *job_outcome.lock().expect("outcome") = Some(job_ctx.set_deferred("k", "v"));
        job_ctx.set_direct("k", "direct");
    }))
    .expect("post");

    assert_eq!(rx.run_pending(), 1);
    assert_eq!(
        *outcome.lock().expect("outcome"),
        Some(Err(QueueError::WouldDeadlock))
    );
    assert_eq!(ctx.get_state("k"), Some(StateValue::from("direct")));
}

#[test]
fn e2e_broken_view_does_not_block_other_keys() {
    let ctx = Arc::new(Context::new());
    let mut registry = FunctionRegistry::new();
    registry
        .register_evaluator("fragile", 1, 1, |ctx, args| {
            let value = ctx.get_state(&args[0]).map(|v| v.to_string()).unwrap_or_default();
            assert!(value != "boom", "fragile evaluator exploded");
            value
        })
        .expect("register fragile");
    let exec = Executor::new(Arc::clone(&ctx), Arc::new(registry));

    let good = Arc::new(Mutex::new(Vec::new()));
    let good_sink = Arc::clone(&good);
    exec.bind_text("{{ bindState a }}{{ fragile a }}", |_| {})
        .expect("bind a");
    exec.bind_text("{{ bindState b }}", move |text| {
        good_sink.lock().expect("good").push(text.to_string());
    })
    .expect("bind b");

    ctx.set_direct("a", "boom");
    ctx.set_direct("b", "fine");
    let report = ctx.reconcile();

    assert_eq!(report.keys, 2);
    assert_eq!(report.view_failures, 1);
    assert_eq!(*good.lock().expect("good"), vec!["fine"]);
}
