#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tmplui_runtime::{Context, Executor, FunctionRegistry};

#[derive(Arbitrary, Debug)]
enum Piece {
    Text(String),
    Open,
    Close,
    Quote,
    Backslash,
    Space,
    Newline,
    Call { name: u8, args: Vec<String> },
}

const NAMES: [&str; 6] = ["bindState", "showNotification", "noop", "showSimpleModal", "stopApp", "x"];

impl Piece {
    fn render(&self, out: &mut String) {
        match self {
            Piece::Text(s) => out.push_str(s),
            Piece::Open => out.push_str("{{"),
            Piece::Close => out.push_str("}}"),
            Piece::Quote => out.push('"'),
            Piece::Backslash => out.push('\\'),
            Piece::Space => out.push(' '),
            Piece::Newline => out.push('\n'),
            Piece::Call { name, args } => {
                out.push_str("{{ ");
                out.push_str(NAMES[usize::from(*name) % NAMES.len()]);
                for arg in args.iter().take(8) {
                    out.push_str(" \"");
                    out.push_str(arg);
                    out.push('"');
                }
                out.push_str(" }}");
            }
        }
    }
}

fuzz_target!(|input: (Vec<Piece>, Vec<(String, String)>)| {
    let (pieces, state) = input;
    let mut text = String::new();
    for piece in &pieces {
        if text.len() > 4096 {
            break;
        }
        piece.render(&mut text);
    }

    let ctx = Arc::new(Context::new());
    for (key, value) in state.into_iter().take(16) {
        ctx.set_direct(key, value);
    }
    let exec = Executor::new(Arc::clone(&ctx), Arc::new(FunctionRegistry::new()));

    let _ = exec.evaluate_to_string(&text);
    if let Ok(callback) = exec.execute_callback(&text) {
        callback();
    }
    let keys = exec.extract_referenced_keys(&text);
    let mut seen = std::collections::HashSet::new();
    for key in &keys {
        assert!(seen.insert(key), "duplicate referenced key {key:?}");
    }
    if exec.bind_text(&text, |_| {}).is_ok() {
        ctx.reconcile();
    }
});
