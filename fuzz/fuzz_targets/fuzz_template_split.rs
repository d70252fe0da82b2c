#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use tmplui_runtime::template::parse::{Segment, parse_callback_call, parse_evaluator_call, split_template};
use tmplui_runtime::{Context, Executor, FunctionRegistry};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut rebuilt = String::with_capacity(text.len());
    for segment in split_template(text) {
        match segment {
            Segment::Literal(lit) => rebuilt.push_str(&lit),
            Segment::Expr(expr) => {
                rebuilt.push_str("{{");
                rebuilt.push_str(expr);
                rebuilt.push_str("}}");
            }
        }
    }
    assert_eq!(rebuilt, text);

    let _ = parse_callback_call(text);
    let _ = parse_evaluator_call(text);

    let exec = Executor::new(Arc::new(Context::new()), Arc::new(FunctionRegistry::new()));
    let _ = exec.evaluate_to_string(text);
    let _ = exec.prepare(text);
    let _ = exec.extract_referenced_keys(text);
});
