#![forbid(unsafe_code)]

//! Actions and evaluators every [`FunctionRegistry::new`] starts with.
//!
//! | name               | kind      | args   | effect                                  |
//! |--------------------|-----------|--------|-----------------------------------------|
//! | `bindState`        | evaluator | 1      | stored value as text, `""` if absent    |
//! | `showNotification` | action    | 1      | direct write of state `notification`    |
//! | `switchToPage`     | action    | 1      | [`Host::switch_to_page`]                |
//! | `removePage`       | action    | 1      | [`Host::remove_page`]                   |
//! | `stopApp`          | action    | 0      | [`Host::stop`]                          |
//! | `showSimpleModal`  | action    | 1..    | [`Host::show_modal`], default `OK`      |
//! | `noop`             | action    | 0      | nothing                                 |
//!
//! [`Host::switch_to_page`]: crate::Host::switch_to_page
//! [`Host::remove_page`]: crate::Host::remove_page
//! [`Host::stop`]: crate::Host::stop
//! [`Host::show_modal`]: crate::Host::show_modal

use super::executor::STATE_READ_EVALUATOR;
use super::registry::{ActionHandler, FunctionRegistry};
use crate::context::Context;
use crate::host::Host;

/// State key written by `showNotification`.
pub const NOTIFICATION_KEY: &str = "notification";

/// Button label used when `showSimpleModal` is given none.
pub const DEFAULT_MODAL_BUTTON: &str = "OK";

fn with_host(ctx: &Context, action: &str, f: impl FnOnce(&dyn Host)) {
    match ctx.host() {
        Some(host) => f(host.as_ref()),
        None => tracing::warn!(action, "no host attached; action ignored"),
    }
}

pub(crate) fn register_builtins(registry: &mut FunctionRegistry) {
    let results = [
        registry.register_evaluator(STATE_READ_EVALUATOR, 1, 1, |ctx, args| {
            ctx.get_state(&args[0])
                .map(|value| value.to_string())
                .unwrap_or_default()
        }),
        registry.register_action(
            "showNotification",
            1,
            Some(1),
            None,
            // Direct write: runs inside UI event handlers.
            ActionHandler::unary(|ctx, msg| ctx.set_direct(NOTIFICATION_KEY, msg)),
        ),
        registry.register_action(
            "switchToPage",
            1,
            Some(1),
            None,
            ActionHandler::unary(|ctx, page| {
                with_host(ctx, "switchToPage", |host| host.switch_to_page(page));
            }),
        ),
        registry.register_action(
            "removePage",
            1,
            Some(1),
            None,
            ActionHandler::unary(|ctx, page| {
                with_host(ctx, "removePage", |host| host.remove_page(page));
            }),
        ),
        registry.register_action(
            "stopApp",
            0,
            Some(0),
            None,
            ActionHandler::nullary(|ctx| with_host(ctx, "stopApp", |host| host.stop())),
        ),
        registry.register_action(
            "showSimpleModal",
            1,
            None,
            None,
            ActionHandler::variadic(|ctx, args| {
                let Some((text, buttons)) = args.split_first() else {
                    return;
                };
                with_host(ctx, "showSimpleModal", |host| {
                    if buttons.is_empty() {
                        host.show_modal(text, &[DEFAULT_MODAL_BUTTON.to_string()]);
                    } else {
                        host.show_modal(text, buttons);
                    }
                });
            }),
        ),
        registry.register_action("noop", 0, Some(0), None, ActionHandler::nullary(|_| {})),
    ];
    for result in results {
        if let Err(err) = result {
            // Only reachable when builtins are registered into a populated
            // registry.
            tracing::warn!(error = %err, "builtin registration skipped");
        }
    }
}
