#![no_main]

use libfuzzer_sys::fuzz_target;
use tmplui_core::event::{KeyEvent, Modifiers};
use tmplui_core::keys::parse_key;
use tmplui_runtime::keybinding::{KeyBinding, matches};

fuzz_target!(|input: (String, char, u8)| {
    let (desc, ch, mods) = input;
    if let Ok(spec) = parse_key(&desc) {
        // Only the four nameable modifiers can come out of a description.
        assert!(spec.modifiers.bits() & !Modifiers::TRACKED.bits() == 0);
    }
    let event = KeyEvent::char(ch).with_modifiers(Modifiers::from_bits_truncate(mods));
    let _ = matches(&event, &KeyBinding::new(desc, ""));
});
