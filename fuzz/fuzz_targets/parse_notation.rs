#![no_main]
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;
use ultimate::game::Position;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(position) = Position::try_from(input) else {
        return;
    };
    let serialized = position.to_string();
    assert_eq!(
        Position::try_from(serialized.as_str()).expect("serialized position should parse"),
        position
    );
});
