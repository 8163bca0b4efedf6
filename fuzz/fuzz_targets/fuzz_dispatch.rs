#![no_main]

use libfuzzer_sys::fuzz_target;
use tictactoe_client::codec;
use tictactoe_client::dispatcher::dispatch;
use tictactoe_client::{Phase, RoomDirectory, SessionState};

// Newline-separated frames are fed to one session; a `tick` line feeds a
// countdown tick with the current generation.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut state = SessionState::default();
    let mut directory = RoomDirectory::new();
    let _ = state.connection_opened();

    for line in text.lines() {
        if line == "tick" {
            state.tick(state.generation());
        } else if let Ok(message) = codec::decode(line) {
            dispatch(&mut state, &mut directory, message);
        }
        assert!(!state.can_move() || state.phase() == Phase::Playing);
        assert_eq!(state.countdown().is_some(), state.phase() == Phase::CountingDown);
        assert_eq!(state.room_id().is_some(), state.phase().in_room());
    }
});
