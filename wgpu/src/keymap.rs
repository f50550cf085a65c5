use winit::keyboard::KeyCode;

/// Label of the physical key, as understood by `chip8::Layout`. Only the
/// 4x4 block from `1` to `V` is mapped.
pub fn label(code: KeyCode) -> Option<char> {
    let label = match code {
        KeyCode::Digit1 => '1',
        KeyCode::Digit2 => '2',
        KeyCode::Digit3 => '3',
        KeyCode::Digit4 => '4',
        KeyCode::KeyQ => 'q',
        KeyCode::KeyW => 'w',
        KeyCode::KeyE => 'e',
        KeyCode::KeyR => 'r',
        KeyCode::KeyA => 'a',
        KeyCode::KeyS => 's',
        KeyCode::KeyD => 'd',
        KeyCode::KeyF => 'f',
        KeyCode::KeyZ => 'z',
        KeyCode::KeyX => 'x',
        KeyCode::KeyC => 'c',
        KeyCode::KeyV => 'v',
        _ => return None,
    };
    Some(label)
}
