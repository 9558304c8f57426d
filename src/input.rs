// ============================================================================
// input.rs — GpuFlock
// Held-key tracking for continuous camera movement.
// ============================================================================

/// Camera keys currently held down.
#[derive(Default)]
pub struct KeysHeld {
    pub orbit_up: bool,
    pub orbit_down: bool,
    pub orbit_left: bool,
    pub orbit_right: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
}

impl KeysHeld {
    /// Record a press/release of a camera key. Returns false for other keys.
    pub fn set(&mut self, key: &str, pressed: bool) -> bool {
        let slot = match key.to_ascii_lowercase().as_str() {
            "w" => &mut self.orbit_up,
            "s" => &mut self.orbit_down,
            "a" => &mut self.orbit_left,
            "d" => &mut self.orbit_right,
            "e" => &mut self.zoom_in,
            "q" => &mut self.zoom_out,
            _ => return false,
        };
        *slot = pressed;
        true
    }
}
