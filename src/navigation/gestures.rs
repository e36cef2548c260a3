/// User gestures the viewer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Next,
    Prev,
    Close,
    ToggleFullscreen,
}

impl Gesture {
    /// Map a key name, as reported by the host, to a gesture.
    pub fn from_key(key: &str) -> Option<Gesture> {
        match key {
            "ArrowRight" | "Right" | "l" => Some(Gesture::Next),
            "ArrowLeft" | "Left" | "h" => Some(Gesture::Prev),
            "Escape" | "Esc" => Some(Gesture::Close),
            "f" | "F" => Some(Gesture::ToggleFullscreen),
            _ => None,
        }
    }
}
