use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEventKind {
    KeyDown,
    KeyUp,
    TouchStart,
    TouchEnd,
    /// On-screen or test-harness jump button.
    ButtonDown,
    ButtonUp,
}

impl RawEventKind {
    pub fn is_press(self) -> bool {
        matches!(self, Self::KeyDown | Self::TouchStart | Self::ButtonDown)
    }

    pub fn is_pointer(self) -> bool {
        !matches!(self, Self::KeyDown | Self::KeyUp)
    }
}

/// A platform input event as delivered, before any normalization. Every field
/// other than `kind` may be missing depending on the engine that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInputEvent {
    pub kind: RawEventKind,
    /// Physical key code (`"Space"`, `"KeyW"`) or pointer id (`"touch:0"`).
    pub code: Option<String>,
    /// Layout-dependent key value (`" "`, `"Spacebar"`, `"w"`).
    pub key: Option<String>,
    /// Legacy numeric key code.
    pub key_code: Option<u32>,
    /// OS auto-repeat flag, when the platform reports one.
    pub repeat: Option<bool>,
    pub timestamp_ms: Option<f64>,
    pub target_has_focus: Option<bool>,
    pub synthetic: bool,
}

impl RawInputEvent {
    pub fn new(kind: RawEventKind) -> Self {
        Self {
            kind,
            code: None,
            key: None,
            key_code: None,
            repeat: None,
            timestamp_ms: None,
            target_has_focus: None,
            synthetic: false,
        }
    }

    pub fn key_down(code: &str) -> Self {
        Self::new(RawEventKind::KeyDown).with_code(code)
    }

    pub fn key_up(code: &str) -> Self {
        Self::new(RawEventKind::KeyUp).with_code(code)
    }

    pub fn touch_start(pointer_id: u64) -> Self {
        Self::new(RawEventKind::TouchStart).with_code(&format!("touch:{pointer_id}"))
    }

    pub fn touch_end(pointer_id: u64) -> Self {
        Self::new(RawEventKind::TouchEnd).with_code(&format!("touch:{pointer_id}"))
    }

    pub fn button_down(name: &str) -> Self {
        Self::new(RawEventKind::ButtonDown).with_code(&format!("button:{name}"))
    }

    pub fn button_up(name: &str) -> Self {
        Self::new(RawEventKind::ButtonUp).with_code(&format!("button:{name}"))
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn without_code(mut self) -> Self {
        self.code = None;
        self
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_key_code(mut self, key_code: u32) -> Self {
        self.key_code = Some(key_code);
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn at(mut self, timestamp_ms: f64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn with_focus(mut self, has_focus: bool) -> Self {
        self.target_has_focus = Some(has_focus);
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }
}
