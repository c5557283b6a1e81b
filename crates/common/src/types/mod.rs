use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
}

impl Health {
    pub fn ok() -> Self { Self { status: "ok" } }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub message: &'static str,
}

impl Default for Pong {
    fn default() -> Self { Self { message: "Pong!" } }
}
