// Adapters layer: concrete implementations for external systems (language model over http).

pub mod ollama;
