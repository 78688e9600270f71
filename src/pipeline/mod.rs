pub mod annotation; // Extraction → correction → JSONL
pub mod oracle; // LLM backends and retry
