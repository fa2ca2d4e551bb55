//! sessionlens-core: normalize AI coding assistant session logs
//!
//! Discovers, parses, and aggregates session logs written by Claude Code and
//! Copilot CLI into one canonical session model. Both log formats are
//! append-only JSONL that may end mid-line while a session is live, so all
//! decoding is line-resilient: bad lines are skipped, bad files become "no
//! session", and the caller always gets either a complete parsed session or
//! nothing.
//!
//! # Architecture
//!
//! ```text
//! config ──> directory ──> parsers (claude / copilot) ──> cache ──> export
//!                              │                            ▲
//!                              └── decode + stats           │
//!                                        watch events ──────┘
//! ```
//!
//! - [`config`]: TOML configuration from the XDG config directory
//! - [`directory`]: maps configured base paths to session files
//! - [`parsers`]: per-source normalization into [`types::SessionDetail`]
//! - [`cache`]: parsed-session cache keyed by `(source, session id)`
//! - [`watch`]: classifies file-change events and applies them to the cache
//! - [`export`]: CSV and JSON rendering of parsed sessions

pub mod cache;
pub mod config;
pub mod decode;
pub mod directory;
pub mod error;
pub mod export;
pub mod logging;
pub mod parsers;
pub mod stats;
pub mod types;
pub mod watch;

pub use cache::{MessagePage, SessionCache};
pub use config::Config;
pub use directory::SessionDirectory;
pub use error::{Error, Result};
pub use parsers::{
    create_all_parsers, parse_session_file, parser_for, session_summary, SessionParser,
};
pub use types::{
    Message, MessageRole, SessionDetail, SessionSource, SessionStats, SessionSummary, TokenStats,
    TokenUsage, ToolCall, ToolResult, ToolUsageSummary,
};
pub use watch::{WatchEvent, WatchEventKind};
