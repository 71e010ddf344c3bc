// SPDX-License-Identifier: MIT

//! External service adapters
//!
//! Narrow interfaces to the text generation and web search services the
//! workflow depends on, plus the tool abstraction that lets the generator
//! request a search mid-conversation. Each adapter is mockable in
//! isolation; the workflow only ever sees the traits.

pub mod generator;
pub mod search;
pub mod tool;

pub use generator::{GroqGenerator, Message, Role, TextGenerator, ToolCall};
pub use search::{SearchProvider, SearchResult, TavilySearch};
pub use tool::{Tool, WebSearchTool};
