//! LoopShare Core Library
//!
//! This crate provides the core functionality for the LoopShare playlist manager:
//! - Resolving pasted video links into embed and thumbnail URLs
//! - Playlist state with current-playlist and current-video selection
//! - Persistence, authentication and billing collaborators behind traits

pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod store;

pub use auth::{Session, StaticSession};
pub use billing::{BillingClient, HttpBillingClient, Plan, PortalAction};
pub use config::AppConfig;
pub use error::{Error, ErrorKind, Result};
pub use events::StoreEvent;
pub use models::{Playlist, PlaylistSummary, User, Video};
pub use repository::{FileRepository, MemoryRepository, PlaylistRepository, RestRepository};
pub use resolver::{ResolvedVideo, ThumbnailQuality};
pub use store::PlaylistStore;
