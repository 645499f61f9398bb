//! Client channels.
//!
//! Channels open implicitly: the first operation on an unopened channel
//! triggers the open, and concurrent first operations share it.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use implicit_open::channel::ChannelFactory;
//!
//! # async fn example() -> implicit_open::Result<()> {
//! let factory = ChannelFactory::builder()
//!     .endpoint("ws://127.0.0.1:8080/echo")
//!     .send_timeout(Duration::from_secs(20))
//!     .build()?;
//!
//! let channel = factory.create_channel();
//! let reply = channel.echo("hello").await?;
//! assert_eq!(reply, "hello");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `factory` | Endpoint-bound channel factory and builder |
//! | `options` | Timeouts and HTTP settings |
//! | `service` | Channel with implicit open |

// ============================================================================
// Submodules
// ============================================================================

/// Channel factory.
pub mod factory;

/// Channel options.
pub mod options;

/// Service channel.
pub mod service;

// ============================================================================
// Re-exports
// ============================================================================

pub use factory::{ChannelFactory, ChannelFactoryBuilder};
pub use options::{ChannelOptions, DEFAULT_OPEN_TIMEOUT, DEFAULT_SEND_TIMEOUT};
pub use service::ServiceChannel;
