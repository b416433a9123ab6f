//! Yunform State Management
//!
//! Persists what yunform knows about deployed resources between runs and
//! guards it with a lock so two runs cannot modify it at once.
//!
//! - **StateFile**: every managed resource with its cloud-side identifier
//! - **StateBackend**: storage for the state file and its lock
//! - **LockInfo**: who holds the lock, and until when
//!
//! # Example
//!
//! ```ignore
//! use yunform_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local())?;
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! // ... apply changes ...
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
