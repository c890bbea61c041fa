//! Periodic HTTP/HTTPS checks.
//!
//! This crate holds the check data model and the pieces every probe goes
//! through:
//! - [`CheckStore`]: the authoritative, copy-on-read check table with
//!   snapshot persistence and a hard capacity limit
//! - [`ProbeRun`]: single-outcome arbitration between the response, timeout
//!   and transport error of one probe
//! - [`Transport`]: the outbound request seam, with [`HttpTransport`] for
//!   plain and TLS targets
//!
//! # Example
//!
//! ```no_run
//! use checks::{Check, CheckId, CheckMethod, CheckStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CheckStore::new();
//! store.load(".data/checks.json").await?;
//!
//! let id = CheckId::generate();
//! store.insert(id.clone(), Check::new("https://example.com", CheckMethod::Get, None))?;
//! store.snapshot(".data/checks.json").await?;
//!
//! let check = store.get(&id);
//! # Ok(())
//! # }
//! ```

pub mod id;
pub mod probe;
pub mod store;
pub mod transport;
pub mod types;

pub use id::{CheckId, ID_LEN, InvalidId, is_valid_id};
pub use probe::{DEFAULT_PROBE_TIMEOUT, ProbeEvent, ProbeRequest, ProbeRun};
pub use store::{CheckMap, CheckStore, LoadReport, MAX_CHECKS};
pub use transport::{HttpTransport, ProbeResponse, Transport};
pub use types::{Check, CheckMethod, Payload, now_millis};
