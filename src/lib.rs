//! Client-side BI beacons
//!
//! Register event and error descriptors on a [`Context`], then emit them with
//! field values. Each emission is validated against its descriptor and sent
//! as a one-way GET:
//!
//! ```text
//! <base>/<endpoint>?evid=<id>&field=value...
//! <base>/<endpoint>?errc=<code>&sev=<level>&field=value...
//! ```
//!
//! ```no_run
//! use beacon::{Descriptor, FieldType, Options};
//! use serde_json::json;
//!
//! let mut ctx = beacon::init("http://bi.example.com/", Options::default());
//! let login = Descriptor::event("login")
//!     .with_endpoint("/app")
//!     .with_field("user", FieldType::String)
//!     .shared();
//! ctx.register_events([&login])?;
//! ctx.event(&login, json!({"user": "ada"}).as_object())?;
//! # Ok::<(), beacon::BiError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod encode;
pub mod error;
pub mod registry;
pub mod transport;
pub mod url;
pub mod validate;

pub use catalog::Catalog;
pub use config::Options;
pub use descriptor::{Descriptor, FieldType, Kind, Severity, SeverityValue};
pub use dispatch::Context;
pub use error::{BiError, Result};
pub use transport::{HttpSender, LogSender, RecordingSender, Sender, StdoutSender};
pub use url::Fields;

/// Create a context for one collection service
pub fn init(base: impl Into<String>, options: Options) -> Context {
    Context::new(base, options)
}
