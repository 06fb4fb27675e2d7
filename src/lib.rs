#![warn(missing_docs)]
//! Библиотека для загрузки отчётов о продажах iTunes Connect (Reporter API)
//! и их агрегации по валютам.

mod cache;
mod capability;
mod date;
mod decode;
mod error;
pub mod parser;
mod query;
mod raw;
mod report;
mod response;
pub mod settings;
mod transport;
mod types;
mod utils;

pub use crate::cache::{Artifact, ReportCache, ReportIdentity};
pub use crate::capability::{capabilities, validate, CapabilityTable, GranularityFormats};
pub use crate::date::{resolve, resolve_at, week_ending_sunday, DateFormat, ResolvedDate};
pub use crate::decode::decompress;
pub use crate::error::{Outcome, ReportError};
pub use crate::parser::{aggregate, SalesRow};
pub use crate::query::{build_payload, Query, FINANCE_ENDPOINT, FORM_FIELD, SALES_ENDPOINT};
pub use crate::raw::{split_header_blocks, HeaderBlock, RawResponse};
pub use crate::report::{Reporter, ReporterBuilder, ReporterConfig};
pub use crate::response::{interpret, ResponseOutcome};
pub use crate::transport::{HttpTransport, Transport};
pub use crate::types::*;
