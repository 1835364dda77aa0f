//! Canonical records shared by ingestion, storage and matching.

mod attachment;
mod company;
mod compliance;
mod geo;
mod matches;
mod tender;

pub use attachment::{ATTACHMENT_EXTENSIONS, TenderAttachment};
pub(crate) use attachment::mime_for_extension;
pub use company::{Company, CompanyAddress, DEFAULT_COUNTRY, DEFAULT_SERVICE_RADIUS_KM};
pub use compliance::ComplianceCheck;
pub use geo::GeoPoint;
pub use matches::{Match, MatchSignals, MatchStatus, TenderSummary};
pub use tender::{ProcessingStatus, SourceKind, Tender, TenderLocation, append_unique};
