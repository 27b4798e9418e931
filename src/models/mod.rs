pub mod case;
pub mod enums;
pub mod fields;

pub use case::{Case, DocumentRef};
pub use enums::{CaseStatus, DocumentKind};
pub use fields::ExtractedFields;
