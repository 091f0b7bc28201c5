//! Form screenlet: load a structure, load and submit records, upload
//! document fields.

mod delegate;
pub mod interactors;
pub mod model;
mod screenlet;
pub mod upload;

pub use delegate::FormScreenletDelegate;
pub use interactors::{
    LoadFormInteractor, LoadRecordInteractor, SubmitFormInteractor, UploadDocumentInteractor,
};
pub use model::{
    DocumentField, DocumentUploadStatus, Field, FieldKind, LocalFile, OptionsField, Record,
    SelectOption,
};
pub use screenlet::{FormInteractor, FormMessage, FormScreenlet, FormSettings};
pub use upload::{UploadFailurePolicy, UploadIntent, UploadStatus};

pub const LOAD_FORM_ACTION: &str = "load-form";
pub const LOAD_RECORD_ACTION: &str = "load-record";
pub const SUBMIT_FORM_ACTION: &str = "submit-form";
pub const UPLOAD_DOCUMENT_ACTION: &str = "upload-document";
