//! Intents for upload tracking.

use crate::error::ScreenletError;
use crate::mvi::Intent;

#[derive(Debug)]
pub enum UploadIntent {
    /// An upload operation was accepted and started.
    Started,

    /// An upload finished successfully.
    Succeeded,

    /// An upload failed.
    Failed { error: ScreenletError },

    /// Submit was requested while uploads are running.
    SubmitRequested,
}

impl Intent for UploadIntent {}
