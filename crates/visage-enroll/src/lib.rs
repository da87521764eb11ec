//! Registration and recognition workflows for visage.
//!
//! Sits between a face encoder and the identity store: validates and
//! registers candidate encodings under a name, and recognizes the faces
//! in an image against everything stored.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod encoder;
pub mod error;
pub mod recognition;
pub mod registration;

pub use config::Config;
pub use encoder::{
    discover_inputs, EncodeError, FaceDetection, FaceEncoder, FaceRegion, ImageInput, JsonEncoder,
};
pub use error::{EnrollError, EnrollResult};
pub use recognition::{RecognitionReport, RecognizedFace, Recognizer};
pub use registration::{
    ImageBatchSummary, Registrar, Registration, RegistrationAction, RegistrationPolicy,
    RegistrationState,
};
