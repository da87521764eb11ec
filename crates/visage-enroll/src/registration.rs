//! Registration workflow: turn a named batch of candidate encodings (or
//! images) into a created or augmented identity.
//!
//! ```text
//! Start -> Validated -> Created | Augmented -> Done
//!    \________\______________________________-> Rejected
//! ```

use serde::Serialize;
use std::fmt;
use visage_core::{EncodingVector, IdentityStore, MutationOutcome, MAX_ENCODINGS_PER_IDENTITY};

use crate::config::{Config, DEFAULT_MAX_IMAGES_PER_REQUEST};
use crate::encoder::{FaceEncoder, ImageInput};
use crate::error::{EnrollError, EnrollResult};

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 50;

/// Limits applied before anything reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPolicy {
    /// Candidates beyond this many are dropped before the store is touched.
    pub max_candidates: usize,
    pub max_images: usize,
    pub min_name_len: usize,
    pub max_name_len: usize,
    pub expected_dimension: Option<usize>,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            max_candidates: MAX_ENCODINGS_PER_IDENTITY,
            max_images: DEFAULT_MAX_IMAGES_PER_REQUEST,
            min_name_len: MIN_NAME_LEN,
            max_name_len: MAX_NAME_LEN,
            expected_dimension: None,
        }
    }
}

impl RegistrationPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_images: config.max_images_per_request,
            expected_dimension: config.expected_dimension,
            ..Self::default()
        }
    }

    /// Check a requested identity name against the length bounds.
    ///
    /// # Errors
    /// Returns [`EnrollError::InvalidName`] for a blank, too short or too
    /// long name.
    pub fn check_name(&self, name: &str) -> EnrollResult<()> {
        let invalid = |reason: String| EnrollError::InvalidName {
            name: name.to_string(),
            reason,
        };

        if name.trim().is_empty() {
            return Err(invalid("must not be blank".to_string()));
        }
        let len = name.chars().count();
        if len < self.min_name_len {
            return Err(invalid(format!(
                "must be at least {} characters",
                self.min_name_len
            )));
        }
        if len > self.max_name_len {
            return Err(invalid(format!(
                "must be at most {} characters",
                self.max_name_len
            )));
        }
        Ok(())
    }

    fn is_valid(&self, raw: &[f64]) -> bool {
        let raw = raw.to_vec();
        match self.expected_dimension {
            Some(dimension) => EncodingVector::validate_with_dimension(raw, dimension).is_ok(),
            None => EncodingVector::validate(raw).is_ok(),
        }
    }
}

/// Where a registration currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationState {
    Start,
    Validated,
    Created,
    Augmented,
    Done,
    Rejected,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::Validated => "validated",
            Self::Created => "created",
            Self::Augmented => "augmented",
            Self::Done => "done",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Which store mutation a registration performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationAction {
    Created,
    Augmented,
}

/// What happened to the images of an image-based registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageBatchSummary {
    pub submitted: usize,

    /// Images that contributed a candidate.
    pub used: usize,

    /// Labels of images that could not be read or had no face.
    pub failed: Vec<String>,
}

/// A completed registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub action: RegistrationAction,
    pub outcome: MutationOutcome,

    /// Set by [`Registrar::register_images`].
    pub images: Option<ImageBatchSummary>,
}

/// Runs registrations against one store.
#[derive(Debug)]
pub struct Registrar<'a> {
    store: &'a mut IdentityStore,
    policy: RegistrationPolicy,
    state: RegistrationState,
}

impl<'a> Registrar<'a> {
    pub fn new(store: &'a mut IdentityStore) -> Self {
        Self::with_policy(store, RegistrationPolicy::default())
    }

    pub fn with_policy(store: &'a mut IdentityStore, policy: RegistrationPolicy) -> Self {
        Self {
            store,
            policy,
            state: RegistrationState::Start,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RegistrationPolicy {
        &self.policy
    }

    /// State reached by the most recent registration.
    #[must_use]
    pub const fn state(&self) -> RegistrationState {
        self.state
    }

    /// Register `candidates` under `name`.
    ///
    /// Creates the identity if the name is new, otherwise appends to it.
    /// At most `max_candidates` are considered; invalid ones are skipped
    /// and reported in the outcome.
    ///
    /// # Errors
    /// - [`EnrollError::InvalidName`] if the name breaks the policy
    /// - [`EnrollError::NoCandidates`] if no candidate is usable
    /// - `DuplicateName`, `CapacityReached` and persistence failures from
    ///   the store
    pub fn register(&mut self, name: &str, candidates: Vec<Vec<f64>>) -> EnrollResult<Registration> {
        self.state = RegistrationState::Start;
        let result = self.run(name, candidates);
        match &result {
            Ok(_) => self.enter(RegistrationState::Done),
            Err(e) => {
                log::debug!("Registration of '{}' rejected: {}", name, e);
                self.enter(RegistrationState::Rejected);
            }
        }
        result
    }

    /// Encode `images` and register the first face of each under `name`.
    ///
    /// Images that fail to encode or contain no face are counted and
    /// skipped. Encoding stops once `max_candidates` faces are collected.
    ///
    /// # Errors
    /// - [`EnrollError::TooManyImages`] if more than `max_images` are given
    /// - [`EnrollError::NoFacesFound`] if no image yields a face
    /// - anything [`Registrar::register`] returns
    pub fn register_images<E>(
        &mut self,
        name: &str,
        images: &[ImageInput],
        encoder: &E,
    ) -> EnrollResult<Registration>
    where
        E: FaceEncoder + ?Sized,
    {
        self.state = RegistrationState::Start;
        match self.collect_faces(name, images, encoder) {
            Ok((candidates, summary)) => {
                let mut registration = self.register(name, candidates)?;
                registration.images = Some(summary);
                Ok(registration)
            }
            Err(e) => {
                self.enter(RegistrationState::Rejected);
                Err(e)
            }
        }
    }

    fn collect_faces<E>(
        &self,
        name: &str,
        images: &[ImageInput],
        encoder: &E,
    ) -> EnrollResult<(Vec<Vec<f64>>, ImageBatchSummary)>
    where
        E: FaceEncoder + ?Sized,
    {
        self.policy.check_name(name)?;
        if images.len() > self.policy.max_images {
            return Err(EnrollError::TooManyImages {
                given: images.len(),
                max: self.policy.max_images,
            });
        }
        if images.is_empty() {
            return Err(EnrollError::NoCandidates { rejected: 0 });
        }

        let mut candidates = Vec::new();
        let mut failed = Vec::new();
        for image in images {
            if candidates.len() >= self.policy.max_candidates {
                log::info!(
                    "Collected {} faces for '{}'; ignoring remaining images",
                    candidates.len(),
                    name
                );
                break;
            }
            match encoder.encode(&image.bytes) {
                Ok(detections) => match detections.into_iter().next() {
                    Some(first) => candidates.push(first.encoding),
                    None => {
                        log::warn!("No face found in {}", image.label);
                        failed.push(image.label.clone());
                    }
                },
                Err(e) => {
                    log::warn!("Could not encode {}: {}", image.label, e);
                    failed.push(image.label.clone());
                }
            }
        }

        if candidates.is_empty() {
            return Err(EnrollError::NoFacesFound {
                submitted: images.len(),
                failed: failed.len(),
            });
        }

        let summary = ImageBatchSummary {
            submitted: images.len(),
            used: candidates.len(),
            failed,
        };
        Ok((candidates, summary))
    }

    fn run(&mut self, name: &str, mut candidates: Vec<Vec<f64>>) -> EnrollResult<Registration> {
        self.policy.check_name(name)?;
        if candidates.is_empty() {
            return Err(EnrollError::NoCandidates { rejected: 0 });
        }

        if candidates.len() > self.policy.max_candidates {
            log::info!(
                "Truncating {} candidates for '{}' to {}",
                candidates.len(),
                name,
                self.policy.max_candidates
            );
            candidates.truncate(self.policy.max_candidates);
        }

        let usable = candidates.iter().filter(|c| self.policy.is_valid(c)).count();
        if usable == 0 {
            return Err(EnrollError::NoCandidates {
                rejected: candidates.len(),
            });
        }
        self.enter(RegistrationState::Validated);

        let existing = match self.store.find_by_name(name) {
            Ok(record) => Some(record.id),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };

        let registration = match existing {
            Some(id) => {
                let outcome = self.store.augment(id, candidates)?;
                // Only the head that fit was validated; it may hold nothing usable.
                if outcome.accepted == 0 {
                    return Err(EnrollError::NoCandidates {
                        rejected: outcome.skipped.len(),
                    });
                }
                self.enter(RegistrationState::Augmented);
                Registration {
                    action: RegistrationAction::Augmented,
                    outcome,
                    images: None,
                }
            }
            None => {
                let outcome = self.store.create(name, candidates)?;
                self.enter(RegistrationState::Created);
                Registration {
                    action: RegistrationAction::Created,
                    outcome,
                    images: None,
                }
            }
        };
        Ok(registration)
    }

    fn enter(&mut self, next: RegistrationState) {
        log::debug!("Registration: {} -> {}", self.state, next);
        self.state = next;
    }
}
